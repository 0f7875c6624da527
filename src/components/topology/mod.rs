//! Live network topology view.
//!
//! Renders a device graph on an HTML canvas with:
//! - Four layout modes (hierarchical, force, circular, radial) over one store
//! - Interface telemetry fused onto edges from live channels or polling
//! - A detail panel with per-interface rates for core routers
//! - Pan, zoom, search and a mini-map with the current viewport
//!
//! # Example
//!
//! ```ignore
//! use net_topology::{TopologyView, ThemeMode, load_config};
//!
//! let theme = RwSignal::new(ThemeMode::Dark);
//! view! { <TopologyView config=load_config() theme=theme fullscreen=true /> }
//! ```

mod api;
mod channel;
mod component;
mod config;
mod controller;
mod detail;
mod error;
mod fusion;
mod geometry;
mod highlight;
mod layout;
mod minimap;
mod render;
mod scale;
mod store;
mod tasks;
mod theme;
mod timer;
mod types;
mod viewport;

pub use component::TopologyView;
pub use config::{OverlayMode, TopologyConfig, load_config};
pub use controller::{Teardown, TopologyController};
pub use error::TopologyError;
pub use fusion::{Candidate, DEFAULT_MATCHERS, FusionConfig, FusionReport, FusionService, Matcher};
pub use geometry::Point;
pub use layout::LayoutMode;
pub use tasks::Cancel;
pub use theme::ThemeMode;
pub use types::{InterfaceRecord, Status, TopologyResponse};
