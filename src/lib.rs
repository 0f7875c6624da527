//! net-topology: Live network topology view for the browser.
//!
//! This crate provides a WASM-based canvas component that lays out a device
//! graph in several modes, overlays live interface telemetry on its links and
//! keeps a mini-map of the whole network in view.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod components;

pub use components::topology::{
	LayoutMode, ThemeMode, TopologyConfig, TopologyController, TopologyError, TopologyView,
	load_config,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("net-topology: logging initialized");
}

/// Main application component.
/// Reads the view configuration from the DOM and renders the topology.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let config = load_config();
	let theme = RwSignal::new(ThemeMode::Dark);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme=move || theme.get().as_str() />
		<Title text="Network Topology" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<TopologyView config=config theme=theme fullscreen=true />
			<div class="graph-overlay">
				<h1>"Network Topology"</h1>
				<p class="subtitle">"Click a router for live interfaces. Scroll to zoom. Drag background to pan."</p>
				<button class="theme-toggle" on:click=move |_| theme.update(|t| *t = t.toggled())>
					{move || match theme.get() {
						ThemeMode::Dark => "Light theme",
						ThemeMode::Light => "Dark theme",
					}}
				</button>
			</div>
		</div>
	}
}
