//! Runtime configuration, read from the host page.

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

use super::fusion::FusionConfig;
use super::layout::{LayoutConfig, LayoutMode};
use super::minimap::MinimapConfig;

/// Id of the inline JSON element holding the configuration.
pub const CONFIG_ELEMENT_ID: &str = "topology-config";

/// How edge telemetry is kept current.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
	/// One live channel per core node.
	#[default]
	Live,
	/// Periodic REST polls per core node.
	Polling,
}

/// Settings of one topology view. Every field is optional in the JSON form.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
	/// Prefix for REST endpoints, e.g. `/api`.
	pub api_base: String,
	/// Prefix for live channels. Empty means same origin as the page.
	pub ws_base: String,
	/// View mode passed to the topology endpoint.
	pub view: String,
	/// Upper bound on nodes returned by the topology endpoint.
	pub limit: usize,
	/// Where edge telemetry comes from.
	pub overlay: OverlayMode,
	/// Layout applied when the topology first loads.
	pub initial_layout: LayoutMode,
	/// Polling period for core nodes without a live channel.
	pub refresh_interval_ms: u32,
	/// Quiet time after the last view change before the mini-map redraws.
	pub minimap_debounce_ms: u32,
	/// Unconditional mini-map redraw period.
	pub minimap_safety_ms: u32,
	/// Period of the header stats recount.
	pub metrics_interval_ms: u32,
	/// Layout tuning.
	pub layout: LayoutConfig,
	/// Telemetry fusion thresholds and edge widths.
	pub fusion: FusionConfig,
	/// Mini-map canvas size.
	pub minimap: MinimapConfig,
}

impl Default for TopologyConfig {
	fn default() -> Self {
		Self {
			api_base: "/api".into(),
			ws_base: String::new(),
			view: "full".into(),
			limit: 500,
			overlay: OverlayMode::default(),
			initial_layout: LayoutMode::default(),
			refresh_interval_ms: 5_000,
			minimap_debounce_ms: 150,
			minimap_safety_ms: 2_000,
			metrics_interval_ms: 10_000,
			layout: LayoutConfig::default(),
			fusion: FusionConfig::default(),
			minimap: MinimapConfig::default(),
		}
	}
}

impl TopologyConfig {
	/// Parse a configuration, filling absent fields with defaults.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

fn config_text() -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(CONFIG_ELEMENT_ID)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Load configuration from the `topology-config` script element, falling
/// back to defaults when it is missing or malformed.
pub fn load_config() -> TopologyConfig {
	let Some(text) = config_text() else {
		info!("net-topology: no #{CONFIG_ELEMENT_ID} element, using defaults");
		return TopologyConfig::default();
	};
	match TopologyConfig::from_json(&text) {
		Ok(config) => {
			info!(
				"net-topology: config loaded (overlay {:?}, layout {})",
				config.overlay, config.initial_layout
			);
			config
		}
		Err(e) => {
			warn!("net-topology: failed to parse config: {}", e);
			TopologyConfig::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_config_keeps_defaults() {
		let config = TopologyConfig::from_json(
			r#"{
				"overlay": "polling",
				"initial_layout": "radial",
				"layout": { "radial_ring_step": 400 },
				"minimap": { "width": 240 }
			}"#,
		)
		.unwrap();
		assert_eq!(config.overlay, OverlayMode::Polling);
		assert_eq!(config.initial_layout, LayoutMode::Radial);
		assert_eq!(config.layout.radial_ring_step, 400.0);
		assert_eq!(config.layout.radial_base_radius, 450.0);
		assert_eq!(config.minimap.width, 240.0);
		assert_eq!(config.minimap.padding, 10.0);
		assert_eq!(config.api_base, "/api");
	}

	#[test]
	fn unknown_overlay_is_an_error() {
		assert!(TopologyConfig::from_json(r#"{"overlay": "carrier-pigeon"}"#).is_err());
	}
}
