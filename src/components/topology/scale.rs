//! Zoom-dependent sizing for the main canvas.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: the layout's coordinate system. Values scale with zoom.
//! - **Screen-space**: canvas pixels. Values stay constant at any zoom.
//!
//! Drawing happens after the canvas transform is applied, so every value in
//! [`ScaledValues`] is in world units.

use super::types::Role;

/// World-space scaling, clamped to min/max screen-space bounds.
#[derive(Clone, Debug)]
pub struct ScreenClamp {
	pub min_screen: f64,
	pub max_screen: f64,
}

impl ScreenClamp {
	/// World-space value for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		base.clamp(self.min_screen / k, self.max_screen / k)
	}
}

/// Label alpha by zoom: fully visible at `full_alpha_k`, gone at
/// `zero_alpha_k`.
#[derive(Clone, Debug)]
pub struct AlphaFade {
	pub zero_alpha_k: f64,
	pub full_alpha_k: f64,
}

impl AlphaFade {
	pub fn apply(&self, k: f64) -> f64 {
		if self.zero_alpha_k == self.full_alpha_k {
			return 1.0;
		}
		((k - self.zero_alpha_k) / (self.full_alpha_k - self.zero_alpha_k)).clamp(0.0, 1.0)
	}
}

#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Base radius per role, world units.
	pub core_radius: f64,
	pub branch_radius: f64,
	pub device_radius: f64,
	pub radius_clamp: ScreenClamp,
	/// Extra pick tolerance around a node, screen pixels.
	pub hit_slop: f64,
	/// Label font size in screen pixels.
	pub label_size: f64,
	/// Below this zoom labels stop shrinking and fade out instead.
	pub label_min_k: f64,
	pub label_alpha: AlphaFade,
}

#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Edge widths are stored in screen pixels; this caps how thick they get
	/// when zoomed in.
	pub max_screen_width: f64,
	/// Throughput label font size in screen pixels.
	pub label_size: f64,
	pub label_alpha: AlphaFade,
	/// Width multiplier at full hover intensity.
	pub highlight_boost: f64,
}

#[derive(Clone, Debug)]
pub struct RingScaleConfig {
	/// Stroke width in screen pixels.
	pub width: f64,
	/// Gap between node and ring in screen pixels.
	pub offset: f64,
}

#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub edge: EdgeScaleConfig,
	pub ring: RingScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				core_radius: 18.0,
				branch_radius: 12.0,
				device_radius: 8.0,
				radius_clamp: ScreenClamp {
					min_screen: 3.0,
					max_screen: f64::INFINITY,
				},
				hit_slop: 4.0,
				label_size: 12.0,
				label_min_k: 0.5,
				label_alpha: AlphaFade {
					zero_alpha_k: 0.2,
					full_alpha_k: 0.45,
				},
			},
			edge: EdgeScaleConfig {
				max_screen_width: 12.0,
				label_size: 10.0,
				label_alpha: AlphaFade {
					zero_alpha_k: 0.35,
					full_alpha_k: 0.7,
				},
				highlight_boost: 1.8,
			},
			ring: RingScaleConfig {
				width: 2.0,
				offset: 3.0,
			},
		}
	}
}

/// Scale values for one zoom level, computed once per frame.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	core_radius: f64,
	branch_radius: f64,
	device_radius: f64,
	pub hit_slop: f64,
	pub label_font: String,
	pub label_alpha: f64,
	pub edge_label_font: String,
	pub edge_label_alpha: f64,
	max_edge_width: f64,
	highlight_boost: f64,
	pub ring_width: f64,
	pub ring_offset: f64,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let node = &config.node;
		let radius = |base| node.radius_clamp.apply(base, k);
		let label_px = node.label_size / k.max(node.label_min_k);
		let edge_label_px = config.edge.label_size / k.max(node.label_min_k);
		Self {
			k,
			core_radius: radius(node.core_radius),
			branch_radius: radius(node.branch_radius),
			device_radius: radius(node.device_radius),
			hit_slop: node.hit_slop / k,
			label_font: format!("{label_px}px sans-serif"),
			label_alpha: node.label_alpha.apply(k),
			edge_label_font: format!("{edge_label_px}px sans-serif"),
			edge_label_alpha: config.edge.label_alpha.apply(k),
			max_edge_width: config.edge.max_screen_width / k,
			highlight_boost: config.edge.highlight_boost,
			ring_width: config.ring.width / k,
			ring_offset: config.ring.offset / k,
		}
	}

	pub fn node_radius(&self, role: Role) -> f64 {
		match role {
			Role::CoreRouter => self.core_radius,
			Role::BranchSwitch => self.branch_radius,
			Role::EndDevice => self.device_radius,
		}
	}

	/// Distance within which a pointer picks the node.
	pub fn hit_radius(&self, role: Role) -> f64 {
		self.node_radius(role) + self.hit_slop
	}

	/// World-space line width for an edge of `screen_width` pixels, widened
	/// by hover `highlight`.
	pub fn edge_width(&self, screen_width: f64, highlight: f64) -> f64 {
		let boost = 1.0 + (self.highlight_boost - 1.0) * highlight.clamp(0.0, 1.0);
		(screen_width * boost / self.k).min(self.max_edge_width)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamped_radius_keeps_minimum_screen_size() {
		let config = ScaleConfig::default();
		let far = ScaledValues::new(&config, 0.05);
		// 3px minimum on screen
		assert!((far.node_radius(Role::EndDevice) * 0.05 - 3.0).abs() < 1e-9);
		let near = ScaledValues::new(&config, 2.0);
		assert_eq!(near.node_radius(Role::EndDevice), 8.0);
		assert!(near.node_radius(Role::CoreRouter) > near.node_radius(Role::BranchSwitch));
	}

	#[test]
	fn edge_labels_fade_when_zoomed_out() {
		let config = ScaleConfig::default();
		assert_eq!(ScaledValues::new(&config, 0.2).edge_label_alpha, 0.0);
		assert_eq!(ScaledValues::new(&config, 1.0).edge_label_alpha, 1.0);
	}

	#[test]
	fn highlight_widens_edges() {
		let values = ScaledValues::new(&ScaleConfig::default(), 1.0);
		assert_eq!(values.edge_width(2.0, 0.0), 2.0);
		assert!((values.edge_width(2.0, 1.0) - 3.6).abs() < 1e-9);
		assert_eq!(values.edge_width(100.0, 0.0), 12.0);
	}
}
