//! Overview projection for the mini-map.
//!
//! Each redraw fits the bounding box of the visible nodes into the mini-map
//! canvas with one uniform scale. The same stored parameters map pixels back
//! to world coordinates for click-to-pan, so a point projected and then
//! unprojected comes back unchanged.

use serde::Deserialize;

use super::geometry::{Point, Rect};
use super::store::GraphStore;
use super::types::{Role, Status};
use super::viewport::Viewport;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
	pub width: f64,
	pub height: f64,
	/// Pixels kept clear around the projected graph.
	pub padding: f64,
}

impl Default for MinimapConfig {
	fn default() -> Self {
		Self {
			width: 200.0,
			height: 150.0,
			padding: 10.0,
		}
	}
}

impl MinimapConfig {
	pub fn canvas_rect(&self) -> Rect {
		Rect::from_corners(Point::ORIGIN, Point::new(self.width, self.height))
	}
}

/// World-to-pixel transform of one mini-map redraw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
	pub min_x: f64,
	pub max_x: f64,
	pub min_y: f64,
	pub max_y: f64,
	pub scale: f64,
	pub padding: f64,
	/// Centering offsets for the axis with spare room.
	pub offset_x: f64,
	pub offset_y: f64,
}

impl Projection {
	/// Fit `bounds` into the canvas described by `config`. A zero-sized axis
	/// is treated as one world unit wide.
	pub fn fit(bounds: &Rect, config: &MinimapConfig) -> Self {
		let world_w = bounds.width().max(1.0);
		let world_h = bounds.height().max(1.0);
		let inner_w = (config.width - 2.0 * config.padding).max(1.0);
		let inner_h = (config.height - 2.0 * config.padding).max(1.0);
		let scale = (inner_w / world_w).min(inner_h / world_h);
		Self {
			min_x: bounds.min_x,
			max_x: bounds.max_x,
			min_y: bounds.min_y,
			max_y: bounds.max_y,
			scale,
			padding: config.padding,
			offset_x: (inner_w - bounds.width() * scale) / 2.0,
			offset_y: (inner_h - bounds.height() * scale) / 2.0,
		}
	}

	/// Projection of a point set, `None` when there is nothing to show.
	pub fn from_points(points: impl IntoIterator<Item = Point>, config: &MinimapConfig) -> Option<Self> {
		Rect::bounding(points).map(|bounds| Self::fit(&bounds, config))
	}

	pub fn project(&self, world: Point) -> Point {
		Point::new(
			self.padding + self.offset_x + (world.x - self.min_x) * self.scale,
			self.padding + self.offset_y + (world.y - self.min_y) * self.scale,
		)
	}

	pub fn unproject(&self, pixel: Point) -> Point {
		Point::new(
			self.min_x + (pixel.x - self.padding - self.offset_x) / self.scale,
			self.min_y + (pixel.y - self.padding - self.offset_y) / self.scale,
		)
	}

	/// The main view's visible area in mini-map pixels, clamped to the canvas.
	pub fn viewport_rect(&self, view: &Viewport, config: &MinimapConfig) -> Rect {
		let visible = view.visible_rect();
		let a = self.project(Point::new(visible.min_x, visible.min_y));
		let b = self.project(Point::new(visible.max_x, visible.max_y));
		Rect::from_corners(a, b).clamp_within(&config.canvas_rect())
	}
}

/// One node on the mini-map.
#[derive(Clone, Debug, PartialEq)]
pub struct MinimapDot {
	pub position: Point,
	pub radius: f64,
	pub role: Role,
	pub status: Status,
}

/// Dot radius in pixels by role.
pub fn dot_radius(role: Role) -> f64 {
	match role {
		Role::CoreRouter => 4.0,
		Role::BranchSwitch => 3.0,
		Role::EndDevice => 2.0,
	}
}

/// Everything needed to draw one mini-map frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MinimapFrame {
	pub projection: Projection,
	pub dots: Vec<MinimapDot>,
	pub viewport: Rect,
}

impl MinimapFrame {
	/// Project the visible nodes of `store`. `None` when no node is visible.
	pub fn build(store: &GraphStore, view: &Viewport, config: &MinimapConfig) -> Option<Self> {
		let projection = Projection::from_points(store.visible_nodes().map(|n| n.position), config)?;
		let dots = store
			.visible_nodes()
			.map(|node| MinimapDot {
				position: projection.project(node.position),
				radius: dot_radius(node.role()),
				role: node.role(),
				status: node.status,
			})
			.collect();
		Some(Self {
			projection,
			viewport: projection.viewport_rect(view, config),
			dots,
		})
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	fn square_projection() -> (Projection, MinimapConfig) {
		let config = MinimapConfig::default();
		let bounds = Rect::from_corners(Point::new(-500.0, -300.0), Point::new(500.0, 300.0));
		(Projection::fit(&bounds, &config), config)
	}

	#[test]
	fn graph_fits_inside_padding() {
		let (projection, config) = square_projection();
		let top_left = projection.project(Point::new(-500.0, -300.0));
		let bottom_right = projection.project(Point::new(500.0, 300.0));
		let inner = config.canvas_rect().expand(-config.padding);
		assert!(inner.contains(top_left));
		assert!(inner.contains(bottom_right));
		// 180 / 1000 wins over 130 / 600
		assert!((projection.scale - 0.18).abs() < 1e-12);
	}

	#[test]
	fn click_maps_to_world_point() {
		let (projection, _) = square_projection();
		let pixel = projection.project(Point::new(120.0, 340.0));
		let world = projection.unproject(pixel);
		assert!((world.x - 120.0).abs() < 1e-9);
		assert!((world.y - 340.0).abs() < 1e-9);
	}

	#[test]
	fn zoomed_out_viewport_is_clamped() {
		let (projection, config) = square_projection();
		let mut view = Viewport::new(1200.0, 800.0);
		view.scale = 0.05;
		let rect = projection.viewport_rect(&view, &config);
		assert_eq!(rect, config.canvas_rect());
	}

	#[test]
	fn single_point_projects_to_padding_box() {
		let config = MinimapConfig::default();
		let projection = Projection::from_points([Point::new(7.0, 7.0)], &config).unwrap();
		let p = projection.project(Point::new(7.0, 7.0));
		assert!(config.canvas_rect().contains(p));
		assert!(Projection::from_points([], &config).is_none());
	}

	proptest! {
		#[test]
		fn project_unproject_round_trip(
			x0 in -5000.0..5000.0f64, y0 in -5000.0..5000.0f64,
			w in 0.0..4000.0f64, h in 0.0..4000.0f64,
			tx in 0.0..1.0f64, ty in 0.0..1.0f64,
		) {
			let config = MinimapConfig::default();
			let bounds = Rect::from_corners(Point::new(x0, y0), Point::new(x0 + w, y0 + h));
			let projection = Projection::fit(&bounds, &config);
			let p = Point::new(x0 + w * tx, y0 + h * ty);
			let back = projection.unproject(projection.project(p));
			prop_assert!((back.x - p.x).abs() < 1e-6);
			prop_assert!((back.y - p.y).abs() < 1e-6);
		}

		#[test]
		fn viewport_rect_stays_on_canvas(
			w in 1.0..3000.0f64, h in 1.0..3000.0f64,
			cx in -1e4..1e4f64, cy in -1e4..1e4f64,
			scale in 0.05..10.0f64,
		) {
			let config = MinimapConfig::default();
			let bounds = Rect::from_corners(Point::ORIGIN, Point::new(w, h));
			let projection = Projection::fit(&bounds, &config);
			let mut view = Viewport::new(1024.0, 768.0);
			view.center = Point::new(cx, cy);
			view.scale = scale;
			let rect = projection.viewport_rect(&view, &config);
			prop_assert!(rect.is_within(&config.canvas_rect()));
		}
	}
}
