//! Main view camera: world center, zoom and animated transitions.

use super::geometry::{Point, Rect};

/// Zoom bounds for the main view.
pub const MIN_SCALE: f64 = 0.05;
pub const MAX_SCALE: f64 = 10.0;

/// Share of the canvas a fitted bounding box may occupy.
pub const FIT_MARGIN: f64 = 0.9;

/// Seconds an animated fit or pan takes.
pub const ANIMATION_DURATION: f64 = 0.5;

/// Cubic ease, zero slope at both ends.
pub fn smooth_step(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0);
	t * t * (3.0 - 2.0 * t)
}

#[derive(Clone, Debug, PartialEq)]
struct Animation {
	from_center: Point,
	from_scale: f64,
	to_center: Point,
	to_scale: f64,
	elapsed: f64,
}

/// Camera over the world plane. Screen coordinates have their origin at the
/// canvas top-left; the world `center` sits at the canvas middle.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
	pub scale: f64,
	pub center: Point,
	pub width: f64,
	pub height: f64,
	animation: Option<Animation>,
}

impl Default for Viewport {
	fn default() -> Self {
		Self::new(800.0, 600.0)
	}
}

impl Viewport {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			scale: 1.0,
			center: Point::ORIGIN,
			width,
			height,
			animation: None,
		}
	}

	pub fn screen_to_world(&self, screen: Point) -> Point {
		Point::new(
			self.center.x + (screen.x - self.width / 2.0) / self.scale,
			self.center.y + (screen.y - self.height / 2.0) / self.scale,
		)
	}

	pub fn world_to_screen(&self, world: Point) -> Point {
		Point::new(
			(world.x - self.center.x) * self.scale + self.width / 2.0,
			(world.y - self.center.y) * self.scale + self.height / 2.0,
		)
	}

	/// World-space size of the canvas at the current zoom.
	pub fn visible_size(&self) -> (f64, f64) {
		(self.width / self.scale, self.height / self.scale)
	}

	pub fn visible_rect(&self) -> Rect {
		let (w, h) = self.visible_size();
		Rect::from_center_size(self.center, w, h)
	}

	/// Center and zoom that show all of `bounds`. Degenerate boxes (one node,
	/// a row of nodes) keep the current zoom along the collapsed axis.
	pub fn fit_target(&self, bounds: &Rect) -> (Point, f64) {
		let sx = if bounds.width() > f64::EPSILON {
			self.width * FIT_MARGIN / bounds.width()
		} else {
			f64::INFINITY
		};
		let sy = if bounds.height() > f64::EPSILON {
			self.height * FIT_MARGIN / bounds.height()
		} else {
			f64::INFINITY
		};
		let scale = match sx.min(sy) {
			s if s.is_finite() => s,
			_ => self.scale,
		};
		(bounds.center(), scale.clamp(MIN_SCALE, MAX_SCALE))
	}

	/// Jump to show all of `bounds`.
	pub fn fit(&mut self, bounds: &Rect) {
		let (center, scale) = self.fit_target(bounds);
		self.animation = None;
		self.center = center;
		self.scale = scale;
	}

	pub fn animate_fit(&mut self, bounds: &Rect) {
		let (center, scale) = self.fit_target(bounds);
		self.animate_to(center, scale);
	}

	/// Smoothly recenter on `world`, keeping the zoom.
	pub fn pan_to(&mut self, world: Point) {
		let scale = self.animation.as_ref().map_or(self.scale, |a| a.to_scale);
		self.animate_to(world, scale);
	}

	pub fn animate_to(&mut self, center: Point, scale: f64) {
		self.animation = Some(Animation {
			from_center: self.center,
			from_scale: self.scale,
			to_center: center,
			to_scale: scale.clamp(MIN_SCALE, MAX_SCALE),
			elapsed: 0.0,
		});
	}

	/// Multiply the zoom by `factor`, keeping the world point under `anchor`
	/// (a screen position) fixed.
	pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
		self.animation = None;
		let before = self.screen_to_world(anchor);
		self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
		let after = self.screen_to_world(anchor);
		self.center.x += before.x - after.x;
		self.center.y += before.y - after.y;
	}

	/// Move the view by a screen-space delta, as when dragging the background.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.animation = None;
		self.center.x -= dx / self.scale;
		self.center.y -= dy / self.scale;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	pub fn is_animating(&self) -> bool {
		self.animation.is_some()
	}

	/// Advance the running animation. Returns whether the view moved.
	pub fn tick(&mut self, dt: f64) -> bool {
		let Some(anim) = self.animation.as_mut() else {
			return false;
		};
		anim.elapsed += dt;
		let t = smooth_step(anim.elapsed / ANIMATION_DURATION);
		self.center = anim.from_center.lerp(anim.to_center, t);
		self.scale = anim.from_scale + (anim.to_scale - anim.from_scale) * t;
		if anim.elapsed >= ANIMATION_DURATION {
			self.center = anim.to_center;
			self.scale = anim.to_scale;
			self.animation = None;
		}
		true
	}

	/// Run any animation to its end.
	pub fn finish(&mut self) {
		while self.tick(ANIMATION_DURATION) {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn approx(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-9
	}

	#[test]
	fn screen_world_round_trip() {
		let mut view = Viewport::new(1000.0, 500.0);
		view.scale = 2.5;
		view.center = Point::new(40.0, -80.0);
		let p = Point::new(123.0, 456.0);
		let back = view.screen_to_world(view.world_to_screen(p));
		assert!(approx(back.x, p.x) && approx(back.y, p.y));
		assert_eq!(view.world_to_screen(view.center), Point::new(500.0, 250.0));
	}

	#[test]
	fn fit_covers_bounds_with_margin() {
		let mut view = Viewport::new(800.0, 600.0);
		let bounds = Rect::from_corners(Point::new(-400.0, -100.0), Point::new(400.0, 100.0));
		view.fit(&bounds);
		assert!(approx(view.scale, 0.9));
		assert_eq!(view.center, Point::ORIGIN);
		assert!(bounds.is_within(&view.visible_rect()));
	}

	#[test]
	fn fit_single_point_keeps_zoom() {
		let mut view = Viewport::new(800.0, 600.0);
		view.scale = 1.7;
		let p = Point::new(10.0, 20.0);
		view.fit(&Rect::from_corners(p, p));
		assert!(approx(view.scale, 1.7));
		assert_eq!(view.center, p);
	}

	#[test]
	fn zoom_is_clamped_and_anchored() {
		let mut view = Viewport::new(800.0, 600.0);
		let anchor = Point::new(100.0, 50.0);
		let before = view.screen_to_world(anchor);
		view.zoom_at(anchor, 1.5);
		let after = view.screen_to_world(anchor);
		assert!(approx(before.x, after.x) && approx(before.y, after.y));

		view.zoom_at(anchor, 1e6);
		assert_eq!(view.scale, MAX_SCALE);
		view.zoom_at(anchor, 1e-9);
		assert_eq!(view.scale, MIN_SCALE);
	}

	#[test]
	fn pan_to_keeps_scale_and_lands_on_target() {
		let mut view = Viewport::new(800.0, 600.0);
		view.scale = 0.75;
		view.pan_to(Point::new(120.0, 340.0));
		assert!(view.is_animating());

		assert!(view.tick(ANIMATION_DURATION / 2.0));
		assert!(view.center.x > 0.0 && view.center.x < 120.0);
		assert_eq!(view.scale, 0.75);

		view.finish();
		assert!(!view.is_animating());
		assert_eq!(view.center, Point::new(120.0, 340.0));
		assert_eq!(view.scale, 0.75);
		assert!(!view.tick(0.016));
	}

	#[test]
	fn manual_pan_cancels_animation() {
		let mut view = Viewport::new(800.0, 600.0);
		view.pan_to(Point::new(500.0, 500.0));
		view.pan_by(10.0, 0.0);
		assert!(!view.is_animating());
		assert!(approx(view.center.x, -10.0));
	}

	#[test]
	fn smooth_step_endpoints() {
		assert_eq!(smooth_step(0.0), 0.0);
		assert_eq!(smooth_step(1.0), 1.0);
		assert_eq!(smooth_step(2.0), 1.0);
		assert!(approx(smooth_step(0.5), 0.5));
	}
}
