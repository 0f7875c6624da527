//! World-space points and axis-aligned rectangles.

use serde::{Deserialize, Serialize};

/// A point in world or screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate, growing rightwards.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// `(0, 0)`.
	pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Point at `radius` from the origin at `angle` radians.
	pub fn polar(radius: f64, angle: f64) -> Self {
		Self {
			x: radius * angle.cos(),
			y: radius * angle.sin(),
		}
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}

	/// Distance to the segment from `a` to `b`.
	pub fn distance_to_segment(self, a: Point, b: Point) -> f64 {
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let len_sq = dx * dx + dy * dy;
		if len_sq == 0.0 {
			return self.distance(a);
		}
		let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
		self.distance(a.lerp(b, t))
	}

	/// Point `t` of the way from `self` to `other`.
	pub fn lerp(self, other: Point, t: f64) -> Self {
		Self {
			x: self.x + (other.x - self.x) * t,
			y: self.y + (other.y - self.y) * t,
		}
	}
}

/// Axis-aligned rectangle. `min_*` never exceeds `max_*` for rectangles
/// built through the constructors here.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Rect {
	pub fn from_corners(a: Point, b: Point) -> Self {
		Self {
			min_x: a.x.min(b.x),
			min_y: a.y.min(b.y),
			max_x: a.x.max(b.x),
			max_y: a.y.max(b.y),
		}
	}

	pub fn from_center_size(center: Point, width: f64, height: f64) -> Self {
		Self::from_corners(
			Point::new(center.x - width / 2.0, center.y - height / 2.0),
			Point::new(center.x + width / 2.0, center.y + height / 2.0),
		)
	}

	/// Bounding box of a point set, `None` when the set is empty.
	pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
		let mut iter = points.into_iter();
		let first = iter.next()?;
		let mut rect = Self::from_corners(first, first);
		for p in iter {
			rect.min_x = rect.min_x.min(p.x);
			rect.min_y = rect.min_y.min(p.y);
			rect.max_x = rect.max_x.max(p.x);
			rect.max_y = rect.max_y.max(p.y);
		}
		Some(rect)
	}

	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
	}

	/// Grow every side by `margin`.
	pub fn expand(&self, margin: f64) -> Self {
		Self {
			min_x: self.min_x - margin,
			min_y: self.min_y - margin,
			max_x: self.max_x + margin,
			max_y: self.max_y + margin,
		}
	}

	/// Clamp both corners into `bounds`. A rectangle lying entirely outside
	/// collapses onto the nearest edge of `bounds`.
	pub fn clamp_within(&self, bounds: &Rect) -> Self {
		let clamp_x = |x: f64| x.clamp(bounds.min_x, bounds.max_x);
		let clamp_y = |y: f64| y.clamp(bounds.min_y, bounds.max_y);
		Self {
			min_x: clamp_x(self.min_x),
			min_y: clamp_y(self.min_y),
			max_x: clamp_x(self.max_x),
			max_y: clamp_y(self.max_y),
		}
	}

	pub fn is_within(&self, bounds: &Rect) -> bool {
		self.min_x >= bounds.min_x
			&& self.min_y >= bounds.min_y
			&& self.max_x <= bounds.max_x
			&& self.max_y <= bounds.max_y
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bounding_box_of_points() {
		let rect = Rect::bounding([
			Point::new(-10.0, 5.0),
			Point::new(30.0, -2.0),
			Point::new(4.0, 40.0),
		])
		.unwrap();
		assert_eq!(rect.min_x, -10.0);
		assert_eq!(rect.max_x, 30.0);
		assert_eq!(rect.min_y, -2.0);
		assert_eq!(rect.max_y, 40.0);
		assert!(Rect::bounding(Vec::new()).is_none());
	}

	#[test]
	fn segment_distance_clamps_to_endpoints() {
		let (a, b) = (Point::ORIGIN, Point::new(10.0, 0.0));
		assert_eq!(Point::new(5.0, 3.0).distance_to_segment(a, b), 3.0);
		assert_eq!(Point::new(14.0, 3.0).distance_to_segment(a, b), 5.0);
		assert_eq!(Point::new(0.0, 2.0).distance_to_segment(a, a), 2.0);
	}

	#[test]
	fn clamp_collapses_outside_rect_onto_edge() {
		let bounds = Rect::from_corners(Point::ORIGIN, Point::new(100.0, 50.0));
		let far = Rect::from_corners(Point::new(200.0, 10.0), Point::new(300.0, 20.0));
		let clamped = far.clamp_within(&bounds);
		assert!(clamped.is_within(&bounds));
		assert_eq!(clamped.width(), 0.0);
		assert_eq!(clamped.min_x, 100.0);
	}
}
