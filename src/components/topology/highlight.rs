//! Hover highlight with smooth intensity transitions.
//!
//! Hovering a node highlights the node, its neighbours and the edges touching
//! it. Every highlighted element carries its own intensity in `0.0..=1.0` that
//! eases toward its target with exponential smoothing:
//! `value += (target - value) * (1 - e^(-speed * dt))`.
//! A short hold keeps a highlight from flashing off when the pointer only
//! grazes a node.

use std::collections::{HashMap, HashSet};

use super::store::GraphStore;

/// Seconds a highlight is held before it may fade out.
const MIN_HOLD_TIME: f64 = 0.12;

const FADE_IN_SPEED: f64 = 6.0;
const FADE_OUT_SPEED: f64 = 4.0;

/// Intensities below this are dropped.
const CUTOFF: f64 = 0.005;

/// Intensity map for one kind of element (nodes or edges).
#[derive(Clone, Debug, Default)]
struct Fader {
	target: HashSet<String>,
	intensity: HashMap<String, f64>,
	hold: HashMap<String, f64>,
}

impl Fader {
	fn retarget(&mut self, ids: HashSet<String>) {
		for id in &ids {
			self.hold.insert(id.clone(), MIN_HOLD_TIME);
		}
		self.target = ids;
	}

	fn tick(&mut self, fade_in: f64, fade_out: f64, dt: f64) -> f64 {
		for id in &self.target {
			let value = self.intensity.entry(id.clone()).or_insert(0.0);
			*value += (1.0 - *value) * fade_in;
		}

		let target = &self.target;
		self.hold.retain(|id, timer| {
			if target.contains(id) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		let hold = &self.hold;
		let mut max: f64 = 0.0;
		self.intensity.retain(|id, value| {
			if !target.contains(id) && hold.get(id).copied().unwrap_or(0.0) <= 0.0 {
				*value *= fade_out;
			}
			max = max.max(*value);
			target.contains(id) || *value > CUTOFF
		});
		max
	}

	fn get(&self, id: &str) -> f64 {
		self.intensity.get(id).copied().unwrap_or(0.0)
	}

	fn is_settled(&self) -> bool {
		self.hold.is_empty()
			&& self
				.intensity
				.iter()
				.all(|(id, v)| self.target.contains(id) && *v > 1.0 - CUTOFF)
	}
}

#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered: Option<String>,
	nodes: Fader,
	edges: Fader,
	max_intensity: f64,
}

impl HighlightState {
	pub fn hovered(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	/// Point the highlight at `node_id` (or clear it). Returns whether the
	/// hovered node changed.
	pub fn set_hover(&mut self, node_id: Option<&str>, store: &GraphStore) -> bool {
		if self.hovered.as_deref() == node_id {
			return false;
		}
		self.hovered = node_id.map(str::to_string);

		let mut nodes = HashSet::new();
		let mut edges = HashSet::new();
		if let Some(id) = node_id {
			nodes.insert(id.to_string());
			for edge in store.edges() {
				if edge.source == id {
					nodes.insert(edge.target.clone());
				} else if edge.target == id {
					nodes.insert(edge.source.clone());
				} else {
					continue;
				}
				edges.insert(edge.id.clone());
			}
		}
		self.nodes.retarget(nodes);
		self.edges.retarget(edges);
		true
	}

	pub fn tick(&mut self, dt: f64) {
		let fade_in = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out = (-FADE_OUT_SPEED * dt).exp();
		let node_max = self.nodes.tick(fade_in, fade_out, dt);
		self.edges.tick(fade_in, fade_out, dt);
		self.max_intensity = node_max;
	}

	pub fn node_intensity(&self, id: &str) -> f64 {
		self.nodes.get(id)
	}

	pub fn edge_intensity(&self, id: &str) -> f64 {
		self.edges.get(id)
	}

	/// Strongest node intensity, used to dim everything else.
	pub fn max_intensity(&self) -> f64 {
		self.max_intensity
	}

	/// Whether further ticks would change nothing.
	pub fn is_settled(&self) -> bool {
		self.nodes.is_settled() && self.edges.is_settled()
	}
}
