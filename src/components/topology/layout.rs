//! Node placement for the four layout modes.
//!
//! Geometric modes (circular, radial) are closed-form and deterministic given
//! store order. Hierarchical and force-directed modes seed positions and then
//! relax them through the `force_graph` simulation, stopping once the
//! iteration budget is spent or the largest per-step movement drops below the
//! convergence threshold. The simulation is discarded afterwards, so physics
//! never runs between layout requests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::str::FromStr;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;
use serde::{Deserialize, Serialize};

use super::error::TopologyError;
use super::geometry::Point;
use super::store::{Edge, GraphStore, Node};
use super::types::CORE_LEVEL;

/// Placement strategy for the whole graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
	/// Top-down layers by level, children centred under their parents.
	#[default]
	Hierarchical,
	/// Layered seed relaxed by a force simulation.
	#[serde(alias = "force-directed", alias = "physics")]
	Force,
	/// Every node on one circle.
	Circular,
	/// Cores on an inner ring, one ring per further level.
	Radial,
}

impl LayoutMode {
	/// Every mode, in menu order.
	pub const ALL: [LayoutMode; 4] = [
		LayoutMode::Hierarchical,
		LayoutMode::Force,
		LayoutMode::Circular,
		LayoutMode::Radial,
	];

	/// Config and `<option>` value.
	pub fn as_str(self) -> &'static str {
		match self {
			LayoutMode::Hierarchical => "hierarchical",
			LayoutMode::Force => "force",
			LayoutMode::Circular => "circular",
			LayoutMode::Radial => "radial",
		}
	}

	/// Human-readable name.
	pub fn label(self) -> &'static str {
		match self {
			LayoutMode::Hierarchical => "Hierarchical",
			LayoutMode::Force => "Force-directed",
			LayoutMode::Circular => "Circular",
			LayoutMode::Radial => "Radial",
		}
	}
}

impl fmt::Display for LayoutMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LayoutMode {
	type Err = TopologyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"hierarchical" => Ok(LayoutMode::Hierarchical),
			"force" | "force-directed" | "physics" => Ok(LayoutMode::Force),
			"circular" => Ok(LayoutMode::Circular),
			"radial" => Ok(LayoutMode::Radial),
			other => Err(TopologyError::UnknownLayout(other.to_string())),
		}
	}
}

/// Tuning for every layout mode.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Vertical distance between hierarchy layers.
	pub level_separation: f64,
	/// Minimum horizontal distance between siblings in a layer.
	pub node_spacing: f64,
	/// Relaxation steps allowed after hierarchical placement.
	pub stabilization_iterations: usize,
	/// Simulation steps allowed for the force-directed mode.
	pub force_iterations: usize,
	/// Largest per-step movement (world units) considered settled.
	pub convergence_threshold: f64,
	/// Simulation time step, seconds.
	pub time_step: f32,
	pub circular_min_radius: f64,
	/// Ring circumference reserved per node in circular mode.
	pub circular_node_spacing: f64,
	pub radial_core_radius: f64,
	pub radial_base_radius: f64,
	pub radial_ring_step: f64,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			level_separation: 180.0,
			node_spacing: 110.0,
			stabilization_iterations: 200,
			force_iterations: 400,
			convergence_threshold: 0.5,
			time_step: 0.016,
			circular_min_radius: 300.0,
			circular_node_spacing: 15.0,
			radial_core_radius: 200.0,
			radial_base_radius: 450.0,
			radial_ring_step: 350.0,
		}
	}
}

/// Summary of one layout run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOutcome {
	pub mode: LayoutMode,
	/// Simulation steps taken (zero for closed-form modes).
	pub iterations: usize,
	/// Whether movement settled before the budget ran out.
	pub converged: bool,
}

#[derive(Clone, Debug, Default)]
pub struct LayoutEngine {
	pub config: LayoutConfig,
}

impl LayoutEngine {
	pub fn new(config: LayoutConfig) -> Self {
		Self { config }
	}

	/// Position every node in the store. Node and edge identities are never
	/// touched; only `position` changes.
	pub fn apply(&self, mode: LayoutMode, store: &mut GraphStore) -> LayoutOutcome {
		let (positions, iterations, converged) = match mode {
			LayoutMode::Circular => (self.circular(store.nodes()), 0, true),
			LayoutMode::Radial => (self.radial(store.nodes()), 0, true),
			LayoutMode::Hierarchical => self.hierarchical(store.nodes(), store.edges()),
			LayoutMode::Force => self.force_directed(store.nodes(), store.edges()),
		};

		let ids: Vec<String> = store.nodes().iter().map(|n| n.id.clone()).collect();
		for (id, position) in ids.iter().zip(positions) {
			store.set_position(id, position);
		}

		debug!(
			"layout {}: {} nodes, {} iterations, converged={}",
			mode,
			ids.len(),
			iterations,
			converged
		);
		LayoutOutcome {
			mode,
			iterations,
			converged,
		}
	}

	pub fn circular_radius(&self, node_count: usize) -> f64 {
		self.config
			.circular_min_radius
			.max(node_count as f64 * self.config.circular_node_spacing)
	}

	/// Radius of the `rank`-th non-core ring.
	pub fn radial_ring_radius(&self, rank: usize) -> f64 {
		self.config.radial_base_radius + rank as f64 * self.config.radial_ring_step
	}

	fn circular(&self, nodes: &[Node]) -> Vec<Point> {
		let radius = self.circular_radius(nodes.len());
		ring(radius, nodes.len())
	}

	fn radial(&self, nodes: &[Node]) -> Vec<Point> {
		let mut positions = vec![Point::ORIGIN; nodes.len()];

		let cores: Vec<usize> = (0..nodes.len())
			.filter(|&i| nodes[i].level == CORE_LEVEL)
			.collect();
		for (slot, p) in cores
			.iter()
			.zip(ring(self.config.radial_core_radius, cores.len()))
		{
			positions[*slot] = p;
		}

		let mut rings: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
		for (i, node) in nodes.iter().enumerate() {
			if node.level != CORE_LEVEL {
				rings.entry(node.level).or_default().push(i);
			}
		}
		for (rank, members) in rings.values().enumerate() {
			let radius = self.radial_ring_radius(rank);
			for (slot, p) in members.iter().zip(ring(radius, members.len())) {
				positions[*slot] = p;
			}
		}
		positions
	}

	/// Layered placement with parent-centred sibling ordering, before any
	/// relaxation. Layers are ordered by ascending level, top to bottom.
	pub fn layered_seed(&self, nodes: &[Node], edges: &[Edge]) -> Vec<Point> {
		let index: HashMap<&str, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect();

		let mut neighbours: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
		for edge in edges {
			if let (Some(&a), Some(&b)) = (
				index.get(edge.source.as_str()),
				index.get(edge.target.as_str()),
			) {
				neighbours[a].push(b);
				neighbours[b].push(a);
			}
		}

		let mut layers: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
		for (i, node) in nodes.iter().enumerate() {
			layers.entry(node.level).or_default().push(i);
		}

		let spacing = self.config.node_spacing;
		let mut positions = vec![Point::ORIGIN; nodes.len()];
		let mut placed: HashSet<usize> = HashSet::new();

		for (rank, members) in layers.values().enumerate() {
			let y = rank as f64 * self.config.level_separation;

			// Barycentre of already placed parents; parentless nodes keep
			// store order after the parented ones.
			let mut keyed: Vec<(usize, Option<f64>)> = members
				.iter()
				.map(|&i| {
					let parents: Vec<f64> = neighbours[i]
						.iter()
						.filter(|&&p| placed.contains(&p) && nodes[p].level < nodes[i].level)
						.map(|&p| positions[p].x)
						.collect();
					let centre = (!parents.is_empty())
						.then(|| parents.iter().sum::<f64>() / parents.len() as f64);
					(i, centre)
				})
				.collect();
			keyed.sort_by(|a, b| match (a.1, b.1) {
				(Some(left), Some(right)) => left.total_cmp(&right),
				(Some(_), None) => std::cmp::Ordering::Less,
				(None, Some(_)) => std::cmp::Ordering::Greater,
				(None, None) => std::cmp::Ordering::Equal,
			});

			let mut xs: Vec<f64> = Vec::with_capacity(keyed.len());
			for (k, (_, desired)) in keyed.iter().enumerate() {
				let x = match (desired, xs.last()) {
					(Some(d), Some(prev)) => d.max(prev + spacing),
					(Some(d), None) => *d,
					(None, Some(prev)) => prev + spacing,
					(None, None) => k as f64 * spacing,
				};
				xs.push(x);
			}

			// Re-centre the layer under its parents, or on the origin for
			// layers without any.
			let anchored: Vec<(f64, f64)> = keyed
				.iter()
				.zip(&xs)
				.filter_map(|((_, d), x)| d.map(|d| (d, *x)))
				.collect();
			let shift = if anchored.is_empty() {
				-(xs.first().copied().unwrap_or(0.0) + xs.last().copied().unwrap_or(0.0)) / 2.0
			} else {
				anchored.iter().map(|(d, x)| d - x).sum::<f64>() / anchored.len() as f64
			};

			for ((i, _), x) in keyed.iter().zip(xs) {
				positions[*i] = Point::new(x + shift, y);
				placed.insert(*i);
			}
		}
		positions
	}

	fn hierarchical(&self, nodes: &[Node], edges: &[Edge]) -> (Vec<Point>, usize, bool) {
		let seed = self.layered_seed(nodes, edges);
		let pinned_y: Vec<f64> = seed.iter().map(|p| p.y).collect();
		self.relax(
			seed,
			nodes,
			edges,
			self.config.stabilization_iterations,
			Some(&pinned_y),
		)
	}

	fn force_directed(&self, nodes: &[Node], edges: &[Edge]) -> (Vec<Point>, usize, bool) {
		let current: Vec<Point> = nodes.iter().map(|n| n.position).collect();
		let seed = if has_coincident(&current) {
			ring(100f64.max(nodes.len() as f64 * 10.0), nodes.len())
		} else {
			current
		};
		self.relax(seed, nodes, edges, self.config.force_iterations, None)
	}

	/// Run the physics simulation from `seed`. When `pinned_y` is given every
	/// node is held on its layer and only moves horizontally.
	fn relax(
		&self,
		seed: Vec<Point>,
		nodes: &[Node],
		edges: &[Edge],
		budget: usize,
		pinned_y: Option<&[f64]>,
	) -> (Vec<Point>, usize, bool) {
		if nodes.len() < 2 || budget == 0 {
			return (seed, 0, true);
		}

		let mut graph: ForceGraph<usize, ()> = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});

		let mut handles = HashMap::new();
		for (i, (node, p)) in nodes.iter().zip(&seed).enumerate() {
			let idx = graph.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: 10.0,
				is_anchor: false,
				user_data: i,
			});
			handles.insert(node.id.as_str(), idx);
		}
		for edge in edges {
			if let (Some(&src), Some(&tgt)) = (
				handles.get(edge.source.as_str()),
				handles.get(edge.target.as_str()),
			) {
				if src != tgt {
					graph.add_edge(src, tgt, EdgeData::default());
				}
			}
		}

		let mut positions = seed.clone();
		let mut iterations = 0;
		let mut converged = false;
		while iterations < budget {
			graph.update(self.config.time_step);
			iterations += 1;

			if let Some(ys) = pinned_y {
				graph.visit_nodes_mut(|node| {
					node.data.y = ys[node.data.user_data] as f32;
				});
			}

			let mut max_step: f64 = 0.0;
			graph.visit_nodes(|node| {
				let i = node.data.user_data;
				let next = Point::new(node.x() as f64, node.y() as f64);
				max_step = max_step.max(next.distance(positions[i]));
				positions[i] = next;
			});

			if max_step < self.config.convergence_threshold {
				converged = true;
				break;
			}
		}

		if positions.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
			return (seed, iterations, false);
		}
		(positions, iterations, converged)
	}
}

/// `count` points evenly spaced on a circle, starting at the top.
fn ring(radius: f64, count: usize) -> Vec<Point> {
	(0..count)
		.map(|i| Point::polar(radius, TAU * i as f64 / count as f64 - FRAC_PI_2))
		.collect()
}

fn has_coincident(points: &[Point]) -> bool {
	let mut seen = BTreeSet::new();
	points
		.iter()
		.any(|p| !seen.insert((p.x.to_bits(), p.y.to_bits())))
}
