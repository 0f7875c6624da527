//! Node and edge storage with merge-by-id upserts.
//!
//! The store keeps insertion order so layouts that depend on node ordering
//! (circular, radial) are deterministic. Endpoint integrity is not enforced on
//! write; readers use [`GraphStore::renderable_edges`], which skips edges whose
//! endpoints are missing or hidden.

use std::collections::{HashMap, HashSet};

use super::geometry::Point;
use super::types::{
	CORE_LEVEL, DEFAULT_LEVEL, EdgeRecord, NodeRecord, Role, Status, TopologyResponse,
	TopologyStats,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: String,
	pub label: String,
	pub level: u32,
	pub device_type: String,
	pub branch: Option<String>,
	pub status: Status,
	/// Free-form device description used for search and matching.
	pub info: String,
	pub position: Point,
	pub visible: bool,
}

impl Node {
	fn new(id: String) -> Self {
		Self {
			label: id.clone(),
			id,
			level: DEFAULT_LEVEL,
			device_type: String::new(),
			branch: None,
			status: Status::Unknown,
			info: String::new(),
			position: Point::ORIGIN,
			visible: true,
		}
	}

	pub fn role(&self) -> Role {
		Role::from_level(self.level)
	}

	pub fn is_core(&self) -> bool {
		self.level == CORE_LEVEL
	}

	/// Case-insensitive substring match over label and description.
	/// `needle` must already be lowercase.
	pub fn matches_query(&self, needle: &str) -> bool {
		self.label.to_lowercase().contains(needle) || self.info.to_lowercase().contains(needle)
	}
}

/// Rates last fused onto an edge, bits per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Throughput {
	pub rx: f64,
	pub tx: f64,
}

impl Throughput {
	pub fn combined(&self) -> f64 {
		self.rx + self.tx
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	pub id: String,
	pub source: String,
	pub target: String,
	/// Label as delivered by the topology. Telemetry only rewrites `label`.
	pub base_label: String,
	/// Label currently displayed.
	pub label: String,
	pub status: Status,
	pub width: f64,
	/// Tooltip as delivered by the topology.
	pub base_tooltip: String,
	/// Tooltip currently displayed.
	pub tooltip: String,
	pub matched_interface: Option<String>,
	pub throughput: Option<Throughput>,
}

/// Default edge width before any telemetry arrives.
pub const BASE_EDGE_WIDTH: f64 = 1.0;

impl Edge {
	fn new(id: String) -> Self {
		Self {
			id,
			source: String::new(),
			target: String::new(),
			base_label: String::new(),
			label: String::new(),
			status: Status::Unknown,
			width: BASE_EDGE_WIDTH,
			base_tooltip: String::new(),
			tooltip: String::new(),
			matched_interface: None,
			throughput: None,
		}
	}
}

/// Partial node update. `None` fields leave the stored value untouched.
#[derive(Clone, Debug, Default)]
pub struct NodePatch {
	pub id: String,
	pub label: Option<String>,
	pub level: Option<u32>,
	pub device_type: Option<String>,
	pub branch: Option<String>,
	pub status: Option<Status>,
	pub info: Option<String>,
	pub position: Option<Point>,
	pub visible: Option<bool>,
}

impl NodePatch {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}
}

impl From<NodeRecord> for NodePatch {
	fn from(record: NodeRecord) -> Self {
		let level = record.level();
		Self {
			level: Some(level),
			label: record.label,
			device_type: record.device_type,
			branch: record.branch,
			status: record.status.as_deref().map(Status::from_raw),
			info: record.info,
			id: record.id,
			position: None,
			visible: None,
		}
	}
}

/// Partial edge update. `None` fields leave the stored value untouched.
#[derive(Clone, Debug, Default)]
pub struct EdgePatch {
	pub id: String,
	pub source: Option<String>,
	pub target: Option<String>,
	/// Topology label; replaces both the base and the displayed label.
	pub label: Option<String>,
	/// Displayed label only, leaving the base label alone.
	pub display_label: Option<String>,
	pub status: Option<Status>,
	pub width: Option<f64>,
	/// Topology tooltip; replaces both the base and the displayed tooltip.
	pub tooltip: Option<String>,
	pub display_tooltip: Option<String>,
	pub matched_interface: Option<String>,
	pub throughput: Option<Throughput>,
}

impl EdgePatch {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}

	/// Build a patch from a fetched edge, synthesising an id from the
	/// endpoints and list position when none is given.
	pub fn from_record(record: EdgeRecord, index: usize) -> Self {
		let id = record
			.id
			.filter(|id| !id.is_empty())
			.unwrap_or_else(|| format!("{}->{}#{}", record.source, record.target, index));
		Self {
			id,
			source: Some(record.source),
			target: Some(record.target),
			label: record.label,
			tooltip: record.tooltip,
			..Default::default()
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct GraphStore {
	nodes: Vec<Node>,
	node_index: HashMap<String, usize>,
	edges: Vec<Edge>,
	edge_index: HashMap<String, usize>,
}

impl GraphStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_response(response: TopologyResponse) -> Self {
		let mut store = Self::new();
		store.upsert_nodes(response.nodes.into_iter().map(NodePatch::from));
		store.upsert_edges(
			response
				.edges
				.into_iter()
				.enumerate()
				.map(|(i, e)| EdgePatch::from_record(e, i)),
		);
		store
	}

	/// Merge node patches by id. Returns how many nodes were newly inserted.
	pub fn upsert_nodes(&mut self, patches: impl IntoIterator<Item = NodePatch>) -> usize {
		let mut inserted = 0;
		for patch in patches {
			let idx = match self.node_index.get(&patch.id) {
				Some(&idx) => idx,
				None => {
					inserted += 1;
					self.nodes.push(Node::new(patch.id.clone()));
					self.node_index.insert(patch.id.clone(), self.nodes.len() - 1);
					self.nodes.len() - 1
				}
			};
			let node = &mut self.nodes[idx];
			if let Some(label) = patch.label {
				node.label = label;
			}
			if let Some(level) = patch.level {
				node.level = level;
			}
			if let Some(device_type) = patch.device_type {
				node.device_type = device_type;
			}
			if let Some(branch) = patch.branch {
				node.branch = Some(branch);
			}
			if let Some(status) = patch.status {
				node.status = status;
			}
			if let Some(info) = patch.info {
				node.info = info;
			}
			if let Some(position) = patch.position {
				node.position = position;
			}
			if let Some(visible) = patch.visible {
				node.visible = visible;
			}
		}
		inserted
	}

	/// Merge edge patches by id. Returns how many edges were newly inserted.
	pub fn upsert_edges(&mut self, patches: impl IntoIterator<Item = EdgePatch>) -> usize {
		let mut inserted = 0;
		for patch in patches {
			let idx = match self.edge_index.get(&patch.id) {
				Some(&idx) => idx,
				None => {
					inserted += 1;
					self.edges.push(Edge::new(patch.id.clone()));
					self.edge_index.insert(patch.id.clone(), self.edges.len() - 1);
					self.edges.len() - 1
				}
			};
			let edge = &mut self.edges[idx];
			if let Some(source) = patch.source {
				edge.source = source;
			}
			if let Some(target) = patch.target {
				edge.target = target;
			}
			if let Some(label) = patch.label {
				edge.base_label = label.clone();
				edge.label = label;
			}
			if let Some(label) = patch.display_label {
				edge.label = label;
			}
			if let Some(status) = patch.status {
				edge.status = status;
			}
			if let Some(width) = patch.width {
				edge.width = width;
			}
			if let Some(tooltip) = patch.tooltip {
				edge.base_tooltip = tooltip.clone();
				edge.tooltip = tooltip;
			}
			if let Some(tooltip) = patch.display_tooltip {
				edge.tooltip = tooltip;
			}
			if let Some(name) = patch.matched_interface {
				edge.matched_interface = Some(name);
			}
			if let Some(throughput) = patch.throughput {
				edge.throughput = Some(throughput);
			}
		}
		inserted
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.node_index.get(id).map(|&idx| &self.nodes[idx])
	}

	pub fn edge(&self, id: &str) -> Option<&Edge> {
		self.edge_index.get(id).map(|&idx| &self.edges[idx])
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn set_position(&mut self, id: &str, position: Point) {
		if let Some(&idx) = self.node_index.get(id) {
			self.nodes[idx].position = position;
		}
	}

	/// Make exactly the given node ids visible; every other node is hidden.
	/// Unknown ids are ignored.
	pub fn set_visible<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
		let keep: HashSet<&str> = ids.into_iter().collect();
		for node in &mut self.nodes {
			node.visible = keep.contains(node.id.as_str());
		}
	}

	pub fn show_all(&mut self) {
		for node in &mut self.nodes {
			node.visible = true;
		}
	}

	pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
		self.nodes.iter().filter(|n| n.visible)
	}

	/// Edges whose endpoints both exist and are visible, with those endpoints.
	pub fn renderable_edges(&self) -> impl Iterator<Item = (&Edge, &Node, &Node)> {
		self.edges.iter().filter_map(|edge| {
			let source = self.node(&edge.source)?;
			let target = self.node(&edge.target)?;
			(source.visible && target.visible).then_some((edge, source, target))
		})
	}

	/// Edges referencing a node id that is not in the store.
	pub fn dangling_edges(&self) -> impl Iterator<Item = &Edge> {
		self.edges
			.iter()
			.filter(|e| self.node(&e.source).is_none() || self.node(&e.target).is_none())
	}

	/// Ids of the edges leaving `node_id`, in store order.
	pub fn outgoing_edge_ids(&self, node_id: &str) -> Vec<String> {
		self.edges
			.iter()
			.filter(|e| e.source == node_id)
			.map(|e| e.id.clone())
			.collect()
	}

	pub fn core_node_ids(&self) -> Vec<String> {
		self.nodes
			.iter()
			.filter(|n| n.is_core())
			.map(|n| n.id.clone())
			.collect()
	}

	pub fn stats(&self) -> TopologyStats {
		let (live_links, throughput_bps) = self
			.edges
			.iter()
			.filter_map(|e| e.throughput)
			.fold((0, 0.0), |(n, total), t| (n + 1, total + t.combined()));
		TopologyStats {
			nodes: self.nodes.len(),
			edges: self.edges.len(),
			up: self.nodes.iter().filter(|n| n.status == Status::Up).count(),
			down: self.nodes.iter().filter(|n| n.status == Status::Down).count(),
			live_links,
			throughput_bps,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn edge(id: &str, source: &str, target: &str) -> EdgePatch {
		EdgePatch {
			source: Some(source.into()),
			target: Some(target.into()),
			..EdgePatch::new(id)
		}
	}

	#[test]
	fn upsert_merges_and_preserves_unspecified_fields() {
		let mut store = GraphStore::new();
		let inserted = store.upsert_nodes([NodePatch {
			label: Some("Core-1".into()),
			level: Some(0),
			info: Some("Cisco ASR".into()),
			..NodePatch::new("r1")
		}]);
		assert_eq!(inserted, 1);

		let inserted = store.upsert_nodes([NodePatch {
			status: Some(Status::Down),
			..NodePatch::new("r1")
		}]);
		assert_eq!(inserted, 0);
		assert_eq!(store.node_count(), 1);

		let node = store.node("r1").unwrap();
		assert_eq!(node.label, "Core-1");
		assert_eq!(node.info, "Cisco ASR");
		assert_eq!(node.status, Status::Down);
		assert!(node.is_core());
	}

	#[test]
	fn edge_base_label_survives_label_updates() {
		let mut store = GraphStore::new();
		store.upsert_edges([EdgePatch {
			label: Some("Gi0/1".into()),
			..edge("e1", "a", "b")
		}]);
		store.upsert_edges([EdgePatch {
			display_label: Some("▼1.0M ▲1.0M".into()),
			..EdgePatch::new("e1")
		}]);
		let e = store.edge("e1").unwrap();
		assert_eq!(e.base_label, "Gi0/1");
		assert_eq!(e.label, "▼1.0M ▲1.0M");
		assert_eq!(e.source, "a");
	}

	#[test]
	fn renderable_edges_skip_missing_and_hidden_endpoints() {
		let mut store = GraphStore::new();
		store.upsert_nodes(["a", "b", "c"].map(NodePatch::new));
		store.upsert_edges([edge("ab", "a", "b"), edge("bc", "b", "c"), edge("ax", "a", "x")]);

		assert_eq!(store.renderable_edges().count(), 2);
		assert_eq!(store.dangling_edges().map(|e| e.id.as_str()).collect::<Vec<_>>(), ["ax"]);

		store.set_visible(["a", "b"]);
		let ids: Vec<_> = store.renderable_edges().map(|(e, _, _)| e.id.as_str()).collect();
		assert_eq!(ids, ["ab"]);
		for (_, source, target) in store.renderable_edges() {
			assert!(store.node(&source.id).is_some() && store.node(&target.id).is_some());
		}
	}

	#[test]
	fn missing_edge_ids_are_synthesised_uniquely() {
		let response = TopologyResponse {
			nodes: vec![],
			edges: vec![
				EdgeRecord {
					source: "a".into(),
					target: "b".into(),
					..Default::default()
				},
				EdgeRecord {
					source: "a".into(),
					target: "b".into(),
					..Default::default()
				},
			],
			stats: None,
		};
		let store = GraphStore::from_response(response);
		assert_eq!(store.edges().len(), 2);
	}

	#[test]
	fn stats_count_status_and_live_links() {
		let mut store = GraphStore::new();
		store.upsert_nodes([
			NodePatch {
				status: Some(Status::Up),
				..NodePatch::new("a")
			},
			NodePatch {
				status: Some(Status::Down),
				..NodePatch::new("b")
			},
		]);
		store.upsert_edges([EdgePatch {
			throughput: Some(Throughput { rx: 3.0, tx: 4.0 }),
			..edge("ab", "a", "b")
		}]);
		let stats = store.stats();
		assert_eq!((stats.nodes, stats.edges, stats.up, stats.down), (2, 1, 1, 1));
		assert_eq!(stats.live_links, 1);
		assert_eq!(stats.throughput_bps, 7.0);
	}
}
