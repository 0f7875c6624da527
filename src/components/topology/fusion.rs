//! Telemetry fusion: matching interface samples to edges.
//!
//! Each interface reported by a core node is tested against the node's
//! outgoing edges with an ordered chain of [`Matcher`]s. The first matcher
//! that accepts any edge decides the match, so a literal name hit always beats
//! the fuzzier description heuristics. Matched edges get their display
//! attributes rewritten from the sample; unmatched samples are dropped.
//!
//! Matchers only read the label and tooltip the topology delivered, never the
//! display text written by earlier samples, so a refresh resolves every
//! interface to the same edge it resolved to last time.

use log::debug;
use serde::Deserialize;

use super::store::{EdgePatch, GraphStore, Throughput};
use super::types::InterfaceRecord;

/// Edge fields visible to matchers, together with the target node's label.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
	/// Id of the edge.
	pub edge_id: &'a str,
	/// Topology label of the edge.
	pub label: &'a str,
	/// Topology tooltip of the edge.
	pub tooltip: &'a str,
	/// Label of the node the edge leads to.
	pub target_label: &'a str,
}

/// One rule in the matching chain.
#[derive(Clone, Copy)]
pub struct Matcher {
	/// Short name, reported with each match.
	pub name: &'static str,
	/// Whether the sample belongs to the candidate edge.
	pub rule: fn(&InterfaceRecord, &Candidate<'_>) -> bool,
}

impl std::fmt::Debug for Matcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name)
	}
}

fn name_in_label(iface: &InterfaceRecord, c: &Candidate<'_>) -> bool {
	!iface.name.is_empty() && c.label.contains(iface.name.as_str())
}

fn name_in_edge_id(iface: &InterfaceRecord, c: &Candidate<'_>) -> bool {
	!iface.name.is_empty() && c.edge_id.contains(iface.name.as_str())
}

fn description_in_target(iface: &InterfaceRecord, c: &Candidate<'_>) -> bool {
	let token = description_token(&iface.description);
	!token.is_empty() && c.target_label.to_lowercase().contains(&token)
}

fn description_in_tooltip(iface: &InterfaceRecord, c: &Candidate<'_>) -> bool {
	!iface.description.is_empty() && c.tooltip.contains(iface.description.as_str())
}

/// Matchers in precedence order.
pub const DEFAULT_MATCHERS: [Matcher; 4] = [
	Matcher {
		name: "label",
		rule: name_in_label,
	},
	Matcher {
		name: "edge-id",
		rule: name_in_edge_id,
	},
	Matcher {
		name: "description",
		rule: description_in_target,
	},
	Matcher {
		name: "tooltip",
		rule: description_in_tooltip,
	},
];

const DESCRIPTION_PREFIXES: [&str; 6] = ["to_", "To_", "TO_", "to-", "To-", "TO-"];

/// Reduce an interface description such as `To_Branch-Office3` to the token
/// `branch-office` used to find the neighbour by label.
pub fn description_token(description: &str) -> String {
	let trimmed = description.trim();
	let rest = DESCRIPTION_PREFIXES
		.iter()
		.find_map(|p| trimmed.strip_prefix(p))
		.unwrap_or(trimmed);
	rest.chars()
		.filter(|c| !c.is_ascii_digit())
		.collect::<String>()
		.trim_matches(|c: char| c == '_' || c == '-' || c == '/' || c == '.' || c.is_whitespace())
		.to_lowercase()
}

/// Display tuning for fused edges.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
	/// Combined rate (bits per second) below which the label is cleared.
	pub declutter_bps: f64,
	/// Screen width of an idle link, pixels.
	pub min_width: f64,
	/// Screen width cap for busy links, pixels.
	pub max_width: f64,
	/// Width added per Mbps of combined throughput.
	pub width_per_mbps: f64,
}

impl Default for FusionConfig {
	fn default() -> Self {
		Self {
			declutter_bps: 1_000_000.0,
			min_width: 1.0,
			max_width: 8.0,
			width_per_mbps: 0.1,
		}
	}
}

/// Result of fusing one interface list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FusionReport {
	/// `(interface, edge id, matcher)` in interface order.
	pub matched: Vec<(String, String, &'static str)>,
	/// Interfaces no matcher placed, in interface order.
	pub unmatched: Vec<String>,
}

/// Applies interface samples to the edges of their node.
#[derive(Clone, Debug)]
pub struct FusionService {
	/// Display tuning.
	pub config: FusionConfig,
	matchers: Vec<Matcher>,
}

impl Default for FusionService {
	fn default() -> Self {
		Self::new(FusionConfig::default())
	}
}

impl FusionService {
	/// Service with the default matcher chain.
	pub fn new(config: FusionConfig) -> Self {
		Self {
			config,
			matchers: DEFAULT_MATCHERS.to_vec(),
		}
	}

	/// Replace the matcher chain.
	pub fn with_matchers(mut self, matchers: Vec<Matcher>) -> Self {
		self.matchers = matchers;
		self
	}

	/// Index of the candidate chosen for `iface`, with the deciding matcher.
	pub fn resolve(
		&self,
		iface: &InterfaceRecord,
		candidates: &[Candidate<'_>],
	) -> Option<(usize, &'static str)> {
		self.matchers.iter().find_map(|m| {
			candidates
				.iter()
				.position(|c| (m.rule)(iface, c))
				.map(|i| (i, m.name))
		})
	}

	/// Fuse `interfaces` reported by `node_id` into its outgoing edges.
	/// Samples apply in list order; a later sample hitting the same edge
	/// overwrites the earlier one.
	pub fn apply(
		&self,
		store: &mut GraphStore,
		node_id: &str,
		interfaces: &[InterfaceRecord],
	) -> FusionReport {
		let edge_ids = store.outgoing_edge_ids(node_id);
		let mut report = FusionReport::default();

		for iface in interfaces {
			let hit = {
				let candidates: Vec<Candidate<'_>> = edge_ids
					.iter()
					.filter_map(|id| store.edge(id))
					.map(|edge| Candidate {
						edge_id: &edge.id,
						label: &edge.base_label,
						tooltip: &edge.base_tooltip,
						target_label: store
							.node(&edge.target)
							.map(|n| n.label.as_str())
							.unwrap_or(""),
					})
					.collect();
				self.resolve(iface, &candidates)
					.map(|(i, matcher)| (candidates[i].edge_id.to_string(), matcher))
			};

			match hit {
				Some((edge_id, matcher)) => {
					store.upsert_edges([self.edge_patch(&edge_id, iface)]);
					report.matched.push((iface.name.clone(), edge_id, matcher));
				}
				None => report.unmatched.push(iface.name.clone()),
			}
		}

		debug!(
			"fusion {}: {} matched, {} unmatched",
			node_id,
			report.matched.len(),
			report.unmatched.len()
		);
		report
	}

	/// Display attributes derived from one sample.
	pub fn edge_patch(&self, edge_id: &str, iface: &InterfaceRecord) -> EdgePatch {
		EdgePatch {
			display_label: Some(self.throughput_label(iface.rx, iface.tx)),
			status: Some(iface.status),
			width: Some(self.width_for(iface.combined_bps())),
			display_tooltip: Some(interface_tooltip(iface)),
			matched_interface: Some(iface.name.clone()),
			throughput: Some(Throughput {
				rx: iface.rx,
				tx: iface.tx,
			}),
			..EdgePatch::new(edge_id)
		}
	}

	/// `▼{in}M ▲{out}M`, or empty when the link is below the declutter
	/// threshold.
	pub fn throughput_label(&self, rx: f64, tx: f64) -> String {
		if rx + tx < self.config.declutter_bps {
			return String::new();
		}
		format!("▼{:.1}M ▲{:.1}M", rx / 1e6, tx / 1e6)
	}

	/// Screen width for a link carrying `combined_bps`.
	pub fn width_for(&self, combined_bps: f64) -> f64 {
		let c = &self.config;
		(c.min_width + combined_bps / 1e6 * c.width_per_mbps).clamp(c.min_width, c.max_width)
	}
}

/// Full interface detail shown when hovering a fused edge.
pub fn interface_tooltip(iface: &InterfaceRecord) -> String {
	let mut text = iface.name.clone();
	if !iface.description.is_empty() {
		text.push_str(" (");
		text.push_str(&iface.description);
		text.push(')');
	}
	text.push_str(&format!(
		"\nIn: {:.2} Mbps\nOut: {:.2} Mbps\nStatus: {}",
		iface.rx / 1e6,
		iface.tx / 1e6,
		iface.status.as_str()
	));
	text
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::topology::store::NodePatch;
	use crate::components::topology::types::Status;
	use proptest::prelude::*;

	fn iface(name: &str, description: &str, rx: f64, tx: f64, status: Status) -> InterfaceRecord {
		InterfaceRecord {
			name: name.into(),
			description: description.into(),
			rx,
			tx,
			status,
		}
	}

	/// Core `r` with switches `s1..=count`, edge `r-sN` labelled `Gi0/N`.
	fn star(count: usize) -> GraphStore {
		let mut store = GraphStore::new();
		store.upsert_nodes([NodePatch {
			level: Some(0),
			..NodePatch::new("r")
		}]);
		for i in 1..=count {
			store.upsert_nodes([NodePatch {
				level: Some(1),
				label: Some(format!("Switch-{i}")),
				..NodePatch::new(format!("s{i}"))
			}]);
			store.upsert_edges([EdgePatch {
				source: Some("r".into()),
				target: Some(format!("s{i}")),
				label: Some(format!("Gi0/{i}")),
				..EdgePatch::new(format!("r-s{i}"))
			}]);
		}
		store
	}

	#[test]
	fn description_token_strips_prefix_and_digits() {
		assert_eq!(description_token("to_Branch-Office3"), "branch-office");
		assert_eq!(description_token("To_SW12"), "sw");
		assert_eq!(description_token("uplink"), "uplink");
		assert_eq!(description_token("to_42"), "");
		assert_eq!(description_token(""), "");
	}

	#[test]
	fn matcher_chain_order() {
		let names: Vec<_> = DEFAULT_MATCHERS.iter().map(|m| m.name).collect();
		assert_eq!(names, ["label", "edge-id", "description", "tooltip"]);
	}

	#[test]
	fn each_matcher_in_isolation() {
		let c = Candidate {
			edge_id: "core1:Te1/1:sw2",
			label: "Gi0/1",
			tooltip: "uplink to warehouse",
			target_label: "Warehouse-Switch",
		};
		assert!(name_in_label(&iface("Gi0/1", "", 0.0, 0.0, Status::Up), &c));
		assert!(!name_in_label(&iface("", "", 0.0, 0.0, Status::Up), &c));
		assert!(name_in_edge_id(&iface("Te1/1", "", 0.0, 0.0, Status::Up), &c));
		assert!(description_in_target(
			&iface("x", "To_warehouse", 0.0, 0.0, Status::Up),
			&c
		));
		assert!(description_in_tooltip(
			&iface("x", "to warehouse", 0.0, 0.0, Status::Up),
			&c
		));
		assert!(!description_in_tooltip(&iface("x", "", 0.0, 0.0, Status::Up), &c));
	}

	#[test]
	fn exact_name_beats_description() {
		let mut store = star(2);
		// Description points at Switch-2, name at the Gi0/1 edge.
		let report = FusionService::default().apply(
			&mut store,
			"r",
			&[iface("Gi0/1", "to_Switch-2", 2e6, 0.0, Status::Up)],
		);
		assert_eq!(report.matched, [("Gi0/1".into(), "r-s1".into(), "label")]);
		assert!(store.edge("r-s2").unwrap().matched_interface.is_none());
	}

	#[test]
	fn description_matches_target_label_when_name_misses() {
		let mut store = star(2);
		store.upsert_nodes([NodePatch {
			label: Some("Warehouse-SW".into()),
			..NodePatch::new("s2")
		}]);
		let report = FusionService::default().apply(
			&mut store,
			"r",
			&[iface("Po7", "To_warehouse2", 2e6, 1e6, Status::Up)],
		);
		assert_eq!(report.matched[0].1, "r-s2");
		assert_eq!(report.matched[0].2, "description");
	}

	#[test]
	fn fused_edge_attributes() {
		let mut store = star(1);
		FusionService::default().apply(
			&mut store,
			"r",
			&[iface("Gi0/1", "", 5_000_000.0, 2_000_000.0, Status::Up)],
		);
		let edge = store.edge("r-s1").unwrap();
		assert_eq!(edge.label, "▼5.0M ▲2.0M");
		assert_eq!(edge.status, Status::Up);
		assert_eq!(edge.matched_interface.as_deref(), Some("Gi0/1"));
		assert!((edge.width - 1.7).abs() < 1e-9);
		assert!(edge.tooltip.starts_with("Gi0/1\nIn: 5.00 Mbps"));
	}

	#[test]
	fn custom_chain_replaces_precedence() {
		let mut store = star(2);
		let fusion = FusionService::default().with_matchers(vec![DEFAULT_MATCHERS[2]]);
		let report = fusion.apply(
			&mut store,
			"r",
			&[iface("Gi0/1", "to_Switch-2", 2e6, 0.0, Status::Up)],
		);
		assert_eq!(report.matched[0].1, "r-s1");
		assert_eq!(report.matched[0].2, "description");
	}

	#[test]
	fn width_is_clamped() {
		let fusion = FusionService::default();
		assert_eq!(fusion.width_for(0.0), 1.0);
		assert_eq!(fusion.width_for(10e9), 8.0);
	}

	#[test]
	fn label_cleared_below_threshold() {
		let fusion = FusionService::default();
		assert_eq!(fusion.throughput_label(300_000.0, 200_000.0), "");
		assert_eq!(fusion.throughput_label(600_000.0, 400_000.0), "▼0.6M ▲0.4M");
	}

	#[test]
	fn unmatched_interfaces_are_dropped() {
		let mut store = star(1);
		let before = store.edges().to_vec();
		let report = FusionService::default().apply(
			&mut store,
			"r",
			&[iface("Vlan99", "mgmt", 1e7, 1e7, Status::Up)],
		);
		assert_eq!(report.unmatched, ["Vlan99"]);
		assert_eq!(store.edges(), &before[..]);
	}

	#[test]
	fn last_match_wins() {
		let mut store = star(1);
		let fusion = FusionService::default();
		fusion.apply(&mut store, "r", &[iface("Gi0/1", "", 2e6, 0.0, Status::Up)]);
		fusion.apply(&mut store, "r", &[iface("r-s", "", 0.0, 0.0, Status::Down)]);
		let edge = store.edge("r-s1").unwrap();
		assert_eq!(edge.matched_interface.as_deref(), Some("r-s"));
		assert_eq!(edge.status, Status::Down);
	}

	#[test]
	fn only_outgoing_edges_of_the_reporting_node_are_touched() {
		let mut store = star(1);
		let report = FusionService::default().apply(
			&mut store,
			"s1",
			&[iface("Gi0/1", "", 2e6, 0.0, Status::Up)],
		);
		assert!(report.matched.is_empty());
	}

	proptest! {
		#[test]
		fn applying_twice_is_idempotent(
			samples in prop::collection::vec(
				(0usize..6, 0usize..6, 0.0f64..1e8, 0.0f64..1e8, any::<bool>()),
				0..8,
			)
		) {
			let interfaces: Vec<InterfaceRecord> = samples
				.iter()
				.map(|&(name, desc, rx, tx, up)| {
					let description = match desc {
						0 => String::new(),
						1 => "uplink".to_string(),
						d => format!("to_Switch-{d}"),
					};
					iface(
						&format!("Gi0/{name}"),
						&description,
						rx,
						tx,
						if up { Status::Up } else { Status::Down },
					)
				})
				.collect();

			let fusion = FusionService::default();
			let mut store = star(4);
			fusion.apply(&mut store, "r", &interfaces);
			let once = store.edges().to_vec();
			fusion.apply(&mut store, "r", &interfaces);
			prop_assert_eq!(store.edges(), &once[..]);
		}
	}
}
