//! Wire types consumed from the topology and telemetry collaborators.

use serde::{Deserialize, Serialize};

use super::error::TopologyError;

/// Hierarchy level of core routers.
pub const CORE_LEVEL: u32 = 0;
/// Hierarchy level of branch switches.
pub const BRANCH_LEVEL: u32 = 1;
/// Hierarchy level assigned to nodes that do not carry one.
pub const DEFAULT_LEVEL: u32 = 2;

/// Operational state of a node or link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Status {
	/// Reachable and forwarding.
	Up,
	/// Reported down or unreachable.
	Down,
	/// Nothing reported, or text that matches neither.
	#[default]
	Unknown,
}

impl Status {
	/// Derive a status from the free-form text devices report.
	pub fn from_raw(raw: &str) -> Self {
		match raw.trim().to_ascii_lowercase().as_str() {
			"up" | "online" | "active" | "reachable" => Status::Up,
			"down" | "offline" | "inactive" | "unreachable" | "error" => Status::Down,
			_ => Status::Unknown,
		}
	}

	/// Lowercase name, also used as a CSS class suffix.
	pub fn as_str(self) -> &'static str {
		match self {
			Status::Up => "up",
			Status::Down => "down",
			Status::Unknown => "unknown",
		}
	}
}

impl From<String> for Status {
	fn from(raw: String) -> Self {
		Status::from_raw(&raw)
	}
}

/// Display role derived from the hierarchy level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
	CoreRouter,
	BranchSwitch,
	EndDevice,
}

impl Role {
	pub fn from_level(level: u32) -> Self {
		match level {
			CORE_LEVEL => Role::CoreRouter,
			BRANCH_LEVEL => Role::BranchSwitch,
			_ => Role::EndDevice,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Role::CoreRouter => "Core router",
			Role::BranchSwitch => "Branch switch",
			Role::EndDevice => "End device",
		}
	}
}

/// A node as returned by the topology fetch.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeRecord {
	/// Unique identifier for this node. Used to reference nodes in edges.
	pub id: String,
	pub label: Option<String>,
	/// Hierarchy level; negative values are clamped to zero.
	pub level: Option<i64>,
	#[serde(alias = "deviceType", alias = "type")]
	pub device_type: Option<String>,
	pub branch: Option<String>,
	pub status: Option<String>,
	/// Free-form device description used for search and matching.
	#[serde(alias = "title", alias = "description")]
	pub info: Option<String>,
}

impl NodeRecord {
	pub fn level(&self) -> u32 {
		self.level
			.map(|l| l.clamp(0, u32::MAX as i64) as u32)
			.unwrap_or(DEFAULT_LEVEL)
	}
}

/// An edge as returned by the topology fetch.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EdgeRecord {
	pub id: Option<String>,
	#[serde(alias = "from")]
	pub source: String,
	#[serde(alias = "to")]
	pub target: String,
	pub label: Option<String>,
	#[serde(alias = "title")]
	pub tooltip: Option<String>,
}

/// Aggregate counts that accompany a topology fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyStats {
	#[serde(alias = "total_nodes")]
	pub nodes: usize,
	#[serde(alias = "total_edges")]
	pub edges: usize,
	#[serde(alias = "up_count", alias = "online")]
	pub up: usize,
	#[serde(alias = "down_count", alias = "offline")]
	pub down: usize,
	/// Edges currently carrying telemetry.
	pub live_links: usize,
	/// Combined throughput over all telemetry-carrying edges, bits per second.
	pub throughput_bps: f64,
}

/// Complete topology fetch result.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TopologyResponse {
	/// Devices, in server order.
	pub nodes: Vec<NodeRecord>,
	/// Links between devices. Endpoints are not checked here.
	#[serde(alias = "links")]
	pub edges: Vec<EdgeRecord>,
	/// Aggregate counts, when the server sends them.
	#[serde(default)]
	pub stats: Option<TopologyStats>,
}

impl TopologyResponse {
	/// Decode a topology body. Nodes without an id are rejected.
	pub fn parse(json: &str) -> Result<Self, TopologyError> {
		let response: TopologyResponse = serde_json::from_str(json)?;
		if response.nodes.iter().any(|n| n.id.is_empty()) {
			return Err(TopologyError::Malformed("node without id".into()));
		}
		Ok(response)
	}
}

/// One interface sample reported for a core node.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct InterfaceRecord {
	/// Interface name as the device reports it, e.g. `Gi0/1`.
	pub name: String,
	/// Free-text description configured on the interface.
	#[serde(default)]
	pub description: String,
	/// Inbound rate, bits per second.
	#[serde(default, alias = "in_rate", alias = "in_bps", alias = "inbound")]
	pub rx: f64,
	/// Outbound rate, bits per second.
	#[serde(default, alias = "out_rate", alias = "out_bps", alias = "outbound")]
	pub tx: f64,
	/// Operational state of the interface.
	#[serde(default)]
	pub status: Status,
}

impl InterfaceRecord {
	/// Inbound plus outbound rate, bits per second.
	pub fn combined_bps(&self) -> f64 {
		self.rx + self.tx
	}
}

/// Response of the interface polling endpoint. Some deployments wrap the
/// list, some return it bare.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum InterfacesResponse {
	Wrapped { interfaces: Vec<InterfaceRecord> },
	Bare(Vec<InterfaceRecord>),
}

impl InterfacesResponse {
	pub fn into_records(self) -> Vec<InterfaceRecord> {
		match self {
			InterfacesResponse::Wrapped { interfaces } => interfaces,
			InterfacesResponse::Bare(list) => list,
		}
	}
}

/// A frame received on a live telemetry channel.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
	Connected,
	#[serde(alias = "interface_update")]
	Update {
		#[serde(alias = "data")]
		interfaces: Vec<InterfaceRecord>,
	},
	Error {
		#[serde(default)]
		message: String,
	},
	#[serde(other)]
	Other,
}

impl Frame {
	pub fn parse(text: &str) -> Result<Self, TopologyError> {
		Ok(serde_json::from_str(text)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_is_derived_from_free_text() {
		assert_eq!(Status::from_raw("UP"), Status::Up);
		assert_eq!(Status::from_raw(" online"), Status::Up);
		assert_eq!(Status::from_raw("unreachable"), Status::Down);
		assert_eq!(Status::from_raw("degraded"), Status::Unknown);
	}

	#[test]
	fn topology_response_accepts_alternate_spellings() {
		let json = r#"{
			"nodes": [
				{"id": "r1", "label": "Core", "level": 0, "deviceType": "router", "status": "online"},
				{"id": "d1", "title": "printer floor 2", "level": -3}
			],
			"links": [{"from": "r1", "to": "d1", "title": "uplink"}]
		}"#;
		let response = TopologyResponse::parse(json).unwrap();
		assert_eq!(response.nodes[0].device_type.as_deref(), Some("router"));
		assert_eq!(response.nodes[1].level(), 0);
		assert_eq!(response.nodes[1].info.as_deref(), Some("printer floor 2"));
		assert_eq!(response.edges[0].source, "r1");
		assert_eq!(response.edges[0].tooltip.as_deref(), Some("uplink"));
		assert!(response.stats.is_none());
	}

	#[test]
	fn missing_level_defaults_to_end_device() {
		let node = NodeRecord {
			id: "x".into(),
			..Default::default()
		};
		assert_eq!(node.level(), DEFAULT_LEVEL);
		assert_eq!(Role::from_level(node.level()), Role::EndDevice);
	}

	#[test]
	fn malformed_topology_is_rejected() {
		assert!(TopologyResponse::parse("{\"nodes\": 3}").is_err());
		assert!(TopologyResponse::parse(r#"{"nodes":[{"id":""}],"edges":[]}"#).is_err());
	}

	#[test]
	fn frames_are_decoded_by_type() {
		assert_eq!(Frame::parse(r#"{"type":"connected"}"#).unwrap(), Frame::Connected);
		let update = Frame::parse(
			r#"{"type":"interface_update","data":[{"name":"Gi0/1","in_rate":5.0,"out_rate":2.0,"status":"up"}]}"#,
		)
		.unwrap();
		match update {
			Frame::Update { interfaces } => {
				assert_eq!(interfaces[0].name, "Gi0/1");
				assert_eq!(interfaces[0].status, Status::Up);
				assert_eq!(interfaces[0].combined_bps(), 7.0);
			}
			other => panic!("unexpected frame {other:?}"),
		}
		assert_eq!(
			Frame::parse(r#"{"type":"error","message":"snmp timeout"}"#).unwrap(),
			Frame::Error {
				message: "snmp timeout".into()
			}
		);
		assert_eq!(Frame::parse(r#"{"type":"heartbeat"}"#).unwrap(), Frame::Other);
	}

	#[test]
	fn interfaces_response_wrapped_or_bare() {
		let bare: InterfacesResponse = serde_json::from_str(r#"[{"name":"a"}]"#).unwrap();
		let wrapped: InterfacesResponse =
			serde_json::from_str(r#"{"interfaces":[{"name":"a"},{"name":"b"}]}"#).unwrap();
		assert_eq!(bare.into_records().len(), 1);
		assert_eq!(wrapped.into_records().len(), 2);
	}
}
