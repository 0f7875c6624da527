//! Detail panel state for the selected node.

use super::store::Node;
use super::types::{InterfaceRecord, Role, Status};

/// Static attributes of the selected node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSummary {
	pub id: String,
	pub label: String,
	pub role: Role,
	pub device_type: String,
	pub branch: Option<String>,
	pub status: Status,
	pub info: String,
}

impl From<&Node> for NodeSummary {
	fn from(node: &Node) -> Self {
		Self {
			id: node.id.clone(),
			label: node.label.clone(),
			role: node.role(),
			device_type: node.device_type.clone(),
			branch: node.branch.clone(),
			status: node.status,
			info: node.info.clone(),
		}
	}
}

/// One row of the live interface table, rates in Mbps.
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceRow {
	pub name: String,
	pub description: String,
	pub rx_mbps: f64,
	pub tx_mbps: f64,
	pub status: Status,
}

impl From<&InterfaceRecord> for InterfaceRow {
	fn from(record: &InterfaceRecord) -> Self {
		Self {
			name: record.name.clone(),
			description: record.description.clone(),
			rx_mbps: record.rx / 1e6,
			tx_mbps: record.tx / 1e6,
			status: record.status,
		}
	}
}

/// State of the selected router's telemetry channel as the panel sees it.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkState {
	Connecting,
	Live(Vec<InterfaceRow>),
	Failed(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DetailPanel {
	#[default]
	Closed,
	/// Any non-router node: static attributes only.
	Device(NodeSummary),
	Router { node: NodeSummary, link: LinkState },
}

impl DetailPanel {
	pub fn open(node: &Node) -> Self {
		let summary = NodeSummary::from(node);
		if node.is_core() {
			DetailPanel::Router {
				node: summary,
				link: LinkState::Connecting,
			}
		} else {
			DetailPanel::Device(summary)
		}
	}

	pub fn node_id(&self) -> Option<&str> {
		match self {
			DetailPanel::Closed => None,
			DetailPanel::Device(node) | DetailPanel::Router { node, .. } => Some(&node.id),
		}
	}

	pub fn is_open(&self) -> bool {
		!matches!(self, DetailPanel::Closed)
	}

	/// Show a fresh interface list if the panel belongs to `node_id`.
	pub fn show_interfaces(&mut self, node_id: &str, interfaces: &[InterfaceRecord]) -> bool {
		match self {
			DetailPanel::Router { node, link } if node.id == node_id => {
				*link = LinkState::Live(interfaces.iter().map(InterfaceRow::from).collect());
				true
			}
			_ => false,
		}
	}

	/// Mark the channel failed if the panel belongs to `node_id`.
	pub fn fail(&mut self, node_id: &str, message: impl Into<String>) -> bool {
		match self {
			DetailPanel::Router { node, link } if node.id == node_id => {
				*link = LinkState::Failed(message.into());
				true
			}
			_ => false,
		}
	}
}
