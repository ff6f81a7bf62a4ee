use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle a connection leaves from.
pub const SOURCE_HANDLE: &str = "right";
/// Handle a connection arrives at.
pub const TARGET_HANDLE: &str = "left";

pub const DEFAULT_EDGE_STROKE: &str = "#555555";
pub const DEFAULT_EDGE_WIDTH: f64 = 2.0;

/// Progress of a supply-chain stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
	#[default]
	Pending,
	Processing,
	Done,
}

impl NodeStatus {
	pub const ALL: [NodeStatus; 3] = [NodeStatus::Pending, NodeStatus::Processing, NodeStatus::Done];

	pub fn as_str(&self) -> &'static str {
		match self {
			NodeStatus::Pending => "pending",
			NodeStatus::Processing => "processing",
			NodeStatus::Done => "done",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|s| s.as_str() == value)
	}

	/// Fill color used by the canvas badge.
	pub fn color(&self) -> &'static str {
		match self {
			NodeStatus::Pending => "#f0ad4e",
			NodeStatus::Processing => "#5bc0de",
			NodeStatus::Done => "#5cb85c",
		}
	}
}

impl fmt::Display for NodeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeStyle {
	pub stroke: String,
	pub stroke_width: f64,
}

impl Default for EdgeStyle {
	fn default() -> Self {
		Self {
			stroke: DEFAULT_EDGE_STROKE.into(),
			stroke_width: DEFAULT_EDGE_WIDTH,
		}
	}
}

/// A participant or stage in the supply chain, in renderer shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SupplyNode {
	pub id: String,
	pub name: String,
	pub role: String,
	pub assigned_user: Option<String>,
	pub assigned_username: Option<String>,
	pub status: NodeStatus,
	pub position: Position,
	/// Status of the upstream neighbour. Derived, never persisted.
	pub previous_node_status: NodeStatus,
}

impl SupplyNode {
	/// Backend ids are positive; placeholders awaiting creation are not.
	pub fn is_placeholder(&self) -> bool {
		self.id.parse::<i64>().map(|id| id <= 0).unwrap_or(true)
	}
}

/// Directed workflow link between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct SupplyEdge {
	pub id: String,
	pub source: String,
	pub target: String,
	pub source_handle: String,
	pub target_handle: String,
	pub style: EdgeStyle,
}

impl SupplyEdge {
	pub fn touches(&self, node_id: &str) -> bool {
		self.source == node_id || self.target == node_id
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainMeta {
	pub id: String,
	pub name: String,
	pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
	#[serde(deserialize_with = "crate::components::supply_chain::wire::id_string")]
	pub id: String,
	pub username: String,
	#[serde(default)]
	pub role: String,
}

/// Users available for assignment, indexed by id.
#[derive(Clone, Debug, Default)]
pub struct UserDirectory {
	users: Vec<User>,
	names: HashMap<String, String>,
}

impl UserDirectory {
	pub fn new(users: Vec<User>) -> Self {
		let names = users
			.iter()
			.map(|u| (u.id.clone(), u.username.clone()))
			.collect();
		Self { users, names }
	}

	pub fn username(&self, id: &str) -> Option<&str> {
		self.names.get(id).map(String::as_str)
	}

	pub fn with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a User> + 'a {
		self.users.iter().filter(move |u| u.role == role)
	}

	pub fn users(&self) -> &[User] {
		&self.users
	}
}
