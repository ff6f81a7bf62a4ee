//! Backend wire shapes and the adapter between them and the in-memory graph.
//!
//! The backend nests edge endpoints as `{id}` objects, sends assignees either
//! nested or as raw ids, and uses integer ids throughout. The editor works on
//! flat string ids. Every conversion between the two lives here.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::EditorError;
use super::graph::SupplyGraph;
use super::types::{
	ChainMeta, EdgeStyle, NodeStatus, Position, SOURCE_HANDLE, SupplyEdge, SupplyNode,
	TARGET_HANDLE, UserDirectory,
};

/// An id as the backend may send it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
	Int(i64),
	Str(String),
}

impl WireId {
	pub fn into_string(self) -> String {
		match self {
			WireId::Int(id) => id.to_string(),
			WireId::Str(id) => id,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			WireId::Int(id) => Some(*id),
			WireId::Str(id) => id.trim().parse().ok(),
		}
	}
}

/// A reference that is either `{"id": ...}` or the bare id. The nested form
/// may carry a null id.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
	Nested { id: Option<WireId> },
	Flat(WireId),
}

impl IdRef {
	pub fn into_id(self) -> Option<WireId> {
		match self {
			IdRef::Nested { id } => id,
			IdRef::Flat(id) => Some(id),
		}
	}
}

/// Deserializes a numeric or string id into a `String`.
pub fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	WireId::deserialize(deserializer).map(WireId::into_string)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
	pub id: WireId,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub role: String,
	#[serde(default)]
	pub x: f64,
	#[serde(default)]
	pub y: f64,
	#[serde(default)]
	pub status: NodeStatus,
	#[serde(default)]
	pub assigned_user: Option<IdRef>,
	#[serde(default)]
	pub assigned_user_id: Option<WireId>,
}

impl WireNode {
	/// The assignee from whichever field the backend filled, nested first.
	pub fn assignee(&self) -> Option<WireId> {
		self.assigned_user
			.clone()
			.and_then(IdRef::into_id)
			.or_else(|| self.assigned_user_id.clone())
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdgeStyle {
	#[serde(default)]
	pub stroke: Option<String>,
	#[serde(default)]
	pub stroke_width: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEdge {
	pub id: WireId,
	pub source: IdRef,
	pub target: IdRef,
	#[serde(default)]
	pub source_handle: Option<String>,
	#[serde(default)]
	pub target_handle: Option<String>,
	#[serde(default)]
	pub style: Option<WireEdgeStyle>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WireChain {
	pub id: WireId,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub nodes: Vec<WireNode>,
	#[serde(default)]
	pub edges: Vec<WireEdge>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	pub name: String,
	pub role: String,
	pub x: f64,
	pub y: f64,
	pub status: NodeStatus,
	pub assigned_user_id: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct IdObject {
	pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePayload {
	pub stroke: String,
	pub stroke_width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePayload {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	pub source: IdObject,
	pub target: IdObject,
	pub source_handle: String,
	pub target_handle: String,
	pub style: StylePayload,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainPayload {
	pub name: String,
	pub description: String,
	pub nodes: Vec<NodePayload>,
	pub edges: Vec<EdgePayload>,
}

pub fn parse_id(id: &str) -> Result<i64, EditorError> {
	id.trim()
		.parse()
		.map_err(|_| EditorError::InvalidId(id.to_string()))
}

pub fn node_from_wire(node: WireNode, users: &UserDirectory) -> SupplyNode {
	let assigned_user = node.assignee().map(WireId::into_string);
	let assigned_username = assigned_user
		.as_deref()
		.and_then(|id| users.username(id))
		.map(str::to_string);
	SupplyNode {
		id: node.id.into_string(),
		name: node.name,
		role: node.role,
		assigned_user,
		assigned_username,
		status: node.status,
		position: Position {
			x: node.x,
			y: node.y,
		},
		previous_node_status: NodeStatus::Done,
	}
}

/// An endpoint without an id never matches a node, so the edge stays hidden.
fn endpoint(id: IdRef) -> String {
	id.into_id().map(WireId::into_string).unwrap_or_default()
}

pub fn edge_from_wire(edge: WireEdge) -> SupplyEdge {
	let style = edge.style.unwrap_or_default();
	let defaults = EdgeStyle::default();
	SupplyEdge {
		id: edge.id.into_string(),
		source: endpoint(edge.source),
		target: endpoint(edge.target),
		source_handle: edge.source_handle.unwrap_or_else(|| SOURCE_HANDLE.into()),
		target_handle: edge.target_handle.unwrap_or_else(|| TARGET_HANDLE.into()),
		style: EdgeStyle {
			stroke: style.stroke.unwrap_or(defaults.stroke),
			stroke_width: style.stroke_width.unwrap_or(defaults.stroke_width),
		},
	}
}

/// Flattens a fetched chain into metadata and a renderer-shaped graph.
pub fn normalize(chain: WireChain, users: &UserDirectory) -> (ChainMeta, SupplyGraph) {
	let meta = ChainMeta {
		id: chain.id.into_string(),
		name: chain.name,
		description: chain.description.unwrap_or_default(),
	};
	let nodes = chain
		.nodes
		.into_iter()
		.map(|n| node_from_wire(n, users))
		.collect();
	let edges = chain.edges.into_iter().map(edge_from_wire).collect();
	(meta, SupplyGraph::new(nodes, edges))
}

fn optional_id(id: Option<&str>) -> Result<Option<i64>, EditorError> {
	id.filter(|id| !id.is_empty()).map(parse_id).transpose()
}

/// Payload for creating or updating a single node. Placeholder ids are omitted.
pub fn node_payload(node: &SupplyNode) -> Result<NodePayload, EditorError> {
	let id = if node.is_placeholder() {
		None
	} else {
		Some(parse_id(&node.id)?)
	};
	Ok(NodePayload {
		id,
		name: node.name.clone(),
		role: node.role.clone(),
		x: node.position.x,
		y: node.position.y,
		status: node.status,
		assigned_user_id: optional_id(node.assigned_user.as_deref())?,
	})
}

pub fn edge_payload(edge: &SupplyEdge) -> Result<EdgePayload, EditorError> {
	let id = if edge.id.is_empty() {
		None
	} else {
		Some(parse_id(&edge.id)?)
	};
	Ok(EdgePayload {
		id,
		source: IdObject {
			id: parse_id(&edge.source)?,
		},
		target: IdObject {
			id: parse_id(&edge.target)?,
		},
		source_handle: edge.source_handle.clone(),
		target_handle: edge.target_handle.clone(),
		style: StylePayload {
			stroke: if edge.style.stroke.is_empty() {
				EdgeStyle::default().stroke
			} else {
				edge.style.stroke.clone()
			},
			stroke_width: if edge.style.stroke_width > 0.0 {
				edge.style.stroke_width
			} else {
				EdgeStyle::default().stroke_width
			},
		},
	})
}

/// Builds the full-graph save body.
///
/// Node identity, name, role and assignee come from the freshly fetched
/// `authoritative` list; position and status come from the local graph when
/// the node is present there.
pub fn chain_payload(
	meta: &ChainMeta,
	authoritative: Vec<WireNode>,
	graph: &SupplyGraph,
) -> Result<ChainPayload, EditorError> {
	let nodes = authoritative
		.into_iter()
		.map(|remote| {
			let id = remote
				.id
				.as_i64()
				.ok_or_else(|| EditorError::InvalidId(remote.id.clone().into_string()))?;
			let assigned_user_id = match remote.assignee() {
				Some(user) => Some(
					user.as_i64()
						.ok_or_else(|| EditorError::InvalidId(user.into_string()))?,
				),
				None => None,
			};
			let local = graph.node(&id.to_string());
			Ok(NodePayload {
				id: Some(id),
				name: remote.name,
				role: remote.role,
				x: local.map(|n| n.position.x).unwrap_or(remote.x),
				y: local.map(|n| n.position.y).unwrap_or(remote.y),
				status: local.map(|n| n.status).unwrap_or(remote.status),
				assigned_user_id,
			})
		})
		.collect::<Result<Vec<_>, EditorError>>()?;
	let edges = graph
		.visible_edges()
		.map(edge_payload)
		.collect::<Result<Vec<_>, EditorError>>()?;
	Ok(ChainPayload {
		name: meta.name.clone(),
		description: meta.description.clone(),
		nodes,
		edges,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::supply_chain::types::User;

	fn directory() -> UserDirectory {
		UserDirectory::new(vec![User {
			id: "7".into(),
			username: "mira".into(),
			role: "supplier".into(),
		}])
	}

	fn sample_chain() -> WireChain {
		serde_json::from_value(serde_json::json!({
			"id": 3,
			"name": "Coffee",
			"description": null,
			"nodes": [
				{ "id": 1, "name": "Farm", "role": "supplier", "x": 10.0, "y": 20.0,
				  "status": "done", "assignedUser": { "id": 7, "username": "mira" } },
				{ "id": "2", "name": "Roaster", "role": "manufacturer", "x": 200.0, "y": 20.0,
				  "status": "processing", "assignedUser": 9 },
				{ "id": 4, "name": "Shop", "role": "customer", "status": "pending",
				  "assignedUser": null }
			],
			"edges": [
				{ "id": 11, "source": { "id": 1 }, "target": { "id": "2" },
				  "style": { "stroke": "#ff0000" } },
				{ "id": 12, "source": 2, "target": 4, "sourceHandle": "right", "targetHandle": "left" }
			]
		}))
		.unwrap()
	}

	#[test]
	fn normalize_flattens_nested_and_raw_ids() {
		let (meta, graph) = normalize(sample_chain(), &directory());

		assert_eq!(meta.id, "3");
		assert_eq!(meta.description, "");
		let ids: Vec<_> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["1", "2", "4"]);

		let edges: Vec<_> = graph
			.edges()
			.iter()
			.map(|e| (e.source.as_str(), e.target.as_str()))
			.collect();
		assert_eq!(edges, [("1", "2"), ("2", "4")]);
	}

	#[test]
	fn normalize_resolves_assignees() {
		let (_, graph) = normalize(sample_chain(), &directory());

		let farm = graph.node("1").unwrap();
		assert_eq!(farm.assigned_user.as_deref(), Some("7"));
		assert_eq!(farm.assigned_username.as_deref(), Some("mira"));

		let roaster = graph.node("2").unwrap();
		assert_eq!(roaster.assigned_user.as_deref(), Some("9"));
		assert_eq!(roaster.assigned_username, None);

		assert_eq!(graph.node("4").unwrap().assigned_user, None);
	}

	#[test]
	fn normalize_fills_edge_defaults() {
		let (_, graph) = normalize(sample_chain(), &directory());
		let first = &graph.edges()[0];
		assert_eq!(first.style.stroke, "#ff0000");
		assert_eq!(first.style.stroke_width, 2.0);
		assert_eq!(first.source_handle, "right");
		assert_eq!(first.target_handle, "left");
	}

	#[test]
	fn normalize_derives_previous_status() {
		let (_, graph) = normalize(sample_chain(), &directory());
		assert_eq!(graph.node("1").unwrap().previous_node_status, NodeStatus::Done);
		assert_eq!(graph.node("2").unwrap().previous_node_status, NodeStatus::Done);
		assert_eq!(
			graph.node("4").unwrap().previous_node_status,
			NodeStatus::Processing
		);
	}

	#[test]
	fn chain_payload_merges_local_layout_into_remote_nodes() {
		let (meta, mut graph) = normalize(sample_chain(), &directory());
		graph.move_node("1", Position { x: 55.0, y: 66.0 });
		let mut shop = graph.node("4").unwrap().clone();
		shop.status = NodeStatus::Done;
		graph.insert_node(shop);

		let mut remote = sample_chain().nodes;
		remote[0].name = "Farm (renamed elsewhere)".into();

		let payload = chain_payload(&meta, remote, &graph).unwrap();
		let farm = &payload.nodes[0];
		assert_eq!(farm.id, Some(1));
		assert_eq!(farm.name, "Farm (renamed elsewhere)");
		assert_eq!((farm.x, farm.y), (55.0, 66.0));
		assert_eq!(farm.assigned_user_id, Some(7));
		assert_eq!(payload.nodes[2].status, NodeStatus::Done);
		assert_eq!(payload.nodes[2].assigned_user_id, None);

		let json = serde_json::to_value(&payload.edges[1]).unwrap();
		assert_eq!(json["source"], serde_json::json!({ "id": 2 }));
		assert_eq!(json["target"], serde_json::json!({ "id": 4 }));
		assert_eq!(json["style"]["stroke"], "#555555");
		assert_eq!(json["style"]["strokeWidth"], 2.0);
	}

	#[test]
	fn node_payload_omits_placeholder_id() {
		let (_, graph) = normalize(sample_chain(), &directory());
		let mut node = graph.node("1").unwrap().clone();
		node.id = "-1".into();

		let payload = node_payload(&node).unwrap();
		assert_eq!(payload.id, None);
		assert_eq!(payload.assigned_user_id, Some(7));

		let json = serde_json::to_value(&payload).unwrap();
		assert!(json.get("id").is_none());
		assert_eq!(json["assignedUserId"], 7);
	}

	fn decode_node(value: serde_json::Value) -> WireNode {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn assignee_accepts_nested_and_id_fields_together() {
		let node = decode_node(serde_json::json!({
			"id": 5, "name": "Mill", "role": "supplier",
			"assignedUser": { "id": 7, "username": "mira" },
			"assignedUserId": 7
		}));
		assert_eq!(node.assignee(), Some(WireId::Int(7)));

		let node = node_from_wire(node, &directory());
		assert_eq!(node.assigned_username.as_deref(), Some("mira"));
	}

	#[test]
	fn assignee_falls_back_to_the_id_field() {
		let node = decode_node(serde_json::json!({
			"id": 5, "assignedUser": { "id": null }, "assignedUserId": "7"
		}));
		assert_eq!(node.assignee(), Some(WireId::Str("7".into())));

		let node = decode_node(serde_json::json!({ "id": 6, "assignedUser": { "id": null } }));
		assert_eq!(node.assignee(), None);
		assert_eq!(node_from_wire(node, &directory()).assigned_user, None);
	}

	#[test]
	fn one_odd_assignee_does_not_fail_the_chain() {
		let chain: WireChain = serde_json::from_value(serde_json::json!({
			"id": 1,
			"nodes": [
				{ "id": 1, "assignedUser": { "id": 7 }, "assignedUserId": 7 },
				{ "id": 2, "assignedUser": { "id": null } }
			],
			"edges": [{ "id": 9, "source": { "id": 1 }, "target": { "id": null } }]
		}))
		.unwrap();

		let (_, graph) = normalize(chain, &directory());
		assert_eq!(graph.nodes().len(), 2);
		assert!(graph.visible_edges().next().is_none());
	}

	#[test]
	fn non_numeric_ids_are_rejected() {
		assert!(matches!(parse_id("abc"), Err(EditorError::InvalidId(id)) if id == "abc"));
	}
}
