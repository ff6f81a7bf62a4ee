use super::editing::EditSession;
use super::error::EditorError;
use super::graph::SupplyGraph;
use super::sync::NodeDeletion;
use super::types::{ChainMeta, NodeStatus, Position, SupplyEdge, SupplyNode, UserDirectory};

/// Everything one editor session owns: the chain, its graph, the edit state
/// and the lookup data for the inline forms.
#[derive(Clone, Debug)]
pub struct EditorState {
	pub meta: ChainMeta,
	pub graph: SupplyGraph,
	pub session: EditSession,
	pub users: UserDirectory,
	pub roles: Vec<String>,
	next_placeholder: i64,
}

impl EditorState {
	pub fn new(meta: ChainMeta, graph: SupplyGraph, users: UserDirectory, roles: Vec<String>) -> Self {
		Self {
			meta,
			graph,
			session: EditSession::default(),
			users,
			roles,
			next_placeholder: -1,
		}
	}

	/// Drops a new node onto the canvas under a negative id until the backend
	/// assigns a real one.
	pub fn add_placeholder(&mut self, role: &str, position: Position) -> Result<SupplyNode, EditorError> {
		if !self.session.is_edit_mode() {
			return Err(EditorError::EditModeRequired);
		}
		let id = self.next_placeholder;
		self.next_placeholder -= 1;
		let mut node = SupplyNode {
			id: id.to_string(),
			name: format!("New {role}"),
			role: role.to_string(),
			assigned_user: None,
			assigned_username: None,
			status: NodeStatus::Pending,
			position,
			previous_node_status: NodeStatus::Done,
		};
		let mut candidates = self.users.with_role(role);
		if let (Some(only), None) = (candidates.next(), candidates.next()) {
			node.assigned_user = Some(only.id.clone());
			node.assigned_username = Some(only.username.clone());
		}
		self.graph.insert_node(node.clone());
		Ok(node)
	}

	pub fn resolve_placeholder(&mut self, placeholder_id: &str, created: SupplyNode) {
		let created_id = created.id.clone();
		if self.graph.replace_node(placeholder_id, created) {
			self.session.rename(placeholder_id, &created_id);
		}
	}

	pub fn discard_placeholder(&mut self, placeholder_id: &str) {
		self.graph.remove_node(placeholder_id);
		self.session.forget(placeholder_id);
	}

	pub fn incident_edge_ids(&self, node_id: &str) -> Vec<String> {
		self.graph
			.incident_edges(node_id)
			.map(|e| e.id.clone())
			.collect()
	}

	pub fn apply_edge_created(&mut self, edge: SupplyEdge) {
		self.graph.insert_edge(edge);
	}

	pub fn apply_edge_deleted(&mut self, edge_id: &str) {
		self.graph.remove_edge(edge_id);
	}

	/// Mirrors whatever part of a node deletion the backend accepted.
	pub fn apply_node_deletion(&mut self, deletion: &NodeDeletion) {
		for edge_id in &deletion.deleted_edges {
			self.graph.remove_edge(edge_id);
		}
		if deletion.node.is_ok() {
			self.graph.remove_node(&deletion.node_id);
			self.session.forget(&deletion.node_id);
		}
	}

	/// Closes a node save, taking the backend's copy of the node on success.
	pub fn apply_node_saved(&mut self, node_id: &str, saved: Result<SupplyNode, EditorError>) {
		match saved {
			Ok(node) => {
				self.graph.insert_node(node);
				self.session.finish_save(node_id, true);
			}
			Err(_) => self.session.finish_save(node_id, false),
		}
	}
}
