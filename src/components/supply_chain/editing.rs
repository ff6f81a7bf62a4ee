//! Per-node edit state and the global edit-mode gate.

use std::collections::HashMap;
use std::fmt;

use super::error::EditorError;
use super::graph::SupplyGraph;
use super::types::{NodeStatus, SupplyNode, UserDirectory};

/// Field values of a node while its inline form is open.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeDraft {
	pub name: String,
	pub role: String,
	pub assigned_user: Option<String>,
	pub status: NodeStatus,
}

impl NodeDraft {
	pub fn from_node(node: &SupplyNode) -> Self {
		Self {
			name: node.name.clone(),
			role: node.role.clone(),
			assigned_user: node.assigned_user.clone(),
			status: node.status,
		}
	}

	/// Switches role. The assignee is cleared unless exactly one user holds
	/// the new role, in which case that user is picked.
	pub fn set_role(&mut self, role: &str, users: &UserDirectory) {
		self.role = role.to_string();
		let mut candidates = users.with_role(role);
		self.assigned_user = match (candidates.next(), candidates.next()) {
			(Some(only), None) => Some(only.id.clone()),
			_ => None,
		};
	}

	pub fn validate(&self) -> Result<(), FieldErrors> {
		let mut errors = FieldErrors::default();
		if self.name.trim().is_empty() {
			errors.name = Some("Name is required");
		}
		if self.role.trim().is_empty() {
			errors.role = Some("Role is required");
		}
		if self.assigned_user.as_deref().is_none_or(|u| u.trim().is_empty()) {
			errors.assigned_user = Some("Assigned user is required");
		}
		if errors.is_empty() { Ok(()) } else { Err(errors) }
	}

	/// The node as it would look with this draft applied.
	pub fn apply_to(&self, node: &SupplyNode, users: &UserDirectory) -> SupplyNode {
		let assigned_username = self
			.assigned_user
			.as_deref()
			.and_then(|id| users.username(id))
			.map(str::to_string);
		SupplyNode {
			name: self.name.trim().to_string(),
			role: self.role.clone(),
			assigned_user: self.assigned_user.clone(),
			assigned_username,
			status: self.status,
			..node.clone()
		}
	}
}

/// Field-level validation messages.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldErrors {
	pub name: Option<&'static str>,
	pub role: Option<&'static str>,
	pub assigned_user: Option<&'static str>,
}

impl FieldErrors {
	pub fn is_empty(&self) -> bool {
		self.name.is_none() && self.role.is_none() && self.assigned_user.is_none()
	}
}

impl fmt::Display for FieldErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let messages: Vec<&str> = [self.name, self.role, self.assigned_user]
			.into_iter()
			.flatten()
			.collect();
		f.write_str(&messages.join("; "))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditPhase {
	Viewing,
	Editing,
	Saving,
}

#[derive(Clone, Debug, PartialEq)]
enum NodeEditState {
	Editing { draft: NodeDraft, errors: FieldErrors },
	Saving { draft: NodeDraft },
}

/// Global edit mode plus the edit state of every node that is not viewing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditSession {
	edit_mode: bool,
	nodes: HashMap<String, NodeEditState>,
}

impl EditSession {
	pub fn is_edit_mode(&self) -> bool {
		self.edit_mode
	}

	pub fn enter_edit_mode(&mut self) {
		self.edit_mode = true;
	}

	pub fn phase(&self, node_id: &str) -> EditPhase {
		match self.nodes.get(node_id) {
			None => EditPhase::Viewing,
			Some(NodeEditState::Editing { .. }) => EditPhase::Editing,
			Some(NodeEditState::Saving { .. }) => EditPhase::Saving,
		}
	}

	pub fn draft(&self, node_id: &str) -> Option<&NodeDraft> {
		match self.nodes.get(node_id)? {
			NodeEditState::Editing { draft, .. } | NodeEditState::Saving { draft } => Some(draft),
		}
	}

	pub fn errors(&self, node_id: &str) -> Option<&FieldErrors> {
		match self.nodes.get(node_id)? {
			NodeEditState::Editing { errors, .. } => Some(errors),
			NodeEditState::Saving { .. } => None,
		}
	}

	/// Opens the inline form. Returns false if the node is not viewing.
	pub fn begin_edit(&mut self, node: &SupplyNode) -> bool {
		if self.nodes.contains_key(&node.id) {
			return false;
		}
		self.nodes.insert(
			node.id.clone(),
			NodeEditState::Editing {
				draft: NodeDraft::from_node(node),
				errors: FieldErrors::default(),
			},
		);
		true
	}

	pub fn update_draft(&mut self, node_id: &str, update: impl FnOnce(&mut NodeDraft)) {
		if let Some(NodeEditState::Editing { draft, .. }) = self.nodes.get_mut(node_id) {
			update(draft);
		}
	}

	pub fn cancel_edit(&mut self, node_id: &str) {
		if let Some(NodeEditState::Editing { .. }) = self.nodes.get(node_id) {
			self.nodes.remove(node_id);
		}
	}

	/// Validates the draft and moves the node to saving. On a validation
	/// failure the node stays in editing with its field errors set.
	pub fn begin_save(&mut self, node_id: &str) -> Result<NodeDraft, EditorError> {
		let Some(NodeEditState::Editing { draft, errors }) = self.nodes.get_mut(node_id) else {
			return Err(EditorError::NodeMidEdit(node_id.to_string()));
		};
		if let Err(invalid) = draft.validate() {
			*errors = invalid.clone();
			return Err(EditorError::Validation(invalid));
		}
		let draft = draft.clone();
		self.nodes.insert(
			node_id.to_string(),
			NodeEditState::Saving {
				draft: draft.clone(),
			},
		);
		Ok(draft)
	}

	/// Leaves saving: back to viewing on success, back to editing otherwise.
	pub fn finish_save(&mut self, node_id: &str, saved: bool) {
		let Some(NodeEditState::Saving { draft }) = self.nodes.remove(node_id) else {
			return;
		};
		if !saved {
			self.nodes.insert(
				node_id.to_string(),
				NodeEditState::Editing {
					draft,
					errors: FieldErrors::default(),
				},
			);
		}
	}

	/// Moves any edit state from a placeholder id to its backend id.
	pub fn rename(&mut self, old_id: &str, new_id: &str) {
		if let Some(state) = self.nodes.remove(old_id) {
			self.nodes.insert(new_id.to_string(), state);
		}
	}

	pub fn forget(&mut self, node_id: &str) {
		self.nodes.remove(node_id);
	}

	pub fn node_mid_edit(&self) -> Option<&str> {
		self.nodes.keys().map(String::as_str).min()
	}

	/// Why edit mode cannot be left right now, if anything.
	pub fn exit_blocker(&self, graph: &SupplyGraph) -> Option<EditorError> {
		if let Some(id) = self.node_mid_edit() {
			return Some(EditorError::NodeMidEdit(id.to_string()));
		}
		let orphans = graph.orphan_nodes();
		if !orphans.is_empty() {
			return Some(EditorError::OrphanNodes(orphans));
		}
		None
	}

	/// Leaves edit mode once nothing blocks it.
	pub fn exit_edit_mode(&mut self, graph: &SupplyGraph) -> Result<(), EditorError> {
		if let Some(blocker) = self.exit_blocker(graph) {
			return Err(blocker);
		}
		self.edit_mode = false;
		Ok(())
	}
}
