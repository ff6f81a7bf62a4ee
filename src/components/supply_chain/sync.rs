//! Keeps the local graph and the supply-chain service in step.
//!
//! Structural edits (node and edge create/delete, single-node saves) go to the
//! backend immediately. Layout and status changes are persisted in one batch
//! when edit mode is left.

use futures::future::join_all;
use log::{error, info, warn};

use super::api::SupplyChainBackend;
use super::editing::{EditSession, NodeDraft};
use super::editor::EditorState;
use super::error::EditorError;
use super::graph::SupplyGraph;
use super::types::{
	EdgeStyle, SOURCE_HANDLE, SupplyEdge, SupplyNode, TARGET_HANDLE, UserDirectory,
};
use super::wire::{self, parse_id};

/// What the backend accepted while deleting a node and its edges.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDeletion {
	pub node_id: String,
	pub deleted_edges: Vec<String>,
	pub failed_edges: Vec<(String, EditorError)>,
	pub node: Result<(), EditorError>,
}

impl NodeDeletion {
	/// First failure worth showing to the user.
	pub fn error(&self) -> Option<&EditorError> {
		self.node
			.as_ref()
			.err()
			.or_else(|| self.failed_edges.first().map(|(_, e)| e))
	}
}

/// Runs the editor's backend protocol for one chain.
#[derive(Clone, Debug)]
pub struct Synchronizer<B> {
	backend: B,
	chain_id: String,
}

impl<B: SupplyChainBackend> Synchronizer<B> {
	pub fn new(backend: B, chain_id: impl Into<String>) -> Self {
		Self {
			backend,
			chain_id: chain_id.into(),
		}
	}

	pub fn chain_id(&self) -> &str {
		&self.chain_id
	}

	/// Fetches the chain, the user directory and the role list.
	pub async fn load(&self) -> Result<EditorState, EditorError> {
		let chain = self.backend.fetch_chain(&self.chain_id).await?;
		let users = UserDirectory::new(self.backend.list_users().await?);
		let roles = self.backend.list_roles().await?;
		let (meta, graph) = wire::normalize(chain, &users);
		info!(
			"loaded supply chain {} with {} nodes and {} edges",
			meta.id,
			graph.nodes().len(),
			graph.edges().len()
		);
		Ok(EditorState::new(meta, graph, users, roles))
	}

	pub async fn create_node(
		&self,
		placeholder: &SupplyNode,
		users: &UserDirectory,
	) -> Result<SupplyNode, EditorError> {
		let payload = wire::node_payload(placeholder)?;
		let created = self.backend.create_node(&self.chain_id, &payload).await?;
		Ok(wire::node_from_wire(created, users))
	}

	/// Connects `source` to `target`. Self loops, duplicate links, unknown
	/// endpoints and nodes still being created are refused before any request
	/// goes out.
	pub async fn create_edge(
		&self,
		session: &EditSession,
		graph: &SupplyGraph,
		source: &str,
		target: &str,
	) -> Result<SupplyEdge, EditorError> {
		if !session.is_edit_mode() {
			return Err(EditorError::EditModeRequired);
		}
		if source == target {
			return Err(EditorError::SelfLoop);
		}
		if graph.has_edge_between(source, target) {
			return Err(EditorError::DuplicateEdge);
		}
		for id in [source, target] {
			match graph.node(id) {
				None => return Err(EditorError::InvalidId(id.to_string())),
				Some(node) if node.is_placeholder() => {
					return Err(EditorError::NodePending(id.to_string()));
				}
				Some(_) => {}
			}
		}
		let draft = SupplyEdge {
			id: String::new(),
			source: source.to_string(),
			target: target.to_string(),
			source_handle: SOURCE_HANDLE.into(),
			target_handle: TARGET_HANDLE.into(),
			style: EdgeStyle::default(),
		};
		let payload = wire::edge_payload(&draft)?;
		let created = self.backend.create_edge(&self.chain_id, &payload).await?;
		Ok(wire::edge_from_wire(created))
	}

	pub async fn delete_edge(&self, session: &EditSession, edge_id: &str) -> Result<(), EditorError> {
		if !session.is_edit_mode() {
			return Err(EditorError::EditModeRequired);
		}
		self.remove_edge(edge_id).await
	}

	async fn remove_edge(&self, edge_id: &str) -> Result<(), EditorError> {
		self.backend
			.delete_edge(&self.chain_id, parse_id(edge_id)?)
			.await
	}

	/// Deletes every incident edge in parallel, then the node itself. The node
	/// delete is attempted even when some edge deletes failed.
	pub async fn delete_node(
		&self,
		session: &EditSession,
		node_id: &str,
		incident_edges: Vec<String>,
	) -> Result<NodeDeletion, EditorError> {
		if !session.is_edit_mode() {
			return Err(EditorError::EditModeRequired);
		}
		let results = join_all(incident_edges.iter().map(|id| self.remove_edge(id))).await;

		let mut deleted_edges = Vec::new();
		let mut failed_edges = Vec::new();
		for (id, result) in incident_edges.into_iter().zip(results) {
			match result {
				Ok(()) => deleted_edges.push(id),
				Err(err) => {
					warn!("could not delete edge {id} of node {node_id}: {err}");
					failed_edges.push((id, err));
				}
			}
		}

		let node = match parse_id(node_id) {
			Ok(id) => self.backend.delete_node(&self.chain_id, id).await,
			Err(err) => Err(err),
		};
		if let Err(err) = &node {
			error!("could not delete node {node_id}: {err}");
		}
		Ok(NodeDeletion {
			node_id: node_id.to_string(),
			deleted_edges,
			failed_edges,
			node,
		})
	}

	/// Sends one node's draft to the backend and returns the stored node.
	pub async fn save_node(
		&self,
		node: &SupplyNode,
		draft: &NodeDraft,
		users: &UserDirectory,
	) -> Result<SupplyNode, EditorError> {
		let updated = draft.apply_to(node, users);
		let payload = wire::node_payload(&updated)?;
		let saved = self
			.backend
			.update_node(&self.chain_id, parse_id(&node.id)?, &payload)
			.await
			.inspect_err(|err| error!("saving node {} failed: {err}", node.id))?;
		let mut saved = wire::node_from_wire(saved, users);
		saved.previous_node_status = node.previous_node_status;
		Ok(saved)
	}

	/// Persists positions, statuses and edges in one request.
	///
	/// Refused without a request while a node form is open or any node is
	/// unconnected. The node list is re-fetched first so fields edited
	/// elsewhere are not overwritten by stale local copies.
	pub async fn save_graph(&self, state: &EditorState) -> Result<(), EditorError> {
		if let Some(blocker) = state.session.exit_blocker(&state.graph) {
			return Err(blocker);
		}
		let current = self.backend.fetch_chain(&self.chain_id).await?;
		let payload = wire::chain_payload(&state.meta, current.nodes, &state.graph)?;
		self.backend
			.replace_chain(&self.chain_id, &payload)
			.await
			.inspect_err(|err| error!("saving supply chain {} failed: {err}", self.chain_id))?;
		info!(
			"saved supply chain {} ({} nodes, {} edges)",
			self.chain_id,
			payload.nodes.len(),
			payload.edges.len()
		);
		Ok(())
	}

	/// Saves the whole graph and leaves edit mode. Edit mode stays on if
	/// anything fails.
	pub async fn exit_edit_mode(&self, state: &mut EditorState) -> Result<(), EditorError> {
		self.save_graph(state).await?;
		state.session.exit_edit_mode(&state.graph)
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::collections::HashSet;

	use async_trait::async_trait;
	use futures::executor::block_on;

	use super::*;
	use crate::components::supply_chain::editing::EditPhase;
	use crate::components::supply_chain::types::{NodeStatus, Position, User};
	use crate::components::supply_chain::wire::{
		ChainPayload, EdgePayload, NodePayload, WireChain, WireEdge, WireNode,
	};

	#[derive(Default)]
	struct MockBackend {
		chain: RefCell<Option<WireChain>>,
		calls: RefCell<Vec<String>>,
		saved: RefCell<Option<ChainPayload>>,
		failing_edges: HashSet<i64>,
		next_id: RefCell<i64>,
	}

	impl MockBackend {
		fn with_chain(value: serde_json::Value) -> Self {
			Self {
				chain: RefCell::new(Some(serde_json::from_value(value).unwrap())),
				next_id: RefCell::new(100),
				..Self::default()
			}
		}

		fn record(&self, call: String) {
			self.calls.borrow_mut().push(call);
		}

		fn calls(&self) -> Vec<String> {
			self.calls.borrow().clone()
		}

		fn fresh_id(&self) -> i64 {
			let mut next = self.next_id.borrow_mut();
			*next += 1;
			*next
		}
	}

	#[async_trait(?Send)]
	impl SupplyChainBackend for MockBackend {
		async fn fetch_chain(&self, chain_id: &str) -> Result<WireChain, EditorError> {
			self.record(format!("GET chain {chain_id}"));
			self.chain
				.borrow()
				.clone()
				.ok_or(EditorError::Server {
					status: 404,
					message: "missing".into(),
				})
		}

		async fn replace_chain(&self, chain_id: &str, payload: &ChainPayload) -> Result<(), EditorError> {
			self.record(format!("PUT chain {chain_id}"));
			*self.saved.borrow_mut() = Some(payload.clone());
			Ok(())
		}

		async fn create_node(&self, _: &str, payload: &NodePayload) -> Result<WireNode, EditorError> {
			self.record("POST node".into());
			let value = serde_json::json!({
				"id": self.fresh_id(),
				"name": payload.name,
				"role": payload.role,
				"x": payload.x,
				"y": payload.y,
				"status": payload.status,
				"assignedUser": payload.assigned_user_id,
			});
			serde_json::from_value(value).map_err(|e| EditorError::Decode(e.to_string()))
		}

		async fn update_node(
			&self,
			_: &str,
			node_id: i64,
			payload: &NodePayload,
		) -> Result<WireNode, EditorError> {
			self.record(format!("PUT node {node_id}"));
			let value = serde_json::json!({
				"id": node_id,
				"name": payload.name,
				"role": payload.role,
				"x": payload.x,
				"y": payload.y,
				"status": payload.status,
				"assignedUser": { "id": payload.assigned_user_id },
			});
			serde_json::from_value(value).map_err(|e| EditorError::Decode(e.to_string()))
		}

		async fn delete_node(&self, _: &str, node_id: i64) -> Result<(), EditorError> {
			self.record(format!("DELETE node {node_id}"));
			Ok(())
		}

		async fn create_edge(&self, _: &str, payload: &EdgePayload) -> Result<WireEdge, EditorError> {
			self.record("POST edge".into());
			let value = serde_json::json!({
				"id": self.fresh_id(),
				"source": { "id": payload.source.id },
				"target": { "id": payload.target.id },
				"sourceHandle": payload.source_handle,
				"targetHandle": payload.target_handle,
			});
			serde_json::from_value(value).map_err(|e| EditorError::Decode(e.to_string()))
		}

		async fn delete_edge(&self, _: &str, edge_id: i64) -> Result<(), EditorError> {
			self.record(format!("DELETE edge {edge_id}"));
			if self.failing_edges.contains(&edge_id) {
				return Err(EditorError::Network("connection reset".into()));
			}
			Ok(())
		}

		async fn list_users(&self) -> Result<Vec<User>, EditorError> {
			Ok(vec![
				User {
					id: "7".into(),
					username: "mira".into(),
					role: "supplier".into(),
				},
				User {
					id: "8".into(),
					username: "otto".into(),
					role: "distributor".into(),
				},
			])
		}

		async fn list_roles(&self) -> Result<Vec<String>, EditorError> {
			Ok(vec!["supplier".into(), "distributor".into()])
		}
	}

	fn chain_json() -> serde_json::Value {
		serde_json::json!({
			"id": 1,
			"name": "Grain",
			"description": "Field to shelf",
			"nodes": [
				{ "id": 1, "name": "Farm", "role": "supplier", "x": 0.0, "y": 0.0,
				  "status": "done", "assignedUser": { "id": 7 } },
				{ "id": 2, "name": "Mill", "role": "supplier", "x": 200.0, "y": 0.0,
				  "status": "processing", "assignedUser": 7 },
				{ "id": 3, "name": "Depot", "role": "distributor", "x": 400.0, "y": 0.0,
				  "status": "pending", "assignedUser": 8 }
			],
			"edges": [
				{ "id": 10, "source": { "id": 1 }, "target": { "id": 2 } },
				{ "id": 11, "source": { "id": 2 }, "target": { "id": 3 } }
			]
		})
	}

	fn synchronizer(backend: MockBackend) -> Synchronizer<MockBackend> {
		Synchronizer::new(backend, "1")
	}

	#[test]
	fn load_normalizes_the_chain() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let state = block_on(sync.load()).unwrap();

		assert_eq!(state.meta.name, "Grain");
		assert_eq!(state.graph.nodes().len(), 3);
		assert_eq!(state.roles, ["supplier", "distributor"]);
		assert_eq!(
			state.graph.node("3").unwrap().assigned_username.as_deref(),
			Some("otto")
		);
		assert_eq!(
			state.graph.node("3").unwrap().previous_node_status,
			NodeStatus::Processing
		);
	}

	#[test]
	fn exit_edit_mode_saves_connected_graph() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();
		state.graph.move_node("3", Position { x: 420.0, y: 80.0 });

		block_on(sync.exit_edit_mode(&mut state)).unwrap();

		assert!(!state.session.is_edit_mode());
		assert_eq!(sync.backend.calls(), ["GET chain 1", "GET chain 1", "PUT chain 1"]);
		let saved = sync.backend.saved.borrow().clone().unwrap();
		assert_eq!(saved.description, "Field to shelf");
		assert_eq!((saved.nodes[2].x, saved.nodes[2].y), (420.0, 80.0));
		assert_eq!(saved.edges.len(), 2);
	}

	#[test]
	fn exit_edit_mode_is_blocked_by_orphans() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();
		state
			.add_placeholder("supplier", Position { x: 50.0, y: 50.0 })
			.unwrap();
		let calls_before = sync.backend.calls().len();

		let err = block_on(sync.exit_edit_mode(&mut state)).unwrap_err();

		assert_eq!(err, EditorError::OrphanNodes(vec!["-1".into()]));
		assert!(state.session.is_edit_mode());
		assert_eq!(sync.backend.calls().len(), calls_before);
	}

	#[test]
	fn deleting_a_node_removes_its_edges_first() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();

		let incident = state.incident_edge_ids("2");
		let deletion = block_on(sync.delete_node(&state.session, "2", incident)).unwrap();
		state.apply_node_deletion(&deletion);

		assert_eq!(deletion.error(), None);
		assert!(state.graph.edges().iter().all(|e| !e.touches("2")));
		assert!(!state.graph.contains_node("2"));
		let deletes: Vec<_> = sync
			.backend
			.calls()
			.into_iter()
			.filter(|c| c.starts_with("DELETE"))
			.collect();
		assert_eq!(deletes, ["DELETE edge 10", "DELETE edge 11", "DELETE node 2"]);
	}

	#[test]
	fn node_delete_still_runs_when_an_edge_delete_fails() {
		let mut backend = MockBackend::with_chain(chain_json());
		backend.failing_edges.insert(11);
		let sync = synchronizer(backend);
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();

		let incident = state.incident_edge_ids("2");
		let deletion = block_on(sync.delete_node(&state.session, "2", incident)).unwrap();
		state.apply_node_deletion(&deletion);

		assert_eq!(deletion.deleted_edges, ["10"]);
		assert_eq!(deletion.failed_edges.len(), 1);
		assert!(deletion.node.is_ok());
		assert!(matches!(deletion.error(), Some(EditorError::Network(_))));
		assert!(!state.graph.contains_node("2"));
		assert!(state.graph.visible_edges().next().is_none());
	}

	#[test]
	fn invalid_node_save_never_reaches_the_backend() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		let node = state.graph.node("2").unwrap().clone();
		state.session.begin_edit(&node);
		state.session.update_draft("2", |d| d.assigned_user = None);
		let calls_before = sync.backend.calls().len();

		let err = state.session.begin_save("2").unwrap_err();

		assert!(matches!(err, EditorError::Validation(_)));
		assert_eq!(state.session.phase("2"), EditPhase::Editing);
		assert_eq!(sync.backend.calls().len(), calls_before);
	}

	#[test]
	fn node_save_takes_the_backend_copy() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		let node = state.graph.node("3").unwrap().clone();
		state.session.begin_edit(&node);
		state.session.update_draft("3", |d| {
			d.name = "Central depot".into();
			d.status = NodeStatus::Processing;
		});

		let draft = state.session.begin_save("3").unwrap();
		let saved = block_on(sync.save_node(&node, &draft, &state.users));
		state.apply_node_saved("3", saved);

		let stored = state.graph.node("3").unwrap();
		assert_eq!(stored.name, "Central depot");
		assert_eq!(stored.status, NodeStatus::Processing);
		assert_eq!(stored.assigned_username.as_deref(), Some("otto"));
		assert_eq!(state.session.phase("3"), EditPhase::Viewing);
		assert!(sync.backend.calls().contains(&"PUT node 3".to_string()));
	}

	#[test]
	fn dropped_node_replaces_its_placeholder() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();

		let placeholder = state
			.add_placeholder("distributor", Position { x: 10.0, y: 300.0 })
			.unwrap();
		assert!(placeholder.is_placeholder());
		assert_eq!(placeholder.assigned_user.as_deref(), Some("8"));

		let created = block_on(sync.create_node(&placeholder, &state.users)).unwrap();
		state.resolve_placeholder(&placeholder.id, created);

		assert!(!state.graph.contains_node(&placeholder.id));
		let node = state.graph.node("101").unwrap();
		assert_eq!(node.name, "New distributor");
		assert_eq!(node.position, Position { x: 10.0, y: 300.0 });
	}

	#[test]
	fn placeholders_need_edit_mode() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		assert_eq!(
			state.add_placeholder("supplier", Position::default()),
			Err(EditorError::EditModeRequired)
		);
	}

	#[test]
	fn connections_are_checked_locally() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();

		assert_eq!(
			block_on(sync.create_edge(&state.session, &state.graph, "1", "1")),
			Err(EditorError::SelfLoop)
		);
		assert_eq!(
			block_on(sync.create_edge(&state.session, &state.graph, "1", "2")),
			Err(EditorError::DuplicateEdge)
		);
		assert!(!sync.backend.calls().contains(&"POST edge".to_string()));

		let edge = block_on(sync.create_edge(&state.session, &state.graph, "1", "3")).unwrap();
		state.apply_edge_created(edge.clone());
		assert_eq!((edge.source.as_str(), edge.target.as_str()), ("1", "3"));
		assert_eq!(edge.source_handle, "right");
		assert_eq!(state.graph.edges().len(), 3);

		block_on(sync.delete_edge(&state.session, &edge.id)).unwrap();
		state.apply_edge_deleted(&edge.id);
		assert_eq!(state.graph.edges().len(), 2);
	}

	#[test]
	fn nodes_awaiting_an_id_cannot_be_connected() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let mut state = block_on(sync.load()).unwrap();
		state.session.enter_edit_mode();
		let placeholder = state
			.add_placeholder("supplier", Position { x: 10.0, y: 300.0 })
			.unwrap();

		assert_eq!(
			block_on(sync.create_edge(&state.session, &state.graph, &placeholder.id, "3")),
			Err(EditorError::NodePending(placeholder.id.clone()))
		);
		assert_eq!(
			block_on(sync.create_edge(&state.session, &state.graph, "1", &placeholder.id)),
			Err(EditorError::NodePending(placeholder.id.clone()))
		);
		assert!(!sync.backend.calls().contains(&"POST edge".to_string()));
	}

	#[test]
	fn structural_edits_need_edit_mode() {
		let sync = synchronizer(MockBackend::with_chain(chain_json()));
		let state = block_on(sync.load()).unwrap();
		let calls_before = sync.backend.calls().len();

		assert_eq!(
			block_on(sync.create_edge(&state.session, &state.graph, "1", "3")),
			Err(EditorError::EditModeRequired)
		);
		assert_eq!(
			block_on(sync.delete_edge(&state.session, "10")),
			Err(EditorError::EditModeRequired)
		);
		assert_eq!(
			block_on(sync.delete_node(&state.session, "2", state.incident_edge_ids("2"))),
			Err(EditorError::EditModeRequired)
		);
		assert_eq!(sync.backend.calls().len(), calls_before);
		assert!(state.graph.contains_node("2"));
	}
}
