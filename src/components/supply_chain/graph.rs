use std::collections::HashSet;

use super::types::{NodeStatus, Position, SupplyEdge, SupplyNode};

/// Nodes and edges of one supply chain, in renderer shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SupplyGraph {
	nodes: Vec<SupplyNode>,
	edges: Vec<SupplyEdge>,
}

impl SupplyGraph {
	pub fn new(nodes: Vec<SupplyNode>, edges: Vec<SupplyEdge>) -> Self {
		let mut graph = Self { nodes, edges };
		graph.refresh_previous_statuses();
		graph
	}

	pub fn nodes(&self) -> &[SupplyNode] {
		&self.nodes
	}

	/// All stored edges, including any that point at missing nodes.
	pub fn edges(&self) -> &[SupplyEdge] {
		&self.edges
	}

	pub fn node(&self, id: &str) -> Option<&SupplyNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.nodes.iter().any(|n| n.id == id)
	}

	/// Edges whose endpoints both exist. Dangling edges are skipped silently.
	pub fn visible_edges(&self) -> impl Iterator<Item = &SupplyEdge> + '_ {
		let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		self.edges
			.iter()
			.filter(move |e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
	}

	pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a SupplyEdge> {
		self.edges.iter().filter(move |e| e.touches(node_id))
	}

	pub fn has_edge_between(&self, source: &str, target: &str) -> bool {
		self.edges
			.iter()
			.any(|e| e.source == source && e.target == target)
	}

	/// Nodes without a single incident edge. Any of these blocks a save.
	pub fn orphan_nodes(&self) -> Vec<String> {
		let linked: HashSet<&str> = self
			.visible_edges()
			.flat_map(|e| [e.source.as_str(), e.target.as_str()])
			.collect();
		self.nodes
			.iter()
			.filter(|n| !linked.contains(n.id.as_str()))
			.map(|n| n.id.clone())
			.collect()
	}

	pub fn insert_node(&mut self, node: SupplyNode) {
		match self.nodes.iter_mut().find(|n| n.id == node.id) {
			Some(existing) => *existing = node,
			None => self.nodes.push(node),
		}
		self.refresh_previous_statuses();
	}

	/// Swaps a placeholder node for the one the backend created.
	pub fn replace_node(&mut self, old_id: &str, node: SupplyNode) -> bool {
		let Some(slot) = self.nodes.iter_mut().find(|n| n.id == old_id) else {
			return false;
		};
		let new_id = node.id.clone();
		*slot = node;
		for edge in self.edges.iter_mut() {
			if edge.source == old_id {
				edge.source = new_id.clone();
			}
			if edge.target == old_id {
				edge.target = new_id.clone();
			}
		}
		self.refresh_previous_statuses();
		true
	}

	/// Removes a node together with every edge touching it.
	pub fn remove_node(&mut self, id: &str) -> Option<SupplyNode> {
		let idx = self.nodes.iter().position(|n| n.id == id)?;
		let node = self.nodes.remove(idx);
		self.edges.retain(|e| !e.touches(id));
		self.refresh_previous_statuses();
		Some(node)
	}

	pub fn insert_edge(&mut self, edge: SupplyEdge) {
		self.edges.retain(|e| e.id != edge.id);
		self.edges.push(edge);
		self.refresh_previous_statuses();
	}

	pub fn remove_edge(&mut self, id: &str) -> Option<SupplyEdge> {
		let idx = self.edges.iter().position(|e| e.id == id)?;
		let edge = self.edges.remove(idx);
		self.refresh_previous_statuses();
		Some(edge)
	}

	pub fn move_node(&mut self, id: &str, position: Position) {
		if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
			node.position = position;
		}
	}

	/// Recomputes each node's upstream status from its first incoming edge.
	/// Nodes without a predecessor count as satisfied.
	pub fn refresh_previous_statuses(&mut self) {
		let previous: Vec<NodeStatus> = self
			.nodes
			.iter()
			.map(|node| {
				self.edges
					.iter()
					.filter(|e| e.target == node.id)
					.find_map(|e| self.node(&e.source))
					.map(|upstream| upstream.status)
					.unwrap_or(NodeStatus::Done)
			})
			.collect();
		for (node, status) in self.nodes.iter_mut().zip(previous) {
			node.previous_node_status = status;
		}
	}
}
