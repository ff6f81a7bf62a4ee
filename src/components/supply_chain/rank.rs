use std::collections::{HashMap, VecDeque};

use super::graph::SupplyGraph;
use super::types::Position;

/// Assigns each node a breadth-first rank, starting from every node that has
/// no incoming edge. Ranks count up from 1 in visitation order and the first
/// assignment wins.
///
/// Nodes only reachable through a cycle with no in-degree-zero member are
/// left out of the result.
pub fn bfs_ranks(graph: &SupplyGraph) -> HashMap<String, usize> {
	let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
	let mut incoming: HashMap<&str, usize> = HashMap::new();
	for node in graph.nodes() {
		outgoing.entry(node.id.as_str()).or_default();
		incoming.entry(node.id.as_str()).or_default();
	}
	for edge in graph.visible_edges() {
		outgoing
			.entry(edge.source.as_str())
			.or_default()
			.push(edge.target.as_str());
		*incoming.entry(edge.target.as_str()).or_default() += 1;
	}

	let mut queue: VecDeque<&str> = graph
		.nodes()
		.iter()
		.map(|n| n.id.as_str())
		.filter(|id| incoming.get(id).copied().unwrap_or(0) == 0)
		.collect();

	let mut ranks = HashMap::new();
	let mut next = 1;
	while let Some(id) = queue.pop_front() {
		if ranks.contains_key(id) {
			continue;
		}
		ranks.insert(id.to_string(), next);
		next += 1;
		for target in outgoing.get(id).into_iter().flatten() {
			if !ranks.contains_key(*target) {
				queue.push_back(*target);
			}
		}
	}
	ranks
}

/// Average position of the ranked nodes, used to centre the initial view.
pub fn camera_center(graph: &SupplyGraph, ranks: &HashMap<String, usize>) -> Option<Position> {
	let ranked: Vec<Position> = graph
		.nodes()
		.iter()
		.filter(|n| ranks.contains_key(&n.id))
		.map(|n| n.position)
		.collect();
	if ranked.is_empty() {
		return None;
	}
	let count = ranked.len() as f64;
	let (sx, sy) = ranked
		.iter()
		.fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
	Some(Position {
		x: sx / count,
		y: sy / count,
	})
}
