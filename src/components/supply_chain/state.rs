use super::graph::SupplyGraph;
use super::types::{Position, SupplyNode};

pub const NODE_WIDTH: f64 = 180.0;
pub const NODE_HEIGHT: f64 = 72.0;
pub const HANDLE_RADIUS: f64 = 6.0;
pub const HANDLE_HIT: f64 = 10.0;
pub const EDGE_HIT: f64 = 6.0;
const EDGE_SAMPLES: usize = 24;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node_id: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Position,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// A connection being dragged out of a source handle.
#[derive(Clone, Debug, Default)]
pub struct ConnectState {
	pub source: Option<String>,
	pub cursor: Position,
}

/// What sits under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum Hit {
	SourceHandle(String),
	TargetHandle(String),
	Node(String),
	Edge(String),
	Background,
}

pub fn source_anchor(node: &SupplyNode) -> Position {
	Position {
		x: node.position.x + NODE_WIDTH,
		y: node.position.y + NODE_HEIGHT / 2.0,
	}
}

pub fn target_anchor(node: &SupplyNode) -> Position {
	Position {
		x: node.position.x,
		y: node.position.y + NODE_HEIGHT / 2.0,
	}
}

/// Control points of the curve drawn between two anchors.
pub fn edge_curve(from: Position, to: Position) -> [Position; 4] {
	let bend = ((to.x - from.x).abs() / 2.0).max(50.0);
	[
		from,
		Position {
			x: from.x + bend,
			y: from.y,
		},
		Position {
			x: to.x - bend,
			y: to.y,
		},
		to,
	]
}

fn bezier_point(c: &[Position; 4], t: f64) -> Position {
	let u = 1.0 - t;
	let (a, b, cc, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
	Position {
		x: a * c[0].x + b * c[1].x + cc * c[2].x + d * c[3].x,
		y: a * c[0].y + b * c[1].y + cc * c[2].y + d * c[3].y,
	}
}

fn segment_distance(p: Position, a: Position, b: Position) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len2 = dx * dx + dy * dy;
	let t = if len2 == 0.0 {
		0.0
	} else {
		(((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
	};
	let (cx, cy) = (a.x + t * dx - p.x, a.y + t * dy - p.y);
	(cx * cx + cy * cy).sqrt()
}

fn near(a: Position, b: Position, radius: f64) -> bool {
	let (dx, dy) = (a.x - b.x, a.y - b.y);
	(dx * dx + dy * dy).sqrt() <= radius
}

/// Pan/zoom and pointer interaction state of the editor canvas.
pub struct CanvasState {
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub connect: ConnectState,
	pub hovered_edge: Option<String>,
	pub width: f64,
	pub height: f64,
}

impl CanvasState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			connect: ConnectState::default(),
			hovered_edge: None,
			width,
			height,
		}
	}

	/// Puts the middle of a node box at `center` in the middle of the view.
	pub fn center_on(&mut self, center: Position) {
		self.transform.x = self.width / 2.0 - (center.x + NODE_WIDTH / 2.0) * self.transform.k;
		self.transform.y = self.height / 2.0 - (center.y + NODE_HEIGHT / 2.0) * self.transform.k;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		Position {
			x: (sx - self.transform.x) / self.transform.k,
			y: (sy - self.transform.y) / self.transform.k,
		}
	}

	/// Finds what is under a screen point. Handles only count in edit mode.
	pub fn hit_test(&self, graph: &SupplyGraph, sx: f64, sy: f64, edit_mode: bool) -> Hit {
		let p = self.screen_to_graph(sx, sy);
		let handle_radius = HANDLE_HIT / self.transform.k.max(0.5);

		// topmost node wins, nodes are drawn in list order
		for node in graph.nodes().iter().rev() {
			if edit_mode {
				if near(p, source_anchor(node), handle_radius) {
					return Hit::SourceHandle(node.id.clone());
				}
				if near(p, target_anchor(node), handle_radius) {
					return Hit::TargetHandle(node.id.clone());
				}
			}
			let Position { x, y } = node.position;
			if p.x >= x && p.x <= x + NODE_WIDTH && p.y >= y && p.y <= y + NODE_HEIGHT {
				return Hit::Node(node.id.clone());
			}
		}

		let edge_radius = EDGE_HIT / self.transform.k;
		for edge in graph.visible_edges() {
			let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
			else {
				continue;
			};
			let curve = edge_curve(source_anchor(source), target_anchor(target));
			let mut prev = curve[0];
			for i in 1..=EDGE_SAMPLES {
				let next = bezier_point(&curve, i as f64 / EDGE_SAMPLES as f64);
				if segment_distance(p, prev, next) <= edge_radius {
					return Hit::Edge(edge.id.clone());
				}
				prev = next;
			}
		}
		Hit::Background
	}

	pub fn reset_pointer(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.connect = ConnectState::default();
		self.hovered_edge = None;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::supply_chain::graph::tests::graph;

	fn laid_out() -> SupplyGraph {
		let mut g = graph(&["a", "b"], &[("1", "a", "b")]);
		g.move_node("a", Position { x: 0.0, y: 0.0 });
		g.move_node("b", Position { x: 400.0, y: 0.0 });
		g
	}

	#[test]
	fn hits_nodes_and_handles() {
		let g = laid_out();
		let canvas = CanvasState::new(800.0, 600.0);

		assert_eq!(canvas.hit_test(&g, 90.0, 36.0, false), Hit::Node("a".into()));
		assert_eq!(
			canvas.hit_test(&g, 180.0, 36.0, true),
			Hit::SourceHandle("a".into())
		);
		assert_eq!(
			canvas.hit_test(&g, 400.0, 36.0, true),
			Hit::TargetHandle("b".into())
		);
		assert_eq!(canvas.hit_test(&g, 400.0, 36.0, false), Hit::Node("b".into()));
	}

	#[test]
	fn hits_edges_between_nodes() {
		let g = laid_out();
		let canvas = CanvasState::new(800.0, 600.0);

		assert_eq!(canvas.hit_test(&g, 290.0, 36.0, true), Hit::Edge("1".into()));
		assert_eq!(canvas.hit_test(&g, 290.0, 200.0, true), Hit::Background);
	}

	#[test]
	fn centering_respects_zoom() {
		let mut canvas = CanvasState::new(800.0, 600.0);
		canvas.transform.k = 2.0;
		canvas.center_on(Position { x: 10.0, y: 20.0 });

		let mid = canvas.screen_to_graph(400.0, 300.0);
		assert_eq!(mid.x, 10.0 + NODE_WIDTH / 2.0);
		assert_eq!(mid.y, 20.0 + NODE_HEIGHT / 2.0);
	}
}
