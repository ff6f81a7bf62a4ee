use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::editor::EditorState;
use super::state::{
	CanvasState, HANDLE_RADIUS, NODE_HEIGHT, NODE_WIDTH, edge_curve, source_anchor, target_anchor,
};
use super::types::{Position, SupplyNode};

const BACKGROUND: &str = "#f7f8fa";
const NODE_FILL: &str = "#ffffff";
const NODE_BORDER: &str = "#c3c8d0";
const SELECTED_BORDER: &str = "#1f77b4";
const DELETE_HOVER: &str = "#d62728";

pub fn render(
	canvas: &CanvasState,
	editor: &EditorState,
	selected: Option<&str>,
	ctx: &CanvasRenderingContext2d,
) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, canvas.width, canvas.height);
	ctx.save();
	let _ = ctx.translate(canvas.transform.x, canvas.transform.y);
	let _ = ctx.scale(canvas.transform.k, canvas.transform.k);
	let edit_mode = editor.session.is_edit_mode();
	draw_edges(canvas, editor, edit_mode, ctx);
	draw_pending_connection(canvas, editor, ctx);
	for node in editor.graph.nodes() {
		draw_node(node, selected == Some(node.id.as_str()), edit_mode, ctx);
	}
	ctx.restore();
}

fn curve_path(ctx: &CanvasRenderingContext2d, from: Position, to: Position) {
	let [start, c1, c2, end] = edge_curve(from, to);
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, end.x, end.y);
}

fn draw_edges(
	canvas: &CanvasState,
	editor: &EditorState,
	edit_mode: bool,
	ctx: &CanvasRenderingContext2d,
) {
	let graph = &editor.graph;
	for edge in graph.visible_edges() {
		let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target))
		else {
			continue;
		};
		let doomed = edit_mode && canvas.hovered_edge.as_deref() == Some(edge.id.as_str());
		let (stroke, width) = if doomed {
			(DELETE_HOVER, edge.style.stroke_width + 1.0)
		} else {
			(edge.style.stroke.as_str(), edge.style.stroke_width)
		};
		let (from, to) = (source_anchor(source), target_anchor(target));

		ctx.set_stroke_style_str(stroke);
		ctx.set_line_width(width);
		curve_path(ctx, from, to);
		ctx.stroke();

		let arrow = 8.0;
		ctx.set_fill_style_str(stroke);
		ctx.begin_path();
		ctx.move_to(to.x, to.y);
		ctx.line_to(to.x - arrow, to.y - arrow * 0.5);
		ctx.line_to(to.x - arrow, to.y + arrow * 0.5);
		ctx.close_path();
		ctx.fill();
	}
}

fn draw_pending_connection(canvas: &CanvasState, editor: &EditorState, ctx: &CanvasRenderingContext2d) {
	let Some(source) = canvas
		.connect
		.source
		.as_deref()
		.and_then(|id| editor.graph.node(id))
	else {
		return;
	};
	let k = canvas.transform.k;
	ctx.set_stroke_style_str(SELECTED_BORDER);
	ctx.set_line_width(1.5 / k);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(6.0 / k),
		&JsValue::from_f64(4.0 / k),
	));
	curve_path(ctx, source_anchor(source), canvas.connect.cursor);
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_node(node: &SupplyNode, selected: bool, edit_mode: bool, ctx: &CanvasRenderingContext2d) {
	let Position { x, y } = node.position;

	ctx.set_global_alpha(if node.is_placeholder() { 0.5 } else { 1.0 });
	ctx.set_fill_style_str(NODE_FILL);
	ctx.fill_rect(x, y, NODE_WIDTH, NODE_HEIGHT);
	ctx.set_stroke_style_str(if selected { SELECTED_BORDER } else { NODE_BORDER });
	ctx.set_line_width(if selected { 2.5 } else { 1.0 });
	ctx.stroke_rect(x, y, NODE_WIDTH, NODE_HEIGHT);

	// status strip along the left border
	ctx.set_fill_style_str(node.status.color());
	ctx.fill_rect(x, y, 6.0, NODE_HEIGHT);

	ctx.set_fill_style_str("#222");
	ctx.set_font("bold 13px sans-serif");
	let _ = ctx.fill_text(&node.name, x + 14.0, y + 20.0);
	ctx.set_font("11px sans-serif");
	ctx.set_fill_style_str("#555");
	let _ = ctx.fill_text(&node.role, x + 14.0, y + 36.0);
	let assignee = node.assigned_username.as_deref().unwrap_or("unassigned");
	let _ = ctx.fill_text(assignee, x + 14.0, y + 51.0);
	let _ = ctx.fill_text(
		&format!("{} · upstream {}", node.status, node.previous_node_status),
		x + 14.0,
		y + 65.0,
	);

	if edit_mode {
		for anchor in [target_anchor(node), source_anchor(node)] {
			ctx.begin_path();
			let _ = ctx.arc(anchor.x, anchor.y, HANDLE_RADIUS, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(SELECTED_BORDER);
			ctx.fill();
		}
	}
	ctx.set_global_alpha(1.0);
}
