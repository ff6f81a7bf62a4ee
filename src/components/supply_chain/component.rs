use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use leptos::reactive::owner::on_cleanup;
use leptos::task::spawn_local;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, DragEvent, HtmlCanvasElement, MouseEvent, WheelEvent, Window,
};

use super::api::HttpBackend;
use super::editor::EditorState;
use super::rank::{bfs_ranks, camera_center};
use super::render;
use super::state::{CanvasState, Hit, NODE_HEIGHT, NODE_WIDTH};
use super::sync::Synchronizer;
use super::types::Position;
use crate::notify::Notifier;

/// Data transfer type carried by palette entries.
pub const ROLE_MIME: &str = "text/plain";

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

type Callback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Runs `draw` against the current editor and selection. Returns `None` once
/// either signal has been disposed with its page.
fn with_frame<T>(
	editor: RwSignal<EditorState>,
	selected: RwSignal<Option<String>>,
	draw: impl FnOnce(&EditorState, Option<&str>) -> T,
) -> Option<T> {
	let selected = selected.try_get_untracked()?;
	editor.try_with_untracked(|e| draw(e, selected.as_deref()))
}

/// Detaches the resize listener and releases the frame callback after the
/// running frame returns.
fn stop_loop(animate: &Callback, resize: &Callback) {
	let Some(window) = web_sys::window() else {
		return;
	};
	if let Some(cb) = resize.borrow_mut().take() {
		let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
	}
	let animate = animate.clone();
	let release = Closure::once_into_js(move || {
		animate.borrow_mut().take();
	});
	let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(release.unchecked_ref(), 0);
	debug!("canvas loop stopped");
}

fn viewport(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	(dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0))
}

/// Canvas view of a supply chain. Nodes can be dragged, connected, and
/// dropped in from the role palette while edit mode is on; clicking an edge in
/// edit mode deletes it.
#[component]
pub fn SupplyChainCanvas(
	editor: RwSignal<EditorState>,
	selected: RwSignal<Option<String>>,
	sync: Synchronizer<HttpBackend>,
	notifier: Notifier,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let animate: Callback = Rc::new(RefCell::new(None));
	let resize_cb: Callback = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	let mounted = Arc::new(AtomicBool::new(true));
	let mounted_loop = mounted.clone();
	on_cleanup(move || mounted.store(false, Ordering::Relaxed));

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = viewport(&window);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::error!("2d canvas context unavailable");
			return;
		};

		let mut view = CanvasState::new(w, h);
		let center = editor.with_untracked(|s| camera_center(&s.graph, &bfs_ranks(&s.graph)));
		if let Some(center) = center {
			view.center_on(center);
		}
		*state_init.borrow_mut() = Some(view);

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = viewport(&win);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, resize_inner, mounted) = (
			state_init.clone(),
			animate_init.clone(),
			resize_cb_init.clone(),
			mounted_loop.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let drawn = mounted.load(Ordering::Relaxed)
				&& state_anim
					.borrow()
					.as_ref()
					.and_then(|s| with_frame(editor, selected, |e, sel| render::render(s, e, sel, &ctx)))
					.is_some();
			if !drawn {
				stop_loop(&animate_inner, &resize_inner);
				return;
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let (sync_md, notifier_md) = (sync.clone(), notifier.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let edit_mode = editor.with_untracked(|s| s.session.is_edit_mode());
		let mut guard = state_md.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		let hit = editor.with_untracked(|e| s.hit_test(&e.graph, x, y, edit_mode));
		match hit {
			Hit::SourceHandle(id) => {
				s.connect.source = Some(id);
				s.connect.cursor = s.screen_to_graph(x, y);
			}
			Hit::Node(id) | Hit::TargetHandle(id) => {
				if edit_mode {
					if let Some(node) = editor.with_untracked(|e| e.graph.node(&id).cloned()) {
						s.drag.node_id = Some(id.clone());
						s.drag.start_x = x;
						s.drag.start_y = y;
						s.drag.node_start = node.position;
						s.drag.moved = false;
					}
				}
				selected.set(Some(id));
			}
			Hit::Edge(id) if edit_mode => {
				s.hovered_edge = None;
				let (sync, notifier) = (sync_md.clone(), notifier_md.clone());
				let session = editor.with_untracked(|e| e.session.clone());
				spawn_local(async move {
					match sync.delete_edge(&session, &id).await {
						Ok(()) => {
							debug!("deleted edge {id}");
							editor.update(|e| e.apply_edge_deleted(&id));
						}
						Err(err) => notifier.report("Deleting connection", &err),
					}
				});
			}
			Hit::Edge(_) | Hit::Background => {
				selected.set(None);
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let mut guard = state_mm.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};

		if let Some(id) = s.drag.node_id.clone() {
			let (dx, dy) = (
				(x - s.drag.start_x) / s.transform.k,
				(y - s.drag.start_y) / s.transform.k,
			);
			let position = Position {
				x: s.drag.node_start.x + dx,
				y: s.drag.node_start.y + dy,
			};
			s.drag.moved = true;
			editor.update_untracked(|e| e.graph.move_node(&id, position));
		} else if s.connect.source.is_some() {
			s.connect.cursor = s.screen_to_graph(x, y);
		} else if s.pan.active {
			s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
			s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
		} else {
			let edit_mode = editor.with_untracked(|e| e.session.is_edit_mode());
			s.hovered_edge = if edit_mode {
				match editor.with_untracked(|e| s.hit_test(&e.graph, x, y, true)) {
					Hit::Edge(id) => Some(id),
					_ => None,
				}
			} else {
				None
			};
		}
	};

	let state_mu = state.clone();
	let (sync_mu, notifier_mu) = (sync.clone(), notifier.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let mut guard = state_mu.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		if let Some(source) = s.connect.source.take() {
			let target = match editor.with_untracked(|e| s.hit_test(&e.graph, x, y, true)) {
				Hit::Node(id) | Hit::TargetHandle(id) | Hit::SourceHandle(id) => Some(id),
				_ => None,
			};
			if let Some(target) = target {
				let (sync, notifier) = (sync_mu.clone(), notifier_mu.clone());
				let (session, graph) =
					editor.with_untracked(|e| (e.session.clone(), e.graph.clone()));
				spawn_local(async move {
					match sync.create_edge(&session, &graph, &source, &target).await {
						Ok(edge) => editor.update(|e| e.apply_edge_created(edge)),
						Err(err) => notifier.report("Connecting nodes", &err),
					}
				});
			}
		}
		if s.drag.moved {
			// let panels observing the graph pick up the new layout
			editor.update(|_| ());
		}
		s.drag = Default::default();
		s.pan.active = false;
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.reset_pointer();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	let on_dragover = move |ev: DragEvent| {
		if editor.with_untracked(|e| e.session.is_edit_mode()) {
			ev.prevent_default();
		}
	};

	let state_dr = state.clone();
	let on_drop = move |ev: DragEvent| {
		ev.prevent_default();
		let Some(role) = ev
			.data_transfer()
			.and_then(|dt| dt.get_data(ROLE_MIME).ok())
			.filter(|r| !r.is_empty())
		else {
			return;
		};
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let Some(point) = state_dr.borrow().as_ref().map(|s| s.screen_to_graph(x, y)) else {
			return;
		};
		let position = Position {
			x: point.x - NODE_WIDTH / 2.0,
			y: point.y - NODE_HEIGHT / 2.0,
		};
		let placed = match editor.try_update(|e| e.add_placeholder(&role, position)) {
			Some(Ok(node)) => node,
			Some(Err(err)) => {
				notifier.report("Adding node", &err);
				return;
			}
			None => return,
		};
		let (sync, notifier) = (sync.clone(), notifier.clone());
		let users = editor.with_untracked(|e| e.users.clone());
		spawn_local(async move {
			match sync.create_node(&placed, &users).await {
				Ok(created) => {
					debug!("node {} created as {}", placed.id, created.id);
					editor.update(|e| e.resolve_placeholder(&placed.id, created));
				}
				Err(err) => {
					editor.update(|e| e.discard_placeholder(&placed.id));
					notifier.report("Adding node", &err);
				}
			}
		});
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="supply-chain-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:dragover=on_dragover
			on:drop=on_drop
			style="display: block; cursor: grab;"
		/>
	}
}

#[cfg(test)]
mod tests {
	use leptos::reactive::owner::Owner;

	use super::*;
	use crate::components::supply_chain::graph::tests::graph;
	use crate::components::supply_chain::types::{ChainMeta, UserDirectory};

	#[test]
	fn frames_stop_once_the_page_is_gone() {
		let owner = Owner::new();
		let (editor, selected) = owner.with(|| {
			let state = EditorState::new(
				ChainMeta::default(),
				graph(&["1", "2"], &[("10", "1", "2")]),
				UserDirectory::default(),
				Vec::new(),
			);
			(RwSignal::new(state), RwSignal::new(Some("2".to_string())))
		});

		let frame = with_frame(editor, selected, |e, sel| {
			(e.graph.nodes().len(), sel.map(str::to_string))
		});
		assert_eq!(frame, Some((2, Some("2".to_string()))));

		owner.cleanup();
		assert_eq!(with_frame(editor, selected, |e, _| e.graph.nodes().len()), None);
	}
}
