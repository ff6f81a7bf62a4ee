use leptos::prelude::*;
use leptos::task::spawn_local;
use log::debug;
use web_sys::MouseEvent;

use super::api::HttpBackend;
use super::editing::{EditPhase, FieldErrors, NodeDraft};
use super::editor::EditorState;
use super::error::EditorError;
use super::sync::Synchronizer;
use super::types::{NodeStatus, SupplyNode, User, UserDirectory};
use crate::notify::Notifier;

#[derive(Clone)]
struct PanelData {
	node: SupplyNode,
	phase: EditPhase,
	draft: Option<NodeDraft>,
	errors: FieldErrors,
	roles: Vec<String>,
	users: Vec<User>,
	edit_mode: bool,
}

fn field_error(message: Option<&'static str>) -> impl IntoView {
	message.map(|m| view! { <span class="field-error">{m}</span> })
}

/// Inline details and edit form for one node.
#[component]
pub fn NodePanel(
	editor: RwSignal<EditorState>,
	selected: RwSignal<Option<String>>,
	sync: Synchronizer<HttpBackend>,
	notifier: Notifier,
	node_id: String,
) -> impl IntoView {
	let id = node_id.clone();
	let snapshot = move || {
		editor.with(|s| {
			let node = s.graph.node(&id)?.clone();
			Some(PanelData {
				phase: s.session.phase(&id),
				draft: s.session.draft(&id).cloned(),
				errors: s.session.errors(&id).cloned().unwrap_or_default(),
				roles: s.roles.clone(),
				users: s.users.users().to_vec(),
				edit_mode: s.session.is_edit_mode(),
				node,
			})
		})
	};

	let on_edit = {
		let id = node_id.clone();
		move |_: MouseEvent| {
			editor.update(|s| {
				if let Some(node) = s.graph.node(&id).cloned() {
					s.session.begin_edit(&node);
				}
			});
		}
	};

	let on_cancel = {
		let id = node_id.clone();
		move |_: MouseEvent| editor.update(|s| s.session.cancel_edit(&id))
	};

	let on_save = {
		let (id, sync, notifier) = (node_id.clone(), sync.clone(), notifier.clone());
		move |_: MouseEvent| {
			let begun = editor.try_update(|s| {
				let draft = s.session.begin_save(&id)?;
				let node = s
					.graph
					.node(&id)
					.cloned()
					.ok_or_else(|| EditorError::InvalidId(id.clone()))?;
				Ok::<_, EditorError>((node, draft, s.users.clone()))
			});
			let (node, draft, users) = match begun {
				Some(Ok(found)) => found,
				// field errors are rendered inline
				Some(Err(EditorError::Validation(_))) | None => return,
				Some(Err(err)) => {
					notifier.report("Saving node", &err);
					return;
				}
			};
			let (id, sync, notifier) = (id.clone(), sync.clone(), notifier.clone());
			spawn_local(async move {
				let saved = sync.save_node(&node, &draft, &users).await;
				if let Err(err) = &saved {
					notifier.report("Saving node", err);
				} else {
					debug!("node {id} saved");
				}
				editor.update(|s| s.apply_node_saved(&id, saved));
			});
		}
	};

	let on_delete = {
		let (id, sync, notifier) = (node_id.clone(), sync.clone(), notifier.clone());
		move |_: MouseEvent| {
			let (session, incident) =
				editor.with_untracked(|s| (s.session.clone(), s.incident_edge_ids(&id)));
			let (id, sync, notifier) = (id.clone(), sync.clone(), notifier.clone());
			spawn_local(async move {
				let deletion = match sync.delete_node(&session, &id, incident).await {
					Ok(deletion) => deletion,
					Err(err) => {
						notifier.report("Deleting node", &err);
						return;
					}
				};
				editor.update(|s| s.apply_node_deletion(&deletion));
				if deletion.node.is_ok() {
					selected.set(None);
				}
				if let Some(err) = deletion.error() {
					notifier.report("Deleting node", err);
				}
			});
		}
	};

	let update_draft = {
		let id = node_id.clone();
		move |change: Box<dyn FnOnce(&mut NodeDraft, &UserDirectory)>| {
			editor.update(|s| {
				let users = s.users.clone();
				s.session.update_draft(&id, |d| change(d, &users));
			});
		}
	};

	move || {
		let Some(data) = snapshot() else {
			return view! { <aside class="node-panel">"Node no longer exists."</aside> }.into_any();
		};
		let node = data.node.clone();

		if node.is_placeholder() {
			return view! {
				<aside class="node-panel">
					<h3>{node.name.clone()}</h3>
					<p>"Creating…"</p>
				</aside>
			}
			.into_any();
		}

		match (data.phase, data.draft.clone()) {
			(EditPhase::Viewing, _) | (_, None) => {
				let (on_edit, on_delete) = (on_edit.clone(), on_delete.clone());
				view! {
					<aside class="node-panel">
						<h3>{node.name.clone()}</h3>
						<dl>
							<dt>"Role"</dt>
							<dd>{node.role.clone()}</dd>
							<dt>"Assigned to"</dt>
							<dd>{node.assigned_username.clone().unwrap_or_else(|| "unassigned".into())}</dd>
							<dt>"Status"</dt>
							<dd>{node.status.to_string()}</dd>
							<dt>"Upstream"</dt>
							<dd>{node.previous_node_status.to_string()}</dd>
						</dl>
						<button on:click=on_edit>"Edit"</button>
						{data
							.edit_mode
							.then(|| {
								view! {
									<button class="danger" on:click=on_delete>
										"Delete"
									</button>
								}
							})}
					</aside>
				}
				.into_any()
			}
			(phase, Some(draft)) => {
				let saving = phase == EditPhase::Saving;
				let errors = data.errors.clone();
				let role_users: Vec<User> = data
					.users
					.iter()
					.filter(|u| u.role == draft.role)
					.cloned()
					.collect();

				let set_name = update_draft.clone();
				let set_role = update_draft.clone();
				let set_user = update_draft.clone();
				let set_status = update_draft.clone();
				let (on_save, on_cancel) = (on_save.clone(), on_cancel.clone());

				view! {
					<aside class="node-panel editing">
						<label>
							"Name"
							<input
								type="text"
								prop:value=draft.name.clone()
								disabled=saving
								on:change=move |ev| {
									let value = event_target_value(&ev);
									set_name(Box::new(move |d: &mut NodeDraft, _: &UserDirectory| d.name = value));
								}
							/>
							{field_error(errors.name)}
						</label>
						<label>
							"Role"
							<select
								disabled=saving
								on:change=move |ev| {
									let value = event_target_value(&ev);
									set_role(Box::new(move |d: &mut NodeDraft, users: &UserDirectory| d.set_role(&value, users)));
								}
							>
								<option value="" selected={draft.role.is_empty()}>"Select a role"</option>
								{data
									.roles
									.iter()
									.map(|role| {
										view! {
											<option value=role.clone() selected={*role == draft.role}>
												{role.clone()}
											</option>
										}
									})
									.collect_view()}
							</select>
							{field_error(errors.role)}
						</label>
						<label>
							"Assigned user"
							<select
								disabled=saving
								on:change=move |ev| {
									let value = event_target_value(&ev);
									set_user(
										Box::new(move |d: &mut NodeDraft, _: &UserDirectory| {
											d.assigned_user = Some(value).filter(|v| !v.is_empty());
										}),
									);
								}
							>
								<option value="" selected={draft.assigned_user.is_none()}>"Select a user"</option>
								{role_users
									.into_iter()
									.map(|user| {
										let chosen = draft.assigned_user.as_deref() == Some(user.id.as_str());
										view! {
											<option value=user.id.clone() selected=chosen>
												{user.username.clone()}
											</option>
										}
									})
									.collect_view()}
							</select>
							{field_error(errors.assigned_user)}
						</label>
						<label>
							"Status"
							<select
								disabled=saving
								on:change=move |ev| {
									let value = event_target_value(&ev);
									if let Some(status) = NodeStatus::parse(&value) {
										set_status(Box::new(move |d: &mut NodeDraft, _: &UserDirectory| d.status = status));
									}
								}
							>
								{NodeStatus::ALL
									.into_iter()
									.map(|status| {
										view! {
											<option value=status.as_str() selected={status == draft.status}>
												{status.as_str()}
											</option>
										}
									})
									.collect_view()}
							</select>
						</label>
						<button on:click=on_save disabled=saving>
							{if saving { "Saving…" } else { "Save" }}
						</button>
						<button on:click=on_cancel disabled=saving>"Cancel"</button>
					</aside>
				}
				.into_any()
			}
		}
	}
}
