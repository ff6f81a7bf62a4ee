use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_params_map;
use log::info;
use web_sys::{DragEvent, MouseEvent};

use crate::components::supply_chain::{
	EditorState, HttpBackend, NodePanel, ROLE_MIME, SupplyChainCanvas, Synchronizer,
};
use crate::config::Config;
use crate::notify::{Notifier, alert, reload_after};
use crate::session::Session;

/// Loads a supply chain by route id and hosts the graph editor.
#[component]
pub fn SupplyChainPage() -> impl IntoView {
	let config = use_context::<Config>().unwrap_or_default();
	let session = use_context::<Session>().unwrap_or_default();
	let notifier = Notifier::new(session.clone(), config.login_path.clone());
	let chain_id = use_params_map()
		.get_untracked()
		.get("id")
		.unwrap_or_default();

	let sync = Synchronizer::new(
		HttpBackend::new(&config.api_base_url, session.token.clone()),
		chain_id,
	);
	let loaded: RwSignal<Option<Result<EditorState, String>>> = RwSignal::new(None);

	{
		let (sync, notifier) = (sync.clone(), notifier.clone());
		spawn_local(async move {
			match sync.load().await {
				Ok(state) => loaded.set(Some(Ok(state))),
				Err(err) => {
					loaded.set(Some(Err(err.to_string())));
					notifier.report("Loading supply chain", &err);
				}
			}
		});
	}

	move || match loaded.get() {
		None => view! { <div class="loading">"Loading supply chain…"</div> }.into_any(),
		Some(Err(message)) => view! {
			<div class="error-banner">
				<h2>"Could not load this supply chain"</h2>
				<p>{message}</p>
			</div>
		}
		.into_any(),
		Some(Ok(state)) => view! {
			<SupplyChainEditor
				initial=state
				sync=sync.clone()
				notifier=notifier.clone()
				reload_delay_ms=config.reload_delay_ms
			/>
		}
		.into_any(),
	}
}

#[component]
fn SupplyChainEditor(
	initial: EditorState,
	sync: Synchronizer<HttpBackend>,
	notifier: Notifier,
	reload_delay_ms: i32,
) -> impl IntoView {
	let editor = RwSignal::new(initial);
	let selected: RwSignal<Option<String>> = RwSignal::new(None);
	let saving = RwSignal::new(false);

	let edit_mode = move || editor.with(|s| s.session.is_edit_mode());
	let exit_blocked = move || {
		editor.with(|s| s.session.is_edit_mode() && s.session.exit_blocker(&s.graph).is_some())
	};

	let on_toggle = {
		let (sync, notifier) = (sync.clone(), notifier.clone());
		move |_: MouseEvent| {
			if saving.get_untracked() {
				return;
			}
			if !editor.with_untracked(|s| s.session.is_edit_mode()) {
				editor.update(|s| s.session.enter_edit_mode());
				return;
			}
			if let Some(blocker) = editor.with_untracked(|s| s.session.exit_blocker(&s.graph)) {
				alert(&blocker.to_string());
				return;
			}
			saving.set(true);
			let mut snapshot = editor.get_untracked();
			let (sync, notifier) = (sync.clone(), notifier.clone());
			spawn_local(async move {
				match sync.exit_edit_mode(&mut snapshot).await {
					Ok(()) => {
						info!("supply chain {} saved, reloading", sync.chain_id());
						reload_after(reload_delay_ms);
					}
					Err(err) => {
						saving.set(false);
						notifier.report("Saving supply chain", &err);
					}
				}
			});
		}
	};

	let palette = move || {
		edit_mode().then(|| {
			let roles = editor.with(|s| s.roles.clone());
			view! {
				<div class="role-palette">
					<span>"Drag onto the canvas:"</span>
					{roles
						.into_iter()
						.map(|role| {
							let payload = role.clone();
							view! {
								<div
									class="palette-item"
									draggable="true"
									on:dragstart=move |ev: DragEvent| {
										if let Some(dt) = ev.data_transfer() {
											let _ = dt.set_data(ROLE_MIME, &payload);
										}
									}
								>
									{role}
								</div>
							}
						})
						.collect_view()}
				</div>
			}
		})
	};

	let (meta_name, meta_description) =
		editor.with_untracked(|s| (s.meta.name.clone(), s.meta.description.clone()));
	let (panel_sync, panel_notifier) = (sync.clone(), notifier.clone());

	view! {
		<div class="supply-chain-editor">
			<header class="editor-toolbar">
				<div>
					<h1>{meta_name}</h1>
					<p class="subtitle">{meta_description}</p>
				</div>
				<button
					class:disabled=exit_blocked
					aria-disabled=move || exit_blocked().to_string()
					on:click=on_toggle
				>
					{move || {
						if saving.get() {
							"Saving…"
						} else if edit_mode() {
							"Exit Edit Mode"
						} else {
							"Enter Edit Mode"
						}
					}}
				</button>
			</header>
			{palette}
			<SupplyChainCanvas editor=editor selected=selected sync=sync notifier=notifier />
			{move || {
				selected
					.get()
					.map(|id| {
						view! {
							<NodePanel
								editor=editor
								selected=selected
								sync=panel_sync.clone()
								notifier=panel_notifier.clone()
								node_id=id
							/>
						}
					})
			}}
			<Show when=move || saving.get()>
				<div class="saving-overlay">"Saving supply chain…"</div>
			</Show>
		</div>
	}
}
