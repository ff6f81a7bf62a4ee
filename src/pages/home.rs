use leptos::prelude::*;
use leptos_router::hooks::use_navigate;

use crate::session::Session;

/// Landing page: pick a supply chain to open.
#[component]
pub fn Home() -> impl IntoView {
	let session = use_context::<Session>().unwrap_or_default();
	let (chain_id, set_chain_id) = signal(String::new());
	let navigate = use_navigate();

	let on_submit = move |ev: leptos::ev::SubmitEvent| {
		ev.prevent_default();
		let id = chain_id.get_untracked();
		let id = id.trim();
		if !id.is_empty() {
			navigate(&format!("/supply-chains/{id}"), Default::default());
		}
	};

	view! {
		<div class="home">
			<h1>"Supply chains"</h1>
			<p class="subtitle">
				{session
					.username
					.map(|name| format!("Signed in as {name}"))
					.unwrap_or_else(|| "Not signed in".into())}
			</p>
			<form on:submit=on_submit>
				<label>
					"Supply chain id "
					<input
						type="text"
						prop:value=move || chain_id.get()
						on:input=move |ev| set_chain_id.set(event_target_value(&ev))
					/>
				</label>
				<button type="submit">"Open editor"</button>
			</form>
		</div>
	}
}
