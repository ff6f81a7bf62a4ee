use leptos::prelude::*;

/// 404 page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<h1>"Page not found"</h1>
		<a href="/">"Back to supply chains"</a>
	}
}
