//! Surfacing failures to the user.

use log::error;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

use crate::components::supply_chain::EditorError;
use crate::session::Session;

/// Shows a blocking browser alert.
pub fn alert(message: &str) {
	if let Some(window) = web_sys::window() {
		let _ = window.alert_with_message(message);
	}
}

/// Reloads the page after `delay_ms`, keeping any loading indicator visible
/// at least that long.
pub fn reload_after(delay_ms: i32) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let reload = Closure::once_into_js(|| {
		if let Some(window) = web_sys::window() {
			let _ = window.location().reload();
		}
	});
	let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
		reload.unchecked_ref(),
		delay_ms,
	);
}

/// What the user is shown after an action fails.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
	/// The session was rejected; the user has to log in again.
	SessionExpired,
	Alert(String),
}

impl Notice {
	/// Picks the notice for `err` raised while doing `action`.
	pub fn for_failure(action: &str, err: &EditorError) -> Self {
		if err.is_unauthorized() {
			Notice::SessionExpired
		} else {
			Notice::Alert(format!("{action} failed: {err}"))
		}
	}
}

/// Logs a failed action and tells the user. A rejected session is cleared
/// and the browser sent to the login page.
#[derive(Clone, Debug)]
pub struct Notifier {
	session: Session,
	login_path: String,
}

impl Notifier {
	/// Creates a notifier that expires `session` towards `login_path`.
	pub fn new(session: Session, login_path: impl Into<String>) -> Self {
		Self {
			session,
			login_path: login_path.into(),
		}
	}

	/// Reports `err` raised while doing `action`.
	pub fn report(&self, action: &str, err: &EditorError) {
		error!("{action} failed: {err}");
		match Notice::for_failure(action, err) {
			Notice::SessionExpired => {
				alert("Your session has expired. Please log in again.");
				self.session.expire(&self.login_path);
			}
			Notice::Alert(message) => alert(&message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejected_session_sends_user_to_login() {
		assert_eq!(
			Notice::for_failure("Saving supply chain", &EditorError::Unauthorized),
			Notice::SessionExpired
		);
	}

	#[test]
	fn other_failures_are_alerted_with_context() {
		let err = EditorError::Server {
			status: 500,
			message: "boom".into(),
		};
		assert_eq!(
			Notice::for_failure("Saving supply chain", &err),
			Notice::Alert("Saving supply chain failed: server error 500: boom".into())
		);
		assert_eq!(
			Notice::for_failure("Connecting nodes", &EditorError::NodePending("-1".into())),
			Notice::Alert("Connecting nodes failed: node -1 is still being created".into())
		);
	}
}
