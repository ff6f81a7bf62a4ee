//! The signed-in user, read from browser storage once and handed to the
//! component tree through context.

use log::{info, warn};
use web_sys::Storage;

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";
const ROLE_KEY: &str = "role";

/// Bearer token and identity of the current user.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
	/// Token sent as `Authorization: Bearer` on every backend call.
	pub token: Option<String>,
	/// Display name of the signed-in user.
	pub username: Option<String>,
	/// Participant role of the signed-in user.
	pub role: Option<String>,
}

fn local_storage() -> Option<Storage> {
	web_sys::window()?.local_storage().ok().flatten()
}

impl Session {
	/// Reads the session from `localStorage`. Missing keys stay `None`.
	pub fn load() -> Self {
		let Some(storage) = local_storage() else {
			warn!("localStorage unavailable, continuing without a session");
			return Self::default();
		};
		let read = |key: &str| storage.get_item(key).ok().flatten().filter(|v| !v.is_empty());
		Self {
			token: read(TOKEN_KEY),
			username: read(USER_KEY),
			role: read(ROLE_KEY),
		}
	}

	/// Forgets the stored session and sends the browser to `login_path`.
	pub fn expire(&self, login_path: &str) {
		info!("session expired, redirecting to {login_path}");
		if let Some(storage) = local_storage() {
			for key in [TOKEN_KEY, USER_KEY, ROLE_KEY] {
				let _ = storage.remove_item(key);
			}
		}
		if let Some(window) = web_sys::window() {
			let _ = window.location().set_href(login_path);
		}
	}
}
