//! Build-time configuration.

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_RELOAD_DELAY_MS: i32 = 800;

/// Settings baked in when the bundle is built.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
	/// Base URL of the supply-chain REST service.
	pub api_base_url: String,
	/// Where an expired session is sent.
	pub login_path: String,
	/// How long the saving indicator stays up before the page reloads.
	pub reload_delay_ms: i32,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			api_base_url: DEFAULT_API_URL.into(),
			login_path: DEFAULT_LOGIN_PATH.into(),
			reload_delay_ms: DEFAULT_RELOAD_DELAY_MS,
		}
	}
}

impl Config {
	/// Reads `SUPPLY_CHAIN_API_URL`, `SUPPLY_CHAIN_LOGIN_PATH` and
	/// `SUPPLY_CHAIN_RELOAD_DELAY_MS` from the build environment.
	pub fn from_env() -> Self {
		Self::from_values(
			option_env!("SUPPLY_CHAIN_API_URL"),
			option_env!("SUPPLY_CHAIN_LOGIN_PATH"),
			option_env!("SUPPLY_CHAIN_RELOAD_DELAY_MS"),
		)
	}

	fn from_values(api: Option<&str>, login: Option<&str>, delay: Option<&str>) -> Self {
		let defaults = Self::default();
		let non_empty = |v: Option<&str>| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
		Self {
			api_base_url: non_empty(api).unwrap_or(defaults.api_base_url),
			login_path: non_empty(login).unwrap_or(defaults.login_path),
			reload_delay_ms: delay
				.and_then(|v| v.trim().parse().ok())
				.filter(|ms: &i32| *ms >= 0)
				.unwrap_or(defaults.reload_delay_ms),
		}
	}
}
