#![forbid(unsafe_code)]

use bollard_sdk::SdkConfig;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default)]
pub struct Overrides {
	pub base_url: Option<String>,
	pub token: Option<String>,
	pub timeout_ms: Option<u64>,
}

pub struct Discovered {
	pub config: SdkConfig,
	/// Config file that contributed, if any.
	pub source: Option<PathBuf>,
}

/// Defaults, then the first readable config file, then `BOLLARD_*`
/// environment, then flags.
pub fn auto_discover(overrides: &Overrides) -> bollard_sdk::Result<Discovered> {
	let (mut config, source) = match load_file_config() {
		Some((cfg, path)) => (cfg, Some(path)),
		None => (SdkConfig::default(), None),
	};
	config.apply_env()?;
	if let Some(url) = overrides.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
		config.base_url = url.to_string();
	}
	if let Some(tok) = overrides.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
		config.token = Some(tok.to_string());
	}
	if let Some(ms) = overrides.timeout_ms {
		config.request_timeout_ms = ms;
	}
	Ok(Discovered { config, source })
}

/// Search order: `$BOLLARD_CONFIG`, `./bollard.toml`, then the user config
/// directory.
pub fn candidate_paths() -> Vec<PathBuf> {
	let mut out = Vec::new();
	if let Ok(p) = std::env::var("BOLLARD_CONFIG") {
		if !p.trim().is_empty() { out.push(PathBuf::from(p.trim())); }
	}
	out.push(PathBuf::from("bollard.toml"));
	if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
		if !xdg.trim().is_empty() { out.push(PathBuf::from(xdg).join("bollard").join("bollard.toml")); }
	}
	if let Ok(home) = std::env::var("HOME") {
		if !home.trim().is_empty() { out.push(PathBuf::from(home).join(".config").join("bollard").join("bollard.toml")); }
	}
	out
}

fn load_file_config() -> Option<(SdkConfig, PathBuf)> {
	for path in candidate_paths() {
		if !path.exists() { continue; }
		match SdkConfig::load_from_file(&path) {
			Ok(cfg) => {
				debug!(path = %path.display(), "loaded config file");
				return Some((cfg, path));
			}
			Err(e) => warn!(path = %path.display(), error = %e, "skipping unusable config file"),
		}
	}
	None
}

pub const TEMPLATE_BOLLARD_TOML: &str = r#"# Bollard client configuration (template)

[client]
# Service root; requests go to <base_url>/api/bollard/
base_url = "http://127.0.0.1:8000"
request_timeout_ms = 5000
connect_timeout_ms = 3000
# State polling period while `watch` is running
poll_interval_ms = 2000
# Access token. A bare value is sent as "Token <value>"; values starting
# with "Token " or "Bearer " are sent unchanged.
token = ""
"#;
