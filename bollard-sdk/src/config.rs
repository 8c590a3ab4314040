#![forbid(unsafe_code)]

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// API root below the service base URL.
pub const API_PREFIX: &str = "api/bollard/";

const MIN_TIMEOUT_MS: u64 = 100;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkConfig {
	#[serde(default = "SdkConfig::default_base_url")]
	pub base_url: String,
	#[serde(default = "SdkConfig::default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	#[serde(default = "SdkConfig::default_connect_timeout_ms")]
	pub connect_timeout_ms: u64,
	#[serde(default = "SdkConfig::default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default)]
	pub token: Option<String>,
}

impl Default for SdkConfig {
	fn default() -> Self {
		Self {
			base_url: Self::default_base_url(),
			request_timeout_ms: Self::default_request_timeout_ms(),
			connect_timeout_ms: Self::default_connect_timeout_ms(),
			poll_interval_ms: Self::default_poll_interval_ms(),
			token: None,
		}
	}
}

impl std::fmt::Debug for SdkConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SdkConfig")
			.field("base_url", &self.base_url)
			.field("request_timeout_ms", &self.request_timeout_ms)
			.field("connect_timeout_ms", &self.connect_timeout_ms)
			.field("poll_interval_ms", &self.poll_interval_ms)
			.field("token_present", &self.token.is_some())
			.finish()
	}
}

impl SdkConfig {
	pub fn default_base_url() -> String { "http://127.0.0.1:8000".to_string() }
	pub const fn default_request_timeout_ms() -> u64 { 5_000 }
	pub const fn default_connect_timeout_ms() -> u64 { 3_000 }
	pub const fn default_poll_interval_ms() -> u64 { 2_000 }

	pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
		let data = std::fs::read_to_string(path)?;
		Self::from_toml_str(&data)
	}

	/// Parse a TOML document. Keys may sit at the top level or inside a
	/// `[client]` table; the table wins when both are present.
	pub fn from_toml_str(s: &str) -> Result<Self> {
		let doc: toml::Value = toml::from_str(s).map_err(|e| Error::config(format!("toml parse error: {e}")))?;
		let section = match doc.get("client").and_then(|c| c.as_table()).cloned() {
			Some(table) => toml::Value::Table(table),
			None => doc,
		};
		let mut cfg: Self = section.try_into().map_err(|e| Error::config(format!("toml parse error: {e}")))?;
		cfg.token = normalize_token(cfg.token.take());
		cfg.validate()?;
		Ok(cfg)
	}

	/// Overlay `BOLLARD_*` environment variables. Blank values are ignored.
	pub fn apply_env(&mut self) -> Result<()> {
		if let Some(v) = env_value("BOLLARD_BASE_URL") { self.base_url = v; }
		if let Some(v) = env_value("BOLLARD_TOKEN") { self.token = Some(v); }
		if let Some(v) = env_value("BOLLARD_REQUEST_TIMEOUT_MS") { self.request_timeout_ms = parse_ms("BOLLARD_REQUEST_TIMEOUT_MS", &v)?; }
		if let Some(v) = env_value("BOLLARD_CONNECT_TIMEOUT_MS") { self.connect_timeout_ms = parse_ms("BOLLARD_CONNECT_TIMEOUT_MS", &v)?; }
		if let Some(v) = env_value("BOLLARD_POLL_INTERVAL_MS") { self.poll_interval_ms = parse_ms("BOLLARD_POLL_INTERVAL_MS", &v)?; }
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		let url = self.parsed_base_url()?;
		match url.scheme() {
			"http" => {}
			"https" if cfg!(feature = "tls") => {}
			"https" => return Err(Error::config("https base_url requires the `tls` feature")),
			other => return Err(Error::config(format!("unsupported base_url scheme: {other}"))),
		}
		for (name, v) in [
			("request_timeout_ms", self.request_timeout_ms),
			("connect_timeout_ms", self.connect_timeout_ms),
			("poll_interval_ms", self.poll_interval_ms),
		] {
			if v < MIN_TIMEOUT_MS {
				return Err(Error::config(format!("{name} must be at least {MIN_TIMEOUT_MS} (got {v})")));
			}
		}
		Ok(())
	}

	/// Absolute URL of an endpoint below `/api/bollard/`, e.g. `api_url("state/")`.
	pub fn api_url(&self, path: &str) -> Result<Url> {
		let mut base = self.parsed_base_url()?;
		if !base.path().ends_with('/') {
			let p = format!("{}/", base.path());
			base.set_path(&p);
		}
		base.join(API_PREFIX)
			.and_then(|api| api.join(path.trim_start_matches('/')))
			.map_err(|e| Error::config(format!("invalid endpoint path {path:?}: {e}")))
	}

	pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }
	pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }
	pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

	fn parsed_base_url(&self) -> Result<Url> {
		Url::parse(self.base_url.trim()).map_err(|e| Error::config(format!("invalid base_url {:?}: {e}", self.base_url)))
	}
}

fn env_value(key: &str) -> Option<String> {
	let v = std::env::var(key).ok()?;
	let v = v.trim();
	if v.is_empty() { None } else { Some(v.to_string()) }
}

fn parse_ms(key: &str, v: &str) -> Result<u64> {
	v.parse::<u64>().map_err(|_| Error::config(format!("{key} must be a number of milliseconds (got {v:?})")))
}

fn normalize_token(t: Option<String>) -> Option<String> {
	t.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
