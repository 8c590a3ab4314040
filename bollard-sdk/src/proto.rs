#![forbid(unsafe_code)]

//! JSON models exchanged with the `/api/bollard/` service.
//!
//! Every type here is replaced wholesale when a fresh response arrives; none
//! of them is edited in place by the session.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Live physical state of the barrier (`GET state/`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BollardState {
	pub is_closed: bool,
	/// Frame/cycle counter maintained by the detector.
	pub counter: u64,
	pub manual_mode: bool,
}

impl BollardState {
	pub fn position_label(&self) -> &'static str { if self.is_closed { "closed" } else { "open" } }
	pub fn mode_label(&self) -> &'static str { if self.manual_mode { "manual mode" } else { "auto mode" } }
}

/// Active detector configuration (`GET settings/active/`).
///
/// The Raspberry Pi / gRPC topology fields are opaque to the client and only
/// round-tripped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BollardSettings {
	pub id: i64,
	/// Percentage of the frame the target must occupy, 1..=100.
	pub occupy_ratio: i64,
	/// Frames the barrier stays closed after a detection, >= 1.
	pub maintain_frame: i64,
	/// Class label. Some deployments store it as a numeric class id; either
	/// form is kept as text.
	#[serde(deserialize_with = "string_or_number")]
	pub target_object: String,
	/// Whether the automated detection system is running.
	pub is_active: bool,
	#[serde(default)]
	pub raspberry_pi_host: String,
	#[serde(default)]
	pub raspberry_pi_port: i64,
	#[serde(default)]
	pub grpc_server_port: i64,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Int(i64),
		Float(f64),
	}
	Ok(match Raw::deserialize(d)? {
		Raw::Text(s) => s,
		Raw::Int(n) => n.to_string(),
		Raw::Float(f) => f.to_string(),
	})
}

impl BollardSettings {
	pub fn system_label(&self) -> &'static str { if self.is_active { "running" } else { "stopped" } }
}

/// Combined status (`GET status/`). Either half may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
	#[serde(default)]
	pub setting: Option<BollardSettings>,
	#[serde(default)]
	pub state: Option<BollardState>,
}

/// Discrete control action accepted by `POST control/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
	Open,
	Close,
	Auto,
	StartSystem,
	StopSystem,
}

impl ControlCommand {
	pub const ALL: [ControlCommand; 5] = [
		ControlCommand::Open,
		ControlCommand::Close,
		ControlCommand::Auto,
		ControlCommand::StartSystem,
		ControlCommand::StopSystem,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			ControlCommand::Open => "open",
			ControlCommand::Close => "close",
			ControlCommand::Auto => "auto",
			ControlCommand::StartSystem => "start_system",
			ControlCommand::StopSystem => "stop_system",
		}
	}

	/// Commands whose effect is costly to undo. These need an explicit
	/// confirmation before dispatch.
	pub fn is_disruptive(self) -> bool { matches!(self, ControlCommand::Close | ControlCommand::StopSystem) }

	/// Text shown once the service has accepted the command.
	pub fn success_message(self) -> &'static str {
		match self {
			ControlCommand::Open => "bollard opened",
			ControlCommand::Close => "bollard closed",
			ControlCommand::Auto => "switched to auto mode",
			ControlCommand::StartSystem => "detection system started",
			ControlCommand::StopSystem => "detection system stopped",
		}
	}
}

impl fmt::Display for ControlCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ControlCommand {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let norm = s.trim().to_ascii_lowercase().replace('-', "_");
		ControlCommand::ALL
			.into_iter()
			.find(|c| c.as_str() == norm)
			.ok_or_else(|| format!("unknown control action: {s:?} (expected open, close, auto, start_system or stop_system)"))
	}
}

/// Body of `POST control/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlRequest {
	pub action: ControlCommand,
}

/// Partial settings update (`PATCH settings/update_active/`).
///
/// `target_object` is left out of the payload entirely when `None`, which the
/// service reads as "no change".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsPatch {
	pub occupy_ratio: i64,
	pub maintain_frame: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target_object: Option<String>,
}

/// Success body of a write call. The service's body is not a stable
/// contract, so every field is optional and the raw text is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acknowledgement {
	pub status: Option<String>,
	pub message: Option<String>,
	pub raw: String,
}

impl Acknowledgement {
	pub fn from_body(raw: String) -> Self {
		#[derive(Deserialize)]
		struct Shape {
			#[serde(default)]
			status: Option<String>,
			#[serde(default)]
			message: Option<String>,
		}
		match serde_json::from_str::<Shape>(&raw) {
			Ok(shape) => Self { status: shape.status, message: shape.message, raw },
			Err(_) => Self { status: None, message: None, raw },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn status_tolerates_missing_halves_and_extra_fields() {
		let v = json!({
			"state": {"is_closed": true, "counter": 3, "manual_mode": true, "last_updated": "2024-01-01T00:00:00Z", "status_display": "x"},
			"recent_logs": []
		});
		let s: SystemStatus = serde_json::from_value(v).unwrap();
		assert!(s.setting.is_none());
		assert_eq!(s.state, Some(BollardState { is_closed: true, counter: 3, manual_mode: true }));
	}

	#[test]
	fn numeric_target_object_decodes_as_text() {
		let raw = r#"{"setting":{"id":1,"occupy_ratio":30,"maintain_frame":10,"target_object":3,"is_active":false,
			"raspberry_pi_host":"10.0.0.2","raspberry_pi_port":70000,"grpc_server_port":50051,
			"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"},
			"state":{"is_closed":false,"counter":0,"manual_mode":false}}"#;
		let s: SystemStatus = serde_json::from_str(raw).unwrap();
		let setting = s.setting.unwrap();
		assert_eq!(setting.target_object, "3");
		assert_eq!(setting.raspberry_pi_port, 70000);

		let named: BollardSettings = serde_json::from_value(json!({
			"id": 2, "occupy_ratio": 5, "maintain_frame": 1, "target_object": "car", "is_active": true
		}))
		.unwrap();
		assert_eq!(named.target_object, "car");
		assert!(serde_json::from_value::<BollardSettings>(json!({
			"id": 2, "occupy_ratio": 5, "maintain_frame": 1, "target_object": [1], "is_active": true
		}))
		.is_err());
	}

	#[test]
	fn patch_omits_absent_target_object() {
		let p = SettingsPatch { occupy_ratio: 50, maintain_frame: 10, target_object: None };
		assert_eq!(serde_json::to_value(&p).unwrap(), json!({"occupy_ratio": 50, "maintain_frame": 10}));
		let p = SettingsPatch { target_object: Some("car".into()), ..p };
		assert_eq!(serde_json::to_value(&p).unwrap()["target_object"], json!("car"));
	}

	#[test]
	fn control_request_uses_wire_names() {
		let body = serde_json::to_string(&ControlRequest { action: ControlCommand::StartSystem }).unwrap();
		assert_eq!(body, r#"{"action":"start_system"}"#);
	}

	#[test]
	fn command_parsing_accepts_cli_spelling() {
		assert_eq!("stop-system".parse::<ControlCommand>(), Ok(ControlCommand::StopSystem));
		assert_eq!(" OPEN ".parse::<ControlCommand>(), Ok(ControlCommand::Open));
		assert!("reboot".parse::<ControlCommand>().is_err());
	}

	#[test]
	fn only_close_and_stop_are_disruptive() {
		let disruptive: Vec<_> = ControlCommand::ALL.into_iter().filter(|c| c.is_disruptive()).collect();
		assert_eq!(disruptive, vec![ControlCommand::Close, ControlCommand::StopSystem]);
	}

	#[test]
	fn acknowledgement_keeps_raw_body() {
		let ack = Acknowledgement::from_body(r#"{"status":"success","action":"open","message":"done"}"#.into());
		assert_eq!(ack.status.as_deref(), Some("success"));
		assert_eq!(ack.message.as_deref(), Some("done"));
		let ack = Acknowledgement::from_body("ok".into());
		assert_eq!(ack.status, None);
		assert_eq!(ack.raw, "ok");
	}
}
