#![forbid(unsafe_code)]

use bollard_sdk::{BollardSettings, BollardState, SessionEvent, SystemStatus};
use clap::ValueEnum;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

pub fn state_line(s: &BollardState) -> String {
    format!("bollard: {} ({}), counter {}", s.position_label(), s.mode_label(), s.counter)
}

pub fn settings_lines(s: &BollardSettings) -> String {
    format!(
        "system: {}\nsettings: occupy_ratio={} maintain_frame={} target_object={}",
        s.system_label(),
        s.occupy_ratio,
        s.maintain_frame,
        s.target_object
    )
}

pub fn status_text(status: &SystemStatus) -> String {
    let mut out = Vec::new();
    match &status.state {
        Some(s) => out.push(state_line(s)),
        None => out.push("bollard: unknown".to_string()),
    }
    match &status.setting {
        Some(s) => out.push(settings_lines(s)),
        None => out.push("settings: unknown".to_string()),
    }
    out.join("\n")
}

/// Print `value` as pretty JSON or `text` as is.
pub fn emit(format: Format, text: impl FnOnce() -> String, value: impl FnOnce() -> Value) {
    match format {
        Format::Text => println!("{}", text()),
        Format::Json => println!("{}", serde_json::to_string_pretty(&value()).unwrap_or_default()),
    }
}

/// One line per event; `None` for events `watch` does not show.
pub fn event_line(format: Format, event: &SessionEvent) -> Option<String> {
    let (text, value) = match event {
        SessionEvent::StateChanged(s) => (state_line(s), json!({"event": "state_changed", "state": s})),
        SessionEvent::SettingsChanged(s) => (settings_lines(s), json!({"event": "settings_changed", "setting": s})),
        SessionEvent::PollingStarted => ("polling started".to_string(), json!({"event": "polling_started"})),
        SessionEvent::PollingStopped => ("polling stopped".to_string(), json!({"event": "polling_stopped"})),
        _ => return None,
    };
    Some(match format {
        Format::Text => text,
        Format::Json => value.to_string(),
    })
}
