#![forbid(unsafe_code)]

use crate::proto::{BollardSettings, BollardState, ControlCommand};

/// Notifications a [`ControlSession`](crate::ControlSession) broadcasts to
/// its presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	StateChanged(BollardState),
	SettingsChanged(BollardSettings),
	CommandSucceeded { command: ControlCommand, message: String },
	SettingsSaved,
	PollingStarted,
	PollingStopped,
	/// A user-visible failure. Swallowed poll errors never show up here.
	Failed(String),
}
