#![forbid(unsafe_code)]

//! Client-side control and status synchronization for a remotely managed
//! bollard.
//!
//! A [`ControlSession`] keeps a local view of the barrier's state and
//! settings in step with the `/api/bollard/` service, polls the live state
//! while active, sends control commands one at a time and validates settings
//! edits before they leave the client.
//!
//! ```no_run
//! use bollard_sdk::{Confirmation, ControlCommand, ControlSession, SdkConfig};
//!
//! # async fn demo() -> bollard_sdk::Result<()> {
//! let mut cfg = SdkConfig::default();
//! cfg.apply_env()?;
//! let session = ControlSession::with_http(cfg)?;
//! session.activate().await?;
//! session.dispatch(ControlCommand::Open, Confirmation::NotConfirmed).await?;
//! # Ok(()) }
//! ```

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gateway;
pub mod poller;
pub mod proto;
pub mod session;
pub mod validate;

pub use auth::AuthContext;
pub use config::SdkConfig;
pub use dispatcher::{requires_confirmation, CommandDispatcher, Confirmation};
pub use error::{Error, Result, ValidationError};
pub use events::SessionEvent;
pub use gateway::{HttpGateway, StatusGateway};
pub use poller::{PollTicket, PollerState, StatePoller, TickFlow};
pub use proto::{Acknowledgement, BollardSettings, BollardState, ControlCommand, SettingsPatch, SystemStatus};
pub use session::{ControlSession, DispatchReport, FormField, SaveReport, SettingsForm, DEFAULT_TARGET_OBJECT};
pub use validate::validate;
