#![forbid(unsafe_code)]

use crate::{
    auth::AuthContext,
    error::{Error, Result},
    gateway::StatusGateway,
    proto::{Acknowledgement, ControlCommand},
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Whether the user has confirmed a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    NotConfirmed,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed { Confirmation::Confirmed } else { Confirmation::NotConfirmed }
    }
}

/// Disruptive commands (closing the barrier, stopping detection) need a
/// confirmation prompt before dispatch.
pub fn requires_confirmation(command: ControlCommand) -> bool {
    command.is_disruptive()
}

/// Single mutual-exclusion flag shared by a family of operations.
pub(crate) struct InFlight {
    busy: AtomicBool,
    what: &'static str,
}

impl InFlight {
    pub(crate) const fn new(what: &'static str) -> Self {
        Self { busy: AtomicBool::new(false), what }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn try_acquire(&self) -> Result<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.busy))
            .map_err(|_| Error::Busy(self.what))
    }
}

/// Clears the flag when dropped, including when the owning future is cancelled.
pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends control commands one at a time.
///
/// All five actions share one flag: while any command is outstanding every
/// further `dispatch` is refused with [`Error::Busy`] without touching the
/// network.
pub struct CommandDispatcher {
    flight: InFlight,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDispatcher {
    pub const fn new() -> Self {
        Self { flight: InFlight::new("a control command") }
    }

    /// `false` while a command is outstanding; controls should be disabled.
    pub fn is_available(&self) -> bool {
        !self.flight.is_busy()
    }

    /// Checks run in order: credential, confirmation, exclusivity. Only then
    /// is the command submitted. The flag is released before this returns,
    /// whatever the outcome.
    pub async fn dispatch(
        &self,
        gateway: &dyn StatusGateway,
        auth: &AuthContext,
        command: ControlCommand,
        confirmation: Confirmation,
    ) -> Result<Acknowledgement> {
        let header = auth.authorization_header()?;
        if requires_confirmation(command) && confirmation != Confirmation::Confirmed {
            return Err(Error::ConfirmationRequired(command));
        }
        let _guard = self.flight.try_acquire()?;
        match gateway.control(&header, command).await {
            Ok(ack) => {
                info!(command = %command, "control command accepted");
                Ok(ack)
            }
            Err(e) => {
                warn!(command = %command, error = %e, "control command failed");
                Err(e)
            }
        }
    }
}
