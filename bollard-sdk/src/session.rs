#![forbid(unsafe_code)]

//! The control session ties credential, gateway, poller and dispatcher
//! together and owns the local view of the bollard.
//!
//! Lock order: the poller lock may be held while the view lock is taken
//! (see [`StatePoller::run_if_current`]); poller methods are never called
//! with the view lock held. No lock is held across an `.await`.

use crate::{
    auth::AuthContext,
    config::SdkConfig,
    dispatcher::{CommandDispatcher, Confirmation, InFlight},
    error::{Error, Result, ValidationError},
    events::SessionEvent,
    gateway::{HttpGateway, StatusGateway},
    poller::{PollTicket, PollerState, StatePoller, TickFlow},
    proto::{Acknowledgement, BollardSettings, BollardState, ControlCommand, SettingsPatch, SystemStatus},
    validate::validate,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Target class the service ships with. A form still showing it is treated
/// as untouched and may be overwritten by fetched settings.
///
/// Known quirk: a user who deliberately typed this exact value will see it
/// replaced when the service reports something else.
pub const DEFAULT_TARGET_OBJECT: &str = "motorcycle";

const EVENT_CAPACITY: usize = 64;

/// Raw text of the three user-editable settings fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub occupy_ratio: String,
    pub maintain_frame: String,
    pub target_object: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    OccupyRatio,
    MaintainFrame,
    TargetObject,
}

impl SettingsForm {
    /// Fill fields from fetched settings without clobbering an edit in
    /// progress: only empty fields are written, plus `target_object` while it
    /// still holds [`DEFAULT_TARGET_OBJECT`].
    ///
    /// "Empty" is judged after trimming, so a field holding only whitespace
    /// is overwritten too. The default-target comparison is trimmed the same
    /// way.
    pub fn merge_from(&mut self, settings: &BollardSettings) {
        if self.occupy_ratio.trim().is_empty() {
            self.occupy_ratio = settings.occupy_ratio.to_string();
        }
        if self.maintain_frame.trim().is_empty() {
            self.maintain_frame = settings.maintain_frame.to_string();
        }
        let target = self.target_object.trim();
        if target.is_empty() || target == DEFAULT_TARGET_OBJECT {
            self.target_object = settings.target_object.clone();
        }
    }

    pub fn to_patch(&self) -> Result<SettingsPatch, ValidationError> {
        validate(&self.occupy_ratio, &self.maintain_frame, &self.target_object)
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::OccupyRatio => &mut self.occupy_ratio,
            FormField::MaintainFrame => &mut self.maintain_frame,
            FormField::TargetObject => &mut self.target_object,
        };
        *slot = value.into();
    }
}

/// Outcome of [`ControlSession::dispatch`]. The command itself succeeded;
/// `refresh` carries the follow-up status fetch, which may still fail.
#[derive(Debug)]
pub struct DispatchReport {
    pub command: ControlCommand,
    pub ack: Acknowledgement,
    pub refresh: Result<()>,
}

/// Outcome of [`ControlSession::save_settings`].
#[derive(Debug)]
pub struct SaveReport {
    pub patch: SettingsPatch,
    pub ack: Acknowledgement,
    pub refresh: Result<()>,
}

#[derive(Default)]
struct View {
    status: SystemStatus,
    form: SettingsForm,
}

struct Shared {
    gateway: Arc<dyn StatusGateway>,
    auth: Mutex<AuthContext>,
    view: Mutex<View>,
    poller: Arc<StatePoller>,
    dispatcher: CommandDispatcher,
    saving: InFlight,
    active: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

/// Handle to one control session. Clones share the same session.
#[derive(Clone)]
pub struct ControlSession {
    shared: Arc<Shared>,
}

impl ControlSession {
    pub fn new(gateway: Arc<dyn StatusGateway>, config: &SdkConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                gateway,
                auth: Mutex::new(AuthContext::new(config.token.clone().unwrap_or_default())),
                view: Mutex::new(View::default()),
                poller: StatePoller::new(config.poll_interval()),
                dispatcher: CommandDispatcher::new(),
                saving: InFlight::new("a settings save"),
                active: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Session backed by [`HttpGateway`].
    pub fn with_http(config: SdkConfig) -> Result<Self> {
        let gateway = HttpGateway::new(config.clone())?;
        Ok(Self::new(Arc::new(gateway), &config))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // -- credential --

    /// Replace the access token. Clearing it stops polling.
    pub fn set_credential(&self, raw: impl Into<String>) {
        let present = {
            let mut auth = self.shared.auth.lock();
            auth.set(raw);
            auth.has_credential()
        };
        if !present {
            self.stop_polling("credential cleared");
        }
    }

    pub fn has_credential(&self) -> bool {
        self.shared.auth.lock().has_credential()
    }

    // -- view --

    pub fn status(&self) -> SystemStatus {
        self.shared.view.lock().status.clone()
    }

    pub fn form(&self) -> SettingsForm {
        self.shared.view.lock().form.clone()
    }

    pub fn set_form_field(&self, field: FormField, value: impl Into<String>) {
        self.shared.view.lock().form.set(field, value);
    }

    pub fn edit_form<R>(&self, edit: impl FnOnce(&mut SettingsForm) -> R) -> R {
        edit(&mut self.shared.view.lock().form)
    }

    pub fn poller_state(&self) -> PollerState {
        self.shared.poller.state()
    }

    /// `false` while a control command is outstanding.
    pub fn controls_enabled(&self) -> bool {
        self.shared.dispatcher.is_available()
    }

    /// `false` while a settings save is outstanding.
    pub fn save_enabled(&self) -> bool {
        !self.shared.saving.is_busy()
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    // -- lifecycle --

    /// The consumer became visible. With a credential present this runs a
    /// surfaced status refresh, whose success starts polling.
    pub async fn activate(&self) -> Result<()> {
        self.shared.active.store(true, Ordering::Release);
        if !self.has_credential() {
            debug!("activated without credential; waiting for a token");
            return Ok(());
        }
        self.refresh_status().await.map(|_| ())
    }

    /// The consumer went away. Polling stops and stays stopped until the
    /// next `activate`.
    pub fn deactivate(&self) {
        self.shared.active.store(false, Ordering::Release);
        self.stop_polling("session deactivated");
    }

    // -- fetches --

    /// Fetch settings and state in one call and apply whatever halves are
    /// present. Starts polling on success when the session is active.
    pub async fn refresh_status(&self) -> Result<SystemStatus> {
        let status = self.fetch_status().await.map_err(|e| self.surface(e))?;
        self.apply_status(&status);
        self.start_polling();
        Ok(status)
    }

    /// Fetch and apply the live state only. Settings are left alone.
    pub async fn refresh_state(&self) -> Result<BollardState> {
        let state = self.fetch_state().await.map_err(|e| self.surface(e))?;
        self.apply_state(state);
        Ok(state)
    }

    pub async fn refresh_settings(&self) -> Result<BollardSettings> {
        let header = self.authorization().map_err(|e| self.surface(e))?;
        let settings = self.shared.gateway.active_settings(&header).await.map_err(|e| self.surface(e))?;
        self.apply_settings(&settings);
        Ok(settings)
    }

    // -- writes --

    /// Send a control command. On success a combined status refresh
    /// follows; on failure nothing is refreshed.
    pub async fn dispatch(&self, command: ControlCommand, confirmation: Confirmation) -> Result<DispatchReport> {
        let auth = self.shared.auth.lock().clone();
        let ack = self
            .shared
            .dispatcher
            .dispatch(&*self.shared.gateway, &auth, command, confirmation)
            .await
            .map_err(|e| self.surface(e))?;
        self.emit(SessionEvent::CommandSucceeded { command, message: command.success_message().to_string() });
        let refresh = self.refresh_status().await.map(|_| ());
        Ok(DispatchReport { command, ack, refresh })
    }

    /// Validate the form and submit it as a partial settings update.
    pub async fn save_settings(&self) -> Result<SaveReport> {
        let header = self.authorization().map_err(|e| self.surface(e))?;
        let patch = self.form().to_patch().map_err(|e| self.surface(e.into()))?;
        let ack = {
            let _guard = self.shared.saving.try_acquire().map_err(|e| self.surface(e))?;
            self.shared.gateway.update_settings(&header, &patch).await.map_err(|e| self.surface(e))?
        };
        info!(occupy_ratio = patch.occupy_ratio, maintain_frame = patch.maintain_frame, "settings saved");
        self.emit(SessionEvent::SettingsSaved);
        let refresh = self.refresh_status().await.map(|_| ());
        Ok(SaveReport { patch, ack, refresh })
    }

    // -- internals --

    fn authorization(&self) -> Result<String> {
        self.shared.auth.lock().authorization_header()
    }

    async fn fetch_status(&self) -> Result<SystemStatus> {
        let header = self.authorization()?;
        self.shared.gateway.system_status(&header).await
    }

    /// Shared by `refresh_state` (errors surfaced) and the poller (errors
    /// swallowed).
    async fn fetch_state(&self) -> Result<BollardState> {
        let header = self.authorization()?;
        self.shared.gateway.bollard_state(&header).await
    }

    async fn poll_tick(&self, ticket: PollTicket) -> TickFlow {
        match self.fetch_state().await {
            Ok(state) => {
                if self.shared.poller.run_if_current(ticket, || self.apply_state(state)).is_none() {
                    debug!("discarding state from a stopped poll");
                }
            }
            Err(Error::NoCredential) => {
                debug!("no credential at tick; polling stops");
                self.emit(SessionEvent::PollingStopped);
                return TickFlow::Halt;
            }
            Err(e) => debug!(error = %e, "poll failed; retrying next tick"),
        }
        TickFlow::Continue
    }

    fn start_polling(&self) {
        if !self.is_active() || !self.has_credential() {
            return;
        }
        let weak = Arc::downgrade(&self.shared);
        let started = self.shared.poller.start(move |ticket| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) => ControlSession { shared }.poll_tick(ticket).await,
                    None => TickFlow::Halt,
                }
            }
        });
        if started {
            info!(interval_ms = self.shared.poller.interval().as_millis() as u64, "state polling started");
            self.emit(SessionEvent::PollingStarted);
        }
    }

    fn stop_polling(&self, reason: &'static str) {
        if self.shared.poller.stop() {
            info!(reason, "state polling stopped");
            self.emit(SessionEvent::PollingStopped);
        }
    }

    fn apply_status(&self, status: &SystemStatus) {
        if let Some(state) = status.state {
            self.apply_state(state);
        }
        if let Some(settings) = &status.setting {
            self.apply_settings(settings);
        }
    }

    /// Always replaces the held state; only a different state is broadcast.
    fn apply_state(&self, state: BollardState) {
        let previous = self.shared.view.lock().status.state.replace(state);
        if previous != Some(state) {
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    fn apply_settings(&self, settings: &BollardSettings) {
        {
            let mut view = self.shared.view.lock();
            view.form.merge_from(settings);
            view.status.setting = Some(settings.clone());
        }
        self.emit(SessionEvent::SettingsChanged(settings.clone()));
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.shared.events.send(event);
    }

    fn surface(&self, e: Error) -> Error {
        if e.is_preflight() {
            info!(error = %e, "request refused before sending");
        } else {
            warn!(error = %e, "request failed");
        }
        self.emit(SessionEvent::Failed(e.to_string()));
        e
    }
}
