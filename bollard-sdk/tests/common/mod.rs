#![allow(dead_code)]

use async_trait::async_trait;
use bollard_sdk::{
    Acknowledgement, BollardSettings, BollardState, ControlCommand, Error, Result, SettingsPatch, StatusGateway,
    SystemStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// In-memory gateway with canned replies, call counters and optional gates
/// that hold a call open until the test releases it.
#[derive(Default)]
pub struct ScriptedGateway {
    pub status: Mutex<SystemStatus>,
    pub state: Mutex<BollardState>,
    pub settings: Mutex<BollardSettings>,

    pub fail_status: Mutex<Option<u16>>,
    pub fail_state: Mutex<Option<u16>>,
    pub fail_control: Mutex<Option<u16>>,
    pub fail_update: Mutex<Option<u16>>,

    pub control_gate: Mutex<Option<Arc<Notify>>>,
    pub state_gate: Mutex<Option<Arc<Notify>>>,
    pub update_gate: Mutex<Option<Arc<Notify>>>,

    pub status_calls: AtomicUsize,
    pub state_calls: AtomicUsize,
    pub settings_calls: AtomicUsize,
    pub control_calls: AtomicUsize,
    pub update_calls: AtomicUsize,

    pub commands: Mutex<Vec<ControlCommand>>,
    pub patches: Mutex<Vec<SettingsPatch>>,
    pub headers: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn with_status(status: SystemStatus) -> Arc<Self> {
        let gw = Self::default();
        if let Some(s) = status.state {
            *gw.state.lock().unwrap() = s;
        }
        if let Some(s) = status.setting.clone() {
            *gw.settings.lock().unwrap() = s;
        }
        *gw.status.lock().unwrap() = status;
        Arc::new(gw)
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn gate_state(&self) -> Arc<Notify> {
        let n = Arc::new(Notify::new());
        *self.state_gate.lock().unwrap() = Some(n.clone());
        n
    }

    pub fn gate_control(&self) -> Arc<Notify> {
        let n = Arc::new(Notify::new());
        *self.control_gate.lock().unwrap() = Some(n.clone());
        n
    }

    pub fn gate_update(&self) -> Arc<Notify> {
        let n = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(n.clone());
        n
    }

    fn record(&self, auth: &str) {
        self.headers.lock().unwrap().push(auth.to_string());
    }

    fn failure(slot: &Mutex<Option<u16>>) -> Result<()> {
        match *slot.lock().unwrap() {
            Some(status) => Err(Error::Remote { status, body: None }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StatusGateway for ScriptedGateway {
    async fn system_status(&self, auth: &str) -> Result<SystemStatus> {
        self.record(auth);
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Self::failure(&self.fail_status)?;
        Ok(self.status.lock().unwrap().clone())
    }

    async fn bollard_state(&self, auth: &str) -> Result<BollardState> {
        self.record(auth);
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.state_gate.lock().unwrap().clone();
        if let Some(g) = gate {
            g.notified().await;
        }
        Self::failure(&self.fail_state)?;
        Ok(*self.state.lock().unwrap())
    }

    async fn active_settings(&self, auth: &str) -> Result<BollardSettings> {
        self.record(auth);
        self.settings_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn control(&self, auth: &str, command: ControlCommand) -> Result<Acknowledgement> {
        self.record(auth);
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command);
        let gate = self.control_gate.lock().unwrap().clone();
        if let Some(g) = gate {
            g.notified().await;
        }
        Self::failure(&self.fail_control)?;
        Ok(Acknowledgement::from_body(r#"{"status":"success"}"#.to_string()))
    }

    async fn update_settings(&self, auth: &str, patch: &SettingsPatch) -> Result<Acknowledgement> {
        self.record(auth);
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.patches.lock().unwrap().push(patch.clone());
        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(g) = gate {
            g.notified().await;
        }
        Self::failure(&self.fail_update)?;
        Ok(Acknowledgement::from_body(r#"{"status":"success"}"#.to_string()))
    }
}

/// Settings 30/10/motorcycle (running), barrier open at counter 5 in auto mode.
pub fn sample_status() -> SystemStatus {
    SystemStatus {
        setting: Some(BollardSettings {
            id: 1,
            occupy_ratio: 30,
            maintain_frame: 10,
            target_object: "motorcycle".into(),
            is_active: true,
            raspberry_pi_host: "192.168.0.20".into(),
            raspberry_pi_port: 50051,
            grpc_server_port: 50052,
        }),
        state: Some(BollardState { is_closed: false, counter: 5, manual_mode: false }),
    }
}

/// Let spawned tasks run until `done` holds or the budget runs out.
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
}
