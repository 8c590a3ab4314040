#![forbid(unsafe_code)]

use crate::{
    config::SdkConfig,
    error::{Error, Result},
    proto::{Acknowledgement, BollardSettings, BollardState, ControlCommand, ControlRequest, SettingsPatch, SystemStatus},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Remote operations of the bollard service.
///
/// `auth` is the full `Authorization` header value. Implementations report
/// connection problems as [`Error::Transport`] and non-2xx replies as
/// [`Error::Remote`].
#[async_trait]
pub trait StatusGateway: Send + Sync {
    /// `GET status/`: settings and state in one call.
    async fn system_status(&self, auth: &str) -> Result<SystemStatus>;
    /// `GET state/`: the lightweight call used while polling.
    async fn bollard_state(&self, auth: &str) -> Result<BollardState>;
    /// `GET settings/active/`
    async fn active_settings(&self, auth: &str) -> Result<BollardSettings>;
    /// `POST control/`
    async fn control(&self, auth: &str, command: ControlCommand) -> Result<Acknowledgement>;
    /// `PATCH settings/update_active/`
    async fn update_settings(&self, auth: &str, patch: &SettingsPatch) -> Result<Acknowledgement>;
}

/// [`StatusGateway`] over HTTP/JSON.
///
/// ureq is blocking; every call runs on the blocking pool so the runtime is
/// never stalled.
#[derive(Clone)]
pub struct HttpGateway {
    cfg: SdkConfig,
    agent: ureq::Agent,
}

impl HttpGateway {
    pub fn new(cfg: SdkConfig) -> Result<Self> {
        cfg.validate()?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build();
        Ok(Self { cfg, agent })
    }

    pub fn config(&self) -> &SdkConfig {
        &self.cfg
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, auth: &str) -> Result<T> {
        let text = self.send("GET", path, auth, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send(&self, method: &'static str, path: &str, auth: &str, body: Option<serde_json::Value>) -> Result<String> {
        let url = self.cfg.api_url(path)?;
        let agent = self.agent.clone();
        let auth = auth.to_string();
        debug!(method, url = %url, "bollard request");
        tokio::task::spawn_blocking(move || {
            let req = agent
                .request_url(method, &url)
                .set("Authorization", &auth)
                .set("Accept", "application/json");
            let resp = match body {
                Some(b) => req.send_json(b),
                None => req.call(),
            };
            match resp {
                Ok(r) => r.into_string().map_err(|e| Error::transport(format!("reading response: {e}"))),
                Err(ureq::Error::Status(status, r)) => {
                    let body = r.into_string().ok().filter(|b| !b.trim().is_empty());
                    Err(Error::Remote { status, body })
                }
                Err(ureq::Error::Transport(t)) => Err(Error::transport(t.to_string())),
            }
        })
        .await
        .map_err(|e| Error::transport(format!("join error: {e}")))?
    }
}

#[async_trait]
impl StatusGateway for HttpGateway {
    async fn system_status(&self, auth: &str) -> Result<SystemStatus> {
        self.get_json("status/", auth).await
    }

    async fn bollard_state(&self, auth: &str) -> Result<BollardState> {
        self.get_json("state/", auth).await
    }

    async fn active_settings(&self, auth: &str) -> Result<BollardSettings> {
        self.get_json("settings/active/", auth).await
    }

    async fn control(&self, auth: &str, command: ControlCommand) -> Result<Acknowledgement> {
        let body = serde_json::to_value(ControlRequest { action: command })?;
        let text = self.send("POST", "control/", auth, Some(body)).await?;
        Ok(Acknowledgement::from_body(text))
    }

    async fn update_settings(&self, auth: &str, patch: &SettingsPatch) -> Result<Acknowledgement> {
        let body = serde_json::to_value(patch)?;
        let text = self.send("PATCH", "settings/update_active/", auth, Some(body)).await?;
        Ok(Acknowledgement::from_body(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_config() {
        let cfg = SdkConfig { base_url: "nope".into(), ..Default::default() };
        assert!(matches!(HttpGateway::new(cfg), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_failure() {
        // Port 9 (discard) on loopback is closed on CI hosts.
        let cfg = SdkConfig { base_url: "http://127.0.0.1:9".into(), connect_timeout_ms: 300, request_timeout_ms: 300, ..Default::default() };
        let gw = HttpGateway::new(cfg).unwrap();
        let err = gw.bollard_state("Token x").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "got {err:?}");
    }
}
