//! Vendor API client (feature `http`).
//!
//! Endpoints, relative to the configured base URLs:
//! - `POST {auth}/v1/tokens` exchanges a refresh token for a new credential
//! - `GET  {api}/v1/users/{id}/temperature` reads the heating state
//! - `PUT  {api}/v1/users/{id}/temperature` changes power or level

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use nightheat_traits::{
    BedDevice, BoxError, Clock, Credential, CredentialRefresher, DeviceState, SystemClock,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{DeviceError, Result};

#[derive(Debug, Clone)]
pub struct VendorClientCfg {
    pub api_base_url: String,
    pub auth_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout: Duration,
}

pub struct VendorClient {
    http: reqwest::Client,
    cfg: VendorClientCfg,
    clock: Arc<dyn Clock>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemperatureBody {
    current_level: i32,
    current_state: CurrentState,
}

#[derive(Deserialize)]
struct CurrentState {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct TokenBody {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

impl VendorClient {
    pub fn new(cfg: VendorClientCfg) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            cfg,
            clock: Arc::new(SystemClock::new()),
        })
    }

    /// Clock used to turn `expires_in` into an absolute expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn temperature_url(&self, device_user_id: &str) -> String {
        format!(
            "{}/v1/users/{}/temperature",
            self.cfg.api_base_url.trim_end_matches('/'),
            device_user_id
        )
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DeviceError::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn put_temperature(
        &self,
        credential: &Credential,
        device_user_id: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let resp = self
            .http
            .put(self.temperature_url(device_user_id))
            .bearer_auth(&credential.access_token)
            .json(&payload)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl BedDevice for VendorClient {
    async fn read_state(
        &self,
        credential: &Credential,
        device_user_id: &str,
    ) -> std::result::Result<DeviceState, BoxError> {
        let resp = self
            .http
            .get(self.temperature_url(device_user_id))
            .bearer_auth(&credential.access_token)
            .send()
            .await
            .map_err(DeviceError::from)?;
        let body: TemperatureBody = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(DeviceError::from)?;
        Ok(DeviceState {
            is_heating: body.current_state.kind != "off",
            heating_level: body.current_level,
        })
    }

    async fn set_power(
        &self,
        credential: &Credential,
        device_user_id: &str,
        on: bool,
    ) -> std::result::Result<(), BoxError> {
        let kind = if on { "smart" } else { "off" };
        self.put_temperature(
            credential,
            device_user_id,
            json!({ "currentState": { "type": kind } }),
        )
        .await?;
        Ok(())
    }

    async fn set_level(
        &self,
        credential: &Credential,
        device_user_id: &str,
        level: i32,
    ) -> std::result::Result<(), BoxError> {
        self.put_temperature(
            credential,
            device_user_id,
            json!({ "currentLevel": level }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialRefresher for VendorClient {
    async fn refresh(
        &self,
        refresh_token: &str,
        device_user_id: &str,
    ) -> std::result::Result<Credential, BoxError> {
        let url = format!("{}/v1/tokens", self.cfg.auth_base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .json(&json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
                "client_id": self.cfg.client_id,
                "client_secret": self.cfg.client_secret,
            }))
            .send()
            .await
            .map_err(DeviceError::from)?;
        let body: TokenBody = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(DeviceError::from)?;
        tracing::debug!(device_user_id, expires_in = body.expires_in, "token refreshed");
        Ok(Credential {
            access_token: body.access_token,
            refresh_token: body
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            expires_at: token_expiry(self.clock.now(), body.expires_in)?,
        })
    }
}

/// Absolute expiry for a token valid `expires_in` seconds from `now`.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    if expires_in < 0 {
        return Err(DeviceError::Rejected(format!("negative expires_in {expires_in}")));
    }
    TimeDelta::try_seconds(expires_in)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| DeviceError::Rejected(format!("expires_in {expires_in} out of range")))
}
