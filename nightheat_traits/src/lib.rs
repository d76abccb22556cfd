pub mod clock;

pub use clock::{Clock, SystemClock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type carried across collaborator boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-user sleep preferences as stored by the profile store.
///
/// `bed_time`/`wake_time` are local `HH:MM` strings interpreted in `timezone`
/// (an IANA identifier). Levels use the device's native range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalProfile {
    pub user_id: String,
    pub device_user_id: String,
    pub bed_time: String,
    pub wake_time: String,
    pub timezone: String,
    pub initial_level: i32,
    pub mid_level: i32,
    pub final_level: i32,
}

/// Access/refresh token pair for the vendor API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// True once `now` is strictly past the expiry instant.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile: ThermalProfile,
    pub credential: Credential,
}

/// Live heating state as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    pub is_heating: bool,
    pub heating_level: i32,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profiles(&self) -> Result<Vec<ProfileRecord>, BoxError>;
    async fn persist_credential(
        &self,
        user_id: &str,
        credential: &Credential,
    ) -> Result<(), BoxError>;
}

#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(
        &self,
        refresh_token: &str,
        device_user_id: &str,
    ) -> Result<Credential, BoxError>;
}

#[async_trait]
pub trait BedDevice: Send + Sync {
    async fn read_state(
        &self,
        credential: &Credential,
        device_user_id: &str,
    ) -> Result<DeviceState, BoxError>;
    async fn set_power(
        &self,
        credential: &Credential,
        device_user_id: &str,
        on: bool,
    ) -> Result<(), BoxError>;
    async fn set_level(
        &self,
        credential: &Credential,
        device_user_id: &str,
        level: i32,
    ) -> Result<(), BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn credential_expiry_is_strict() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let cred = Credential {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: at,
        };
        assert!(!cred.is_expired(at));
        assert!(cred.is_expired(at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn credential_debug_hides_tokens() {
        let cred = Credential {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            expires_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        };
        let shown = format!("{cred:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("expires_at"));
    }
}
