//! Profile store backed by a TOML file.
//!
//! ```toml
//! [[profiles]]
//! user_id = "alice"
//! device_user_id = "8f2c"
//! bed_time = "22:00"
//! wake_time = "06:30"
//! timezone = "Europe/Berlin"
//! initial_level = 20
//! mid_level = 0
//! final_level = -10
//!
//! [profiles.credential]
//! access_token = "..."
//! refresh_token = "..."
//! expires_at = "2024-04-01T12:00:00Z"
//! ```
//!
//! Writes go to a sibling temp file that is then renamed over the original,
//! so readers never observe a half-written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nightheat_traits::{BoxError, Credential, ProfileRecord, ProfileStore, ThermalProfile};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{DeviceError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profiles: Vec<StoredProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    user_id: String,
    device_user_id: String,
    bed_time: String,
    wake_time: String,
    timezone: String,
    initial_level: i32,
    mid_level: i32,
    final_level: i32,
    credential: Credential,
}

impl From<StoredProfile> for ProfileRecord {
    fn from(s: StoredProfile) -> Self {
        ProfileRecord {
            profile: ThermalProfile {
                user_id: s.user_id,
                device_user_id: s.device_user_id,
                bed_time: s.bed_time,
                wake_time: s.wake_time,
                timezone: s.timezone,
                initial_level: s.initial_level,
                mid_level: s.mid_level,
                final_level: s.final_level,
            },
            credential: s.credential,
        }
    }
}

impl From<&ProfileRecord> for StoredProfile {
    fn from(r: &ProfileRecord) -> Self {
        let p = &r.profile;
        StoredProfile {
            user_id: p.user_id.clone(),
            device_user_id: p.device_user_id.clone(),
            bed_time: p.bed_time.clone(),
            wake_time: p.wake_time.clone(),
            timezone: p.timezone.clone(),
            initial_level: p.initial_level,
            mid_level: p.mid_level,
            final_level: p.final_level,
            credential: r.credential.clone(),
        }
    }
}

pub struct TomlProfileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl TomlProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every record.
    pub async fn load(&self) -> Result<Vec<ProfileRecord>> {
        let file = self.read_file().await?;
        Ok(file.profiles.into_iter().map(ProfileRecord::from).collect())
    }

    /// Replace the whole file with `records`.
    pub async fn save(&self, records: &[ProfileRecord]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let file = ProfilesFile {
            profiles: records.iter().map(StoredProfile::from).collect(),
        };
        self.write_file(&file).await
    }

    async fn read_file(&self) -> Result<ProfilesFile> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(toml::from_str(&text)?)
    }

    async fn write_file(&self, file: &ProfilesFile) -> Result<()> {
        let text = toml::to_string_pretty(file)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, text).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "profiles.toml".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn update_credential(&self, user_id: &str, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;
        let entry = file
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| DeviceError::UnknownUser(user_id.to_string()))?;
        entry.credential = credential.clone();
        self.write_file(&file).await?;
        tracing::debug!(user = user_id, path = %self.path.display(), "credential persisted");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for TomlProfileStore {
    async fn fetch_profiles(&self) -> std::result::Result<Vec<ProfileRecord>, BoxError> {
        Ok(self.load().await?)
    }

    async fn persist_credential(
        &self,
        user_id: &str,
        credential: &Credential,
    ) -> std::result::Result<(), BoxError> {
        Ok(self.update_credential(user_id, credential).await?)
    }
}
