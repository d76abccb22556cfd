//! In-memory collaborators for tests and dry experiments.
//!
//! Failures are injected as plain `io::Error`s so they go through the same
//! string-based mapping as any third-party backend.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nightheat_traits::{
    BedDevice, BoxError, Credential, CredentialRefresher, DeviceState, ProfileRecord, ProfileStore,
};

/// A device call as observed by `ScriptedBed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedCall {
    ReadState,
    SetPower(bool),
    SetLevel(i32),
}

impl BedCall {
    #[inline]
    pub fn is_write(self) -> bool {
        !matches!(self, BedCall::ReadState)
    }
}

#[derive(Default)]
struct BedInner {
    states: HashMap<String, DeviceState>,
    calls: Vec<(String, BedCall)>,
    fail_reads: u32,
    fail_writes: u32,
    reject_levels: bool,
    read_delay: Option<Duration>,
}

/// Scriptable bed: per-user state, call log and injected failures.
#[derive(Default)]
pub struct ScriptedBed {
    inner: Mutex<BedInner>,
}

impl ScriptedBed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, device_user_id: &str, state: DeviceState) -> Self {
        self.set_state(device_user_id, state);
        self
    }

    /// The next `n` reads fail with a transient error.
    pub fn fail_reads(self, n: u32) -> Self {
        self.lock().fail_reads = n;
        self
    }

    /// The next `n` writes fail with a transient error.
    pub fn fail_writes(self, n: u32) -> Self {
        self.lock().fail_writes = n;
        self
    }

    /// Every `set_level` is rejected as invalid.
    pub fn reject_levels(self) -> Self {
        self.lock().reject_levels = true;
        self
    }

    /// Reads wait this long (tokio time) before answering.
    pub fn read_delay(self, d: Duration) -> Self {
        self.lock().read_delay = Some(d);
        self
    }

    pub fn set_state(&self, device_user_id: &str, state: DeviceState) {
        self.lock().states.insert(device_user_id.to_string(), state);
    }

    pub fn state(&self, device_user_id: &str) -> DeviceState {
        self.lock()
            .states
            .get(device_user_id)
            .copied()
            .unwrap_or_default()
    }

    /// Every call attempt, failed ones included.
    pub fn calls(&self) -> Vec<(String, BedCall)> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<(String, BedCall)> {
        self.calls().into_iter().filter(|(_, c)| c.is_write()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BedInner> {
        // Poisoning only happens in a failed test; keep the log readable.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record_write(&self, device_user_id: &str, call: BedCall) -> Result<(), BoxError> {
        let mut g = self.lock();
        g.calls.push((device_user_id.to_string(), call));
        if g.fail_writes > 0 {
            g.fail_writes -= 1;
            return Err(Box::new(std::io::Error::other("connection reset")));
        }
        match call {
            BedCall::SetPower(on) => {
                g.states
                    .entry(device_user_id.to_string())
                    .or_default()
                    .is_heating = on;
            }
            BedCall::SetLevel(level) => {
                if g.reject_levels {
                    return Err(Box::new(std::io::Error::other(format!(
                        "level {level} rejected"
                    ))));
                }
                g.states
                    .entry(device_user_id.to_string())
                    .or_default()
                    .heating_level = level;
            }
            BedCall::ReadState => {}
        }
        Ok(())
    }
}

#[async_trait]
impl BedDevice for ScriptedBed {
    async fn read_state(
        &self,
        _credential: &Credential,
        device_user_id: &str,
    ) -> Result<DeviceState, BoxError> {
        let delay = {
            let mut g = self.lock();
            g.calls.push((device_user_id.to_string(), BedCall::ReadState));
            if g.fail_reads > 0 {
                g.fail_reads -= 1;
                return Err(Box::new(std::io::Error::other("connection reset")));
            }
            g.read_delay
        };
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        Ok(self.state(device_user_id))
    }

    async fn set_power(
        &self,
        _credential: &Credential,
        device_user_id: &str,
        on: bool,
    ) -> Result<(), BoxError> {
        self.record_write(device_user_id, BedCall::SetPower(on))
    }

    async fn set_level(
        &self,
        _credential: &Credential,
        device_user_id: &str,
        level: i32,
    ) -> Result<(), BoxError> {
        self.record_write(device_user_id, BedCall::SetLevel(level))
    }
}

/// Profile store held in memory.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ProfileRecord>>,
    persisted: Mutex<Vec<(String, Credential)>>,
    fail_fetch: bool,
    fail_persist: bool,
}

impl MemoryStore {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    /// Credentials written back, in order.
    pub fn persisted(&self) -> Vec<(String, Credential)> {
        self.persisted
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn fetch_profiles(&self) -> Result<Vec<ProfileRecord>, BoxError> {
        if self.fail_fetch {
            return Err(Box::new(std::io::Error::other("store unavailable")));
        }
        Ok(self
            .records
            .lock()
            .map(|g| g.clone())
            .map_err(|_| std::io::Error::other("store lock poisoned"))?)
    }

    async fn persist_credential(
        &self,
        user_id: &str,
        credential: &Credential,
    ) -> Result<(), BoxError> {
        if self.fail_persist {
            return Err(Box::new(std::io::Error::other("disk full")));
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| std::io::Error::other("store lock poisoned"))?;
        if let Some(rec) = records.iter_mut().find(|r| r.profile.user_id == user_id) {
            rec.credential = credential.clone();
        }
        drop(records);
        self.persisted
            .lock()
            .map_err(|_| std::io::Error::other("store lock poisoned"))?
            .push((user_id.to_string(), credential.clone()));
        Ok(())
    }
}

/// Refresher that hands out a fixed-expiry credential.
pub struct StaticAuth {
    expires_at: DateTime<Utc>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StaticAuth {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `device_user_id`s refreshed so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CredentialRefresher for StaticAuth {
    async fn refresh(
        &self,
        refresh_token: &str,
        device_user_id: &str,
    ) -> Result<Credential, BoxError> {
        self.calls
            .lock()
            .map_err(|_| std::io::Error::other("auth lock poisoned"))?
            .push(device_user_id.to_string());
        if self.fail {
            return Err(Box::new(std::io::Error::other("invalid_grant")));
        }
        Ok(Credential {
            access_token: format!("access-{device_user_id}"),
            refresh_token: refresh_token.to_string(),
            expires_at: self.expires_at,
        })
    }
}
