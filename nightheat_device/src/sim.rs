//! Simulated bed and token service.
//!
//! Used by the CLI's default `simulated` backend and by tests. State lives in
//! memory only and is lost when the process exits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::TimeDelta;
use nightheat_traits::{
    BedDevice, BoxError, Clock, Credential, CredentialRefresher, DeviceState,
};

use crate::error::DeviceError;

/// Device level range.
pub const LEVEL_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

#[derive(Default)]
struct Inner {
    states: HashMap<String, DeviceState>,
    fail_next: u32,
}

/// In-memory bed with one heating side per device user.
#[derive(Default)]
pub struct SimulatedBed {
    inner: Mutex<Inner>,
}

impl SimulatedBed {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    pub fn state_of(&self, device_user_id: &str) -> DeviceState {
        self.lock()
            .states
            .get(device_user_id)
            .copied()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_state<T>(
        &self,
        device_user_id: &str,
        f: impl FnOnce(&mut DeviceState) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        let mut g = self.lock();
        if g.fail_next > 0 {
            g.fail_next -= 1;
            return Err(DeviceError::Transport("simulated connection reset".into()));
        }
        f(g.states.entry(device_user_id.to_string()).or_default())
    }
}

#[async_trait]
impl BedDevice for SimulatedBed {
    async fn read_state(
        &self,
        _credential: &Credential,
        device_user_id: &str,
    ) -> Result<DeviceState, BoxError> {
        Ok(self.with_state(device_user_id, |s| Ok(*s))?)
    }

    async fn set_power(
        &self,
        _credential: &Credential,
        device_user_id: &str,
        on: bool,
    ) -> Result<(), BoxError> {
        self.with_state(device_user_id, |s| {
            s.is_heating = on;
            Ok(())
        })?;
        tracing::debug!(device_user_id, on, "simulated power");
        Ok(())
    }

    async fn set_level(
        &self,
        _credential: &Credential,
        device_user_id: &str,
        level: i32,
    ) -> Result<(), BoxError> {
        self.with_state(device_user_id, |s| {
            if !LEVEL_RANGE.contains(&level) {
                return Err(DeviceError::Rejected(format!(
                    "level {level} outside {}..={}",
                    LEVEL_RANGE.start(),
                    LEVEL_RANGE.end()
                )));
            }
            s.heating_level = level;
            Ok(())
        })?;
        tracing::debug!(device_user_id, level, "simulated level");
        Ok(())
    }
}

/// Token service that always grants a fresh credential.
pub struct SimulatedAuth {
    clock: Arc<dyn Clock>,
    lifetime: TimeDelta,
    issued: AtomicU64,
}

impl SimulatedAuth {
    pub fn new(clock: Arc<dyn Clock>, lifetime: TimeDelta) -> Self {
        Self {
            clock,
            lifetime,
            issued: AtomicU64::new(0),
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CredentialRefresher for SimulatedAuth {
    async fn refresh(
        &self,
        refresh_token: &str,
        device_user_id: &str,
    ) -> Result<Credential, BoxError> {
        if refresh_token.is_empty() {
            return Err(Box::new(DeviceError::Rejected(format!(
                "no refresh token for {device_user_id}"
            ))));
        }
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Credential {
            access_token: format!("sim-{device_user_id}-{n}"),
            refresh_token: refresh_token.to_string(),
            expires_at: self.clock.now() + self.lifetime,
        })
    }
}
