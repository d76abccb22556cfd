//! Actuation Engine: turn a setpoint into the minimal set of device calls.
//!
//! Planning is pure (`plan`) and takes the observed `DeviceState` as input;
//! `Actuator` wraps the reads and writes with the retry policy.

use nightheat_traits::{BedDevice, Clock, Credential, DeviceState};
use serde::Serialize;

use crate::device_error::map_device_error;
use crate::error::Result;
use crate::retry::{RetryPolicy, with_retry};
use crate::setpoint::Setpoint;

/// One device write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "level", rename_all = "snake_case")]
pub enum Command {
    PowerOn,
    SetLevel(i32),
    PowerOff,
}

/// Commands needed to bring `state` to `setpoint`, in issue order.
///
/// A command that would not change the device is never planned.
pub fn plan(setpoint: Setpoint, state: DeviceState) -> Vec<Command> {
    let mut cmds = Vec::with_capacity(2);
    match setpoint {
        Setpoint::Level(target) => {
            if !state.is_heating {
                cmds.push(Command::PowerOn);
            }
            if state.heating_level != target {
                cmds.push(Command::SetLevel(target));
            }
        }
        Setpoint::PowerOff => {
            if state.is_heating {
                cmds.push(Command::PowerOff);
            }
        }
        Setpoint::Hold => {}
    }
    cmds
}

/// Device access with retry for one profile.
pub struct Actuator<'a, D: ?Sized, C: ?Sized> {
    device: &'a D,
    clock: &'a C,
    retry: RetryPolicy,
}

impl<'a, D, C> Actuator<'a, D, C>
where
    D: BedDevice + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(device: &'a D, clock: &'a C, retry: RetryPolicy) -> Self {
        Self {
            device,
            clock,
            retry,
        }
    }

    pub async fn read_state(&self, cred: &Credential, device_user_id: &str) -> Result<DeviceState> {
        let device = self.device;
        with_retry(&self.retry, self.clock, "read_state", move || async move {
            device
                .read_state(cred, device_user_id)
                .await
                .map_err(|e| map_device_error(&*e))
        })
        .await
    }

    pub async fn issue(&self, cred: &Credential, device_user_id: &str, cmd: Command) -> Result<()> {
        let device = self.device;
        let op = match cmd {
            Command::PowerOn => "power_on",
            Command::SetLevel(_) => "set_level",
            Command::PowerOff => "power_off",
        };
        with_retry(&self.retry, self.clock, op, move || async move {
            let res = match cmd {
                Command::PowerOn => device.set_power(cred, device_user_id, true).await,
                Command::PowerOff => device.set_power(cred, device_user_id, false).await,
                Command::SetLevel(level) => device.set_level(cred, device_user_id, level).await,
            };
            res.map_err(|e| map_device_error(&*e))
        })
        .await
    }

    /// Read the device, plan, and issue commands in order.
    ///
    /// Successful commands are appended to `issued`; the first command that
    /// still fails after retries stops actuation and is returned. Power and
    /// level are not issued independently: a failed `PowerOn` skips the
    /// `SetLevel` behind it and the next run plans both again.
    pub async fn apply(
        &self,
        cred: &Credential,
        device_user_id: &str,
        setpoint: Setpoint,
        issued: &mut Vec<Command>,
    ) -> Result<()> {
        if setpoint == Setpoint::Hold {
            return Ok(());
        }
        let state = self.read_state(cred, device_user_id).await?;
        let cmds = plan(setpoint, state);
        if cmds.is_empty() {
            tracing::debug!(?state, ?setpoint, "device already at setpoint");
        }
        for cmd in cmds {
            self.issue(cred, device_user_id, cmd).await?;
            tracing::info!(?cmd, "device command issued");
            issued.push(cmd);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const fn st(is_heating: bool, heating_level: i32) -> DeviceState {
        DeviceState {
            is_heating,
            heating_level,
        }
    }

    #[rstest]
    #[case(Setpoint::Level(20), st(false, 0), vec![Command::PowerOn, Command::SetLevel(20)])]
    #[case(Setpoint::Level(20), st(false, 20), vec![Command::PowerOn])]
    #[case(Setpoint::Level(20), st(true, 10), vec![Command::SetLevel(20)])]
    #[case(Setpoint::Level(20), st(true, 20), vec![])]
    #[case(Setpoint::Level(0), st(false, 0), vec![Command::PowerOn])]
    #[case(Setpoint::PowerOff, st(true, 30), vec![Command::PowerOff])]
    #[case(Setpoint::PowerOff, st(false, 30), vec![])]
    #[case(Setpoint::Hold, st(true, 30), vec![])]
    fn plans_minimal_commands(
        #[case] setpoint: Setpoint,
        #[case] state: DeviceState,
        #[case] expected: Vec<Command>,
    ) {
        assert_eq!(plan(setpoint, state), expected);
    }

    #[test]
    fn command_json_shape() {
        let json = serde_json::to_string(&Command::SetLevel(-5)).unwrap();
        assert_eq!(json, r#"{"command":"set_level","level":-5}"#);
    }
}
