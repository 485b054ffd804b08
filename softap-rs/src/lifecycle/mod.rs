// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod hostapd;
pub mod wext;

pub use crate::lifecycle::hostapd::{HostapdLifecycle, HostapdOptions};
pub use crate::lifecycle::wext::{FirmwarePaths, WextLifecycle, WextOptions};

use std::fmt;
use std::str::FromStr;

use crate::error::{SoftapError, SoftapResult};
use crate::params::{FirmwareMode, SoftapParams};

/// Soft-AP state owned by the controller and lent to the strategy for each
/// operation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Cached result of the last successful start or stop. Not re-queried.
    pub running: bool,
    /// Parameters of the last successful configure.
    pub params: SoftapParams,
}

/// How a configure call took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconfigure {
    /// The AP is stopped; the configuration is used by the next start.
    Stored,
    /// The AP is running and keeps its old configuration until restarted.
    Deferred,
    /// The service was stopped and started again. Associated stations were
    /// dropped.
    Restarted,
    /// The driver applied the configuration to the running AP.
    Applied,
}

/// What a configure call does while the AP is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconfigurePolicy {
    #[default]
    Defer,
    Restart,
}

impl FromStr for ReconfigurePolicy {
    type Err = SoftapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "defer" => Ok(ReconfigurePolicy::Defer),
            "restart" => Ok(ReconfigurePolicy::Restart),
            _ => Err(SoftapError::InvalidArgument(format!("unknown reconfigure policy `{s}`"))),
        }
    }
}

impl fmt::Display for ReconfigurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconfigurePolicy::Defer => write!(f, "defer"),
            ReconfigurePolicy::Restart => write!(f, "restart"),
        }
    }
}

/// ApLifecycle is the command sequence of one kind of soft-AP driver.
///
/// The controller owns the running flag and only calls `start` when the AP
/// is stopped and `stop` when it is running. Implementations never touch the
/// flag themselves.
pub trait ApLifecycle {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Fails when a handle the strategy needs could not be acquired. Checked
    /// by the controller before every start, even an idempotent one.
    fn check_resources(&self) -> SoftapResult<()> {
        Ok(())
    }

    /// Asks the OS whether the AP is up. `None` when the strategy has no way
    /// to tell.
    fn probe_running(&self) -> Option<bool> {
        None
    }

    /// AP interface of the configuration a previous controller stored.
    fn stored_interface(&self) -> Option<String> {
        None
    }

    fn start(&mut self, session: &Session) -> SoftapResult<()>;

    /// Takes the AP down. Once this returns `Ok` the controller considers
    /// the AP stopped, whatever [`ApLifecycle::after_stop`] reports.
    fn stop(&mut self, session: &Session) -> SoftapResult<()>;

    /// Interface cleanup that follows a successful stop.
    fn after_stop(&mut self, _session: &Session) -> SoftapResult<()> {
        Ok(())
    }

    /// Stores `params` for the AP. `session` still holds the previous
    /// parameters and the running flag. Returning `Deferred` while
    /// [`ApLifecycle::restart_to_apply`] holds makes the controller restart
    /// the AP.
    fn configure(&mut self, session: &Session, params: &SoftapParams)
        -> SoftapResult<Reconfigure>;

    /// Whether a configuration deferred by a running AP is applied through a
    /// stop and start.
    fn restart_to_apply(&self) -> bool {
        false
    }

    /// Switches the firmware of `interface` to `mode`.
    fn reload(&mut self, interface: &str, mode: FirmwareMode) -> SoftapResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconfigure_policy_from_str() {
        assert_eq!("Restart".parse::<ReconfigurePolicy>().unwrap(), ReconfigurePolicy::Restart);
        assert_eq!("defer".parse::<ReconfigurePolicy>().unwrap(), ReconfigurePolicy::Defer);
        assert!("later".parse::<ReconfigurePolicy>().is_err());
        assert_eq!(ReconfigurePolicy::default().to_string(), "defer");
    }

    #[test]
    fn test_session_default_is_stopped() {
        let session = Session::default();
        assert!(!session.running);
        assert_eq!(session.params.ssid, "AndroidAP");
    }
}
