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

//! AP Lifecycle Controller.
//!
//! Owns the soft-AP session and sequences one [`ApLifecycle`] strategy. All
//! operations are blocking and run to completion.

use log::{debug, error, info, warn};

use crate::error::{SoftapError, SoftapResult};
use crate::lifecycle::{ApLifecycle, Reconfigure, Session};
use crate::params::{FirmwareMode, SoftapParams};

pub struct SoftapController {
    lifecycle: Box<dyn ApLifecycle>,
    session: Session,
}

impl SoftapController {
    pub fn new(lifecycle: Box<dyn ApLifecycle>) -> SoftapController {
        SoftapController { lifecycle, session: Session::default() }
    }

    /// Starts the soft AP. A running AP is left alone, but only after the
    /// strategy's resources have been checked.
    pub fn start(&mut self) -> SoftapResult<()> {
        self.lifecycle.check_resources().map_err(|e| {
            error!("Softap start failed: {e}");
            e
        })?;
        if self.session.running {
            debug!("Softap is already running");
            return Ok(());
        }

        info!("Starting softap on {} ({})", self.interface(), self.lifecycle.name());
        if let Err(e) = self.lifecycle.start(&self.session) {
            error!("Softap start failed: {e}");
            return Err(e);
        }
        self.session.running = true;
        info!("Softap started");
        Ok(())
    }

    /// Stops the soft AP. Returns at once when it is not running.
    ///
    /// The AP counts as stopped as soon as the strategy's stop succeeded, so
    /// a failing interface cleanup after it is reported without leaving the
    /// flag set.
    pub fn stop(&mut self) -> SoftapResult<()> {
        if !self.session.running {
            debug!("Softap is already stopped");
            return Ok(());
        }

        info!("Stopping softap on {} ({})", self.interface(), self.lifecycle.name());
        if let Err(e) = self.lifecycle.stop(&self.session) {
            error!("Softap stop failed: {e}");
            return Err(e);
        }
        self.session.running = false;
        if let Err(e) = self.lifecycle.after_stop(&self.session) {
            error!("Softap stopped, but restoring {} failed: {e}", self.interface());
            return Err(e);
        }
        info!("Softap stopped");
        Ok(())
    }

    /// Configures the soft AP from positional arguments: WLAN interface, AP
    /// interface, SSID, security, key, channel, preamble and max stations.
    /// Missing trailing arguments take their defaults.
    pub fn configure<S: AsRef<str>>(&mut self, args: &[S]) -> SoftapResult<Reconfigure> {
        let params = SoftapParams::from_args(args).map_err(|e| {
            error!("Softap configure rejected: {e}");
            e
        })?;
        self.configure_params(params)
    }

    pub fn configure_params(&mut self, params: SoftapParams) -> SoftapResult<Reconfigure> {
        params.validate()?;
        let outcome = self.lifecycle.configure(&self.session, &params).map_err(|e| {
            error!("Softap configure failed: {e}");
            e
        })?;
        // Stored by the strategy from here on, even if the restart fails.
        self.session.params = params;
        if outcome == Reconfigure::Deferred && self.lifecycle.restart_to_apply() {
            return self.restart();
        }
        info!("Softap configured for SSID {} ({outcome:?})", self.session.params.ssid);
        Ok(outcome)
    }

    /// Stop then start, each keeping the running flag in step with what it
    /// observed.
    fn restart(&mut self) -> SoftapResult<Reconfigure> {
        info!("Restarting softap ({}) to apply the new configuration", self.lifecycle.name());
        self.stop()?;
        self.start()?;
        warn!(
            "Softap restarted for SSID {}, associated stations were dropped",
            self.session.params.ssid
        );
        Ok(Reconfigure::Restarted)
    }

    /// Reloads firmware from positional arguments: interface and mode.
    pub fn reload<S: AsRef<str>>(&mut self, args: &[S]) -> SoftapResult<()> {
        let [interface, mode] = args else {
            return Err(SoftapError::InvalidArgument(format!(
                "fwreload takes an interface and a mode, got {} arguments",
                args.len()
            )));
        };
        let mode: FirmwareMode = mode.as_ref().parse()?;
        self.reload_firmware(interface.as_ref(), mode)
    }

    pub fn reload_firmware(&mut self, interface: &str, mode: FirmwareMode) -> SoftapResult<()> {
        self.lifecycle.reload(interface, mode).map_err(|e| {
            error!("Firmware reload of {interface} to {mode} failed: {e}");
            e
        })
    }

    /// Cached running flag. Not re-queried, so it goes stale when the AP
    /// dies behind the controller's back.
    pub fn is_running(&self) -> bool {
        self.session.running
    }

    /// Takes over the session a previous controller left behind: the AP
    /// interface of the stored configuration and the running state the OS
    /// reports. Fails with `StateUnknown` when the strategy cannot observe
    /// the running state.
    pub fn recover_session(&mut self) -> SoftapResult<()> {
        if let Some(interface) = self.lifecycle.stored_interface() {
            debug!("Stored configuration uses {interface}");
            self.session.params.ap_interface = interface;
        }
        let Some(running) = self.lifecycle.probe_running() else {
            return Err(SoftapError::StateUnknown { strategy: self.lifecycle.name() });
        };
        if running != self.session.running {
            info!("Softap found {}", if running { "running" } else { "stopped" });
            self.session.running = running;
        }
        Ok(())
    }

    /// AP interface of the current configuration.
    pub fn interface(&self) -> &str {
        &self.session.params.ap_interface
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
