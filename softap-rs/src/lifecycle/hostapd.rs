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

//! Soft-AP driven by the hostapd service and its configuration file.

use std::io;
use std::path::PathBuf;

use log::{info, warn};

use crate::error::{SoftapError, SoftapResult};
use crate::ifctl::{InterfaceControl, InterfaceMode};
use crate::lifecycle::{ApLifecycle, Reconfigure, ReconfigurePolicy, Session};
use crate::params::{validate_interface, FirmwareMode, SoftapParams};
use crate::poll::wait_for_path;
use crate::property::STATE_RUNNING;
use crate::service::ServiceControl;
use crate::templater::{ConfigState, ConfigTemplater};

#[derive(Debug, Clone, Default)]
pub struct HostapdOptions {
    pub reconfigure: ReconfigurePolicy,
    /// Directory in which hostapd creates one control socket per interface.
    pub ctrl_socket_dir: Option<PathBuf>,
}

pub struct HostapdLifecycle {
    templater: ConfigTemplater,
    service: ServiceControl,
    options: HostapdOptions,
    /// Restores station mode after stop when present.
    station_restore: Option<Box<dyn InterfaceControl>>,
}

impl HostapdLifecycle {
    pub fn new(
        templater: ConfigTemplater,
        service: ServiceControl,
        options: HostapdOptions,
    ) -> HostapdLifecycle {
        HostapdLifecycle { templater, service, options, station_restore: None }
    }

    /// Switches the interface back to managed mode with an empty ESSID after
    /// every stop.
    pub fn with_station_restore(mut self, ifctl: Box<dyn InterfaceControl>) -> HostapdLifecycle {
        self.station_restore = Some(ifctl);
        self
    }

    pub fn templater(&self) -> &ConfigTemplater {
        &self.templater
    }
}

impl ApLifecycle for HostapdLifecycle {
    fn name(&self) -> &'static str {
        "hostapd"
    }

    fn check_resources(&self) -> SoftapResult<()> {
        match &self.station_restore {
            Some(ifctl) if !ifctl.is_available() => Err(SoftapError::unavailable(
                "interface control socket",
                io::Error::new(io::ErrorKind::NotConnected, "socket was not opened"),
            )),
            _ => Ok(()),
        }
    }

    /// A service init has never seen has no state property and is stopped.
    fn probe_running(&self) -> Option<bool> {
        Some(self.service.state().as_deref() == Some(STATE_RUNNING))
    }

    fn stored_interface(&self) -> Option<String> {
        if !self.templater.config_exists() {
            return None;
        }
        let doc = match self.templater.read_config() {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Cannot read back the working configuration: {e}");
                return None;
            }
        };
        let interface = doc.get("interface")?;
        match validate_interface(interface) {
            Ok(()) => Some(interface.to_string()),
            Err(e) => {
                warn!("Ignoring stored interface: {e}");
                None
            }
        }
    }

    fn start(&mut self, session: &Session) -> SoftapResult<()> {
        if self.templater.ensure_config_exists()? == ConfigState::Created {
            info!("Starting {} with the template configuration", self.service.name());
        }
        self.service.start()?;
        if let Some(dir) = &self.options.ctrl_socket_dir {
            let socket = dir.join(&session.params.ap_interface);
            wait_for_path(&socket, self.service.start_policy(), self.service.sleeper())?;
            info!("Control socket {} is present", socket.display());
        }
        Ok(())
    }

    fn stop(&mut self, _session: &Session) -> SoftapResult<()> {
        self.service.stop()
    }

    fn after_stop(&mut self, session: &Session) -> SoftapResult<()> {
        if let Some(ifctl) = &self.station_restore {
            let interface = &session.params.ap_interface;
            ifctl.set_mode(interface, InterfaceMode::Managed)?;
            ifctl.set_essid(interface, "")?;
            info!("{interface} restored to station mode");
        }
        Ok(())
    }

    fn configure(
        &mut self,
        session: &Session,
        params: &SoftapParams,
    ) -> SoftapResult<Reconfigure> {
        if self.templater.config_exists() {
            self.templater.patch_parameters(params)?;
        } else {
            self.templater.apply_parameters(params)?;
        }

        if !session.running {
            return Ok(Reconfigure::Stored);
        }
        if self.options.reconfigure == ReconfigurePolicy::Defer {
            warn!("Softap is running, new configuration takes effect on next start");
        }
        Ok(Reconfigure::Deferred)
    }

    fn restart_to_apply(&self) -> bool {
        self.options.reconfigure == ReconfigurePolicy::Restart
    }

    fn reload(&mut self, interface: &str, mode: FirmwareMode) -> SoftapResult<()> {
        info!("Firmware reload of {interface} to {mode} is not needed with hostapd");
        Ok(())
    }
}
