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

//! Soft-AP driven directly through the driver's vendor private commands.
//!
//! Used with drivers that run the access point in firmware. No service or
//! configuration file is involved: parameters travel to the driver as one
//! `ASCII_CMD=AP_CFG,...,END` string.

use std::io;

use log::{debug, info, warn};

use crate::command::{ap_config_command, firmware_path_command, DEFAULT_COMMAND_CAPACITY};
use crate::error::{SoftapError, SoftapResult};
use crate::ifctl::InterfaceControl;
use crate::lifecycle::{ApLifecycle, Reconfigure, Session};
use crate::params::{FirmwareMode, SoftapParams};

pub const AP_SET_CFG: &str = "AP_SET_CFG";
pub const AP_BSS_START: &str = "AP_BSS_START";
pub const AP_BSS_STOP: &str = "AP_BSS_STOP";
pub const WL_FW_RELOAD: &str = "WL_FW_RELOAD";

pub const DEFAULT_FW_PATH_AP: &str = "/system/vendor/firmware/fw_bcmdhd_apsta.bin";
pub const DEFAULT_FW_PATH_STA: &str = "/system/vendor/firmware/fw_bcmdhd.bin";
pub const DEFAULT_FW_PATH_P2P: &str = "/system/vendor/firmware/fw_bcmdhd_p2p.bin";

/// Firmware image loaded for each mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwarePaths {
    pub ap: String,
    pub sta: String,
    pub p2p: String,
}

impl Default for FirmwarePaths {
    fn default() -> Self {
        FirmwarePaths {
            ap: DEFAULT_FW_PATH_AP.to_string(),
            sta: DEFAULT_FW_PATH_STA.to_string(),
            p2p: DEFAULT_FW_PATH_P2P.to_string(),
        }
    }
}

impl FirmwarePaths {
    pub fn for_mode(&self, mode: FirmwareMode) -> &str {
        match mode {
            FirmwareMode::Ap => &self.ap,
            FirmwareMode::Sta => &self.sta,
            FirmwareMode::P2p => &self.p2p,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WextOptions {
    /// Capacity of the scratch buffer vendor commands are built in.
    pub command_capacity: usize,
    pub firmware: FirmwarePaths,
}

impl Default for WextOptions {
    fn default() -> Self {
        WextOptions { command_capacity: DEFAULT_COMMAND_CAPACITY, firmware: Default::default() }
    }
}

/// A rename done by start that stop has to undo.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Renamed {
    from: String,
    to: String,
}

pub struct WextLifecycle {
    ifctl: Box<dyn InterfaceControl>,
    options: WextOptions,
    renamed: Option<Renamed>,
}

impl WextLifecycle {
    pub fn new(ifctl: Box<dyn InterfaceControl>, options: WextOptions) -> WextLifecycle {
        WextLifecycle { ifctl, options, renamed: None }
    }

    /// Name the WLAN interface currently carries.
    fn current_interface<'a>(&'a self, params: &'a SoftapParams) -> &'a str {
        match &self.renamed {
            Some(renamed) => &renamed.to,
            None => &params.wlan_interface,
        }
    }

    /// Resolves `command` on `interface` and sends it with `payload`.
    fn send(&self, interface: &str, command: &str, payload: &str) -> SoftapResult<()> {
        let opcode = self.ifctl.resolve_vendor_command(interface, command)?;
        debug!("{interface}: {command} resolved to {opcode:#x}");
        self.ifctl.send_private_command(interface, opcode, payload)
    }

    fn move_interface(&self, from: &str, to: &str) -> SoftapResult<()> {
        self.ifctl.set_up(from, false)?;
        self.ifctl.rename(from, to)?;
        self.ifctl.set_up(to, true)
    }
}

impl ApLifecycle for WextLifecycle {
    fn name(&self) -> &'static str {
        "wext"
    }

    fn check_resources(&self) -> SoftapResult<()> {
        if self.ifctl.is_available() {
            return Ok(());
        }
        Err(SoftapError::unavailable(
            "interface control socket",
            io::Error::new(io::ErrorKind::NotConnected, "socket was not opened"),
        ))
    }

    fn start(&mut self, session: &Session) -> SoftapResult<()> {
        let params = &session.params;
        if self.renamed.is_none() && params.ap_interface != params.wlan_interface {
            self.move_interface(&params.wlan_interface, &params.ap_interface)?;
            self.renamed = Some(Renamed {
                from: params.wlan_interface.clone(),
                to: params.ap_interface.clone(),
            });
        }
        let interface = self.current_interface(params).to_string();
        if let Err(e) = self.send(&interface, AP_BSS_START, AP_BSS_START) {
            // The AP never came up, so stop will not run to undo the rename.
            if let Some(renamed) = self.renamed.take() {
                match self.move_interface(&renamed.to, &renamed.from) {
                    Ok(()) => info!("{}: rename to {} rolled back", renamed.from, renamed.to),
                    Err(rollback) => {
                        warn!("{}: rename rollback failed: {rollback}", renamed.to);
                        self.renamed = Some(renamed);
                    }
                }
            }
            return Err(e);
        }
        info!("{interface}: soft AP started");
        Ok(())
    }

    fn stop(&mut self, session: &Session) -> SoftapResult<()> {
        let interface = self.current_interface(&session.params);
        self.send(interface, AP_BSS_STOP, AP_BSS_STOP)?;
        info!("{interface}: soft AP stopped");
        Ok(())
    }

    fn after_stop(&mut self, _session: &Session) -> SoftapResult<()> {
        if let Some(renamed) = self.renamed.take() {
            if let Err(e) = self.move_interface(&renamed.to, &renamed.from) {
                self.renamed = Some(renamed);
                return Err(e);
            }
        }
        Ok(())
    }

    fn configure(
        &mut self,
        session: &Session,
        params: &SoftapParams,
    ) -> SoftapResult<Reconfigure> {
        // Built before any OS call so an overflow leaves the driver untouched.
        let command = ap_config_command(params, self.options.command_capacity)?;
        // The AP interface only exists under its own name between start and
        // stop; before that the radio still carries the WLAN name.
        let interface = self.current_interface(params);
        self.send(interface, AP_SET_CFG, &command)?;
        info!("{interface}: AP configuration set for SSID {}", params.ssid);
        Ok(if session.running { Reconfigure::Applied } else { Reconfigure::Stored })
    }

    fn reload(&mut self, interface: &str, mode: FirmwareMode) -> SoftapResult<()> {
        let path = self.options.firmware.for_mode(mode);
        let command = firmware_path_command(path, self.options.command_capacity)?;
        self.send(interface, WL_FW_RELOAD, &command)?;
        info!("{interface}: firmware reloaded for {mode} from {path}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocked::FakeInterfaceControl;
    use std::rc::Rc;

    fn lifecycle(ifctl: &Rc<FakeInterfaceControl>, capacity: usize) -> WextLifecycle {
        WextLifecycle::new(
            Box::new(ifctl.clone()),
            WextOptions { command_capacity: capacity, ..Default::default() },
        )
    }

    fn session(args: &[&str]) -> Session {
        Session { running: false, params: SoftapParams::from_args(args).unwrap() }
    }

    #[test]
    fn test_configure_sends_ap_cfg() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        let params =
            SoftapParams::from_args(&["wlan0", "wlan0", "Net", "wpa2-psk", "secretkey"]).unwrap();

        assert_eq!(wext.configure(&Session::default(), &params).unwrap(), Reconfigure::Stored);
        assert_eq!(
            ifctl.calls(),
            vec![
                "private_commands wlan0",
                "send wlan0 0x8be2 ASCII_CMD=AP_CFG,SSID=Net,SEC=wpa2-psk,KEY=secretkey,\
                 CHANNEL=6,PREAMBLE=0,MAX_SCB=8,END",
            ]
        );
    }

    #[test]
    fn test_configure_overflow_makes_no_os_call() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, 32);
        let err = wext.configure(&Session::default(), &SoftapParams::default()).unwrap_err();

        assert!(matches!(err, SoftapError::CommandTooLong { capacity: 32, .. }));
        assert!(ifctl.calls().is_empty());
    }

    #[test]
    fn test_configure_unsupported_command() {
        let ifctl = Rc::new(FakeInterfaceControl::with_commands(&[("AP_BSS_START", 0x8bec)]));
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        let err = wext.configure(&Session::default(), &SoftapParams::default()).unwrap_err();

        assert!(matches!(err, SoftapError::UnsupportedCommand { .. }));
        assert_eq!(ifctl.calls(), vec!["private_commands wlan0"]);
    }

    #[test]
    fn test_start_stop_renames_interface() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        let session = session(&["wlan0", "softap0"]);

        wext.start(&session).unwrap();
        assert_eq!(
            ifctl.calls(),
            vec![
                "set_up wlan0 false",
                "rename wlan0 softap0",
                "set_up softap0 true",
                "private_commands softap0",
                "send softap0 0x8bec AP_BSS_START",
            ]
        );

        ifctl.clear_calls();
        wext.stop(&session).unwrap();
        wext.after_stop(&session).unwrap();
        assert_eq!(
            ifctl.calls(),
            vec![
                "private_commands softap0",
                "send softap0 0x8bee AP_BSS_STOP",
                "set_up softap0 false",
                "rename softap0 wlan0",
                "set_up wlan0 true",
            ]
        );
    }

    #[test]
    fn test_failed_start_rolls_rename_back() {
        let ifctl = Rc::new(FakeInterfaceControl::with_commands(&[("AP_SET_CFG", 0x8be2)]));
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        let session = session(&["wlan0", "softap0"]);

        let err = wext.start(&session).unwrap_err();
        assert!(matches!(err, SoftapError::UnsupportedCommand { .. }));
        assert_eq!(
            ifctl.calls(),
            vec![
                "set_up wlan0 false",
                "rename wlan0 softap0",
                "set_up softap0 true",
                "private_commands softap0",
                "set_up softap0 false",
                "rename softap0 wlan0",
                "set_up wlan0 true",
            ]
        );
        assert_eq!(wext.renamed, None);
    }

    #[test]
    fn test_configure_follows_renamed_interface() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        let session = session(&["wlan0", "softap0"]);

        wext.configure(&session, &session.params).unwrap();
        assert_eq!(ifctl.calls()[0], "private_commands wlan0");

        wext.start(&session).unwrap();
        ifctl.clear_calls();
        let running = Session { running: true, ..session };
        assert_eq!(wext.configure(&running, &running.params).unwrap(), Reconfigure::Applied);
        assert_eq!(ifctl.calls()[0], "private_commands softap0");
    }

    #[test]
    fn test_start_same_interface_skips_rename() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        wext.start(&session(&["wlan0"])).unwrap();
        assert_eq!(ifctl.calls(), vec!["private_commands wlan0", "send wlan0 0x8bec AP_BSS_START"]);
    }

    #[test]
    fn test_check_resources_without_socket() {
        let wext = WextLifecycle::new(
            Box::new(FakeInterfaceControl::unavailable()),
            WextOptions::default(),
        );
        assert!(matches!(wext.check_resources(), Err(SoftapError::ResourceUnavailable { .. })));
    }

    #[test]
    fn test_reload_sends_firmware_path() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, DEFAULT_COMMAND_CAPACITY);
        wext.reload("wlan0", FirmwareMode::P2p).unwrap();
        assert_eq!(
            ifctl.calls(),
            vec![
                "private_commands wlan0",
                "send wlan0 0x8bf0 FW_PATH=/system/vendor/firmware/fw_bcmdhd_p2p.bin",
            ]
        );
    }

    #[test]
    fn test_reload_overflow_makes_no_os_call() {
        let ifctl = Rc::new(FakeInterfaceControl::broadcom());
        let mut wext = lifecycle(&ifctl, 16);
        assert!(wext.reload("wlan0", FirmwareMode::Sta).is_err());
        assert!(ifctl.calls().is_empty());
    }
}
