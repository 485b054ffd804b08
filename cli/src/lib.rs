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

//! Command Line Interface for the soft AP controller

mod args;
pub mod shell;

use std::io;

use anyhow::Context;
use clap::Parser;
use log::{debug, error, info, warn};
use softap_common::util::softap_logger;
use softap_rs::settings::Settings;
use softap_rs::SoftapController;

use crate::args::{Command, SoftapArgs};
use crate::shell::Response;

/// Parses the command line, executes it and returns whether it succeeded.
pub fn run() -> anyhow::Result<bool> {
    let args = SoftapArgs::parse();
    softap_logger::init("softapctl", args.verbose);

    let settings = Settings::load(args.config.as_deref())?;
    let mut controller = settings.build_controller();

    let response = match args.command {
        Command::Shell => {
            if let Err(e) = controller.recover_session() {
                info!("Shell starts with the soft AP stopped: {e}");
            }
            info!("softapctl shell ready");
            shell::run(&mut controller, io::stdin().lock(), io::stdout().lock())
                .context("softap shell I/O failed")?;
            return Ok(true);
        }
        command => one_shot(&mut controller, command),
    };
    println!("{response}");
    Ok(response != Response::Failed)
}

/// Runs `command` on a controller built for this process alone.
///
/// Nothing survives between invocations except what the OS shows, so the
/// session is recovered first. `start`, `stop` and `status` fail when it
/// cannot be, instead of acting on a guessed running state.
fn one_shot(controller: &mut SoftapController, command: Command) -> Response {
    let recovered = controller.recover_session();
    if let Err(e) = &recovered {
        debug!("No session to recover: {e}");
    }
    let needs_state = matches!(command, Command::Start | Command::Stop | Command::Status);
    if let (true, Err(e)) = (needs_state, recovered) {
        error!("{e}; use `softapctl shell` to keep one controller across commands");
        return Response::Failed;
    }

    match command {
        Command::Start => Response::from_result(controller.start()),
        Command::Stop => Response::from_result(controller.stop()),
        Command::Status => Response::Status { running: controller.is_running() },
        Command::Set(set) => Response::from_result(controller.configure(set.params.as_slice())),
        Command::Fwreload(reload) => Response::from_result(
            controller.reload_firmware(&reload.interface, reload.mode),
        ),
        Command::Shell => {
            warn!("The shell only runs as the command of its own process");
            Response::UnknownCommand
        }
    }
}

/// Entry point of the `softapctl` binary.
pub fn rust_main() -> i32 {
    match run() {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            error!("{e:#}");
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{FwReload, Set};
    use softap_rs::ifctl::{InterfaceControl, InterfaceMode, PrivateCommand};
    use softap_rs::lifecycle::{HostapdLifecycle, HostapdOptions, WextLifecycle, WextOptions};
    use softap_rs::params::FirmwareMode;
    use softap_rs::poll::{RetryPolicy, Sleeper};
    use softap_rs::property::PropertyBridge;
    use softap_rs::service::ServiceControl;
    use softap_rs::templater::{ConfigPaths, ConfigTemplater};
    use softap_rs::SoftapResult;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::env;
    use std::rc::Rc;
    use std::time::Duration;

    /// Driver that advertises every soft-AP command and records each send.
    #[derive(Default)]
    struct Driver {
        sent: RefCell<Vec<String>>,
    }

    impl InterfaceControl for Driver {
        fn is_available(&self) -> bool {
            true
        }

        fn private_commands(&self, _interface: &str) -> SoftapResult<Vec<PrivateCommand>> {
            Ok(["AP_SET_CFG", "AP_BSS_START", "AP_BSS_STOP", "WL_FW_RELOAD"]
                .iter()
                .zip(0x8be2..)
                .map(|(name, opcode)| PrivateCommand { name: name.to_string(), opcode })
                .collect())
        }

        fn send_private_command(
            &self,
            interface: &str,
            _opcode: u32,
            payload: &str,
        ) -> SoftapResult<()> {
            let command = payload.split(|c: char| c == ',' || c == '=').next().unwrap_or("");
            self.sent.borrow_mut().push(format!("{interface} {command}"));
            Ok(())
        }

        fn set_mode(&self, _interface: &str, _mode: InterfaceMode) -> SoftapResult<()> {
            Ok(())
        }

        fn set_essid(&self, _interface: &str, _essid: &str) -> SoftapResult<()> {
            Ok(())
        }

        fn set_up(&self, _interface: &str, _up: bool) -> SoftapResult<()> {
            Ok(())
        }

        fn rename(&self, _from: &str, _to: &str) -> SoftapResult<()> {
            Ok(())
        }
    }

    /// init stand-in whose service follows every request at once.
    #[derive(Default)]
    struct Init {
        values: RefCell<HashMap<String, String>>,
    }

    impl PropertyBridge for Init {
        fn get(&self, key: &str) -> Option<String> {
            self.values.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> SoftapResult<()> {
            let state = if key == "ctl.start" { "running" } else { "stopped" };
            self.values.borrow_mut().insert(format!("init.svc.{value}"), state.to_string());
            Ok(())
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    fn wext_process(driver: &Rc<Driver>) -> SoftapController {
        SoftapController::new(Box::new(WextLifecycle::new(
            Box::new(driver.clone()),
            WextOptions::default(),
        )))
    }

    fn hostapd_process(init: &Rc<Init>) -> SoftapController {
        let dir = env::temp_dir().join(format!("softapctl_absent_{}", std::process::id()));
        let templater = ConfigTemplater::new(ConfigPaths {
            template: dir.join("hostapd_default.conf"),
            config: dir.join("hostapd.conf"),
            accept: dir.join("hostapd.accept"),
            deny: dir.join("hostapd.deny"),
        });
        let service = ServiceControl::new(
            "hostapd",
            Box::new(init.clone()),
            Box::new(NoSleep),
            RetryPolicy::START,
            RetryPolicy::STOP,
        );
        SoftapController::new(Box::new(HostapdLifecycle::new(
            templater,
            service,
            HostapdOptions::default(),
        )))
    }

    #[test]
    fn test_wext_refuses_state_commands() {
        let driver = Rc::new(Driver::default());
        for command in [Command::Start, Command::Stop, Command::Status] {
            assert_eq!(one_shot(&mut wext_process(&driver), command), Response::Failed);
        }
        assert!(driver.sent.borrow().is_empty());
    }

    #[test]
    fn test_wext_set_and_reload_need_no_session() {
        let driver = Rc::new(Driver::default());
        let set = Set { params: vec!["wlan0".to_string(), "wlan0".to_string(), "Lab".to_string()] };
        assert_eq!(one_shot(&mut wext_process(&driver), Command::Set(set)), Response::Succeeded);
        let reload = FwReload { interface: "wlan0".to_string(), mode: FirmwareMode::Ap };
        assert_eq!(
            one_shot(&mut wext_process(&driver), Command::Fwreload(reload)),
            Response::Succeeded
        );
        assert_eq!(*driver.sent.borrow(), vec!["wlan0 ASCII_CMD", "wlan0 FW_PATH"]);
    }

    #[test]
    fn test_hostapd_stop_in_new_process() {
        let init = Rc::new(Init::default());
        init.set("ctl.start", "hostapd").unwrap();

        assert_eq!(
            one_shot(&mut hostapd_process(&init), Command::Status),
            Response::Status { running: true }
        );
        assert_eq!(one_shot(&mut hostapd_process(&init), Command::Stop), Response::Succeeded);
        assert_eq!(init.get("init.svc.hostapd").as_deref(), Some("stopped"));
        assert_eq!(
            one_shot(&mut hostapd_process(&init), Command::Status),
            Response::Status { running: false }
        );
    }
}
