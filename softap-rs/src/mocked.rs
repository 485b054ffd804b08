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

//! Fakes for the controller's seams, shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use rand::{distributions::Alphanumeric, Rng};

use crate::error::{SoftapError, SoftapResult};
use crate::ifctl::{InterfaceControl, InterfaceMode, PrivateCommand};
use crate::lifecycle::{ApLifecycle, Reconfigure, Session};
use crate::params::{FirmwareMode, SoftapParams};
use crate::poll::Sleeper;
use crate::property::{
    service_state_key, PropertyBridge, CTL_START, CTL_STOP, STATE_RUNNING, STATE_STOPPED,
};

/// In-memory property store.
///
/// A reactive store behaves like init: a `ctl.start`/`ctl.stop` request
/// moves `init.svc.<service>` to running/stopped once the state key has been
/// read `delay` more times.
#[derive(Default)]
pub struct FakeProperties {
    values: RefCell<HashMap<String, String>>,
    sets: RefCell<Vec<(String, String)>>,
    gets: RefCell<HashMap<String, u32>>,
    reactive: bool,
    delay: Cell<u32>,
    pending: RefCell<Option<(String, String, u32)>>,
}

impl FakeProperties {
    pub fn hostapd() -> FakeProperties {
        FakeProperties { reactive: true, ..Default::default() }
    }

    pub fn delay_transitions(&self, reads: u32) {
        self.delay.set(reads);
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
    }

    /// Reads `key` without counting it or advancing a pending transition.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn sets(&self) -> Vec<(String, String)> {
        self.sets.borrow().clone()
    }

    pub fn get_count(&self, key: &str) -> u32 {
        self.gets.borrow().get(key).copied().unwrap_or(0)
    }
}

impl PropertyBridge for FakeProperties {
    fn get(&self, key: &str) -> Option<String> {
        *self.gets.borrow_mut().entry(key.to_string()).or_default() += 1;

        let mut pending = self.pending.borrow_mut();
        if let Some((pending_key, value, remaining)) = pending.as_mut() {
            if pending_key == key {
                if *remaining == 0 {
                    self.insert(key, value);
                    *pending = None;
                } else {
                    *remaining -= 1;
                }
            }
        }
        self.value(key)
    }

    fn set(&self, key: &str, value: &str) -> SoftapResult<()> {
        self.sets.borrow_mut().push((key.to_string(), value.to_string()));
        if !self.reactive {
            return Ok(());
        }
        let target = match key {
            CTL_START => STATE_RUNNING,
            CTL_STOP => STATE_STOPPED,
            _ => {
                self.insert(key, value);
                return Ok(());
            }
        };
        *self.pending.borrow_mut() =
            Some((service_state_key(value), target.to_string(), self.delay.get()));
        Ok(())
    }
}

/// Sleeper that only records what it was asked to do.
#[derive(Default)]
pub struct RecordingSleeper {
    count: Cell<u32>,
    total: Cell<Duration>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> u32 {
        self.count.get()
    }

    pub fn total(&self) -> Duration {
        self.total.get()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.count.set(self.count.get() + 1);
        self.total.set(self.total.get() + duration);
    }
}

/// Interface adapter that records every kernel request as a line of text.
pub struct FakeInterfaceControl {
    available: bool,
    commands: Vec<PrivateCommand>,
    calls: RefCell<Vec<String>>,
}

impl Default for FakeInterfaceControl {
    fn default() -> Self {
        FakeInterfaceControl { available: true, commands: Vec::new(), calls: RefCell::default() }
    }
}

impl FakeInterfaceControl {
    pub fn with_commands(commands: &[(&str, u32)]) -> FakeInterfaceControl {
        FakeInterfaceControl {
            commands: commands
                .iter()
                .map(|&(name, opcode)| PrivateCommand { name: name.to_string(), opcode })
                .collect(),
            ..Default::default()
        }
    }

    /// A driver table with every soft-AP command.
    pub fn broadcom() -> FakeInterfaceControl {
        FakeInterfaceControl::with_commands(&[
            ("SCAN-ACTIVE", 0x8be1),
            ("AP_SET_CFG", 0x8be2),
            ("AP_BSS_START", 0x8bec),
            ("AP_BSS_STOP", 0x8bee),
            ("WL_FW_RELOAD", 0x8bf0),
        ])
    }

    pub fn unavailable() -> FakeInterfaceControl {
        FakeInterfaceControl { available: false, ..Default::default() }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: String) -> SoftapResult<()> {
        if !self.available {
            return Err(SoftapError::unavailable(
                "interface control socket",
                io::Error::new(io::ErrorKind::NotConnected, "fake socket closed"),
            ));
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl InterfaceControl for FakeInterfaceControl {
    fn is_available(&self) -> bool {
        self.available
    }

    fn private_commands(&self, interface: &str) -> SoftapResult<Vec<PrivateCommand>> {
        self.record(format!("private_commands {interface}"))?;
        Ok(self.commands.clone())
    }

    fn send_private_command(
        &self,
        interface: &str,
        opcode: u32,
        payload: &str,
    ) -> SoftapResult<()> {
        self.record(format!("send {interface} {opcode:#x} {payload}"))
    }

    fn set_mode(&self, interface: &str, mode: InterfaceMode) -> SoftapResult<()> {
        self.record(format!("set_mode {interface} {mode:?}"))
    }

    fn set_essid(&self, interface: &str, essid: &str) -> SoftapResult<()> {
        self.record(format!("set_essid {interface} {essid:?}"))
    }

    fn set_up(&self, interface: &str, up: bool) -> SoftapResult<()> {
        self.record(format!("set_up {interface} {up}"))
    }

    fn rename(&self, from: &str, to: &str) -> SoftapResult<()> {
        self.record(format!("rename {from} {to}"))
    }
}

/// Strategy that records calls and fails on request.
pub struct FakeLifecycle {
    calls: RefCell<Vec<String>>,
    resources: Cell<bool>,
    fail: RefCell<Option<&'static str>>,
    probe: Cell<Option<bool>>,
    stored_interface: RefCell<Option<String>>,
    restart_to_apply: Cell<bool>,
}

impl Default for FakeLifecycle {
    fn default() -> Self {
        FakeLifecycle {
            calls: RefCell::default(),
            resources: Cell::new(true),
            fail: RefCell::default(),
            probe: Cell::new(None),
            stored_interface: RefCell::default(),
            restart_to_apply: Cell::new(false),
        }
    }
}

impl FakeLifecycle {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn set_resources_available(&self, available: bool) {
        self.resources.set(available);
    }

    /// Makes the next call to `operation` fail.
    pub fn fail_next(&self, operation: &'static str) {
        *self.fail.borrow_mut() = Some(operation);
    }

    pub fn set_probe(&self, running: Option<bool>) {
        self.probe.set(running);
    }

    pub fn set_stored_interface(&self, interface: &str) {
        *self.stored_interface.borrow_mut() = Some(interface.to_string());
    }

    pub fn set_restart_to_apply(&self, restart: bool) {
        self.restart_to_apply.set(restart);
    }

    fn record(&self, operation: &'static str, call: String) -> SoftapResult<()> {
        self.calls.borrow_mut().push(call);
        let mut fail = self.fail.borrow_mut();
        if *fail == Some(operation) {
            *fail = None;
            return Err(SoftapError::Property(format!("injected {operation} failure")));
        }
        Ok(())
    }
}

impl ApLifecycle for Rc<FakeLifecycle> {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn check_resources(&self) -> SoftapResult<()> {
        self.calls.borrow_mut().push("check".to_string());
        if self.resources.get() {
            return Ok(());
        }
        Err(SoftapError::unavailable(
            "fake handle",
            io::Error::new(io::ErrorKind::NotConnected, "closed"),
        ))
    }

    fn probe_running(&self) -> Option<bool> {
        self.probe.get()
    }

    fn stored_interface(&self) -> Option<String> {
        self.stored_interface.borrow().clone()
    }

    fn start(&mut self, _session: &Session) -> SoftapResult<()> {
        self.record("start", "start".to_string())
    }

    fn stop(&mut self, _session: &Session) -> SoftapResult<()> {
        self.record("stop", "stop".to_string())
    }

    fn after_stop(&mut self, _session: &Session) -> SoftapResult<()> {
        self.record("after_stop", "after_stop".to_string())
    }

    fn configure(
        &mut self,
        session: &Session,
        _params: &SoftapParams,
    ) -> SoftapResult<Reconfigure> {
        self.record("configure", "configure".to_string())?;
        Ok(if session.running { Reconfigure::Deferred } else { Reconfigure::Stored })
    }

    fn restart_to_apply(&self) -> bool {
        self.restart_to_apply.get()
    }

    fn reload(&mut self, interface: &str, mode: FirmwareMode) -> SoftapResult<()> {
        self.record("reload", format!("reload {interface} {mode}"))
    }
}

/// A uniquely named directory under the system temp dir, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> TempDir {
        let suffix: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(8).map(char::from).collect();
        let path = env::temp_dir().join(format!("softap_{prefix}_{suffix}"));
        fs::create_dir_all(&path).unwrap();
        TempDir { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
