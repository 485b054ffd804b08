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

//! Property Bridge: the key/value mechanism used to request service start
//! and stop and to observe service state.
//!
//! Keys follow the init property conventions: a start or stop request is a
//! write of the service name to `ctl.start` / `ctl.stop`, and the state is
//! read back from `init.svc.<service>`.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::rc::Rc;

use log::{debug, warn};

use crate::error::{SoftapError, SoftapResult};

pub const CTL_START: &str = "ctl.start";
pub const CTL_STOP: &str = "ctl.stop";
pub const STATE_RUNNING: &str = "running";
pub const STATE_STOPPED: &str = "stopped";

const STATE_KEY_PREFIX: &str = "init.svc.";

/// Returns the property holding the state of `service`.
pub fn service_state_key(service: &str) -> String {
    format!("{STATE_KEY_PREFIX}{service}")
}

pub trait PropertyBridge {
    /// Reads a property. Absent and empty properties are both `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a property.
    fn set(&self, key: &str, value: &str) -> SoftapResult<()>;
}

impl<T: PropertyBridge + ?Sized> PropertyBridge for Rc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> SoftapResult<()> {
        (**self).set(key, value)
    }
}

/// Runs `program args..` and returns its trimmed stdout, or `None` when the
/// program could not run, failed, or printed nothing.
fn run_for_output<I, S>(program: &OsStr, args: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = match Command::new(program).args(args).stdin(Stdio::null()).output() {
        Ok(output) => output,
        Err(e) => {
            warn!("failed to run {}: {e}", program.to_string_lossy());
            return None;
        }
    };
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

fn run_for_status<I, S>(program: &OsStr, args: I) -> SoftapResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.to_string_lossy();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SoftapError::Property(format!("failed to run {program_name}: {e}")))?;
    if !output.status.success() {
        return Err(SoftapError::Property(format!(
            "{program_name} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Talks to the Android property service through `getprop` and `setprop`.
pub struct AndroidPropertyBridge {
    getprop: PathBuf,
    setprop: PathBuf,
}

impl Default for AndroidPropertyBridge {
    fn default() -> Self {
        AndroidPropertyBridge::new(PathBuf::from("getprop"), PathBuf::from("setprop"))
    }
}

impl AndroidPropertyBridge {
    pub fn new(getprop: PathBuf, setprop: PathBuf) -> Self {
        AndroidPropertyBridge { getprop, setprop }
    }
}

impl PropertyBridge for AndroidPropertyBridge {
    fn get(&self, key: &str) -> Option<String> {
        run_for_output(self.getprop.as_os_str(), [key])
    }

    fn set(&self, key: &str, value: &str) -> SoftapResult<()> {
        debug!("setprop {key} {value}");
        run_for_status(self.setprop.as_os_str(), [key, value])
    }
}

/// Maps the init property conventions onto systemd units.
///
/// * `set("ctl.start", svc)` runs `systemctl start --no-block svc`
/// * `set("ctl.stop", svc)` runs `systemctl stop --no-block svc`
/// * `get("init.svc.<svc>")` runs `systemctl is-active svc` and reports
///   `active` as `running` and `inactive`/`failed` as `stopped`
pub struct SystemdPropertyBridge {
    systemctl: PathBuf,
}

impl Default for SystemdPropertyBridge {
    fn default() -> Self {
        SystemdPropertyBridge { systemctl: PathBuf::from("systemctl") }
    }
}

impl SystemdPropertyBridge {
    pub fn new(systemctl: PathBuf) -> Self {
        SystemdPropertyBridge { systemctl }
    }
}

/// Translates a `systemctl is-active` answer into an init service state.
pub(crate) fn systemd_state_to_property(state: &str) -> String {
    match state {
        "active" => STATE_RUNNING.to_string(),
        "inactive" | "failed" => STATE_STOPPED.to_string(),
        other => other.to_string(),
    }
}

impl PropertyBridge for SystemdPropertyBridge {
    fn get(&self, key: &str) -> Option<String> {
        let Some(unit) = key.strip_prefix(STATE_KEY_PREFIX) else {
            warn!("systemd bridge has no mapping for property `{key}`");
            return None;
        };
        // `is-active` exits non-zero for inactive units but still prints the state.
        run_for_output(self.systemctl.as_os_str(), ["is-active", unit])
            .map(|state| systemd_state_to_property(&state))
    }

    fn set(&self, key: &str, value: &str) -> SoftapResult<()> {
        let verb = match key {
            CTL_START => "start",
            CTL_STOP => "stop",
            other => {
                return Err(SoftapError::InvalidArgument(format!(
                    "systemd bridge cannot set property `{other}`"
                )))
            }
        };
        debug!("systemctl {verb} --no-block {value}");
        run_for_status(self.systemctl.as_os_str(), [verb, "--no-block", value])
    }
}
