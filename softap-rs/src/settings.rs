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

//! Controller settings read from a `key=value` file.
//!
//! The file is located through an explicit path, else `$SOFTAP_CONFIG`.
//! Without either every setting takes its default.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context};
use log::{info, warn};
use softap_common::util::ini_file::IniFile;

use crate::command::DEFAULT_COMMAND_CAPACITY;
use crate::controller::SoftapController;
use crate::error::SoftapError;
use crate::ifctl::WirelessSocket;
use crate::lifecycle::{
    ApLifecycle, FirmwarePaths, HostapdLifecycle, HostapdOptions, ReconfigurePolicy,
    WextLifecycle, WextOptions,
};
use crate::poll::{RetryPolicy, ThreadSleeper};
use crate::property::{AndroidPropertyBridge, PropertyBridge, SystemdPropertyBridge};
use crate::service::{ServiceControl, DEFAULT_SERVICE_NAME};
use crate::templater::{ConfigPaths, ConfigTemplater};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "SOFTAP_CONFIG";

const KNOWN_KEYS: &[&str] = &[
    "variant",
    "bridge",
    "service_name",
    "template_path",
    "config_path",
    "accept_path",
    "deny_path",
    "ctrl_socket_dir",
    "start_attempts",
    "start_interval_ms",
    "stop_attempts",
    "stop_interval_ms",
    "reconfigure",
    "restore_station_on_stop",
    "command_buffer_size",
    "fw_path_ap",
    "fw_path_sta",
    "fw_path_p2p",
];

/// Which [`ApLifecycle`] strategy drives the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// hostapd service plus configuration file.
    #[default]
    Hostapd,
    /// Vendor private commands sent straight to the driver.
    Wext,
}

impl FromStr for Variant {
    type Err = SoftapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hostapd" => Ok(Variant::Hostapd),
            "wext" => Ok(Variant::Wext),
            _ => Err(SoftapError::InvalidArgument(format!("unknown variant `{s}`"))),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Hostapd => "hostapd",
            Variant::Wext => "wext",
        })
    }
}

/// Backend of the property bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeKind {
    #[default]
    Android,
    Systemd,
}

impl FromStr for BridgeKind {
    type Err = SoftapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "android" => Ok(BridgeKind::Android),
            "systemd" => Ok(BridgeKind::Systemd),
            _ => Err(SoftapError::InvalidArgument(format!("unknown property bridge `{s}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub variant: Variant,
    pub bridge: BridgeKind,
    pub service_name: String,
    pub paths: ConfigPaths,
    pub ctrl_socket_dir: Option<PathBuf>,
    pub start_policy: RetryPolicy,
    pub stop_policy: RetryPolicy,
    pub reconfigure: ReconfigurePolicy,
    pub restore_station_on_stop: bool,
    pub command_buffer_size: usize,
    pub firmware: FirmwarePaths,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            variant: Variant::default(),
            bridge: BridgeKind::default(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            paths: ConfigPaths::default(),
            ctrl_socket_dir: None,
            start_policy: RetryPolicy::START,
            stop_policy: RetryPolicy::STOP,
            reconfigure: ReconfigurePolicy::default(),
            restore_station_on_stop: false,
            command_buffer_size: DEFAULT_COMMAND_CAPACITY,
            firmware: FirmwarePaths::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, else from the file named by
    /// `$SOFTAP_CONFIG`, else returns the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => {
                    info!("No settings file given, using defaults");
                    return Ok(Settings::default());
                }
            },
        };

        let mut ini = IniFile::new(path);
        ini.read().context("failed to read softap settings")?;
        let settings = Settings::from_ini(&ini)?;
        info!("Loaded settings from {} (variant {})", ini.path().display(), settings.variant);
        Ok(settings)
    }

    /// Builds settings from parsed `key=value` pairs. Unknown keys are
    /// ignored with a warning, malformed values are an error.
    pub fn from_ini(ini: &IniFile) -> anyhow::Result<Settings> {
        for key in ini.keys().filter(|key| !KNOWN_KEYS.iter().any(|known| known == key)) {
            warn!("Ignoring unknown setting `{key}` in {}", ini.path().display());
        }

        let mut settings = Settings::default();
        if let Some(variant) = ini.get_parsed::<Variant>("variant")? {
            settings.variant = variant;
        }
        if let Some(bridge) = ini.get_parsed::<BridgeKind>("bridge")? {
            settings.bridge = bridge;
        }
        if let Some(name) = ini.get("service_name") {
            ensure!(!name.is_empty(), "service_name must not be empty");
            settings.service_name = name.to_string();
        }

        let path_settings = [
            ("template_path", &mut settings.paths.template),
            ("config_path", &mut settings.paths.config),
            ("accept_path", &mut settings.paths.accept),
            ("deny_path", &mut settings.paths.deny),
        ];
        for (key, slot) in path_settings {
            if let Some(value) = ini.get(key).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }
        settings.ctrl_socket_dir =
            ini.get("ctrl_socket_dir").filter(|v| !v.is_empty()).map(PathBuf::from);

        settings.start_policy =
            read_policy(ini, "start_attempts", "start_interval_ms", settings.start_policy)?;
        settings.stop_policy =
            read_policy(ini, "stop_attempts", "stop_interval_ms", settings.stop_policy)?;

        if let Some(reconfigure) = ini.get_parsed::<ReconfigurePolicy>("reconfigure")? {
            settings.reconfigure = reconfigure;
        }
        if let Some(restore) = ini.get_bool("restore_station_on_stop")? {
            settings.restore_station_on_stop = restore;
        }
        if let Some(size) = ini.get_parsed::<usize>("command_buffer_size")? {
            ensure!(size > 0, "command_buffer_size must be positive");
            settings.command_buffer_size = size;
        }

        let firmware_settings = [
            ("fw_path_ap", &mut settings.firmware.ap),
            ("fw_path_sta", &mut settings.firmware.sta),
            ("fw_path_p2p", &mut settings.firmware.p2p),
        ];
        for (key, slot) in firmware_settings {
            if let Some(value) = ini.get(key).filter(|v| !v.is_empty()) {
                *slot = value.to_string();
            }
        }

        Ok(settings)
    }

    pub fn property_bridge(&self) -> Box<dyn PropertyBridge> {
        match self.bridge {
            BridgeKind::Android => Box::<AndroidPropertyBridge>::default(),
            BridgeKind::Systemd => Box::<SystemdPropertyBridge>::default(),
        }
    }

    /// Builds the strategy selected by `variant`. Sockets are opened here and
    /// held for the strategy's lifetime.
    pub fn build_lifecycle(&self) -> Box<dyn ApLifecycle> {
        match self.variant {
            Variant::Hostapd => {
                let service = ServiceControl::new(
                    &self.service_name,
                    self.property_bridge(),
                    Box::new(ThreadSleeper),
                    self.start_policy,
                    self.stop_policy,
                );
                let lifecycle = HostapdLifecycle::new(
                    ConfigTemplater::new(self.paths.clone()),
                    service,
                    HostapdOptions {
                        reconfigure: self.reconfigure,
                        ctrl_socket_dir: self.ctrl_socket_dir.clone(),
                    },
                );
                if self.restore_station_on_stop {
                    Box::new(lifecycle.with_station_restore(Box::new(WirelessSocket::open())))
                } else {
                    Box::new(lifecycle)
                }
            }
            Variant::Wext => Box::new(WextLifecycle::new(
                Box::new(WirelessSocket::open()),
                WextOptions {
                    command_capacity: self.command_buffer_size,
                    firmware: self.firmware.clone(),
                },
            )),
        }
    }

    pub fn build_controller(&self) -> SoftapController {
        SoftapController::new(self.build_lifecycle())
    }
}

fn read_policy(
    ini: &IniFile,
    attempts_key: &str,
    interval_key: &str,
    default: RetryPolicy,
) -> anyhow::Result<RetryPolicy> {
    let attempts = ini.get_parsed::<u32>(attempts_key)?.unwrap_or(default.attempts);
    ensure!(attempts > 0, "{attempts_key} must be at least 1");
    let interval = match ini.get_parsed::<u64>(interval_key)? {
        Some(ms) => Duration::from_millis(ms),
        None => default.interval,
    };
    Ok(RetryPolicy::new(attempts, interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocked::TempDir;
    use std::fs;

    fn ini(pairs: &[(&str, &str)]) -> IniFile {
        let mut ini = IniFile::new(PathBuf::from("softap.conf"));
        for (key, value) in pairs {
            ini.insert(key, value);
        }
        ini
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_ini(&ini(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.variant, Variant::Hostapd);
        assert_eq!(settings.start_policy.budget(), Duration::from_millis(19_800));
        assert_eq!(settings.stop_policy.attempts, 30);
        assert_eq!(settings.paths.config, PathBuf::from("/data/hostapd/hostapd.conf"));
        assert_eq!(settings.command_buffer_size, 4096);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_ini(&ini(&[
            ("variant", "wext"),
            ("bridge", "systemd"),
            ("start_attempts", "10"),
            ("start_interval_ms", "50"),
            ("reconfigure", "restart"),
            ("restore_station_on_stop", "yes"),
            ("config_path", "/tmp/hostapd.conf"),
            ("ctrl_socket_dir", "/var/run/hostapd"),
            ("fw_path_sta", "/lib/firmware/sta.bin"),
            ("something_else", "1"),
        ]))
        .unwrap();

        assert_eq!(settings.variant, Variant::Wext);
        assert_eq!(settings.bridge, BridgeKind::Systemd);
        assert_eq!(settings.start_policy, RetryPolicy::new(10, Duration::from_millis(50)));
        assert_eq!(settings.stop_policy, RetryPolicy::STOP);
        assert_eq!(settings.reconfigure, ReconfigurePolicy::Restart);
        assert!(settings.restore_station_on_stop);
        assert_eq!(settings.paths.config, PathBuf::from("/tmp/hostapd.conf"));
        assert_eq!(settings.ctrl_socket_dir, Some(PathBuf::from("/var/run/hostapd")));
        assert_eq!(settings.firmware.sta, "/lib/firmware/sta.bin");
    }

    #[test]
    fn test_malformed_values() {
        assert!(Settings::from_ini(&ini(&[("stop_attempts", "many")])).is_err());
        assert!(Settings::from_ini(&ini(&[("start_attempts", "0")])).is_err());
        assert!(Settings::from_ini(&ini(&[("variant", "nl80211")])).is_err());
        assert!(Settings::from_ini(&ini(&[("command_buffer_size", "0")])).is_err());
        assert!(Settings::from_ini(&ini(&[("restore_station_on_stop", "perhaps")])).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new("settings");
        let path = dir.path().join("softap.conf");
        fs::write(&path, "# lab setup\nvariant = hostapd\nstop_interval_ms = 100\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.stop_policy, RetryPolicy::new(30, Duration::from_millis(100)));
        assert!(Settings::load(Some(&dir.path().join("missing.conf"))).is_err());
    }

    #[test]
    fn test_build_hostapd_controller() {
        let controller = Settings::default().build_controller();
        assert!(!controller.is_running());
        assert_eq!(controller.interface(), "wlan0");
    }
}
