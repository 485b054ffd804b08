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

//! Configuration File Templater.
//!
//! Produces the working hostapd.conf from a read-only template and keeps the
//! accept/deny station lists hostapd expects next to it.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{SoftapError, SoftapResult};
use crate::hostapd_conf::ConfigDocument;
use crate::params::{Security, SoftapParams};

pub const DEFAULT_TEMPLATE_PATH: &str = "/system/etc/hostapd/hostapd_default.conf";
pub const DEFAULT_CONFIG_PATH: &str = "/data/hostapd/hostapd.conf";
pub const DEFAULT_ACCEPT_PATH: &str = "/data/hostapd/hostapd.accept";
pub const DEFAULT_DENY_PATH: &str = "/data/hostapd/hostapd.deny";

// Readable by the wifi group that hostapd runs in, never world readable.
const CONFIG_FILE_MODE: u32 = 0o660;

const RSN_PAIRWISE: &str = "CCMP";
const WPA_PAIRWISE: &str = "TKIP";
const WPA_KEY_MGMT: &str = "WPA-PSK";

/// Locations of the files the templater reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub template: PathBuf,
    pub config: PathBuf,
    pub accept: PathBuf,
    pub deny: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        ConfigPaths {
            template: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            accept: PathBuf::from(DEFAULT_ACCEPT_PATH),
            deny: PathBuf::from(DEFAULT_DENY_PATH),
        }
    }
}

/// What `ensure_config_exists` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigState {
    /// The working file was already present and left untouched.
    Existing,
    /// The working file was copied from the template.
    Created,
}

pub struct ConfigTemplater {
    paths: ConfigPaths,
}

impl ConfigTemplater {
    pub fn new(paths: ConfigPaths) -> ConfigTemplater {
        ConfigTemplater { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn config_exists(&self) -> bool {
        self.paths.config.is_file()
    }

    /// Makes sure a working configuration is present.
    ///
    /// An existing working file is left as is. Otherwise the directory and the
    /// accept/deny lists are created and the template is copied verbatim.
    pub fn ensure_config_exists(&self) -> SoftapResult<ConfigState> {
        if self.config_exists() {
            return Ok(ConfigState::Existing);
        }

        self.prepare_directory()?;
        let template = self.read_template()?;
        write_atomically(&self.paths.config, &template)?;
        info!(
            "Created {} from template {}",
            self.paths.config.display(),
            self.paths.template.display()
        );
        Ok(ConfigState::Created)
    }

    /// Renders the template with `params` and replaces the working file.
    pub fn apply_parameters(&self, params: &SoftapParams) -> SoftapResult<()> {
        params.validate()?;
        self.prepare_directory()?;
        let mut doc = ConfigDocument::parse(&self.read_template()?);
        substitute(&mut doc, params);
        write_atomically(&self.paths.config, &doc.to_string())?;
        info!("Wrote {} for SSID {}", self.paths.config.display(), params.ssid);
        Ok(())
    }

    /// Substitutes `params` into the current working file, keeping every
    /// other line as it is.
    pub fn patch_parameters(&self, params: &SoftapParams) -> SoftapResult<()> {
        params.validate()?;
        let mut doc = self.read_config()?;
        substitute(&mut doc, params);
        write_atomically(&self.paths.config, &doc.to_string())?;
        info!("Patched {} for SSID {}", self.paths.config.display(), params.ssid);
        Ok(())
    }

    /// Reads back the working configuration.
    pub fn read_config(&self) -> SoftapResult<ConfigDocument> {
        let text = fs::read_to_string(&self.paths.config)
            .map_err(|e| SoftapError::io(&self.paths.config, e))?;
        Ok(ConfigDocument::parse(&text))
    }

    fn read_template(&self) -> SoftapResult<String> {
        fs::read_to_string(&self.paths.template).map_err(|e| {
            SoftapError::unavailable(format!("template {}", self.paths.template.display()), e)
        })
    }

    /// Creates the working directory and empty accept/deny lists.
    fn prepare_directory(&self) -> SoftapResult<()> {
        if let Some(dir) = self.paths.config.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                SoftapError::unavailable(format!("config directory {}", dir.display()), e)
            })?;
        }
        for list in [&self.paths.accept, &self.paths.deny] {
            if list.exists() {
                continue;
            }
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(list)
                .map_err(|e| SoftapError::unavailable(format!("{}", list.display()), e))?;
            debug!("Created empty {}", list.display());
        }
        Ok(())
    }
}

/// Rewrites the keys driven by `params`. Security keys are commented out
/// rather than removed for open networks.
fn substitute(doc: &mut ConfigDocument, params: &SoftapParams) {
    doc.set("interface", &params.ap_interface);
    doc.set("ssid", &params.ssid);
    doc.set("channel", &params.channel.to_string());
    doc.set("preamble", &params.preamble.to_string());
    doc.set("max_num_sta", &params.max_stations.to_string());

    match params.security {
        Security::Open => {
            for key in
                ["wpa", "wpa_passphrase", "wpa_psk", "wpa_key_mgmt", "wpa_pairwise", "rsn_pairwise"]
            {
                doc.comment_out(key);
            }
        }
        Security::WpaPsk => {
            doc.set("wpa", "1");
            set_key(doc, &params.key);
            doc.set("wpa_key_mgmt", WPA_KEY_MGMT);
            doc.set("wpa_pairwise", WPA_PAIRWISE);
            doc.comment_out("rsn_pairwise");
        }
        Security::Wpa2Psk => {
            doc.set("wpa", "2");
            set_key(doc, &params.key);
            doc.set("wpa_key_mgmt", WPA_KEY_MGMT);
            doc.set("rsn_pairwise", RSN_PAIRWISE);
            doc.comment_out("wpa_pairwise");
        }
    }
}

/// A 64 digit key is a raw PSK, anything else a passphrase.
fn set_key(doc: &mut ConfigDocument, key: &str) {
    if key.len() == 64 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        doc.set("wpa_psk", key);
        doc.comment_out("wpa_passphrase");
    } else {
        doc.set("wpa_passphrase", key);
        doc.comment_out("wpa_psk");
    }
}

/// Writes `contents` to a sibling temporary file and renames it over `path`
/// so hostapd never reads a half written configuration.
fn write_atomically(path: &Path, contents: &str) -> SoftapResult<()> {
    let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = File::create(&tmp_path)
        .map_err(|e| SoftapError::unavailable(format!("{}", tmp_path.display()), e))?;
    let written = file
        .write_all(contents.as_bytes())
        .and_then(|_| file.set_permissions(fs::Permissions::from_mode(CONFIG_FILE_MODE)))
        .and_then(|_| file.sync_all());
    drop(file);
    if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(SoftapError::io(path, e));
    }
    Ok(())
}
