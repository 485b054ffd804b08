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

//! Soft-AP parameters as they arrive on the invocation surface.
//!
//! Callers pass an ordered list of strings:
//!
//! | position | meaning            | default        |
//! |----------|--------------------|----------------|
//! | 0        | WLAN interface     | `wlan0`        |
//! | 1        | AP interface       | WLAN interface |
//! | 2        | SSID               | `AndroidAP`    |
//! | 3        | security mode      | `open`         |
//! | 4        | key / passphrase   | `12345678`     |
//! | 5        | channel            | `6`            |
//! | 6        | preamble           | `0`            |
//! | 7        | max station count  | `8`            |

use std::fmt;
use std::str::FromStr;

use crate::error::{SoftapError, SoftapResult};

pub const DEFAULT_WLAN_INTERFACE: &str = "wlan0";
pub const DEFAULT_SSID: &str = "AndroidAP";
pub const DEFAULT_KEY: &str = "12345678";
pub const DEFAULT_CHANNEL: u8 = 6;
pub const DEFAULT_PREAMBLE: u8 = 0;
pub const DEFAULT_MAX_STATIONS: u32 = 8;

const MAX_POSITIONAL_ARGS: usize = 8;
// IFNAMSIZ includes the trailing NUL.
const MAX_INTERFACE_NAME_LEN: usize = libc::IFNAMSIZ - 1;
const MAX_SSID_LEN: usize = 32;

/// Security mode advertised by the access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    Open,
    WpaPsk,
    Wpa2Psk,
}

impl Security {
    /// Token used on the invocation surface and in vendor command strings.
    pub fn as_token(&self) -> &'static str {
        match self {
            Security::Open => "open",
            Security::WpaPsk => "wpa-psk",
            Security::Wpa2Psk => "wpa2-psk",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Security::Open)
    }
}

impl FromStr for Security {
    type Err = SoftapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Security::Open),
            "wpa-psk" => Ok(Security::WpaPsk),
            "wpa2-psk" => Ok(Security::Wpa2Psk),
            other => Err(SoftapError::InvalidArgument(format!("unknown security mode `{other}`"))),
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Firmware role requested by `reload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareMode {
    Ap,
    Sta,
    P2p,
}

impl FromStr for FirmwareMode {
    type Err = SoftapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AP" => Ok(FirmwareMode::Ap),
            "STA" => Ok(FirmwareMode::Sta),
            "P2P" => Ok(FirmwareMode::P2p),
            other => Err(SoftapError::InvalidArgument(format!("unknown firmware mode `{other}`"))),
        }
    }
}

impl fmt::Display for FirmwareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FirmwareMode::Ap => "AP",
            FirmwareMode::Sta => "STA",
            FirmwareMode::P2p => "P2P",
        })
    }
}

/// Fully resolved soft-AP parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftapParams {
    pub wlan_interface: String,
    pub ap_interface: String,
    pub ssid: String,
    pub security: Security,
    pub key: String,
    pub channel: u8,
    pub preamble: u8,
    pub max_stations: u32,
}

impl Default for SoftapParams {
    fn default() -> Self {
        SoftapParams {
            wlan_interface: DEFAULT_WLAN_INTERFACE.to_string(),
            ap_interface: DEFAULT_WLAN_INTERFACE.to_string(),
            ssid: DEFAULT_SSID.to_string(),
            security: Security::Open,
            key: DEFAULT_KEY.to_string(),
            channel: DEFAULT_CHANNEL,
            preamble: DEFAULT_PREAMBLE,
            max_stations: DEFAULT_MAX_STATIONS,
        }
    }
}

impl SoftapParams {
    /// Builds parameters from positional arguments, applying defaults for
    /// the trailing ones that were not supplied.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> SoftapResult<SoftapParams> {
        if args.len() > MAX_POSITIONAL_ARGS {
            return Err(SoftapError::InvalidArgument(format!(
                "expected at most {MAX_POSITIONAL_ARGS} parameters, got {}",
                args.len()
            )));
        }
        let arg = |i: usize| args.get(i).map(|s| s.as_ref());

        let mut params = SoftapParams::default();
        if let Some(wlan) = arg(0) {
            params.wlan_interface = wlan.to_string();
        }
        params.ap_interface = arg(1).unwrap_or(params.wlan_interface.as_str()).to_string();
        if let Some(ssid) = arg(2) {
            params.ssid = ssid.to_string();
        }
        if let Some(security) = arg(3) {
            params.security = security.parse()?;
        }
        if let Some(key) = arg(4) {
            params.key = key.to_string();
        }
        if let Some(channel) = arg(5) {
            params.channel = parse_number("channel", channel)?;
        }
        if let Some(preamble) = arg(6) {
            params.preamble = parse_number("preamble", preamble)?;
        }
        if let Some(max_stations) = arg(7) {
            params.max_stations = parse_number("max station count", max_stations)?;
        }
        params.validate()?;
        Ok(params)
    }

    /// Checks the limits hostapd and the wireless extensions impose.
    pub fn validate(&self) -> SoftapResult<()> {
        validate_interface(&self.wlan_interface)?;
        validate_interface(&self.ap_interface)?;
        if self.ssid.is_empty() || self.ssid.len() > MAX_SSID_LEN {
            return Err(SoftapError::InvalidArgument(format!(
                "SSID must be 1..={MAX_SSID_LEN} bytes, got {}",
                self.ssid.len()
            )));
        }
        // Both end up on a hostapd.conf line and inside the comma separated
        // AP_CFG vendor command.
        for (what, value) in [("SSID", &self.ssid), ("key", &self.key)] {
            if value.chars().any(|c| c.is_control() || c == ',') {
                return Err(SoftapError::InvalidArgument(format!(
                    "{what} must not contain control characters or commas"
                )));
            }
        }
        if !self.security.is_open() && !is_valid_passphrase(&self.key) {
            return Err(SoftapError::InvalidArgument(format!(
                "{} needs an 8..=63 character passphrase or a 64 digit hex key",
                self.security
            )));
        }
        Ok(())
    }
}

/// Accepts the names the kernel accepts for a network interface, minus `=`
/// so a name can never add a key to hostapd.conf.
pub fn validate_interface(name: &str) -> SoftapResult<()> {
    if name.is_empty() || name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(SoftapError::InvalidArgument(format!(
            "interface name `{name}` must be 1..={MAX_INTERFACE_NAME_LEN} bytes"
        )));
    }
    let bad_byte = |b: u8| b.is_ascii_control() || b.is_ascii_whitespace() || b"/:=".contains(&b);
    if name == "." || name == ".." || name.bytes().any(bad_byte) {
        return Err(SoftapError::InvalidArgument(format!("invalid interface name {name:?}")));
    }
    Ok(())
}

fn is_valid_passphrase(key: &str) -> bool {
    match key.len() {
        8..=63 => key.chars().all(|c| c.is_ascii() && !c.is_ascii_control()),
        64 => key.chars().all(|c| c.is_ascii_hexdigit()),
        _ => false,
    }
}

fn parse_number<T: FromStr>(what: &str, value: &str) -> SoftapResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SoftapError::InvalidArgument(format!("{what} `{value}` is not a number")))
}
