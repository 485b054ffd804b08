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

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use softap_rs::params::FirmwareMode;

#[derive(Debug, Parser)]
#[command(name = "softapctl", about = "Control the WiFi soft access point")]
pub struct SoftapArgs {
    #[command(subcommand)]
    pub command: Command,
    /// Set verbose mode
    #[arg(short, long)]
    pub verbose: bool,
    /// Settings file, defaults to $SOFTAP_CONFIG
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[command(infer_subcommands = true)]
pub enum Command {
    /// Start the soft AP and wait until it is up
    Start,
    /// Stop the soft AP and wait until it is down
    Stop,
    /// Report whether the soft AP is running
    Status,
    /// Configure the soft AP
    Set(Set),
    /// Switch the firmware of an interface to AP, STA or P2P mode
    Fwreload(FwReload),
    /// Read netd style softap commands from stdin, one per line
    Shell,
}

#[derive(Debug, Args)]
pub struct Set {
    /// Positional parameters in order: wlan interface, AP interface, SSID,
    /// security (open|wpa-psk|wpa2-psk), key, channel, preamble, max stations.
    /// Omitted trailing parameters take their defaults.
    #[arg(value_name = "PARAM", num_args = 0..=8)]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct FwReload {
    /// Interface whose firmware is reloaded
    pub interface: String,
    /// Target firmware mode
    #[arg(value_parser = parse_firmware_mode)]
    pub mode: FirmwareMode,
}

fn parse_firmware_mode(mode: &str) -> Result<FirmwareMode, String> {
    mode.parse().map_err(|e| format!("{e}"))
}
