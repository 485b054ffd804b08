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

//! Bounded builder for the ASCII commands vendor drivers accept through
//! their private ioctls, e.g.
//! `ASCII_CMD=AP_CFG,SSID=MyNet,SEC=wpa2-psk,...,END`.
//!
//! The capacity mirrors the driver's fixed request buffer including the
//! trailing NUL. A parameter that does not fit is rejected before anything
//! is appended, so a failed build never leaves a truncated command behind.

use crate::error::{SoftapError, SoftapResult};
use crate::params::SoftapParams;

pub const DEFAULT_COMMAND_CAPACITY: usize = 4096;

const TERMINATOR: &str = "END";

#[derive(Debug)]
pub struct CommandBuilder {
    buf: String,
    capacity: usize,
}

impl CommandBuilder {
    pub fn new(capacity: usize) -> CommandBuilder {
        CommandBuilder { buf: String::new(), capacity }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends `name=value,`.
    pub fn add_param(&mut self, name: &str, value: &str) -> SoftapResult<&mut Self> {
        // name '=' value ',' NUL
        let required = self.buf.len() + name.len() + value.len() + 3;
        self.reserve(required)?;
        self.buf.push_str(name);
        self.buf.push('=');
        self.buf.push_str(value);
        self.buf.push(',');
        Ok(self)
    }

    /// Appends the `END` terminator and returns the finished command.
    pub fn finish(mut self) -> SoftapResult<String> {
        self.reserve(self.buf.len() + TERMINATOR.len() + 1)?;
        self.buf.push_str(TERMINATOR);
        Ok(self.buf)
    }

    /// Returns the accumulated `name=value,` list without a terminator.
    pub fn into_inner(self) -> String {
        self.buf
    }

    fn reserve(&self, required: usize) -> SoftapResult<()> {
        if required > self.capacity {
            return Err(SoftapError::CommandTooLong { capacity: self.capacity, required });
        }
        Ok(())
    }
}

/// Builds the `AP_CFG` command carrying every soft-AP parameter.
pub fn ap_config_command(params: &SoftapParams, capacity: usize) -> SoftapResult<String> {
    let mut builder = CommandBuilder::new(capacity);
    builder
        .add_param("ASCII_CMD", "AP_CFG")?
        .add_param("SSID", &params.ssid)?
        .add_param("SEC", params.security.as_token())?
        .add_param("KEY", &params.key)?
        .add_param("CHANNEL", &params.channel.to_string())?
        .add_param("PREAMBLE", &params.preamble.to_string())?
        .add_param("MAX_SCB", &params.max_stations.to_string())?;
    builder.finish()
}

/// Builds the `FW_PATH=<path>` argument of a firmware reload.
pub fn firmware_path_command(path: &str, capacity: usize) -> SoftapResult<String> {
    let mut builder = CommandBuilder::new(capacity);
    builder.add_param("FW_PATH", path)?;
    // The driver takes the bare path without list separator or terminator.
    let mut command = builder.into_inner();
    command.pop();
    Ok(command)
}
