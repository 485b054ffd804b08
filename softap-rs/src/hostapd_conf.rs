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

//! In-memory form of a hostapd configuration document.
//!
//! The document is kept as its ordered source lines so that comments,
//! unknown keys and layout survive a rewrite. A line is addressed by its key:
//! `key=value` is an active line, `#key=value` a commented one. Keys match
//! exactly, so `ssid` never matches `bssid` or `ignore_broadcast_ssid`.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<String>,
}

/// Splits a line into (commented, key, value).
fn split_line(line: &str) -> Option<(bool, &str, &str)> {
    let trimmed = line.trim_start();
    let (commented, body) = match trimmed.strip_prefix('#') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let (key, value) = body.split_once('=')?;
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    Some((commented, key, value))
}

/// `Some(commented)` when `line` holds `key`, `None` otherwise.
fn key_state(line: &str, key: &str) -> Option<bool> {
    match split_line(line) {
        Some((commented, k, _)) if k == key => Some(commented),
        _ => None,
    }
}

impl ConfigDocument {
    pub fn parse(text: &str) -> ConfigDocument {
        ConfigDocument { lines: text.lines().map(str::to_string).collect() }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Value of the first active line for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match split_line(line) {
            Some((false, k, v)) if k == key => Some(v),
            _ => None,
        })
    }

    /// Whether `key` only appears commented out (or not at all).
    pub fn is_commented(&self, key: &str) -> bool {
        self.get(key).is_none()
    }

    /// Sets `key` to `value`.
    ///
    /// Every active line for `key` is rewritten in place. Without an active
    /// line the first commented one is re-enabled, and without either the
    /// line is appended.
    pub fn set(&mut self, key: &str, value: &str) {
        let replacement = format!("{key}={value}");
        let mut active = false;
        let mut first_commented = None;
        for (index, line) in self.lines.iter_mut().enumerate() {
            match key_state(line, key) {
                Some(false) => {
                    *line = replacement.clone();
                    active = true;
                }
                Some(true) if first_commented.is_none() => first_commented = Some(index),
                _ => {}
            }
        }
        if active {
            return;
        }
        match first_commented {
            Some(index) => self.lines[index] = replacement,
            None => self.lines.push(replacement),
        }
    }

    /// Comments out every active line for `key`, keeping its value visible.
    pub fn comment_out(&mut self, key: &str) {
        for line in self.lines.iter_mut() {
            if key_state(line, key) == Some(false) {
                *line = format!("#{}", line.trim_start());
            }
        }
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
