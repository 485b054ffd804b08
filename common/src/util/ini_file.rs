//
//  Copyright 2024 Google, Inc.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at:
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! # IniFile class
//!
//! Reader for flat `key=value` settings files. Lines starting with `#` or
//! `;` and lines without `=` are skipped.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context};

pub struct IniFile {
    /// The data stored in the ini file.
    data: HashMap<String, String>,
    /// The path to the ini file.
    filepath: PathBuf,
}

impl IniFile {
    /// Creates a new, empty IniFile backed by `filepath`.
    pub fn new(filepath: PathBuf) -> IniFile {
        IniFile { data: HashMap::new(), filepath }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.filepath
    }

    /// Reads data into IniFile from the backing file, overwriting any
    /// existing data. A key that appears twice keeps its last value.
    pub fn read(&mut self) -> anyhow::Result<()> {
        self.data.clear();

        let f = File::open(&self.filepath)
            .with_context(|| format!("failed to open {}", self.filepath.display()))?;
        for line in BufReader::new(f).lines() {
            let line = line?;
            let line = line.trim();
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            self.data.insert(key.to_owned(), value.trim().to_owned());
        }

        Ok(())
    }

    /// Checks if a certain key exists in the file.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Gets the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|v| v.as_str())
    }

    /// Gets the value for `key` parsed as `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error naming the key
    /// and the file when the value does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.parse::<T>().map(Some).map_err(|e| {
                anyhow!("invalid value `{value}` for `{key}` in {}: {e}", self.filepath.display())
            }),
        }
    }

    /// Gets a boolean value. Accepts `true`/`false`, `yes`/`no`, `on`/`off`
    /// and `1`/`0`, case-insensitively.
    pub fn get_bool(&self, key: &str) -> anyhow::Result<Option<bool>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Some(true)),
            "false" | "no" | "off" | "0" => Ok(Some(false)),
            _ => Err(anyhow!(
                "invalid boolean `{value}` for `{key}` in {}",
                self.filepath.display()
            )),
        }
    }

    /// Iterates over every key that was read.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|k| k.as_str())
    }

    /// Inserts a key-value pair.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.data.insert(key.to_owned(), value.to_owned());
    }
}
