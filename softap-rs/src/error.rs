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

//! Error type shared by every softap operation.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoftapError {
    /// A socket or file the operation depends on could not be opened or created.
    #[error("{what} unavailable: {source}")]
    ResourceUnavailable {
        what: String,
        #[source]
        source: io::Error,
    },
    /// The service never reported the expected state within the retry budget.
    #[error("`{key}` did not become `{expected}` after {attempts} attempts ({elapsed:?})")]
    Timeout { key: String, expected: String, attempts: u32, elapsed: Duration },
    /// The driver does not advertise the requested vendor private command.
    #[error("vendor command `{name}` is not supported by {interface}")]
    UnsupportedCommand { interface: String, name: String },
    /// The accumulated vendor command would not fit into the scratch buffer.
    #[error("command needs {required} bytes but the buffer holds {capacity}")]
    CommandTooLong { capacity: usize, required: usize },
    /// A positional parameter or settings value could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The kernel rejected an interface control request.
    #[error("{request} on {interface} failed: {source}")]
    Ioctl {
        request: &'static str,
        interface: String,
        #[source]
        source: io::Error,
    },
    /// A fresh controller cannot learn whether the AP is up.
    #[error("the {strategy} soft AP cannot report whether it is running")]
    StateUnknown { strategy: &'static str },
    /// The property service could not be reached.
    #[error("property bridge: {0}")]
    Property(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SoftapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SoftapError::Io { path: path.into(), source }
    }

    pub(crate) fn unavailable(what: impl Into<String>, source: io::Error) -> Self {
        SoftapError::ResourceUnavailable { what: what.into(), source }
    }
}

pub type SoftapResult<T> = Result<T, SoftapError>;
