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

//! netd style line protocol: one `softap <command> [args..]` per line, one
//! numbered response per command.

use std::fmt;
use std::io::{self, BufRead, Write};

use log::{debug, warn};
use softap_rs::SoftapController;

/// Answer to one shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Succeeded,
    Failed,
    Status { running: bool },
    UnknownCommand,
}

impl Response {
    pub fn code(&self) -> u16 {
        match self {
            Response::Succeeded => 200,
            Response::Status { .. } => 214,
            Response::Failed => 400,
            Response::UnknownCommand => 500,
        }
    }

    /// Collapses an operation outcome into success or failure.
    pub fn from_result<T, E>(result: Result<T, E>) -> Response {
        match result {
            Ok(_) => Response::Succeeded,
            Err(_) => Response::Failed,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Response::Succeeded => "Softap operation succeeded",
            Response::Failed => "Softap operation failed",
            Response::Status { running: true } => "Softap service is running",
            Response::Status { running: false } => "Softap service is not running",
            Response::UnknownCommand => "Softap Unknown cmd",
        };
        write!(f, "{} 0 {message}", self.code())
    }
}

/// Runs one command line against `controller`. Blank lines yield `None`.
pub fn dispatch(controller: &mut SoftapController, line: &str) -> Option<Response> {
    let mut words: Vec<&str> = line.split_whitespace().collect();
    if words.first() == Some(&"softap") {
        words.remove(0);
    }
    let (command, args) = words.split_first()?;

    let response = match *command {
        "start" | "startap" => {
            if !args.is_empty() {
                debug!("Ignoring arguments of {command}: {args:?}");
            }
            Response::from_result(controller.start())
        }
        "stop" | "stopap" => Response::from_result(controller.stop()),
        "set" => Response::from_result(controller.configure(args)),
        "fwreload" => Response::from_result(controller.reload(args)),
        "status" => Response::Status { running: controller.is_running() },
        _ => {
            warn!("Unknown softap command `{command}`");
            Response::UnknownCommand
        }
    };
    Some(response)
}

/// Answers every line of `input` on `output` until EOF.
pub fn run<R: BufRead, W: Write>(
    controller: &mut SoftapController,
    input: R,
    mut output: W,
) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if let Some(response) = dispatch(controller, &line) {
            writeln!(output, "{response}")?;
            output.flush()?;
        }
    }
    Ok(())
}
