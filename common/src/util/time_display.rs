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

//! # Log time stamps

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Timelike, Utc};

/// A point in time, split the way `SystemTime` reports it, that can be
/// rendered for log lines.
pub struct LogTimestamp {
    /// seconds since std::time::UNIX_EPOCH
    secs: i64,
    /// nano sub seconds since std::time::UNIX_EPOCH
    nsecs: u32,
}

impl LogTimestamp {
    pub fn new(secs: i64, nsecs: u32) -> LogTimestamp {
        LogTimestamp { secs, nsecs }
    }

    /// Current wall clock time. Clocks set before 1970 render as the epoch.
    pub fn now() -> LogTimestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => {
                LogTimestamp::new(since_epoch.as_secs() as i64, since_epoch.subsec_nanos())
            }
            Err(_) => LogTimestamp::new(0, 0),
        }
    }

    /// Displays UTC time with a format MM-DD HH:MM:SS.mmm
    pub fn utc_display_log(&self) -> String {
        match DateTime::<Utc>::from_timestamp(self.secs, self.nsecs) {
            Some(datetime) => format!(
                "{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
                datetime.month(),
                datetime.day(),
                datetime.hour(),
                datetime.minute(),
                datetime.second(),
                datetime.timestamp_subsec_millis(),
            ),
            None => "INVALID-TIMESTAMP".to_string(),
        }
    }
}

/// Return the timestamp of the current time for logs
pub fn log_current_time() -> String {
    LogTimestamp::now().utc_display_log()
}
