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

//! Bounded retry primitive used to wait for service state changes.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use log::debug;

use crate::error::{SoftapError, SoftapResult};
use crate::property::PropertyBridge;

/// How many times to check and how long to sleep between two checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// 100 checks, 200ms apart.
    pub const START: RetryPolicy = RetryPolicy::new(100, Duration::from_millis(200));
    /// 30 checks, 200ms apart.
    pub const STOP: RetryPolicy = RetryPolicy::new(30, Duration::from_millis(200));

    pub const fn new(attempts: u32, interval: Duration) -> RetryPolicy {
        RetryPolicy { attempts, interval }
    }

    /// Longest time a caller can be blocked by this policy.
    pub fn budget(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

/// Source of delays between poll attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for Rc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs `check` until it returns true or `policy.attempts` checks have
/// failed. Sleeps only between checks, never after the last one. A policy
/// with zero attempts still checks once.
///
/// Returns the 1-based attempt that succeeded, or the number of failed
/// attempts.
pub fn retry<F>(policy: RetryPolicy, sleeper: &dyn Sleeper, mut check: F) -> Result<u32, u32>
where
    F: FnMut(u32) -> bool,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if check(attempt) {
            return Ok(attempt);
        }
        if attempt < attempts {
            sleeper.sleep(policy.interval);
        }
    }
    Err(attempts)
}

/// Waits until `key` reads `expected`.
pub fn wait_for_property(
    bridge: &dyn PropertyBridge,
    key: &str,
    expected: &str,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> SoftapResult<u32> {
    retry(policy, sleeper, |attempt| {
        let value = bridge.get(key);
        if value.as_deref() == Some(expected) {
            return true;
        }
        debug!(
            "waiting for {key}={expected}, got {value:?} ({} attempts left)",
            policy.attempts.max(1) - attempt
        );
        false
    })
    .map_err(|attempts| SoftapError::Timeout {
        key: key.to_string(),
        expected: expected.to_string(),
        attempts,
        elapsed: policy.budget(),
    })
}

/// Waits until `path` exists on disk.
pub fn wait_for_path(path: &Path, policy: RetryPolicy, sleeper: &dyn Sleeper) -> SoftapResult<u32> {
    retry(policy, sleeper, |_| path.exists()).map_err(|attempts| SoftapError::Timeout {
        key: path.display().to_string(),
        expected: "present".to_string(),
        attempts,
        elapsed: policy.budget(),
    })
}
