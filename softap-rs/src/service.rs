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

//! Start and stop requests for the hostapd service through the Property
//! Bridge. Requests are fire-and-poll: a request that times out is not
//! rolled back.

use log::{debug, error, info};

use crate::error::SoftapResult;
use crate::poll::{wait_for_property, RetryPolicy, Sleeper};
use crate::property::{
    service_state_key, PropertyBridge, CTL_START, CTL_STOP, STATE_RUNNING, STATE_STOPPED,
};

pub const DEFAULT_SERVICE_NAME: &str = "hostapd";

pub struct ServiceControl {
    name: String,
    state_key: String,
    bridge: Box<dyn PropertyBridge>,
    sleeper: Box<dyn Sleeper>,
    start_policy: RetryPolicy,
    stop_policy: RetryPolicy,
}

impl ServiceControl {
    pub fn new(
        name: &str,
        bridge: Box<dyn PropertyBridge>,
        sleeper: Box<dyn Sleeper>,
        start_policy: RetryPolicy,
        stop_policy: RetryPolicy,
    ) -> ServiceControl {
        ServiceControl {
            name: name.to_string(),
            state_key: service_state_key(name),
            bridge,
            sleeper,
            start_policy,
            stop_policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub fn start_policy(&self) -> RetryPolicy {
        self.start_policy
    }

    /// State currently reported by the property service.
    pub fn state(&self) -> Option<String> {
        self.bridge.get(&self.state_key)
    }

    /// Requests a start and waits for the service to report `running`.
    pub fn start(&self) -> SoftapResult<()> {
        if self.state().as_deref() == Some(STATE_RUNNING) {
            debug!("{} is already running", self.name);
            return Ok(());
        }

        info!("Sending {CTL_START} {}", self.name);
        self.bridge.set(CTL_START, &self.name)?;
        match wait_for_property(
            self.bridge.as_ref(),
            &self.state_key,
            STATE_RUNNING,
            self.start_policy,
            self.sleeper(),
        ) {
            Ok(attempt) => {
                info!("{} is running (attempt {attempt})", self.name);
                Ok(())
            }
            Err(e) => {
                error!(
                    "{} failed to start within {:?}: {e}",
                    self.name,
                    self.start_policy.budget()
                );
                Err(e)
            }
        }
    }

    /// Requests a stop and waits for the service to report `stopped`.
    pub fn stop(&self) -> SoftapResult<()> {
        if self.state().as_deref() == Some(STATE_STOPPED) {
            debug!("{} is already stopped", self.name);
            return Ok(());
        }

        info!("Sending {CTL_STOP} {}", self.name);
        self.bridge.set(CTL_STOP, &self.name)?;
        match wait_for_property(
            self.bridge.as_ref(),
            &self.state_key,
            STATE_STOPPED,
            self.stop_policy,
            self.sleeper(),
        ) {
            Ok(attempt) => {
                info!("{} stopped (attempt {attempt})", self.name);
                Ok(())
            }
            Err(e) => {
                error!("{} failed to stop within {:?}: {e}", self.name, self.stop_policy.budget());
                Err(e)
            }
        }
    }
}
