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

//! # softap-rs
//!
//! Controls a WiFi radio running as a soft access point: starting and
//! stopping the AP, configuring it and switching firmware modes.
//!
//! The crate is built around a few seams so every piece can be faked:
//!
//! * **`property`:** the [`property::PropertyBridge`] used to request service
//!   start/stop and to observe service state.
//! * **`templater`:** renders the hostapd configuration file from a
//!   read-only template.
//! * **`ifctl`:** the [`ifctl::InterfaceControl`] adapter issuing interface
//!   ioctls and vendor private commands.
//! * **`lifecycle`:** one [`lifecycle::ApLifecycle`] strategy per kind of
//!   driver, sequenced by the [`controller::SoftapController`].
//!
//! Everything is synchronous. Waiting is a bounded poll with a fixed
//! interval, see [`poll`].

pub mod command;
pub mod controller;
pub mod error;
pub mod hostapd_conf;
pub mod ifctl;
pub mod lifecycle;
pub mod params;
pub mod poll;
pub mod property;
pub mod service;
pub mod settings;
pub mod templater;
mod wext_sys;

#[cfg(test)]
mod mocked;

pub use crate::controller::SoftapController;
pub use crate::error::{SoftapError, SoftapResult};
pub use crate::params::SoftapParams;
