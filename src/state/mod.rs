// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heating state tracking and transition classification.
//!
//! The [`StateMonitor`] owns the single last-known [`DeviceState`] and turns
//! successful polls into [`Transition`]s. Failed polls never mutate tracked
//! state; they only grow the failure streak that drives the retry backoff.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use neviwatch::state::{DeviceState, RetryPolicy, StateMonitor, Transition};
//!
//! let mut monitor = StateMonitor::new(Duration::from_secs(30), 3, RetryPolicy::default());
//!
//! // First observation establishes the baseline without firing.
//! assert_eq!(monitor.observe(DeviceState::now(0)), Transition::None);
//!
//! // The off-to-on boundary fires exactly once.
//! assert_eq!(monitor.observe(DeviceState::now(80)), Transition::HeatingStarted);
//! assert_eq!(monitor.observe(DeviceState::now(60)), Transition::None);
//! ```

mod device_state;
mod monitor;

pub use device_state::{DeviceState, HeatingState, Transition};
pub use monitor::{FailureReport, RetryPolicy, StateMonitor};
