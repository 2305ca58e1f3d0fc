// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! neviwatch - watch a Neviweb smart thermostat and react to heating
//! state changes.
//!
//! The daemon polls the Neviweb cloud API for the thermostat's heater
//! output, classifies off/on transitions, merges them with host
//! sleep/wake power events, and dispatches configured local actions:
//! ducking the system volume while the heater runs, restarting a
//! companion service after the machine wakes, running a shell command.
//!
//! # How it works
//!
//! - [`client::NeviwebClient`] authenticates and fetches the heater
//!   output percentage, transparently re-authenticating once when the
//!   session expires.
//! - [`state::StateMonitor`] holds the single last-known
//!   [`state::DeviceState`] and classifies [`state::Transition`]s. Failed
//!   polls never change tracked state; they grow a failure streak that
//!   stretches the poll delay (capped exponential backoff) and surfaces
//!   one warning per threshold crossing.
//! - [`event::PowerEventSource`] delivers host sleep/wake notifications
//!   pushed by a platform integration.
//! - [`action::ActionDispatcher`] runs the actions bound to a trigger in
//!   order, isolating each handler failure.
//! - [`monitor::Monitor`] owns all of the above in one `tokio::select!`
//!   loop, so dispatches are strictly serialized.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use neviwatch::action::{ActionDispatcher, ActionRegistry, AmixerVolume, SideEffects, SystemctlServices};
//! use neviwatch::client::NeviwebClient;
//! use neviwatch::config::Config;
//! use neviwatch::event::PowerEventSource;
//! use neviwatch::monitor::Monitor;
//! use neviwatch::state::{RetryPolicy, StateMonitor};
//!
//! #[tokio::main]
//! async fn main() -> neviwatch::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let registry = ActionRegistry::resolve(&config.actions)?;
//!
//!     let client = NeviwebClient::new(&config.auth, config.settings.request_timeout())
//!         .map_err(neviwatch::error::Error::Client)?;
//!     client.login().await.map_err(neviwatch::error::Error::Client)?;
//!
//!     let state = StateMonitor::new(
//!         config.settings.poll_interval(),
//!         config.settings.failure_threshold,
//!         RetryPolicy::default(),
//!     );
//!     let fx = SideEffects::new(Arc::new(AmixerVolume::new()), Arc::new(SystemctlServices::new()));
//!     let monitor = Monitor::new(
//!         client,
//!         config.auth.device_id,
//!         state,
//!         ActionDispatcher::new(registry, fx),
//!     );
//!
//!     let (power_handle, power_source) = PowerEventSource::channel();
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     drop(power_handle); // or hand it to a platform sleep/wake integration
//!     monitor.run(power_source, shutdown_rx).await;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod monitor;
pub mod state;

pub use action::{Action, ActionDispatcher, ActionRegistry, TriggerKind};
pub use client::NeviwebClient;
pub use config::Config;
pub use error::{ActionError, ClientError, ConfigError, Error, Result};
pub use event::{PowerEvent, PowerEventKind, PowerEventSource};
pub use monitor::Monitor;
pub use state::{DeviceState, HeatingState, StateMonitor, Transition};
