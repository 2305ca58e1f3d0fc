// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The monitor event loop.
//!
//! One task owns everything with state: the API client (session), the
//! [`StateMonitor`] (last-known state, failure streak), and the
//! [`ActionDispatcher`] (saved volume). The loop multiplexes the poll
//! timer, the power event stream, and the shutdown signal with
//! `tokio::select!`, so every dispatch runs to completion before the next
//! trigger is accepted. A wake event arriving mid-dispatch waits.

use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::action::{ActionDispatcher, TriggerKind};
use crate::client::NeviwebClient;
use crate::event::{PowerEvent, PowerEventSource};
use crate::state::StateMonitor;

/// Composition root: drives polling, classification, and dispatch.
pub struct Monitor {
    client: NeviwebClient,
    device_id: u64,
    state: StateMonitor,
    dispatcher: ActionDispatcher,
}

impl Monitor {
    /// Assembles a monitor from its parts.
    #[must_use]
    pub fn new(
        client: NeviwebClient,
        device_id: u64,
        state: StateMonitor,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            client,
            device_id,
            state,
            dispatcher,
        }
    }

    /// Runs the event loop until `shutdown` changes.
    ///
    /// The first poll happens immediately; afterwards the
    /// [`StateMonitor`]'s delay (base interval or backoff) schedules the
    /// next one. On shutdown the in-flight dispatch finishes, the saved
    /// volume is restored best-effort, and the API session is closed.
    pub async fn run(mut self, mut power: PowerEventSource, mut shutdown: watch::Receiver<bool>) {
        let mut next_poll = Instant::now();
        let mut power_open = true;

        loop {
            tokio::select! {
                () = time::sleep_until(next_poll) => {
                    self.tick().await;
                    next_poll = Instant::now() + self.state.next_delay();
                }
                event = power.recv(), if power_open => {
                    if let Some(event) = event {
                        self.handle_power_event(event).await;
                    } else {
                        tracing::debug!("power event source closed");
                        power_open = false;
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        self.dispatcher.restore_volume().await;
        self.client.logout().await;
    }

    /// Performs one poll cycle: fetch, classify, dispatch.
    ///
    /// Returns the trigger that fired, if the poll succeeded and crossed a
    /// heating boundary. A failed poll leaves tracked state untouched and
    /// surfaces a single warning when the failure streak reaches the
    /// configured threshold.
    pub async fn tick(&mut self) -> Option<TriggerKind> {
        match self.client.heating_state(self.device_id).await {
            Ok(observed) => {
                tracing::debug!(
                    percent = observed.output_percent,
                    state = %observed.heating_state(),
                    "poll succeeded"
                );
                let transition = self.state.observe(observed);
                let trigger = transition.trigger()?;
                tracing::info!(%trigger, "heating transition");
                self.dispatcher.dispatch(trigger).await;
                Some(trigger)
            }
            Err(err) => {
                let report = self.state.record_failure();
                if report.threshold_crossed {
                    tracing::warn!(
                        streak = report.streak,
                        error = %err,
                        "consecutive poll failures reached threshold; continuing with backoff"
                    );
                } else {
                    tracing::debug!(streak = report.streak, error = %err, "poll failed");
                }
                None
            }
        }
    }

    /// Dispatches a host power event.
    pub async fn handle_power_event(&self, event: PowerEvent) {
        tracing::info!(kind = %event.kind, at = %event.occurred_at, "power event");
        self.dispatcher.dispatch(event.kind.trigger()).await;
    }

    /// Returns the state tracker, for inspection.
    #[must_use]
    pub fn state(&self) -> &StateMonitor {
        &self.state
    }

    /// Returns the dispatcher, for inspection.
    #[must_use]
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }
}
