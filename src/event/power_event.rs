// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power event types and the channel connecting OS integrations to the loop.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::action::TriggerKind;

/// Default buffer for pending power events.
///
/// Sleep/wake notifications are rare; a small buffer only has to absorb a
/// burst delivered while a dispatch is in flight.
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Kind of host power notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerEventKind {
    /// The host is about to suspend.
    Sleep,
    /// The host resumed from suspend.
    Wake,
}

impl PowerEventKind {
    /// Returns `true` for a wake notification.
    #[must_use]
    pub const fn is_wake(&self) -> bool {
        matches!(self, Self::Wake)
    }

    /// Returns the trigger this event kind fires.
    #[must_use]
    pub const fn trigger(&self) -> TriggerKind {
        match self {
            Self::Sleep => TriggerKind::Sleep,
            Self::Wake => TriggerKind::Wake,
        }
    }

    /// Returns a short display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Wake => "wake",
        }
    }
}

impl fmt::Display for PowerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One host power notification.
///
/// Carries nothing beyond its kind and a timestamp. Events are not
/// deduplicated: a spurious double wake is delivered as two independent
/// events, so wake-bound handlers must be idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerEvent {
    /// Sleep or wake.
    pub kind: PowerEventKind,
    /// When the notification was observed.
    pub occurred_at: DateTime<Utc>,
}

impl PowerEvent {
    /// Creates an event of the given kind observed now.
    #[must_use]
    pub fn new(kind: PowerEventKind) -> Self {
        Self {
            kind,
            occurred_at: Utc::now(),
        }
    }

    /// Creates a sleep event observed now.
    #[must_use]
    pub fn sleep() -> Self {
        Self::new(PowerEventKind::Sleep)
    }

    /// Creates a wake event observed now.
    #[must_use]
    pub fn wake() -> Self {
        Self::new(PowerEventKind::Wake)
    }
}

/// Producer side of the power event channel.
///
/// Clonable so a platform integration can hand it to whatever callback or
/// listener thread the OS facility requires.
#[derive(Debug, Clone)]
pub struct PowerEventHandle {
    sender: mpsc::Sender<PowerEvent>,
}

impl PowerEventHandle {
    /// Delivers a power event to the monitor loop.
    ///
    /// Events are dropped (with a warning) if the consumer is gone or the
    /// buffer is full; losing a notification must never block or crash the
    /// notifying thread.
    pub fn notify(&self, event: PowerEvent) {
        if let Err(err) = self.sender.try_send(event) {
            tracing::warn!(error = %err, "dropping power event");
        }
    }
}

/// Consumer side of the power event channel.
///
/// A lazy, infinite, non-restartable sequence of [`PowerEvent`]s in the
/// host's notification order.
#[derive(Debug)]
pub struct PowerEventSource {
    receiver: mpsc::Receiver<PowerEvent>,
}

impl PowerEventSource {
    /// Creates a connected handle/source pair with default capacity.
    #[must_use]
    pub fn channel() -> (PowerEventHandle, Self) {
        Self::channel_with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a connected handle/source pair with the given buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn channel_with_capacity(capacity: usize) -> (PowerEventHandle, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (PowerEventHandle { sender }, Self { receiver })
    }

    /// Receives the next power event.
    ///
    /// Returns `None` once every [`PowerEventHandle`] has been dropped.
    pub async fn recv(&mut self) -> Option<PowerEvent> {
        self.receiver.recv().await
    }
}
