// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshot and transition types.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::action::TriggerKind;

/// One observation of the thermostat's heating output.
///
/// Produced by the client on each successful poll and immutable once
/// created. The [`StateMonitor`](super::StateMonitor) holds exactly one
/// last-known instance, replaced atomically per successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// Whether the heater is actively heating (output above zero).
    pub heating_active: bool,
    /// Raw heater output percentage (0-100) as reported by the API.
    pub output_percent: u8,
    /// When this observation was made.
    pub observed_at: DateTime<Utc>,
}

impl DeviceState {
    /// Creates a state observed now from a raw output percentage.
    #[must_use]
    pub fn now(output_percent: u8) -> Self {
        Self {
            heating_active: output_percent > 0,
            output_percent,
            observed_at: Utc::now(),
        }
    }

    /// Returns the heating state this observation maps to.
    #[must_use]
    pub fn heating_state(&self) -> HeatingState {
        if self.heating_active {
            HeatingState::On
        } else {
            HeatingState::Off
        }
    }
}

/// Tracked heating state.
///
/// The machine is `Unknown -> Off <-> On`: `Unknown` exists only before the
/// first successful poll and is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeatingState {
    /// No successful poll yet.
    #[default]
    Unknown,
    /// The heater is idle.
    Off,
    /// The heater is actively heating.
    On,
}

impl HeatingState {
    /// Returns a short display name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl fmt::Display for HeatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classified change between two consecutive successful polls.
///
/// Exists only transiently per poll cycle. Transitions out of
/// [`HeatingState::Unknown`] establish the baseline and are [`Transition::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The heater went from idle to heating.
    HeatingStarted,
    /// The heater went from heating to idle.
    HeatingStopped,
    /// No boundary was crossed.
    None,
}

impl Transition {
    /// Classifies the transition between two tracked states.
    #[must_use]
    pub fn classify(from: HeatingState, to: HeatingState) -> Self {
        match (from, to) {
            (HeatingState::Off, HeatingState::On) => Self::HeatingStarted,
            (HeatingState::On, HeatingState::Off) => Self::HeatingStopped,
            _ => Self::None,
        }
    }

    /// Returns the trigger this transition fires, if any.
    #[must_use]
    pub fn trigger(&self) -> Option<TriggerKind> {
        match self {
            Self::HeatingStarted => Some(TriggerKind::HeatingStarted),
            Self::HeatingStopped => Some(TriggerKind::HeatingStopped),
            Self::None => None,
        }
    }
}
