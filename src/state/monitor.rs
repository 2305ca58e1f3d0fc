// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll outcome tracking: transition classification, failure streak, backoff.

use std::time::Duration;

use super::{DeviceState, HeatingState, Transition};

/// Capped exponential backoff applied after consecutive poll failures.
///
/// Decoupled from the normal poll interval: a success always resets the
/// next delay to the configured base interval.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use neviwatch::state::RetryPolicy;
///
/// let policy = RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(300));
/// assert_eq!(policy.delay_for(1), Duration::from_secs(5));
/// assert_eq!(policy.delay_for(2), Duration::from_secs(10));
/// assert_eq!(policy.delay_for(30), Duration::from_secs(300));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay after the first consecutive failure.
    pub initial: Duration,
    /// Upper bound on the delay.
    pub max: Duration,
    /// Multiplier applied per additional consecutive failure.
    pub multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a doubling policy with the given bounds.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
        }
    }

    /// Calculates the delay for a given failure streak length.
    ///
    /// A streak of zero or one yields the initial delay. The curve is
    /// computed in floating-point seconds and capped at `max` before any
    /// conversion back to a [`Duration`], so arbitrarily long streaks
    /// stay within bounds.
    #[must_use]
    pub fn delay_for(&self, streak: u32) -> Duration {
        if streak <= 1 {
            return self.initial;
        }

        let factor = f64::from(self.multiplier).powi(i32::try_from(streak - 1).unwrap_or(i32::MAX));
        let seconds = self.initial.as_secs_f64() * factor.max(1.0);
        if !seconds.is_finite() || seconds >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::from_secs_f64(seconds)
    }
}

/// Outcome of recording one failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureReport {
    /// Length of the current consecutive failure streak.
    pub streak: u32,
    /// `true` exactly when this failure crossed the configured threshold.
    ///
    /// Crossing is edge-triggered: later failures in the same streak do
    /// not set it again until a success resets the streak.
    pub threshold_crossed: bool,
}

/// Tracks the last-known heating state and the poll failure streak.
///
/// This is the debounce core: only a successful poll can change tracked
/// state, so a transient API failure can never flip a physical-world
/// action.
#[derive(Debug)]
pub struct StateMonitor {
    state: HeatingState,
    last_known: Option<DeviceState>,
    failure_streak: u32,
    failure_threshold: u32,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl StateMonitor {
    /// Creates a monitor starting in [`HeatingState::Unknown`].
    #[must_use]
    pub fn new(poll_interval: Duration, failure_threshold: u32, retry: RetryPolicy) -> Self {
        Self {
            state: HeatingState::Unknown,
            last_known: None,
            failure_streak: 0,
            failure_threshold,
            poll_interval,
            retry,
        }
    }

    /// Records a successful poll and classifies the transition.
    ///
    /// Replaces the last-known state, resets the failure streak, and
    /// returns the transition between the previous and new tracked state.
    /// The first observation only establishes the baseline.
    pub fn observe(&mut self, observed: DeviceState) -> Transition {
        let previous = self.state;
        let next = observed.heating_state();

        self.state = next;
        self.last_known = Some(observed);
        self.failure_streak = 0;

        Transition::classify(previous, next)
    }

    /// Records one failed poll.
    ///
    /// Tracked state is untouched; only the streak grows. The report's
    /// `threshold_crossed` is set exactly once per streak, when the streak
    /// reaches the configured threshold.
    pub fn record_failure(&mut self) -> FailureReport {
        self.failure_streak = self.failure_streak.saturating_add(1);
        FailureReport {
            streak: self.failure_streak,
            threshold_crossed: self.failure_streak == self.failure_threshold,
        }
    }

    /// Returns the delay before the next poll.
    ///
    /// The base poll interval while healthy; the backoff curve while a
    /// failure streak is in progress.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        if self.failure_streak == 0 {
            self.poll_interval
        } else {
            self.retry.delay_for(self.failure_streak)
        }
    }

    /// Returns the currently tracked heating state.
    #[must_use]
    pub fn heating_state(&self) -> HeatingState {
        self.state
    }

    /// Returns the last-known device state, if any poll has succeeded.
    #[must_use]
    pub fn last_known(&self) -> Option<&DeviceState> {
        self.last_known.as_ref()
    }

    /// Returns the length of the current failure streak.
    #[must_use]
    pub fn failure_streak(&self) -> u32 {
        self.failure_streak
    }
}
