// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Concrete action handlers.
//!
//! Actions are an enumerated set of handler kinds resolved from
//! configuration at startup, not looked up by name at trigger time. Each
//! handler receives the trigger that fired it plus the shared
//! [`SideEffects`] context.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::process::Command;

use crate::error::ActionError;

use super::system::{ServiceManager, VolumeControl};
use super::trigger::TriggerKind;

/// Spacing between repeated shell command runs.
const REPEAT_DELAY: Duration = Duration::from_millis(350);

/// Longest delay a `delay` action may be configured with, in seconds.
///
/// Keeps the configured value well inside what a [`Duration`] can hold
/// and keeps a single dispatch from stalling the loop indefinitely.
pub(crate) const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Shared side-effect context for a dispatcher's handlers.
///
/// Owns the volume/service seams and the single saved-volume cell that
/// [`Action::VolumeAdjust`] uses across dispatches. The cell honors only
/// the first save until a restore clears it, so a doubled start trigger
/// cannot clobber the remembered pre-activation volume.
pub struct SideEffects {
    volume: Arc<dyn VolumeControl>,
    services: Arc<dyn ServiceManager>,
    saved_volume: Mutex<Option<u8>>,
}

impl SideEffects {
    /// Creates a context over the given seams.
    #[must_use]
    pub fn new(volume: Arc<dyn VolumeControl>, services: Arc<dyn ServiceManager>) -> Self {
        Self {
            volume,
            services,
            saved_volume: Mutex::new(None),
        }
    }

    /// Remembers `level` as the pre-activation volume unless one is
    /// already saved.
    fn save_volume_once(&self, level: u8) {
        let mut saved = self.saved_volume.lock();
        if saved.is_none() {
            *saved = Some(level);
        }
    }

    /// Takes the saved pre-activation volume, clearing the cell.
    fn take_saved_volume(&self) -> Option<u8> {
        self.saved_volume.lock().take()
    }

    /// Returns the saved pre-activation volume without clearing it.
    #[must_use]
    pub fn saved_volume(&self) -> Option<u8> {
        *self.saved_volume.lock()
    }

    /// Restores the saved pre-activation volume, if any.
    ///
    /// Used both by the `HeatingStopped` handler and by the best-effort
    /// shutdown restoration.
    pub async fn restore_volume(&self) -> Result<(), ActionError> {
        if let Some(level) = self.take_saved_volume() {
            tracing::info!(level, "restoring saved volume");
            self.volume.set(level).await?;
        }
        Ok(())
    }
}

/// A configured, executable action.
///
/// The variants mirror the registered action types; see
/// [`ActionRegistry`](super::ActionRegistry) for the config-side names and
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Duck the system volume while the heater runs.
    ///
    /// On `heatingStarted`: save the current volume (first save wins) and
    /// set `level`. On `heatingStopped`: restore the saved volume. Other
    /// triggers are ignored.
    VolumeAdjust {
        /// Volume percentage to set while heating.
        level: u8,
    },

    /// Restart a named OS service.
    ServiceRestart {
        /// Service (systemd unit) name.
        service: String,
    },

    /// Run a shell command, optionally several times.
    ShellCommand {
        /// Command line passed to `sh -c`.
        command: String,
        /// Number of runs, spaced by a short fixed delay.
        repeat: u32,
    },

    /// Pause the dispatch sequence.
    Delay {
        /// Seconds to wait.
        seconds: f64,
    },
}

impl Action {
    /// Returns the registered type name, used in logs and config.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::VolumeAdjust { .. } => "volumeAdjust",
            Self::ServiceRestart { .. } => "serviceRestart",
            Self::ShellCommand { .. } => "shellCommand",
            Self::Delay { .. } => "delay",
        }
    }

    /// Executes this action for the given trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] on side-effect failures. The dispatcher
    /// catches and logs these; they never propagate further.
    pub async fn execute(&self, trigger: TriggerKind, fx: &SideEffects) -> Result<(), ActionError> {
        match self {
            Self::VolumeAdjust { level } => Self::adjust_volume(trigger, *level, fx).await,
            Self::ServiceRestart { service } => {
                tracing::info!(service, "restarting service");
                fx.services.restart(service).await
            }
            Self::ShellCommand { command, repeat } => Self::run_command(command, *repeat).await,
            Self::Delay { seconds } => {
                tracing::debug!(seconds, "delaying dispatch sequence");
                // Resolution bounds the config value; clamp anyway so a
                // hand-built Delay cannot overflow the conversion.
                let seconds = if seconds.is_finite() {
                    seconds.clamp(0.0, MAX_DELAY_SECONDS)
                } else {
                    0.0
                };
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                Ok(())
            }
        }
    }

    async fn adjust_volume(
        trigger: TriggerKind,
        level: u8,
        fx: &SideEffects,
    ) -> Result<(), ActionError> {
        match trigger {
            TriggerKind::HeatingStarted => {
                let current = fx.volume.current().await?;
                fx.save_volume_once(current);
                tracing::info!(from = current, to = level, "lowering volume");
                fx.volume.set(level).await
            }
            TriggerKind::HeatingStopped => fx.restore_volume().await,
            TriggerKind::Wake | TriggerKind::Sleep => {
                tracing::debug!(%trigger, "volumeAdjust ignores this trigger");
                Ok(())
            }
        }
    }

    async fn run_command(command: &str, repeat: u32) -> Result<(), ActionError> {
        for run in 0..repeat.max(1) {
            if run > 0 {
                tokio::time::sleep(REPEAT_DELAY).await;
            }

            tracing::info!(command, run, "running shell command");
            let output = Command::new("sh")
                .args(["-c", command])
                .output()
                .await
                .map_err(|source| ActionError::Spawn {
                    command: command.to_string(),
                    source,
                })?;

            if !output.status.success() {
                return Err(ActionError::CommandFailed {
                    command: command.to_string(),
                    status: output.status.to_string(),
                });
            }
        }
        Ok(())
    }
}
