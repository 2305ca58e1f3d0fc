// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Side-effect seams: system volume and OS service control.
//!
//! Actions only ever touch the host through these traits, which keeps the
//! dispatch engine testable with fakes. The shipped implementations shell
//! out to the usual Linux tools; swapping in a different mechanism means
//! implementing a two-method trait.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::ActionError;

/// Read and write access to the system output volume, in percent.
#[async_trait]
pub trait VolumeControl: Send + Sync {
    /// Returns the current volume (0-100).
    async fn current(&self) -> Result<u8, ActionError>;

    /// Sets the volume (0-100).
    async fn set(&self, level: u8) -> Result<(), ActionError>;
}

/// Restart access to named OS services.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Requests a restart of the named service.
    async fn restart(&self, service: &str) -> Result<(), ActionError>;
}

/// [`VolumeControl`] backed by the ALSA `amixer` command line tool.
#[derive(Debug, Clone)]
pub struct AmixerVolume {
    control: String,
}

impl AmixerVolume {
    /// Creates a control for the default `Master` mixer channel.
    #[must_use]
    pub fn new() -> Self {
        Self::with_control("Master")
    }

    /// Creates a control for a specific mixer channel.
    #[must_use]
    pub fn with_control(control: impl Into<String>) -> Self {
        Self {
            control: control.into(),
        }
    }

    /// Extracts the first `[NN%]` level from `amixer get` output.
    fn parse_level(output: &str) -> Option<u8> {
        let start = output.find('[')? + 1;
        let rest = &output[start..];
        let end = rest.find("%]")?;
        rest[..end].parse().ok()
    }
}

impl Default for AmixerVolume {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeControl for AmixerVolume {
    async fn current(&self) -> Result<u8, ActionError> {
        let output = Command::new("amixer")
            .args(["get", &self.control])
            .output()
            .await
            .map_err(|err| ActionError::VolumeRead(err.to_string()))?;

        if !output.status.success() {
            return Err(ActionError::VolumeRead(format!(
                "amixer get {} exited with {}",
                self.control, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_level(&stdout).ok_or_else(|| {
            ActionError::VolumeRead(format!("no volume level in amixer output for {}", self.control))
        })
    }

    async fn set(&self, level: u8) -> Result<(), ActionError> {
        let output = Command::new("amixer")
            .args(["set", &self.control, &format!("{level}%")])
            .output()
            .await
            .map_err(|err| ActionError::VolumeWrite(err.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ActionError::VolumeWrite(format!(
                "amixer set {} exited with {}",
                self.control, output.status
            )))
        }
    }
}

/// [`ServiceManager`] backed by `systemctl`.
#[derive(Debug, Clone, Default)]
pub struct SystemctlServices;

impl SystemctlServices {
    /// Creates a systemd-backed service manager.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServiceManager for SystemctlServices {
    async fn restart(&self, service: &str) -> Result<(), ActionError> {
        let output = Command::new("systemctl")
            .args(["restart", service])
            .output()
            .await
            .map_err(|err| ActionError::ServiceRestart {
                service: service.to_string(),
                message: err.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            // systemctl explains permission / unit-not-found on stderr.
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ActionError::ServiceRestart {
                service: service.to_string(),
                message: format!("{} ({})", output.status, stderr.trim()),
            })
        }
    }
}
