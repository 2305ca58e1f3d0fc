// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for neviwatch.
//!
//! The error taxonomy mirrors how failures are handled at runtime:
//! configuration errors are fatal at startup, client errors feed the poll
//! failure streak, and action errors are isolated to a single handler
//! invocation.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Communication with the Neviweb API failed.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// A configured action failed to execute.
    #[error("action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors raised while loading and validating configuration.
///
/// Every variant is fatal: the process exits non-zero before the poll loop
/// starts, so a bad config can never surface at trigger time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON or has the wrong shape.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is missing or has an invalid value.
    #[error("invalid field {field}: {message}")]
    InvalidField {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        message: String,
    },

    /// An action entry references a type that is not registered.
    #[error("unknown action type {action_type:?} bound to trigger {trigger}")]
    UnknownActionType {
        /// The unrecognized `type` value.
        action_type: String,
        /// The trigger the entry was bound to.
        trigger: String,
    },

    /// An action entry is missing a required parameter or has a bad value.
    #[error("invalid params for action {action_type:?} on trigger {trigger}: {message}")]
    InvalidActionParams {
        /// The action type being configured.
        action_type: String,
        /// The trigger the entry was bound to.
        trigger: String,
        /// Why the params were rejected.
        message: String,
    },
}

/// Errors raised by the Neviweb API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP transport failure, including request timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the credentials or reported an account error.
    #[error("authentication failed: {code}")]
    Auth {
        /// Error code reported by the API (e.g. `ACCSESSEXC`).
        code: String,
    },

    /// The cached session is no longer valid.
    ///
    /// Handled internally by a single re-login and fetch retry; surfaces
    /// only when that retry also fails.
    #[error("session expired ({code})")]
    SessionExpired {
        /// Error code reported by the API (e.g. `USRSESSEXP`).
        code: String,
    },

    /// The API returned an unexpected response shape.
    #[error("unexpected response: {0}")]
    Parse(String),

    /// The API reported an error the client does not recognize.
    #[error("API error: {code}")]
    Api {
        /// Error code reported by the API.
        code: String,
    },

    /// The configured device was not found at the configured location.
    #[error("device {device_id} not found")]
    DeviceNotFound {
        /// The configured device id.
        device_id: u64,
    },

    /// No session is established; `login` must be called first.
    #[error("not logged in")]
    NotLoggedIn,
}

impl ClientError {
    /// Returns `true` if this failure invalidated the cached session.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

/// Errors raised by a single action handler invocation.
///
/// These are always caught by the dispatcher, logged with the offending
/// action and trigger, and never stop other handlers or the loop.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Spawning an external command failed.
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An external command ran but exited unsuccessfully.
    #[error("command {command:?} exited with {status}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// Reading the current system volume failed.
    #[error("cannot read system volume: {0}")]
    VolumeRead(String),

    /// Setting the system volume failed.
    #[error("cannot set system volume: {0}")]
    VolumeWrite(String),

    /// Restarting a service failed (permission, not found, ...).
    #[error("cannot restart service {service:?}: {message}")]
    ServiceRestart {
        /// The service name.
        service: String,
        /// Why the restart failed.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
