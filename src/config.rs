// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration loading and validation.
//!
//! The configuration is a single JSON file with three sections: `auth`
//! (Neviweb credentials and device selection), `settings` (polling and
//! failure handling), and `actions` (trigger-to-action bindings). Every
//! `settings` key has a default so the section may be partial or absent.
//!
//! Configuration is loaded once before the monitor starts and treated as
//! read-only for the process lifetime. Action *types* are validated
//! separately by [`ActionRegistry`](crate::action::ActionRegistry) so that
//! a bad binding fails startup, not the first trigger.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::action::TriggerKind;
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Neviweb credentials and device selection.
    pub auth: AuthConfig,
    /// Polling and failure handling settings.
    #[serde(default)]
    pub settings: Settings,
    /// Trigger-to-action bindings, keyed by trigger kind.
    #[serde(default)]
    pub actions: ActionsConfig,
}

/// Credentials and device selection for the Neviweb API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Neviweb account username (email address).
    pub username: String,
    /// Neviweb account password.
    pub password: String,
    /// Location id the device belongs to.
    pub location: u64,
    /// Device id of the thermostat to watch.
    pub device_id: u64,
}

/// Polling and failure handling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Seconds between polls while the API is healthy.
    pub poll_interval_seconds: u64,
    /// Consecutive poll failures before a warning is surfaced.
    pub failure_threshold: u32,
    /// Backoff delay after the first consecutive failure, in seconds.
    pub backoff_initial_seconds: u64,
    /// Upper bound on the backoff delay, in seconds.
    pub backoff_max_seconds: u64,
    /// Per-request HTTP timeout, in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            failure_threshold: 3,
            backoff_initial_seconds: 5,
            backoff_max_seconds: 300,
            request_timeout_seconds: 30,
        }
    }
}

impl Settings {
    /// Returns the poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Returns the per-request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Ordered action bindings per trigger.
pub type ActionsConfig = HashMap<TriggerKind, Vec<ActionEntry>>;

/// One configured action: a type tag plus free-form parameters.
///
/// The entry is resolved into a concrete
/// [`Action`](crate::action::Action) at startup; an unknown `type` or
/// invalid `params` rejects the whole configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionEntry {
    /// Registered action type name (e.g. `volumeAdjust`).
    #[serde(rename = "type")]
    pub action_type: String,
    /// Action-specific parameters.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl Config {
    /// Loads and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid
    /// JSON, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the JSON is malformed or fails validation.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.username.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "auth.username".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.auth.password.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "auth.password".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.settings.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidField {
                field: "settings.pollIntervalSeconds".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.settings.failure_threshold == 0 {
            return Err(ConfigError::InvalidField {
                field: "settings.failureThreshold".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.settings.backoff_initial_seconds > self.settings.backoff_max_seconds {
            return Err(ConfigError::InvalidField {
                field: "settings.backoffInitialSeconds".to_string(),
                message: "must not exceed backoffMaxSeconds".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "auth": {
                "username": "user@example.com",
                "password": "hunter2",
                "location": 1234,
                "deviceId": 5678
            }
        }"#
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_json(minimal_json()).unwrap();
        assert_eq!(config.auth.device_id, 5678);
        assert_eq!(config.settings.poll_interval_seconds, 30);
        assert_eq!(config.settings.failure_threshold, 3);
        assert_eq!(config.settings.backoff_initial_seconds, 5);
        assert_eq!(config.settings.backoff_max_seconds, 300);
        assert!(config.actions.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let config = Config::from_json(
            r#"{
                "auth": {
                    "username": "user@example.com",
                    "password": "hunter2",
                    "location": 1234,
                    "deviceId": 5678
                },
                "settings": {
                    "pollIntervalSeconds": 10,
                    "failureThreshold": 5
                },
                "actions": {
                    "heatingStarted": [
                        { "type": "volumeAdjust", "params": { "level": 20 } }
                    ],
                    "wake": [
                        { "type": "serviceRestart", "params": { "service": "jellyfin" } }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.settings.poll_interval_seconds, 10);
        assert_eq!(config.settings.failure_threshold, 5);
        // Unlisted settings keep their defaults.
        assert_eq!(config.settings.request_timeout_seconds, 30);

        let started = &config.actions[&TriggerKind::HeatingStarted];
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].action_type, "volumeAdjust");
        assert_eq!(started[0].params["level"], 20);

        assert!(config.actions.contains_key(&TriggerKind::Wake));
    }

    #[test]
    fn unknown_trigger_name_is_rejected() {
        let result = Config::from_json(
            r#"{
                "auth": {
                    "username": "user@example.com",
                    "password": "hunter2",
                    "location": 1,
                    "deviceId": 2
                },
                "actions": { "onFullMoon": [] }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = Config::from_json(
            r#"{
                "auth": {
                    "username": "user@example.com",
                    "password": "hunter2",
                    "location": 1,
                    "deviceId": 2
                },
                "settings": { "pollIntervalSeconds": 0 }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    }

    #[test]
    fn empty_username_is_rejected() {
        let result = Config::from_json(
            r#"{
                "auth": {
                    "username": "",
                    "password": "hunter2",
                    "location": 1,
                    "deviceId": 2
                }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    }

    #[test]
    fn backoff_bounds_are_checked() {
        let result = Config::from_json(
            r#"{
                "auth": {
                    "username": "user@example.com",
                    "password": "hunter2",
                    "location": 1,
                    "deviceId": 2
                },
                "settings": { "backoffInitialSeconds": 600, "backoffMaxSeconds": 300 }
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load("/nonexistent/neviwatch.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/neviwatch.json"));
    }
}
