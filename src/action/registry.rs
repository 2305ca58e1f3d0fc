// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of configured action entries into concrete handlers.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{ActionEntry, ActionsConfig};
use crate::error::ConfigError;

use super::handlers::{Action, MAX_DELAY_SECONDS};
use super::trigger::TriggerKind;

/// Validated, ordered action bindings per trigger.
///
/// Built once at startup from the `actions` configuration section. Every
/// entry's `type` and `params` are checked here, so a bad binding fails
/// the process before the poll loop starts instead of at first trigger
/// time.
///
/// # Examples
///
/// ```
/// use neviwatch::action::{ActionRegistry, TriggerKind};
/// use neviwatch::config::Config;
///
/// let config = Config::from_json(r#"{
///     "auth": { "username": "u@e.com", "password": "p", "location": 1, "deviceId": 2 },
///     "actions": { "heatingStarted": [ { "type": "volumeAdjust", "params": { "level": 20 } } ] }
/// }"#).unwrap();
///
/// let registry = ActionRegistry::resolve(&config.actions).unwrap();
/// assert_eq!(registry.bindings_for(TriggerKind::HeatingStarted).len(), 1);
/// assert!(registry.bindings_for(TriggerKind::Wake).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    bindings: HashMap<TriggerKind, Vec<Action>>,
}

impl ActionRegistry {
    /// Action type names this build recognizes.
    pub const KNOWN_TYPES: [&'static str; 4] =
        ["volumeAdjust", "serviceRestart", "shellCommand", "delay"];

    /// Creates an empty registry (no trigger dispatches anything).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves and validates the configured bindings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown action type or invalid
    /// params on any entry.
    pub fn resolve(actions: &ActionsConfig) -> Result<Self, ConfigError> {
        let mut bindings = HashMap::new();
        for (&trigger, entries) in actions {
            let resolved: Vec<Action> = entries
                .iter()
                .map(|entry| resolve_entry(trigger, entry))
                .collect::<Result<_, _>>()?;
            bindings.insert(trigger, resolved);
        }
        Ok(Self { bindings })
    }

    /// Returns the ordered actions bound to a trigger.
    ///
    /// An unbound trigger yields an empty slice, which the dispatcher
    /// treats as a no-op.
    #[must_use]
    pub fn bindings_for(&self, trigger: TriggerKind) -> &[Action] {
        self.bindings.get(&trigger).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if no trigger has any bound action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.values().all(Vec::is_empty)
    }
}

fn resolve_entry(trigger: TriggerKind, entry: &ActionEntry) -> Result<Action, ConfigError> {
    match entry.action_type.as_str() {
        "volumeAdjust" => {
            let level = require_u8(trigger, entry, "level")?;
            if level > 100 {
                return Err(invalid_params(trigger, entry, "level must be 0-100"));
            }
            Ok(Action::VolumeAdjust { level })
        }
        "serviceRestart" => {
            let service = require_string(trigger, entry, "service")?;
            Ok(Action::ServiceRestart { service })
        }
        "shellCommand" => {
            let command = require_string(trigger, entry, "command")?;
            let repeat = match entry.params.get("repeat") {
                None => 1,
                Some(value) => u32::try_from(value.as_u64().ok_or_else(|| {
                    invalid_params(trigger, entry, "repeat must be a positive integer")
                })?)
                .map_err(|_| invalid_params(trigger, entry, "repeat is too large"))?,
            };
            Ok(Action::ShellCommand { command, repeat })
        }
        "delay" => {
            let seconds = entry
                .params
                .get("seconds")
                .and_then(Value::as_f64)
                .ok_or_else(|| invalid_params(trigger, entry, "seconds must be a number"))?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid_params(trigger, entry, "seconds must not be negative"));
            }
            if seconds > MAX_DELAY_SECONDS {
                return Err(invalid_params(
                    trigger,
                    entry,
                    &format!("seconds must be at most {MAX_DELAY_SECONDS}"),
                ));
            }
            Ok(Action::Delay { seconds })
        }
        other => Err(ConfigError::UnknownActionType {
            action_type: other.to_string(),
            trigger: trigger.to_string(),
        }),
    }
}

fn require_string(
    trigger: TriggerKind,
    entry: &ActionEntry,
    key: &str,
) -> Result<String, ConfigError> {
    let value = entry
        .params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_params(trigger, entry, &format!("{key} must be a string")))?;
    if value.is_empty() {
        return Err(invalid_params(
            trigger,
            entry,
            &format!("{key} must not be empty"),
        ));
    }
    Ok(value.to_string())
}

fn require_u8(trigger: TriggerKind, entry: &ActionEntry, key: &str) -> Result<u8, ConfigError> {
    entry
        .params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|value| u8::try_from(value).ok())
        .ok_or_else(|| invalid_params(trigger, entry, &format!("{key} must be an integer 0-255")))
}

fn invalid_params(trigger: TriggerKind, entry: &ActionEntry, message: &str) -> ConfigError {
    ConfigError::InvalidActionParams {
        action_type: entry.action_type.clone(),
        trigger: trigger.to_string(),
        message: message.to_string(),
    }
}
