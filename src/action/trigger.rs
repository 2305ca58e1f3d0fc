// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The trigger vocabulary actions are bound to.

use std::fmt;

use serde::Deserialize;

/// A classified, dispatch-worthy event.
///
/// Heating transitions come from the poll loop; sleep and wake come from
/// the host power event source. The serde names double as the keys of the
/// `actions` section in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerKind {
    /// The heater went from idle to heating.
    HeatingStarted,
    /// The heater went from heating to idle.
    HeatingStopped,
    /// The host resumed from suspend.
    Wake,
    /// The host is about to suspend.
    Sleep,
}

impl TriggerKind {
    /// Returns the configuration key for this trigger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HeatingStarted => "heatingStarted",
            Self::HeatingStopped => "heatingStopped",
            Self::Wake => "wake",
            Self::Sleep => "sleep",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_config_keys() {
        let kind: TriggerKind = serde_json::from_str("\"heatingStarted\"").unwrap();
        assert_eq!(kind, TriggerKind::HeatingStarted);

        let kind: TriggerKind = serde_json::from_str("\"wake\"").unwrap();
        assert_eq!(kind, TriggerKind::Wake);
    }

    #[test]
    fn rejects_unknown_names() {
        let result: Result<TriggerKind, _> = serde_json::from_str("\"fullMoon\"");
        assert!(result.is_err());
    }

    #[test]
    fn display_matches_config_key() {
        assert_eq!(TriggerKind::HeatingStopped.to_string(), "heatingStopped");
        assert_eq!(TriggerKind::Sleep.to_string(), "sleep");
    }
}
