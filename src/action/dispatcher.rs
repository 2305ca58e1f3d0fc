// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trigger dispatch with per-handler failure isolation.

use super::handlers::SideEffects;
use super::registry::ActionRegistry;
use super::trigger::TriggerKind;

/// Runs the actions bound to a trigger, in order.
///
/// A handler failure is logged with the action type and trigger and never
/// propagates: it neither stops later handlers in the list nor the caller.
/// Serialization of dispatches is guaranteed by ownership: the monitor's
/// single event loop task owns the dispatcher, so a dispatch always runs
/// to completion before the next trigger is accepted.
pub struct ActionDispatcher {
    registry: ActionRegistry,
    fx: SideEffects,
}

impl ActionDispatcher {
    /// Creates a dispatcher over validated bindings and side-effect seams.
    #[must_use]
    pub fn new(registry: ActionRegistry, fx: SideEffects) -> Self {
        Self { registry, fx }
    }

    /// Dispatches a trigger to its bound actions.
    ///
    /// A trigger with no bound actions is a no-op, not an error.
    pub async fn dispatch(&self, trigger: TriggerKind) {
        let actions = self.registry.bindings_for(trigger);
        if actions.is_empty() {
            tracing::debug!(%trigger, "no actions bound");
            return;
        }

        tracing::info!(%trigger, count = actions.len(), "dispatching actions");
        for action in actions {
            if let Err(err) = action.execute(trigger, &self.fx).await {
                tracing::error!(
                    %trigger,
                    action = action.type_name(),
                    error = %err,
                    "action failed"
                );
            }
        }
    }

    /// Best-effort restoration of the saved volume, for shutdown.
    pub async fn restore_volume(&self) {
        if let Err(err) = self.fx.restore_volume().await {
            tracing::warn!(error = %err, "shutdown volume restore failed");
        }
    }

    /// Returns the saved pre-activation volume, if any.
    #[must_use]
    pub fn saved_volume(&self) -> Option<u8> {
        self.fx.saved_volume()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::handlers::tests::{FakeServices, FakeVolume};
    use super::*;
    use crate::config::Config;

    fn registry(actions: &str) -> ActionRegistry {
        let config = Config::from_json(&format!(
            r#"{{
                "auth": {{
                    "username": "user@example.com",
                    "password": "hunter2",
                    "location": 1,
                    "deviceId": 2
                }},
                "actions": {actions}
            }}"#
        ))
        .unwrap();
        ActionRegistry::resolve(&config.actions).unwrap()
    }

    #[tokio::test]
    async fn unbound_trigger_is_a_no_op() {
        let volume = Arc::new(FakeVolume::new(50));
        let fx = SideEffects::new(volume.clone(), Arc::new(FakeServices::new()));
        let dispatcher = ActionDispatcher::new(ActionRegistry::empty(), fx);

        dispatcher.dispatch(TriggerKind::HeatingStarted).await;
        assert!(volume.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn runs_bound_actions_in_order() {
        let registry = registry(
            r#"{
                "wake": [
                    { "type": "serviceRestart", "params": { "service": "first" } },
                    { "type": "serviceRestart", "params": { "service": "second" } }
                ]
            }"#,
        );
        let services = Arc::new(FakeServices::new());
        let fx = SideEffects::new(Arc::new(FakeVolume::new(50)), services.clone());
        let dispatcher = ActionDispatcher::new(registry, fx);

        dispatcher.dispatch(TriggerKind::Wake).await;
        assert_eq!(services.restarts.lock().as_slice(), ["first", "second"]);
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_later_handlers() {
        let registry = registry(
            r#"{
                "wake": [
                    { "type": "serviceRestart", "params": { "service": "broken" } },
                    { "type": "serviceRestart", "params": { "service": "survivor" } }
                ]
            }"#,
        );
        // Every restart fails, yet both must be attempted.
        let services = Arc::new(FakeServices::failing());
        let fx = SideEffects::new(Arc::new(FakeVolume::new(50)), services.clone());
        let dispatcher = ActionDispatcher::new(registry, fx);

        dispatcher.dispatch(TriggerKind::Wake).await;
        assert_eq!(services.restarts.lock().as_slice(), ["broken", "survivor"]);
    }

    #[tokio::test]
    async fn heating_scenario_round_trip() {
        // Baseline volume 50, configured level 20: started ducks to 20 and
        // saves 50, stopped restores exactly 50.
        let registry = registry(
            r#"{
                "heatingStarted": [ { "type": "volumeAdjust", "params": { "level": 20 } } ],
                "heatingStopped": [ { "type": "volumeAdjust", "params": { "level": 20 } } ]
            }"#,
        );
        let volume = Arc::new(FakeVolume::new(50));
        let fx = SideEffects::new(volume.clone(), Arc::new(FakeServices::new()));
        let dispatcher = ActionDispatcher::new(registry, fx);

        dispatcher.dispatch(TriggerKind::HeatingStarted).await;
        assert_eq!(volume.level(), 20);
        assert_eq!(dispatcher.saved_volume(), Some(50));

        dispatcher.dispatch(TriggerKind::HeatingStopped).await;
        assert_eq!(volume.level(), 50);
        assert_eq!(dispatcher.saved_volume(), None);
    }

    #[tokio::test]
    async fn shutdown_restore_is_idempotent() {
        let registry = registry(
            r#"{ "heatingStarted": [ { "type": "volumeAdjust", "params": { "level": 20 } } ] }"#,
        );
        let volume = Arc::new(FakeVolume::new(50));
        let fx = SideEffects::new(volume.clone(), Arc::new(FakeServices::new()));
        let dispatcher = ActionDispatcher::new(registry, fx);

        dispatcher.dispatch(TriggerKind::HeatingStarted).await;
        dispatcher.restore_volume().await;
        assert_eq!(volume.level(), 50);

        // Nothing saved anymore; a second restore must not touch volume.
        dispatcher.restore_volume().await;
        assert_eq!(volume.sets.lock().as_slice(), [20, 50]);
    }
}
