// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trigger-to-action binding, validation, and dispatch.
//!
//! Configuration binds each [`TriggerKind`] to an ordered list of actions.
//! The [`ActionRegistry`] resolves the string-typed config entries into
//! concrete [`Action`] variants at startup, so an unknown action type fails
//! the process before the poll loop starts. At runtime the
//! [`ActionDispatcher`] runs the bound actions in order, isolating each
//! handler failure.
//!
//! Physical side effects (system volume, OS services) go through the
//! narrow [`VolumeControl`] and [`ServiceManager`] seams; the shipped
//! implementations shell out to `amixer` and `systemctl`.

mod dispatcher;
mod handlers;
mod registry;
mod system;
mod trigger;

pub use dispatcher::ActionDispatcher;
pub use handlers::{Action, SideEffects};
pub use registry::ActionRegistry;
pub use system::{AmixerVolume, ServiceManager, SystemctlServices, VolumeControl};
pub use trigger::TriggerKind;
