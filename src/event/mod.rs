// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host power events (sleep/wake).
//!
//! The monitor does not hook the OS notification facility itself; a
//! platform integration pushes events through a [`PowerEventHandle`] and
//! the monitor loop multiplexes the resulting [`PowerEventSource`] against
//! the poll timer.
//!
//! # Examples
//!
//! ```
//! use neviwatch::event::{PowerEvent, PowerEventSource};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (handle, mut source) = PowerEventSource::channel();
//!
//! handle.notify(PowerEvent::wake());
//! let event = source.recv().await.unwrap();
//! assert!(event.kind.is_wake());
//! # }
//! ```

mod power_event;

pub use power_event::{PowerEvent, PowerEventHandle, PowerEventKind, PowerEventSource};
