// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Neviweb cloud API client.
//!
//! Speaks the session-token HTTP API behind `https://neviweb.com`: login,
//! device listing, and per-device attribute fetches. The session is cached
//! inside the client and refreshed transparently: an expired session
//! triggers exactly one re-login and one fetch retry before the failure
//! surfaces to the poll loop.

mod neviweb;

pub use neviweb::{NeviwebClient, NeviwebDevice, Session};
