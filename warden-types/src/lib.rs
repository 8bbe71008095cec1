// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared types for sg-warden, the dynamic-firewall reconciler.
//!
//! This crate holds the data model for remote security group rules and the
//! pure address arithmetic that maps a caller's address to the network range
//! it should be trusted from. Nothing here talks to the network.

pub mod address;
pub mod rules;
