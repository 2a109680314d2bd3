// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only device queries.

use crate::command::Command;

/// Reads every pin and sensor value, `GET /status`.
///
/// The device answers with a flat JSON object such as
/// `{"Digital Pin 3": 1, "Analog Pin 14": 2048, "Soil Moisture": 1730}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusQuery;

impl Command for StatusQuery {
    fn path(&self) -> String {
        "/status".to_string()
    }
}

/// Asks a bootstrap device for the address of another device, `GET /ip`.
///
/// The device answers with the address as plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressQuery;

impl Command for AddressQuery {
    fn path(&self) -> String {
        "/ip".to_string()
    }
}
