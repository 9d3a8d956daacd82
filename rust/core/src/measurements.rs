// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User-entered furniture measurements.

use serde::{Deserialize, Serialize};

/// Overall dimensions (millimeters) plus material and free-text description.
///
/// Every field is kept exactly as submitted. Missing values are empty
/// strings and are interpolated as such; no arithmetic is ever done on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurements {
    #[serde(default, deserialize_with = "crate::text::text")]
    pub width: String,
    #[serde(default, deserialize_with = "crate::text::text")]
    pub height: String,
    #[serde(default, deserialize_with = "crate::text::text")]
    pub depth: String,
    #[serde(default, deserialize_with = "crate::text::text")]
    pub material: String,
    #[serde(default, deserialize_with = "crate::text::text")]
    pub description: String,
}

impl Measurements {
    /// `{width}x{height}x{depth}`, the "medidas" column of a quote.
    pub fn overall(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.depth)
    }
}
