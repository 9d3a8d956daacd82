// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use serde::Serialize;

/// Body of a successful save.
#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    /// Tab created for the quote (new-tab mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Range written.
    pub range: String,
}
