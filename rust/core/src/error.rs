// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Reasons a piece list could not be taken from model output.
///
/// These never reach the HTTP caller: the extractor resolves every one of
/// them by substituting the fallback piece.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("no JSON array found in model output")]
    NoArray,

    #[error("invalid JSON array: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("model returned an empty piece list")]
    Empty,

    #[error("piece #{index} is invalid: {reason}")]
    InvalidPiece { index: usize, reason: String },
}
