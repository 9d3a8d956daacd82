// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Piece-list extraction from raw model text.
//!
//! Models are told to answer with a bare JSON array but routinely wrap it
//! in prose or markdown fences. Candidates are tried in this order:
//!
//! 1. the greedy `[...]` span that ends at the end of a line
//! 2. the greedy span from the first `[` to the last `]`
//! 3. every top-level balanced `[...]` span, left to right
//!
//! The first candidate that parses and validates wins. When none does, the
//! caller gets [`Despiece`] with a single fallback piece instead.

use crate::{ExtractError, Measurements, Piece};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static END_ANCHORED_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\[[\s\S]*\]$").expect("valid array pattern"));

static ANY_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[\s\S]*\]").expect("valid array pattern"));

/// Where the pieces of a [`Despiece`] came from.
#[derive(Debug)]
pub enum PieceSource {
    /// Parsed from model output.
    Model,
    /// Substituted because extraction failed for the given reason.
    Fallback(ExtractError),
}

/// A resolved cut list. `pieces` is never empty.
#[derive(Debug)]
pub struct Despiece {
    pub pieces: Vec<Piece>,
    pub source: PieceSource,
}

impl Despiece {
    /// Extracts pieces from `raw`, substituting the fallback on any failure.
    pub fn from_model_output(raw: &str, measurements: &Measurements) -> Self {
        match extract_pieces(raw) {
            Ok(pieces) => Self {
                pieces,
                source: PieceSource::Model,
            },
            Err(reason) => Self::fallback(measurements, reason),
        }
    }

    pub fn fallback(measurements: &Measurements, reason: ExtractError) -> Self {
        Self {
            pieces: vec![Piece::fallback(measurements)],
            source: PieceSource::Fallback(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PieceSource::Fallback(_))
    }
}

/// Finds and validates the piece array inside raw model text.
pub fn extract_pieces(raw: &str) -> Result<Vec<Piece>, ExtractError> {
    let mut first_error = None;
    for candidate in candidates(raw) {
        match parse_candidate(candidate) {
            Ok(pieces) => return Ok(pieces),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(ExtractError::NoArray))
}

fn candidates(raw: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    let regex_matches = [
        END_ANCHORED_ARRAY.find(raw).map(|m| m.as_str()),
        ANY_ARRAY.find(raw).map(|m| m.as_str()),
    ];
    for candidate in regex_matches
        .into_iter()
        .flatten()
        .chain(balanced_arrays(raw))
    {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Top-level balanced `[...]` spans. Brackets inside JSON strings are ignored.
fn balanced_arrays(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '[' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

fn parse_candidate(candidate: &str) -> Result<Vec<Piece>, ExtractError> {
    let values: Vec<Value> = serde_json::from_str(candidate)?;
    if values.is_empty() {
        return Err(ExtractError::Empty);
    }
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let piece = Piece::deserialize(value).map_err(|e| ExtractError::InvalidPiece {
                index,
                reason: e.to_string(),
            })?;
            piece
                .validate()
                .map_err(|reason| ExtractError::InvalidPiece { index, reason })?;
            Ok(piece)
        })
        .collect()
}
