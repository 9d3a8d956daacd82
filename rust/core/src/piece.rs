// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A single line of a cut list.

use crate::Measurements;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Board thickness used by the fallback piece.
pub const FALLBACK_THICKNESS_MM: &str = "18";

/// How a piece is cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CutMethod {
    #[serde(rename = "sierra")]
    Sierra,
    #[serde(rename = "CNC")]
    Cnc,
}

impl CutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CutMethod::Sierra => "sierra",
            CutMethod::Cnc => "CNC",
        }
    }
}

impl fmt::Display for CutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sierra" => Ok(CutMethod::Sierra),
            "cnc" => Ok(CutMethod::Cnc),
            other => Err(format!("unknown cut method '{other}' (expected sierra or CNC)")),
        }
    }
}

impl<'de> Deserialize<'de> for CutMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One item of a despiece.
///
/// Serialized with the Spanish field names used by the browser client and
/// the model contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "pieza", deserialize_with = "crate::text::text")]
    pub name: String,
    #[serde(rename = "cantidad", deserialize_with = "crate::text::quantity")]
    pub quantity: u32,
    /// Length x width x thickness, as free text.
    #[serde(rename = "dimensiones", deserialize_with = "crate::text::text")]
    pub dimensions: String,
    /// Thickness in millimeters.
    #[serde(rename = "espesor", default, deserialize_with = "crate::text::text")]
    pub thickness: String,
    #[serde(rename = "corte")]
    pub cut: CutMethod,
    #[serde(
        rename = "observaciones",
        default,
        deserialize_with = "crate::text::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl Piece {
    /// Placeholder top panel used when model output cannot be used.
    pub fn fallback(measurements: &Measurements) -> Self {
        Self {
            name: "Tapa superior".to_string(),
            quantity: 1,
            dimensions: format!(
                "{}x{}x{}",
                measurements.width, measurements.depth, FALLBACK_THICKNESS_MM
            ),
            thickness: FALLBACK_THICKNESS_MM.to_string(),
            cut: CutMethod::Sierra,
            notes: Some("Ejemplo fallback".to_string()),
        }
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity == 0 {
            return Err(format!("'{}' has cantidad 0", self.name));
        }
        Ok(())
    }
}
