// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analysis results and the persisted quote record.

use crate::{Measurements, Piece};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Column titles of a quote sheet.
pub const QUOTE_HEADER: [&str; 8] = [
    "timestamp",
    "projectId",
    "material",
    "medidas",
    "description",
    "pieces_count",
    "pieces_json",
    "status",
];

/// Status of every newly saved quote.
pub const PENDING_STATUS: &str = "Pendiente";

/// Body of a successful analyze response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub success: bool,
    pub pieces: Vec<Piece>,
    /// Creation time in Unix milliseconds. Only distinguishes projects
    /// within a session.
    pub project_id: i64,
}

impl AnalysisResult {
    pub fn new(pieces: Vec<Piece>, project_id: i64) -> Self {
        Self {
            success: true,
            pieces,
            project_id,
        }
    }
}

/// A quote as held by the client and sent back for saving.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "crate::text::text")]
    pub id: String,
    #[serde(flatten)]
    pub measurements: Measurements,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pieces: Vec<Piece>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Piece>, D::Error> {
    Ok(Option::<Vec<Piece>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One spreadsheet row describing a saved quote. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub timestamp: String,
    pub project_id: String,
    pub material: String,
    /// `{width}x{height}x{depth}`.
    pub dimensions: String,
    pub description: String,
    pub piece_count: usize,
    /// The piece list serialized as a JSON array.
    pub pieces_json: String,
    pub status: String,
}

impl QuoteRecord {
    pub fn from_project(
        project: &Project,
        timestamp: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            timestamp: timestamp.into(),
            project_id: project.id.clone(),
            material: project.measurements.material.clone(),
            dimensions: project.measurements.overall(),
            description: project.measurements.description.clone(),
            piece_count: project.pieces.len(),
            pieces_json: serde_json::to_string(&project.pieces)?,
            status: PENDING_STATUS.to_string(),
        })
    }

    pub fn header_row() -> Vec<Value> {
        QUOTE_HEADER.iter().map(|h| Value::from(*h)).collect()
    }

    /// Cells in [`QUOTE_HEADER`] order.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.timestamp.as_str()),
            Value::from(self.project_id.as_str()),
            Value::from(self.material.as_str()),
            Value::from(self.dimensions.as_str()),
            Value::from(self.description.as_str()),
            Value::from(self.piece_count),
            Value::from(self.pieces_json.as_str()),
            Value::from(self.status.as_str()),
        ]
    }

    /// Parses the serialized piece list back out of the record.
    pub fn pieces(&self) -> Result<Vec<Piece>, serde_json::Error> {
        serde_json::from_str(&self.pieces_json)
    }
}
