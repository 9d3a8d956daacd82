// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use bytes::Bytes;
use cotizador_core::{Measurements, Project};
use serde::Deserialize;

/// Body of `POST /api/save`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    /// Older clients send `projectData`.
    #[serde(default, alias = "projectData")]
    pub project: Option<Project>,
}

/// The image part of an analyze form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Fields of the analyze multipart form.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeForm {
    pub measurements: Measurements,
    pub image: Option<UploadedFile>,
}
