// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporary on-disk staging of uploaded images.
//!
//! A staged image lives only for the request that uploaded it. Release is
//! best-effort: failures are logged and never escalated. A staged image
//! dropped without `release` (a cancelled or timed-out request) removes its
//! file on drop.

use crate::error::ApiError;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Media type assumed when the upload does not declare an image type.
pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

/// An uploaded image written to the staging directory.
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    media_type: String,
    size: usize,
    released: bool,
}

impl StagedImage {
    /// Writes `data` under `dir` using a unique name.
    pub async fn stage(
        dir: &Path,
        data: &Bytes,
        file_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Self, ApiError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {e}")))?;

        let path = dir.join(format!("{}-{}", uuid::Uuid::new_v4(), sanitize(file_name)));
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {e}")))?;

        tracing::debug!(path = %path.display(), size = data.len(), "Staged upload");

        Ok(Self {
            path,
            media_type: media_type(content_type),
            size: data.len(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub async fn read(&self) -> Result<Bytes, ApiError> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| ApiError::Internal(format!("Failed to read staged upload: {e}")))
    }

    /// Deletes the staged file. Errors are logged only.
    pub async fn release(mut self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove staged upload"
            );
        }
        self.released = true;
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed abandoned upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove abandoned upload"
            ),
        }
    }
}

/// Keeps only the final path component's safe characters.
fn sanitize(file_name: Option<&str>) -> String {
    let name: String = file_name
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        name
    }
}

fn media_type(content_type: Option<&str>) -> String {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string())
}
