// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analyze pipeline: image check, prompt, model call, extraction.

use crate::error::ApiError;
use crate::services::upload::StagedImage;
use crate::services::vision::{ImagePayload, VisionModel};
use cotizador_core::{build_prompt, AnalysisResult, Despiece, Measurements, PieceSource};
use std::sync::Arc;

/// Result of one successful analyze run.
#[derive(Debug)]
pub struct Analysis {
    pub result: AnalysisResult,
    /// True when the pieces are the fallback placeholder.
    pub fallback: bool,
}

/// Stateless orchestrator; one instance serves every request.
pub struct Analyzer {
    model: Arc<dyn VisionModel>,
}

impl Analyzer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Runs the pipeline. The staged image is released on every exit path,
    /// including cancellation, where its drop removes the file.
    pub async fn analyze(
        &self,
        measurements: &Measurements,
        image: Option<StagedImage>,
    ) -> Result<Analysis, ApiError> {
        let image = image.ok_or(ApiError::MissingImage)?;
        let outcome = self.run(measurements, &image).await;
        image.release().await;
        outcome
    }

    async fn run(
        &self,
        measurements: &Measurements,
        image: &StagedImage,
    ) -> Result<Analysis, ApiError> {
        tracing::debug!(
            path = %image.path().display(),
            size = image.size(),
            media_type = %image.media_type(),
            "Analyzing staged image"
        );
        let prompt = build_prompt(measurements);
        let payload = ImagePayload {
            bytes: image.read().await?,
            media_type: image.media_type().to_string(),
        };

        let raw = self.model.complete(&prompt, &payload).await?;
        tracing::debug!(chars = raw.len(), "Model answered");

        let despiece = Despiece::from_model_output(&raw, measurements);
        if let PieceSource::Fallback(reason) = &despiece.source {
            tracing::warn!(reason = %reason, "Could not extract pieces; using fallback");
        }
        let fallback = despiece.is_fallback();

        let result = AnalysisResult::new(despiece.pieces, chrono::Utc::now().timestamp_millis());
        tracing::info!(
            project_id = result.project_id,
            pieces = result.pieces.len(),
            fallback,
            "Analysis complete"
        );

        Ok(Analysis { result, fallback })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::vision::VisionError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use cotizador_core::CutMethod;
    use std::sync::Mutex;

    /// Replays a fixed answer (or upstream failure) and records prompts.
    pub(crate) struct ScriptedModel {
        answer: Result<String, (u16, String)>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub(crate) fn answering(text: &str) -> Self {
            Self {
                answer: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(status: u16, body: &str) -> Self {
            Self {
                answer: Err((status, body.to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        async fn complete(
            &self,
            prompt: &str,
            _image: &ImagePayload,
        ) -> Result<String, VisionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err((status, body)) => Err(VisionError::Status {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }
    }

    /// Never answers within a test's lifetime.
    pub(crate) struct StalledModel;

    #[async_trait]
    impl VisionModel for StalledModel {
        async fn complete(&self, _: &str, _: &ImagePayload) -> Result<String, VisionError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok("[]".into())
        }
    }

    fn shelf() -> Measurements {
        Measurements {
            width: "600".into(),
            height: "720".into(),
            depth: "350".into(),
            material: "MDF".into(),
            description: "estante simple".into(),
        }
    }

    async fn staged(dir: &std::path::Path) -> StagedImage {
        StagedImage::stage(dir, &Bytes::from_static(b"jpeg"), Some("foto.jpg"), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_image() {
        let model = Arc::new(ScriptedModel::answering("[]"));
        let analyzer = Analyzer::new(model.clone());
        let err = analyzer.analyze(&shelf(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingImage));
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_pieces_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let image = staged(dir.path()).await;
        let path = image.path().to_path_buf();
        let model = Arc::new(ScriptedModel::answering(
            r#"[{"pieza":"Lateral","cantidad":2,"dimensiones":"720x350x18","espesor":"18","corte":"sierra"},
                {"pieza":"Fondo","cantidad":1,"dimensiones":"716x596x3","espesor":"3","corte":"CNC"}]"#,
        ));
        let analyzer = Analyzer::new(model.clone());

        let analysis = analyzer.analyze(&shelf(), Some(image)).await.unwrap();

        assert!(!analysis.fallback);
        assert!(analysis.result.success);
        assert_eq!(analysis.result.pieces.len(), 2);
        for piece in &analysis.result.pieces {
            assert!(piece.quantity >= 1);
            assert!(matches!(piece.cut, CutMethod::Sierra | CutMethod::Cnc));
        }
        assert!(model.prompts.lock().unwrap()[0].contains("ancho=600"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unparseable_answer_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::new(Arc::new(ScriptedModel::answering(
            "I cannot help with that.",
        )));

        let analysis = analyzer
            .analyze(&shelf(), Some(staged(dir.path()).await))
            .await
            .unwrap();

        assert!(analysis.fallback);
        assert!(analysis.result.success);
        assert_eq!(analysis.result.pieces.len(), 1);
        assert_eq!(analysis.result.pieces[0].dimensions, "600x350x18");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_terminal_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let image = staged(dir.path()).await;
        let path = image.path().to_path_buf();
        let analyzer = Analyzer::new(Arc::new(ScriptedModel::failing(401, "bad key")));

        let err = analyzer.analyze(&shelf(), Some(image)).await.unwrap_err();

        assert!(matches!(err, ApiError::Upstream(VisionError::Status { status: 401, .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cancelled_analysis_removes_staged_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = staged(dir.path()).await;
        let analyzer = Analyzer::new(Arc::new(StalledModel));

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            analyzer.analyze(&shelf(), Some(image)),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
