// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Despiece generation endpoint.

use crate::error::ApiError;
use crate::services::StagedImage;
use crate::types::{AnalyzeForm, UploadedFile};
use crate::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::path::Path;

/// Response header telling whether pieces came from the model or the fallback.
pub const PIECE_SOURCE_HEADER: &str = "x-despiece-source";

/// Reads the analyze form. Unknown fields are skipped; an empty image part
/// counts as no image.
async fn read_form(multipart: &mut Multipart, max_bytes: usize) -> Result<AnalyzeForm, ApiError> {
    let max_mb = max_bytes / (1024 * 1024);
    // Overflowing the request body limit surfaces as a multipart read error.
    let limited = move |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::FileTooLarge { max_mb }
        } else {
            ApiError::Multipart(e)
        }
    };
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(limited)? {
        let field_name = field.name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %field_name, "Processing multipart field");

        let m = &mut form.measurements;
        match field_name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(limited)?;
                if data.len() > max_bytes {
                    return Err(ApiError::FileTooLarge { max_mb });
                }
                if data.is_empty() {
                    continue;
                }
                form.image = Some(UploadedFile {
                    data,
                    file_name,
                    content_type,
                });
            }
            "width" => m.width = field.text().await.map_err(limited)?,
            "height" => m.height = field.text().await.map_err(limited)?,
            "depth" => m.depth = field.text().await.map_err(limited)?,
            "material" => m.material = field.text().await.map_err(limited)?,
            "description" => m.description = field.text().await.map_err(limited)?,
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/analyze - Image plus measurements to a despiece.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let form = read_form(&mut multipart, state.config.max_file_size_bytes()).await?;

    let image = match form.image {
        Some(upload) => Some(
            StagedImage::stage(
                Path::new(&state.config.upload_dir),
                &upload.data,
                upload.file_name.as_deref(),
                upload.content_type.as_deref(),
            )
            .await?,
        ),
        None => {
            tracing::warn!("Analyze request without image");
            None
        }
    };

    let analysis = state.analyzer.analyze(&form.measurements, image).await?;
    let source = if analysis.fallback { "fallback" } else { "model" };

    Ok(([(PIECE_SOURCE_HEADER, source)], Json(analysis.result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{json_body, test_config, test_state};
    use crate::services::analyzer::tests::{ScriptedModel, StalledModel};
    use crate::services::quotes::tests::RecordingSheets;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "cotizador-test-boundary";

    const ANSWER: &str = r#"Despiece:
[{"pieza":"Lateral","cantidad":2,"dimensiones":"720x350x18","espesor":"18","corte":"sierra"},
 {"pieza":"Estante","cantidad":3,"dimensiones":"564x330x18","espesor":"18","corte":"sierra"},
 {"pieza":"Fondo","cantidad":1,"dimensiones":"716x596x3","espesor":"3","corte":"CNC"}]"#;

    fn shelf_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("width", "600"),
            ("height", "720"),
            ("depth", "350"),
            ("material", "MDF"),
            ("description", "estante simple"),
        ]
    }

    fn analyze_request(fields: &[(&str, &str)], image: Option<&[u8]>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(bytes) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"mueble.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_image_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::answering(ANSWER));
        let state = test_state(dir.path(), model.clone(), Arc::new(RecordingSheets::default()));

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].is_string());
        assert_eq!(body["code"], "MISSING_IMAGE");
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            Arc::new(ScriptedModel::answering(ANSWER)),
            Arc::new(RecordingSheets::default()),
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = crate::app(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_shelf_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::answering(ANSWER));
        let state = test_state(dir.path(), model.clone(), Arc::new(RecordingSheets::default()));

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), Some(b"\xff\xd8\xff\xe0jpeg".as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[PIECE_SOURCE_HEADER], "model");
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert!(body["projectId"].is_i64());

        let pieces = body["pieces"].as_array().unwrap();
        assert_eq!(pieces.len(), 3);
        for piece in pieces {
            assert!(piece["cantidad"].as_u64().unwrap() >= 1);
            let corte = piece["corte"].as_str().unwrap();
            assert!(corte == "sierra" || corte == "CNC");
        }

        let prompt = &model.prompts.lock().unwrap()[0];
        assert!(prompt.contains("ancho=600, alto=720, profundidad=350"));
        assert!(prompt.contains("Material: MDF"));

        // Staged uploads are removed once the request completes.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unusable_answer_is_degraded_success() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            Arc::new(ScriptedModel::answering("I cannot help with that.")),
            Arc::new(RecordingSheets::default()),
        );

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), Some(b"jpeg".as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[PIECE_SOURCE_HEADER], "fallback");
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["pieces"][0]["dimensiones"], "600x350x18");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_with_details() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            Arc::new(ScriptedModel::failing(400, "{\"error\":\"invalid image\"}")),
            Arc::new(RecordingSheets::default()),
        );

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), Some(b"jpeg".as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert!(body["details"].as_str().unwrap().contains("invalid image"));
        assert!(body.get("success").is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_image_past_body_limit_is_413() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::answering(ANSWER));
        let state = test_state(dir.path(), model.clone(), Arc::new(RecordingSheets::default()));
        let twice_the_limit = vec![0u8; 2 * 1024 * 1024];

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), Some(twice_the_limit.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["code"], "FILE_TOO_LARGE");
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_request_is_408_and_leaves_no_upload() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = test_state(
            dir.path(),
            Arc::new(StalledModel),
            Arc::new(RecordingSheets::default()),
        );
        let mut config = test_config(dir.path());
        config.request_timeout_secs = 1;
        state.config = Arc::new(config);

        let response = crate::app(state)
            .oneshot(analyze_request(&shelf_fields(), Some(b"jpeg".as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_image_is_413() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            Arc::new(ScriptedModel::answering(ANSWER)),
            Arc::new(RecordingSheets::default()),
        );
        let too_big = vec![0u8; 1024 * 1024 + 1];

        let response = crate::app(state)
            .oneshot(analyze_request(&[], Some(too_big.as_slice())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json_body(response).await["code"], "FILE_TOO_LARGE");
    }
}
