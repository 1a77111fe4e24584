//! Axum route handler for the Analyze API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::error;

use crate::analysis::prompts::AnalysisKind;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Heading for the response area, per trigger.
    pub heading: String,
    /// Model text, or an inline error string when the model call failed.
    pub analysis: String,
}

/// POST /api/v1/analyze
///
/// Multipart fields: `kind` (`review` | `match`), `job_description` (text),
/// `resume` (PDF bytes). Runs rasterize (memoized) then the model call and
/// returns the text to display.
///
/// A model failure is rendered as display text in a 200 response rather
/// than a 5xx: the page must stay interactive after a failed call.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut kind: Option<AnalysisKind> = None;
    let mut job_description = String::new();
    let mut resume: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart request: {e}")))?
    {
        match field.name() {
            Some("kind") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable 'kind' field: {e}")))?;
                kind = Some(value.parse().map_err(AppError::Validation)?);
            }
            Some("job_description") => {
                job_description = field.text().await.map_err(|e| {
                    AppError::Validation(format!("unreadable 'job_description' field: {e}"))
                })?;
            }
            Some("resume") => {
                let data = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("unreadable 'resume' field: {e}"))
                })?;
                if !data.is_empty() {
                    resume = Some(data);
                }
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| AppError::Validation("missing 'kind' field".to_string()))?;

    // A trigger with no upload renders a warning and runs nothing else.
    let resume = resume.ok_or(AppError::NoFileProvided)?;

    // Rasterization is blocking (MuPDF + PNG encode); keep it off the
    // async runtime. The cache makes an unchanged upload a no-op.
    let cache = state.raster_cache.clone();
    let rasterizer = state.rasterizer.clone();
    let page = tokio::task::spawn_blocking(move || {
        cache.get_or_rasterize(rasterizer.as_ref(), &resume)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("rasterization task failed: {e}")))??;

    let analysis = match state
        .model
        .generate(kind.instruction(), &job_description, &page)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            error!("model call failed: {e}");
            format!("Error generating response: {e}")
        }
    };

    Ok(Json(AnalyzeResponse {
        heading: kind.heading().to_string(),
        analysis,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parking_lot::Mutex;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::prompts::{MATCH_REPORT_PROMPT, RESUME_REVIEW_PROMPT};
    use crate::config::Config;
    use crate::llm_client::{ModelError, ResumeModel};
    use crate::rasterize::{
        minimal_pdf, ConversionError, MupdfRasterizer, PageRasterizer, RasterCache,
        RasterizedPage, PNG_MIME,
    };
    use crate::routes::build_router;

    /// Stub model that records every prompt it is given and replies with a
    /// fixed result.
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
        reply: Result<String, ModelError>,
    }

    impl RecordingModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Err(ModelError::Api {
                    status: 500,
                    message: "model unavailable".to_string(),
                }),
            })
        }

        fn seen_prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl ResumeModel for RecordingModel {
        async fn generate(
            &self,
            prompt: &str,
            _job_description: &str,
            _page: &RasterizedPage,
        ) -> Result<String, ModelError> {
            self.prompts.lock().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(ModelError::Api { status, message }) => Err(ModelError::Api {
                    status: *status,
                    message: message.clone(),
                }),
                Err(_) => Err(ModelError::EmptyContent),
            }
        }
    }

    struct CountingRasterizer {
        calls: AtomicUsize,
    }

    impl CountingRasterizer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PageRasterizer for CountingRasterizer {
        fn rasterize_first_page(&self, _pdf: &[u8]) -> Result<RasterizedPage, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RasterizedPage {
                png: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
                mime_type: PNG_MIME,
            })
        }
    }

    fn test_state(
        model: Arc<dyn ResumeModel>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> AppState {
        AppState {
            config: Config {
                gemini_api_key: "test-key".to_string(),
                port: 0,
                rust_log: "info".to_string(),
            },
            model,
            rasterizer,
            raster_cache: Arc::new(RasterCache::new()),
        }
    }

    const BOUNDARY: &str = "ats-test-boundary";

    fn analyze_request(kind: &str, jd: &str, resume: Option<&[u8]>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in [("kind", kind), ("job_description", jd)] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(pdf) = resume {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; \
                     filename=\"resume.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(pdf);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/analyze")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_upload_warns_and_runs_nothing() {
        let model = RecordingModel::replying("unused");
        let rasterizer = CountingRasterizer::new();
        let app = build_router(test_state(model.clone(), rasterizer.clone()));

        let response = app
            .oneshot(analyze_request("review", "some jd", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "NO_FILE");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Please upload a PDF resume"));

        // Neither collaborator may run without an upload.
        assert_eq!(rasterizer.calls(), 0);
        assert!(model.seen_prompts().is_empty());
    }

    #[tokio::test]
    async fn review_trigger_sends_qualitative_prompt() {
        let model = RecordingModel::replying("a detailed review");
        let app = build_router(test_state(model.clone(), CountingRasterizer::new()));

        let response = app
            .oneshot(analyze_request("review", "some jd", Some(b"%PDF-fake")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(model.seen_prompts(), vec![RESUME_REVIEW_PROMPT.to_string()]);

        let json = response_json(response).await;
        assert_eq!(json["heading"], "Resume Analysis:");
        assert_eq!(json["analysis"], "a detailed review");
    }

    #[tokio::test]
    async fn match_trigger_sends_percentage_prompt() {
        let model = RecordingModel::replying("82% match");
        let app = build_router(test_state(model.clone(), CountingRasterizer::new()));

        let response = app
            .oneshot(analyze_request("match", "some jd", Some(b"%PDF-fake")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(model.seen_prompts(), vec![MATCH_REPORT_PROMPT.to_string()]);

        let json = response_json(response).await;
        assert_eq!(json["heading"], "ATS Match Result:");
    }

    #[tokio::test]
    async fn failing_model_becomes_display_text_not_a_fault() {
        let model = RecordingModel::failing();
        let app = build_router(test_state(model, CountingRasterizer::new()));

        let response = app
            .oneshot(analyze_request("review", "some jd", Some(b"%PDF-fake")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert!(json["analysis"]
            .as_str()
            .unwrap()
            .starts_with("Error generating response:"));
    }

    #[tokio::test]
    async fn unparseable_upload_is_rejected_before_the_model_runs() {
        let model = RecordingModel::replying("unused");
        let app = build_router(test_state(
            model.clone(),
            Arc::new(MupdfRasterizer::new()),
        ));

        let response = app
            .oneshot(analyze_request("review", "some jd", Some(b"not a pdf")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"]["code"], "CONVERSION_ERROR");
        assert!(model.seen_prompts().is_empty());
    }

    #[tokio::test]
    async fn percentage_match_scenario_end_to_end() {
        // Deterministic stub standing in for the hosted model.
        let model = RecordingModel::replying(
            "Percentage match: 72%\n\
             Missing keywords: Kubernetes, PostgreSQL\n\
             Extra keywords: AWS\n\
             Below 80%: strengthen cloud and database experience.",
        );
        let app = build_router(test_state(model, Arc::new(MupdfRasterizer::new())));

        let pdf = minimal_pdf("5 years Python, Django, AWS");
        let response = app
            .oneshot(analyze_request(
                "match",
                "Looking for a Python backend engineer",
                Some(&pdf),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        let analysis = json["analysis"].as_str().unwrap();
        assert!(analysis.contains("72%"));
        assert!(analysis.contains("Missing keywords"));
    }
}
