use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use qa_search_core::{Exchange, QaCoordinator, QaError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub const UPLOAD_SUCCESS: &str = "PDF uploaded and Q&A pairs processed successfully!";
pub const RESET_SUCCESS: &str = "Conversation history reset.";

const FILE_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<QaCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<QaCoordinator>) -> Self {
        Self { coordinator }
    }
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/upload", post(upload_handler))
        .route("/ask", post(ask_handler))
        .route("/reset", post(reset_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Failure payload. Clients branch on the presence of `error`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_type: &'static str,
}

impl From<QaError> for ErrorBody {
    fn from(error: QaError) -> Self {
        Self {
            error: error.to_string(),
            error_type: error.kind(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadBody {
    pub message: &'static str,
    pub document_id: String,
    pub file_name: String,
    pub pairs: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Accepted(UploadBody),
    Rejected(ErrorBody),
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskBody {
    pub answer: String,
    pub history: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<usize>,
    pub history_len: usize,
    pub embedding_model: String,
}

pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Json<UploadResponse> {
    let limit = state.coordinator.options().max_upload_bytes;
    let response = match read_upload(multipart, limit).await {
        Ok((file_name, bytes)) => upload_document(&state, &file_name, bytes).await,
        Err(error) => UploadResponse::Rejected(error.into()),
    };
    Json(response)
}

async fn read_upload(
    mut multipart: Multipart,
    limit: usize,
) -> Result<(String, Vec<u8>), QaError> {
    let mut fallback = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| multipart_error(error, limit, "malformed multipart body"))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let is_file_field = field.name() == Some(FILE_FIELD);
        let bytes = field
            .bytes()
            .await
            .map_err(|error| multipart_error(error, limit, "failed to read upload"))?;

        if is_file_field {
            return Ok((file_name, bytes.to_vec()));
        }
        fallback.get_or_insert((file_name, bytes.to_vec()));
    }

    fallback.ok_or(QaError::InvalidFileType)
}

/// Body-limit overruns surface from the multipart stream as 413s.
fn multipart_error(error: MultipartError, limit: usize, context: &str) -> QaError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        QaError::UploadTooLarge { limit }
    } else {
        QaError::Processing(format!("{context}: {error}"))
    }
}

pub async fn upload_document(
    state: &AppState,
    file_name: &str,
    bytes: Vec<u8>,
) -> UploadResponse {
    match state.coordinator.upload(file_name, bytes).await {
        Ok(receipt) => UploadResponse::Accepted(UploadBody {
            message: UPLOAD_SUCCESS,
            document_id: receipt.document_id.to_string(),
            file_name: receipt.file_name,
            pairs: receipt.pairs,
        }),
        Err(error) => {
            warn!(file = %file_name, error_type = error.kind(), %error, "upload rejected");
            UploadResponse::Rejected(error.into())
        }
    }
}

pub async fn ask_handler(
    State(state): State<AppState>,
    Form(form): Form<AskForm>,
) -> Json<AskBody> {
    let body = match state.coordinator.ask(&form.question).await {
        Ok(outcome) => AskBody {
            answer: outcome.answer,
            history: pairs(&outcome.history),
            error: None,
            error_type: None,
        },
        Err(error) => {
            warn!(error_type = error.kind(), %error, "question not answered");
            let history = state.coordinator.history().await;
            AskBody {
                answer: error.to_string(),
                history: pairs(&history),
                error: Some(error.to_string()),
                error_type: Some(error.kind()),
            }
        }
    };
    Json(body)
}

pub async fn reset_handler(State(state): State<AppState>) -> Json<MessageBody> {
    state.coordinator.reset().await;
    Json(MessageBody {
        message: RESET_SUCCESS,
    })
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthBody> {
    let coordinator = &state.coordinator;
    let index = coordinator.session().current_index().await;
    let history_len = coordinator.history().await.len();

    Json(HealthBody {
        status: "ok",
        state: if index.is_some() { "ready" } else { "no_index" },
        document_id: index
            .as_ref()
            .map(|index| index.fingerprint().document_id.to_string()),
        pairs: index.as_ref().map(|index| index.len()),
        history_len,
        embedding_model: coordinator.embedder().model_id().to_string(),
    })
}

fn pairs(history: &[Exchange]) -> Vec<(String, String)> {
    history.iter().map(Exchange::as_pair).collect()
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use qa_search_core::{
        CharacterNgramEmbedder, IngestError, PageText, PdfExtractor, ServiceOptions,
    };
    use serde_json::{json, Value};
    use std::path::Path;
    use tower::ServiceExt;

    /// Treats the uploaded bytes as the document text.
    struct PlainTextExtractor;

    impl PdfExtractor for PlainTextExtractor {
        fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
            let text = std::fs::read_to_string(path)?;
            Ok(vec![PageText { number: 1, text }])
        }
    }

    const FAQ: &str = "Question: What is 2+2?\nAnswer: 4\nQuestion: What color is the sky?\nAnswer: Blue";

    const BOUNDARY: &str = "qa-search-boundary";

    fn state() -> AppState {
        state_with(ServiceOptions::default())
    }

    fn state_with(options: ServiceOptions) -> AppState {
        AppState::new(Arc::new(QaCoordinator::new(
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(PlainTextExtractor),
            options,
        )))
    }

    /// One multipart part: field name, optional file name, content.
    type Part<'a> = (&'a str, Option<&'a str>, &'a str);

    fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/pdf\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n"
                )),
            }
            body.push_str(&format!("\r\n{content}\r\n"));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn post_upload(app: Router, parts: &[Part<'_>]) -> Value {
        let response = app.oneshot(multipart_request(parts)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn ask(state: &AppState, question: &str) -> Value {
        let Json(body) = ask_handler(
            State(state.clone()),
            Form(AskForm {
                question: question.to_string(),
            }),
        )
        .await;
        serde_json::to_value(body).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ask_before_upload_reports_missing_document() {
        let state = state();
        let body = ask(&state, "What is 2+2?").await;

        assert_eq!(body["error_type"], "no_active_index");
        assert_eq!(body["answer"], "No PDF uploaded yet. Please upload a PDF first.");
        assert_eq!(body["error"], body["answer"]);
        assert_eq!(body["history"], json!([]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_then_ask_returns_answers_and_history() {
        let state = state();
        let upload = upload_document(&state, "faq.pdf", FAQ.as_bytes().to_vec()).await;
        let upload = serde_json::to_value(upload).unwrap();
        assert_eq!(upload["message"], UPLOAD_SUCCESS);
        assert_eq!(upload["pairs"], 2);
        assert!(upload.get("error").is_none());

        ask(&state, "What is 2+2?").await;
        let body = ask(&state, "sky color").await;

        assert_eq!(body["answer"], "Blue");
        assert!(body.get("error").is_none());
        assert_eq!(
            body["history"],
            json!([["What is 2+2?", "4"], ["sky color", "Blue"]])
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_pdf_upload_is_a_structured_error() {
        let state = state();
        let upload = upload_document(&state, "faq.txt", FAQ.as_bytes().to_vec()).await;
        let upload = serde_json::to_value(upload).unwrap();

        assert_eq!(upload["error"], "Only PDF files are supported.");
        assert_eq!(upload["error_type"], "invalid_file_type");
        assert!(upload.get("message").is_none());

        let body = ask(&state, "What is 2+2?").await;
        assert_eq!(body["error_type"], "no_active_index");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_clears_history_but_keeps_document() {
        let state = state();
        upload_document(&state, "faq.pdf", FAQ.as_bytes().to_vec()).await;
        ask(&state, "What is 2+2?").await;

        let Json(reset) = reset_handler(State(state.clone())).await;
        assert_eq!(reset.message, RESET_SUCCESS);

        let Json(health) = healthz(State(state.clone())).await;
        assert_eq!(health.state, "ready");
        assert_eq!(health.history_len, 0);
        assert_eq!(health.pairs, Some(2));

        let body = ask(&state, "sky color").await;
        assert_eq!(body["answer"], "Blue");
        assert_eq!(body["history"], json!([["sky color", "Blue"]]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_reports_empty_session() {
        let Json(health) = healthz(State(state())).await;
        assert_eq!(health.state, "no_index");
        assert!(health.document_id.is_none());
        assert_eq!(health.embedding_model, "char-trigram-hash");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_field_wins_over_earlier_attachments() {
        let app = router(state(), 1024 * 1024);
        let body = post_upload(
            app,
            &[
                ("note", None, "just a form value"),
                ("attachment", Some("notes.txt"), "not a pdf"),
                ("file", Some("faq.pdf"), FAQ),
            ],
        )
        .await;

        assert_eq!(body["message"], UPLOAD_SUCCESS);
        assert_eq!(body["file_name"], "faq.pdf");
        assert_eq!(body["pairs"], 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_named_file_is_used_without_a_file_field() {
        let app = router(state(), 1024 * 1024);
        let body = post_upload(
            app,
            &[
                ("note", None, "just a form value"),
                ("document", Some("faq.pdf"), FAQ),
                ("appendix", Some("appendix.txt"), "ignored"),
            ],
        )
        .await;

        assert_eq!(body["file_name"], "faq.pdf");
        assert_eq!(body["pairs"], 2);
        assert!(body.get("error").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn form_without_any_file_is_rejected() {
        let state = state();
        let body = post_upload(
            router(state.clone(), 1024 * 1024),
            &[("question", None, "What is 2+2?")],
        )
        .await;

        assert_eq!(body["error_type"], "invalid_file_type");
        assert_eq!(body["error"], "Only PDF files are supported.");

        let Json(health) = healthz(State(state)).await;
        assert_eq!(health.state, "no_index");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn body_over_the_limit_is_reported_as_too_large() {
        let state = state_with(ServiceOptions {
            max_upload_bytes: 64,
            ..ServiceOptions::default()
        });
        let large = FAQ.repeat(32);
        let body = post_upload(
            router(state.clone(), 256),
            &[("file", Some("faq.pdf"), large.as_str())],
        )
        .await;

        assert_eq!(body["error_type"], "upload_too_large");
        assert_eq!(body["error"], "Uploaded file exceeds the 64 byte limit.");

        let Json(health) = healthz(State(state)).await;
        assert_eq!(health.state, "no_index");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_over_the_upload_limit_within_the_body_limit_is_too_large() {
        let state = state_with(ServiceOptions {
            max_upload_bytes: 16,
            ..ServiceOptions::default()
        });
        let body = post_upload(
            router(state, 1024 * 1024),
            &[("file", Some("faq.pdf"), FAQ)],
        )
        .await;

        assert_eq!(body["error_type"], "upload_too_large");
    }
}
