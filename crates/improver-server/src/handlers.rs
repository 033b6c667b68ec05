//! HTTP request handlers for the Protocol Improver API.
//!
//! Implements upload, analysis, revision, download, stats and health
//! endpoints using axum.

use crate::storage::{client_basename, FileStorage};
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use improver_analyzer::{AnalysisMetadata, AnalyzerError, ImproveOutcome, ProtocolAnalyzer};
use improver_domain::{AnalysisId, DocumentFormat, ExtractedDocument, Suggestion};
use improver_llm::SharedProvider;
use improver_store::InMemoryStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Analyzer as wired into the server
pub type Analyzer = ProtocolAnalyzer<SharedProvider, InMemoryStore>;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const ANALYSIS_NOT_FOUND: &str = "Analysis not found. Please analyze the protocol again.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Review pipeline and analysis cache
    pub analyzer: Arc<Analyzer>,
    /// Upload and output directories
    pub storage: Arc<FileStorage>,
    /// Largest accepted upload in bytes
    pub max_file_size_bytes: usize,
    /// Characters of extracted text in an upload preview
    pub preview_chars: usize,
}

/// Service banner
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    /// Greeting
    pub message: String,
    /// Crate version
    pub version: String,
    /// Always "healthy" when the server answers
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// "ok" or "failed"
    pub api_connection: String,
    /// Local time of the check, RFC 3339
    pub timestamp: String,
}

/// What the extractor reported about an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// "pdf" or "docx"
    pub file_type: String,
    /// Page count, PDFs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    /// Non-empty paragraph count, DOCX only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<usize>,
    /// Extraction backend
    pub extraction_method: String,
    /// Document title, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document author, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl From<&ExtractedDocument> for DocumentMetadata {
    fn from(doc: &ExtractedDocument) -> Self {
        let (pages, paragraphs) = match doc.format {
            DocumentFormat::Pdf => (Some(doc.unit_count), None),
            DocumentFormat::Docx => (None, Some(doc.unit_count)),
        };
        Self {
            file_type: doc.format.as_str().to_string(),
            pages,
            paragraphs,
            extraction_method: doc.extraction_method.clone(),
            title: doc.title.clone(),
            author: doc.author.clone(),
        }
    }
}

/// Upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always true
    pub success: bool,
    /// Name the upload was stored under
    pub filename: String,
    /// Name the client sent
    pub original_filename: String,
    /// Upload size in bytes
    pub file_size: usize,
    /// Extracted text length in characters
    pub text_length: usize,
    /// Start of the extracted text
    pub preview: String,
    /// Extractor report
    pub metadata: DocumentMetadata,
    /// Human-readable outcome
    pub message: String,
}

/// Analysis response
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Always true
    pub success: bool,
    /// Key for `/api/improve`
    pub analysis_id: String,
    /// Name the client sent
    pub filename: String,
    /// Model's overview
    pub summary: String,
    /// Model's score
    pub overall_score: String,
    /// Number of issues reported
    pub total_issues: usize,
    /// Suggestions, HIGH priority first
    pub suggestions: Vec<Suggestion>,
    /// Call bookkeeping
    pub metadata: AnalysisMetadata,
}

/// Revision request
#[derive(Debug, Deserialize)]
pub struct ImproveRequest {
    /// Key returned by `/api/analyze`
    #[serde(default)]
    pub analysis_id: Option<String>,
    /// Positions in the returned suggestion list
    #[serde(default)]
    pub accepted_indices: Vec<i64>,
}

/// Revision response
#[derive(Debug, Serialize, Deserialize)]
pub struct ImproveResponse {
    /// Always true
    pub success: bool,
    /// Revised text, or the original when nothing was accepted
    pub improved_protocol: String,
    /// Saved file, present only when the protocol was revised
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
    /// Number of suggestions sent to the model
    pub suggestions_applied: usize,
    /// Human-readable outcome
    pub message: String,
}

/// Usage statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Files in the upload directory
    pub total_uploads: usize,
    /// Cached analyses
    pub total_analyses: usize,
    /// Files in the output directory
    pub total_improved: usize,
    /// Cached analyses
    pub cache_size: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Upload extension outside the accepted set
    UnsupportedFormat,
    /// Upload above the size ceiling (megabytes)
    FileTooLarge(usize),
    /// Malformed request
    BadRequest(String),
    /// Upload could not be turned into text
    ExtractionFailed(String),
    /// Model provider failed
    ModelCallFailed(String),
    /// Model provider did not answer in time
    Timeout(String),
    /// Model output could not be decoded
    ResponseMalformed(String),
    /// Unknown analysis id
    AnalysisNotFound,
    /// Unknown file
    NotFound(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::UnsupportedFormat => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Invalid file type. Allowed: {}",
                    DocumentFormat::ALLOWED_EXTENSIONS.join(", ")
                ),
            ),
            AppError::FileTooLarge(mb) => (
                StatusCode::BAD_REQUEST,
                format!("File too large. Maximum size: {}MB", mb),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ExtractionFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Error processing file: {}", msg),
            ),
            AppError::ModelCallFailed(msg)
            | AppError::Timeout(msg)
            | AppError::ResponseMalformed(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::AnalysisNotFound => (StatusCode::NOT_FOUND, ANALYSIS_NOT_FOUND.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = %status, error = %message, "Request failed");
        } else {
            warn!(status = %status, error = %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<AnalyzerError> for AppError {
    fn from(e: AnalyzerError) -> Self {
        match e {
            AnalyzerError::UnsupportedFormat(_) => AppError::UnsupportedFormat,
            AnalyzerError::ExtractionFailed(msg) => AppError::ExtractionFailed(msg),
            e @ AnalyzerError::ModelCallFailed(_) => AppError::ModelCallFailed(e.to_string()),
            e @ AnalyzerError::Timeout(_) => AppError::Timeout(e.to_string()),
            e @ AnalyzerError::ResponseMalformed(_) => AppError::ResponseMalformed(e.to_string()),
            AnalyzerError::AnalysisNotFound(_) => AppError::AnalysisNotFound,
            e @ AnalyzerError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// A saved, successfully extracted upload
struct ReceivedUpload {
    original_filename: String,
    stored_filename: String,
    file_size: usize,
    document: ExtractedDocument,
}

/// Read the `file` field, validate it, save it and extract its text
///
/// The saved file is removed again when extraction fails.
async fn receive_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ReceivedUpload, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let max_mb = state.max_file_size_bytes / (1024 * 1024);

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, max_mb))? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(|name| client_basename(name).to_string())
            .unwrap_or_default();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_mb))?;
        upload = Some((filename, bytes));
        break;
    }

    let (original_filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    if original_filename.is_empty() {
        return Err(AppError::BadRequest("Uploaded file has no name".to_string()));
    }

    improver_ingest::detect_format(&original_filename).map_err(|_| AppError::UnsupportedFormat)?;
    if bytes.len() > state.max_file_size_bytes {
        return Err(AppError::FileTooLarge(max_mb));
    }

    let stored_filename = state
        .storage
        .save_upload(&original_filename, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to save upload: {}", e)))?;

    match state.analyzer.extract(bytes.to_vec(), &original_filename).await {
        Ok(document) => Ok(ReceivedUpload {
            original_filename,
            stored_filename,
            file_size: bytes.len(),
            document,
        }),
        Err(e) => {
            state.storage.remove_upload(&stored_filename).await;
            Err(e.into())
        }
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError, max_mb: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge(max_mb)
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// GET / - Service banner
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Protocol Improver API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "healthy".to_string(),
    })
}

/// GET /health - Model connection check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let api_working = state.analyzer.quick_check().await;

    Json(HealthCheckResponse {
        status: if api_working { "healthy" } else { "degraded" }.to_string(),
        api_connection: if api_working { "ok" } else { "failed" }.to_string(),
        timestamp: Local::now().to_rfc3339(),
    })
}

/// POST /api/upload - Save an upload and preview its text
async fn upload_protocol(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let upload = receive_upload(&state, multipart).await?;
    let text = &upload.document.text;

    info!(
        stored = %upload.stored_filename,
        size = upload.file_size,
        "Upload processed"
    );

    Ok(Json(UploadResponse {
        success: true,
        text_length: text.chars().count(),
        preview: improver_ingest::preview(text, state.preview_chars),
        metadata: DocumentMetadata::from(&upload.document),
        filename: upload.stored_filename,
        original_filename: upload.original_filename,
        file_size: upload.file_size,
        message: "File uploaded and processed successfully".to_string(),
    }))
}

/// POST /api/analyze - Upload, then review with the model
async fn analyze_protocol(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let upload = receive_upload(&state, multipart).await?;

    let report = match state
        .analyzer
        .analyze_text(
            upload.document.text,
            &upload.original_filename,
            &upload.stored_filename,
        )
        .await
    {
        Ok(report) => report,
        Err(e) => {
            state.storage.remove_upload(&upload.stored_filename).await;
            return Err(e.into());
        }
    };

    Ok(Json(AnalyzeResponse {
        success: true,
        analysis_id: report.analysis_id.to_string(),
        filename: report.filename,
        summary: report.result.summary,
        overall_score: report.result.overall_score,
        total_issues: report.result.total_issues,
        suggestions: report.result.suggestions,
        metadata: report.metadata,
    }))
}

/// POST /api/improve - Rewrite a cached protocol with accepted suggestions
async fn improve_protocol(
    State(state): State<AppState>,
    request: Result<Json<ImproveRequest>, JsonRejection>,
) -> Result<Json<ImproveResponse>, AppError> {
    let Json(request) = request.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let analysis_id = request
        .analysis_id
        .filter(|id| !id.is_empty())
        .map(AnalysisId::from)
        .ok_or_else(|| AppError::BadRequest("analysis_id is required".to_string()))?;

    let outcome = state
        .analyzer
        .improve(&analysis_id, &request.accepted_indices)
        .await?;

    match outcome {
        ImproveOutcome::Unchanged { text } => Ok(Json(ImproveResponse {
            success: true,
            improved_protocol: text,
            output_filename: None,
            suggestions_applied: 0,
            message: "No suggestions accepted, returning original protocol".to_string(),
        })),
        ImproveOutcome::Revised {
            text,
            suggestions_applied,
            source_filename,
        } => {
            let output_filename = state
                .storage
                .save_output(&source_filename, &text)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to save improved protocol: {}", e)))?;

            info!(
                analysis_id = %analysis_id,
                applied = suggestions_applied,
                output = %output_filename,
                "Protocol improved"
            );

            Ok(Json(ImproveResponse {
                success: true,
                improved_protocol: text,
                output_filename: Some(output_filename),
                suggestions_applied,
                message: "Protocol improved successfully".to_string(),
            }))
        }
    }
}

/// GET /api/download/:filename - Fetch an improved protocol
async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .storage
        .output_path(&filename)
        .ok_or_else(|| AppError::BadRequest("Invalid filename".to_string()))?;

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to read file: {}", e))),
    };

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, contents).into_response())
}

/// GET /api/stats - Usage statistics
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let io_error = |e: std::io::Error| AppError::Internal(format!("Failed to read directory: {}", e));

    let cached = state.analyzer.cached_analyses()?;
    Ok(Json(StatsResponse {
        total_uploads: state.storage.count_uploads().await.map_err(io_error)?,
        total_analyses: cached,
        total_improved: state.storage.count_outputs().await.map_err(io_error)?,
        cache_size: cached,
    }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state
        .max_file_size_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/upload", post(upload_protocol))
        .route("/api/analyze", post(analyze_protocol))
        .route("/api/improve", post(improve_protocol))
        .route("/api/download/:filename", get(download_file))
        .route("/api/stats", get(get_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
