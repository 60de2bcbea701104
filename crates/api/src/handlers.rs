use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Multipart, Path, State},
    Json,
};
use ingest::{storage::sanitize_file_name, DocumentType};
use query::{ProcessingOutcome, QuestionAnswer};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use store::{Document, NewDocument, ProcessingStatus};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics::{MetricsSnapshot, TimedOperation};
use crate::request::QuestionRequest;
use crate::AppState;

const DOCUMENT_NOT_FOUND: &str = "Document not found";

/// A document as listed to clients
#[derive(Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    document: Document,
    file_size_display: String,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        let file_size_display = document.file_size_display();
        Self {
            document,
            file_size_display,
        }
    }
}

#[derive(Serialize)]
pub struct UploadResponse {
    status: &'static str,
    message: &'static str,
    document_id: i64,
    processing_result: ProcessingOutcome,
}

#[derive(Serialize)]
pub struct AskResponse {
    status: &'static str,
    document_title: String,
    document_id: i64,
    question: String,
    #[serde(flatten)]
    result: QuestionAnswer,
}

fn document_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::BadRequest("Invalid document id".to_string()))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "success", "message": "API is running" }))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let documents: Vec<DocumentView> = state
        .store
        .list_documents()?
        .into_iter()
        .map(DocumentView::from)
        .collect();

    Ok(Json(json!({
        "status": "success",
        "total": documents.len(),
        "documents": documents,
    })))
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue; // ignore unknown fields
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let stored_path = state.files.save(&file_name, &bytes).await?;
    let file_name_path = std::path::Path::new(&file_name);
    let title = file_name_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.clone());

    let document = state.store.create_document(&NewDocument {
        title,
        file_path: stored_path.to_string_lossy().to_string(),
        document_type: DocumentType::from_path(file_name_path),
        file_size: bytes.len() as i64,
    })?;
    info!(document_id = document.id, file = %file_name, size = bytes.len(), "Document uploaded");

    let timer = TimedOperation::start();
    let outcome = state
        .processor()
        .process_document(document.id, &stored_path)
        .await;
    let chunks = match &outcome {
        ProcessingOutcome::Success { chunks_created, .. } => Some(*chunks_created),
        ProcessingOutcome::Error { .. } => None,
    };
    state.metrics.record_processing(timer.elapsed(), chunks);

    Ok(Json(UploadResponse {
        status: "success",
        message: "Document uploaded successfully",
        document_id: document.id,
        processing_result: outcome,
    }))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = document_id(path)?;
    let stats = state
        .processor()
        .document_stats(id)?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    Ok(Json(json!({ "status": "success", "document": stats })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = document_id(path)?;
    let document = state
        .store
        .delete_document(id)?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    if let Err(e) = state.files.remove(std::path::Path::new(&document.file_path)).await {
        warn!(document_id = id, error = %e, "Failed to remove stored file");
    }
    info!(document_id = id, "Document deleted");

    Ok(Json(json!({ "status": "success", "message": "Document deleted" })))
}

pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = document_id(path)?;
    let history = state
        .processor()
        .chat_history(id)?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "document_id": id,
        "chat_history": history,
    })))
}

pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("Invalid JSON data".to_string()))?;
    let request =
        QuestionRequest::validate(&body, &state.config.query).map_err(ApiError::Validation)?;

    let document = state
        .store
        .get_document(request.document_id)?
        .ok_or_else(|| ApiError::NotFound(DOCUMENT_NOT_FOUND.to_string()))?;

    if document.processing_status != ProcessingStatus::Completed {
        return Err(ApiError::BadRequest(format!(
            "Document is not ready. Status: {}",
            document.processing_status
        )));
    }

    let timer = TimedOperation::start();
    let result = state
        .processor()
        .ask_question(document.id, &request.question, request.num_chunks)?;
    state.metrics.record_question(timer.elapsed());

    Ok(Json(AskResponse {
        status: "success",
        document_title: document.title,
        document_id: document.id,
        question: request.question,
        result,
    }))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
