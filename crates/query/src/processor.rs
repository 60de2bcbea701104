use anyhow::Result;
use chrono::{DateTime, Utc};
use ingest::Chunker;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use store::{ChatRecord, ProcessingStatus, Store};
use tracing::{debug, info, warn};

use crate::answer;
use crate::scorer::{self, Source};

pub const NO_CONTENT_ANSWER: &str = "No content found for this document.";

/// Result of turning a stored upload into chunks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Success {
        chunks_created: usize,
        /// Seconds
        processing_time: f64,
    },
    Error {
        error: String,
    },
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub answer: String,
    pub confidence: f64,
    pub sources: Vec<Source>,
    /// Seconds
    pub response_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStats {
    pub document_id: i64,
    pub title: String,
    pub total_chunks: usize,
    pub processing_status: ProcessingStatus,
    pub file_size: i64,
    pub pages_count: i64,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Runs the upload and question pipelines for one request.
///
/// Built per request from shared handles; it holds no state of its own.
pub struct DocumentProcessor {
    store: Store,
    chunker: Chunker,
}

impl DocumentProcessor {
    pub fn new(store: Store, chunker: Chunker) -> Self {
        Self { store, chunker }
    }

    /// Chunk the file at `file_path` into the document's chunk set.
    ///
    /// Any failure leaves the document in `failed` state and is reported in
    /// the outcome rather than returned as an error.
    pub async fn process_document(&self, document_id: i64, file_path: &Path) -> ProcessingOutcome {
        let start = Instant::now();

        match self.chunk_and_store(document_id, file_path).await {
            Ok(chunks_created) => {
                let processing_time = start.elapsed().as_secs_f64();
                info!(document_id, chunks_created, processing_time, "Document processed");
                ProcessingOutcome::Success {
                    chunks_created,
                    processing_time,
                }
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(document_id, error = %error, "Document processing failed");
                if let Err(mark_err) = self.store.update_status(document_id, ProcessingStatus::Failed) {
                    warn!(document_id, error = %mark_err, "Could not mark document as failed");
                }
                ProcessingOutcome::Error { error }
            }
        }
    }

    async fn chunk_and_store(&self, document_id: i64, file_path: &Path) -> Result<usize> {
        self.store.update_status(document_id, ProcessingStatus::Processing)?;

        let chunks = ingest::ingest_file(file_path, &self.chunker).await?;
        debug!(document_id, chunks = chunks.len(), "Chunked document");

        let created = self.store.replace_chunks(document_id, &chunks)?;
        self.store.update_status(document_id, ProcessingStatus::Completed)?;
        Ok(created)
    }

    /// Answer `question` from the document's chunks and record the exchange.
    pub fn ask_question(&self, document_id: i64, question: &str, num_chunks: usize) -> Result<QuestionAnswer> {
        let start = Instant::now();

        let chunks = self.store.list_chunks(document_id)?;
        debug!(document_id, chunks = chunks.len(), "Loaded chunks for question");

        if chunks.is_empty() {
            return Ok(QuestionAnswer {
                answer: NO_CONTENT_ANSWER.to_string(),
                confidence: 0.0,
                sources: Vec::new(),
                response_time: start.elapsed().as_secs_f64(),
            });
        }

        let ranking = scorer::rank(question, &chunks, num_chunks);
        let answer = answer::synthesize(question, &ranking.best().content);

        self.store.add_chat_record(
            document_id,
            question,
            &answer,
            ranking.confidence,
            &ranking.chunk_indexes(),
        )?;

        let response_time = start.elapsed().as_secs_f64();
        info!(
            document_id,
            confidence = ranking.confidence,
            fallback = ranking.fallback,
            sources = ranking.chunks.len(),
            "Question answered"
        );

        Ok(QuestionAnswer {
            answer,
            confidence: ranking.confidence,
            sources: ranking.sources(),
            response_time,
        })
    }

    pub fn document_stats(&self, document_id: i64) -> Result<Option<DocumentStats>> {
        let Some(document) = self.store.get_document(document_id)? else {
            return Ok(None);
        };
        let total_chunks = self.store.count_chunks(document_id)?;

        Ok(Some(DocumentStats {
            document_id,
            title: document.title,
            total_chunks,
            processing_status: document.processing_status,
            file_size: document.file_size,
            pages_count: document.pages_count,
            uploaded_at: document.uploaded_at,
            processed_at: document.processed_at,
            updated_at: document.updated_at,
        }))
    }

    /// Chat history newest first, or `None` if the document does not exist
    pub fn chat_history(&self, document_id: i64) -> Result<Option<Vec<ChatRecord>>> {
        if self.store.get_document(document_id)?.is_none() {
            return Ok(None);
        }
        self.store.list_chat_records(document_id).map(Some)
    }
}
