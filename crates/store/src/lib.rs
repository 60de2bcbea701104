pub mod models;
pub mod schema;

pub use models::{
    format_file_size, ChatRecord, Document, NewDocument, ProcessingStatus, StoredChunk,
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use ingest::{Chunk, DocumentType};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const DOCUMENT_COLUMNS: &str = "id, title, file_path, document_type, file_size, pages_count, \
     processing_status, uploaded_at, processed_at, updated_at";

const CHUNK_COLUMNS: &str = "id, document_id, chunk_index, chunk_text, page_number, start_char, \
     end_char, token_count, embedding_id, created_at";

const CHAT_COLUMNS: &str = "id, document_id, question, answer, confidence_score, chunks_used, created_at";

/// Relational store for documents, their chunks and chat history.
///
/// Cloning is cheap; all clones share one connection.
///
/// Every method is synchronous and holds the connection lock only for its own
/// statements. Async handlers call it inline on the runtime worker, which is
/// fine for single-row queries and small chunk batches. Bulk work should go
/// through `tokio::task::spawn_blocking` instead.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create database directory: {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .context(format!("Failed to open database: {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database connection lock poisoned"))
    }

    // ── Documents ──

    pub fn create_document(&self, new: &NewDocument) -> Result<Document> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO documents (title, file_path, document_type, file_size, processing_status, uploaded_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                new.title,
                new.file_path,
                new.document_type.as_str(),
                new.file_size,
                ProcessingStatus::Pending,
                now,
            ],
        )
        .context("Failed to insert document")?;

        let id = conn.last_insert_rowid();
        debug!(document_id = id, title = %new.title, "Created document");
        query_document(&conn, id)?.ok_or_else(|| anyhow!("Document {} vanished after insert", id))
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.conn()?;
        query_document(&conn, id)
    }

    /// All documents, newest upload first
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY uploaded_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], document_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list documents")
    }

    /// Move a document through its processing lifecycle.
    ///
    /// Terminal states stamp `processed_at`. Transitions outside the state
    /// machine are rejected.
    pub fn update_status(&self, id: i64, status: ProcessingStatus) -> Result<Document> {
        let conn = self.conn()?;
        let current = query_document(&conn, id)?
            .ok_or_else(|| anyhow!("Document not found: {}", id))?;

        if !current.processing_status.can_transition_to(status) {
            anyhow::bail!(
                "Invalid status transition for document {}: {} -> {}",
                id,
                current.processing_status,
                status
            );
        }

        let now = Utc::now();
        let processed_at = if status.is_terminal() {
            Some(now)
        } else {
            current.processed_at
        };

        conn.execute(
            "UPDATE documents SET processing_status = ?1, processed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![status, processed_at, now, id],
        )
        .context("Failed to update document status")?;

        debug!(document_id = id, from = %current.processing_status, to = %status, "Status changed");
        query_document(&conn, id)?.ok_or_else(|| anyhow!("Document not found: {}", id))
    }

    /// Delete a document; its chunks and chat history go with it.
    /// Returns the deleted document, or `None` if it did not exist.
    pub fn delete_document(&self, id: i64) -> Result<Option<Document>> {
        let conn = self.conn()?;
        let Some(document) = query_document(&conn, id)? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM documents WHERE id = ?1", params![id])
            .context("Failed to delete document")?;
        Ok(Some(document))
    }

    // ── Chunks ──

    /// Replace all chunks of a document in one transaction
    pub fn replace_chunks(&self, document_id: i64, chunks: &[Chunk]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM document_chunks WHERE document_id = ?1",
            params![document_id],
        )
        .context("Failed to delete old chunks")?;

        let now = Utc::now();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO document_chunks
                    (document_id, chunk_index, chunk_text, page_number, start_char, end_char, token_count, embedding_id, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    document_id,
                    chunk.index as i64,
                    chunk.text,
                    chunk.offset.0 as i64,
                    chunk.offset.1 as i64,
                    chunk.token_count() as i64,
                    chunk.external_id(document_id),
                    now,
                ])
                .context(format!("Failed to insert chunk {}", chunk.index))?;
            }
        }

        tx.commit().context("Failed to commit chunks")?;
        Ok(chunks.len())
    }

    /// Chunks of a document in index order
    pub fn list_chunks(&self, document_id: i64) -> Result<Vec<StoredChunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHUNK_COLUMNS} FROM document_chunks WHERE document_id = ?1 ORDER BY chunk_index ASC"
        ))?;
        let rows = stmt.query_map(params![document_id], chunk_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list chunks")
    }

    pub fn count_chunks(&self, document_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM document_chunks WHERE document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ── Chat history ──

    pub fn add_chat_record(
        &self,
        document_id: i64,
        question: &str,
        answer: &str,
        confidence_score: f64,
        chunks_used: &[i64],
    ) -> Result<ChatRecord> {
        let conn = self.conn()?;
        let chunks_json = serde_json::to_string(chunks_used)?;
        conn.execute(
            "INSERT INTO chat_history (document_id, question, answer, confidence_score, chunks_used, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![document_id, question, answer, confidence_score, chunks_json, Utc::now()],
        )
        .context("Failed to insert chat record")?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {CHAT_COLUMNS} FROM chat_history WHERE id = ?1"),
            params![id],
            chat_from_row,
        )
        .context("Failed to read back chat record")
    }

    /// Chat history of a document, newest first
    pub fn list_chat_records(&self, document_id: i64) -> Result<Vec<ChatRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHAT_COLUMNS} FROM chat_history WHERE document_id = ?1 ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![document_id], chat_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list chat history")
    }
}

fn query_document(conn: &Connection, id: i64) -> Result<Option<Document>> {
    conn.query_row(
        &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
        params![id],
        document_from_row,
    )
    .optional()
    .context("Failed to load document")
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let document_type: String = row.get(3)?;
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        file_path: row.get(2)?,
        document_type: DocumentType::parse(&document_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown document type: {document_type}").into(),
            )
        })?,
        file_size: row.get(4)?,
        pages_count: row.get(5)?,
        processing_status: row.get(6)?,
        uploaded_at: row.get(7)?,
        processed_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn chunk_from_row(row: &Row<'_>) -> rusqlite::Result<StoredChunk> {
    Ok(StoredChunk {
        id: row.get(0)?,
        document_id: row.get(1)?,
        chunk_index: row.get(2)?,
        chunk_text: row.get(3)?,
        page_number: row.get(4)?,
        start_char: row.get(5)?,
        end_char: row.get(6)?,
        token_count: row.get(7)?,
        embedding_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<ChatRecord> {
    let chunks_used: String = row.get(5)?;
    Ok(ChatRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        confidence_score: row.get(4)?,
        chunks_used: serde_json::from_str(&chunks_used).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
        })?,
        created_at: row.get(6)?,
    })
}
