use anyhow::{Context, Result};
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    file_path TEXT NOT NULL,
    document_type TEXT NOT NULL CHECK (document_type IN ('pdf', 'docx', 'doc', 'txt', 'md', 'other')),
    file_size INTEGER NOT NULL,
    pages_count INTEGER NOT NULL DEFAULT 1,
    processing_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (processing_status IN ('pending', 'processing', 'completed', 'failed')),
    uploaded_at TEXT NOT NULL,
    processed_at TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    page_number INTEGER NOT NULL DEFAULT 1,
    start_char INTEGER NOT NULL DEFAULT 0,
    end_char INTEGER NOT NULL DEFAULT 0,
    token_count INTEGER NOT NULL DEFAULT 0,
    embedding_id TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (document_id, chunk_index),
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS chat_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    confidence_score REAL NOT NULL DEFAULT 0.0,
    chunks_used TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_document_status ON documents (processing_status);
CREATE INDEX IF NOT EXISTS idx_document_type ON documents (document_type);
CREATE INDEX IF NOT EXISTS idx_chunk_document_page ON document_chunks (document_id, page_number);
CREATE INDEX IF NOT EXISTS idx_chat_document ON chat_history (document_id, created_at);
";

/// Enable foreign keys (needed for cascades) and create the tables.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .context("Failed to enable foreign keys")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to apply schema")?;
    Ok(())
}
