pub mod chunk;
pub mod chunker;
pub mod reader;
pub mod storage;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use reader::{DocumentType, FileReader};
pub use storage::FileStore;

use anyhow::Result;
use std::path::Path;

/// Read a stored document and split it into chunks
pub async fn ingest_file(file_path: &Path, chunker: &Chunker) -> Result<Vec<Chunk>> {
    let content = FileReader::read_file(file_path).await?;
    Ok(chunker.chunk_text(&content))
}
