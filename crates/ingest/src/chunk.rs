use serde::{Deserialize, Serialize};

/// A paragraph-aligned slice of a document, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub offset: (usize, usize), // [start, end) character positions in the source text
}

impl Chunk {
    pub fn new(index: usize, text: String, offset: (usize, usize)) -> Self {
        Self {
            index,
            text,
            offset,
        }
    }

    /// Whitespace-delimited word count
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Stable external id, unique per (document, index)
    pub fn external_id(&self, document_id: i64) -> String {
        format!("{}_{}", document_id, self.index)
    }
}
