use crate::chunk::Chunk;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

pub struct ChunkerConfig {
    /// Character budget per chunk. Only a single oversized paragraph may exceed it.
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 300 }
    }
}

/// A trimmed paragraph and its [start, end) character span in the source text.
struct Paragraph<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let separator_len = PARAGRAPH_SEPARATOR.chars().count();
        let mut chunks = Vec::new();

        let mut buffer = String::new();
        let mut buffer_chars = 0;
        let mut buffer_start = 0;
        let mut buffer_end = 0;

        for para in self.split_by_paragraphs(text) {
            let para_chars = para.text.chars().count();

            // If adding this paragraph exceeds the budget, flush buffer
            if !buffer.is_empty() && buffer_chars + separator_len + para_chars > self.config.max_chars {
                chunks.push(Chunk::new(
                    chunks.len(),
                    std::mem::take(&mut buffer),
                    (buffer_start, buffer_end),
                ));
                buffer_chars = 0;
            }

            if buffer.is_empty() {
                buffer_start = para.start;
            } else {
                buffer.push_str(PARAGRAPH_SEPARATOR);
                buffer_chars += separator_len;
            }
            buffer.push_str(para.text);
            buffer_chars += para_chars;
            buffer_end = para.end;
        }

        // Flush remaining buffer
        if !buffer.is_empty() {
            chunks.push(Chunk::new(chunks.len(), buffer, (buffer_start, buffer_end)));
        }

        chunks
    }

    fn split_by_paragraphs<'a>(&self, text: &'a str) -> Vec<Paragraph<'a>> {
        let mut paragraphs = Vec::new();

        // Byte cursor into `text` and the matching character position
        let mut byte_pos = 0;
        let mut char_pos = 0;
        let mut piece_start = 0;

        for piece in text.split(PARAGRAPH_SEPARATOR) {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                let start_byte = piece_start + (piece.len() - piece.trim_start().len());
                char_pos += text[byte_pos..start_byte].chars().count();
                byte_pos = start_byte;

                let start = char_pos;
                let end = start + trimmed.chars().count();
                char_pos = end;
                byte_pos += trimmed.len();

                paragraphs.push(Paragraph {
                    text: trimmed,
                    start,
                    end,
                });
            }
            piece_start += piece.len() + PARAGRAPH_SEPARATOR.len();
        }

        paragraphs
    }
}
