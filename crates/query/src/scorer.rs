use serde::{Deserialize, Serialize};
use store::StoredChunk;

use crate::answer::{excerpt, EXCERPT_CHARS};

/// Used when a document has no chunks at all
pub const NO_CONTENT_PLACEHOLDER: &str = "No document content available.";

const MAX_CONFIDENCE: f64 = 0.9;

/// Question words of this many characters or fewer are ignored
const MIN_KEYWORD_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// `None` only for the placeholder
    pub chunk_index: Option<i64>,
    pub content: String,
    pub score: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub chunk_id: Option<i64>,
    pub content: String,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct Ranking {
    /// Best first, never empty
    pub chunks: Vec<ScoredChunk>,
    pub confidence: f64,
    /// True when nothing matched and the first chunk (or placeholder) was used
    pub fallback: bool,
}

impl Ranking {
    pub fn best(&self) -> &ScoredChunk {
        &self.chunks[0]
    }

    pub fn chunk_indexes(&self) -> Vec<i64> {
        self.chunks.iter().filter_map(|c| c.chunk_index).collect()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.chunks
            .iter()
            .map(|c| Source {
                chunk_id: c.chunk_index,
                content: excerpt(&c.content, EXCERPT_CHARS),
                similarity: (c.score as f64 / 10.0).min(MAX_CONFIDENCE),
            })
            .collect()
    }
}

/// Lower-cased question words longer than two characters, duplicates kept
pub fn keywords(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS)
        .map(str::to_string)
        .collect()
}

/// Sum of non-overlapping occurrence counts of each keyword in `text`
pub fn score_text(keywords: &[String], text: &str) -> usize {
    let text = text.to_lowercase();
    keywords.iter().map(|k| text.matches(k.as_str()).count()).sum()
}

/// `min(0.9, best_score / max(1, number of question words))`
pub fn confidence(best_score: usize, question: &str) -> f64 {
    let words = question.split_whitespace().count().max(1);
    (best_score as f64 / words as f64).min(MAX_CONFIDENCE)
}

/// Rank `chunks` (given in index order) against `question` and keep the top `top_n`.
pub fn rank(question: &str, chunks: &[StoredChunk], top_n: usize) -> Ranking {
    let keywords = keywords(question);

    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .filter_map(|chunk| {
            let score = score_text(&keywords, &chunk.chunk_text);
            (score > 0).then(|| ScoredChunk {
                chunk_index: Some(chunk.chunk_index),
                content: chunk.chunk_text.clone(),
                score,
            })
        })
        .collect();

    // Stable sort keeps index order between equal scores
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(top_n.max(1));

    let fallback = scored.is_empty();
    if fallback {
        scored.push(match chunks.first() {
            Some(first) => ScoredChunk {
                chunk_index: Some(first.chunk_index),
                content: first.chunk_text.clone(),
                score: 1,
            },
            None => ScoredChunk {
                chunk_index: None,
                content: NO_CONTENT_PLACEHOLDER.to_string(),
                score: 0,
            },
        });
    }

    let confidence = confidence(scored[0].score, question);
    Ranking {
        chunks: scored,
        confidence,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(texts: &[&str]) -> Vec<StoredChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| StoredChunk {
                id: i as i64 + 1,
                document_id: 1,
                chunk_index: i as i64,
                chunk_text: t.to_string(),
                page_number: 1,
                start_char: 0,
                end_char: t.len() as i64,
                token_count: t.split_whitespace().count() as i64,
                embedding_id: Some(format!("1_{i}")),
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_keywords_drop_short_words() {
        assert_eq!(keywords("Is it a Cat or the DOG?"), vec!["cat", "the", "dog?"]);
    }

    #[test]
    fn test_score_counts_substrings_and_duplicates() {
        let kws = keywords("cat cat");
        assert_eq!(score_text(&kws, "Cats and a cat."), 4);
        assert_eq!(score_text(&keywords("aaa"), "aaaaaa"), 2);
    }

    #[test]
    fn test_rank_orders_by_score_stably() {
        let chunks = stored(&["apple", "banana banana", "apple again", "nothing"]);
        let ranking = rank("apple banana", &chunks, 3);

        assert!(!ranking.fallback);
        let order: Vec<_> = ranking.chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(order, vec![Some(1), Some(0), Some(2)]);
        assert_eq!(ranking.best().score, 2);
        assert_eq!(ranking.chunk_indexes(), vec![1, 0, 2]);
    }

    #[test]
    fn test_rank_keeps_top_n() {
        let chunks = stored(&["apple", "apple", "apple", "apple"]);
        assert_eq!(rank("apple", &chunks, 2).chunks.len(), 2);
    }

    #[test]
    fn test_no_overlap_falls_back_to_first_chunk() {
        let chunks = stored(&["first chunk", "second chunk"]);
        let ranking = rank("zebra?", &chunks, 3);

        assert!(ranking.fallback);
        assert_eq!(ranking.chunks.len(), 1);
        assert_eq!(ranking.best().chunk_index, Some(0));
        assert_eq!(ranking.best().score, 1);
        assert_eq!(ranking.confidence, 0.9);
    }

    #[test]
    fn test_no_chunks_uses_placeholder() {
        let ranking = rank("anything at all", &[], 3);
        assert!(ranking.fallback);
        assert_eq!(ranking.best().content, NO_CONTENT_PLACEHOLDER);
        assert_eq!(ranking.confidence, 0.0);
        assert!(ranking.chunk_indexes().is_empty());
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(confidence(0, ""), 0.0);
        assert_eq!(confidence(50, "one two"), 0.9);
        assert_eq!(confidence(1, "one two three four"), 0.25);

        let chunks = stored(&["the the the the", "random text"]);
        for question in ["the", "what is the thing", "", "x y z"] {
            let c = rank(question, &chunks, 3).confidence;
            assert!((0.0..=0.9).contains(&c), "confidence {c} for {question:?}");
        }
    }

    #[test]
    fn test_sources_truncate_and_normalise() {
        let long = "keyword ".repeat(40);
        let chunks = stored(&[long.as_str()]);
        let sources = rank("keyword", &chunks, 1).sources();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_id, Some(0));
        assert!(sources[0].content.ends_with("..."));
        assert_eq!(sources[0].similarity, 0.9);
    }
}
