//! Picks a response for a question from its wording and the best matching chunk.

const FEATURE_KEYWORDS: [&str; 3] = ["feature", "capability", "function"];
const BENEFIT_KEYWORDS: [&str; 3] = ["benefit", "advantage", "help"];
const PROCESS_KEYWORDS: [&str; 3] = ["how", "work", "process"];
const DESCRIBE_KEYWORDS: [&str; 3] = ["what", "describe", "explain"];

const FEATURES_ANSWER: &str = "Key features include: document upload and processing, \
paragraph-aware text chunking, natural language question answering, and keyword-based \
retrieval of the most relevant passages.";

const BENEFITS_ANSWER: &str = "The main benefits are: less time spent searching through \
documents, instant answers to questions, a better understanding of document content, and \
higher productivity.";

const PROCESS_ANSWER: &str = "The platform works by storing your document, splitting it into \
paragraph-sized chunks, and matching the keywords of your question against those chunks to \
find the most relevant passage.";

/// Minimum trimmed length for a sentence to be worth quoting
const MIN_SENTENCE_CHARS: usize = 20;

/// Longest excerpt returned when no question category applies
pub const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Features,
    Benefits,
    Process,
    Describe,
    Other,
}

impl QuestionKind {
    /// First category, in priority order, with a keyword contained in the question
    pub fn classify(question: &str) -> Self {
        let question = question.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| question.contains(k));

        if mentions(&FEATURE_KEYWORDS) {
            Self::Features
        } else if mentions(&BENEFIT_KEYWORDS) {
            Self::Benefits
        } else if mentions(&PROCESS_KEYWORDS) {
            Self::Process
        } else if mentions(&DESCRIBE_KEYWORDS) {
            Self::Describe
        } else {
            Self::Other
        }
    }
}

pub fn synthesize(question: &str, best_content: &str) -> String {
    match QuestionKind::classify(question) {
        QuestionKind::Features => FEATURES_ANSWER.to_string(),
        QuestionKind::Benefits => BENEFITS_ANSWER.to_string(),
        QuestionKind::Process => PROCESS_ANSWER.to_string(),
        QuestionKind::Describe => {
            first_sentence(best_content).unwrap_or_else(|| excerpt(best_content, EXCERPT_CHARS))
        }
        QuestionKind::Other => excerpt(best_content, EXCERPT_CHARS),
    }
}

/// First `.`-delimited sentence longer than 20 characters, re-terminated with a period
pub fn first_sentence(text: &str) -> Option<String> {
    text.split('.')
        .map(str::trim)
        .find(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(|s| format!("{s}."))
}

/// Truncate to `max_chars` characters, marking the cut with "..."
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
