pub mod answer;
pub mod processor;
pub mod scorer;

pub use answer::QuestionKind;
pub use processor::{DocumentProcessor, DocumentStats, ProcessingOutcome, QuestionAnswer};
pub use scorer::{Ranking, ScoredChunk, Source};
