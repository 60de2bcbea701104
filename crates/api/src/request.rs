use serde_json::Value;

use crate::config::QueryConfig;
use crate::error::FieldErrors;

/// Validated body of an ask request
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRequest {
    pub document_id: i64,
    pub question: String,
    pub num_chunks: usize,
}

impl QuestionRequest {
    /// Check every field and collect all problems, keyed by field name
    pub fn validate(body: &Value, limits: &QueryConfig) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut reject = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        let Some(body) = body.as_object() else {
            reject("non_field_errors", "Expected a JSON object.".to_string());
            return Err(errors);
        };

        let document_id = match body.get("document_id") {
            None | Some(Value::Null) => {
                reject("document_id", "This field is required.".to_string());
                None
            }
            Some(value) => {
                let id = value.as_i64();
                if id.is_none() {
                    reject("document_id", "A valid integer is required.".to_string());
                }
                id
            }
        };

        let question = match body.get("question") {
            None | Some(Value::Null) => {
                reject("question", "This field is required.".to_string());
                None
            }
            Some(Value::String(q)) if q.trim().is_empty() => {
                reject("question", "This field may not be blank.".to_string());
                None
            }
            Some(Value::String(q)) if q.trim().chars().count() > limits.max_question_chars => {
                reject(
                    "question",
                    format!(
                        "Ensure this field has no more than {} characters.",
                        limits.max_question_chars
                    ),
                );
                None
            }
            Some(Value::String(q)) => Some(q.trim().to_string()),
            Some(_) => {
                reject("question", "Not a valid string.".to_string());
                None
            }
        };

        let num_chunks = match body.get("num_chunks") {
            None | Some(Value::Null) => Some(limits.default_num_chunks),
            Some(value) => match value.as_i64() {
                Some(n) if n >= 1 && n as usize <= limits.max_num_chunks => Some(n as usize),
                Some(_) => {
                    reject(
                        "num_chunks",
                        format!("Ensure this value is between 1 and {}.", limits.max_num_chunks),
                    );
                    None
                }
                None => {
                    reject("num_chunks", "A valid integer is required.".to_string());
                    None
                }
            },
        };

        match (document_id, question, num_chunks) {
            (Some(document_id), Some(question), Some(num_chunks)) if errors.is_empty() => Ok(Self {
                document_id,
                question,
                num_chunks,
            }),
            _ => Err(errors),
        }
    }
}
