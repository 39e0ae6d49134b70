use std::sync::Arc;

use tracing::info;

use crate::agent::{NOT_ANSWERABLE, QueryAgent};
use crate::errors::AppError;
use crate::models::QueryRequest;

const MAX_QUERY_LENGTH: usize = 8000;

/// Sent instead of the model's bare `N/A`.
pub const NOT_ANSWERABLE_REPLY: &str =
    "I cannot answer that question. Please ask a different question.";

#[derive(Clone)]
pub struct QueryService {
    agent: Arc<dyn QueryAgent>,
    chunk_size: usize,
}

impl QueryService {
    pub fn new(agent: Arc<dyn QueryAgent>, chunk_size: usize) -> Self {
        Self { agent, chunk_size }
    }

    /// Validates the query, collects the full answer, and returns it split
    /// into body chunks.
    pub async fn answer(&self, request: QueryRequest) -> Result<Vec<String>, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AppError::EmptyField { field_name: "query".to_string() });
        }
        if query.len() > MAX_QUERY_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "query".to_string(),
                max_length: MAX_QUERY_LENGTH,
                actual_length: query.len(),
            });
        }

        // ── Ask the agent ─────────────────────────────────────────────────────
        let answer = self.agent.answer(query).await?;
        let answer = if answer.trim().eq_ignore_ascii_case(NOT_ANSWERABLE) {
            info!("Agent could not answer the query");
            NOT_ANSWERABLE_REPLY.to_string()
        } else {
            answer
        };

        info!("Answer ready ({} chars)", answer.chars().count());
        Ok(chunk_answer(&answer, self.chunk_size))
    }
}

/// Splits `answer` into pieces of at most `chunk_size` characters, never
/// inside a character. Concatenating the pieces gives back `answer`.
pub fn chunk_answer(answer: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = answer.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}
