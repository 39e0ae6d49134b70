use async_trait::async_trait;
use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::error;

use crate::errors::AppError;

/// Literal the model is told to reply with when it cannot answer.
pub const NOT_ANSWERABLE: &str = "N/A";

const PREAMBLE: &str = "You are an e-commerce data assistant answering questions about sales, \
                        ad spend and product eligibility. \
                        Be concise and accurate, and reply in plain text without markdown. \
                        If the question cannot be answered, reply with exactly N/A.";

/// Produces a complete answer for a single query.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String, AppError>;
}

/// Answers queries with a local Ollama model through the rig [`ollama::Client`].
/// Each query is a fresh, history-free chat turn.
#[derive(Clone)]
pub struct OllamaAgentService {
    client: ollama::Client,
    base_url: String,
    model: String,
}

impl OllamaAgentService {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AppError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| AppError::InferenceError {
                message: format!("Failed to build Ollama client: {e:?}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    fn classify_failure(&self, message: String) -> AppError {
        if message.contains("Connection refused") || message.contains("connect") {
            AppError::OllamaUnavailable { host: self.base_url.clone() }
        } else if message.contains("model") {
            AppError::ModelNotFound { model_name: self.model.clone() }
        } else {
            AppError::InferenceError { message }
        }
    }
}

#[async_trait]
impl QueryAgent for OllamaAgentService {
    async fn answer(&self, query: &str) -> Result<String, AppError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(PREAMBLE)
            .build();

        agent
            .chat(query, Vec::<RigMessage>::new())
            .await
            .map_err(|e| {
                error!("Ollama inference failed: {e}");
                self.classify_failure(e.to_string())
            })
    }
}
