//! LLM gateway abstraction
//!
//! The assistant only ever asks the model for one completion over an ordered
//! list of messages. Everything that talks to a model goes through
//! [`LlmService`] so tests can swap in a scripted double.

mod error;
mod openai;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use openai::{OpenAIModel, OpenAIService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for text-completion providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Complete one request. The first message should be the system message.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    retry_after = ?e.retry_after,
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
