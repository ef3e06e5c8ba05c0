//! `OpenAI` chat completions provider

use super::types::{LlmRequest, LlmResponse, Message, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat models the assistant knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIModel {
    GPT4o,
    GPT4oMini,
    GPT41Mini,
    GPT35Turbo,
}

impl OpenAIModel {
    pub fn api_name(self) -> &'static str {
        match self {
            OpenAIModel::GPT4o => "gpt-4o",
            OpenAIModel::GPT4oMini => "gpt-4o-mini",
            OpenAIModel::GPT41Mini => "gpt-4.1-mini",
            OpenAIModel::GPT35Turbo => "gpt-3.5-turbo",
        }
    }

    /// Look a model up by its API name
    pub fn from_api_name(name: &str) -> Option<Self> {
        [
            OpenAIModel::GPT4o,
            OpenAIModel::GPT4oMini,
            OpenAIModel::GPT41Mini,
            OpenAIModel::GPT35Turbo,
        ]
        .into_iter()
        .find(|m| m.api_name() == name)
    }
}

/// `OpenAI` chat completions client
pub struct OpenAIService {
    client: Client,
    api_key: String,
    model: OpenAIModel,
    endpoint: String,
}

impl OpenAIService {
    pub fn new(
        api_key: String,
        model: OpenAIModel,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        let endpoint = format!(
            "{}/chat/completions",
            base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/')
        );

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            endpoint,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.api_name().to_string(),
            messages: request.messages.iter().map(OpenAIMessage::from).collect(),
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
        })
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let openai_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map_or(body, |error_resp| error_resp.error.message);
            let error = LlmError::from_status(status.as_u16(), &message);
            return Err(match retry_after {
                Some(delay) => error.with_retry_after(delay),
                None => error,
            });
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(openai_response)
    }

    fn model_id(&self) -> &str {
        self.model.api_name()
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<&Message> for OpenAIMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
