//! General tool - answers anything the other tools don't claim

use super::{Tool, ToolError, ToolReply, ToolRole};
use crate::llm::{LlmRequest, LlmService, Message};
use async_trait::async_trait;
use std::sync::Arc;

/// Spoken answers are short, keep the model from rambling
const MAX_ANSWER_TOKENS: u32 = 400;

/// Answers with the model using the whole conversation as context
pub struct GeneralTool {
    llm: Arc<dyn LlmService>,
}

impl GeneralTool {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for GeneralTool {
    fn name(&self) -> &'static str {
        "GENERAL"
    }

    fn description(&self) -> String {
        "For general questions, conversation, and anything no other tool handles".to_string()
    }

    fn role(&self) -> ToolRole {
        ToolRole::General
    }

    async fn process_request(&self, history: &[Message]) -> Result<ToolReply, ToolError> {
        let request = LlmRequest::new(history.to_vec()).with_max_tokens(MAX_ANSWER_TOKENS);
        let response = self.llm.complete(&request).await?;
        Ok(ToolReply::Speech(response.text.trim().to_string()))
    }
}
