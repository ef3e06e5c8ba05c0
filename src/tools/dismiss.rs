//! Dismiss tool - ends the conversation

use super::{Tool, ToolError, ToolReply, ToolRole};
use crate::llm::Message;
use async_trait::async_trait;

/// Terminator selected when the user is done talking
pub struct DismissTool;

#[async_trait]
impl Tool for DismissTool {
    fn name(&self) -> &'static str {
        "END"
    }

    fn description(&self) -> String {
        "For requests to end the conversation, or general statements of dismissal like 'thanks' or 'that will do'.".to_string()
    }

    fn role(&self) -> ToolRole {
        ToolRole::Terminator
    }

    async fn process_request(&self, _history: &[Message]) -> Result<ToolReply, ToolError> {
        Ok(ToolReply::EndConversation)
    }
}
