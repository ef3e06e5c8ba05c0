//! Intent classification
//!
//! Asks the model which registered tool should handle a request and maps its
//! answer back onto the registry. The model only ever picks from the
//! registered names; anything else falls back to the general tool.

use crate::history::History;
use crate::llm::{LlmError, LlmRequest, LlmService, Message};
use crate::tools::{ToolId, ToolRegistry};
use std::fmt::Write;
use std::sync::Arc;

/// Recent messages sent along with the classification prompt.
/// Classification got worse with more context than this.
pub const DEFAULT_LOOKBACK: usize = 5;

/// Upper bound for a configured lookback
pub const MAX_LOOKBACK: usize = 20;

/// The answer is a single label
const MAX_LABEL_TOKENS: u32 = 20;

pub struct Classifier {
    llm: Arc<dyn LlmService>,
    lookback: usize,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            lookback: DEFAULT_LOOKBACK,
        }
    }

    /// Set the lookback window, clamped to `1..=MAX_LOOKBACK`
    #[must_use]
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback.clamp(1, MAX_LOOKBACK);
        self
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Pick the tool for `request`.
    ///
    /// `history` is read, never written: the classification exchange is not
    /// part of the conversation. Only a gateway failure is an error.
    pub async fn select_tool(
        &self,
        request: &str,
        history: &History,
        registry: &ToolRegistry,
    ) -> Result<ToolId, LlmError> {
        let llm_request = self.build_request(request, history, registry);
        let response = self.llm.complete(&llm_request).await?;

        let selected = match resolve_label(&response.text, registry) {
            Some(id) => id,
            None => {
                tracing::debug!(response = %response.text, "No tool named, using general tool");
                registry.general()
            }
        };

        tracing::info!(
            tool = %registry.get(selected).name(),
            response = %response.text.trim(),
            "Classified request"
        );
        Ok(selected)
    }

    fn build_request(&self, request: &str, history: &History, registry: &ToolRegistry) -> LlmRequest {
        let window = history.recent(self.lookback);
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(history.system().clone());
        messages.extend_from_slice(window);
        messages.push(Message::user(build_prompt(request, registry)));
        LlmRequest::new(messages).with_max_tokens(MAX_LABEL_TOKENS)
    }
}

/// Classification prompt listing every registered tool
pub fn build_prompt(request: &str, registry: &ToolRegistry) -> String {
    let mut tools = String::new();
    for (_, tool) in registry.iter() {
        let _ = writeln!(tools, "{}: {}", tool.name(), tool.description().trim());
    }

    format!(
        "Determine if any of the following tools, delimited by ```,\n\
         would help with the request following USER: below.\n\
         Respond with just the name of the tool.\n\
         \n\
         ```\n\
         {tools}\
         ```\n\
         USER: {request}"
    )
}

/// Map a raw classification answer onto a registered tool.
///
/// An answer that is exactly a tool name (ignoring case and surrounding
/// punctuation) wins. Otherwise the first tool, in registration order, whose
/// name appears in the answer is chosen. An answer naming two tools is
/// ambiguous and resolves to the one registered first.
pub fn resolve_label(response: &str, registry: &ToolRegistry) -> Option<ToolId> {
    let label = response.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
    if !label.is_empty() {
        if let Some((id, _)) = registry
            .iter()
            .find(|(_, tool)| tool.name().eq_ignore_ascii_case(label))
        {
            return Some(id);
        }
    }

    registry
        .iter()
        .find(|(_, tool)| response.contains(tool.name()))
        .map(|(id, _)| id)
}
