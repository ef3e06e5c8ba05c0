//! Tools the assistant can route a request to
//!
//! A tool consumes the conversation so far and produces text to be spoken.
//! The classifier only sees a tool's name and description; the engine only
//! looks at its [`ToolRole`].

mod dismiss;
mod general;
pub mod lighting;

pub use dismiss::DismissTool;
pub use general::GeneralTool;
pub use lighting::LightingTool;

use crate::llm::{LlmError, Message};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// How the engine treats a tool once it has been selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolRole {
    /// Fallback when classification names nothing registered
    General,
    /// Selecting it ends the conversation
    Terminator,
    /// Any other capability
    Standard,
}

/// What a tool hands back to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolReply {
    /// Text for speech synthesis
    Speech(String),
    /// The conversation is over
    EndConversation,
}

impl ToolReply {
    pub fn speech(text: impl Into<String>) -> Self {
        Self::Speech(text.into())
    }
}

/// Errors a tool can raise. Anything recoverable is turned into speech by
/// the tool itself, so what remains here aborts the turn.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
}

/// Trait for tools the conversation engine can dispatch to
#[async_trait]
pub trait Tool: Send + Sync {
    /// Short unique label the classifier answers with
    fn name(&self) -> &str;

    /// Description used in the classification prompt
    fn description(&self) -> String;

    /// Role used for dispatch decisions
    fn role(&self) -> ToolRole {
        ToolRole::Standard
    }

    /// Handle a request. `history` ends with the newest user message.
    async fn process_request(&self, history: &[Message]) -> Result<ToolReply, ToolError>;
}

/// Position of a tool within its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolId(usize);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no tools registered")]
    Empty,
    #[error("tool at position {0} has an empty name")]
    EmptyName(usize),
    #[error("tool name registered twice: {0}")]
    DuplicateName(String),
    #[error("exactly one general tool is required, found {0}")]
    GeneralCount(usize),
    #[error("at most one terminator tool is allowed, found {0}")]
    TerminatorCount(usize),
}

/// Ordered, validated set of tools for one session
///
/// Registration order is significant: it is the order tools appear in the
/// classification prompt and the precedence order when a response names
/// more than one tool.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    general: ToolId,
    terminator: Option<ToolId>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .field("general", &self.general)
            .field("terminator", &self.terminator)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        if tools.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        let mut generals = Vec::new();
        let mut terminators = Vec::new();

        for (index, tool) in tools.iter().enumerate() {
            let name = tool.name();
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName(index));
            }
            if !seen.insert(name.to_string()) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
            match tool.role() {
                ToolRole::General => generals.push(ToolId(index)),
                ToolRole::Terminator => terminators.push(ToolId(index)),
                ToolRole::Standard => {}
            }
        }

        if generals.len() != 1 {
            return Err(RegistryError::GeneralCount(generals.len()));
        }
        if terminators.len() > 1 {
            return Err(RegistryError::TerminatorCount(terminators.len()));
        }

        Ok(Self {
            tools,
            general: generals[0],
            terminator: terminators.first().copied(),
        })
    }

    pub fn get(&self, id: ToolId) -> &Arc<dyn Tool> {
        &self.tools[id.0]
    }

    /// The fallback tool
    pub fn general(&self) -> ToolId {
        self.general
    }

    pub fn is_terminator(&self, id: ToolId) -> bool {
        self.terminator == Some(id)
    }

    /// Tools in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ToolId, &Arc<dyn Tool>)> {
        self.tools
            .iter()
            .enumerate()
            .map(|(index, tool)| (ToolId(index), tool))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
