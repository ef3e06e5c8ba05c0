//! Mock implementations for testing
//!
//! These mocks let the engine, classifier and tools run without a model
//! or a light on the network.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Message};
use crate::tools::lighting::{Actuator, ActuatorError, LightState};
use crate::tools::{Tool, ToolError, ToolReply, ToolRole};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful text response
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(LlmResponse::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Actuator
// ============================================================================

/// In-memory light that remembers every state applied to it
pub struct MockActuator {
    state: Mutex<LightState>,
    applied: Mutex<Vec<LightState>>,
    fail_query: bool,
    fail_apply: Mutex<bool>,
}

impl MockActuator {
    pub fn new(state: LightState) -> Self {
        Self {
            state: Mutex::new(state),
            applied: Mutex::new(Vec::new()),
            fail_query: false,
            fail_apply: Mutex::new(false),
        }
    }

    /// A light that cannot be reached at all
    pub fn unreachable() -> Self {
        Self {
            fail_query: true,
            ..Self::new(LightState::default())
        }
    }

    pub fn set_fail_apply(&self, fail: bool) {
        *self.fail_apply.lock().unwrap() = fail;
    }

    pub fn applied(&self) -> Vec<LightState> {
        self.applied.lock().unwrap().clone()
    }

    pub fn last_applied(&self) -> Option<LightState> {
        self.applied.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn query_state(&self) -> Result<LightState, ActuatorError> {
        if self.fail_query {
            return Err(ActuatorError::CommandFailed {
                status: Some(1),
                stderr: "no light found".to_string(),
            });
        }
        Ok(*self.state.lock().unwrap())
    }

    async fn apply_state(&self, state: &LightState) -> Result<(), ActuatorError> {
        if *self.fail_apply.lock().unwrap() {
            return Err(ActuatorError::Timeout);
        }
        self.applied.lock().unwrap().push(*state);
        *self.state.lock().unwrap() = *state;
        Ok(())
    }
}

// ============================================================================
// Scripted Tool
// ============================================================================

/// Tool with a fixed reply that records the history it was handed
pub struct ScriptedTool {
    name: String,
    role: ToolRole,
    reply: Mutex<Option<Result<ToolReply, ToolError>>>,
    default_reply: String,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedTool {
    pub fn new(name: impl Into<String>, role: ToolRole, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            reply: Mutex::new(None),
            default_reply: reply.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call fail
    pub fn fail_next(&self, error: ToolError) {
        *self.reply.lock().unwrap() = Some(Err(error));
    }

    /// Make the next call return a specific reply
    pub fn reply_next(&self, reply: ToolReply) {
        *self.reply.lock().unwrap() = Some(Ok(reply));
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Scripted {}", self.name)
    }

    fn role(&self) -> ToolRole {
        self.role
    }

    async fn process_request(&self, history: &[Message]) -> Result<ToolReply, ToolError> {
        self.seen.lock().unwrap().push(history.to_vec());
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(ToolReply::speech(self.default_reply.clone())))
    }
}
