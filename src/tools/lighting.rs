//! Lighting tool - controls a LED strip through an [`Actuator`]
//!
//! The tool remembers the last state it applied so that the listening
//! indicator can be undone and so that relative requests ("dim the lights")
//! build on what is already showing.

mod actuator;
mod properties;
mod state;

pub use actuator::{Actuator, ActuatorError, FluxLedActuator};
pub use properties::{merge, Adjustment, ExtractError, LightingProperties};
pub use state::{ColorMode, LightState, Power, Rgb};

use super::{Tool, ToolError, ToolReply};
use crate::llm::{LlmRequest, LlmService, Message, Role};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

const FOLLOW_UP: &str = "Is there anything else I can assist with?";

const APPLY_FAILED: &str =
    "I'm sorry, I could not reach the lights just now. They may not have changed.";

/// Brightness in 0..=255 made the model ask follow-up questions, percent works
const PROPERTIES_PROMPT: &str = r#"The following is a request from a user to change the settings for their lights. Determine the following properties, surrounded by ```.
```
on_or_off: Whether they would like the lights "on" or "off".
brightness: The light level as an integer from 0 to 100. 0 is off, dim is 25, half is 50, and 100 is full brightness.
color: The light color in RGB format like [255, 0, 0] for red.
default: Set to true if the user requests 'default' or 'usual' settings, or asks for "Warm White" or "White" lights.
```
Respond with a JSON object with keys for the properties found. If the user does not specify a property, leave it out of the response.

The user request follows:
"#;

/// Outcome of asking the model for lighting properties
enum Extraction {
    Properties(LightingProperties),
    /// Reply that wasn't a properties object, spoken as-is
    Unparsable(String),
}

/// Controls one light and remembers its last good state
pub struct LightingTool {
    llm: Arc<dyn LlmService>,
    actuator: Arc<dyn Actuator>,
    system_prompt: String,
    prev_state: Mutex<LightState>,
}

impl LightingTool {
    /// Query the light and build the tool.
    ///
    /// An unreachable light is an error: the caller should leave the tool
    /// out of the registry rather than register something that can't work.
    pub async fn connect(
        llm: Arc<dyn LlmService>,
        actuator: Arc<dyn Actuator>,
        system_prompt: impl Into<String>,
    ) -> Result<Self, ActuatorError> {
        let initial = actuator.query_state().await?;
        tracing::info!(state = ?initial, "Connected to light");
        Ok(Self {
            llm,
            actuator,
            system_prompt: system_prompt.into(),
            prev_state: Mutex::new(initial),
        })
    }

    /// Last applied (or initially reported) state
    pub async fn current_state(&self) -> LightState {
        *self.prev_state.lock().await
    }

    /// Flash the listening colour while speech is captured
    pub async fn enter_listening_indicator(&self) -> Result<(), ActuatorError> {
        let _guard = self.prev_state.lock().await;
        self.actuator.apply_state(&LightState::listening()).await
    }

    /// Put back whatever was showing before the indicator
    pub async fn exit_listening_indicator(&self) -> Result<(), ActuatorError> {
        let state = self.prev_state.lock().await;
        self.actuator.apply_state(&state).await
    }

    /// Ask the model for the properties in `request`, using a fresh context
    async fn extract_properties(&self, request: &str) -> Result<Extraction, ToolError> {
        let llm_request = LlmRequest::new(vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!("{PROPERTIES_PROMPT}{request}")),
        ]);
        let reply = self.llm.complete(&llm_request).await?.text;

        match LightingProperties::parse(&reply) {
            Ok(props) => {
                tracing::debug!(properties = ?props, "Extracted lighting properties");
                Ok(Extraction::Properties(props))
            }
            Err(e) => {
                tracing::warn!(error = %e, reply = %reply, "Could not extract lighting properties");
                Ok(Extraction::Unparsable(reply))
            }
        }
    }
}

#[async_trait]
impl Tool for LightingTool {
    fn name(&self) -> &'static str {
        "LIGHTING"
    }

    fn description(&self) -> String {
        "For requests that interact with lights".to_string()
    }

    async fn process_request(&self, history: &[Message]) -> Result<ToolReply, ToolError> {
        // Only the newest request; older turns confused the extraction
        let request = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let props = match self.extract_properties(request).await? {
            Extraction::Properties(props) => props,
            Extraction::Unparsable(raw) => return Ok(ToolReply::Speech(raw)),
        };

        let mut prev_state = self.prev_state.lock().await;
        let (next, adjustment) = merge(*prev_state, &props);

        if let Err(e) = self.actuator.apply_state(&next).await {
            tracing::error!(error = %e, state = ?next, "Failed to apply light state");
            return Ok(ToolReply::speech(APPLY_FAILED));
        }

        *prev_state = next;
        tracing::info!(state = ?next, adjustment = ?adjustment, "Applied light state");
        Ok(ToolReply::Speech(format!("{} {FOLLOW_UP}", adjustment.phrase())))
    }
}
