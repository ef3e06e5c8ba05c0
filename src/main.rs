//! Alfred - voice assistant conversation engine
//!
//! Routes each utterance to a tool picked by an LLM classifier and keeps the
//! conversation transcript. Speech capture and synthesis are out of process;
//! this binary reads utterances from stdin and writes replies to stdout. A
//! line containing "alfred" starts a conversation.

mod classifier;
mod config;
mod engine;
mod history;
mod llm;
mod session;
mod state_machine;
mod system_prompt;
#[cfg(test)]
mod testing;
mod tools;

use classifier::Classifier;
use config::AssistantConfig;
use engine::ConversationEngine;
use llm::{LlmService, LoggingService, OpenAIService};
use std::sync::Arc;
use tools::lighting::FluxLedActuator;
use tools::{DismissTool, GeneralTool, LightingTool, Tool, ToolRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only speech
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alfred=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    config::load_dotenv();
    let config = AssistantConfig::from_env()?;

    let openai = OpenAIService::new(
        config.openai_api_key.clone(),
        config.model,
        config.base_url.as_deref(),
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(openai)));
    tracing::info!(model = %llm.model_id(), "LLM gateway ready");

    let system_prompt = system_prompt::build_system_prompt(config.system_prompt.as_deref());

    let lighting = match &config.light_address {
        Some(address) => connect_lighting(&config, address, &llm, &system_prompt).await,
        None => {
            tracing::info!("ALFRED_LIGHT_ADDRESS not set, lighting disabled");
            None
        }
    };

    let mut tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GeneralTool::new(llm.clone())),
        Arc::new(DismissTool),
    ];
    if let Some(light) = &lighting {
        tools.push(light.clone());
    }
    let registry = ToolRegistry::new(tools)?;
    tracing::info!(
        count = registry.len(),
        tools = ?registry.names().collect::<Vec<_>>(),
        "Tool registry initialized"
    );

    let classifier = Classifier::new(llm).with_lookback(config.classifier_lookback);
    tracing::info!(lookback = classifier.lookback(), "Classifier ready");
    let mut engine = ConversationEngine::new(system_prompt, registry, classifier);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session::run_assistant(&mut engine, lighting.as_deref(), stdin, tokio::io::stdout()).await?;

    Ok(())
}

/// Reach the light, or log why lighting is unavailable
async fn connect_lighting(
    config: &AssistantConfig,
    address: &str,
    llm: &Arc<dyn LlmService>,
    system_prompt: &str,
) -> Option<Arc<LightingTool>> {
    let actuator = match FluxLedActuator::new(config.flux_led_bin.clone(), address) {
        Ok(actuator) => actuator,
        Err(e) => {
            tracing::warn!(error = %e, "Could not set up light actuator, lighting disabled");
            return None;
        }
    };

    match LightingTool::connect(llm.clone(), Arc::new(actuator), system_prompt).await {
        Ok(tool) => Some(Arc::new(tool)),
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "Light unreachable, lighting disabled");
            None
        }
    }
}
