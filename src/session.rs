//! Interactive session loop
//!
//! Text stands in for speech: each input line is one captured utterance and
//! each output line is what would be spoken. Between conversations the
//! assistant waits for a line containing the wake word.

use crate::engine::{ConversationEngine, EngineError, TurnOutcome};
use crate::state_machine::TurnState;
use crate::tools::LightingTool;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const GREETING: &str = "Yes sir, what can I help you with?";
pub const LEAVE: &str = "I will take my leave now, call me if you need me.";
pub const FAREWELL: &str = "Very well sir, I will be here if you need me.";
pub const GATEWAY_APOLOGY: &str =
    "I'm sorry, I could not reach my language service. Please ask again.";
pub const TURN_APOLOGY: &str = "I'm sorry, I could not handle that request. Please ask again.";

/// Matched case-insensitively anywhere in a line
pub const WAKE_WORD: &str = "alfred";

/// Wait for the wake word and run a conversation each time it is heard,
/// until the input ends
pub async fn run_assistant<R, W>(
    engine: &mut ConversationEngine,
    lighting: Option<&LightingTool>,
    mut input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        tracing::info!(wake_word = WAKE_WORD, "Waiting for wake word");
        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            tracing::info!("Input closed, shutting down");
            return Ok(());
        }
        if !is_wake_line(&line) {
            continue;
        }
        run_session(engine, lighting, &mut input, &mut output).await?;
    }
}

fn is_wake_line(line: &str) -> bool {
    line.to_ascii_lowercase().contains(WAKE_WORD)
}

/// What to say when a turn fails
fn apology(error: &EngineError) -> &'static str {
    match error {
        EngineError::Gateway(_) => GATEWAY_APOLOGY,
        _ => TURN_APOLOGY,
    }
}

/// Run one wake cycle until the user goes quiet or dismisses the assistant.
///
/// `lighting`, when present, shows the listening indicator while a line is
/// being read. Indicator failures never interrupt the conversation.
pub async fn run_session<R, W>(
    engine: &mut ConversationEngine,
    lighting: Option<&LightingTool>,
    mut input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let TurnState::TurnActive { request } = engine.state() {
        tracing::warn!(request = %request, "Previous turn never finished");
    }
    // Each wake starts a fresh conversation
    engine.reset();
    say(&mut output, GREETING).await?;

    loop {
        if let Some(light) = lighting {
            if let Err(e) = light.enter_listening_indicator().await {
                tracing::warn!(error = %e, "Failed to show listening indicator");
            }
        }

        let mut line = String::new();
        let read = input.read_line(&mut line).await;

        if let Some(light) = lighting {
            if let Err(e) = light.exit_listening_indicator().await {
                tracing::warn!(error = %e, "Failed to restore light after listening");
            }
        }

        let request = line.trim();
        if read? == 0 || request.is_empty() {
            say(&mut output, LEAVE).await?;
            break;
        }

        match engine.handle_turn(request).await {
            Ok(TurnOutcome::Reply(text)) => {
                tracing::debug!(messages = engine.history().len(), "Turn recorded");
                say(&mut output, &text).await?;
            }
            Ok(TurnOutcome::Terminated) => {
                say(&mut output, FAREWELL).await?;
                break;
            }
            Err(e) => {
                match &e {
                    EngineError::Gateway(err) => tracing::error!(
                        error = %err,
                        retryable = err.kind.is_retryable(),
                        retry_after = ?err.retry_after,
                        "Turn failed"
                    ),
                    _ => tracing::warn!(error = %e, "Turn rejected"),
                }
                say(&mut output, apology(&e)).await?;
            }
        }
    }

    if let Some(light) = lighting {
        tracing::debug!(state = ?light.current_state().await, "Conversation over");
    }
    Ok(())
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
