//! System prompt that seeds every conversation

/// Base system prompt establishing the assistant's persona
const BASE_PROMPT: &str = r"You are Alfred, a courteous butler who helps the user through a voice interface.

Your replies are read aloud by a text-to-speech engine, so:
- Answer in one to three short sentences unless the user asks for detail.
- Use plain prose. No markdown, lists, code blocks or emoji.
- Spell out symbols and units the way a person would say them.";

/// Build the system prompt, honouring an operator-supplied override.
///
/// A blank override is ignored.
pub fn build_system_prompt(custom: Option<&str>) -> String {
    match custom.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => BASE_PROMPT.to_string(),
    }
}
