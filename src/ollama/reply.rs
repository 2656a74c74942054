use tracing::warn;

use super::types::ChatResponse;

/// Pulls the assistant text out of a chat response. `None` when the model
/// returned nothing usable.
pub fn extract_reply(response: &ChatResponse) -> Option<String> {
    let text = response
        .message
        .as_ref()
        .map(|m| m.content.trim().to_string())
        .filter(|t| !t.is_empty());

    if text.is_none() {
        warn!("Ollama returned empty message content");
    }
    text
}
