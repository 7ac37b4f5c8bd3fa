use crate::message::Message;

/// Title used when the transcript has no prompt text and no references.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";
/// Title used when the transcript only carries reference images.
pub const IMAGE_CONVERSATION_TITLE: &str = "Image conversation";

/// Derives a session title from a transcript.
///
/// First non-blank user prompt (trimmed), else a generic image title when any
/// message carries references, else the default title.
pub fn derive_title(messages: &[Message]) -> String {
    if let Some(prompt) = messages
        .iter()
        .filter_map(Message::prompt)
        .map(str::trim)
        .find(|p| !p.is_empty())
    {
        return prompt.to_string();
    }

    if messages.iter().any(|m| !m.references().is_empty()) {
        IMAGE_CONVERSATION_TITLE.to_string()
    } else {
        DEFAULT_CONVERSATION_TITLE.to_string()
    }
}
