// src/prompt/builder.rs

/// Heading that opens the example-conversation scaffold
pub const CONVERSATION_MARKER: &str = "# Conversation";

/// Builds the full persona prompt including the conversation scaffold
pub fn build_prompt(persona: &str, user_text: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("# Persona\n");
    prompt.push_str(persona);
    prompt.push_str("\n\n");

    prompt.push_str("# Instructions\n");
    prompt.push_str("- Stay in character.\n");
    prompt.push_str("- Spoken, concise Chinese (1-2 sentences).\n");
    prompt.push_str("- If unknown, say naturally you are not sure.\n\n");

    prompt.push_str(CONVERSATION_MARKER);
    prompt.push('\n');
    prompt.push_str(&format!("User: {}\n", user_text));
    prompt.push_str("Assistant:");

    prompt
}

/// System message for the chat API: persona and instructions only.
/// The user's text travels as its own message, so the scaffold is cut off.
pub fn system_prompt(persona: &str) -> String {
    let full = build_prompt(persona, "");
    strip_conversation(&full).to_string()
}

/// Everything before the conversation scaffold, trimmed
pub fn strip_conversation(prompt: &str) -> &str {
    match prompt.split_once(CONVERSATION_MARKER) {
        Some((head, _)) => head.trim(),
        None => prompt.trim(),
    }
}
