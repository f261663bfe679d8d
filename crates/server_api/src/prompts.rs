//! Prompt templates for each action. Same input, byte-identical prompt.

use session::ChatTurn;

/// Label used in prompts when no language was picked.
pub const UNSPECIFIED_LANGUAGE: &str = "source";

pub fn language_label(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNSPECIFIED_LANGUAGE
    } else {
        trimmed
    }
}

pub fn refine_prompt(code: &str, language: &str) -> String {
    format!(
        "Fix and improve this {} code:\n{code}",
        language_label(language)
    )
}

pub fn optimize_prompt(code: &str, language: &str) -> String {
    format!(
        "Optimize this {} code for performance and readability:\n{code}",
        language_label(language)
    )
}

pub fn convert_prompt(code: &str, from: &str, to: &str) -> String {
    format!(
        "Convert {} code to {}:\n{code}",
        language_label(from),
        language_label(to)
    )
}

pub fn analyze_prompt(code: &str, language: &str) -> String {
    format!(
        "Analyze this {} code. Explain what it does and list any bugs or risks:\n{code}",
        language_label(language)
    )
}

pub fn chat_prompt(message: &str) -> String {
    message.to_string()
}

pub fn chat_prompt_with_transcript(turns: &[ChatTurn], message: &str) -> String {
    let mut prompt = String::new();
    for turn in turns {
        prompt.push_str(&format!(
            "User: {}\nAssistant: {}\n",
            turn.user_message, turn.assistant_reply
        ));
    }
    prompt.push_str(&format!("User: {message}\nAssistant:"));
    prompt
}
