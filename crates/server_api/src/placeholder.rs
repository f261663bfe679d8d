//! Local stand-in answers used when no model credential is configured.

use crate::prompts::language_label;

pub fn refine(code: &str, language: &str) -> String {
    format!(
        "✨ Refined {} Code:\n\n{}",
        language_label(language),
        code.to_uppercase()
    )
}

pub fn optimize(code: &str, language: &str) -> String {
    format!(
        "⚡ Optimized {} Code:\n\n{}",
        language_label(language),
        code.chars().rev().collect::<String>()
    )
}

pub fn convert(code: &str, from: &str, to: &str) -> String {
    format!(
        "🔄 Converted from {} → {}\n\n{code}",
        language_label(from),
        language_label(to)
    )
}

pub fn analyze(code: &str, language: &str) -> String {
    format!(
        "🔍 {} Code Analysis:\n\n{} lines, {} characters",
        language_label(language),
        code.lines().count(),
        code.chars().count()
    )
}

pub fn chat(message: &str) -> String {
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_transforms_code() {
        assert_eq!(refine("ab", "C"), "✨ Refined C Code:\n\nAB");
        assert_eq!(optimize("abc", "C"), "⚡ Optimized C Code:\n\ncba");
        assert_eq!(
            convert("x", "Python", "Java"),
            "🔄 Converted from Python → Java\n\nx"
        );
        assert_eq!(
            analyze("a\nb", "Java"),
            "🔍 Java Code Analysis:\n\n2 lines, 3 characters"
        );
        assert_eq!(chat("hi"), "hi");
    }
}
