use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A page of the UI. Exactly one is visible per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Home,
    Refine,
    Optimize,
    Convert,
    Chat,
    Analyzer,
    History,
    FileAnalyzer,
}

impl Panel {
    /// Declaration order of the UI slots; visibility vectors follow it.
    pub const ALL: [Panel; 8] = [
        Panel::Home,
        Panel::Refine,
        Panel::Optimize,
        Panel::Convert,
        Panel::Chat,
        Panel::Analyzer,
        Panel::History,
        Panel::FileAnalyzer,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        match self {
            Panel::Home => 0,
            Panel::Refine => 1,
            Panel::Optimize => 2,
            Panel::Convert => 3,
            Panel::Chat => 4,
            Panel::Analyzer => 5,
            Panel::History => 6,
            Panel::FileAnalyzer => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Refine,
    Optimize,
    Convert,
    Chat,
    Analyze,
}

impl LedgerKind {
    pub fn label(self) -> &'static str {
        match self {
            LedgerKind::Refine => "Refine",
            LedgerKind::Optimize => "Optimize",
            LedgerKind::Convert => "Convert",
            LedgerKind::Chat => "Chat",
            LedgerKind::Analyze => "Analyze",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Languages offered in the language pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Python,
    C,
    #[serde(rename = "C++")]
    Cpp,
    Java,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::JavaScript,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::Java => "Java",
            Language::JavaScript => "JavaScript",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::C => ".c",
            Language::Cpp => ".cpp",
            Language::Java => ".java",
            Language::JavaScript => ".js",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim().trim_start_matches('.');
        Self::ALL.into_iter().find(|language| {
            language.extension()[1..].eq_ignore_ascii_case(extension)
        })
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|language| language.label().eq_ignore_ascii_case(label))
    }
}

/// File extension for a language label, `.txt` when the label is not a known language.
pub fn extension_for_label(label: &str) -> &'static str {
    Language::from_label(label)
        .map(Language::extension)
        .unwrap_or(".txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_indices_follow_declaration_order() {
        for (position, panel) in Panel::ALL.into_iter().enumerate() {
            assert_eq!(panel.index(), position);
        }
    }

    #[test]
    fn language_labels_resolve_extensions() {
        assert_eq!(Language::from_label("c++"), Some(Language::Cpp));
        assert_eq!(extension_for_label("JavaScript"), ".js");
        assert_eq!(extension_for_label("Rust"), ".txt");
        assert_eq!(Language::from_extension("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_extension(".PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn panel_serializes_as_snake_case() {
        let json = serde_json::to_string(&Panel::FileAnalyzer).expect("json");
        assert_eq!(json, "\"file_analyzer\"");
    }
}
