use chrono::{DateTime, Utc};
use shared::{domain::LedgerKind, protocol::LedgerEntryPayload};

pub const ENTRY_SEPARATOR: &str = "\n----------------------------------------\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    kind: LedgerKind,
    text: String,
    recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn kind(&self) -> LedgerKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn render(&self) -> String {
        format!("[{}]\n{}", self.kind.label(), self.text)
    }

    pub fn to_payload(&self) -> LedgerEntryPayload {
        LedgerEntryPayload {
            kind: self.kind,
            text: self.text.clone(),
            recorded_at: self.recorded_at,
        }
    }
}

/// Append-only record of completed model calls. There is no removal and no cap;
/// the ledger lives exactly as long as its session.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, kind: LedgerKind, text: impl Into<String>) {
        self.entries.push(LedgerEntry {
            kind,
            text: text.into(),
            recorded_at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render_all(&self) -> String {
        self.entries
            .iter()
            .map(LedgerEntry::render)
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR)
    }
}
