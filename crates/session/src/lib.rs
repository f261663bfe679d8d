use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::{domain::SessionId, protocol::SessionSnapshot};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

mod ledger;
mod navigator;
mod transcript;

pub use ledger::{Ledger, LedgerEntry, ENTRY_SEPARATOR};
pub use navigator::{Navigator, Visibility};
pub use transcript::{ChatTranscript, ChatTurn};

/// Latest converter or analyzer output, offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub filename: String,
    pub contents: String,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    pub navigator: Navigator,
    pub ledger: Ledger,
    pub transcript: ChatTranscript,
    pub last_result: Option<ResultFile>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            navigator: Navigator::new(),
            ledger: Ledger::new(),
            transcript: ChatTranscript::new(),
            last_result: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            created_at: self.created_at,
            navigation: self.navigator.state(),
            ledger_len: self.ledger.len(),
            chat_turns: self.transcript.len(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Per-client session state. Sessions never share a navigator or a ledger.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SessionHandle {
        let id = SessionId::new();
        let handle = Arc::new(Mutex::new(Session::new(id)));
        self.sessions.write().await.insert(id, handle.clone());
        info!(session_id = %id, "session created");
        handle
    }

    pub async fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
