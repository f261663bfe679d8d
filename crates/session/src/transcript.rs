use shared::protocol::ChatTurnPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub user_message: String,
    pub assistant_reply: String,
}

impl ChatTurn {
    pub fn new(user_message: impl Into<String>, assistant_reply: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            assistant_reply: assistant_reply.into(),
        }
    }

    pub fn to_payload(&self) -> ChatTurnPayload {
        ChatTurnPayload {
            user: self.user_message.clone(),
            assistant: self.assistant_reply.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    turns: Vec<ChatTurn>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn to_payload(&self) -> Vec<ChatTurnPayload> {
        self.turns.iter().map(ChatTurn::to_payload).collect()
    }
}
