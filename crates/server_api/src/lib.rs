use std::{path::Path, sync::Arc};

use gateway::{CompletionGateway, GatewayError};
use session::{ChatTurn, ResultFile, SessionHandle, SessionStore};
use shared::{
    domain::{extension_for_label, Language, LedgerKind, Panel, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{
        ActionOutcome, ActionResponse, ChatResponse, ChatTurnPayload, HistoryResponse,
        NavigationState, SessionSnapshot,
    },
};
use tracing::{info, warn};

pub mod placeholder;
pub mod prompts;

pub const EMPTY_CODE_WARNING: &str = "⚠️ Enter code first!";
pub const EMPTY_MESSAGE_WARNING: &str = "⚠️ Enter a message first!";
pub const ANALYSIS_FILENAME: &str = "analysis.txt";

/// How much of the chat transcript is sent with each new message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatContext {
    #[default]
    LatestMessage,
    Transcript,
}

impl ChatContext {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "latest_message" | "latest" => Some(Self::LatestMessage),
            "transcript" | "full_transcript" => Some(Self::Transcript),
            _ => None,
        }
    }
}

/// Where action answers come from.
#[derive(Clone)]
pub enum Backend {
    Remote(Arc<dyn CompletionGateway>),
    Placeholder,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Remote(_) => "remote",
            Backend::Placeholder => "placeholder",
        }
    }

    async fn respond(
        &self,
        prompt: String,
        placeholder: impl FnOnce() -> String,
    ) -> (String, ActionOutcome) {
        match self {
            Backend::Remote(gateway) => match gateway.complete(&prompt).await {
                Ok(reply) => (reply, ActionOutcome::Completed),
                Err(err) => {
                    warn!(error = %err, "completion call failed");
                    (render_failure(&err), ActionOutcome::Failed)
                }
            },
            Backend::Placeholder => (placeholder(), ActionOutcome::Completed),
        }
    }
}

/// Text shown in place of a result when the model call fails.
pub fn render_failure(err: &GatewayError) -> String {
    format!("Error: {err}")
}

#[derive(Clone)]
pub struct ApiContext {
    pub sessions: SessionStore,
    pub backend: Backend,
    pub chat_context: ChatContext,
}

impl ApiContext {
    pub fn new(backend: Backend, chat_context: ChatContext) -> Self {
        Self {
            sessions: SessionStore::new(),
            backend,
            chat_context,
        }
    }

    async fn session(&self, session_id: SessionId) -> Result<SessionHandle, ApiError> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(ApiError::session_not_found)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeAction {
    Refine { code: String, language: String },
    Optimize { code: String, language: String },
    Convert { code: String, from: String, to: String },
    Analyze { code: String, language: String },
}

impl CodeAction {
    pub fn kind(&self) -> LedgerKind {
        match self {
            CodeAction::Refine { .. } => LedgerKind::Refine,
            CodeAction::Optimize { .. } => LedgerKind::Optimize,
            CodeAction::Convert { .. } => LedgerKind::Convert,
            CodeAction::Analyze { .. } => LedgerKind::Analyze,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            CodeAction::Refine { code, .. }
            | CodeAction::Optimize { code, .. }
            | CodeAction::Convert { code, .. }
            | CodeAction::Analyze { code, .. } => code,
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            CodeAction::Refine { code, language } => prompts::refine_prompt(code, language),
            CodeAction::Optimize { code, language } => prompts::optimize_prompt(code, language),
            CodeAction::Convert { code, from, to } => prompts::convert_prompt(code, from, to),
            CodeAction::Analyze { code, language } => prompts::analyze_prompt(code, language),
        }
    }

    fn placeholder(&self) -> String {
        match self {
            CodeAction::Refine { code, language } => placeholder::refine(code, language),
            CodeAction::Optimize { code, language } => placeholder::optimize(code, language),
            CodeAction::Convert { code, from, to } => placeholder::convert(code, from, to),
            CodeAction::Analyze { code, language } => placeholder::analyze(code, language),
        }
    }

    /// Download name for results worth keeping; refine and optimize results are not kept.
    fn result_filename(&self) -> Option<String> {
        match self {
            CodeAction::Convert { to, .. } => Some(format!("converted{}", extension_for_label(to))),
            CodeAction::Analyze { .. } => Some(ANALYSIS_FILENAME.to_string()),
            CodeAction::Refine { .. } | CodeAction::Optimize { .. } => None,
        }
    }
}

pub async fn create_session(ctx: &ApiContext) -> SessionSnapshot {
    let session = ctx.sessions.create().await;
    let snapshot = session.lock().await.snapshot();
    snapshot
}

pub async fn session_snapshot(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<SessionSnapshot, ApiError> {
    let session = ctx.session(session_id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(snapshot)
}

pub async fn end_session(ctx: &ApiContext, session_id: SessionId) -> Result<(), ApiError> {
    if ctx.sessions.remove(session_id).await {
        Ok(())
    } else {
        Err(ApiError::session_not_found())
    }
}

pub async fn navigate(
    ctx: &ApiContext,
    session_id: SessionId,
    panel: Panel,
) -> Result<NavigationState, ApiError> {
    let session = ctx.session(session_id).await?;
    let mut session = session.lock().await;
    session.navigator.activate(panel);
    let state = session.navigator.state();
    Ok(state)
}

pub async fn go_home(ctx: &ApiContext, session_id: SessionId) -> Result<NavigationState, ApiError> {
    navigate(ctx, session_id, Panel::Home).await
}

pub async fn run_code_action(
    ctx: &ApiContext,
    session_id: SessionId,
    action: CodeAction,
) -> Result<ActionResponse, ApiError> {
    let result_filename = action.result_filename();
    run_code_action_with_result_name(ctx, session_id, action, result_filename).await
}

async fn run_code_action_with_result_name(
    ctx: &ApiContext,
    session_id: SessionId,
    action: CodeAction,
    result_filename: Option<String>,
) -> Result<ActionResponse, ApiError> {
    let session = ctx.session(session_id).await?;
    let kind = action.kind();

    if action.code().trim().is_empty() {
        info!(%session_id, %kind, "rejected empty code");
        return Ok(ActionResponse {
            kind,
            output: EMPTY_CODE_WARNING.to_string(),
            outcome: ActionOutcome::EmptyInput,
        });
    }

    // The session lock is not held across the model call.
    let (output, outcome) = ctx
        .backend
        .respond(action.prompt(), || action.placeholder())
        .await;

    let mut session = session.lock().await;
    session.ledger.append(kind, output.clone());
    if outcome == ActionOutcome::Completed {
        if let Some(filename) = result_filename {
            session.last_result = Some(ResultFile {
                filename,
                contents: output.clone(),
            });
        }
    }
    info!(%session_id, %kind, ?outcome, backend = ctx.backend.name(), "action finished");

    Ok(ActionResponse {
        kind,
        output,
        outcome,
    })
}

pub async fn refine(
    ctx: &ApiContext,
    session_id: SessionId,
    code: &str,
    language: &str,
) -> Result<ActionResponse, ApiError> {
    let action = CodeAction::Refine {
        code: code.to_string(),
        language: language.to_string(),
    };
    run_code_action(ctx, session_id, action).await
}

pub async fn optimize(
    ctx: &ApiContext,
    session_id: SessionId,
    code: &str,
    language: &str,
) -> Result<ActionResponse, ApiError> {
    let action = CodeAction::Optimize {
        code: code.to_string(),
        language: language.to_string(),
    };
    run_code_action(ctx, session_id, action).await
}

pub async fn convert(
    ctx: &ApiContext,
    session_id: SessionId,
    code: &str,
    from: &str,
    to: &str,
) -> Result<ActionResponse, ApiError> {
    let action = CodeAction::Convert {
        code: code.to_string(),
        from: from.to_string(),
        to: to.to_string(),
    };
    run_code_action(ctx, session_id, action).await
}

pub async fn analyze(
    ctx: &ApiContext,
    session_id: SessionId,
    code: &str,
    language: &str,
) -> Result<ActionResponse, ApiError> {
    let action = CodeAction::Analyze {
        code: code.to_string(),
        language: language.to_string(),
    };
    run_code_action(ctx, session_id, action).await
}

/// Analyzes an uploaded file. The language defaults to the one implied by the
/// file extension when the caller leaves it blank.
pub async fn analyze_file(
    ctx: &ApiContext,
    session_id: SessionId,
    filename: Option<&str>,
    language: &str,
    contents: &[u8],
) -> Result<ActionResponse, ApiError> {
    let code = std::str::from_utf8(contents).map_err(|e| {
        ApiError::new(
            ErrorCode::Validation,
            format!("uploaded file is not valid UTF-8: {e}"),
        )
    })?;

    let path = filename.map(Path::new);
    let language = if language.trim().is_empty() {
        path.and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
            .map(Language::label)
            .unwrap_or_default()
    } else {
        language
    };
    let stem = path
        .and_then(Path::file_stem)
        .and_then(|stem| stem.to_str())
        .map(download_safe_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "upload".to_string());

    let action = CodeAction::Analyze {
        code: code.to_string(),
        language: language.to_string(),
    };
    run_code_action_with_result_name(ctx, session_id, action, Some(format!("{stem}_analysis.txt")))
        .await
}

/// Keeps letters, digits, `-`, `_` and `.`; anything else becomes `_`.
fn download_safe_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub async fn chat(
    ctx: &ApiContext,
    session_id: SessionId,
    message: &str,
) -> Result<ChatResponse, ApiError> {
    let session = ctx.session(session_id).await?;

    if message.trim().is_empty() {
        let transcript = session.lock().await.transcript.to_payload();
        return Ok(ChatResponse {
            reply: EMPTY_MESSAGE_WARNING.to_string(),
            outcome: ActionOutcome::EmptyInput,
            transcript,
        });
    }

    let prompt = match ctx.chat_context {
        ChatContext::LatestMessage => prompts::chat_prompt(message),
        ChatContext::Transcript => {
            let session = session.lock().await;
            let prompt = prompts::chat_prompt_with_transcript(session.transcript.turns(), message);
            prompt
        }
    };

    let (reply, outcome) = ctx
        .backend
        .respond(prompt, || placeholder::chat(message))
        .await;

    let mut session = session.lock().await;
    session.ledger.append(LedgerKind::Chat, reply.clone());
    session.transcript.push(ChatTurn::new(message, reply.clone()));
    info!(%session_id, ?outcome, turns = session.transcript.len(), "chat turn finished");
    let transcript = session.transcript.to_payload();

    Ok(ChatResponse {
        reply,
        outcome,
        transcript,
    })
}

pub async fn chat_transcript(
    ctx: &ApiContext,
    session_id: SessionId,
) -> Result<Vec<ChatTurnPayload>, ApiError> {
    let session = ctx.session(session_id).await?;
    let transcript = session.lock().await.transcript.to_payload();
    Ok(transcript)
}

pub async fn history(ctx: &ApiContext, session_id: SessionId) -> Result<HistoryResponse, ApiError> {
    let session = ctx.session(session_id).await?;
    let session = session.lock().await;
    let response = HistoryResponse {
        rendered: session.ledger.render_all(),
        entries: session
            .ledger
            .entries()
            .iter()
            .map(|entry| entry.to_payload())
            .collect(),
    };
    Ok(response)
}

pub async fn result_file(ctx: &ApiContext, session_id: SessionId) -> Result<ResultFile, ApiError> {
    let session = ctx.session(session_id).await?;
    let result = session.lock().await.last_result.clone();
    result.ok_or_else(|| ApiError::new(ErrorCode::NotFound, "no result available yet"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
