use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use gateway::HttpGateway;
use serde::Deserialize;
use server_api::{ApiContext, Backend};
use shared::{
    domain::SessionId,
    error::{ApiError, ErrorCode},
    protocol::{
        ActionResponse, ChatRequest, ChatResponse, ChatTurnPayload, CodeRequest, ConvertRequest,
        HistoryResponse, NavigateRequest, NavigationState, SessionSnapshot,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

use config::{load_settings, GatewayMode, Settings};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[derive(Debug, Deserialize)]
struct FileAnalyzeQuery {
    language: Option<String>,
    filename: Option<String>,
}

const MAX_FILENAME_BYTES: usize = 180;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let backend = build_backend(&settings)?;
    info!(backend = backend.name(), chat_context = ?settings.chat_context, "answer backend ready");

    let api = ApiContext::new(backend, settings.chat_context);
    let app = build_router(Arc::new(AppState { api }), settings.max_upload_bytes);

    let addr = settings.bind_addr();
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_backend(settings: &Settings) -> anyhow::Result<Backend> {
    match settings.effective_gateway_mode() {
        GatewayMode::Remote => {
            let gateway = HttpGateway::new(settings.gateway_config())?;
            info!(model = gateway.model(), endpoint = %gateway.endpoint(), "using hosted model");
            Ok(Backend::Remote(Arc::new(gateway)))
        }
        GatewayMode::Placeholder => {
            warn!("no model credential configured; answering with local placeholders");
            Ok(Backend::Placeholder)
        }
    }
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let uploads = Router::new()
        .route("/sessions/:session_id/files/analyze", post(http_analyze_file))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/sessions", post(http_create_session))
        .route(
            "/sessions/:session_id",
            get(http_session_snapshot).delete(http_end_session),
        )
        .route("/sessions/:session_id/navigate", post(http_navigate))
        .route("/sessions/:session_id/home", post(http_go_home))
        .route("/sessions/:session_id/refine", post(http_refine))
        .route("/sessions/:session_id/optimize", post(http_optimize))
        .route("/sessions/:session_id/convert", post(http_convert))
        .route("/sessions/:session_id/analyze", post(http_analyze))
        .route("/sessions/:session_id/files/result", get(http_download_result))
        .route(
            "/sessions/:session_id/chat",
            get(http_chat_transcript).post(http_chat),
        )
        .route("/sessions/:session_id/history", get(http_history))
        .merge(uploads)
        .with_state(state)
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_create_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(server_api::create_session(&state.api).await)
}

async fn http_session_snapshot(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = server_api::session_snapshot(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(Json(snapshot))
}

async fn http_end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    server_api::end_session(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_navigate(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> ApiResult<Json<NavigationState>> {
    let navigation = server_api::navigate(&state.api, SessionId(session_id), req.panel)
        .await
        .map_err(api_error)?;
    Ok(Json(navigation))
}

async fn http_go_home(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<NavigationState>> {
    let navigation = server_api::go_home(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(Json(navigation))
}

async fn http_refine(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let response = server_api::refine(&state.api, SessionId(session_id), &req.code, &req.language)
        .await
        .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_optimize(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let response =
        server_api::optimize(&state.api, SessionId(session_id), &req.code, &req.language)
            .await
            .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_convert(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ConvertRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let response = server_api::convert(
        &state.api,
        SessionId(session_id),
        &req.code,
        &req.from,
        &req.to,
    )
    .await
    .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_analyze(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let response = server_api::analyze(&state.api, SessionId(session_id), &req.code, &req.language)
        .await
        .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_analyze_file(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Query(q): Query<FileAnalyzeQuery>,
    body: Bytes,
) -> ApiResult<Json<ActionResponse>> {
    let filename = q
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    if let Some(name) = filename {
        if name.len() > MAX_FILENAME_BYTES {
            return Err(api_error(ApiError::new(
                ErrorCode::Validation,
                "filename is too long",
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(api_error(ApiError::new(
                ErrorCode::Validation,
                "filename must not contain path separators",
            )));
        }
        if name.chars().any(|c| c == '"' || c == ';' || c.is_control()) {
            return Err(api_error(ApiError::new(
                ErrorCode::Validation,
                "filename contains characters not allowed in a download name",
            )));
        }
    }

    let response = server_api::analyze_file(
        &state.api,
        SessionId(session_id),
        filename,
        q.language.as_deref().unwrap_or_default(),
        &body,
    )
    .await
    .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_download_result(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let file = server_api::result_file(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&file.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, file.contents))
}

/// `attachment` disposition with an ASCII `filename` and, when the name is not plain
/// ASCII, an RFC 6266 `filename*` carrying the UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && !matches!(c, '"' | '\\' | ';')) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if fallback == filename {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}

async fn http_chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let response = server_api::chat(&state.api, SessionId(session_id), &req.message)
        .await
        .map_err(api_error)?;
    Ok(Json(response))
}

async fn http_chat_transcript(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChatTurnPayload>>> {
    let transcript = server_api::chat_transcript(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(Json(transcript))
}

async fn http_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<HistoryResponse>> {
    let history = server_api::history(&state.api, SessionId(session_id))
        .await
        .map_err(api_error)?;
    Ok(Json(history))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
