use super::*;
use async_trait::async_trait;
use axum::{body, body::Body, http::Request};
use gateway::{CompletionGateway, GatewayError};
use server_api::ChatContext;
use shared::{
    domain::{LedgerKind, Panel},
    protocol::ActionOutcome,
};
use tower::ServiceExt;

struct FixedGateway(Result<&'static str, &'static str>);

#[async_trait]
impl CompletionGateway for FixedGateway {
    async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
        self.0
            .map(str::to_string)
            .map_err(|message| GatewayError::Transport(message.to_string()))
    }
}

fn app_with(backend: Backend) -> Router {
    let api = ApiContext::new(backend, ChatContext::LatestMessage);
    build_router(Arc::new(AppState { api }), 64)
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_json(uri: String, value: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("request")
}

async fn new_session(app: &Router) -> SessionSnapshot {
    let request = Request::post("/sessions")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = app_with(Backend::Placeholder);
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn navigation_routes_return_visibility_vector() {
    let app = app_with(Backend::Placeholder);
    let session = new_session(&app).await;
    assert_eq!(session.navigation.active_panel, Panel::Home);

    let id = session.session_id;
    let response = app
        .clone()
        .oneshot(post_json(
            format!("/sessions/{id}/navigate"),
            serde_json::json!({ "panel": "file_analyzer" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let state: NavigationState = read_json(response).await;
    assert_eq!(state.active_panel, Panel::FileAnalyzer);
    assert_eq!(
        state.visibility,
        vec![false, false, false, false, false, false, false, true]
    );

    let request = Request::post(format!("/sessions/{id}/home"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let state: NavigationState = read_json(response).await;
    assert_eq!(state.active_panel, Panel::Home);
}

#[tokio::test]
async fn refine_route_records_history() {
    let app = app_with(Backend::Remote(Arc::new(FixedGateway(Ok("print(2)")))));
    let id = new_session(&app).await.session_id;

    let response = app
        .clone()
        .oneshot(post_json(
            format!("/sessions/{id}/refine"),
            serde_json::json!({ "code": "print(1)", "language": "Python" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let action: ActionResponse = read_json(response).await;
    assert_eq!(action.output, "print(2)");
    assert_eq!(action.kind, LedgerKind::Refine);

    let request = Request::get(format!("/sessions/{id}/history"))
        .body(Body::empty())
        .expect("request");
    let history: HistoryResponse = read_json(app.oneshot(request).await.expect("response")).await;
    assert_eq!(history.rendered, "[Refine]\nprint(2)");
}

#[tokio::test]
async fn gateway_failure_is_rendered_not_raised() {
    let app = app_with(Backend::Remote(Arc::new(FixedGateway(Err("quota exceeded")))));
    let id = new_session(&app).await.session_id;

    let response = app
        .oneshot(post_json(
            format!("/sessions/{id}/chat"),
            serde_json::json!({ "message": "hi" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let chat: ChatResponse = read_json(response).await;
    assert_eq!(chat.reply, "Error: quota exceeded");
    assert_eq!(chat.outcome, ActionOutcome::Failed);
    assert_eq!(chat.transcript.len(), 1);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app_with(Backend::Placeholder);
    let request = Request::get(format!("/sessions/{}", Uuid::new_v4()))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = read_json(response).await;
    assert!(matches!(err.code, ErrorCode::NotFound));
}

#[tokio::test]
async fn ended_session_cannot_be_used() {
    let app = app_with(Backend::Placeholder);
    let id = new_session(&app).await.session_id;

    let request = Request::delete(format!("/sessions/{id}"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(post_json(
            format!("/sessions/{id}/optimize"),
            serde_json::json!({ "code": "x", "language": "C" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploaded_file_analysis_can_be_downloaded() {
    let app = app_with(Backend::Placeholder);
    let id = new_session(&app).await.session_id;

    let missing = Request::get(format!("/sessions/{id}/files/result"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(missing).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let upload = Request::post(format!(
        "/sessions/{id}/files/analyze?filename=script.py"
    ))
    .body(Body::from("a = 1\nb = 2\n"))
    .expect("request");
    let response = app.clone().oneshot(upload).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let action: ActionResponse = read_json(response).await;
    assert_eq!(action.output, "🔍 Python Code Analysis:\n\n2 lines, 12 characters");

    let download = Request::get(format!("/sessions/{id}/files/result"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(download).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"script_analysis.txt\"")
    );
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), action.output.as_bytes());
}

#[tokio::test]
async fn invalid_uploads_are_rejected() {
    let app = app_with(Backend::Placeholder);
    let id = new_session(&app).await.session_id;

    let not_utf8 = Request::post(format!("/sessions/{id}/files/analyze?filename=blob.bin"))
        .body(Body::from(vec![0xffu8, 0xfe, 0xfd]))
        .expect("request");
    let response = app.clone().oneshot(not_utf8).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let traversal = Request::post(format!("/sessions/{id}/files/analyze?filename=..%2Fetc"))
        .body(Body::from("x"))
        .expect("request");
    let response = app.clone().oneshot(traversal).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let oversized = Request::post(format!("/sessions/{id}/files/analyze?filename=big.py"))
        .body(Body::from("x".repeat(1024)))
        .expect("request");
    let response = app.oneshot(oversized).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn placeholder_backend_without_credential() {
    let settings = Settings::default();
    let backend = build_backend(&settings).expect("backend");
    assert_eq!(backend.name(), "placeholder");
}

#[test]
fn remote_backend_with_credential() {
    let settings = Settings {
        api_key: Some("sk-test".into()),
        ..Settings::default()
    };
    let backend = build_backend(&settings).expect("backend");
    assert_eq!(backend.name(), "remote");
}

#[tokio::test]
async fn upload_filename_cannot_add_disposition_parameters() {
    let app = app_with(Backend::Placeholder);
    let id = new_session(&app).await.session_id;

    for name in [
        "x%22%3B%20filename%2A%3DUTF-8%27%27evil.exe%3B.py",
        "x%3Bevil.py",
        "line%0Abreak.py",
    ] {
        let upload = Request::post(format!("/sessions/{id}/files/analyze?filename={name}"))
            .body(Body::from("x = 1"))
            .expect("request");
        let response = app.clone().oneshot(upload).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name}");
    }

    let missing = Request::get(format!("/sessions/{id}/files/result"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(missing).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_ascii_download_name_uses_encoded_filename_parameter() {
    let app = app_with(Backend::Placeholder);
    let id = new_session(&app).await.session_id;

    let upload = Request::post(format!(
        "/sessions/{id}/files/analyze?filename=r%C3%A9sum%C3%A9.py"
    ))
    .body(Body::from("x = 1"))
    .expect("request");
    let response = app.clone().oneshot(upload).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let download = Request::get(format!("/sessions/{id}/files/result"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(download).await.expect("response");
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .expect("disposition")
        .to_str()
        .expect("ascii header");
    assert_eq!(
        disposition,
        "attachment; filename=\"r_sum__analysis.txt\"; filename*=UTF-8''r%C3%A9sum%C3%A9_analysis.txt"
    );
}

#[test]
fn plain_ascii_names_keep_a_single_filename_parameter() {
    assert_eq!(
        content_disposition("converted.js"),
        "attachment; filename=\"converted.js\""
    );
    assert_eq!(
        content_disposition("a\"b;c.txt"),
        "attachment; filename=\"a_b_c.txt\"; filename*=UTF-8''a%22b%3Bc.txt"
    );
}
