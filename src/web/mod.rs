//! Web front end: one form, one answer.
//!
//! Each browser gets a session cookie; its conversation memory lives in
//! process memory and is discarded on restart. Asking about a different URL
//! starts a fresh conversation. At most `server.max_sessions` sessions are
//! kept; the least recently used one is dropped to make room.

mod page;

pub use page::{render_page, PageState};

use crate::error::VidqaError;
use crate::orchestrator::Orchestrator;
use crate::rag::{ConversationMemory, QaAnswer, Source};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "vidqa_session";

struct Session {
    url: String,
    memory: ConversationMemory,
    last_used: Instant,
}

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
    sessions: Mutex<HashMap<String, Session>>,
    max_sessions: usize,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let max_sessions = orchestrator.settings().server.max_sessions.max(1);
        Self {
            orchestrator,
            sessions: Mutex::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Memory for `session_id` and `url`. A new URL starts a new conversation.
    async fn memory_for(&self, session_id: &str, url: &str) -> ConversationMemory {
        let sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(session) if session.url == url => session.memory.clone(),
            _ => self.orchestrator.new_memory(),
        }
    }

    async fn store(&self, session_id: String, url: String, memory: ConversationMemory) {
        let mut sessions = self.sessions.lock().await;

        if !sessions.contains_key(&session_id) {
            while sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, session)| session.last_used)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        sessions.remove(&id);
                        debug!("Evicted session {}", id);
                    }
                    None => break,
                }
            }
        }

        sessions.insert(
            session_id,
            Session {
                url,
                memory,
                last_used: Instant::now(),
            },
        );
    }

    /// Run one submission for a session.
    async fn ask(&self, session_id: &str, url: &str, question: &str) -> crate::Result<QaAnswer> {
        let url = url.trim();
        let mut memory = self.memory_for(session_id, url).await;
        let answer = self.orchestrator.answer(url, question, &mut memory).await?;
        self.store(session_id.to_string(), url.to_string(), memory).await;
        Ok(answer)
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index).post(submit))
        .route("/api/ask", axum::routing::post(api_ask))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AskForm {
    url: String,
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    generated_question: String,
    sources: Vec<Source>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Sessions ===

/// Session id from the request cookie, or a new one to set.
fn session_id(headers: &HeaderMap) -> (String, bool) {
    let existing = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && Uuid::parse_str(value).is_ok())
        .map(|(_, value)| value.to_string());

    match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn with_session_cookie(mut response: Response, session_id: &str, is_new: bool) -> Response {
    if is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, session_id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Invalid session cookie: {}", e),
        }
    }
    response
}

/// HTTP status for a pipeline error.
fn error_status(err: &VidqaError) -> StatusCode {
    match err {
        VidqaError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const MISSING_FIELDS: &str = "Please enter both a YouTube URL and a question.";

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn index() -> Html<String> {
    Html(render_page(&PageState::default()))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let (session_id, is_new) = session_id(&headers);

    if form.url.trim().is_empty() || form.question.trim().is_empty() {
        let page = render_page(&PageState {
            url: &form.url,
            question: &form.question,
            error: Some(MISSING_FIELDS),
            ..PageState::default()
        });
        return with_session_cookie(
            (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response(),
            &session_id,
            is_new,
        );
    }

    info!("Question for {}", form.url.trim());
    let response = match state.ask(&session_id, &form.url, &form.question).await {
        Ok(answer) => Html(render_page(&PageState {
            url: &form.url,
            question: &form.question,
            answer: Some(&answer),
            error: None,
        }))
        .into_response(),
        Err(e) => {
            error!("Submission failed: {}", e);
            let message = e.to_string();
            let page = render_page(&PageState {
                url: &form.url,
                question: &form.question,
                error: Some(&message),
                ..PageState::default()
            });
            (error_status(&e), Html(page)).into_response()
        }
    };

    with_session_cookie(response, &session_id, is_new)
}

async fn api_ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AskForm>,
) -> Response {
    let (session_id, is_new) = session_id(&headers);

    let response = if req.url.trim().is_empty() || req.question.trim().is_empty() {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: MISSING_FIELDS.to_string(),
            }),
        )
            .into_response()
    } else {
        match state.ask(&session_id, &req.url, &req.question).await {
            Ok(answer) => Json(AskResponse {
                answer: answer.answer,
                generated_question: answer.generated_question,
                sources: answer.sources,
            })
            .into_response(),
            Err(e) => {
                error!("API question failed: {}", e);
                (
                    error_status(&e),
                    Json(ErrorResponse {
                        error: e.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    };

    with_session_cookie(response, &session_id, is_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Prompts, Settings};
    use crate::testing::{MockEmbedder, ScriptedChat, StaticLoader, VIDEO_URL};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        state: Arc<AppState>,
        loader: Arc<StaticLoader>,
        chat: Arc<ScriptedChat>,
        _dir: tempfile::TempDir,
    }

    fn fixture(backend: &str) -> Fixture {
        fixture_with_sessions(backend, 1000)
    }

    fn fixture_with_sessions(backend: &str, max_sessions: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().to_string_lossy().to_string();
        settings.vector_store.backend = backend.to_string();
        settings.server.max_sessions = max_sessions;

        let loader = Arc::new(StaticLoader::new(&[
            "In this episode we talk about building web servers with axum.",
        ]));
        let chat = Arc::new(ScriptedChat::new(|messages| {
            if messages[0].content().contains("Follow Up Input") {
                Ok("What else is said about axum?".to_string())
            } else {
                Ok("They build web servers with <axum>.".to_string())
            }
        }));

        let orchestrator = Orchestrator::with_components(
            settings,
            Prompts::default(),
            loader.clone(),
            Arc::new(MockEmbedder::new(16)),
            chat.clone(),
            chat.clone(),
        );

        let state = Arc::new(AppState::new(orchestrator));
        Fixture {
            app: router(state.clone()),
            state,
            loader,
            chat,
            _dir: dir,
        }
    }

    fn form_body(url: &str, question: &str) -> Body {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .append_pair("question", question)
            .finish();
        Body::from(encoded)
    }

    fn form_request(body: Body, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(body).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_renders_disabled_form() {
        let f = fixture("qdrant");
        let response = f
            .app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<button type=\"submit\" id=\"submit\" disabled>"));
        assert!(body.contains("id=\"spinner\""));
    }

    #[tokio::test]
    async fn test_health() {
        let f = fixture("qdrant");
        let response = f
            .app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_empty_fields_are_rejected() {
        let f = fixture("qdrant");
        let response = f
            .app
            .oneshot(form_request(form_body(VIDEO_URL, "  "), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_string(response).await;
        assert!(body.contains(MISSING_FIELDS));
        assert_eq!(f.loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_renders_escaped_answer_and_sets_cookie() {
        let f = fixture("qdrant");
        let response = f
            .app
            .oneshot(form_request(form_body(VIDEO_URL, "What is this about?"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("vidqa_session="));

        let body = body_string(response).await;
        assert!(body.contains("They build web servers with &lt;axum&gt;."));
        assert!(body.contains("readonly"));
    }

    #[tokio::test]
    async fn test_session_cookie_keeps_conversation() {
        let f = fixture("chroma");
        let cookie = format!("{}={}", SESSION_COOKIE, Uuid::new_v4());

        let first = f
            .app
            .clone()
            .oneshot(form_request(form_body(VIDEO_URL, "What is this about?"), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        // Known session, no new cookie
        assert!(first.headers().get(header::SET_COOKIE).is_none());

        let second = f
            .app
            .oneshot(form_request(form_body(VIDEO_URL, "Anything else?"), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        // Answer, then condense and answer
        assert_eq!(f.chat.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_500() {
        let f = fixture("milvus");
        let response = f
            .app
            .oneshot(form_request(form_body(VIDEO_URL, "What is this about?"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("milvus"));
        assert!(body.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn test_api_ask() {
        let f = fixture("qdrant");
        let request = Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "url": VIDEO_URL, "question": "What is this about?" })
                    .to_string(),
            ))
            .unwrap();

        let response = f.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["answer"], "They build web servers with <axum>.");
        assert_eq!(json["generated_question"], "What is this about?");
        assert!(json["sources"].as_array().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_sessions_are_capped() {
        let f = fixture_with_sessions("qdrant", 3);

        for _ in 0..10 {
            let response = f
                .app
                .clone()
                .oneshot(form_request(form_body(VIDEO_URL, "What is this about?"), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(f.state.sessions.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_evicted() {
        let f = fixture_with_sessions("qdrant", 2);
        let first = Uuid::new_v4().to_string();
        let second = Uuid::new_v4().to_string();
        let third = Uuid::new_v4().to_string();

        for id in [&first, &second, &first, &third] {
            let cookie = format!("{}={}", SESSION_COOKIE, id);
            let response = f
                .app
                .clone()
                .oneshot(form_request(form_body(VIDEO_URL, "What is this about?"), Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let sessions = f.state.sessions.lock().await;
        assert_eq!(sessions.len(), 2);
        assert!(sessions.contains_key(&first));
        assert!(sessions.contains_key(&third));
        assert!(!sessions.contains_key(&second));
    }
}
