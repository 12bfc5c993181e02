#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use study_assistant::{
    config::LLMConfig, AppState, Database, LLMProviderType, LLMService, PdfTextExtractor,
};
use uuid::Uuid;

/// Local stand-in for an OpenAI-compatible `/chat/completions` endpoint.
///
/// Replies are served in order; the last one repeats once the script runs out.
#[derive(Clone)]
pub struct FakeLlm {
    pub base_url: String,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

#[derive(Clone)]
struct StubState {
    replies: Arc<Vec<String>>,
    status: StatusCode,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn chat_completions(State(stub): State<StubState>, Json(body): Json<Value>) -> impl IntoResponse {
    let call = stub.calls.fetch_add(1, Ordering::SeqCst);
    stub.requests.lock().unwrap().push(body);

    if !stub.status.is_success() {
        return (stub.status, Json(json!({ "error": { "message": "upstream unavailable" } })));
    }

    let reply = stub
        .replies
        .get(call)
        .or_else(|| stub.replies.last())
        .cloned()
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        })),
    )
}

impl FakeLlm {
    pub async fn start(replies: &[&str]) -> Self {
        Self::spawn(replies.iter().map(|r| r.to_string()).collect(), StatusCode::OK).await
    }

    pub async fn failing(status: StatusCode) -> Self {
        Self::spawn(Vec::new(), status).await
    }

    async fn spawn(replies: Vec<String>, status: StatusCode) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stub = StubState {
            replies: Arc::new(replies),
            status,
            calls: Arc::clone(&calls),
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(stub);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            calls,
            requests,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn config(&self) -> LLMConfig {
        LLMConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(self.base_url.clone()),
            provider: LLMProviderType::OpenAI,
            model: Some("gpt-test".to_string()),
        }
    }

    pub fn service(&self) -> LLMService {
        LLMService::from_config(&self.config())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub state: AppState,
}

pub async fn test_app(llm: LLMService) -> TestApp {
    test_app_with_limit(llm, study_assistant::config::DEFAULT_MAX_UPLOAD_BYTES).await
}

pub async fn test_app_with_limit(llm: LLMService, max_upload_bytes: usize) -> TestApp {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let state = AppState::new(db.clone(), llm.clone(), llm, Arc::new(PdfTextExtractor))
        .with_upload_limit(max_upload_bytes);
    let server = TestServer::new(study_assistant::create_router(state.clone())).unwrap();
    TestApp { server, db, state }
}

pub async fn app_with(fake: &FakeLlm) -> TestApp {
    test_app(fake.service()).await
}

/// Service whose provider has no API key
pub fn keyless_service(base_url: &str) -> LLMService {
    LLMService::from_config(&LLMConfig {
        api_key: None,
        base_url: Some(base_url.to_string()),
        provider: LLMProviderType::OpenAI,
        model: None,
    })
}

pub fn user_header(user_id: Uuid) -> (axum::http::HeaderName, axum::http::HeaderValue) {
    (
        axum::http::HeaderName::from_static("x-user-id"),
        axum::http::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    )
}

pub const NEWTON_TEXT: &str = "Newton's first law states that an object in motion stays in motion.";

pub fn frq_reply() -> String {
    json!({
        "frqs": [
            {
                "prompt": "Explain Newton's first law of motion.",
                "scoring_guideline": [
                    "1 point for stating that motion continues without a net force",
                    "1 point for naming inertia"
                ],
                "sample_answer": "An object keeps its velocity unless a net force acts on it; this is inertia."
            },
            {
                "prompt": "Describe an everyday example of inertia.",
                "scoring_guideline": ["1 point for a valid example", "1 point for linking it to inertia"],
                "sample_answer": "Passengers lurch forward when a bus brakes because their bodies keep moving."
            }
        ]
    })
    .to_string()
}

pub fn grade_reply(score: f64, earned: f64, possible: f64, feedback: &str) -> String {
    json!({
        "score": score,
        "feedback": feedback,
        "points_earned": earned,
        "points_possible": possible
    })
    .to_string()
}
