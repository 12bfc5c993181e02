use axum::{
    async_trait,
    extract::{multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, FromRequestParts, Multipart, Path, State},
    http::{request::Parts, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::DEFAULT_MAX_UPLOAD_BYTES,
    database::Database,
    documents::DocumentTextExtractor,
    errors::{ApiError, ErrorContext, ErrorResponse},
    frq_workflow::{AttemptOutcome, FrqGradingWorkflow, FrqPractice, PracticeStore},
    llm_service::LLMService,
    models::*,
    prompts::GenerationRequest,
    study_service::{CreateStudyToolRequest, GeneratedStudyTool, StudyService},
};

// Import logging macros
use crate::{api_error, log_api_start, log_api_success};

/// Identity header set by the upstream auth provider
pub const USER_ID_HEADER: &str = "x-user-id";

type PracticeSessions = Arc<Mutex<PracticeStore>>;

#[derive(Clone)]
pub struct AppState {
    pub study_service: StudyService,
    pub frq_workflow: FrqGradingWorkflow,
    pub llm_service: LLMService,
    pub chat_service: LLMService,
    pub practice_sessions: PracticeSessions,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        db: Database,
        llm_service: LLMService,
        chat_service: LLMService,
        extractor: Arc<dyn DocumentTextExtractor>,
    ) -> Self {
        Self {
            study_service: StudyService::new(db.clone(), llm_service.clone(), extractor),
            frq_workflow: FrqGradingWorkflow::new(db, llm_service.clone()),
            llm_service,
            chat_service,
            practice_sessions: Arc::new(Mutex::new(PracticeStore::new())),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Caller identity taken from [`USER_ID_HEADER`]
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim);

        match header.map(Uuid::parse_str) {
            Some(Ok(user_id)) => Ok(CurrentUser(user_id)),
            Some(Err(_)) => Err(ApiError::Unauthorized("Invalid user identity".to_string())
                .to_response_with_context(ErrorContext::new("authenticate", "user"))),
            None => Err(ApiError::Unauthorized("Authentication required".to_string())
                .to_response_with_context(ErrorContext::new("authenticate", "user"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GradeFrqRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub scoring_guideline: Vec<String>,
    #[serde(default)]
    pub user_answer: String,
}

/// Raw verdict; fields the model left out are `null`
#[derive(Debug, Serialize, Deserialize)]
pub struct GradeFrqResponse {
    pub score: Option<serde_json::Number>,
    pub feedback: Option<String>,
}

/// Whole scores go out as integers, anything else as given
fn score_number(score: f64) -> Option<serde_json::Number> {
    if score.fract() == 0.0 && score.abs() < i64::MAX as f64 {
        Some(serde_json::Number::from(score as i64))
    } else {
        serde_json::Number::from_f64(score)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadPdfResponse {
    pub content: String,
    pub pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub question_index: usize,
    #[serde(default)]
    pub user_answer: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    #[serde(default)]
    pub user_answer: String,
}

/// Unwrap a JSON body, reporting malformed input in the usual `{error}` shape
fn json_body<T>(payload: Result<Json<T>, JsonRejection>, operation: &str, resource_type: &str) -> Result<T, ErrorResponse> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Request body exceeds the size limit".to_string())
                .to_response_with_context(ErrorContext::new(operation, resource_type))
        } else {
            api_error!(bad_request, operation, resource_type, rejection.body_text())
        }
    })
}

fn require_content(request: &GenerationRequest, operation: &str, resource_type: &str) -> Result<(), ErrorResponse> {
    if request.content.trim().is_empty() {
        return Err(api_error!(validation, operation, resource_type, "Content is required"));
    }
    Ok(())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Upload exceeds the size limit".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Pull the `file` field out of a multipart upload
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or("document.pdf").to_string();
            let data = field.bytes().await.map_err(multipart_error)?;
            if !data.is_empty() {
                return Ok((file_name, data.to_vec()));
            }
        }
    }
    Err(ApiError::BadRequest("No file uploaded".to_string()))
}

// Stateless generation endpoints

pub async fn generate_frq(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<FrqSet>, ErrorResponse> {
    log_api_start!("generate_frq");
    let request = json_body(payload, "generate_frq", "frq")?;
    require_content(&request, "generate_frq", "frq")?;

    match state.llm_service.generate_frqs(&request).await {
        Ok(set) => {
            log_api_success!("generate_frq", count = set.frqs.len(), "FRQs generated");
            Ok(Json(set))
        }
        Err(e) => Err(api_error!(llm, "generate_frq", "frq", e)),
    }
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<Quiz>, ErrorResponse> {
    log_api_start!("generate_quiz");
    let request = json_body(payload, "generate_quiz", "quiz")?;
    require_content(&request, "generate_quiz", "quiz")?;

    let quiz = state
        .llm_service
        .generate_quiz(&request)
        .await
        .map_err(|e| api_error!(llm, "generate_quiz", "quiz", e))?;

    log_api_success!("generate_quiz", count = quiz.questions.len(), "quiz generated");
    Ok(Json(quiz))
}

pub async fn generate_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<FlashcardDeck>, ErrorResponse> {
    log_api_start!("generate_flashcards");
    let request = json_body(payload, "generate_flashcards", "flashcards")?;
    require_content(&request, "generate_flashcards", "flashcards")?;

    let deck = state
        .llm_service
        .generate_flashcards(&request)
        .await
        .map_err(|e| api_error!(llm, "generate_flashcards", "flashcards", e))?;

    log_api_success!("generate_flashcards", count = deck.flashcards.len(), "flashcards generated");
    Ok(Json(deck))
}

pub async fn generate_matching(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<MatchingSet>, ErrorResponse> {
    log_api_start!("generate_matching");
    let request = json_body(payload, "generate_matching", "matching")?;
    require_content(&request, "generate_matching", "matching")?;

    let set = state
        .llm_service
        .generate_matching(&request)
        .await
        .map_err(|e| api_error!(llm, "generate_matching", "matching", e))?;

    log_api_success!("generate_matching", count = set.pairs.len(), "matching pairs generated");
    Ok(Json(set))
}

pub async fn grade_frq(
    State(state): State<AppState>,
    payload: Result<Json<GradeFrqRequest>, JsonRejection>,
) -> Result<Json<GradeFrqResponse>, ErrorResponse> {
    log_api_start!("grade_frq");
    let request = json_body(payload, "grade_frq", "frq_grade")?;

    if request.question.trim().is_empty() || request.user_answer.trim().is_empty() {
        return Err(api_error!(
            validation,
            "grade_frq",
            "frq_grade",
            "Question and answer are required"
        ));
    }

    let grade = state
        .llm_service
        .grade_frq(&request.question, &request.scoring_guideline, &request.user_answer)
        .await
        .map_err(|e| api_error!(llm, "grade_frq", "frq_grade", e))?;

    if grade.score.is_none() {
        warn!("Grading response carried no score");
    }
    log_api_success!("grade_frq", "answer graded");
    Ok(Json(GradeFrqResponse {
        score: grade.score.and_then(score_number),
        feedback: grade.feedback,
    }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ErrorResponse> {
    log_api_start!("chat");
    let request = json_body(payload, "chat", "chat")?;

    if request.messages.is_empty() {
        return Err(api_error!(validation, "chat", "chat", "Messages are required"));
    }

    let message = state
        .chat_service
        .chat(&request.messages)
        .await
        .map_err(|e| api_error!(llm, "chat", "chat", e))?;

    log_api_success!("chat", "tutor reply generated");
    Ok(Json(ChatResponse { message }))
}

pub async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadPdfResponse>, ErrorResponse> {
    log_api_start!("upload_pdf");
    let context = || ErrorContext::new("upload_pdf", "pdf");

    let (_, bytes) = read_upload(multipart)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;
    let extracted = state
        .study_service
        .extract_text(bytes)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;

    log_api_success!("upload_pdf", count = extracted.pages, "PDF text extracted");
    Ok(Json(UploadPdfResponse {
        content: extracted.text,
        pages: extracted.pages,
    }))
}

// Document endpoints

pub async fn upload_document(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ErrorResponse> {
    log_api_start!("upload_document");
    let context = || ErrorContext::new("upload_document", "document");

    let (name, bytes) = read_upload(multipart)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;
    let document = state
        .study_service
        .upload_document(user_id, name, bytes)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;

    log_api_success!("upload_document", document_id = document.id, "document uploaded");
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<DocumentSummary>>, ErrorResponse> {
    log_api_start!("list_documents");

    let documents = state
        .study_service
        .list_documents(user_id)
        .await
        .map_err(|e| e.to_response_with_context(ErrorContext::new("list_documents", "document")))?;

    log_api_success!("list_documents", count = documents.len(), "documents listed");
    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ErrorResponse> {
    log_api_start!("get_document", document_id = id);

    match state.study_service.get_document(user_id, id).await {
        Ok(document) => {
            log_api_success!("get_document", document_id = id, "document retrieved");
            Ok(Json(document))
        }
        Err(ApiError::NotFound(_)) => Err(api_error!(not_found, "get_document", "Document", id)),
        Err(e) => Err(e.to_response_with_context(
            ErrorContext::new("get_document", "document").with_id(&id.to_string()),
        )),
    }
}

// Study tool endpoints

pub async fn create_study_tool(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(document_id): Path<Uuid>,
    payload: Result<Json<CreateStudyToolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<GeneratedStudyTool>), ErrorResponse> {
    log_api_start!("create_study_tool", document_id = document_id);
    let request = json_body(payload, "create_study_tool", "study_tool")?;

    if request.count == 0 {
        return Err(api_error!(
            validation,
            "create_study_tool",
            "study_tool",
            "Count must be at least 1"
        ));
    }

    let generated = state
        .study_service
        .generate_study_tool(user_id, document_id, request)
        .await
        .map_err(|e| {
            e.to_response_with_context(
                ErrorContext::new("create_study_tool", "study_tool").with_id(&document_id.to_string()),
            )
        })?;

    if let Some(tool) = &generated.study_tool {
        log_api_success!("create_study_tool", study_tool_id = tool.id, "study tool created");
        Ok((StatusCode::CREATED, Json(generated)))
    } else {
        // Generated but unsaved: still hand back the artifact
        Ok((StatusCode::OK, Json(generated)))
    }
}

pub async fn list_study_tools(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<StudyTool>>, ErrorResponse> {
    log_api_start!("list_study_tools", document_id = document_id);

    let tools = state
        .study_service
        .list_study_tools(user_id, document_id)
        .await
        .map_err(|e| {
            e.to_response_with_context(
                ErrorContext::new("list_study_tools", "study_tool").with_id(&document_id.to_string()),
            )
        })?;

    log_api_success!("list_study_tools", count = tools.len(), "study tools listed");
    Ok(Json(tools))
}

pub async fn get_study_tool(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudyTool>, ErrorResponse> {
    log_api_start!("get_study_tool", study_tool_id = id);

    match state.study_service.get_study_tool(user_id, id).await {
        Ok(tool) => {
            log_api_success!("get_study_tool", study_tool_id = id, "study tool retrieved");
            Ok(Json(tool))
        }
        Err(ApiError::NotFound(_)) => Err(api_error!(not_found, "get_study_tool", "Study tool", id)),
        Err(e) => Err(e.to_response_with_context(
            ErrorContext::new("get_study_tool", "study_tool").with_id(&id.to_string()),
        )),
    }
}

// FRQ attempt endpoints

pub async fn submit_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(study_tool_id): Path<Uuid>,
    payload: Result<Json<SubmitAttemptRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AttemptOutcome>), ErrorResponse> {
    log_api_start!("submit_attempt", study_tool_id = study_tool_id);
    let request = json_body(payload, "submit_attempt", "frq_attempt")?;

    let outcome = state
        .frq_workflow
        .submit(user_id, study_tool_id, request.question_index, &request.user_answer)
        .await
        .map_err(|e| {
            e.to_response_with_context(
                ErrorContext::new("submit_attempt", "frq_attempt").with_id(&study_tool_id.to_string()),
            )
        })?;

    log_api_success!("submit_attempt", study_tool_id = study_tool_id, "attempt graded and stored");
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_attempt_history(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(study_tool_id): Path<Uuid>,
) -> Result<Json<AttemptHistory>, ErrorResponse> {
    log_api_start!("get_attempt_history", study_tool_id = study_tool_id);
    let context = || ErrorContext::new("get_attempt_history", "frq_attempt").with_id(&study_tool_id.to_string());

    // 404 for a set the caller cannot see, not an empty history
    state
        .study_service
        .get_study_tool(user_id, study_tool_id)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;

    let history = state
        .frq_workflow
        .history(user_id, study_tool_id)
        .await
        .map_err(|e| e.to_response_with_context(context()))?;

    log_api_success!("get_attempt_history", count = history.total_attempts(), "attempt history loaded");
    Ok(Json(history))
}

// Practice session endpoints

fn lock_sessions(sessions: &PracticeSessions) -> Result<MutexGuard<'_, PracticeStore>, ApiError> {
    sessions
        .lock()
        .map_err(|_| ApiError::InternalError("practice session store is poisoned".to_string()))
}

/// Run `f` against a session owned by `user_id` while holding the session lock
fn with_session<R>(
    sessions: &PracticeSessions,
    session_id: Uuid,
    user_id: Uuid,
    f: impl FnOnce(&mut FrqPractice) -> Result<R, ApiError>,
) -> Result<R, ApiError> {
    let mut sessions = lock_sessions(sessions)?;

    match sessions.get_mut(&session_id) {
        Some(session) if session.user_id == user_id => f(session),
        _ => Err(ApiError::NotFound(format!("Practice session '{}' not found", session_id))),
    }
}

pub async fn start_practice(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(study_tool_id): Path<Uuid>,
) -> Result<(StatusCode, Json<FrqPractice>), ErrorResponse> {
    log_api_start!("start_practice", study_tool_id = study_tool_id);

    let set = state
        .frq_workflow
        .load_frq_set(user_id, study_tool_id)
        .await
        .map_err(|e| {
            e.to_response_with_context(
                ErrorContext::new("start_practice", "practice").with_id(&study_tool_id.to_string()),
            )
        })?;

    let practice = FrqPractice::new(user_id, study_tool_id, set.frqs.len());
    let evicted = lock_sessions(&state.practice_sessions)
        .map(|mut sessions| sessions.insert(practice.clone()))
        .map_err(|e| e.to_response_with_context(ErrorContext::new("start_practice", "practice")))?;

    info!(
        session_id = %practice.session_id,
        study_tool_id = %study_tool_id,
        question_count = practice.question_count,
        evicted_sessions = evicted.len(),
        "Practice session started"
    );
    Ok((StatusCode::CREATED, Json(practice)))
}

pub async fn get_practice(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FrqPractice>, ErrorResponse> {
    log_api_start!("get_practice", session_id = session_id);

    with_session(&state.practice_sessions, session_id, user_id, |session| Ok(session.clone()))
        .map(Json)
        .map_err(|e| {
            e.to_response_with_context(ErrorContext::new("get_practice", "practice").with_id(&session_id.to_string()))
        })
}

pub async fn save_draft(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((session_id, index)): Path<(Uuid, usize)>,
    payload: Result<Json<DraftRequest>, JsonRejection>,
) -> Result<Json<FrqPractice>, ErrorResponse> {
    log_api_start!("save_draft", session_id = session_id);
    let request = json_body(payload, "save_draft", "practice")?;

    with_session(&state.practice_sessions, session_id, user_id, |session| {
        session.set_draft(index, request.user_answer)?;
        Ok(session.clone())
    })
    .map(Json)
    .map_err(|e| e.to_response_with_context(ErrorContext::new("save_draft", "practice").with_id(&session_id.to_string())))
}

/// Grade the saved draft for one question.
///
/// The session lock is released while the answer is graded, so other questions in the
/// same session can be drafted and submitted concurrently.
pub async fn submit_draft(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<serde_json::Value>, ErrorResponse> {
    log_api_start!("submit_draft", session_id = session_id);
    let context = || ErrorContext::new("submit_draft", "practice").with_id(&session_id.to_string());

    let (study_tool_id, answer) = with_session(&state.practice_sessions, session_id, user_id, |session| {
        let answer = session.begin_grading(index)?;
        Ok((session.study_tool_id, answer))
    })
    .map_err(|e| e.to_response_with_context(context()))?;

    let result = state
        .frq_workflow
        .submit(user_id, study_tool_id, index, &answer)
        .await;

    // The session may have been ended or evicted while grading; the attempt still stands
    let session = match with_session(&state.practice_sessions, session_id, user_id, |session| {
        match &result {
            Ok(outcome) => session.complete(index, outcome.attempt.score)?,
            Err(_) => session.fail(index)?,
        }
        Ok(session.clone())
    }) {
        Ok(session) => Some(session),
        Err(ApiError::NotFound(_)) => {
            warn!(session_id = %session_id, "Practice session ended before grading finished");
            None
        }
        Err(e) => return Err(e.to_response_with_context(context())),
    };

    let outcome = result.map_err(|e| e.to_response_with_context(context()))?;

    log_api_success!("submit_draft", study_tool_id = study_tool_id, "practice answer graded");
    Ok(Json(json!({
        "session": session,
        "attempt": outcome.attempt,
        "history": outcome.history,
    })))
}

/// End a practice session and release its state
pub async fn end_practice(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    log_api_start!("end_practice", session_id = session_id);
    let context = || ErrorContext::new("end_practice", "practice").with_id(&session_id.to_string());

    let mut sessions = lock_sessions(&state.practice_sessions).map_err(|e| e.to_response_with_context(context()))?;
    let owned = sessions.get_mut(&session_id).is_some_and(|session| session.user_id == user_id);
    match owned.then(|| sessions.remove(session_id)).flatten() {
        Some(_) => {
            info!(session_id = %session_id, "Practice session ended");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound(format!("Practice session '{}' not found", session_id))
            .to_response_with_context(context())),
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health))
        // Stateless generation and grading
        .route("/api/generate-frq", post(generate_frq))
        .route("/api/generate-quiz", post(generate_quiz))
        .route("/api/generate-flashcards", post(generate_flashcards))
        .route("/api/generate-matching", post(generate_matching))
        .route("/api/grade-frq", post(grade_frq))
        .route("/api/chat", post(chat))
        .route("/api/upload-pdf", post(upload_pdf))
        // Documents
        .route("/api/documents", post(upload_document).get(list_documents))
        .route("/api/documents/:id", get(get_document))
        .route(
            "/api/documents/:id/study-tools",
            post(create_study_tool).get(list_study_tools),
        )
        // Study tools and FRQ attempts
        .route("/api/study-tools/:id", get(get_study_tool))
        .route(
            "/api/study-tools/:id/attempts",
            post(submit_attempt).get(get_attempt_history),
        )
        .route("/api/study-tools/:id/practice", post(start_practice))
        // Practice sessions
        .route("/api/practice/:session_id", get(get_practice).delete(end_practice))
        .route("/api/practice/:session_id/questions/:index/draft", put(save_draft))
        .route("/api/practice/:session_id/questions/:index/submit", post(submit_draft))
        .layer(body_limit)
        .with_state(state)
}
