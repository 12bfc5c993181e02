//! FRQ grading workflow: submit an answer, grade it against the question's rubric,
//! append the attempt, and hand back the full history as stored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::errors::ApiError;
use crate::llm_service::LLMService;
use crate::models::{AttemptHistory, FrqAttempt, FrqGrade, FrqItem, FrqSet, NewFrqAttempt, TOTAL_POSSIBLE_SCORE};

use crate::{log_service_start, log_service_success, log_validation};

/// Scale `earned` of `possible` rubric points onto 0..=10, rounding to nearest
pub fn normalize_score(earned: f64, possible: f64) -> Option<i64> {
    if !(possible > 0.0) || !earned.is_finite() {
        return None;
    }
    let scaled = (TOTAL_POSSIBLE_SCORE as f64 * earned / possible).round();
    Some((scaled as i64).clamp(0, TOTAL_POSSIBLE_SCORE))
}

/// Final 0..=10 score for a grading verdict.
///
/// A usable raw tally is rescaled server-side; otherwise the model's own score is
/// rounded and clamped. `None` when the verdict carries neither.
pub fn resolve_score(grade: &FrqGrade) -> Option<i64> {
    if let (Some(earned), Some(possible)) = (grade.points_earned, grade.points_possible) {
        if let Some(score) = normalize_score(earned, possible) {
            if let Some(reported) = grade.score {
                if reported.round() as i64 != score {
                    warn!(
                        reported_score = reported,
                        points_earned = earned,
                        points_possible = possible,
                        normalized_score = score,
                        "Model score disagrees with its own point tally, using the tally"
                    );
                }
            }
            return Some(score);
        }
    }

    let reported = grade.score.filter(|s| s.is_finite())?;
    let rounded = reported.round() as i64;
    let clamped = rounded.clamp(0, TOTAL_POSSIBLE_SCORE);
    if clamped != rounded {
        warn!(reported_score = reported, clamped_score = clamped, "Model score outside 0-10, clamped");
    }
    Some(clamped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    Unanswered,
    Grading,
    Graded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionProgress {
    pub state: QuestionState,
    pub draft: String,
    pub last_score: Option<i64>,
}

impl Default for QuestionProgress {
    fn default() -> Self {
        Self {
            state: QuestionState::Unanswered,
            draft: String::new(),
            last_score: None,
        }
    }
}

/// Per-question answering state for one FRQ set.
///
/// Unanswered -> Grading -> Graded, and back to Unanswered on the next draft. A failed
/// grade returns the question to Unanswered with its draft intact; only a persisted
/// attempt clears the draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrqPractice {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub study_tool_id: Uuid,
    pub question_count: usize,
    pub questions: BTreeMap<usize, QuestionProgress>,
}

impl FrqPractice {
    pub fn new(user_id: Uuid, study_tool_id: Uuid, question_count: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            study_tool_id,
            question_count,
            questions: (0..question_count).map(|i| (i, QuestionProgress::default())).collect(),
        }
    }

    fn question_mut(&mut self, index: usize) -> Result<&mut QuestionProgress, ApiError> {
        let count = self.question_count;
        self.questions.get_mut(&index).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Question index {} is out of range for a set of {} questions",
                index, count
            ))
        })
    }

    pub fn state(&self, index: usize) -> Option<QuestionState> {
        self.questions.get(&index).map(|q| q.state)
    }

    pub fn set_draft(&mut self, index: usize, answer: String) -> Result<(), ApiError> {
        let question = self.question_mut(index)?;
        if question.state == QuestionState::Grading {
            return Err(ApiError::Conflict(format!("Question {} is being graded", index)));
        }
        question.draft = answer;
        question.state = QuestionState::Unanswered;
        Ok(())
    }

    /// Move a question into Grading and return the answer to grade
    pub fn begin_grading(&mut self, index: usize) -> Result<String, ApiError> {
        let question = self.question_mut(index)?;
        if question.state == QuestionState::Grading {
            return Err(ApiError::Conflict(format!("Question {} is already being graded", index)));
        }
        if question.draft.trim().is_empty() {
            return Err(ApiError::ValidationError("Answer must not be empty".to_string()));
        }
        question.state = QuestionState::Grading;
        Ok(question.draft.clone())
    }

    /// Record a persisted attempt: the question is Graded and its draft cleared
    pub fn complete(&mut self, index: usize, score: i64) -> Result<(), ApiError> {
        let question = self.question_mut(index)?;
        question.state = QuestionState::Graded;
        question.last_score = Some(score);
        question.draft.clear();
        Ok(())
    }

    /// Grading failed: reopen the question with the typed answer preserved
    pub fn fail(&mut self, index: usize) -> Result<(), ApiError> {
        let question = self.question_mut(index)?;
        question.state = QuestionState::Unanswered;
        Ok(())
    }

    pub fn is_grading(&self) -> bool {
        self.questions.values().any(|q| q.state == QuestionState::Grading)
    }
}

/// Live practice sessions a single user may hold at once
pub const MAX_PRACTICE_SESSIONS_PER_USER: usize = 20;

/// In-memory practice sessions, capped per user.
///
/// Starting a session past the cap evicts that user's oldest session, preferring one
/// with no answer in flight.
#[derive(Debug, Default)]
pub struct PracticeStore {
    sessions: HashMap<Uuid, FrqPractice>,
    order: VecDeque<Uuid>,
}

impl PracticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `practice` and return the ids of any sessions evicted to make room
    pub fn insert(&mut self, practice: FrqPractice) -> Vec<Uuid> {
        let user_id = practice.user_id;
        let mut evicted = Vec::new();

        while self.count_for(user_id) >= MAX_PRACTICE_SESSIONS_PER_USER {
            let owned: Vec<Uuid> = self
                .order
                .iter()
                .copied()
                .filter(|id| self.sessions.get(id).is_some_and(|s| s.user_id == user_id))
                .collect();
            let victim = owned
                .iter()
                .copied()
                .find(|id| self.sessions.get(id).is_some_and(|s| !s.is_grading()))
                .or_else(|| owned.first().copied());

            match victim {
                Some(id) => {
                    self.remove(id);
                    evicted.push(id);
                }
                None => break,
            }
        }

        self.order.push_back(practice.session_id);
        self.sessions.insert(practice.session_id, practice);
        evicted
    }

    pub fn get_mut(&mut self, session_id: &Uuid) -> Option<&mut FrqPractice> {
        self.sessions.get_mut(session_id)
    }

    pub fn remove(&mut self, session_id: Uuid) -> Option<FrqPractice> {
        self.order.retain(|id| *id != session_id);
        self.sessions.remove(&session_id)
    }

    pub fn count_for(&self, user_id: Uuid) -> usize {
        self.sessions.values().filter(|s| s.user_id == user_id).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Result of one graded and persisted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub attempt: FrqAttempt,
    pub history: AttemptHistory,
}

#[derive(Clone)]
pub struct FrqGradingWorkflow {
    db: Database,
    llm: LLMService,
}

impl FrqGradingWorkflow {
    pub fn new(db: Database, llm: LLMService) -> Self {
        Self { db, llm }
    }

    /// Load an owned FRQ set; any other artifact kind is rejected
    pub async fn load_frq_set(&self, user_id: Uuid, study_tool_id: Uuid) -> Result<FrqSet, ApiError> {
        let tool = self
            .db
            .get_study_tool(study_tool_id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Study tool '{}' not found", study_tool_id)))?;

        match tool.artifact.as_frq_set() {
            Some(set) => Ok(set.clone()),
            None => Err(ApiError::BadRequest(format!(
                "Study tool '{}' is a {} set, not an FRQ set",
                study_tool_id,
                tool.artifact.kind().as_str()
            ))),
        }
    }

    fn question_at(set: &FrqSet, question_index: usize) -> Result<&FrqItem, ApiError> {
        set.frqs.get(question_index).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Question index {} is out of range for a set of {} questions",
                question_index,
                set.frqs.len()
            ))
        })
    }

    /// Grade `user_answer` for one question, append the attempt, and return the reloaded history
    pub async fn submit(
        &self,
        user_id: Uuid,
        study_tool_id: Uuid,
        question_index: usize,
        user_answer: &str,
    ) -> Result<AttemptOutcome, ApiError> {
        if user_answer.trim().is_empty() {
            log_validation!(failure, "frq_attempt", error = "answer is empty");
            return Err(ApiError::ValidationError("Answer must not be empty".to_string()));
        }

        let start = Instant::now();
        log_service_start!("frq_workflow", "submit", study_tool_id = study_tool_id, question_index = question_index);

        let set = self.load_frq_set(user_id, study_tool_id).await?;
        let item = Self::question_at(&set, question_index)?;

        let grade = self
            .llm
            .grade_frq(&item.prompt, &item.scoring_guideline, user_answer)
            .await?;

        let score = resolve_score(&grade)
            .ok_or_else(|| ApiError::Parse("grading response carried no usable score".to_string()))?;
        let feedback = grade.feedback.unwrap_or_default();
        debug!(
            study_tool_id = %study_tool_id,
            question_index = question_index,
            score = score,
            "Answer graded"
        );

        // A storage failure here loses the graded attempt; it is not retried
        let attempt = self
            .db
            .insert_attempt(NewFrqAttempt {
                user_id,
                study_tool_id,
                question_index: question_index as i64,
                user_answer: user_answer.to_string(),
                feedback,
                score,
            })
            .await?;

        let history = self.history(user_id, study_tool_id).await?;

        log_service_success!(
            "frq_workflow",
            "submit",
            study_tool_id = study_tool_id,
            duration_ms = start.elapsed().as_millis() as u64
        );

        Ok(AttemptOutcome { attempt, history })
    }

    /// Every attempt on the set, grouped by question, read straight from the store
    pub async fn history(&self, user_id: Uuid, study_tool_id: Uuid) -> Result<AttemptHistory, ApiError> {
        let attempts = self.db.list_attempts(study_tool_id, user_id).await?;
        Ok(AttemptHistory::from_newest_first(attempts))
    }
}
