use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Normalization target for every FRQ attempt score
pub const TOTAL_POSSIBLE_SCORE: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub content: String,
    pub pages: i64,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a document without its extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub name: String,
    pub pages: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            name: document.name.clone(),
            pages: document.pages,
            created_at: document.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrqItem {
    pub prompt: String,
    pub scoring_guideline: Vec<String>,
    pub sample_answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingPair {
    pub term: String,
    pub definition: String,
}

/// Absent and `null` both decode as an empty list
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Generation payloads as the LLM returns them; a missing or null array decodes as empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrqSet {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub frqs: Vec<FrqItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingSet {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pairs: Vec<MatchingPair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Quiz,
    Flashcards,
    Matching,
    Frq,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Quiz => "quiz",
            ArtifactKind::Flashcards => "flashcards",
            ArtifactKind::Matching => "matching",
            ArtifactKind::Frq => "frq",
        }
    }

    /// Human label used when titling a saved study tool
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Quiz => "Quiz",
            ArtifactKind::Flashcards => "Flashcards",
            ArtifactKind::Matching => "Matching",
            ArtifactKind::Frq => "FRQ Practice",
        }
    }
}

/// A generated study tool, one record shape per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Artifact {
    Quiz(Quiz),
    Flashcards(FlashcardDeck),
    Matching(MatchingSet),
    Frq(FrqSet),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Quiz(_) => ArtifactKind::Quiz,
            Artifact::Flashcards(_) => ArtifactKind::Flashcards,
            Artifact::Matching(_) => ArtifactKind::Matching,
            Artifact::Frq(_) => ArtifactKind::Frq,
        }
    }

    pub fn item_count(&self) -> usize {
        match self {
            Artifact::Quiz(quiz) => quiz.questions.len(),
            Artifact::Flashcards(deck) => deck.flashcards.len(),
            Artifact::Matching(set) => set.pairs.len(),
            Artifact::Frq(set) => set.frqs.len(),
        }
    }

    pub fn as_frq_set(&self) -> Option<&FrqSet> {
        match self {
            Artifact::Frq(set) => Some(set),
            _ => None,
        }
    }
}

/// Parameters a study tool was generated with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub count: u32,
    pub difficulty: String,
    #[serde(default)]
    pub topics: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyTool {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub params: GenerationParams,
    #[serde(flatten)]
    pub artifact: Artifact,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStudyTool {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub params: GenerationParams,
    pub artifact: Artifact,
}

/// One scored submission against one question of an FRQ set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrqAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub study_tool_id: Uuid,
    pub question_index: i64,
    pub user_answer: String,
    pub feedback: String,
    pub score: i64,
    pub total_possible_score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFrqAttempt {
    pub user_id: Uuid,
    pub study_tool_id: Uuid,
    pub question_index: i64,
    pub user_answer: String,
    pub feedback: String,
    pub score: i64,
}

/// Attempts grouped by question index, each group newest-first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptHistory(pub BTreeMap<i64, Vec<FrqAttempt>>);

impl AttemptHistory {
    /// Group attempts that are already ordered newest-first
    pub fn from_newest_first(attempts: Vec<FrqAttempt>) -> Self {
        let mut grouped: BTreeMap<i64, Vec<FrqAttempt>> = BTreeMap::new();
        for attempt in attempts {
            grouped.entry(attempt.question_index).or_default().push(attempt);
        }
        Self(grouped)
    }

    pub fn for_question(&self, question_index: i64) -> &[FrqAttempt] {
        self.0.get(&question_index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_attempts(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

/// Raw grading verdict; `score` and `feedback` have no defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrqGrade {
    pub score: Option<f64>,
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_possible: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt(question_index: i64, score: i64) -> FrqAttempt {
        FrqAttempt {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            study_tool_id: Uuid::nil(),
            question_index,
            user_answer: "answer".to_string(),
            feedback: "feedback".to_string(),
            score,
            total_possible_score: TOTAL_POSSIBLE_SCORE,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_artifact_wire_shape() {
        let artifact = Artifact::Frq(FrqSet {
            frqs: vec![FrqItem {
                prompt: "Explain inertia.".to_string(),
                scoring_guideline: vec!["1 point for defining inertia".to_string()],
                sample_answer: "Inertia is...".to_string(),
            }],
        });

        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["type"], "frq");
        assert_eq!(value["data"]["frqs"][0]["prompt"], "Explain inertia.");

        let decoded: Artifact = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.kind(), ArtifactKind::Frq);
        assert_eq!(decoded.item_count(), 1);
    }

    #[test]
    fn test_missing_array_key_decodes_empty() {
        let quiz: Quiz = serde_json::from_value(json!({})).unwrap();
        assert!(quiz.questions.is_empty());

        let deck: FlashcardDeck = serde_json::from_value(json!({ "cards": [] })).unwrap();
        assert!(deck.flashcards.is_empty());
    }

    #[test]
    fn test_null_array_decodes_empty() {
        let set: FrqSet = serde_json::from_value(json!({ "frqs": null })).unwrap();
        assert!(set.frqs.is_empty());

        let quiz: Quiz = serde_json::from_value(json!({ "questions": null })).unwrap();
        assert!(quiz.questions.is_empty());

        let deck: FlashcardDeck = serde_json::from_value(json!({ "flashcards": null })).unwrap();
        assert!(deck.flashcards.is_empty());

        let pairs: MatchingSet = serde_json::from_value(json!({ "pairs": null })).unwrap();
        assert!(pairs.pairs.is_empty());
    }

    #[test]
    fn test_mismatched_payload_is_rejected() {
        let result = serde_json::from_value::<Artifact>(json!({
            "type": "quiz",
            "data": { "questions": "not a list" }
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<Artifact>(json!({ "type": "essay", "data": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn test_history_groups_preserve_order() {
        let newest = attempt(0, 8);
        let older = attempt(0, 4);
        let other = attempt(1, 10);

        let history = AttemptHistory::from_newest_first(vec![newest.clone(), other.clone(), older.clone()]);

        assert_eq!(history.total_attempts(), 3);
        assert_eq!(history.for_question(0), &[newest, older]);
        assert_eq!(history.for_question(1), &[other]);
        assert!(history.for_question(7).is_empty());
    }

    #[test]
    fn test_grade_missing_fields_are_null() {
        let grade: FrqGrade = serde_json::from_value(json!({ "feedback": "Good" })).unwrap();
        assert_eq!(grade.score, None);

        let value = serde_json::to_value(&grade).unwrap();
        assert!(value["score"].is_null());
        assert_eq!(value["feedback"], "Good");
    }
}
