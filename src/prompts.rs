//! Instruction text sent to the LLM for each artifact kind and for grading.
//!
//! Every builder is pure: identical inputs produce identical text.

use serde::{Deserialize, Serialize};

/// Content prefix length for FRQ generation
pub const FRQ_CONTENT_LIMIT: usize = 4000;
/// Content prefix length for quiz, flashcard and matching generation
pub const STUDY_CONTENT_LIMIT: usize = 3000;

/// System message accompanying every JSON generation or grading request
pub const JSON_SYSTEM_MESSAGE: &str = "You are a helpful assistant that outputs JSON.";

pub const TUTOR_SYSTEM_PROMPT: &str = "You are a helpful AI study assistant. You help students understand concepts, answer questions, and provide study guidance. Be clear, concise, and educational.";

/// Wire shape of a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub content: String,
    pub count: u32,
    pub difficulty: String,
    #[serde(default)]
    pub topics: Option<String>,
}

/// First `limit` characters of `content`
pub fn truncate_chars(content: &str, limit: usize) -> &str {
    match content.char_indices().nth(limit) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

fn topic_clause(topics: Option<&str>) -> String {
    match topics.map(str::trim) {
        Some(topics) if !topics.is_empty() => format!(" focusing on: {}", topics),
        _ => String::new(),
    }
}

pub fn frq_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are an educational content generator specializing in AP-style Free Response Questions (FRQs).

Based on the following study content{topics}, generate {count} FRQ (Free Response Question) prompts with a {difficulty} difficulty level.

Content:
{content}

For each FRQ, provide:
1. The Question Prompt (scenario based or conceptual). Start it with an AP directive verb: define, explain, describe, identify, compare, etc.
2. A detailed Scoring Guideline (rubric) itemizing how each point is awarded.
3. A Sample High-Quality Answer.

Generate the output in the following JSON format:
{{
  "frqs": [
    {{
      "prompt": "The detailed question prompt...",
      "scoring_guideline": [
        "1 point for explaining X",
        "1 point for identifying Y"
      ],
      "sample_answer": "A perfect response would be..."
    }}
  ]
}}

Ensure the questions encourage critical thinking and deep understanding.
Return ONLY valid JSON, no text outside the JSON object."#,
        topics = topic_clause(request.topics.as_deref()),
        count = request.count,
        difficulty = request.difficulty,
        content = truncate_chars(&request.content, FRQ_CONTENT_LIMIT),
    )
}

pub fn quiz_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are an educational content generator. Always respond with valid JSON only.

Based on the following study content{topics}, generate {count} multiple-choice quiz questions with {difficulty} difficulty level.

Content:
{content}

Generate quiz questions in the following JSON format:
{{
  "questions": [
    {{
      "question": "Question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Brief explanation of why this is correct"
    }}
  ]
}}

Make sure:
- correctAnswer is the index (0-3) of the correct option
- All questions have exactly 4 options
- Questions are appropriate for {difficulty} level
- Include helpful explanations
- Return ONLY valid JSON, no additional text."#,
        topics = topic_clause(request.topics.as_deref()),
        count = request.count,
        difficulty = request.difficulty,
        content = truncate_chars(&request.content, STUDY_CONTENT_LIMIT),
    )
}

pub fn flashcards_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are an educational content generator. Always respond with valid JSON only.

Based on the following study content{topics}, generate {count} flashcards with a {difficulty} difficulty level.

Content:
{content}

Generate flashcards in the following JSON format:
{{
  "flashcards": [
    {{
      "front": "Question or term",
      "back": "Answer or definition"
    }}
  ]
}}

Make sure the flashcards are educational, clear, and appropriate for {difficulty} level. Return ONLY valid JSON, no additional text."#,
        topics = topic_clause(request.topics.as_deref()),
        count = request.count,
        difficulty = request.difficulty,
        content = truncate_chars(&request.content, STUDY_CONTENT_LIMIT),
    )
}

pub fn matching_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are an educational content generator. Always respond with valid JSON only.

Based on the following study content{topics}, generate {count} term-definition pairs for a matching exercise with {difficulty} difficulty level.

Content:
{content}

Generate matching pairs in the following JSON format:
{{
  "pairs": [
    {{
      "term": "Key term or concept",
      "definition": "Clear definition or explanation"
    }}
  ]
}}

Make sure:
- Terms are concise (1-3 words typically)
- Definitions are clear and educational
- Pairs are appropriate for {difficulty} level
- Each term has a unique, distinct definition
- Return ONLY valid JSON, no additional text."#,
        topics = topic_clause(request.topics.as_deref()),
        count = request.count,
        difficulty = request.difficulty,
        content = truncate_chars(&request.content, STUDY_CONTENT_LIMIT),
    )
}

/// Grading instruction for one answer against its rubric
pub fn grading_prompt(question: &str, scoring_guideline: &[String], user_answer: &str) -> String {
    let rubric = serde_json::to_string_pretty(scoring_guideline).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are an expert AP grader. Grade the student response based strictly on the provided scoring guideline.

Question: "{question}"

Scoring Guideline:
{rubric}

Student Answer: "{user_answer}"

INSTRUCTIONS:
1. Determine how many points the student earned based strictly on the guideline.
2. Determine the TOTAL POSSIBLE points from the guideline itself.
3. SCALE the score to be out of 10 (e.g. 4/4 is 10, 2/4 is 5). Round to the nearest integer.
4. Write feedback explaining which points were awarded and which were missed.

Return ONLY valid JSON in this format:
{{
  "score": 7,
  "feedback": "You successfully identified...",
  "points_earned": 3,
  "points_possible": 4
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str, topics: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            content: content.to_string(),
            count: 3,
            difficulty: "hard".to_string(),
            topics: topics.map(str::to_string),
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_frq_prompt_contents() {
        let prompt = frq_prompt(&request("Photosynthesis converts light to chemical energy.", None));

        assert!(prompt.contains("generate 3 FRQ"));
        assert!(prompt.contains("hard difficulty"));
        assert!(prompt.contains("Photosynthesis converts light"));
        assert!(prompt.contains("\"frqs\""));
        assert!(prompt.contains("scoring_guideline"));
        assert!(prompt.contains("sample_answer"));
        assert!(prompt.contains("explain"));
        assert!(!prompt.contains("focusing on"));
    }

    #[test]
    fn test_frq_prompt_truncates_content() {
        let long_content = format!("{}{}", "a".repeat(FRQ_CONTENT_LIMIT), "TAIL");
        let prompt = frq_prompt(&request(&long_content, None));

        assert!(prompt.contains(&"a".repeat(FRQ_CONTENT_LIMIT)));
        assert!(!prompt.contains("TAIL"));

        let quiz = quiz_prompt(&request(&long_content, None));
        assert!(!quiz.contains(&"a".repeat(STUDY_CONTENT_LIMIT + 1)));
    }

    #[test]
    fn test_topic_clause_only_when_present() {
        let focused = frq_prompt(&request("content", Some("cell respiration")));
        assert!(focused.contains("study content focusing on: cell respiration,"));

        let blank = matching_prompt(&request("content", Some("   ")));
        assert!(!blank.contains("focusing on"));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let req = request("Newton's laws", Some("inertia"));
        assert_eq!(frq_prompt(&req), frq_prompt(&req));
        assert_eq!(flashcards_prompt(&req), flashcards_prompt(&req));
    }

    #[test]
    fn test_grading_prompt_embeds_rubric() {
        let rubric = vec![
            "1 point for identifying X".to_string(),
            "1 point for explaining Y".to_string(),
        ];
        let prompt = grading_prompt("Explain X and Y.", &rubric, "X is a thing.");

        assert!(prompt.contains("Question: \"Explain X and Y.\""));
        assert!(prompt.contains("\"1 point for identifying X\""));
        assert!(prompt.contains("Student Answer: \"X is a thing.\""));
        assert!(prompt.contains("TOTAL POSSIBLE"));
        assert!(prompt.contains("\"score\""));
        assert!(prompt.contains("\"feedback\""));
    }
}
