use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::*;

use crate::log_db_operation;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).with_context(|| format!("invalid uuid in column '{}'", column))
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        // Each connection to an in-memory database is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| "failed to open database")?;

        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                pages INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS study_tools (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                type TEXT NOT NULL,
                title TEXT NOT NULL,
                params TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS frq_attempts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                study_tool_id TEXT NOT NULL,
                question_index INTEGER NOT NULL,
                user_answer TEXT NOT NULL,
                feedback TEXT NOT NULL,
                score INTEGER NOT NULL,
                total_possible_score INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (study_tool_id) REFERENCES study_tools(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_frq_attempts_tool ON frq_attempts (study_tool_id, user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_study_tools_document ON study_tools (document_id, user_id)")
            .execute(&self.pool)
            .await?;

        log_db_operation!(info, "migration", "schema is up to date");
        Ok(())
    }

    // Document operations
    pub async fn create_document(&self, user_id: Uuid, name: String, content: String, pages: i64) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            user_id,
            name,
            content,
            pages,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO documents (id, user_id, name, content, pages, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(document.id.to_string())
        .bind(document.user_id.to_string())
        .bind(&document.name)
        .bind(&document.content)
        .bind(document.pages)
        .bind(document.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        log_db_operation!(debug, "create_document", id = document.id);
        Ok(document)
    }

    pub async fn get_document(&self, id: Uuid, user_id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    /// Documents owned by `user_id`, newest first
    pub async fn list_documents(&self, user_id: Uuid) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC")
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        log_db_operation!(debug, "list_documents", count = rows.len());
        rows.iter().map(row_to_document).collect()
    }

    // Study tool operations. Records are never updated; regeneration inserts a new row.
    pub async fn insert_study_tool(&self, new_tool: NewStudyTool) -> Result<StudyTool> {
        let tool = StudyTool {
            id: Uuid::new_v4(),
            document_id: new_tool.document_id,
            user_id: new_tool.user_id,
            title: new_tool.title,
            params: new_tool.params,
            artifact: new_tool.artifact,
            created_at: Utc::now(),
        };

        let (kind, data) = encode_artifact(&tool.artifact)?;

        sqlx::query(
            r#"
            INSERT INTO study_tools (id, document_id, user_id, type, title, params, data, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(tool.id.to_string())
        .bind(tool.document_id.to_string())
        .bind(tool.user_id.to_string())
        .bind(kind)
        .bind(&tool.title)
        .bind(serde_json::to_string(&tool.params)?)
        .bind(data)
        .bind(tool.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        log_db_operation!(debug, "insert_study_tool", id = tool.id);
        Ok(tool)
    }

    pub async fn get_study_tool(&self, id: Uuid, user_id: Uuid) -> Result<Option<StudyTool>> {
        let row = sqlx::query("SELECT * FROM study_tools WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_study_tool).transpose()
    }

    /// Study tools generated from one document, newest first
    pub async fn list_study_tools(&self, document_id: Uuid, user_id: Uuid) -> Result<Vec<StudyTool>> {
        let rows = sqlx::query(
            "SELECT * FROM study_tools WHERE document_id = ?1 AND user_id = ?2 ORDER BY created_at DESC, rowid DESC",
        )
        .bind(document_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        log_db_operation!(debug, "list_study_tools", count = rows.len());
        rows.iter().map(row_to_study_tool).collect()
    }

    // FRQ attempt operations. Append-only.
    pub async fn insert_attempt(&self, new_attempt: NewFrqAttempt) -> Result<FrqAttempt> {
        let attempt = FrqAttempt {
            id: Uuid::new_v4(),
            user_id: new_attempt.user_id,
            study_tool_id: new_attempt.study_tool_id,
            question_index: new_attempt.question_index,
            user_answer: new_attempt.user_answer,
            feedback: new_attempt.feedback,
            score: new_attempt.score,
            total_possible_score: TOTAL_POSSIBLE_SCORE,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO frq_attempts (id, user_id, study_tool_id, question_index, user_answer,
                                      feedback, score, total_possible_score, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(attempt.id.to_string())
        .bind(attempt.user_id.to_string())
        .bind(attempt.study_tool_id.to_string())
        .bind(attempt.question_index)
        .bind(&attempt.user_answer)
        .bind(&attempt.feedback)
        .bind(attempt.score)
        .bind(attempt.total_possible_score)
        .bind(attempt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        log_db_operation!(debug, "insert_attempt", id = attempt.id);
        Ok(attempt)
    }

    /// All attempts on one study tool, newest first; insertion order breaks timestamp ties
    pub async fn list_attempts(&self, study_tool_id: Uuid, user_id: Uuid) -> Result<Vec<FrqAttempt>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM frq_attempts
            WHERE study_tool_id = ?1 AND user_id = ?2
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(study_tool_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        log_db_operation!(debug, "list_attempts", count = rows.len());
        rows.iter().map(row_to_attempt).collect()
    }
}

fn encode_artifact(artifact: &Artifact) -> Result<(&'static str, String)> {
    let data = match artifact {
        Artifact::Quiz(quiz) => serde_json::to_string(quiz)?,
        Artifact::Flashcards(deck) => serde_json::to_string(deck)?,
        Artifact::Matching(set) => serde_json::to_string(set)?,
        Artifact::Frq(set) => serde_json::to_string(set)?,
    };
    Ok((artifact.kind().as_str(), data))
}

/// Decode a stored payload against its type tag
fn decode_artifact(kind: &str, data: &str) -> Result<Artifact> {
    let artifact = match kind {
        "quiz" => Artifact::Quiz(serde_json::from_str(data)?),
        "flashcards" => Artifact::Flashcards(serde_json::from_str(data)?),
        "matching" => Artifact::Matching(serde_json::from_str(data)?),
        "frq" => Artifact::Frq(serde_json::from_str(data)?),
        other => anyhow::bail!("unknown study tool type '{}'", other),
    };
    Ok(artifact)
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: parse_uuid(row, "id")?,
        user_id: parse_uuid(row, "user_id")?,
        name: row.try_get("name")?,
        content: row.try_get("content")?,
        pages: row.try_get("pages")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn row_to_study_tool(row: &SqliteRow) -> Result<StudyTool> {
    let id = parse_uuid(row, "id")?;
    let kind: String = row.try_get("type")?;
    let data: String = row.try_get("data")?;
    let params: String = row.try_get("params")?;

    Ok(StudyTool {
        id,
        document_id: parse_uuid(row, "document_id")?,
        user_id: parse_uuid(row, "user_id")?,
        title: row.try_get("title")?,
        params: serde_json::from_str(&params).with_context(|| format!("invalid params on study tool {}", id))?,
        artifact: decode_artifact(&kind, &data).with_context(|| format!("invalid payload on study tool {}", id))?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn row_to_attempt(row: &SqliteRow) -> Result<FrqAttempt> {
    Ok(FrqAttempt {
        id: parse_uuid(row, "id")?,
        user_id: parse_uuid(row, "user_id")?,
        study_tool_id: parse_uuid(row, "study_tool_id")?,
        question_index: row.try_get("question_index")?,
        user_answer: row.try_get("user_answer")?,
        feedback: row.try_get("feedback")?,
        score: row.try_get("score")?,
        total_possible_score: row.try_get("total_possible_score")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn frq_tool(document_id: Uuid, user_id: Uuid) -> NewStudyTool {
        NewStudyTool {
            document_id,
            user_id,
            title: "FRQ Practice (2026-01-01)".to_string(),
            params: GenerationParams {
                count: 1,
                difficulty: "easy".to_string(),
                topics: None,
            },
            artifact: Artifact::Frq(FrqSet {
                frqs: vec![FrqItem {
                    prompt: "Explain inertia.".to_string(),
                    scoring_guideline: vec!["1 point for defining inertia".to_string()],
                    sample_answer: "Inertia is resistance to change in motion.".to_string(),
                }],
            }),
        }
    }

    fn attempt(tool: &StudyTool, question_index: i64, score: i64) -> NewFrqAttempt {
        NewFrqAttempt {
            user_id: tool.user_id,
            study_tool_id: tool.id,
            question_index,
            user_answer: format!("answer scoring {}", score),
            feedback: "feedback".to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn test_study_tool_round_trip() {
        let db = test_db().await;
        let user = Uuid::new_v4();
        let document = db.create_document(user, "notes.pdf".into(), "text".into(), 2).await.unwrap();

        let inserted = db.insert_study_tool(frq_tool(document.id, user)).await.unwrap();
        let fetched = db.get_study_tool(inserted.id, user).await.unwrap().unwrap();

        assert_eq!(fetched, inserted);
        assert_eq!(fetched.artifact.kind(), ArtifactKind::Frq);
    }

    #[tokio::test]
    async fn test_study_tools_newest_first_and_owned() {
        let db = test_db().await;
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let document = db.create_document(user, "notes.pdf".into(), "text".into(), 1).await.unwrap();

        let first = db.insert_study_tool(frq_tool(document.id, user)).await.unwrap();
        let second = db.insert_study_tool(frq_tool(document.id, user)).await.unwrap();

        let tools = db.list_study_tools(document.id, user).await.unwrap();
        assert_eq!(tools.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        assert!(db.list_study_tools(document.id, stranger).await.unwrap().is_empty());
        assert!(db.get_study_tool(first.id, stranger).await.unwrap().is_none());
        assert!(db.get_document(document.id, stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attempts_are_append_only_newest_first() {
        let db = test_db().await;
        let user = Uuid::new_v4();
        let document = db.create_document(user, "notes.pdf".into(), "text".into(), 1).await.unwrap();
        let tool = db.insert_study_tool(frq_tool(document.id, user)).await.unwrap();

        let first = db.insert_attempt(attempt(&tool, 0, 4)).await.unwrap();
        let second = db.insert_attempt(attempt(&tool, 0, 9)).await.unwrap();

        let attempts = db.list_attempts(tool.id, user).await.unwrap();
        assert_eq!(attempts, vec![second.clone(), first.clone()]);
        assert!(attempts.iter().all(|a| a.total_possible_score == TOTAL_POSSIBLE_SCORE));

        // Reads without an intervening write are identical
        assert_eq!(db.list_attempts(tool.id, user).await.unwrap(), attempts);
    }

    #[test]
    fn test_decode_rejects_unknown_or_mismatched_payload() {
        assert!(decode_artifact("essay", "{}").is_err());
        assert!(decode_artifact("frq", r#"{"frqs": "nope"}"#).is_err());

        let decoded = decode_artifact("matching", "{}").unwrap();
        assert_eq!(decoded, Artifact::Matching(MatchingSet::default()));
    }
}
