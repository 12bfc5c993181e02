use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::database::Database;
use crate::documents::{DocumentTextExtractor, ExtractedDocument};
use crate::errors::ApiError;
use crate::llm_service::LLMService;
use crate::models::*;
use crate::prompts::GenerationRequest;

use crate::{log_service_error, log_service_start, log_service_success};

/// Request to generate a study tool from a stored document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudyToolRequest {
    pub kind: ArtifactKind,
    pub count: u32,
    pub difficulty: String,
    #[serde(default)]
    pub topics: Option<String>,
}

/// A generated study tool and whether it made it into the store.
///
/// A storage failure keeps the generated artifact visible for this response only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStudyTool {
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_tool: Option<StudyTool>,
    pub artifact: Artifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct StudyService {
    db: Database,
    llm: LLMService,
    extractor: Arc<dyn DocumentTextExtractor>,
}

impl StudyService {
    pub fn new(db: Database, llm: LLMService, extractor: Arc<dyn DocumentTextExtractor>) -> Self {
        Self { db, llm, extractor }
    }

    /// Pull text out of an uploaded file off the async runtime
    pub async fn extract_text(&self, bytes: Vec<u8>) -> Result<ExtractedDocument, ApiError> {
        let extractor = Arc::clone(&self.extractor);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| ApiError::InternalError(format!("text extraction task failed: {}", e)))?
            .map_err(|e| ApiError::BadRequest(format!("Failed to process PDF: {:#}", e)))?;

        if extracted.text.trim().is_empty() {
            return Err(ApiError::BadRequest("Could not extract text from PDF".to_string()));
        }
        Ok(extracted)
    }

    pub async fn upload_document(&self, user_id: Uuid, name: String, bytes: Vec<u8>) -> Result<Document, ApiError> {
        let extracted = self.extract_text(bytes).await?;
        let document = self
            .db
            .create_document(user_id, name, extracted.text, extracted.pages)
            .await?;

        log_service_success!("study_service", "upload_document", "document stored");
        Ok(document)
    }

    pub async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentSummary>, ApiError> {
        let documents = self.db.list_documents(user_id).await?;
        Ok(documents.iter().map(DocumentSummary::from).collect())
    }

    pub async fn get_document(&self, user_id: Uuid, document_id: Uuid) -> Result<Document, ApiError> {
        self.db
            .get_document(document_id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Document '{}' not found", document_id)))
    }

    /// Run one generation request for `kind`
    pub async fn generate(&self, kind: ArtifactKind, request: &GenerationRequest) -> Result<Artifact, ApiError> {
        let artifact = match kind {
            ArtifactKind::Quiz => Artifact::Quiz(self.llm.generate_quiz(request).await?),
            ArtifactKind::Flashcards => Artifact::Flashcards(self.llm.generate_flashcards(request).await?),
            ArtifactKind::Matching => Artifact::Matching(self.llm.generate_matching(request).await?),
            ArtifactKind::Frq => Artifact::Frq(self.llm.generate_frqs(request).await?),
        };
        Ok(artifact)
    }

    /// Generate a study tool from an owned document and persist it as a new record
    pub async fn generate_study_tool(
        &self,
        user_id: Uuid,
        document_id: Uuid,
        request: CreateStudyToolRequest,
    ) -> Result<GeneratedStudyTool, ApiError> {
        log_service_start!("study_service", "generate_study_tool", document_id = document_id);

        let document = self.get_document(user_id, document_id).await?;
        let params = GenerationParams {
            count: request.count,
            difficulty: request.difficulty,
            topics: request.topics.filter(|t| !t.trim().is_empty()),
        };
        let generation = GenerationRequest {
            content: document.content,
            count: params.count,
            difficulty: params.difficulty.clone(),
            topics: params.topics.clone(),
        };

        let artifact = self.generate(request.kind, &generation).await?;
        let title = format!("{} ({})", request.kind.label(), Utc::now().format("%Y-%m-%d"));

        let stored = self
            .db
            .insert_study_tool(NewStudyTool {
                document_id,
                user_id,
                title,
                params,
                artifact: artifact.clone(),
            })
            .await;

        match stored {
            Ok(tool) => {
                log_service_success!("study_service", "generate_study_tool", "study tool saved");
                Ok(GeneratedStudyTool {
                    saved: true,
                    study_tool: Some(tool),
                    artifact,
                    warning: None,
                })
            }
            Err(e) => {
                log_service_error!(
                    "study_service",
                    "generate_study_tool",
                    document_id = document_id,
                    error = e,
                    "generated artifact could not be saved"
                );
                Ok(GeneratedStudyTool {
                    saved: false,
                    study_tool: None,
                    artifact,
                    warning: Some("Generated study tool could not be saved".to_string()),
                })
            }
        }
    }

    pub async fn list_study_tools(&self, user_id: Uuid, document_id: Uuid) -> Result<Vec<StudyTool>, ApiError> {
        // Surface a missing document as 404 rather than an empty list
        self.get_document(user_id, document_id).await?;
        Ok(self.db.list_study_tools(document_id, user_id).await?)
    }

    pub async fn get_study_tool(&self, user_id: Uuid, study_tool_id: Uuid) -> Result<StudyTool, ApiError> {
        self.db
            .get_study_tool(study_tool_id, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Study tool '{}' not found", study_tool_id)))
    }
}
