use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

use crate::config::LLMConfig;
use crate::errors::LLMError;
use crate::llm_providers::{CompletionOptions, JsonResponseParser, LLMMessage, LLMProvider, LLMProviderFactory};
use crate::models::{ChatMessage, FlashcardDeck, FrqGrade, FrqSet, MatchingSet, Quiz};
use crate::prompts::{self, GenerationRequest, JSON_SYSTEM_MESSAGE, TUTOR_SYSTEM_PROMPT};

use crate::log_llm_operation;

/// Chat turns kept from the caller's history
const CHAT_HISTORY_LIMIT: usize = 10;

/// Typed generation, grading and tutor operations over one provider
#[derive(Clone)]
pub struct LLMService {
    provider: LLMProvider,
    json_parser: JsonResponseParser,
}

impl LLMService {
    pub fn new(provider: LLMProvider) -> Self {
        Self {
            provider,
            json_parser: JsonResponseParser,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(LLMProviderFactory::create_provider(
            config.provider,
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
        ))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    async fn request(
        &self,
        operation: &str,
        messages: &[LLMMessage],
        options: CompletionOptions,
    ) -> Result<String, LLMError> {
        let start = Instant::now();
        log_llm_operation!(start, operation, provider = self.provider_name(), temperature = options.temperature);

        match self.provider.complete(messages, options).await {
            Ok(text) => {
                log_llm_operation!(
                    success,
                    operation,
                    provider = self.provider_name(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Ok(text)
            }
            Err(e) => {
                log_llm_operation!(error, operation, provider = self.provider_name(), error = e);
                Err(e)
            }
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        prompt: String,
        options: CompletionOptions,
    ) -> Result<T, LLMError> {
        let messages = [LLMMessage::system(JSON_SYSTEM_MESSAGE), LLMMessage::user(prompt)];
        let response_text = self.request(operation, &messages, options).await?;

        debug!(
            operation = operation,
            response_content = %response_text,
            "Raw LLM response"
        );

        self.json_parser.parse::<T>(&response_text)
    }

    pub async fn generate_frqs(&self, request: &GenerationRequest) -> Result<FrqSet, LLMError> {
        self.request_json("generate_frq", prompts::frq_prompt(request), CompletionOptions::GENERATION)
            .await
    }

    pub async fn generate_quiz(&self, request: &GenerationRequest) -> Result<Quiz, LLMError> {
        self.request_json("generate_quiz", prompts::quiz_prompt(request), CompletionOptions::GENERATION)
            .await
    }

    pub async fn generate_flashcards(&self, request: &GenerationRequest) -> Result<FlashcardDeck, LLMError> {
        self.request_json(
            "generate_flashcards",
            prompts::flashcards_prompt(request),
            CompletionOptions::GENERATION,
        )
        .await
    }

    pub async fn generate_matching(&self, request: &GenerationRequest) -> Result<MatchingSet, LLMError> {
        self.request_json(
            "generate_matching",
            prompts::matching_prompt(request),
            CompletionOptions::GENERATION,
        )
        .await
    }

    /// Grade one answer against its rubric; the verdict is returned as the model gave it
    pub async fn grade_frq(
        &self,
        question: &str,
        scoring_guideline: &[String],
        user_answer: &str,
    ) -> Result<FrqGrade, LLMError> {
        self.request_json(
            "grade_frq",
            prompts::grading_prompt(question, scoring_guideline, user_answer),
            CompletionOptions::GRADING,
        )
        .await
    }

    /// Tutor reply for a conversation; caller-supplied system turns are dropped
    pub async fn chat(&self, history: &[ChatMessage]) -> Result<String, LLMError> {
        let conversation: Vec<&ChatMessage> = history.iter().filter(|m| m.role != "system").collect();
        let recent = &conversation[conversation.len().saturating_sub(CHAT_HISTORY_LIMIT)..];

        let mut messages = Vec::with_capacity(recent.len() + 1);
        messages.push(LLMMessage::system(TUTOR_SYSTEM_PROMPT));
        messages.extend(recent.iter().map(|m| LLMMessage {
            role: if m.role == "user" { "user" } else { "assistant" }.to_string(),
            content: m.content.clone(),
        }));

        let reply = self.request("chat", &messages, CompletionOptions::CHAT).await?;
        if reply.trim().is_empty() {
            return Ok("No response generated".to_string());
        }
        Ok(reply)
    }
}
