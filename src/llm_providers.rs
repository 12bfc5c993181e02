use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::errors::LLMError;

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling settings for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Ask for the provider's JSON-object output mode; a hint, not a guarantee
    pub json_mode: bool,
}

impl CompletionOptions {
    pub const GENERATION: Self = Self {
        temperature: 0.7,
        json_mode: true,
    };
    pub const GRADING: Self = Self {
        temperature: 0.3,
        json_mode: true,
    };
    pub const CHAT: Self = Self {
        temperature: 0.7,
        json_mode: false,
    };
}

/// Enum-based LLM provider implementation
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Gemini(GeminiProvider),
}

impl LLMProvider {
    /// Submit a conversation and return the raw response text. Single attempt, no retry.
    pub async fn complete(&self, messages: &[LLMMessage], options: CompletionOptions) -> Result<String, LLMError> {
        match self {
            LLMProvider::OpenAI(provider) => provider.complete(messages, options).await,
            LLMProvider::Gemini(provider) => provider.complete(messages, options).await,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(provider) => provider.provider_name(),
            LLMProvider::Gemini(provider) => provider.provider_name(),
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => provider.model_name(),
            LLMProvider::Gemini(provider) => provider.model_name(),
        }
    }
}

fn require_key<'a>(api_key: &'a Option<String>, provider: &str) -> Result<&'a str, LLMError> {
    api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| LLMError::Configuration(format!("{} API key is not set", provider)))
}

#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "gpt-4o".to_string()),
        }
    }

    pub async fn complete(&self, messages: &[LLMMessage], options: CompletionOptions) -> Result<String, LLMError> {
        let api_key = require_key(&self.api_key, self.provider_name())?;

        let request_body = OpenAIRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            response_format: options.json_mode.then_some(OpenAIResponseFormat { kind: "json_object" }),
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            message_count = messages.len(),
            temperature = options.temperature,
            json_mode = options.json_mode,
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(LLMError::Provider(format!("OpenAI API request failed ({}): {}", status, error_text)));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let response_content = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::Provider("No choices in OpenAI response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

/// Gemini has no system role: system text is folded into the first user turn
fn to_gemini_contents(messages: &[LLMMessage]) -> Vec<GeminiContent> {
    let system_text = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut contents: Vec<GeminiContent> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| GeminiContent {
            role: Some(if m.role == "assistant" { "model" } else { "user" }.to_string()),
            parts: vec![GeminiPart { text: m.content.clone() }],
        })
        .collect();

    if !system_text.is_empty() {
        match contents.first_mut() {
            Some(first) if first.role.as_deref() == Some("user") => {
                if let Some(part) = first.parts.first_mut() {
                    part.text = format!("{}\n\n{}", system_text, part.text);
                }
            }
            _ => contents.insert(
                0,
                GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart { text: system_text }],
                },
            ),
        }
    }

    contents
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model: model.unwrap_or_else(|| "gemini-2.5-flash".to_string()),
        }
    }

    pub async fn complete(&self, messages: &[LLMMessage], options: CompletionOptions) -> Result<String, LLMError> {
        let api_key = require_key(&self.api_key, self.provider_name())?;

        let request_body = GeminiRequest {
            contents: to_gemini_contents(messages),
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                response_mime_type: options.json_mode.then_some("application/json"),
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            message_count = messages.len(),
            temperature = options.temperature,
            json_mode = options.json_mode,
            "Making LLM request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = self.provider_name(),
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(LLMError::Provider(format!("Gemini API request failed ({}): {}", status, error_text)));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let response_content = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::Provider("No candidates in Gemini response".to_string()))?
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<String>();

        info!(
            provider = self.provider_name(),
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

/// Brace-extraction JSON recovery for responses wrapped in prose or markdown fences
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Span from the first `{` through the last `}`, or the trimmed text when there is none
    pub fn extract_json_object(content: &str) -> &str {
        match (content.find('{'), content.rfind('}')) {
            (Some(start), Some(end)) if end > start => &content[start..=end],
            _ => content.trim(),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, LLMError> {
        let json_content = Self::extract_json_object(content);
        debug!(
            raw_length = content.len(),
            extracted_length = json_content.len(),
            "Extracted JSON from LLM response"
        );
        serde_json::from_str::<T>(json_content).map_err(|e| LLMError::Parse(e.to_string()))
    }
}

pub struct LLMProviderFactory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Gemini,
}

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> LLMProvider {
        match provider_type {
            LLMProviderType::OpenAI => LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model)),
            LLMProviderType::Gemini => LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_pure_json() {
        let raw = r#"{"frqs": []}"#;
        assert_eq!(JsonResponseParser::extract_json_object(raw), raw);
    }

    #[test]
    fn test_extract_markdown_fenced_json() {
        let raw = "```json\n{\"score\": 5, \"feedback\": \"ok\"}\n```";
        assert_eq!(
            JsonResponseParser::extract_json_object(raw),
            "{\"score\": 5, \"feedback\": \"ok\"}"
        );
    }

    #[test]
    fn test_extract_with_surrounding_prose() {
        let raw = "Here is your quiz:\n{\"questions\": [{\"question\": \"Q\"}]}\nGood luck!";
        let value: Value = JsonResponseParser.parse(raw).unwrap();
        assert_eq!(value["questions"][0]["question"], "Q");
    }

    #[test]
    fn test_extract_spans_nested_objects() {
        let raw = "prefix {\"a\": {\"b\": 1}} suffix";
        assert_eq!(JsonResponseParser::extract_json_object(raw), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_extract_without_braces_returns_trimmed() {
        assert_eq!(JsonResponseParser::extract_json_object("  [1, 2]  \n"), "[1, 2]");
        assert_eq!(JsonResponseParser::extract_json_object("} before {"), "} before {");
    }

    #[test]
    fn test_parse_failure_is_parse_error() {
        let result: Result<Value, LLMError> = JsonResponseParser.parse("I cannot help with that.");
        assert!(matches!(result, Err(LLMError::Parse(_))));

        let result: Result<Value, LLMError> = JsonResponseParser.parse("{ not json }");
        assert!(matches!(result, Err(LLMError::Parse(_))));
    }

    #[test]
    fn test_gemini_contents_fold_system_message() {
        let messages = vec![
            LLMMessage::system("Be helpful."),
            LLMMessage::user("What is inertia?"),
            LLMMessage {
                role: "assistant".to_string(),
                content: "Resistance to change in motion.".to_string(),
            },
        ];

        let contents = to_gemini_contents(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[0].parts[0].text, "Be helpful.\n\nWhat is inertia?");
        assert_eq!(contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_openai_request_json_mode() {
        let messages = vec![LLMMessage::user("hi")];
        let body = OpenAIRequest {
            model: "gpt-4o",
            messages: &messages,
            temperature: 0.3,
            response_format: Some(OpenAIResponseFormat { kind: "json_object" }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");

        let body = OpenAIRequest {
            response_format: None,
            ..body
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let provider = LLMProviderFactory::create_provider(
            LLMProviderType::OpenAI,
            None,
            Some("http://127.0.0.1:9".to_string()),
            None,
        );
        let result = provider
            .complete(&[LLMMessage::user("hello")], CompletionOptions::GENERATION)
            .await;
        assert!(matches!(result, Err(LLMError::Configuration(_))));

        let provider = LLMProviderFactory::create_provider(LLMProviderType::Gemini, Some("  ".to_string()), None, None);
        let result = provider.complete(&[LLMMessage::user("hello")], CompletionOptions::CHAT).await;
        assert!(matches!(result, Err(LLMError::Configuration(_))));
    }
}
