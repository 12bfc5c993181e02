use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

use crate::llm_providers::LLMProviderType;

use crate::log_validation;

/// Request body cap when `MAX_UPLOAD_BYTES` is unset
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub chat: LLMConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Settings for one LLM provider connection
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// `None` leaves the provider unconfigured; requests then fail fast
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        let llm = LLMConfig::from_env()?;
        let chat = LLMConfig::chat_from_env(&llm);

        let config = Config {
            database: DatabaseConfig::from_env()?,
            llm,
            chat,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_key_present = self.llm.api_key.is_some(),
            chat_provider = ?self.chat.provider,
            chat_key_present = self.chat.api_key.is_some(),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.llm.api_key.is_none() {
            warn!("LLM API key is not set - generation and grading requests will be rejected");
        }
        if self.chat.api_key.is_none() {
            warn!("Chat API key is not set - tutor chat requests will be rejected");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Unrecognized log level '{}', filter may fall back to defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:study_assistant.db".to_string());

        Ok(DatabaseConfig { url })
    }
}

/// Map a provider name to a provider type, defaulting to OpenAI
pub fn parse_provider(name: &str) -> LLMProviderType {
    match name.to_lowercase().as_str() {
        "gemini" | "google" => LLMProviderType::Gemini,
        "openai" | "chatgpt" | "gpt" => LLMProviderType::OpenAI,
        _ => {
            info!("Unknown LLM provider '{}', defaulting to OpenAI", name);
            LLMProviderType::OpenAI
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        let provider = parse_provider(&env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()));

        let api_key = non_empty_var("LLM_API_KEY").or_else(|| match provider {
            LLMProviderType::OpenAI => non_empty_var("CHATGPT_SECRET_KEY"),
            LLMProviderType::Gemini => non_empty_var("GEMINI_API_KEY"),
        });

        Ok(LLMConfig {
            api_key,
            base_url: non_empty_var("LLM_BASE_URL"),
            provider,
            model: non_empty_var("LLM_MODEL"),
        })
    }

    /// Tutor chat settings; unset values inherit from the generation provider
    fn chat_from_env(generation: &LLMConfig) -> Self {
        let provider = non_empty_var("CHAT_PROVIDER")
            .map(|name| parse_provider(&name))
            .unwrap_or(generation.provider);
        let same_provider = provider == generation.provider;

        let api_key = non_empty_var("CHAT_API_KEY")
            .or_else(|| match provider {
                LLMProviderType::Gemini => non_empty_var("GEMINI_API_KEY"),
                LLMProviderType::OpenAI => None,
            })
            .or_else(|| same_provider.then(|| generation.api_key.clone()).flatten());

        LLMConfig {
            api_key,
            base_url: non_empty_var("CHAT_BASE_URL")
                .or_else(|| same_provider.then(|| generation.base_url.clone()).flatten()),
            provider,
            model: non_empty_var("CHAT_MODEL")
                .or_else(|| same_provider.then(|| generation.model.clone()).flatten()),
        }
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "3000".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| anyhow!("Invalid MAX_UPLOAD_BYTES value: '{}'", raw))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(ServerConfig {
            port,
            host,
            max_upload_bytes,
        })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,study_assistant=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let llm = LLMConfig {
            api_key: Some("sk-valid-key".to_string()),
            base_url: None,
            provider: LLMProviderType::OpenAI,
            model: None,
        };
        Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            chat: llm.clone(),
            llm,
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        }
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:study_assistant.db"), "sqli***t.db");
        assert_eq!(mask_sensitive_data("sk-1234567890abcdef"), "sk-1***cdef");
    }

    #[test]
    fn test_provider_parsing() {
        let cases = [
            ("openai", LLMProviderType::OpenAI),
            ("ChatGPT", LLMProviderType::OpenAI),
            ("gpt", LLMProviderType::OpenAI),
            ("gemini", LLMProviderType::Gemini),
            ("Google", LLMProviderType::Gemini),
            ("mistral", LLMProviderType::OpenAI),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_provider(input), expected, "Input '{}' should map to {:?}", input, expected);
        }
    }

    #[test]
    fn test_config_validation() {
        let config = sample_config();
        assert!(config.validate().is_ok());

        let mut invalid_port = config.clone();
        invalid_port.server.port = 0;
        assert!(invalid_port.validate().is_err());

        let mut postgres = config.clone();
        postgres.database.url = "postgres://localhost/study".to_string();
        assert!(postgres.validate().is_err());

        // A missing key only warns; requests fail later with a configuration error
        let mut keyless = config;
        keyless.llm.api_key = None;
        assert!(keyless.validate().is_ok());
    }
}
