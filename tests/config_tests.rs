use study_assistant::{config::Config, LLMProviderType};

const VARS: &[&str] = &[
    "DATABASE_URL",
    "LLM_PROVIDER",
    "LLM_API_KEY",
    "LLM_BASE_URL",
    "LLM_MODEL",
    "CHATGPT_SECRET_KEY",
    "GEMINI_API_KEY",
    "CHAT_PROVIDER",
    "CHAT_API_KEY",
    "CHAT_BASE_URL",
    "CHAT_MODEL",
    "HOST",
    "PORT",
    "MAX_UPLOAD_BYTES",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: this binary has a single test, so nothing reads the environment concurrently
        unsafe { std::env::remove_var(var) };
    }
}

fn set(var: &str, value: &str) {
    // SAFETY: see `clear_env`
    unsafe { std::env::set_var(var, value) };
}

// Environment variables are process-wide, so every scenario runs in one test
#[test]
fn test_config_from_environment() {
    clear_env();
    let config = Config::from_env().unwrap();
    assert_eq!(config.database.url, "sqlite:study_assistant.db");
    assert_eq!(config.llm.provider, LLMProviderType::OpenAI);
    assert!(config.llm.api_key.is_none());
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.max_upload_bytes, 20 * 1024 * 1024);
    assert!(config.validate().is_ok());

    // Legacy key names are honoured and chat inherits from the same provider
    clear_env();
    set("CHATGPT_SECRET_KEY", "sk-legacy");
    set("LLM_MODEL", "gpt-4o-mini");
    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-legacy"));
    assert_eq!(config.chat.provider, LLMProviderType::OpenAI);
    assert_eq!(config.chat.api_key.as_deref(), Some("sk-legacy"));
    assert_eq!(config.chat.model.as_deref(), Some("gpt-4o-mini"));

    // Generation on OpenAI, tutor chat on Gemini
    clear_env();
    set("LLM_API_KEY", "sk-generation");
    set("CHAT_PROVIDER", "gemini");
    set("GEMINI_API_KEY", "gemini-key");
    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-generation"));
    assert_eq!(config.chat.provider, LLMProviderType::Gemini);
    assert_eq!(config.chat.api_key.as_deref(), Some("gemini-key"));
    assert!(config.chat.model.is_none());

    // Blank values count as unset
    clear_env();
    set("LLM_API_KEY", "   ");
    let config = Config::from_env().unwrap();
    assert!(config.llm.api_key.is_none());

    clear_env();
    set("PORT", "not-a-port");
    assert!(Config::from_env().is_err());

    clear_env();
    set("MAX_UPLOAD_BYTES", "lots");
    assert!(Config::from_env().is_err());

    clear_env();
    set("DATABASE_URL", "postgres://localhost/study");
    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());

    clear_env();
}
