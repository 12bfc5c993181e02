pub mod api;
pub mod config;
pub mod database;
pub mod documents;
pub mod errors;
pub mod frq_workflow;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod study_service;

pub use api::{create_router, AppState};
pub use config::Config;
pub use database::Database;
pub use documents::{DocumentTextExtractor, PdfTextExtractor};
pub use errors::*;
pub use frq_workflow::{FrqGradingWorkflow, FrqPractice, PracticeStore, QuestionState};
pub use llm_providers::{JsonResponseParser, LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::LLMService;
pub use models::*;
pub use study_service::StudyService;
