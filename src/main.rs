use anyhow::Result;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use study_assistant::{
    config::{Config, LoggingConfig},
    create_router, log_system_event, AppState, Database, LLMService, PdfTextExtractor,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = setup_logging(&config.logging)?;
    log_system_event!(config, "Configuration loaded successfully");
    config.log_configuration_summary();
    config.validate()?;

    info!("Starting study assistant server...");

    let db = Database::new(&config.database.url).await?;
    log_system_event!(startup, component = "database", "Database initialized successfully");

    let llm_service = LLMService::from_config(&config.llm);
    let chat_service = LLMService::from_config(&config.chat);
    info!(
        provider = llm_service.provider_name(),
        model = llm_service.model_name(),
        chat_provider = chat_service.provider_name(),
        chat_model = chat_service.model_name(),
        "Initialized LLM services"
    );

    let state = AppState::new(db, llm_service, chat_service, Arc::new(PdfTextExtractor))
        .with_upload_limit(config.server.max_upload_bytes);

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Console and daily-rotated file output, each switchable from config.
///
/// The returned guard must live for the whole process or buffered file lines are lost.
fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    let (file_layer, guard) = if config.file_enabled {
        if let Err(e) = std::fs::create_dir_all(&config.log_directory) {
            eprintln!("Warning: Could not create log directory {}: {}", config.log_directory, e);
        }
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "study-assistant.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // No ANSI colors in files
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        directory = %config.log_directory,
        "Logging initialized"
    );

    Ok(guard)
}
