// Macros file - tracing macros are referenced by full path inside the macro bodies

/// Standardized logging macros so every layer emits the same field names

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, study_tool_id = $tool_id:expr) => {
        tracing::debug!(
            operation = $operation,
            study_tool_id = %$tool_id,
            "API operation started"
        );
    };
    ($operation:expr, document_id = $document_id:expr) => {
        tracing::debug!(
            operation = $operation,
            document_id = %$document_id,
            "API operation started"
        );
    };
    ($operation:expr, session_id = $session_id:expr) => {
        tracing::debug!(
            operation = $operation,
            session_id = %$session_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(operation = $operation, "API operation started");
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, study_tool_id = $tool_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            study_tool_id = %$tool_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, document_id = $document_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            document_id = %$document_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(operation = $operation, "API operation completed: {}", $msg);
    };
}

// ============================================================================
// Service Layer Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, study_tool_id = $tool_id:expr, question_index = $index:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            study_tool_id = %$tool_id,
            question_index = $index,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, document_id = $document_id:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            document_id = %$document_id,
            "Service operation started"
        );
    };
}

#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, study_tool_id = $tool_id:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            study_tool_id = %$tool_id,
            duration_ms = $duration,
            "Service operation completed successfully"
        );
    };
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation completed: {}", $msg
        );
    };
}

/// Log a service failure that is absorbed rather than returned to the caller
#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, document_id = $document_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            document_id = %$document_id,
            error = %$error,
            "Service operation failed: {}", $msg
        );
    };
}

// ============================================================================
// Database Operation Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, id = $id:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            id = %$id,
            "Database operation completed"
        );
    };
    (debug, $operation:expr, count = $count:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            result_count = $count,
            "Database operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "database",
            operation = $operation,
            "Database operation: {}", $msg
        );
    };
}

// ============================================================================
// LLM Service Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, provider = $provider:expr, temperature = $temperature:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            temperature = $temperature,
            "LLM operation started"
        );
    };
    (success, $operation:expr, provider = $provider:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            duration_ms = $duration,
            "LLM operation completed successfully"
        );
    };
    (error, $operation:expr, provider = $provider:expr, error = $error:expr) => {
        tracing::error!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            error = %$error,
            "LLM operation failed"
        );
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "llm_service",
            operation = $operation,
            "LLM operation warning: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let tool_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        log_api_start!("test_operation", study_tool_id = tool_id);
        log_api_start!("test_operation", document_id = document_id);
        log_api_start!("test_operation", session_id = session_id);
        log_api_start!("test_operation");

        log_api_success!("test_operation", study_tool_id = tool_id, "done");
        log_api_success!("test_operation", document_id = document_id, "done");
        log_api_success!("test_operation", count = 3, "listed");
        log_api_success!("test_operation", "done");


        log_service_start!("frq_workflow", "submit", study_tool_id = tool_id, question_index = 0);
        log_service_start!("study_service", "generate", document_id = document_id);
        log_service_success!("frq_workflow", "submit", study_tool_id = tool_id, duration_ms = 12);
        log_service_success!("study_service", "generate", "artifact saved");
        log_service_error!("study_service", "generate", document_id = document_id, error = error, "kept in memory");

        log_db_operation!(debug, "insert_attempt", id = tool_id);
        log_db_operation!(debug, "list_attempts", count = 2);
        log_db_operation!(info, "migration", "database initialized");

        log_llm_operation!(start, "grade_frq", provider = "OpenAI", temperature = 0.3);
        log_llm_operation!(success, "grade_frq", provider = "OpenAI", duration_ms = 1500);
        log_llm_operation!(error, "grade_frq", provider = "OpenAI", error = error);
        log_llm_operation!(warn, "grade_frq", "score clamped");

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");

        log_validation!(success, "configuration", "validated");
        log_validation!(failure, "frq_attempt", error = "answer is empty");
    }
}
