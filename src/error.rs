//! Error types for the orchestration core

use thiserror::Error;

/// Result type alias for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Workflow Errors
    // =============================

    /// Bad ledger file (type/size), caught before any network call
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Upload collaborator reported failure; analysis aborts before the audit call
    #[error("Upload error: {0}")]
    UploadError(String),

    /// Network or remote-side failure of an agent call
    #[error("Agent call error: {0}")]
    AgentCallError(String),

    /// Agent call succeeded at the transport level but status != "success"
    #[error("Agent logic error: {0}")]
    AgentLogicError(String),

    /// Market-context enrichment failure; always non-fatal
    #[error("Enrichment error: {0}")]
    EnrichmentError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
