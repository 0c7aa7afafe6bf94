//! SpendSense orchestration core
//!
//! Client-side orchestration layer for a financial-analysis agent app:
//! - Dispatches requests to four independently-specified remote AI agents
//! - Normalizes their heterogeneous responses into a uniform result envelope
//! - Maintains an append-only conversation transcript with provenance
//! - Manages the asynchronous request lifecycle: sequencing, error
//!   isolation, and best-effort market-context enrichment
//!
//! WORKFLOWS:
//! upload → primary audit → enrichment (AnalysisOrchestrator)
//! user message → context-augmented query → reply (ChatOrchestrator)
//!
//! Rendering is an external collaborator: it consumes the state these
//! orchestrators expose and forwards raw user intents back into them.

pub mod analysis;
pub mod chat;
pub mod context;
pub mod error;
pub mod export;
pub mod gateway;
pub mod models;
pub mod session;
pub mod transcript;
pub mod upload;

pub use error::Result;

// Re-export common types
pub use analysis::{AnalysisOrchestrator, MARKET_CONTEXT_QUERY};
pub use chat::ChatOrchestrator;
pub use gateway::{AgentGateway, GatewayConfig, HttpAgentGateway, MockAgentGateway};
pub use models::*;
pub use session::{new_session, SessionState, SharedSession};
pub use transcript::TranscriptStore;
pub use upload::{HttpUploader, MockUploader, Uploader};
