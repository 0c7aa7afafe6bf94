//! Core data models for the orchestration layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::OrchestrationError;

/// Maximum accepted ledger size (10 MiB)
pub const MAX_LEDGER_BYTES: usize = 10 * 1024 * 1024;

//
// ================= Agent Roles =================
//

/// The closed set of remote agent roles the core can invoke
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    PrimaryAudit,
    Orchestrator,
    NewsContext,
    Actuary,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::PrimaryAudit,
        AgentRole::Orchestrator,
        AgentRole::NewsContext,
        AgentRole::Actuary,
    ];
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::PrimaryAudit => "primary-audit",
            AgentRole::Orchestrator => "orchestrator",
            AgentRole::NewsContext => "news-context",
            AgentRole::Actuary => "actuary",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Ledger =================
//

/// Raw uploaded transaction ledger plus its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    pub name: String,
    pub size_bytes: u64,
    pub mime_hint: Option<String>,
    pub content: String,
}

impl LedgerFile {
    /// Validate and construct a ledger. Rejections happen here, before any
    /// upload or agent call is attempted.
    pub fn new(
        name: impl Into<String>,
        mime_hint: Option<String>,
        content: impl Into<String>,
    ) -> crate::Result<Self> {
        let name = name.into();
        let content = content.into();

        let is_csv = mime_hint.as_deref() == Some("text/csv") || name.ends_with(".csv");
        if !is_csv {
            return Err(OrchestrationError::ValidationError(
                "Please upload a CSV file".to_string(),
            ));
        }

        if content.len() > MAX_LEDGER_BYTES {
            return Err(OrchestrationError::ValidationError(
                "File size must be less than 10MB".to_string(),
            ));
        }

        Ok(Self {
            size_bytes: content.len() as u64,
            name,
            mime_hint,
            content,
        })
    }
}

//
// ================= Goals =================
//

/// Ordered set of free-text financial goals.
/// Uniqueness is exact string match; insertion order is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalSet {
    goals: Vec<String>,
}

impl GoalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a goal; returns false if the trimmed text is empty or already present
    pub fn add(&mut self, goal: &str) -> bool {
        let goal = goal.trim();
        if goal.is_empty() || self.goals.iter().any(|g| g == goal) {
            return false;
        }
        self.goals.push(goal.to_string());
        true
    }

    /// Remove a goal by exact match; returns whether it was present
    pub fn remove(&mut self, goal: &str) -> bool {
        let before = self.goals.len();
        self.goals.retain(|g| g != goal);
        self.goals.len() != before
    }

    pub fn clear(&mut self) {
        self.goals.clear();
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.goals.iter().map(String::as_str)
    }

    /// Comma-joined enumeration in insertion order, for prompt assembly
    pub fn joined(&self) -> String {
        self.goals.join(", ")
    }
}

//
// ================= Agent Call Envelope =================
//

/// Opaque reference to a previously uploaded artifact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AssetReference(pub String);

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized outcome of every agent invocation, regardless of which remote
/// agent was called or how it failed. The gateway never raises; it returns
/// this envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub succeeded: bool,
    pub payload: Option<Value>,
    pub error_message: Option<String>,
}

impl AgentResult {
    pub fn ok(payload: Value) -> Self {
        Self {
            succeeded: true,
            payload: Some(payload),
            error_message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            payload: None,
            error_message: Some(message.into()),
        }
    }

    /// Apply the minimal `{status, result}` envelope check and extract the
    /// inner result. Deep payload shape stays a presentation concern.
    pub fn successful_result(&self) -> crate::Result<&Value> {
        if !self.succeeded {
            return Err(OrchestrationError::AgentCallError(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "agent call failed".to_string()),
            ));
        }

        let payload = self.payload.as_ref().ok_or_else(|| {
            OrchestrationError::AgentCallError("agent returned an empty payload".to_string())
        })?;

        let status = payload.get("status").and_then(Value::as_str).unwrap_or("");
        if status != "success" {
            return Err(OrchestrationError::AgentLogicError(format!(
                "agent reported status '{}'",
                if status.is_empty() { "missing" } else { status }
            )));
        }

        payload.get("result").ok_or_else(|| {
            OrchestrationError::AgentLogicError(
                "agent reported success without a result".to_string(),
            )
        })
    }
}

//
// ================= Upload Outcome =================
//

/// Envelope returned by the upload collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub succeeded: bool,
    #[serde(default)]
    pub asset_references: Vec<AssetReference>,
    pub error_message: Option<String>,
}

//
// ================= Audit Snapshot =================
//

/// The primary financial-audit payload plus optional market-context
/// enrichment. Replaced wholesale on re-analysis, cleared on reset.
/// `market_context` stays None until enrichment completes; it is never
/// partially populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub audit: Value,
    pub market_context: Option<Value>,
    pub produced_at: DateTime<Utc>,
}

impl AuditSnapshot {
    pub fn new(audit: Value) -> Self {
        Self {
            audit,
            market_context: None,
            produced_at: Utc::now(),
        }
    }
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One immutable transcript entry. `attached_insight` is present only on
/// assistant turns produced by a successful structured agent call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub produced_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_insight: Option<Value>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            speaker: Speaker::User,
            text: text.into(),
            produced_at: Utc::now(),
            attached_insight: None,
        }
    }

    pub fn assistant(text: impl Into<String>, insight: Option<Value>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            speaker: Speaker::Assistant,
            text: text.into(),
            produced_at: Utc::now(),
            attached_insight: insight,
        }
    }
}

//
// ================= Orchestrator Reply (tolerant view) =================
//

/// Tolerant typed view over the orchestrator agent's result, used only to
/// compose the assistant turn text. Missing fields default rather than fail;
/// strict shape validation belongs to the presentation collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorReply {
    #[serde(default)]
    pub query_analysis: QueryAnalysis,
    #[serde(default)]
    pub synthesis: Synthesis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub user_question: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default)]
    pub agents_consulted: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Synthesis {
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

//
// ================= Analysis State =================
//

/// Lifecycle of one analysis run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    Idle,
    Uploading,
    Analyzing,
    EnrichingContext,
    Ready,
    Failed,
}

impl Default for AnalysisState {
    fn default() -> Self {
        AnalysisState::Idle
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisState::Idle => "idle",
            AnalysisState::Uploading => "uploading",
            AnalysisState::Analyzing => "analyzing",
            AnalysisState::EnrichingContext => "enriching_context",
            AnalysisState::Ready => "ready",
            AnalysisState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
