//! Agent gateway
//!
//! Single abstraction for invoking any of the four remote agents. Its value
//! is the normalization contract: every outcome, whatever the transport or
//! remote-side failure mode, comes back as a uniform [`AgentResult`] and the
//! orchestrators never see a language-level error from a call. One outbound
//! request per invocation; no retries, no caching, no coalescing.

use crate::models::{AgentResult, AgentRole, AssetReference};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Uniform call contract across all four agent roles
#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn invoke(
        &self,
        role: AgentRole,
        message: &str,
        attachments: Option<&[AssetReference]>,
    ) -> AgentResult;
}

//
// ================= Wire Types =================
//

#[derive(Debug, Serialize)]
struct AgentCallRequest<'a> {
    message: &'a str,
    #[serde(rename = "agentId")]
    agent_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<&'a [AssetReference]>,
}

#[derive(Debug, Deserialize)]
struct AgentCallResponse {
    success: bool,
    response: Option<Value>,
    error: Option<String>,
}

//
// ================= Configuration =================
//

/// Default agent ids of the deployed fleet; overridable per role via
/// `SPENDSENSE_AGENT_ID_<ROLE>` environment variables.
const DEFAULT_AGENT_IDS: [(AgentRole, &str); 4] = [
    (AgentRole::PrimaryAudit, "69858cabe17e33c11eed1a1d"),
    (AgentRole::Orchestrator, "6985916de5d25ce3f598cb4b"),
    (AgentRole::NewsContext, "6985913de17e33c11eed1a61"),
    (AgentRole::Actuary, "69859153e17e33c11eed1a66"),
];

const DEFAULT_BASE_URL: &str = "https://api.spendsense.app/v1/agents/invoke";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub agent_ids: HashMap<AgentRole, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            agent_ids: DEFAULT_AGENT_IDS
                .iter()
                .map(|(role, id)| (*role, id.to_string()))
                .collect(),
        }
    }
}

impl GatewayConfig {
    /// Build configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("SPENDSENSE_API_BASE_URL") {
            config.base_url = url;
        }
        config.api_key = env::var("SPENDSENSE_API_KEY").ok();

        for (role, var) in [
            (AgentRole::PrimaryAudit, "SPENDSENSE_AGENT_ID_PRIMARY_AUDIT"),
            (AgentRole::Orchestrator, "SPENDSENSE_AGENT_ID_ORCHESTRATOR"),
            (AgentRole::NewsContext, "SPENDSENSE_AGENT_ID_NEWS_CONTEXT"),
            (AgentRole::Actuary, "SPENDSENSE_AGENT_ID_ACTUARY"),
        ] {
            if let Ok(id) = env::var(var) {
                config.agent_ids.insert(role, id);
            }
        }

        config
    }

    fn agent_id(&self, role: AgentRole) -> &str {
        self.agent_ids
            .get(&role)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

//
// ================= HTTP Implementation =================
//

/// Reusable gateway over the remote agent API (connection-pooled)
pub struct HttpAgentGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpAgentGateway {
    pub fn new(config: GatewayConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> crate::Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    async fn call(
        &self,
        role: AgentRole,
        message: &str,
        attachments: Option<&[AssetReference]>,
    ) -> Result<AgentCallResponse, String> {
        let request = AgentCallRequest {
            message,
            agent_id: self.config.agent_id(role),
            attachments,
        };

        let mut builder = self.client.post(&self.config.base_url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| format!("agent request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("agent API returned {}: {}", status, body));
        }

        response
            .json::<AgentCallResponse>()
            .await
            .map_err(|e| format!("malformed agent response: {}", e))
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn invoke(
        &self,
        role: AgentRole,
        message: &str,
        attachments: Option<&[AssetReference]>,
    ) -> AgentResult {
        info!(agent = %role, message_len = message.len(), "invoking agent");

        match self.call(role, message, attachments).await {
            Ok(wire) => {
                if wire.success {
                    match wire.response {
                        Some(payload) => AgentResult::ok(payload),
                        None => AgentResult::err("agent reported success without a response"),
                    }
                } else {
                    let message = wire
                        .error
                        .unwrap_or_else(|| "agent call failed".to_string());
                    error!(agent = %role, error = %message, "agent reported failure");
                    AgentResult::err(message)
                }
            }
            Err(message) => {
                error!(agent = %role, error = %message, "agent call failed");
                AgentResult::err(message)
            }
        }
    }
}

//
// ================= Mock Implementation =================
//

/// Scripted gateway for development and testing. Keeps the orchestrators
/// functional without the remote fleet; records every invocation.
pub struct MockAgentGateway {
    responses: HashMap<AgentRole, AgentResult>,
    calls: Mutex<Vec<(AgentRole, String)>>,
}

impl MockAgentGateway {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock with plausible success payloads for every role
    pub fn with_canned_responses() -> Self {
        let mut gateway = Self::new();

        gateway.script(
            AgentRole::PrimaryAudit,
            AgentResult::ok(json!({
                "status": "success",
                "result": {
                    "executive_summary": {
                        "total_transactions": 42,
                        "total_spending": 58_250,
                        "analysis_period": "Jan 2024 - Mar 2024",
                        "financial_alignment_score": 72
                    },
                    "spending_breakdown": { "fixed": 31_000, "lifestyle": 19_250, "future": 8_000 },
                    "key_insights": ["Dining spend rose 18% month over month"],
                    "ghost_subscriptions_summary": { "count": 3, "annual_cost": 14_400 },
                    "recommendations": ["Cancel unused streaming subscriptions"]
                }
            })),
        );

        gateway.script(
            AgentRole::Orchestrator,
            AgentResult::ok(json!({
                "status": "success",
                "result": {
                    "query_analysis": {
                        "user_question": "projection",
                        "query_type": "forecast",
                        "agents_consulted": ["Actuary", "News Sentinel"]
                    },
                    "synthesis": {
                        "explanation": "Your projected 3-month spend is ₹1.7L based on current trends.",
                        "recommendations": ["Cap lifestyle spend at ₹20,000/month", "Automate a ₹5,000 monthly transfer to savings"],
                        "confidence": "medium"
                    }
                }
            })),
        );

        gateway.script(
            AgentRole::NewsContext,
            AgentResult::ok(json!({
                "status": "success",
                "result": {
                    "query_analyzed": "household expenses",
                    "news_found": true,
                    "news_items": [{
                        "headline": "Utility tariffs revised upward for Q2",
                        "source": "Market Wire",
                        "relevance": "Affects your electricity category",
                        "date": "2024-03-28"
                    }],
                    "context_summary": "Energy costs are trending up this quarter.",
                    "confidence": "high"
                }
            })),
        );

        gateway.script(
            AgentRole::Actuary,
            AgentResult::ok(json!({
                "status": "success",
                "result": {
                    "calculation_type": "projection",
                    "calculations": [],
                    "final_result": { "value": "170000", "unit": "INR", "interpretation": "3-month projection" }
                }
            })),
        );

        gateway
    }

    /// Set the scripted response for a role
    pub fn script(&mut self, role: AgentRole, result: AgentResult) {
        self.responses.insert(role, result);
    }

    /// Every `(role, message)` pair invoked so far, in call order
    pub async fn calls(&self) -> Vec<(AgentRole, String)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockAgentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentGateway for MockAgentGateway {
    async fn invoke(
        &self,
        role: AgentRole,
        message: &str,
        _attachments: Option<&[AssetReference]>,
    ) -> AgentResult {
        self.calls
            .lock()
            .await
            .push((role, message.to_string()));

        self.responses
            .get(&role)
            .cloned()
            .unwrap_or_else(|| AgentResult::err(format!("no scripted response for {}", role)))
    }
}
