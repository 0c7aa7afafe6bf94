//! Chat orchestrator
//!
//! Coordinates user message → context-augmented query → orchestrator agent →
//! transcript append. The conversation is never left silently unanswered:
//! every dispatched send produces exactly one assistant turn, apologetic on
//! failure. Concurrent sends are prevented by the outer collaborator
//! (the awaiting-reply flag drives its disablement), not by locking here.

use crate::context;
use crate::gateway::AgentGateway;
use crate::models::{AgentRole, ConversationTurn, OrchestratorReply};
use crate::session::SharedSession;
use crate::transcript::TranscriptStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ChatOrchestrator {
    gateway: Arc<dyn AgentGateway>,
    session: SharedSession,
    transcript: TranscriptStore,
    awaiting_reply: AtomicBool,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn AgentGateway>, session: SharedSession) -> Self {
        Self {
            gateway,
            session,
            transcript: TranscriptStore::new(),
            awaiting_reply: AtomicBool::new(false),
        }
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    /// True between dispatch and settle of a send
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.load(Ordering::SeqCst)
    }

    /// Send a user message to the orchestrator agent and append the reply.
    /// The ledger, when loaded, is always included as context regardless of
    /// whether an audit has completed.
    pub async fn send(&self, user_text: &str) {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            debug!("ignoring empty chat message");
            return;
        }

        self.transcript.append(ConversationTurn::user(user_text)).await;
        self.awaiting_reply.store(true, Ordering::SeqCst);

        let (ledger_content, generation) = {
            let session = self.session.read().await;
            (
                session.ledger.as_ref().map(|l| l.content.clone()),
                session.generation(),
            )
        };

        let message = context::chat_request(user_text, ledger_content.as_deref());
        let result = self
            .gateway
            .invoke(AgentRole::Orchestrator, &message, None)
            .await;

        if self.session.read().await.generation() != generation {
            debug!("discarding chat reply from a previous session");
            self.awaiting_reply.store(false, Ordering::SeqCst);
            return;
        }

        match result.successful_result() {
            Ok(value) => {
                let reply: OrchestratorReply =
                    serde_json::from_value(value.clone()).unwrap_or_default();
                info!(
                    agents = ?reply.query_analysis.agents_consulted,
                    "orchestrator reply received"
                );
                self.transcript
                    .append(ConversationTurn::assistant(
                        compose_reply_text(&reply),
                        Some(value.clone()),
                    ))
                    .await;
            }
            Err(error) => {
                warn!(error = %error, "chat send failed");
                self.transcript
                    .append(ConversationTurn::assistant(
                        format!("Sorry, I encountered an error: {}", error),
                        None,
                    ))
                    .await;
            }
        }

        self.awaiting_reply.store(false, Ordering::SeqCst);
    }

    /// Clear the transcript and settle the loading flag. Part of the
    /// session-level reset; the generation bump lives in the session slice.
    pub async fn reset(&self) {
        self.transcript.clear().await;
        self.awaiting_reply.store(false, Ordering::SeqCst);
    }
}

/// Synthesized explanation followed by a numbered rendering of any
/// recommendations, 1-based, each on its own line.
fn compose_reply_text(reply: &OrchestratorReply) -> String {
    let mut text = reply.synthesis.explanation.clone();

    if !reply.synthesis.recommendations.is_empty() {
        text.push_str("\n\nRecommendations:\n");
        for (i, recommendation) in reply.synthesis.recommendations.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", i + 1, recommendation));
        }
    }

    text
}
