//! Analysis orchestrator
//!
//! Coordinates the upload → primary audit → best-effort market-context
//! enrichment workflow and owns the audit snapshot. The audit agent is never
//! called without a successfully uploaded artifact reference; enrichment
//! failures degrade silently to "no market context available".

use crate::context;
use crate::error::OrchestrationError;
use crate::gateway::AgentGateway;
use crate::models::{AgentRole, AnalysisState, AuditSnapshot, LedgerFile};
use crate::session::SharedSession;
use crate::upload::Uploader;
use crate::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fixed, non-user-editable query for the enrichment call
pub const MARKET_CONTEXT_QUERY: &str =
    "Check for recent market news affecting household expenses, subscriptions, and utility bills in India";

#[derive(Default)]
struct AnalysisInner {
    state: AnalysisState,
    snapshot: Option<AuditSnapshot>,
    error: Option<String>,
}

/// State machine over Idle → Uploading → Analyzing → Ready (⇄ EnrichingContext)
/// with Failed reachable from the upload and audit steps only.
pub struct AnalysisOrchestrator {
    uploader: Arc<dyn Uploader>,
    gateway: Arc<dyn AgentGateway>,
    session: SharedSession,
    inner: Arc<RwLock<AnalysisInner>>,
    enrichment: Mutex<Option<JoinHandle<()>>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        uploader: Arc<dyn Uploader>,
        gateway: Arc<dyn AgentGateway>,
        session: SharedSession,
    ) -> Self {
        Self {
            uploader,
            gateway,
            session,
            inner: Arc::new(RwLock::new(AnalysisInner::default())),
            enrichment: Mutex::new(None),
        }
    }

    /// Replace the loaded ledger wholesale. Validation already happened in
    /// [`LedgerFile::new`]; a rejected file never reaches this point.
    pub async fn load_ledger(&self, file: LedgerFile) {
        info!(name = %file.name, size_bytes = file.size_bytes, "ledger loaded");
        self.session.write().await.ledger = Some(file);
    }

    pub async fn add_goal(&self, goal: &str) -> bool {
        self.session.write().await.goals.add(goal)
    }

    pub async fn remove_goal(&self, goal: &str) -> bool {
        self.session.write().await.goals.remove(goal)
    }

    pub async fn state(&self) -> AnalysisState {
        self.inner.read().await.state
    }

    pub async fn snapshot(&self) -> Option<AuditSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.inner.read().await.error.clone()
    }

    /// Run one analysis over the currently loaded ledger and goals.
    ///
    /// Upload strictly precedes the audit call, which strictly precedes the
    /// enrichment call. The caller (outer collaborator) is responsible for
    /// not issuing a second run while one is in flight.
    pub async fn run_analysis(&self) -> Result<()> {
        let (ledger, goals, generation) = {
            let session = self.session.read().await;
            let ledger = session.ledger.clone().ok_or_else(|| {
                OrchestrationError::ValidationError(
                    "Please upload a CSV file first".to_string(),
                )
            })?;
            (ledger, session.goals.clone(), session.generation())
        };

        {
            let mut inner = self.inner.write().await;
            inner.state = AnalysisState::Uploading;
            inner.error = None;
        }

        let outcome = self.uploader.upload(&ledger).await;

        if self.is_stale(generation).await {
            debug!("discarding upload result from a previous session");
            return Ok(());
        }

        if !outcome.succeeded {
            let message = outcome
                .error_message
                .unwrap_or_else(|| "file upload failed".to_string());
            self.fail(&message).await;
            return Err(OrchestrationError::UploadError(message));
        }

        {
            let mut inner = self.inner.write().await;
            inner.state = AnalysisState::Analyzing;
        }

        let message = context::audit_request(&ledger.content, &goals);
        let result = self
            .gateway
            .invoke(
                AgentRole::PrimaryAudit,
                &message,
                Some(&outcome.asset_references),
            )
            .await;

        if self.is_stale(generation).await {
            debug!("discarding audit result from a previous session");
            return Ok(());
        }

        match result.successful_result() {
            Ok(audit) => {
                let snapshot = AuditSnapshot::new(audit.clone());
                {
                    let mut inner = self.inner.write().await;
                    inner.snapshot = Some(snapshot);
                    inner.state = AnalysisState::Ready;
                }
                info!("audit complete, firing market-context enrichment");
                self.spawn_enrichment(generation).await;
                Ok(())
            }
            Err(error) => {
                self.fail(&error.to_string()).await;
                Err(error)
            }
        }
    }

    /// Valid from any state: invalidates in-flight work via the generation
    /// counter and clears ledger, goals, snapshot and error.
    pub async fn reset(&self) {
        self.session.write().await.reset();
        let mut inner = self.inner.write().await;
        inner.state = AnalysisState::Idle;
        inner.snapshot = None;
        inner.error = None;
    }

    /// Wait for the most recently spawned enrichment task to settle.
    /// Useful for deterministic shutdown and tests; the workflow itself
    /// never blocks on it.
    pub async fn await_enrichment(&self) {
        let handle = self.enrichment.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn fail(&self, message: &str) {
        let mut inner = self.inner.write().await;
        inner.state = AnalysisState::Failed;
        inner.error = Some(message.to_string());
    }

    async fn is_stale(&self, generation: u64) -> bool {
        self.session.read().await.generation() != generation
    }

    async fn spawn_enrichment(&self, generation: u64) {
        let gateway = Arc::clone(&self.gateway);
        let session = Arc::clone(&self.session);
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            {
                let current = session.read().await.generation();
                if current != generation {
                    return;
                }
                let mut inner = inner.write().await;
                if inner.state != AnalysisState::Ready {
                    return;
                }
                inner.state = AnalysisState::EnrichingContext;
            }

            let result = gateway
                .invoke(AgentRole::NewsContext, MARKET_CONTEXT_QUERY, None)
                .await;

            let current = session.read().await.generation();
            if current != generation {
                debug!("discarding enrichment result from a previous session");
                return;
            }

            let mut inner = inner.write().await;
            if inner.state == AnalysisState::EnrichingContext {
                inner.state = AnalysisState::Ready;
            }

            match result.successful_result() {
                Ok(news) => {
                    if let Some(snapshot) = inner.snapshot.as_mut() {
                        snapshot.market_context = Some(news.clone());
                        info!("market context attached to audit snapshot");
                    }
                }
                Err(error) => {
                    // Best-effort: the primary result stays Ready
                    let error = OrchestrationError::EnrichmentError(error.to_string());
                    warn!(error = %error, "market-context enrichment failed");
                }
            }
        });

        *self.enrichment.lock().await = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockAgentGateway;
    use crate::models::{AgentResult, AssetReference};
    use crate::session::new_session;
    use crate::upload::MockUploader;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn three_row_ledger() -> LedgerFile {
        LedgerFile::new(
            "transactions.csv",
            None,
            "date,merchant,amount\n2024-01-01,Grocer,1200\n2024-01-02,Stream Co,499",
        )
        .unwrap()
    }

    fn orchestrator_with(
        uploader: Arc<MockUploader>,
        gateway: Arc<MockAgentGateway>,
    ) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(uploader, gateway, new_session())
    }

    #[tokio::test]
    async fn test_successful_run_fires_exactly_one_enrichment() {
        let uploader = Arc::new(MockUploader::succeeding());
        let gateway = Arc::new(MockAgentGateway::with_canned_responses());
        let orchestrator = orchestrator_with(Arc::clone(&uploader), Arc::clone(&gateway));

        orchestrator.load_ledger(three_row_ledger()).await;
        orchestrator.run_analysis().await.unwrap();
        orchestrator.await_enrichment().await;

        assert_eq!(orchestrator.state().await, AnalysisState::Ready);
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert!(snapshot.audit.get("executive_summary").is_some());
        assert!(snapshot.market_context.is_some());

        let calls = gateway.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, AgentRole::PrimaryAudit);
        assert_eq!(calls[1].0, AgentRole::NewsContext);
        assert_eq!(calls[1].1, MARKET_CONTEXT_QUERY);
        assert_eq!(
            calls.iter().filter(|(r, _)| *r == AgentRole::NewsContext).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_audit_message_includes_ledger_and_goals() {
        let uploader = Arc::new(MockUploader::succeeding());
        let gateway = Arc::new(MockAgentGateway::with_canned_responses());
        let orchestrator = orchestrator_with(uploader, Arc::clone(&gateway));

        orchestrator.load_ledger(three_row_ledger()).await;
        orchestrator.add_goal("Save for vacation").await;
        orchestrator.run_analysis().await.unwrap();

        let calls = gateway.calls().await;
        assert!(calls[0].1.starts_with("Analyze this CSV data:\ndate,merchant,amount"));
        assert!(calls[0].1.ends_with("User's financial goals: Save for vacation"));
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_before_audit_call() {
        let uploader = Arc::new(MockUploader::failing("storage unavailable"));
        let gateway = Arc::new(MockAgentGateway::with_canned_responses());
        let orchestrator = orchestrator_with(uploader, Arc::clone(&gateway));

        orchestrator.load_ledger(three_row_ledger()).await;
        let error = orchestrator.run_analysis().await.unwrap_err();

        assert!(matches!(error, OrchestrationError::UploadError(_)));
        assert_eq!(orchestrator.state().await, AnalysisState::Failed);
        assert_eq!(
            orchestrator.error_message().await.as_deref(),
            Some("storage unavailable")
        );
        // Fail-fast: the audit agent was never consulted
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_ledger_means_zero_network_calls() {
        let uploader = Arc::new(MockUploader::succeeding());
        let gateway = Arc::new(MockAgentGateway::with_canned_responses());
        let orchestrator = orchestrator_with(Arc::clone(&uploader), Arc::clone(&gateway));

        let error = orchestrator.run_analysis().await.unwrap_err();
        assert!(matches!(error, OrchestrationError::ValidationError(_)));
        assert_eq!(orchestrator.state().await, AnalysisState::Idle);
        assert!(uploader.uploads().await.is_empty());
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_fails_without_enrichment() {
        let uploader = Arc::new(MockUploader::succeeding());
        let mut gateway = MockAgentGateway::with_canned_responses();
        gateway.script(
            AgentRole::PrimaryAudit,
            AgentResult::ok(json!({ "status": "error", "result": {} })),
        );
        let gateway = Arc::new(gateway);
        let orchestrator = orchestrator_with(uploader, Arc::clone(&gateway));

        orchestrator.load_ledger(three_row_ledger()).await;
        let error = orchestrator.run_analysis().await.unwrap_err();
        orchestrator.await_enrichment().await;

        assert!(matches!(error, OrchestrationError::AgentLogicError(_)));
        assert_eq!(orchestrator.state().await, AnalysisState::Failed);
        assert!(orchestrator.snapshot().await.is_none());
        assert_eq!(gateway.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_failure_leaves_snapshot_ready() {
        let uploader = Arc::new(MockUploader::succeeding());
        let mut gateway = MockAgentGateway::with_canned_responses();
        gateway.script(AgentRole::NewsContext, AgentResult::err("news feed down"));
        let orchestrator = orchestrator_with(uploader, Arc::new(gateway));

        orchestrator.load_ledger(three_row_ledger()).await;
        orchestrator.run_analysis().await.unwrap();
        orchestrator.await_enrichment().await;

        assert_eq!(orchestrator.state().await, AnalysisState::Ready);
        let snapshot = orchestrator.snapshot().await.unwrap();
        assert!(snapshot.market_context.is_none());
        assert!(orchestrator.error_message().await.is_none());
    }

    /// Gateway that stalls the news-context call so a reset can land first
    struct SlowNewsGateway {
        inner: MockAgentGateway,
    }

    #[async_trait]
    impl AgentGateway for SlowNewsGateway {
        async fn invoke(
            &self,
            role: AgentRole,
            message: &str,
            attachments: Option<&[AssetReference]>,
        ) -> AgentResult {
            if role == AgentRole::NewsContext {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.invoke(role, message, attachments).await
        }
    }

    #[tokio::test]
    async fn test_stale_enrichment_is_discarded_after_reset() {
        let uploader = Arc::new(MockUploader::succeeding());
        let gateway = Arc::new(SlowNewsGateway {
            inner: MockAgentGateway::with_canned_responses(),
        });
        let orchestrator = AnalysisOrchestrator::new(uploader, gateway, new_session());

        orchestrator.load_ledger(three_row_ledger()).await;
        orchestrator.run_analysis().await.unwrap();
        assert!(orchestrator.snapshot().await.is_some());

        // Reset while the enrichment call is still in flight
        orchestrator.reset().await;
        orchestrator.await_enrichment().await;

        assert_eq!(orchestrator.state().await, AnalysisState::Idle);
        assert!(orchestrator.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_reanalysis_replaces_snapshot_wholesale() {
        let uploader = Arc::new(MockUploader::succeeding());
        let gateway = Arc::new(MockAgentGateway::with_canned_responses());
        let orchestrator = orchestrator_with(uploader, gateway);

        orchestrator.load_ledger(three_row_ledger()).await;
        orchestrator.run_analysis().await.unwrap();
        orchestrator.await_enrichment().await;
        let first = orchestrator.snapshot().await.unwrap();

        orchestrator.run_analysis().await.unwrap();
        let second = orchestrator.snapshot().await.unwrap();

        // New snapshot starts without market context until its own enrichment lands
        assert!(first.market_context.is_some());
        assert!(second.produced_at >= first.produced_at);
        orchestrator.await_enrichment().await;
    }
}
