//! Shared session slice
//!
//! Holds the state both orchestrators read: the currently loaded ledger, the
//! goal set, and the generation counter that invalidates in-flight work after
//! a reset. Calls never get cancelled; instead every state-mutating
//! continuation captures the generation at dispatch and discards itself when
//! the session has moved on.

use crate::models::{GoalSet, LedgerFile};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct SessionState {
    pub ledger: Option<LedgerFile>,
    pub goals: GoalSet,
    generation: u64,
}

impl SessionState {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Invalidate all in-flight work and clear the session slice
    pub fn reset(&mut self) {
        self.generation += 1;
        self.ledger = None;
        self.goals.clear();
        debug!(generation = self.generation, "session reset");
    }
}

/// Shared handle to the session slice
pub type SharedSession = Arc<RwLock<SessionState>>;

pub fn new_session() -> SharedSession {
    Arc::new(RwLock::new(SessionState::default()))
}
