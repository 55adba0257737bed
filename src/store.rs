//! Storage collaborators: quota store and append-only scan history.
//!
//! The real stores live outside this service; the engine only sees the
//! narrow traits. The in-memory implementations here back local runs and
//! tests.

use crate::models::{Assessment, QuotaState};
use crate::quota::{self, Admission, QuotaStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Append-only scan history. Failures are logged by the caller and never
/// fail the scan response.
#[async_trait]
pub trait ScanHistory: Send + Sync {
    async fn append(&self, caller: &str, assessment: &Assessment) -> anyhow::Result<()>;
}

/// In-memory quota store keyed by caller.
#[derive(Default)]
pub struct MemoryQuotaStore {
    states: Mutex<HashMap<String, QuotaState>>,
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn load(&self, caller: &str, limit: u32) -> anyhow::Result<QuotaState> {
        let states = self.states.lock().await;
        Ok(states
            .get(caller)
            .cloned()
            .unwrap_or_else(|| QuotaState::new(limit, Utc::now())))
    }

    async fn admit_and_consume(
        &self,
        caller: &str,
        limit: u32,
        privileged: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Admission> {
        // The lock is held across read, decision and increment, so two
        // concurrent scans can never both observe the same counter.
        let mut states = self.states.lock().await;
        let state = states
            .entry(caller.to_string())
            .or_insert_with(|| QuotaState::new(limit, now));
        Ok(quota::admit(state, privileged, now))
    }
}

/// In-memory scan history.
#[derive(Default)]
pub struct MemoryScanHistory {
    entries: Mutex<Vec<(String, Assessment)>>,
}

impl MemoryScanHistory {
    /// Number of recorded scans — used by tests to assert side effects.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ScanHistory for MemoryScanHistory {
    async fn append(&self, caller: &str, assessment: &Assessment) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push((caller.to_string(), assessment.clone()));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_admissions_never_lose_a_consumption() {
        let store = Arc::new(MemoryQuotaStore::default());
        let now = Utc::now();

        // Twice as many concurrent scans as the limit allows: every
        // admission must land on the counter, and not one more.
        let calls = (0..20).map(|_| {
            let store = store.clone();
            async move {
                store
                    .admit_and_consume("user:racer", 10, false, now)
                    .await
                    .expect("store is infallible")
            }
        });
        let outcomes = join_all(calls).await;

        let admitted = outcomes
            .iter()
            .filter(|o| matches!(o, Admission::Admitted(_)))
            .count();
        assert_eq!(admitted, 10);

        let state = store.load("user:racer", 10).await.unwrap();
        assert_eq!(state.consumed, 10);
    }

    #[tokio::test]
    async fn unknown_caller_loads_fresh_state() {
        let store = MemoryQuotaStore::default();
        let state = store.load("user:new", 7).await.unwrap();
        assert_eq!(state.consumed, 0);
        assert_eq!(state.limit, 7);
    }
}
