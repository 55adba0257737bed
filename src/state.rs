//! Application state and environment configuration.

use crate::judges::{Judge, JudgePanel};
use crate::models::Caller;
use crate::quota::QuotaStore;
use crate::reputation::{self, ReputationClient};
use crate::scoring::ScorePolicy;
use crate::store::{MemoryQuotaStore, MemoryScanHistory, ScanHistory};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into every Axum handler.
///
/// The quota store and scan history are trait objects: production wiring
/// swaps the in-memory defaults for the real external stores at this seam,
/// and the engine stays stateless and testable either way.
pub struct AppState {
    pub policy: ScorePolicy,
    pub quota: Arc<dyn QuotaStore>,
    pub history: Arc<dyn ScanHistory>,
    pub reputation: ReputationClient,
    pub judges: JudgePanel,
    pub guest_scan_limit: u32,
    pub user_scan_limit: u32,
}

impl AppState {
    /// Build state from the environment.
    ///
    /// - `REPUTATION_API_KEY` / `REPUTATION_API_URL` — reputation lookups
    ///   are disabled (always absent) without a key.
    /// - `JUDGE_ENDPOINTS` — comma-separated `name=url` pairs.
    /// - `REPUTATION_TIMEOUT_MS` / `JUDGE_TIMEOUT_MS` — per-call budgets.
    /// - `GUEST_SCAN_LIMIT` / `USER_SCAN_LIMIT` — daily admission limits.
    pub fn from_env() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scamlens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let api_key = std::env::var("REPUTATION_API_KEY").ok();
        if api_key.is_none() {
            tracing::warn!("REPUTATION_API_KEY not set — reputation lookups disabled");
        }
        let base_url = std::env::var("REPUTATION_API_URL")
            .unwrap_or_else(|_| "https://www.virustotal.com/vtapi/v2".into());
        let reputation = ReputationClient::new(
            http.clone(),
            base_url,
            api_key,
            env_duration("REPUTATION_TIMEOUT_MS", reputation::DEFAULT_TIMEOUT),
        );

        let roster = std::env::var("JUDGE_ENDPOINTS")
            .map(|s| Judge::roster_from(&s))
            .unwrap_or_default();
        if roster.is_empty() {
            tracing::warn!("JUDGE_ENDPOINTS not set — scans degrade to the fallback result");
        } else {
            tracing::info!(
                "judge roster: {}",
                roster
                    .iter()
                    .map(|j| j.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        let judges = JudgePanel::new(
            http,
            roster,
            env_duration("JUDGE_TIMEOUT_MS", crate::judges::DEFAULT_TIMEOUT),
        );

        Ok(Self {
            policy: ScorePolicy::default(),
            quota: Arc::new(MemoryQuotaStore::default()),
            history: Arc::new(MemoryScanHistory::default()),
            reputation,
            judges,
            guest_scan_limit: env_u32("GUEST_SCAN_LIMIT", 3),
            user_scan_limit: env_u32("USER_SCAN_LIMIT", 10),
        })
    }

    /// Daily limit for a caller class.
    pub fn limit_for(&self, caller: &Caller) -> u32 {
        match caller {
            Caller::User(_) => self.user_scan_limit,
            Caller::Guest(_) => self.guest_scan_limit,
        }
    }
}

fn env_duration(name: &str, default: Duration) -> Duration {
    match std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(ms) => Duration::from_millis(ms),
        None => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
