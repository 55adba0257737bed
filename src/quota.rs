//! Admission control — the per-caller scan quota gate.
//!
//! The gate runs before any evidence gathering: a rejected caller causes no
//! network calls and no counter movement. Admission consumes exactly one
//! quota unit per started cycle, even when the cycle later degrades to the
//! fallback result.

use crate::models::QuotaState;
use async_trait::async_trait;
use chrono::{DateTime, Days, Utc};

/// Outcome of one admission update.
#[derive(Debug, Clone)]
pub enum Admission {
    /// Caller admitted; one consumption recorded.
    Admitted(QuotaState),
    /// Caller over the limit; nothing recorded.
    Rejected {
        used: u32,
        limit: u32,
        next_reset: DateTime<Utc>,
    },
}

/// Narrow interface onto the external quota store.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Current state for the caller, initialised with `limit` for callers
    /// the store has never seen. Read-only: used for display.
    async fn load(&self, caller: &str, limit: u32) -> anyhow::Result<QuotaState>;

    /// The admission gate as a single atomic update: reset a stale counter,
    /// evaluate the limit, and record one consumption on admission.
    /// Implementations must hold the caller's record exclusively across the
    /// read-decide-increment — two concurrent scans must never both observe
    /// the same pre-increment counter (lost update drifts the quota).
    async fn admit_and_consume(
        &self,
        caller: &str,
        limit: u32,
        privileged: bool,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Admission>;
}

/// Decide admission for one scan cycle, mutating `state` in place.
///
/// This is the gate's pure core; store implementations call it inside their
/// atomic section. Counters that last reset before today (operational
/// timezone: UTC) are zeroed first. Privileged callers (administrators) and
/// premium accounts bypass the limit but still have their consumption
/// tracked. Rejection leaves the state untouched.
pub fn admit(state: &mut QuotaState, privileged: bool, now: DateTime<Utc>) -> Admission {
    if state.last_reset.date_naive() != now.date_naive() {
        state.consumed = 0;
        state.last_reset = now;
    }

    if !privileged && !state.unlimited && state.consumed >= state.allowance() {
        return Admission::Rejected {
            used: state.consumed,
            limit: state.allowance(),
            next_reset: next_reset_after(now),
        };
    }

    state.consumed = state.consumed.saturating_add(1);
    Admission::Admitted(state.clone())
}

/// Midnight UTC of the following day — when the counter resets.
pub fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Days::new(1);
    match tomorrow.and_hms_opt(0, 0, 0) {
        Some(midnight) => midnight.and_utc(),
        // Unreachable for any representable date; fall back to "try again later".
        None => now,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
