//! The scan pipeline: admission, concurrent evidence gathering, score
//! aggregation and classification — plus the conservative fallback result
//! when the primary evidence path is unavailable.

use crate::error::ScanError;
use crate::heuristics::{self, StaticReport};
use crate::judges::{GatherOutcome, JudgeHints};
use crate::models::{
    Assessment, DomainInfo, Finding, ModelOpinion, ReputationResult, ScanRequest, Severity,
    SourcePreference, Verdict,
};
use crate::quota::Admission;
use crate::scoring;
use crate::state::AppState;
use chrono::Utc;
use uuid::Uuid;

/// Score of the degraded-but-valid fallback result.
pub const FALLBACK_SCORE: u8 = 45;

/// Run one scan end to end.
///
/// The only error paths out of here are admission failures; everything the
/// external services throw at us degrades the evidence set instead.
pub async fn run_scan(state: &AppState, req: ScanRequest) -> Result<Assessment, ScanError> {
    // 1. Admission — strictly before any evidence gathering. The store
    //    applies reset, limit check and increment as one atomic update, so
    //    concurrent scans from one caller cannot lose a consumption. A
    //    cycle that later falls back still counts.
    let caller_key = req.caller.key();
    match state
        .quota
        .admit_and_consume(
            &caller_key,
            state.limit_for(&req.caller),
            req.privileged,
            Utc::now(),
        )
        .await
    {
        Ok(Admission::Admitted(_)) => {}
        Ok(Admission::Rejected {
            used,
            limit,
            next_reset,
        }) => {
            return Err(ScanError::QuotaExceeded {
                used,
                limit,
                next_reset,
            });
        }
        Err(e) => {
            // The quota store being down must not take scanning down with it.
            tracing::warn!("quota gate unavailable for {caller_key}: {e}");
        }
    }

    // 2. Static heuristics run inline: pure, no I/O.
    let stat = heuristics::analyze(&req.artifact);

    // 3. Reputation and every judge fan out concurrently; each call owns
    //    its own timeout and none blocks the others.
    let (reputation, gathered) = match req.preference {
        SourcePreference::Full => {
            let hints = JudgeHints {
                trust: stat.trust,
                prior_findings: stat
                    .findings
                    .iter()
                    .map(|f| f.description.clone())
                    .collect(),
            };
            let full_text = req.artifact.full_text();
            tokio::join!(
                state.reputation.lookup(req.artifact.text()),
                state.judges.consult(&full_text, &hints),
            )
        }
        // Static-only scans skip the network by request; the missing
        // evidence is deliberate, not a transport failure.
        SourcePreference::StaticOnly => (
            None,
            GatherOutcome {
                opinions: Vec::new(),
                transport_down: false,
            },
        ),
    };

    let assessment = if needs_fallback(&gathered, reputation.as_ref()) {
        fallback_assessment(&stat)
    } else {
        assemble(state, stat, reputation, gathered.opinions)
    };

    // 4. Fire-and-forget persistence: the caller gets their result either way.
    if let Err(e) = state.history.append(&caller_key, &assessment).await {
        tracing::warn!("scan history append failed for {caller_key}: {e}");
    }

    Ok(assessment)
}

/// The fallback triggers only when the judge transport itself produced
/// nothing AND the reputation lookup is absent. One surviving opinion, or a
/// present reputation report, keeps the normal path.
fn needs_fallback(gathered: &GatherOutcome, reputation: Option<&ReputationResult>) -> bool {
    gathered.transport_down && reputation.is_none()
}

fn assemble(
    state: &AppState,
    stat: StaticReport,
    reputation: Option<ReputationResult>,
    opinions: Vec<ModelOpinion>,
) -> Assessment {
    let score = scoring::aggregate(&stat, reputation.as_ref(), &opinions, &state.policy);
    let (verdict, risk_level) = scoring::classify(score);
    let findings = scoring::merge_findings(&stat, &opinions);

    let mut recommendations: Vec<String> = Vec::new();
    for opinion in &opinions {
        for rec in &opinion.recommendations {
            if !recommendations.contains(rec) {
                recommendations.push(rec.clone());
            }
        }
    }
    if recommendations.is_empty() {
        recommendations.push(default_recommendation(verdict).to_string());
    }

    Assessment {
        id: Uuid::new_v4(),
        score,
        verdict,
        risk_level,
        findings,
        recommendations,
        domain_info: Some(DomainInfo {
            host: stat.host.clone(),
            trust: stat.trust,
            shortened: stat.shortened,
            risky_tld: stat.risky_tld,
        }),
        reputation,
        model_opinions: opinions,
        created_at: Utc::now(),
    }
}

fn default_recommendation(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Safe => "No strong risk signals found. Still verify the seller before paying.",
        Verdict::Caution => {
            "Verify this independently before sharing personal or payment details."
        }
        Verdict::Dangerous => "Avoid this link and do not enter personal or payment information.",
    }
}

/// Fixed, conservative result for when no real evidence could be gathered.
/// Returned with a success status and persisted like any other scan — the
/// caller already consumed a quota unit and expects a result.
fn fallback_assessment(stat: &StaticReport) -> Assessment {
    let (verdict, risk_level) = scoring::classify(FALLBACK_SCORE);
    Assessment {
        id: Uuid::new_v4(),
        score: FALLBACK_SCORE,
        verdict,
        risk_level,
        findings: vec![
            Finding::new(
                "engine",
                "Automated verification could not be completed — external analysis services \
                 were unavailable",
                Severity::Warning,
            ),
            Finding::new(
                "engine",
                "Treat this result as provisional",
                Severity::Info,
            ),
        ],
        recommendations: vec![
            "Re-run the scan in a few minutes".to_string(),
            "Proceed only after independently verifying the link or seller".to_string(),
        ],
        domain_info: Some(DomainInfo {
            host: stat.host.clone(),
            trust: stat.trust,
            shortened: stat.shortened,
            risky_tld: stat.risky_tld,
        }),
        reputation: None,
        model_opinions: Vec::new(),
        created_at: Utc::now(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
