//! Axum route handlers for the ScamLens engine.

use crate::{
    error::ScanError,
    models::{
        Artifact, Caller, ScanLinkRequest, ScanProductRequest, ScanRequest, ScanResponse,
        SourcePreference,
    },
    pipeline, quota,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

/// Longest artifact the API accepts.
const MAX_ARTIFACT_LEN: usize = 2048;

// ── Health ────────────────────────────────────────────────────────────────────

/// `GET /health` — Health check
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "scamlens",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── Scan ──────────────────────────────────────────────────────────────────────

/// `POST /scan/link` — Score a URL for fraud signals.
///
/// Body: `{ "artifact": "https://…", "callerIdentity": "...", "sources": "full" }`
pub async fn scan_link(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanLinkRequest>,
) -> Result<Json<ScanResponse>, ScanError> {
    let artifact = validated_artifact(&req.artifact)?;

    let assessment = pipeline::run_scan(
        &state,
        ScanRequest {
            artifact: Artifact::Url(artifact),
            caller: caller_from(req.caller_identity),
            preference: preference_from(req.sources.as_deref()),
            privileged: false,
        },
    )
    .await?;

    tracing::info!(
        "link scan {} scored {} ({:?})",
        assessment.id,
        assessment.score,
        assessment.verdict
    );

    Ok(Json(assessment.into()))
}

/// `POST /scan/product` — Score a product listing for fraud signals.
///
/// Body: `{ "artifact": "<image ref or text>", "metadata": {…}, "callerIdentity": "..." }`
pub async fn scan_product(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanProductRequest>,
) -> Result<Json<ScanResponse>, ScanError> {
    let reference = validated_artifact(&req.artifact)?;

    let assessment = pipeline::run_scan(
        &state,
        ScanRequest {
            artifact: Artifact::Product {
                reference,
                metadata: req.metadata,
            },
            caller: caller_from(req.caller_identity),
            preference: preference_from(req.sources.as_deref()),
            privileged: false,
        },
    )
    .await?;

    tracing::info!(
        "product scan {} scored {} ({:?})",
        assessment.id,
        assessment.score,
        assessment.verdict
    );

    Ok(Json(assessment.into()))
}

// ── Quota ─────────────────────────────────────────────────────────────────────

/// `GET /quota/:caller` — Remaining allowance for a caller (UI display).
///
/// The path value addresses the same bucket the scan endpoints consume
/// from: `guest:anonymous`, `user:42`, or a bare id (treated as a user).
pub async fn quota_view(
    State(state): State<Arc<AppState>>,
    Path(caller): Path<String>,
) -> Result<Json<Value>, ScanError> {
    let caller = match caller.split_once(':') {
        Some(("guest", marker)) => Caller::Guest(marker.to_string()),
        Some(("user", id)) => Caller::User(id.to_string()),
        _ => Caller::User(caller),
    };
    let quota_state = state
        .quota
        .load(&caller.key(), state.limit_for(&caller))
        .await
        .map_err(ScanError::Internal)?;

    // Counters that predate today read as fresh — the reset itself happens
    // on the next admitted scan.
    let used = if quota_state.last_reset.date_naive() == Utc::now().date_naive() {
        quota_state.consumed
    } else {
        0
    };

    Ok(Json(json!({
        "scansUsed": used,
        "scanLimit": quota_state.allowance(),
        "unlimited": quota_state.unlimited,
        "remaining": quota_state.allowance().saturating_sub(used),
        "nextResetTime": quota::next_reset_after(Utc::now()),
    })))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn validated_artifact(raw: &str) -> Result<String, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanError::InvalidArtifact("artifact must not be empty".into()));
    }
    if trimmed.len() > MAX_ARTIFACT_LEN {
        return Err(ScanError::InvalidArtifact(format!(
            "artifact exceeds {MAX_ARTIFACT_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn caller_from(identity: Option<String>) -> Caller {
    match identity {
        Some(id) if !id.trim().is_empty() => Caller::User(id),
        _ => Caller::Guest("anonymous".into()),
    }
}

fn preference_from(sources: Option<&str>) -> SourcePreference {
    match sources {
        Some("static_only") => SourcePreference::StaticOnly,
        _ => SourcePreference::Full,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judges::JudgePanel;
    use crate::reputation::ReputationClient;
    use crate::scoring::ScorePolicy;
    use crate::store::{MemoryQuotaStore, MemoryScanHistory};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::time::Duration;

    /// Server with every network evidence source absent.
    fn degraded_server(guest_limit: u32) -> TestServer {
        let state = AppState {
            policy: ScorePolicy::default(),
            quota: Arc::new(MemoryQuotaStore::default()),
            history: Arc::new(MemoryScanHistory::default()),
            reputation: ReputationClient::new(
                reqwest::Client::new(),
                "http://127.0.0.1:9".into(),
                None,
                Duration::from_millis(100),
            ),
            judges: JudgePanel::new(reqwest::Client::new(), vec![], Duration::from_millis(100)),
            guest_scan_limit: guest_limit,
            user_scan_limit: 10,
        };
        TestServer::new(crate::router(Arc::new(state))).expect("test server")
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let resp = health().await;
        assert_eq!(resp.0["status"], "ok");
        assert_eq!(resp.0["service"], "scamlens");
    }

    #[tokio::test]
    async fn degraded_scan_still_succeeds_with_fallback() {
        let server = degraded_server(5);
        let resp = server
            .post("/scan/link")
            .json(&json!({ "artifact": "http://example.net/offer" }))
            .await;

        assert_eq!(resp.status_code(), StatusCode::OK);
        let body: Value = resp.json();
        assert_eq!(body["score"], 45);
        assert_eq!(body["verdict"], "caution");
        assert_eq!(body["risk_level"], "high");
    }

    #[tokio::test]
    async fn empty_artifact_is_rejected() {
        let server = degraded_server(5);
        let resp = server
            .post("/scan/link")
            .json(&json!({ "artifact": "   " }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exhausted_quota_returns_429_shape() {
        let server = degraded_server(1);
        let body = json!({ "artifact": "http://example.net/x" });

        let first = server.post("/scan/link").json(&body).await;
        assert_eq!(first.status_code(), StatusCode::OK);

        let second = server.post("/scan/link").json(&body).await;
        assert_eq!(second.status_code(), StatusCode::TOO_MANY_REQUESTS);
        let payload: Value = second.json();
        assert_eq!(payload["limitReached"], true);
        assert_eq!(payload["scansUsed"], 1);
        assert_eq!(payload["scanLimit"], 1);
        assert!(payload["nextResetTime"].is_string());
    }

    #[tokio::test]
    async fn product_scan_reports_static_findings() {
        let server = degraded_server(5);
        let resp = server
            .post("/scan/product")
            .json(&json!({
                "artifact": "listing-20451",
                "metadata": { "title": "FREE designer watch giveaway" },
                "sources": "static_only",
            }))
            .await;

        assert_eq!(resp.status_code(), StatusCode::OK);
        let body: Value = resp.json();
        let findings = body["findings"].as_array().expect("findings array");
        assert!(findings
            .iter()
            .any(|f| f.as_str().is_some_and(|s| s.contains("\"giveaway\""))));
    }

    #[tokio::test]
    async fn quota_view_reports_remaining() {
        let server = degraded_server(5);
        let resp = server.get("/quota/user-42").await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        let body: Value = resp.json();
        assert_eq!(body["scansUsed"], 0);
        assert_eq!(body["scanLimit"], 10);
        assert_eq!(body["remaining"], 10);
    }

    #[tokio::test]
    async fn quota_view_reads_the_guest_bucket() {
        let server = degraded_server(5);
        // Anonymous scans consume from guest:anonymous; the view must show it.
        let resp = server
            .post("/scan/link")
            .json(&json!({ "artifact": "http://example.net/x" }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::OK);

        let view = server.get("/quota/guest:anonymous").await;
        assert_eq!(view.status_code(), StatusCode::OK);
        let body: Value = view.json();
        assert_eq!(body["scansUsed"], 1);
        assert_eq!(body["scanLimit"], 5);
        assert_eq!(body["remaining"], 4);
    }
}
