//! Domain models for the ScamLens scoring engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Artifact & request ────────────────────────────────────────────────────────

/// Structured product metadata accompanying a product-assessment scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub title: Option<String>,
    pub seller: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

/// The item under test. Immutable once created.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// A normalized URL string (link-analysis flow).
    Url(String),
    /// An image reference or free-text product description, plus optional
    /// structured metadata (product-assessment flow).
    Product {
        reference: String,
        metadata: Option<ProductMetadata>,
    },
}

impl Artifact {
    /// The primary text evidence sources look at.
    pub fn text(&self) -> &str {
        match self {
            Artifact::Url(u) => u,
            Artifact::Product { reference, .. } => reference,
        }
    }

    /// Everything textual about the artifact, for keyword rules and judge prompts.
    pub fn full_text(&self) -> String {
        match self {
            Artifact::Url(u) => u.clone(),
            Artifact::Product {
                reference,
                metadata,
            } => {
                let mut parts = vec![reference.clone()];
                if let Some(m) = metadata {
                    for field in [&m.title, &m.seller, &m.price, &m.description] {
                        if let Some(v) = field {
                            parts.push(v.clone());
                        }
                    }
                }
                parts.join(" ")
            }
        }
    }
}

/// Who is asking for the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Authenticated user id.
    User(String),
    /// Anonymous caller, keyed by an opaque guest marker.
    Guest(String),
}

impl Caller {
    /// Stable key used by the quota store and scan history.
    pub fn key(&self) -> String {
        match self {
            Caller::User(id) => format!("user:{id}"),
            Caller::Guest(marker) => format!("guest:{marker}"),
        }
    }
}

/// Which evidence sources the caller wants consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcePreference {
    /// Static rules, reputation lookup and all AI judges.
    #[default]
    Full,
    /// Static rules only — no network calls.
    StaticOnly,
}

/// One scan, immutable once created.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub artifact: Artifact,
    pub caller: Caller,
    pub preference: SourcePreference,
    /// Administrator override — bypasses the quota gate entirely.
    pub privileged: bool,
}

// ── Quota ─────────────────────────────────────────────────────────────────────

/// Per-caller quota counters, owned by the quota store collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaState {
    /// Scans consumed in the current period.
    pub consumed: u32,
    /// Base scan limit for the period.
    pub limit: u32,
    /// Extra allowance (referrals, promotions).
    pub bonus: u32,
    /// Premium subscribers are never rate-limited.
    pub unlimited: bool,
    pub last_reset: DateTime<Utc>,
}

impl QuotaState {
    pub fn new(limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            consumed: 0,
            limit,
            bonus: 0,
            unlimited: false,
            last_reset: now,
        }
    }

    /// Effective ceiling for the current period.
    pub fn allowance(&self) -> u32 {
        self.limit.saturating_add(self.bonus)
    }
}

// ── Evidence ──────────────────────────────────────────────────────────────────

/// Severity hint attached to a finding. `Warning` and `Critical` mark the two
/// contextual-rule tiers; everything else is `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One discrete piece of risk evidence. Immutable; duplicates are coalesced
/// by description when findings from all sources are merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// `static`, `reputation`, or the name of the AI judge that produced it.
    pub source: String,
    pub description: String,
    pub severity: Severity,
}

impl Finding {
    pub fn new(source: &str, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            source: source.to_string(),
            description: description.into(),
            severity,
        }
    }
}

/// Result of the external threat-intelligence lookup. Absence (timeout,
/// unconfigured key, no data yet) is an expected state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationResult {
    /// Vendors flagging the artifact.
    pub positives: u32,
    /// Vendors checked.
    pub total: u32,
    /// Names of the flagging vendors — explanation text only, never scoring input.
    pub vendors: Vec<String>,
    pub permalink: Option<String>,
}

/// One AI judge's structured opinion. A judge that errors out contributes
/// nothing rather than aborting the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOpinion {
    pub model: String,
    pub analysis: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

// ── Verdict & assessment ──────────────────────────────────────────────────────

/// Coarse three-way classification shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Caution,
    Dangerous,
}

/// Finer four-way classification used for internal severity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Whether the artifact's domain is on the trusted allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainTrust {
    Trusted,
    Untrusted,
    /// The artifact has no parseable domain.
    Unknown,
}

/// Host-level facts surfaced by the static analyzer, echoed in the response.
#[derive(Debug, Clone, Serialize)]
pub struct DomainInfo {
    pub host: Option<String>,
    pub trust: DomainTrust,
    pub shortened: bool,
    pub risky_tld: bool,
}

/// The engine's output: one per request, immutable after construction.
/// `verdict` and `risk_level` are always derived from `score` by the
/// classifier, never set independently.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub id: Uuid,
    /// Always present and in `[0, 100]`, even when every evidence source failed.
    pub score: u8,
    pub verdict: Verdict,
    pub risk_level: RiskLevel,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub domain_info: Option<DomainInfo>,
    pub reputation: Option<ReputationResult>,
    pub model_opinions: Vec<ModelOpinion>,
    pub created_at: DateTime<Utc>,
}

// ── Wire DTOs ─────────────────────────────────────────────────────────────────

/// Request body for `POST /scan/link`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanLinkRequest {
    /// The URL to check.
    pub artifact: String,
    pub caller_identity: Option<String>,
    /// `full` (default) or `static_only`.
    pub sources: Option<String>,
}

/// Request body for `POST /scan/product`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProductRequest {
    /// Image reference or free-text product description.
    pub artifact: String,
    pub metadata: Option<ProductMetadata>,
    pub caller_identity: Option<String>,
    pub sources: Option<String>,
}

/// Success response for both scan endpoints.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub id: Uuid,
    pub score: u8,
    pub verdict: Verdict,
    pub risk_level: RiskLevel,
    /// Finding descriptions, deduplicated.
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_info: Option<DomainInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<ReputationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub model_opinions: Vec<ModelOpinion>,
    pub created_at: DateTime<Utc>,
}

impl From<Assessment> for ScanResponse {
    fn from(a: Assessment) -> Self {
        Self {
            id: a.id,
            score: a.score,
            verdict: a.verdict,
            risk_level: a.risk_level,
            findings: a.findings.iter().map(|f| f.description.clone()).collect(),
            recommendations: a.recommendations,
            domain_info: a.domain_info,
            reputation: a.reputation,
            model_opinions: a.model_opinions,
            created_at: a.created_at,
        }
    }
}
