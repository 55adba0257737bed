//! Multi-model evidence gathering.
//!
//! Every configured judge is asked concurrently; each call carries its own
//! timeout, and one judge failing (timeout, transport error, non-success
//! status) never blocks or fails the others. Replies are free text expected
//! to contain an embedded JSON object and are parsed defensively: a reply
//! we cannot parse still contributes its raw text as the analysis.

use crate::models::{DomainTrust, Finding, ModelOpinion, Severity};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Default budget per judge invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

const SYSTEM_PROMPT: &str = "You are a fraud analyst. Assess the artifact the user submits for \
     scam and fraud signals. Reply with a JSON object: \
     {\"analysis\": string, \"findings\": [string], \"recommendations\": [string]}.";

/// One named AI judge endpoint.
#[derive(Debug, Clone)]
pub struct Judge {
    pub name: String,
    pub endpoint: String,
}

impl Judge {
    /// Parse a roster from `name=url,name=url` (the `JUDGE_ENDPOINTS` format).
    /// Malformed entries are skipped with a warning.
    pub fn roster_from(spec: &str) -> Vec<Judge> {
        spec.split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once('=') {
                    Some((name, endpoint)) if !name.is_empty() && !endpoint.is_empty() => {
                        Some(Judge {
                            name: name.trim().to_string(),
                            endpoint: endpoint.trim().to_string(),
                        })
                    }
                    _ => {
                        tracing::warn!("ignoring malformed judge entry: {entry:?}");
                        None
                    }
                }
            })
            .collect()
    }
}

/// Contextual hints forwarded to every judge alongside the artifact.
#[derive(Debug, Clone)]
pub struct JudgeHints {
    pub trust: DomainTrust,
    /// Descriptions of findings gathered so far (static pass).
    pub prior_findings: Vec<String>,
}

/// Everything the gatherer settled on.
#[derive(Debug, Clone)]
pub struct GatherOutcome {
    pub opinions: Vec<ModelOpinion>,
    /// True when the judge transport produced nothing at all — no judges
    /// configured, or every invocation failed. "Judges found nothing wrong"
    /// is not transport failure.
    pub transport_down: bool,
}

/// Fan-out client over the judge roster.
#[derive(Clone)]
pub struct JudgePanel {
    http: reqwest::Client,
    judges: Vec<Judge>,
    timeout: Duration,
}

/// Embedded JSON shape judges are prompted to return. All fields optional:
/// the payload is untrusted model output.
#[derive(Debug, Default, Deserialize)]
struct OpinionPayload {
    analysis: Option<String>,
    #[serde(default)]
    findings: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl JudgePanel {
    pub fn new(http: reqwest::Client, judges: Vec<Judge>, timeout: Duration) -> Self {
        Self {
            http,
            judges,
            timeout,
        }
    }

    /// Ask every judge at once and collect whatever settled.
    pub async fn consult(&self, artifact: &str, hints: &JudgeHints) -> GatherOutcome {
        if self.judges.is_empty() {
            return GatherOutcome {
                opinions: Vec::new(),
                transport_down: true,
            };
        }

        let calls = self
            .judges
            .iter()
            .map(|judge| self.consult_one(judge, artifact, hints));
        let opinions: Vec<ModelOpinion> = join_all(calls).await.into_iter().flatten().collect();

        GatherOutcome {
            transport_down: opinions.is_empty(),
            opinions,
        }
    }

    /// One judge invocation. Every failure mode collapses to `None`.
    async fn consult_one(
        &self,
        judge: &Judge,
        artifact: &str,
        hints: &JudgeHints,
    ) -> Option<ModelOpinion> {
        let user_prompt = build_prompt(artifact, hints);
        let request = self
            .http
            .post(&judge.endpoint)
            .json(&json!({
                "model": judge.name,
                "system": SYSTEM_PROMPT,
                "user": user_prompt,
            }))
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::debug!("judge {} unreachable: {e}", judge.name);
                return None;
            }
            Err(_) => {
                tracing::debug!("judge {} timed out after {:?}", judge.name, self.timeout);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("judge {} returned {}", judge.name, response.status());
            return None;
        }

        let raw = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("judge {} body unreadable: {e}", judge.name);
                return None;
            }
        };

        Some(parse_opinion(&judge.name, &raw))
    }
}

fn build_prompt(artifact: &str, hints: &JudgeHints) -> String {
    let trust = match hints.trust {
        DomainTrust::Trusted => "domain is on the trusted allowlist",
        DomainTrust::Untrusted => "domain is not on the trusted allowlist",
        DomainTrust::Unknown => "domain trust is unknown",
    };
    let mut prompt = format!("Artifact: {artifact}\nContext: {trust}.");
    if !hints.prior_findings.is_empty() {
        prompt.push_str("\nFindings so far:\n");
        for finding in &hints.prior_findings {
            prompt.push_str(&format!("- {finding}\n"));
        }
    }
    prompt
}

/// Turn a judge's free-text reply into a structured opinion.
///
/// The reply is expected to contain one JSON object somewhere in the text
/// (models love to wrap it in prose or code fences). When no parseable
/// object is found, the raw text becomes the analysis and the structured
/// fields stay empty — the judge's contribution is degraded, not discarded.
pub fn parse_opinion(model: &str, raw: &str) -> ModelOpinion {
    if let Some(payload) = extract_payload(raw) {
        return ModelOpinion {
            model: model.to_string(),
            analysis: payload.analysis.unwrap_or_default(),
            findings: payload
                .findings
                .into_iter()
                .map(|d| Finding::new(model, d, Severity::Info))
                .collect(),
            recommendations: payload.recommendations,
        };
    }

    ModelOpinion {
        model: model.to_string(),
        analysis: raw.trim().to_string(),
        findings: Vec::new(),
        recommendations: Vec::new(),
    }
}

fn extract_payload(raw: &str) -> Option<OpinionPayload> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
