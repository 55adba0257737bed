//! External threat-intelligence lookup.
//!
//! "Key not configured", "service has no data yet", "timeout" and any
//! transport or decode failure all collapse to `None`. Absence is an
//! expected evidence state, never an error surfaced to the caller.

use crate::models::ReputationResult;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default budget for the whole lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a VirusTotal-style URL reputation API.
#[derive(Clone)]
pub struct ReputationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

/// Wire shape of the vendor report. Everything is optional: the service is
/// free to omit fields we do not control.
#[derive(Debug, Deserialize)]
struct WireReport {
    /// 1 = report available, 0 = not yet analysed.
    response_code: Option<i32>,
    positives: Option<u32>,
    total: Option<u32>,
    #[serde(default)]
    scans: HashMap<String, WireVendor>,
    permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireVendor {
    #[serde(default)]
    detected: bool,
}

impl ReputationClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            timeout,
        }
    }

    /// Look the artifact up. Returns `None` for every degraded condition.
    pub async fn lookup(&self, artifact: &str) -> Option<ReputationResult> {
        let api_key = match &self.api_key {
            Some(k) => k,
            None => {
                tracing::debug!("reputation lookup skipped: no API key configured");
                return None;
            }
        };

        let request = self
            .http
            .get(format!("{}/url/report", self.base_url))
            .query(&[("apikey", api_key.as_str()), ("resource", artifact)])
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::debug!("reputation lookup failed: {e}");
                return None;
            }
            Err(_) => {
                tracing::debug!("reputation lookup timed out after {:?}", self.timeout);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("reputation lookup returned {}", response.status());
            return None;
        }

        let report: WireReport = match response.json().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("reputation report undecodable: {e}");
                return None;
            }
        };

        Self::from_wire(report)
    }

    fn from_wire(report: WireReport) -> Option<ReputationResult> {
        // response_code 0 means the service has not analysed this artifact yet.
        if report.response_code? != 1 {
            return None;
        }

        let mut vendors: Vec<String> = report
            .scans
            .iter()
            .filter(|(_, v)| v.detected)
            .map(|(name, _)| name.clone())
            .collect();
        vendors.sort();

        Some(ReputationResult {
            positives: report.positives.unwrap_or(vendors.len() as u32),
            total: report.total.unwrap_or(report.scans.len() as u32),
            vendors,
            permalink: report.permalink,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
