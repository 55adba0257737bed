//! Score aggregation and verdict classification.
//!
//! `aggregate` is a pure, total function of its inputs: identical evidence
//! always yields identical scores, and the result is always in `[0, 100]`.
//! Verdict and risk level are derived from the score by `classify` and
//! nowhere else.

use crate::heuristics::StaticReport;
use crate::models::{Finding, ModelOpinion, ReputationResult, RiskLevel, Severity, Verdict};
use std::collections::HashSet;

/// Scoring weights, consolidated in one place so tests can hold policy
/// constant while varying evidence. The magnitudes are tunable policy;
/// the shape (deductions subtract, bonuses add, clamp at the end) is the
/// contract.
#[derive(Debug, Clone)]
pub struct ScorePolicy {
    /// Deduction per distinct finding in the merged set.
    pub finding_penalty: i64,
    /// Deduction per vendor flagging the artifact.
    pub reputation_positive_penalty: i64,
    /// Bonus when vendors were checked and none flagged.
    pub clean_reputation_bonus: i64,
    /// Categorical deduction for link-shortener URLs.
    pub shortener_penalty: i64,
    /// Categorical deduction for high-risk TLDs.
    pub risky_tld_penalty: i64,
    /// Categorical deduction for domains not on the allowlist.
    pub untrusted_domain_penalty: i64,
    /// Categorical deduction when any `Warning`-tier contextual finding is present.
    pub warning_penalty: i64,
    /// Categorical deduction when any `Critical`-tier contextual finding is present.
    pub critical_penalty: i64,
    /// Bonus for allowlisted domains. Deliberately large enough to keep a
    /// trusted domain out of the dangerous band despite a couple of
    /// low-severity findings.
    pub trusted_bonus: i64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            finding_penalty: 8,
            reputation_positive_penalty: 5,
            clean_reputation_bonus: 5,
            shortener_penalty: 20,
            risky_tld_penalty: 15,
            untrusted_domain_penalty: 5,
            warning_penalty: 10,
            critical_penalty: 25,
            trusted_bonus: 30,
        }
    }
}

/// Merge static and judge-contributed findings, coalescing duplicates by
/// description. First occurrence wins; order is preserved.
pub fn merge_findings(stat: &StaticReport, opinions: &[ModelOpinion]) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    let all = stat
        .findings
        .iter()
        .chain(opinions.iter().flat_map(|o| o.findings.iter()));
    for finding in all {
        if seen.insert(finding.description.clone()) {
            merged.push(finding.clone());
        }
    }
    merged
}

/// Combine all gathered evidence into one bounded score.
pub fn aggregate(
    stat: &StaticReport,
    reputation: Option<&ReputationResult>,
    opinions: &[ModelOpinion],
    policy: &ScorePolicy,
) -> u8 {
    let merged = merge_findings(stat, opinions);
    let mut score: i64 = 100;

    score -= merged.len() as i64 * policy.finding_penalty;

    if let Some(rep) = reputation {
        if rep.positives > 0 {
            score -= i64::from(rep.positives) * policy.reputation_positive_penalty;
        } else if rep.total > 0 {
            score += policy.clean_reputation_bonus;
        }
    }

    if stat.shortened {
        score -= policy.shortener_penalty;
    }
    if stat.risky_tld {
        score -= policy.risky_tld_penalty;
    }

    match stat.trust {
        crate::models::DomainTrust::Trusted => score += policy.trusted_bonus,
        crate::models::DomainTrust::Untrusted => score -= policy.untrusted_domain_penalty,
        crate::models::DomainTrust::Unknown => {}
    }

    if merged.iter().any(|f| f.severity == Severity::Warning) {
        score -= policy.warning_penalty;
    }
    if merged.iter().any(|f| f.severity == Severity::Critical) {
        score -= policy.critical_penalty;
    }

    score.clamp(0, 100) as u8
}

/// Map a score onto the verdict bands, high to low. Boundary values belong
/// to the higher band.
pub fn classify(score: u8) -> (Verdict, RiskLevel) {
    match score {
        80..=100 => (Verdict::Safe, RiskLevel::Low),
        60..=79 => (Verdict::Caution, RiskLevel::Medium),
        40..=59 => (Verdict::Caution, RiskLevel::High),
        _ => (Verdict::Dangerous, RiskLevel::Critical),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomainTrust;

    fn report(findings: Vec<Finding>, trust: DomainTrust) -> StaticReport {
        StaticReport {
            findings,
            trust,
            host: None,
            shortened: false,
            risky_tld: false,
        }
    }

    fn info(desc: &str) -> Finding {
        Finding::new("static", desc, Severity::Info)
    }

    fn rep(positives: u32, total: u32) -> ReputationResult {
        ReputationResult {
            positives,
            total,
            vendors: vec![],
            permalink: None,
        }
    }

    #[test]
    fn aggregate_is_deterministic() {
        let stat = report(vec![info("a"), info("b")], DomainTrust::Untrusted);
        let rep = rep(2, 70);
        let first = aggregate(&stat, Some(&rep), &[], &ScorePolicy::default());
        for _ in 0..10 {
            assert_eq!(
                aggregate(&stat, Some(&rep), &[], &ScorePolicy::default()),
                first
            );
        }
    }

    #[test]
    fn score_stays_in_range() {
        // Pile on enough evidence to push the raw total far below zero.
        let findings: Vec<Finding> = (0..50).map(|i| info(&format!("f{i}"))).collect();
        let mut stat = report(findings, DomainTrust::Untrusted);
        stat.shortened = true;
        stat.risky_tld = true;
        let score = aggregate(&stat, Some(&rep(60, 70)), &[], &ScorePolicy::default());
        assert_eq!(score, 0);

        // And a spotless trusted artifact cannot exceed 100.
        let clean = report(vec![], DomainTrust::Trusted);
        assert_eq!(
            aggregate(&clean, Some(&rep(0, 70)), &[], &ScorePolicy::default()),
            100
        );
    }

    #[test]
    fn extra_finding_never_raises_score() {
        let policy = ScorePolicy::default();
        let base = report(vec![info("a")], DomainTrust::Untrusted);
        let mut more = base.clone();
        more.findings.push(info("b"));
        assert!(aggregate(&more, None, &[], &policy) <= aggregate(&base, None, &[], &policy));
    }

    #[test]
    fn extra_positive_never_raises_score() {
        let policy = ScorePolicy::default();
        let stat = report(vec![info("a")], DomainTrust::Untrusted);
        let low = aggregate(&stat, Some(&rep(1, 70)), &[], &policy);
        let high = aggregate(&stat, Some(&rep(2, 70)), &[], &policy);
        assert!(high <= low);
    }

    #[test]
    fn trusting_a_domain_never_lowers_score() {
        let policy = ScorePolicy::default();
        let untrusted = report(vec![info("a")], DomainTrust::Untrusted);
        let trusted = report(vec![info("a")], DomainTrust::Trusted);
        assert!(
            aggregate(&trusted, None, &[], &policy) >= aggregate(&untrusted, None, &[], &policy)
        );
    }

    #[test]
    fn trusted_bonus_keeps_minor_findings_out_of_dangerous_band() {
        let stat = report(vec![info("a"), info("b")], DomainTrust::Trusted);
        let score = aggregate(&stat, None, &[], &ScorePolicy::default());
        let (verdict, _) = classify(score);
        assert_ne!(verdict, Verdict::Dangerous);
    }

    #[test]
    fn clean_reputation_adds_bonus() {
        let policy = ScorePolicy::default();
        let stat = report(vec![], DomainTrust::Unknown);
        let without = aggregate(&stat, None, &[], &policy);
        let with = aggregate(&stat, Some(&rep(0, 70)), &[], &policy);
        assert!(with >= without);
    }

    #[test]
    fn duplicate_findings_coalesce() {
        let policy = ScorePolicy::default();
        let stat = report(vec![info("same"), info("same")], DomainTrust::Unknown);
        let single = report(vec![info("same")], DomainTrust::Unknown);
        assert_eq!(
            aggregate(&stat, None, &[], &policy),
            aggregate(&single, None, &[], &policy)
        );
    }

    #[test]
    fn judge_findings_count_once_across_sources() {
        let policy = ScorePolicy::default();
        let stat = report(vec![info("shared")], DomainTrust::Unknown);
        let opinion = ModelOpinion {
            model: "judge-a".into(),
            analysis: "…".into(),
            findings: vec![Finding::new("judge-a", "shared", Severity::Info)],
            recommendations: vec![],
        };
        let alone = aggregate(&stat, None, &[], &policy);
        let with_dup = aggregate(&stat, None, &[opinion], &policy);
        assert_eq!(alone, with_dup);
    }

    #[test]
    fn classifier_boundaries_are_exact() {
        assert_eq!(classify(80), (Verdict::Safe, RiskLevel::Low));
        assert_eq!(classify(79), (Verdict::Caution, RiskLevel::Medium));
        assert_eq!(classify(60), (Verdict::Caution, RiskLevel::Medium));
        assert_eq!(classify(59), (Verdict::Caution, RiskLevel::High));
        assert_eq!(classify(40), (Verdict::Caution, RiskLevel::High));
        assert_eq!(classify(39), (Verdict::Dangerous, RiskLevel::Critical));
        assert_eq!(classify(100), (Verdict::Safe, RiskLevel::Low));
        assert_eq!(classify(0), (Verdict::Dangerous, RiskLevel::Critical));
    }

    #[test]
    fn shortener_example_lands_below_safe_band() {
        // http://bit.ly/free-iphone-winner: shortener + two keyword findings.
        let mut stat = report(
            vec![
                info("URL uses a link shortener (bit.ly) that hides the real destination"),
                info("Suspicious keyword \"free\" in URL"),
                info("Suspicious keyword \"winner\" in URL"),
            ],
            DomainTrust::Untrusted,
        );
        stat.shortened = true;
        let score = aggregate(&stat, None, &[], &ScorePolicy::default());
        let (verdict, _) = classify(score);
        assert!(score < 60);
        assert_ne!(verdict, Verdict::Safe);
    }
}
