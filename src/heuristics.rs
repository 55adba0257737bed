//! Static heuristic analysis — fixed pattern rules over the artifact.
//!
//! This component is pure and total: it performs no I/O and never fails.
//! A URL that cannot be parsed degrades to a single "could not parse"
//! finding with a domain trust of `Unknown`.

use crate::models::{Artifact, DomainTrust, Finding, Severity};
use regex::Regex;
use std::sync::OnceLock;
use url::{Host, Url};

/// Source tag attached to every finding produced here.
pub const SOURCE: &str = "static";

/// Known URL-shortener domains.
const SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "goo.gl",
    "t.co",
    "is.gd",
    "ow.ly",
    "buff.ly",
    "cutt.ly",
    "rb.gy",
    "shorturl.at",
];

/// Substrings that show up disproportionately in scam links and listings.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "winner",
    "free",
    "prize",
    "urgent",
    "verify",
    "suspended",
    "lottery",
    "giveaway",
    "jackpot",
    "claim",
    "unlock",
    "refund",
];

/// Trusted-domain allowlist. Membership grants the trusted-domain bonus and
/// anchors the typosquat checks.
const TRUSTED_DOMAINS: &[&str] = &[
    "google.com",
    "amazon.com",
    "paypal.com",
    "apple.com",
    "microsoft.com",
    "ebay.com",
    "facebook.com",
    "instagram.com",
    "netflix.com",
    "wikipedia.org",
    "github.com",
];

/// TLDs with outsized abuse rates.
const RISKY_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "buzz", "click", "loan", "work",
];

/// Contextual brand-impersonation rules: an artifact that mentions the brand
/// but is not hosted on the brand's official domain. Payment and government
/// brands are near-certain scams (`Critical`); retail impersonation is a
/// "be careful" signal (`Warning`).
const BRAND_RULES: &[(&str, &str, Severity)] = &[
    ("paypal", "paypal.com", Severity::Critical),
    ("visa", "visa.com", Severity::Critical),
    ("mastercard", "mastercard.com", Severity::Critical),
    ("irs", "irs.gov", Severity::Critical),
    ("hmrc", "gov.uk", Severity::Critical),
    ("amazon", "amazon.com", Severity::Warning),
    ("ebay", "ebay.com", Severity::Warning),
    ("walmart", "walmart.com", Severity::Warning),
    ("apple", "apple.com", Severity::Warning),
    ("netflix", "netflix.com", Severity::Warning),
];

/// Hosts with more labels than this are flagged for excessive subdomain depth.
const MAX_HOST_LABELS: usize = 4;

/// A brand rule with its name matcher compiled. `\b` anchors keep the rule
/// to whole tokens: "firstbank" must not read as a claim about "irs".
struct BrandMatcher {
    brand: &'static str,
    official: &'static str,
    severity: Severity,
    pattern: Regex,
}

fn brand_matchers() -> &'static [BrandMatcher] {
    static MATCHERS: OnceLock<Vec<BrandMatcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        BRAND_RULES
            .iter()
            .map(|&(brand, official, severity)| BrandMatcher {
                brand,
                official,
                severity,
                pattern: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(brand)))
                    .expect("brand rule set compiles"),
            })
            .collect()
    })
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = SUSPICIOUS_KEYWORDS.join("|");
        // Panics only on a malformed literal list, which is a compile-time fact.
        Regex::new(&format!(r"(?i)({alternation})")).expect("keyword rule set compiles")
    })
}

/// Everything the static pass learned about the artifact.
#[derive(Debug, Clone)]
pub struct StaticReport {
    pub findings: Vec<Finding>,
    pub trust: DomainTrust,
    pub host: Option<String>,
    pub shortened: bool,
    pub risky_tld: bool,
}

impl StaticReport {
    fn unparsable() -> Self {
        Self {
            findings: vec![Finding::new(
                SOURCE,
                "Could not parse URL — treat with caution",
                Severity::Info,
            )],
            trust: DomainTrust::Unknown,
            host: None,
            shortened: false,
            risky_tld: false,
        }
    }
}

/// Run every static rule against the artifact.
pub fn analyze(artifact: &Artifact) -> StaticReport {
    match artifact {
        Artifact::Url(raw) => analyze_url(raw),
        Artifact::Product { .. } => analyze_text(&artifact.full_text()),
    }
}

fn analyze_url(raw: &str) -> StaticReport {
    let parsed = Url::parse(raw).or_else(|_| {
        // Accept scheme-less input like "bit.ly/xyz".
        if raw.contains("://") {
            Url::parse(raw)
        } else {
            Url::parse(&format!("http://{raw}"))
        }
    });

    let url = match parsed {
        Ok(u) => u,
        Err(_) => return StaticReport::unparsable(),
    };

    let mut findings = Vec::new();

    let (domain, host_text) = match url.host() {
        Some(Host::Domain(d)) => {
            let d = d.to_ascii_lowercase();
            (Some(d.clone()), Some(d))
        }
        Some(Host::Ipv4(ip)) => {
            findings.push(Finding::new(
                SOURCE,
                format!("URL points at a literal IP address ({ip}) instead of a domain"),
                Severity::Warning,
            ));
            (None, Some(ip.to_string()))
        }
        Some(Host::Ipv6(ip)) => {
            findings.push(Finding::new(
                SOURCE,
                format!("URL points at a literal IP address ({ip}) instead of a domain"),
                Severity::Warning,
            ));
            (None, Some(ip.to_string()))
        }
        None => return StaticReport::unparsable(),
    };

    let mut trust = DomainTrust::Untrusted;
    let mut shortened = false;
    let mut risky_tld = false;

    if let Some(domain) = &domain {
        let registrable = registrable_domain(domain);

        if TRUSTED_DOMAINS.contains(&registrable) {
            trust = DomainTrust::Trusted;
        }

        if SHORTENERS.contains(&registrable) {
            shortened = true;
            findings.push(Finding::new(
                SOURCE,
                format!("URL uses a link shortener ({registrable}) that hides the real destination"),
                Severity::Info,
            ));
        }

        if let Some(tld) = domain.rsplit('.').next() {
            if RISKY_TLDS.contains(&tld) {
                risky_tld = true;
                findings.push(Finding::new(
                    SOURCE,
                    format!("Domain uses a high-risk top-level domain (.{tld})"),
                    Severity::Info,
                ));
            }
        }

        if domain.split('.').count() > MAX_HOST_LABELS {
            findings.push(Finding::new(
                SOURCE,
                format!("Excessive subdomain depth in host ({domain})"),
                Severity::Info,
            ));
        }

        if trust != DomainTrust::Trusted {
            findings.extend(lookalike_findings(registrable));
        }
    }

    for m in keyword_regex().find_iter(raw) {
        findings.push(Finding::new(
            SOURCE,
            format!("Suspicious keyword \"{}\" in URL", m.as_str().to_lowercase()),
            Severity::Info,
        ));
    }

    if trust != DomainTrust::Trusted {
        if let Some(domain) = &domain {
            findings.extend(brand_findings(raw, domain));
        }
    }

    StaticReport {
        findings,
        trust,
        host: host_text,
        shortened,
        risky_tld,
    }
}

/// Product artifacts have no host to judge — keyword rules only.
fn analyze_text(text: &str) -> StaticReport {
    let findings = keyword_regex()
        .find_iter(text)
        .map(|m| {
            Finding::new(
                SOURCE,
                format!(
                    "Suspicious keyword \"{}\" in product details",
                    m.as_str().to_lowercase()
                ),
                Severity::Info,
            )
        })
        .collect();

    StaticReport {
        findings,
        trust: DomainTrust::Unknown,
        host: None,
        shortened: false,
        risky_tld: false,
    }
}

/// Last two labels of the host, e.g. `login.paypal.com` → `paypal.com`.
/// Good enough for the allowlist entries we carry.
fn registrable_domain(domain: &str) -> &str {
    let mut dots = domain.char_indices().filter(|(_, c)| *c == '.');
    match (dots.next_back(), dots.next_back()) {
        (Some(_), Some((second_last, _))) => &domain[second_last + 1..],
        _ => domain,
    }
}

/// Typosquat and digit-for-letter checks against the allowlist.
fn lookalike_findings(registrable: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    let deleeted = deleet(registrable);
    if deleeted != registrable && TRUSTED_DOMAINS.contains(&deleeted.as_str()) {
        findings.push(Finding::new(
            SOURCE,
            format!("Domain {registrable} mimics {deleeted} with digit-for-letter substitution"),
            Severity::Critical,
        ));
        return findings;
    }

    for trusted in TRUSTED_DOMAINS {
        if within_one_edit(registrable, trusted) {
            findings.push(Finding::new(
                SOURCE,
                format!("Domain {registrable} looks like a typosquat of {trusted}"),
                Severity::Critical,
            ));
            break;
        }
    }

    findings
}

/// Brand-impersonation rules: brand named as a whole token, host not the
/// brand's own.
fn brand_findings(raw: &str, domain: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for rule in brand_matchers() {
        let official = rule.official;
        let on_official = domain == official || domain.ends_with(&format!(".{official}"));
        if !on_official && rule.pattern.is_match(raw) {
            findings.push(Finding::new(
                SOURCE,
                format!("Mentions {} but is not hosted on {official}", rule.brand),
                rule.severity,
            ));
        }
    }

    findings
}

fn deleet(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            '8' => 'b',
            '9' => 'g',
            other => other,
        })
        .collect()
}

/// True when `a` and `b` differ by at most one insertion, deletion or
/// substitution — but are not equal (identical strings are not lookalikes).
fn within_one_edit(a: &str, b: &str) -> bool {
    if a == b {
        return false;
    }
    let (short, long): (Vec<char>, Vec<char>) = if a.len() <= b.len() {
        (a.chars().collect(), b.chars().collect())
    } else {
        (b.chars().collect(), a.chars().collect())
    };
    if long.len() - short.len() > 1 {
        return false;
    }

    if short.len() == long.len() {
        return short
            .iter()
            .zip(long.iter())
            .filter(|(x, y)| x != y)
            .count()
            == 1;
    }

    // Lengths differ by one: a single skip in the longer string must align the rest.
    let mut i = 0;
    let mut j = 0;
    let mut skipped = false;
    while i < short.len() && j < long.len() {
        if short[i] == long[j] {
            i += 1;
            j += 1;
        } else if skipped {
            return false;
        } else {
            skipped = true;
            j += 1;
        }
    }
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Artifact {
        Artifact::Url(raw.to_string())
    }

    fn descriptions(report: &StaticReport) -> Vec<&str> {
        report
            .findings
            .iter()
            .map(|f| f.description.as_str())
            .collect()
    }

    #[test]
    fn shortener_and_keywords_flagged() {
        let report = analyze(&url("http://bit.ly/free-iphone-winner"));
        assert!(report.shortened);
        assert_eq!(report.trust, DomainTrust::Untrusted);
        let descs = descriptions(&report);
        assert!(descs.iter().any(|d| d.contains("link shortener")));
        assert!(descs.iter().any(|d| d.contains("\"winner\"")));
        assert!(descs.iter().any(|d| d.contains("\"free\"")));
    }

    #[test]
    fn trusted_domain_is_clean() {
        let report = analyze(&url("https://www.amazon.com/dp/B0TEST"));
        assert_eq!(report.trust, DomainTrust::Trusted);
        assert!(!report.shortened);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn literal_ip_host_flagged() {
        let report = analyze(&url("http://192.168.1.50/login"));
        assert!(descriptions(&report)
            .iter()
            .any(|d| d.contains("literal IP address")));
        assert_eq!(report.trust, DomainTrust::Untrusted);
    }

    #[test]
    fn risky_tld_flagged() {
        let report = analyze(&url("http://deals-store.tk/offer"));
        assert!(report.risky_tld);
    }

    #[test]
    fn deep_subdomains_flagged() {
        let report = analyze(&url("http://a.b.c.d.example.net/"));
        assert!(descriptions(&report)
            .iter()
            .any(|d| d.contains("subdomain depth")));
    }

    #[test]
    fn digit_substitution_detected() {
        let report = analyze(&url("http://amaz0n.com/deal"));
        let descs = descriptions(&report);
        assert!(descs
            .iter()
            .any(|d| d.contains("digit-for-letter substitution")));
        assert!(report
            .findings
            .iter()
            .any(|f| f.severity == Severity::Critical));
    }

    #[test]
    fn typosquat_detected() {
        let report = analyze(&url("http://paypai.com/signin"));
        assert!(descriptions(&report)
            .iter()
            .any(|d| d.contains("typosquat of paypal.com")));
    }

    #[test]
    fn brand_impersonation_off_domain() {
        let report = analyze(&url("http://secure-checkout.net/paypal/login"));
        let brand = report
            .findings
            .iter()
            .find(|f| f.description.contains("paypal.com"))
            .expect("brand finding");
        assert_eq!(brand.severity, Severity::Critical);
    }

    #[test]
    fn brand_substring_inside_word_not_flagged() {
        // "firstbank" must not read as a claim about "irs".
        let report = analyze(&url("http://firstbank.com/mortgages"));
        assert!(report.findings.is_empty());

        let report = analyze(&url("http://airsoft-supplies.net/catalog"));
        assert!(descriptions(&report).iter().all(|d| !d.contains("irs.gov")));
    }

    #[test]
    fn brand_on_its_own_domain_not_flagged() {
        let report = analyze(&url("https://www.paypal.com/signin"));
        assert!(report.findings.is_empty());
        assert_eq!(report.trust, DomainTrust::Trusted);
    }

    #[test]
    fn unparsable_url_degrades_to_single_finding() {
        let report = analyze(&url("ht!tp:/// not a url"));
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].description.contains("Could not parse"));
        assert_eq!(report.trust, DomainTrust::Unknown);
    }

    #[test]
    fn scheme_less_url_still_parses() {
        let report = analyze(&url("bit.ly/xyz"));
        assert!(report.shortened);
    }

    #[test]
    fn product_text_gets_keyword_rules() {
        let artifact = Artifact::Product {
            reference: "img:rolex-listing".into(),
            metadata: Some(crate::models::ProductMetadata {
                title: Some("FREE Rolex — lottery winner special".into()),
                ..Default::default()
            }),
        };
        let report = analyze(&artifact);
        assert_eq!(report.trust, DomainTrust::Unknown);
        let descs = descriptions(&report);
        assert!(descs.iter().any(|d| d.contains("\"free\"")));
        assert!(descs.iter().any(|d| d.contains("\"lottery\"")));
    }

    #[test]
    fn within_one_edit_rules() {
        assert!(within_one_edit("paypai.com", "paypal.com"));
        assert!(within_one_edit("amazn.com", "amazon.com"));
        assert!(!within_one_edit("paypal.com", "paypal.com"));
        assert!(!within_one_edit("totally-different.biz", "paypal.com"));
    }
}
