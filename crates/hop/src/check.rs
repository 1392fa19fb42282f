//! Static analysis of a pull zone's redirect rules.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::edge_rule::{EdgeRule, Hostname};

const MAX_CHAIN_HOPS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Errors and criticals make a check fail.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Critical | Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    Basic,
    Configuration,
    Security,
    RedirectLoop,
    RedirectChain,
    UrlHealth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub rule: Option<EdgeRule>,
    pub details: Vec<(String, String)>,
}

impl CheckIssue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        message: impl Into<String>,
        rule: &EdgeRule,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            rule: Some(rule.clone()),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.push((key.to_owned(), value.to_string()));
        self
    }
}

static SUSPICIOUS_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"bit\.ly|tinyurl|shortlink|t\.co", "URL shortener detected"),
        (r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}", "IP address instead of domain"),
        (
            r"[a-z0-9]+-[a-z0-9]+-[a-z0-9]+\.herokuapp\.com",
            "Suspicious Heroku subdomain pattern",
        ),
        (r"[a-z]{20,}\.com", "Suspiciously long random domain"),
        (r"phishing|malware|scam|fake|fraud", "Contains suspicious keywords"),
    ]
    .into_iter()
    .map(|(pattern, reason)| (Regex::new(pattern).unwrap(), reason))
    .collect()
});

/// First suspicious pattern the URL matches, if any.
pub fn suspicious_reason(url: &str) -> Option<&'static str> {
    let url = url.to_lowercase();
    SUSPICIOUS_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&url))
        .map(|(_, reason)| *reason)
}

/// Lowercase, without a trailing slash (except for "/" itself).
pub fn normalize_url(url: &str) -> String {
    let url = url.to_lowercase();
    match url.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_owned(),
        _ => url,
    }
}

fn redirects(rules: &[EdgeRule]) -> impl Iterator<Item = &EdgeRule> {
    rules.iter().filter(|rule| rule.is_redirect())
}

/// Status code problems on individual redirect rules.
pub fn basic_issues(rules: &[EdgeRule]) -> Vec<CheckIssue> {
    let mut issues = Vec::new();

    for rule in redirects(rules) {
        let destination = rule.action_parameter_1.as_str();
        let status = rule.action_parameter_2.as_str();

        if status == "301" {
            issues.push(CheckIssue::new(
                IssueKind::Basic,
                Severity::Warning,
                "301 redirect detected (should be 302 for temporary redirects)",
                rule,
            ));
        }

        if status == "302" && destination.is_empty() {
            issues.push(CheckIssue::new(
                IssueKind::Basic,
                Severity::Error,
                "302 redirect without destination URL",
                rule,
            ));
        }

        if !destination.is_empty() && status != "302" {
            if status.is_empty() {
                issues.push(CheckIssue::new(
                    IssueKind::Basic,
                    Severity::Error,
                    "Destination URL set but no redirect status code specified",
                    rule,
                ));
            } else if status != "301" {
                issues.push(CheckIssue::new(
                    IssueKind::Basic,
                    Severity::Warning,
                    format!("Destination URL set but status code is {status} (should be 302)"),
                    rule,
                ));
            }
        }
    }

    issues
}

/// Duplicate sources and source URLs likely to match differently than intended.
pub fn configuration_issues(rules: &[EdgeRule]) -> Vec<CheckIssue> {
    let mut issues = Vec::new();
    let mut by_source: BTreeMap<String, Vec<&EdgeRule>> = BTreeMap::new();

    for rule in redirects(rules) {
        let source = rule.source_url();
        if source.is_empty() {
            continue;
        }
        by_source.entry(source.to_owned()).or_default().push(rule);

        let normalized = normalize_url(source);
        if normalized != source {
            by_source.entry(normalized).or_default().push(rule);
        }
    }

    for (source, conflicting) in &by_source {
        if conflicting.len() > 1 {
            issues.push(
                CheckIssue::new(
                    IssueKind::Configuration,
                    Severity::Error,
                    format!("Duplicate/conflicting rules for source path: {source}"),
                    conflicting[0],
                )
                .with_detail("conflict_count", conflicting.len()),
            );
        }
    }

    for rule in redirects(rules) {
        let source = rule.source_url();
        if source.is_empty() {
            continue;
        }

        if source.to_lowercase() != source {
            issues.push(CheckIssue::new(
                IssueKind::Configuration,
                Severity::Warning,
                "Mixed case in source URL may cause matching issues",
                rule,
            ));
        }

        if source.ends_with('/') && source != "/" {
            issues.push(CheckIssue::new(
                IssueKind::Configuration,
                Severity::Info,
                "Source URL has trailing slash - ensure this matches expected traffic",
                rule,
            ));
        }
    }

    issues
}

/// Host as written in the URL, with the port when it is not the scheme default.
fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Suspicious destinations, redirects off the zone, and protocol downgrades.
pub fn security_issues(rules: &[EdgeRule], zone_hostnames: &[Hostname]) -> Vec<CheckIssue> {
    let mut issues = Vec::new();

    for rule in redirects(rules) {
        let destination = rule.action_parameter_1.as_str();
        if destination.is_empty() {
            continue;
        }

        if let Some(reason) = suspicious_reason(destination) {
            issues.push(CheckIssue::new(
                IssueKind::Security,
                Severity::Warning,
                format!("Suspicious destination URL: {reason}"),
                rule,
            ));
        }

        // relative destinations fail to parse and stay on the zone
        if let Some(host) = Url::parse(destination).ok().as_ref().and_then(host_with_port) {
            let external = !zone_hostnames
                .iter()
                .any(|hostname| hostname.value.eq_ignore_ascii_case(&host));
            if external {
                issues.push(
                    CheckIssue::new(
                        IssueKind::Security,
                        Severity::Info,
                        "Open redirect to external domain detected",
                        rule,
                    )
                    .with_detail("external_host", host),
                );
            }
        }

        if destination.to_lowercase().starts_with("http://")
            && rule.source_url().to_lowercase().contains("https://")
        {
            issues.push(CheckIssue::new(
                IssueKind::Security,
                Severity::Error,
                "HTTPS to HTTP downgrade detected - security risk",
                rule,
            ));
        }
    }

    issues
}

/// Follow each redirect through the other rules, flagging loops and chains.
pub fn redirect_loops(rules: &[EdgeRule]) -> Vec<CheckIssue> {
    let mut targets: BTreeMap<&str, (&str, &EdgeRule)> = BTreeMap::new();
    for rule in redirects(rules) {
        let source = rule.source_url();
        if !source.is_empty() && !rule.action_parameter_1.is_empty() {
            targets.insert(source, (rule.action_parameter_1.as_str(), rule));
        }
    }

    let mut issues = Vec::new();

    for (destination, rule) in targets.values() {
        let mut visited = HashSet::new();
        let mut current = *destination;
        let mut hops = 0;

        loop {
            hops += 1;
            if hops > MAX_CHAIN_HOPS {
                issues.push(CheckIssue::new(
                    IssueKind::RedirectChain,
                    Severity::Error,
                    format!("Redirect chain too long (>{MAX_CHAIN_HOPS} hops)"),
                    rule,
                ));
                break;
            }

            if !visited.insert(current) {
                issues.push(
                    CheckIssue::new(
                        IssueKind::RedirectLoop,
                        Severity::Error,
                        "Infinite redirect loop detected",
                        rule,
                    )
                    .with_detail("loop_url", current),
                );
                break;
            }

            match targets.get(current) {
                Some((next, _)) => current = *next,
                None => {
                    if hops > 1 {
                        issues.push(CheckIssue::new(
                            IssueKind::RedirectChain,
                            Severity::Warning,
                            format!("Redirect chain detected ({hops} hops)"),
                            rule,
                        ));
                    }
                    break;
                }
            }
        }
    }

    issues
}

/// Every static check, in reporting order.
pub fn check_all(rules: &[EdgeRule], zone_hostnames: &[Hostname]) -> Vec<CheckIssue> {
    let mut issues = basic_issues(rules);
    issues.extend(configuration_issues(rules));
    issues.extend(security_issues(rules, zone_hostnames));
    issues.extend(redirect_loops(rules));
    issues
}
