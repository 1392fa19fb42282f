//! Live HTTP probes of redirect destinations.

use std::time::Duration;

use reqwest::redirect::Policy;
use url::Url;

use hop::{CheckIssue, EdgeRule, IssueKind, Severity};

use crate::api::ApiError;

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
/// Redirects followed before the last response is taken as final.
pub const MAX_HEALTH_REDIRECTS: usize = 3;

/// Issues GET requests against absolute redirect destinations.
pub struct HealthChecker {
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new() -> Result<Self, ApiError> {
        let policy = Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_HEALTH_REDIRECTS {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(HEALTH_TIMEOUT)
            .redirect(policy)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    /// Status of the final response after following redirects.
    pub async fn probe(&self, url: &str) -> Result<u16, reqwest::Error> {
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Ok(response.status().as_u16())
    }

    /// Probe every absolute redirect destination, one rule at a time.
    /// Relative destinations are skipped.
    pub async fn url_health_issues(&self, rules: &[EdgeRule]) -> Vec<CheckIssue> {
        let mut issues = Vec::new();

        for rule in rules.iter().filter(|rule| rule.is_redirect()) {
            let destination = rule.action_parameter_1.as_str();
            if !destination.starts_with("http") {
                continue;
            }

            if !has_host(destination) {
                issues.push(CheckIssue::new(
                    IssueKind::UrlHealth,
                    Severity::Error,
                    "Invalid destination URL format",
                    rule,
                ));
                continue;
            }

            match self.probe(destination).await {
                Ok(status) => issues.extend(status_issues(rule, status)),
                Err(err) => {
                    log::warn!("health check of {destination} failed: {err}");
                    issues.push(CheckIssue::new(
                        IssueKind::UrlHealth,
                        Severity::Error,
                        format!("URL health check failed: {err}"),
                        rule,
                    ));
                }
            }
        }

        issues
    }
}

fn has_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| !host.is_empty()))
        .unwrap_or(false)
}

/// Findings for the final status of a probed destination.
pub fn status_issues(rule: &EdgeRule, status: u16) -> Vec<CheckIssue> {
    let mut issues = Vec::new();

    if status >= 400 {
        let severity = if status >= 500 {
            Severity::Critical
        } else {
            Severity::Error
        };
        issues.push(
            CheckIssue::new(
                IssueKind::UrlHealth,
                severity,
                format!("Broken destination URL (HTTP {status})"),
                rule,
            )
            .with_detail("status", status),
        );
    }

    if (300..400).contains(&status) {
        issues.push(CheckIssue::new(
            IssueKind::UrlHealth,
            Severity::Info,
            "Destination URL itself redirects (creating a redirect chain)",
            rule,
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> EdgeRule {
        EdgeRule::redirect_302("/old", "https://example.com/new", "test")
    }

    #[test]
    fn status_classification() {
        let cases = [
            (200, vec![]),
            (302, vec![Severity::Info]),
            (404, vec![Severity::Error]),
            (410, vec![Severity::Error]),
            (500, vec![Severity::Critical]),
            (503, vec![Severity::Critical]),
        ];
        for (status, expected) in cases {
            let severities: Vec<Severity> =
                status_issues(&rule(), status).iter().map(|i| i.severity).collect();
            assert_eq!(severities, expected, "HTTP {status}");
        }
    }

    #[test]
    fn host_is_required() {
        assert!(has_host("https://example.com/path"));
        assert!(!has_host("http//missing-colon"));
        assert!(!has_host("httpfoo"));
    }
}
