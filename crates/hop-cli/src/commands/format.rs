use hop::{
    CheckIssue, EdgeRule, HostnameCheck, HostnameStatus, OutcomeStatus, PushReport, Severity,
    UploadOutcome,
};

const RULE_WIDTH: usize = 70;

fn enabled_label(enabled: bool) -> &'static str {
    if enabled { "Enabled" } else { "Disabled" }
}

/// One line per processed file during a push.
pub fn outcome_line(outcome: &UploadOutcome) -> String {
    match &outcome.status {
        OutcomeStatus::Uploaded => format!("  uploaded  {}", outcome.relative_path),
        OutcomeStatus::Skipped { reason } => {
            format!("  skipped   {} ({reason})", outcome.relative_path)
        }
        OutcomeStatus::Failed { error } => {
            format!("  failed    {}: {error}", outcome.relative_path)
        }
    }
}

pub fn print_push_report(report: &PushReport) {
    println!("\n{report}");

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    if report.has_failures() {
        println!("\nFailed uploads:");
        for failure in report.failures() {
            println!(
                "  {}: {}",
                failure.path.display(),
                failure.error().unwrap_or("unknown error")
            );
        }
    }
}

pub fn print_redirects(rules: &[&EdgeRule]) {
    if rules.is_empty() {
        println!("No 302 redirects found in this pull zone.");
        return;
    }

    println!("\nFound {} 302 redirect(s):", rules.len());
    println!("{}", "=".repeat(RULE_WIDTH));

    for (i, rule) in rules.iter().enumerate() {
        println!("\n{}. {}", i + 1, rule.description);
        println!("   Status: {}", enabled_label(rule.enabled));
        if !rule.source_url().is_empty() {
            println!("   From: {}", rule.source_url());
        }
        println!("   To: {}", rule.action_parameter_1);
        println!("   GUID: {}", rule.guid);
    }
}

fn severity_heading(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL ISSUES",
        Severity::Error => "ERRORS",
        Severity::Warning => "WARNINGS",
        Severity::Info => "INFORMATION",
    }
}

const SEVERITIES: [Severity; 4] = [
    Severity::Critical,
    Severity::Error,
    Severity::Warning,
    Severity::Info,
];

pub fn issue_summary(issues: &[CheckIssue]) -> String {
    let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
    format!(
        "Critical: {}, Errors: {}, Warnings: {}, Info: {}",
        count(Severity::Critical),
        count(Severity::Error),
        count(Severity::Warning),
        count(Severity::Info)
    )
}

fn issue_lines(index: usize, issue: &CheckIssue) -> Vec<String> {
    let mut lines = vec![format!("[{index}] {}", issue.message)];

    if let Some(rule) = &issue.rule {
        lines.push(format!("    Rule: {}", rule.description));
        lines.push(format!("    GUID: {}", rule.guid));
        lines.push(format!("    Status: {}", enabled_label(rule.enabled)));
        if !rule.source_url().is_empty() {
            lines.push(format!("    From: {}", rule.source_url()));
        }
        if !rule.action_parameter_1.is_empty() {
            lines.push(format!("    To: {}", rule.action_parameter_1));
        }
        if !rule.action_parameter_2.is_empty() {
            lines.push(format!("    Status Code: {}", rule.action_parameter_2));
        }
    }

    for (key, value) in &issue.details {
        lines.push(format!("    {key}: {value}"));
    }

    lines
}

pub fn print_check_results(issues: &[CheckIssue]) {
    if issues.is_empty() {
        println!("\nNo issues found. All redirect rules appear to be properly configured.");
        return;
    }

    println!("\nAnalysis summary: {}\n", issue_summary(issues));

    for severity in SEVERITIES {
        let group: Vec<&CheckIssue> = issues.iter().filter(|i| i.severity == severity).collect();
        if group.is_empty() {
            continue;
        }

        println!("{} ({})", severity_heading(severity), group.len());
        println!("{}", "-".repeat(50));
        for (i, issue) in group.iter().enumerate() {
            println!();
            for line in issue_lines(i + 1, issue) {
                println!("{line}");
            }
        }
        println!();
    }
}

pub fn hostname_line(check: &HostnameCheck) -> String {
    match &check.status {
        HostnameStatus::Managed => format!("SKIP {} (Bunny-managed)", check.hostname),
        HostnameStatus::Found { record_type, value } => {
            format!("OK {} ({record_type} -> {value})", check.hostname)
        }
        HostnameStatus::Missing => format!("MISSING {} - No DNS record found", check.hostname),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hop::IssueKind;

    use super::*;

    fn outcome(status: OutcomeStatus) -> UploadOutcome {
        UploadOutcome {
            path: PathBuf::from("/site/css/main.css"),
            relative_path: "css/main.css".into(),
            status,
        }
    }

    #[test]
    fn outcome_lines() {
        assert_eq!(outcome_line(&outcome(OutcomeStatus::Uploaded)), "  uploaded  css/main.css");
        assert_eq!(
            outcome_line(&outcome(OutcomeStatus::Skipped {
                reason: "checksum match"
            })),
            "  skipped   css/main.css (checksum match)"
        );
        assert_eq!(
            outcome_line(&outcome(OutcomeStatus::Failed {
                error: "HTTP 500: oops".into()
            })),
            "  failed    css/main.css: HTTP 500: oops"
        );
    }

    #[test]
    fn summary_counts_by_severity() {
        let issue = |severity| CheckIssue {
            kind: IssueKind::Basic,
            severity,
            message: "m".into(),
            rule: None,
            details: Vec::new(),
        };
        let issues = vec![issue(Severity::Error), issue(Severity::Error), issue(Severity::Info)];
        assert_eq!(issue_summary(&issues), "Critical: 0, Errors: 2, Warnings: 0, Info: 1");
    }

    #[test]
    fn issue_lines_include_rule_and_details() {
        let issue = CheckIssue {
            kind: IssueKind::RedirectLoop,
            severity: Severity::Error,
            message: "Infinite redirect loop detected".into(),
            rule: Some(EdgeRule::redirect_302("/a", "/b", "loop")),
            details: vec![("loop_url".into(), "/a".into())],
        };
        let lines = issue_lines(1, &issue);
        assert_eq!(lines[0], "[1] Infinite redirect loop detected");
        assert!(lines.contains(&"    From: /a".to_owned()));
        assert!(lines.contains(&"    Status Code: 302".to_owned()));
        assert_eq!(lines.last().unwrap(), "    loop_url: /a");
    }

    #[test]
    fn hostname_lines() {
        let check = |status| HostnameCheck {
            hostname: "www.example.com".into(),
            status,
        };
        assert_eq!(
            hostname_line(&check(HostnameStatus::Found {
                record_type: "CNAME".into(),
                value: "zone.b-cdn.net".into()
            })),
            "OK www.example.com (CNAME -> zone.b-cdn.net)"
        );
        assert_eq!(
            hostname_line(&check(HostnameStatus::Missing)),
            "MISSING www.example.com - No DNS record found"
        );
    }
}
