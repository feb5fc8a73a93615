//! Dependency vulnerability scan through the npm CLI.
//!
//! `npm audit --json` runs as a subprocess against the current directory;
//! its advisories are mapped onto issues with the fixed test id `P901` and
//! merged into the manager's results. A missing npm binary or an unreadable
//! report is never fatal to the scan.

use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::issue::{Issue, Rank};

pub const AUDIT_TEST_ID: &str = "P901";

/// npm exits non-zero from `audit` when advisories exist, so only the
/// absence of parseable output counts as failure.
#[derive(Debug, Default)]
pub struct AuditManager {
    report: Option<Value>,
}

fn severity_for(level: &str) -> Rank {
    match level {
        "info" | "low" => Rank::Low,
        "moderate" => Rank::Medium,
        "high" | "critical" => Rank::High,
        _ => Rank::Undefined,
    }
}

/// Map one `vulnerabilities` entry from an npm audit v2 report.
fn issue_for(name: &str, advisory: &Value) -> Issue {
    let severity = advisory
        .get("severity")
        .and_then(Value::as_str)
        .map(severity_for)
        .unwrap_or(Rank::Undefined);
    let range = advisory
        .get("range")
        .and_then(Value::as_str)
        .unwrap_or("unknown versions");

    // `via` mixes advisory objects and bare names of transitive parents;
    // the first object carries the human-readable details.
    let via = advisory
        .get("via")
        .and_then(Value::as_array)
        .and_then(|entries| entries.iter().find(|entry| entry.is_object()));
    let title = via
        .and_then(|entry| entry.get("title"))
        .and_then(Value::as_str)
        .unwrap_or("Known vulnerability");
    let url = via
        .and_then(|entry| entry.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    Issue {
        severity,
        confidence: Rank::High,
        text: format!("{} in dependency {} ({})", title, name, range),
        test_id: AUDIT_TEST_ID.to_string(),
        test_name: "vulnerable_dependency".to_string(),
        filename: "package.json".to_string(),
        lineno: 0,
        linerange: (0, 1),
        code: if url.is_empty() {
            String::new()
        } else {
            format!("Advisory: {}\n", url)
        },
    }
}

fn issues_from_report(report: &Value) -> Vec<Issue> {
    report
        .get("vulnerabilities")
        .and_then(Value::as_object)
        .map(|advisories| {
            advisories
                .iter()
                .map(|(name, advisory)| issue_for(name, advisory))
                .collect()
        })
        .unwrap_or_default()
}

impl AuditManager {
    pub fn new() -> AuditManager {
        AuditManager::default()
    }

    /// True when an npm binary answers `--version`.
    pub fn has_npm(&self) -> bool {
        Command::new("npm")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn run_check(&mut self) -> bool {
        let output = match Command::new("npm")
            .args(["audit", "--json"])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(error) => {
                debug!(%error, "npm audit did not run");
                return false;
            }
        };
        match serde_json::from_slice::<Value>(&output.stdout) {
            Ok(report) => {
                self.report = Some(report);
                true
            }
            Err(error) => {
                debug!(%error, "npm audit output was not JSON");
                false
            }
        }
    }

    /// Merge dependency advisories into the result list.
    pub fn update_issues(&mut self, results: &mut Vec<Issue>) {
        if !self.has_npm() {
            warn!("npm is not available, skipping the dependency audit");
            return;
        }
        if !self.run_check() {
            return;
        }
        if let Some(report) = &self.report {
            results.extend(issues_from_report(report));
        }
    }
}
