//! Report formatting.
//!
//! The manager's filtered results, skip list and metrics are folded into a
//! serialisable [`Report`]; each formatter renders that one shape to a
//! writer. Formatter selection happens at the CLI boundary.

pub mod json;
pub mod text;
pub mod yaml;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use enum_dispatch::enum_dispatch;
use serde::Serialize;

use crate::core::issue::Issue;
use crate::core::manager::ResultSet;
use crate::core::metrics::Metrics;

pub use json::JsonFormatter;
pub use text::TextFormatter;
pub use yaml::YamlFormatter;

#[derive(Debug, Serialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// One reported finding; `candidates` only appears in baseline-diffed runs
/// where the new issue cannot be localised exactly.
#[derive(Debug, Serialize)]
pub struct ResultEntry {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Issue>>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub results: Vec<ResultEntry>,
    pub errors: Vec<SkippedFile>,
    pub metrics: serde_json::Value,
}

impl Report {
    pub fn new(result_set: ResultSet, skipped: &[(PathBuf, String)], metrics: &Metrics) -> Report {
        let results = match result_set {
            ResultSet::Plain(issues) => issues
                .into_iter()
                .map(|issue| ResultEntry {
                    issue,
                    candidates: None,
                })
                .collect(),
            ResultSet::Diffed(entries) => entries
                .into_iter()
                .map(|entry| ResultEntry {
                    issue: entry.issue,
                    candidates: Some(entry.candidates),
                })
                .collect(),
        };
        let errors = skipped
            .iter()
            .map(|(path, reason)| SkippedFile {
                filename: path.to_string_lossy().to_string(),
                reason: reason.clone(),
            })
            .collect();
        Report {
            results,
            errors,
            metrics: metrics.to_value(),
        }
    }
}

#[enum_dispatch]
pub trait Render {
    fn render(&self, writer: &mut dyn Write, report: &Report) -> Result<()>;
}

#[enum_dispatch(Render)]
#[derive(Debug)]
pub enum Formatter {
    Text(TextFormatter),
    Json(JsonFormatter),
    Yaml(YamlFormatter),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::issue::Rank;

    fn sample_report() -> Report {
        let issue = Issue {
            severity: Rank::High,
            confidence: Rank::Medium,
            text: "Potential server side code injection detected: 'Use of eval(...)'".into(),
            test_id: "P601".into(),
            test_name: "eval_used".into(),
            filename: "app.js".into(),
            lineno: 3,
            linerange: (3, 3),
            code: "2 var x = 1;\n3 eval('2*2');\n".into(),
        };
        let mut metrics = Metrics::new();
        metrics.begin("app.js");
        metrics.count_locs(vec!["var x = 1;", "eval('2*2');"]);
        metrics.aggregate();
        Report::new(
            ResultSet::Plain(vec![issue]),
            &[(PathBuf::from("bad.js"), "syntax error".into())],
            &metrics,
        )
    }

    #[test]
    fn test_report_shape() {
        let report = sample_report();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["results"][0]["test_id"], "P601");
        assert_eq!(value["results"][0]["severity"], "HIGH");
        assert_eq!(value["results"][0].get("candidates"), None);
        assert_eq!(value["errors"][0]["filename"], "bad.js");
        assert_eq!(value["metrics"]["_totals"]["loc"], 2);
    }

    #[test]
    fn test_formatters_render_without_error() {
        let report = sample_report();
        for formatter in [
            Formatter::Text(TextFormatter::default()),
            Formatter::Json(JsonFormatter),
            Formatter::Yaml(YamlFormatter),
        ] {
            let mut out = Vec::new();
            formatter.render(&mut out, &report).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("P601"), "{:?} lost the issue id", formatter);
        }
    }
}
