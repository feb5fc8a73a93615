//! Per-file metric gathering.
//!
//! Collection is stateful: `begin` opens a metric block for a file and
//! subsequent counts land there until the next `begin`. `aggregate` folds
//! every block into the `_totals` entry at the end of a run.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::core::issue::{CRITERIA, RANKING, Scores};

#[derive(Debug, Default, Clone)]
pub struct FileMetrics {
    pub loc: u64,
    pub nosec: u64,
    /// Issue counts labelled `CRITERION.RANK`, recovered from score vectors.
    pub issue_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct Metrics {
    data: BTreeMap<String, FileMetrics>,
    current: String,
    totals: FileMetrics,
}

impl Metrics {
    pub fn new() -> Metrics {
        Metrics::default()
    }

    /// Open a new metric block for `fname` and make it active.
    pub fn begin(&mut self, fname: &str) {
        self.current = fname.to_string();
        self.data.insert(fname.to_string(), FileMetrics::default());
    }

    fn current_mut(&mut self) -> &mut FileMetrics {
        self.data.entry(self.current.clone()).or_default()
    }

    /// Count one suppressed node on a nosec line.
    pub fn note_nosec(&mut self) {
        self.current_mut().nosec += 1;
    }

    /// Count lines of code: non-empty, not `//` comments, not inside a
    /// `/* ... */` block. Block-comment state carries from line to line.
    pub fn count_locs<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        let mut loc = 0;
        let mut in_block_comment = false;
        for line in lines {
            let trimmed = line.trim();
            in_block_comment = trimmed.contains("/*") || in_block_comment;
            if !trimmed.is_empty() && !trimmed.starts_with("//") && !in_block_comment {
                loc += 1;
            }
            in_block_comment = in_block_comment && !trimmed.contains("*/");
        }
        self.current_mut().loc += loc;
    }

    /// Derive issue counts for the active block from a file's score vector.
    pub fn count_issues(&mut self, scores: &Scores) {
        let mut counts = BTreeMap::new();
        for criterion in CRITERIA {
            let per_rank = scores.counts(criterion);
            for rank in RANKING {
                counts.insert(
                    format!("{}.{}", criterion.name(), rank.name()),
                    per_rank[rank.index()],
                );
            }
        }
        self.current_mut().issue_counts = counts;
    }

    /// Fold every per-file block into the totals entry.
    pub fn aggregate(&mut self) {
        let mut totals = FileMetrics::default();
        for metrics in self.data.values() {
            totals.loc += metrics.loc;
            totals.nosec += metrics.nosec;
            for (label, count) in &metrics.issue_counts {
                *totals.issue_counts.entry(label.clone()).or_insert(0) += count;
            }
        }
        self.totals = totals;
    }

    pub fn totals(&self) -> &FileMetrics {
        &self.totals
    }

    pub fn file(&self, fname: &str) -> Option<&FileMetrics> {
        self.data.get(fname)
    }

    /// JSON view for reports: one entry per file plus `_totals`.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (fname, metrics) in &self.data {
            out.insert(fname.clone(), file_metrics_value(metrics));
        }
        out.insert("_totals".into(), file_metrics_value(&self.totals));
        Value::Object(out)
    }
}

fn file_metrics_value(metrics: &FileMetrics) -> Value {
    let mut map = Map::new();
    map.insert("loc".into(), json!(metrics.loc));
    map.insert("nosec".into(), json!(metrics.nosec));
    for (label, count) in &metrics.issue_counts {
        map.insert(label.clone(), json!(count));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::issue::Rank;

    #[test]
    fn test_count_locs_skips_comments_and_blanks() {
        let mut metrics = Metrics::new();
        metrics.begin("a.js");
        metrics.count_locs(vec![
            "var x = 1;",
            "",
            "// a comment",
            "/*",
            "inside a block",
            "*/",
            "var y = 2;",
        ]);
        assert_eq!(metrics.file("a.js").unwrap().loc, 2);
    }

    #[test]
    fn test_count_locs_single_line_block_comment() {
        let mut metrics = Metrics::new();
        metrics.begin("a.js");
        metrics.count_locs(vec!["/* note */", "var x = 1;"]);
        assert_eq!(metrics.file("a.js").unwrap().loc, 1);
    }

    #[test]
    fn test_issue_counts_from_scores() {
        let mut scores = Scores::default();
        scores.note(Rank::High, Rank::Medium);
        scores.note(Rank::High, Rank::Medium);

        let mut metrics = Metrics::new();
        metrics.begin("a.js");
        metrics.count_issues(&scores);

        let counts = &metrics.file("a.js").unwrap().issue_counts;
        assert_eq!(counts.get("SEVERITY.HIGH"), Some(&2));
        assert_eq!(counts.get("CONFIDENCE.MEDIUM"), Some(&2));
        assert_eq!(counts.get("SEVERITY.LOW"), Some(&0));
    }

    #[test]
    fn test_aggregate_totals() {
        let mut metrics = Metrics::new();
        metrics.begin("a.js");
        metrics.count_locs(vec!["var x = 1;"]);
        metrics.note_nosec();
        metrics.begin("b.js");
        metrics.count_locs(vec!["var y = 2;", "var z = 3;"]);
        metrics.aggregate();

        assert_eq!(metrics.totals().loc, 3);
        assert_eq!(metrics.totals().nosec, 1);

        let value = metrics.to_value();
        assert_eq!(value["_totals"]["loc"], 3);
        assert_eq!(value["a.js"]["nosec"], 1);
    }
}
