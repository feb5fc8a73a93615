//! Findings, ranking and the score vector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ranks in ascending order of concern.
pub const RANKING: [Rank; 4] = [Rank::Undefined, Rank::Low, Rank::Medium, Rank::High];

/// Severity or confidence rank.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rank {
    #[default]
    #[serde(rename = "UNDEFINED")]
    Undefined,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

impl Rank {
    /// Weight used to encode one issue of this rank into a score; the count
    /// is recovered exactly by dividing the accumulated score by the weight.
    pub fn weight(self) -> u64 {
        match self {
            Rank::Undefined => 1,
            Rank::Low => 3,
            Rank::Medium => 5,
            Rank::High => 10,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Rank::Undefined => "UNDEFINED",
            Rank::Low => "LOW",
            Rank::Medium => "MEDIUM",
            Rank::High => "HIGH",
        }
    }

    /// Title-case form for the terminal report.
    pub fn title(self) -> &'static str {
        match self {
            Rank::Undefined => "Undefined",
            Rank::Low => "Low",
            Rank::Medium => "Medium",
            Rank::High => "High",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two criteria every finding is ranked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Severity,
    Confidence,
}

pub const CRITERIA: [Criterion; 2] = [Criterion::Severity, Criterion::Confidence];

impl Criterion {
    pub fn name(self) -> &'static str {
        match self {
            Criterion::Severity => "SEVERITY",
            Criterion::Confidence => "CONFIDENCE",
        }
    }
}

/// Weighted issue counts per criterion and rank, accumulated over a file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scores {
    pub severity: [u64; RANKING.len()],
    pub confidence: [u64; RANKING.len()],
}

impl Scores {
    pub fn note(&mut self, severity: Rank, confidence: Rank) {
        self.severity[severity.index()] += severity.weight();
        self.confidence[confidence.index()] += confidence.weight();
    }

    pub fn update(&mut self, other: &Scores) {
        for (slot, value) in self.severity.iter_mut().zip(other.severity) {
            *slot += value;
        }
        for (slot, value) in self.confidence.iter_mut().zip(other.confidence) {
            *slot += value;
        }
    }

    pub fn by_criterion(&self, criterion: Criterion) -> &[u64; RANKING.len()] {
        match criterion {
            Criterion::Severity => &self.severity,
            Criterion::Confidence => &self.confidence,
        }
    }

    /// Recover the issue count per rank by dividing out the rank weight.
    pub fn counts(&self, criterion: Criterion) -> [u64; RANKING.len()] {
        let scores = self.by_criterion(criterion);
        let mut counts = [0; RANKING.len()];
        for (slot, rank) in counts.iter_mut().zip(RANKING) {
            *slot = scores[rank.index()] / rank.weight();
        }
        counts
    }
}

/// What a detector hands back: the ranked message, optionally stamped with
/// its own id and name (the declarative blacklist reports per-entry ids).
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Rank,
    pub confidence: Rank,
    pub text: String,
    pub test_id: Option<String>,
    pub test_name: Option<String>,
}

impl Finding {
    pub fn new(severity: Rank, confidence: Rank, text: impl Into<String>) -> Finding {
        Finding {
            severity,
            confidence,
            text: text.into(),
            test_id: None,
            test_name: None,
        }
    }

    pub fn with_source(mut self, test_id: impl Into<String>, test_name: impl Into<String>) -> Finding {
        self.test_id = Some(test_id.into());
        self.test_name = Some(test_name.into());
        self
    }
}

/// A reported finding, fully located in a file.
#[derive(Debug, Default, Clone, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub severity: Rank,
    pub confidence: Rank,
    pub text: String,
    pub test_id: String,
    pub test_name: String,
    pub filename: String,
    pub lineno: usize,
    pub linerange: (usize, usize),
    pub code: String,
}

// Two issues are the same finding when they agree on where and what;
// rank changes or code-excerpt drift do not make a new issue.
impl PartialEq for Issue {
    fn eq(&self, other: &Issue) -> bool {
        self.filename == other.filename
            && self.test_id == other.test_id
            && self.lineno == other.lineno
            && self.text == other.text
    }
}

impl Issue {
    /// True when the issue clears both rank floors.
    pub fn passes(&self, severity_floor: Rank, confidence_floor: Rank) -> bool {
        self.severity >= severity_floor && self.confidence >= confidence_floor
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn issue(severity: Rank, confidence: Rank) -> Issue {
        Issue {
            severity,
            confidence,
            text: "Use of eval(...)".into(),
            test_id: "P601".into(),
            test_name: "eval_used".into(),
            filename: "app.js".into(),
            lineno: 3,
            linerange: (3, 3),
            code: String::new(),
        }
    }

    #[test]
    fn test_rank_ordering() {
        assert!(Rank::Undefined < Rank::Low);
        assert!(Rank::Low < Rank::Medium);
        assert!(Rank::Medium < Rank::High);
    }

    #[test]
    fn test_filtering_floors() {
        let finding = issue(Rank::Medium, Rank::High);
        assert!(finding.passes(Rank::Low, Rank::Low));
        assert!(finding.passes(Rank::Medium, Rank::High));
        assert!(!finding.passes(Rank::High, Rank::Low));

        let weak = issue(Rank::Low, Rank::Undefined);
        assert!(!weak.passes(Rank::Low, Rank::Low));
        assert!(weak.passes(Rank::Undefined, Rank::Undefined));
    }

    #[test]
    fn test_issue_equality_ignores_ranks() {
        let a = issue(Rank::High, Rank::Medium);
        let b = issue(Rank::Low, Rank::Low);
        assert_eq!(a, b);

        let mut c = issue(Rank::High, Rank::Medium);
        c.lineno = 4;
        assert_ne!(a, c);
    }

    #[test]
    fn test_scores_recover_counts() {
        let mut scores = Scores::default();
        scores.note(Rank::High, Rank::Medium);
        scores.note(Rank::High, Rank::Medium);
        scores.note(Rank::Low, Rank::Undefined);

        assert_eq!(scores.counts(Criterion::Severity), [0, 1, 0, 2]);
        assert_eq!(scores.counts(Criterion::Confidence), [1, 0, 2, 0]);
    }

    #[test]
    fn test_scores_update() {
        let mut total = Scores::default();
        let mut one = Scores::default();
        one.note(Rank::Medium, Rank::Low);
        total.update(&one);
        total.update(&one);
        assert_eq!(total.counts(Criterion::Severity), [0, 0, 2, 0]);
    }

    #[test]
    fn test_issue_serde_round_trip() {
        let original = issue(Rank::High, Rank::Medium);
        let encoded = serde_json::to_string(&original).unwrap();
        assert!(encoded.contains("\"HIGH\""));
        let decoded: Issue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(decoded.severity, Rank::High);
    }

    #[test]
    fn test_issue_deserialize_tolerates_missing_fields() {
        let decoded: Issue = serde_json::from_str(
            r#"{"filename": "a.js", "test_id": "P601", "lineno": 2, "text": "Use of eval(...)"}"#,
        )
        .unwrap();
        assert_eq!(decoded.severity, Rank::Undefined);
        assert_eq!(decoded.lineno, 2);
    }
}
