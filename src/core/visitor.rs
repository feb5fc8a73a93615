//! Pre-order node visiting and test dispatch.
//!
//! The visitor walks a program, skips subtrees suppressed by `nosec` lines,
//! builds a [`Context`] per node and hands it to every test registered for
//! that node kind. Findings are stamped with their location and a code
//! excerpt; severity and confidence accumulate into the score vector.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::core::issue::{Issue, Scores};
use crate::core::metrics::Metrics;
use crate::core::model::{ModelError, Node};
use crate::core::registry::TestSet;
use crate::parser::{self, SyntaxError};

/// What a test callable gets to look at.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub node: &'a Node,
    pub filename: &'a str,
    /// 1-based start line, 0 when the node carries no location.
    pub lineno: usize,
    /// Inclusive line span of the subtree.
    pub linerange: (usize, usize),
    /// Config payload for tests that take one.
    pub config: Option<&'a Value>,
}

/// Why a file could not be processed.
#[derive(Debug)]
pub enum ProcessError {
    Syntax(SyntaxError),
    Model(ModelError),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Syntax(err) => err.fmt(f),
            ProcessError::Model(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ProcessError {}

impl From<SyntaxError> for ProcessError {
    fn from(err: SyntaxError) -> ProcessError {
        ProcessError::Syntax(err)
    }
}

impl From<ModelError> for ProcessError {
    fn from(err: ModelError) -> ProcessError {
        ProcessError::Model(err)
    }
}

/// Line span of a node: smallest to largest start line in its subtree,
/// ignoring the node's own `body` so a function signature does not swallow
/// its block.
pub fn linerange(node: &Node) -> (usize, usize) {
    let mut min = usize::MAX;
    let mut max = 0;
    if let Some(line) = node.start_line() {
        min = line;
        max = line;
    }
    for (name, item) in node.named_fields() {
        if name == "body" {
            continue;
        }
        for child in item.nodes() {
            for descendant in child.traverse() {
                if let Some(line) = descendant.start_line() {
                    min = min.min(line);
                    max = max.max(line);
                }
            }
        }
    }
    if max == 0 { (0, 1) } else { (min, max) }
}

/// Line span widened for multiline strings: when the next sibling starts
/// more than one line later, the span runs up to the line before it.
pub fn linerange_with_boundary(node: &Node, next_sibling_line: Option<usize>) -> (usize, usize) {
    let (start, end) = linerange(node);
    if let Some(sibling) = next_sibling_line {
        if sibling > start + 1 {
            return (start, sibling - 1);
        }
    }
    (start, end)
}

/// A few numbered source lines around `lineno`.
pub fn code_excerpt(lines: &[String], lineno: usize) -> String {
    if lineno == 0 || lineno > lines.len() {
        return String::new();
    }
    let start = lineno.saturating_sub(1).max(1);
    let end = (lineno + 1).min(lines.len());
    (start..=end)
        .map(|number| format!("{} {}\n", number, lines[number - 1]))
        .collect()
}

/// Runs the registered tests against one context at a time and keeps the
/// resulting issues.
pub struct Tester<'t> {
    test_set: &'t TestSet,
    pub results: Vec<Issue>,
}

impl<'t> Tester<'t> {
    pub fn new(test_set: &'t TestSet) -> Tester<'t> {
        Tester {
            test_set,
            results: Vec::new(),
        }
    }

    /// Offer the node to every test registered for its kind. A test that
    /// errors is logged at debug and never aborts the file.
    pub fn run_tests(&mut self, context: &Context, lines: &[String]) -> Scores {
        let mut scores = Scores::default();
        for prepared in self.test_set.tests_for(context.node.kind_name()) {
            let test_context = Context {
                config: prepared.config.as_ref(),
                ..*context
            };
            match (prepared.test.func)(&test_context) {
                Ok(Some(finding)) => {
                    let issue = Issue {
                        severity: finding.severity,
                        confidence: finding.confidence,
                        text: finding.text,
                        test_id: finding
                            .test_id
                            .unwrap_or_else(|| prepared.test.id.to_string()),
                        test_name: finding
                            .test_name
                            .unwrap_or_else(|| prepared.test.name.to_string()),
                        filename: context.filename.to_string(),
                        lineno: context.lineno,
                        linerange: context.linerange,
                        code: code_excerpt(lines, context.lineno),
                    };
                    scores.note(issue.severity, issue.confidence);
                    self.results.push(issue);
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(test = prepared.test.name, error = %error, "test raised, continuing");
                }
            }
        }
        scores
    }
}

/// Walks one file's AST, dispatching to the tester node by node.
pub struct NodeVisitor<'a> {
    filename: String,
    nosec_lines: HashSet<usize>,
    lines: Vec<String>,
    pub tester: Tester<'a>,
    pub scores: Scores,
    metrics: &'a mut Metrics,
}

impl<'a> NodeVisitor<'a> {
    pub fn new(
        filename: impl Into<String>,
        test_set: &'a TestSet,
        nosec_lines: HashSet<usize>,
        metrics: &'a mut Metrics,
    ) -> NodeVisitor<'a> {
        NodeVisitor {
            filename: filename.into(),
            nosec_lines,
            lines: Vec::new(),
            tester: Tester::new(test_set),
            scores: Scores::default(),
            metrics,
        }
    }

    /// Parse and visit a whole source buffer.
    pub fn process(&mut self, source: &str) -> Result<(), ProcessError> {
        self.lines = source.lines().map(str::to_owned).collect();
        let program = parser::parse(source)?;
        let root = Node::from_value(&program)?;
        self.visit(&root);
        Ok(())
    }

    /// Visit an already realised subtree, e.g. one function during a trace.
    pub fn visit(&mut self, node: &Node) {
        self.walk(node, None);
    }

    /// Attach source lines so issues carry code excerpts when visiting
    /// pre-realised nodes.
    pub fn with_source(&mut self, source: &str) {
        self.lines = source.lines().map(str::to_owned).collect();
    }

    fn walk(&mut self, node: &Node, boundary: Option<usize>) {
        if let Some(line) = node.start_line() {
            if self.nosec_lines.contains(&line) {
                debug!(line, "skipped, nosec");
                self.metrics.note_nosec();
                return;
            }
        }

        let context = Context {
            node,
            filename: &self.filename,
            lineno: node.start_line().unwrap_or(0),
            linerange: linerange_with_boundary(node, boundary),
            config: None,
        };
        let node_scores = self.tester.run_tests(&context, &self.lines);
        self.scores.update(&node_scores);

        let children = node.children();
        for (index, child) in children.iter().enumerate() {
            let boundary = children[index + 1..]
                .iter()
                .find_map(|sibling| sibling.start_line());
            self.walk(child, boundary);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Config;
    use crate::core::issue::Rank;
    use crate::core::registry::Profile;
    use crate::plugins;

    fn test_set() -> TestSet {
        TestSet::new(&plugins::builtin(), &Config::default(), &Profile::default()).unwrap()
    }

    fn run(source: &str, nosec: &[usize]) -> (Vec<Issue>, Scores) {
        let set = test_set();
        let mut metrics = Metrics::new();
        metrics.begin("input.js");
        let mut visitor =
            NodeVisitor::new("input.js", &set, nosec.iter().copied().collect(), &mut metrics);
        visitor.process(source).unwrap();
        (visitor.tester.results.clone(), visitor.scores.clone())
    }

    #[test]
    fn test_eval_produces_issue_with_location() {
        let (issues, scores) = run("var x = 1;\neval('2*2');\n", &[]);
        assert_eq!(issues.len(), 1);
        let issue = &issues[0];
        assert_eq!(issue.test_id, "P601");
        assert_eq!(issue.test_name, "eval_used");
        assert_eq!(issue.lineno, 2);
        assert_eq!(issue.severity, Rank::High);
        assert_eq!(issue.confidence, Rank::Medium);
        assert!(issue.text.contains("Use of eval"));
        assert_eq!(scores.severity[Rank::High.index()], Rank::High.weight());
    }

    #[test]
    fn test_code_excerpt_carries_line_numbers() {
        let (issues, _) = run("var x = 1;\neval('2*2');\nvar y = 2;\n", &[]);
        let code_lines: Vec<&str> = issues[0].code.lines().collect();
        assert_eq!(code_lines[0], "1 var x = 1;");
        assert_eq!(code_lines[1], "2 eval('2*2');");
        assert_eq!(code_lines[2], "3 var y = 2;");
    }

    #[test]
    fn test_nosec_suppresses_subtree() {
        let (issues, scores) = run("eval('2*2');\n", &[1]);
        assert!(issues.is_empty());
        assert_eq!(scores, Scores::default());
    }

    #[test]
    fn test_nosec_only_suppresses_its_line() {
        let (issues, _) = run("var ok = 1;\neval('2*2');\n", &[1]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].lineno, 2);
    }

    #[test]
    fn test_linerange_spans_subtree() {
        let program = parser::parse("var q =\n  'a' +\n  b;\n").unwrap();
        let root = Node::from_value(&program).unwrap();
        let declaration = root.list("body")[0];
        assert_eq!(linerange(declaration), (1, 3));
    }

    #[test]
    fn test_linerange_boundary_widens_for_multiline_strings() {
        let program = parser::parse("var a = 1;\n\n\nvar b = 2;\n").unwrap();
        let root = Node::from_value(&program).unwrap();
        let first = root.list("body")[0];
        assert_eq!(linerange_with_boundary(first, Some(4)), (1, 3));
        assert_eq!(linerange_with_boundary(first, Some(2)), (1, 1));
    }

    #[test]
    fn test_code_excerpt_bounds() {
        let lines: Vec<String> = vec!["one".into(), "two".into()];
        assert_eq!(code_excerpt(&lines, 1), "1 one\n2 two\n");
        assert_eq!(code_excerpt(&lines, 0), "");
        assert_eq!(code_excerpt(&lines, 5), "");
    }
}
