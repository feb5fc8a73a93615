//! Functional tests for the built-in test plugins and the tracer.
//!
//! Each scenario writes example files to a temporary directory, runs the
//! manager (or the tracer) against them and checks the recovered issue
//! counts. When new checks are added to an example the expected counts
//! should be adjusted to match.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};

use panther::config::Config;
use panther::core::issue::{Criterion, Rank};
use panther::core::manager::{Manager, ResultSet};
use panther::core::registry::Profile;
use panther::tracer::diver::Diver;
use panther::tracer::routes::RouteFinder;

struct Example {
    _dir: TempDir,
    root: PathBuf,
}

impl Example {
    fn new() -> Example {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        Example { _dir: dir, root }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn scan(&self, ignore_nosec: bool) -> Manager {
        let mut manager = Manager::new(Config::default(), Profile::default(), ignore_nosec).unwrap();
        manager.discover_files(&[self.root.clone()], true, &[]);
        manager.run_tests();
        manager
    }
}

/// Issue counts per rank recovered from the per-file score vectors.
fn counts(manager: &Manager, criterion: Criterion) -> [u64; 4] {
    let mut totals = [0u64; 4];
    for scores in &manager.scores {
        for (slot, count) in totals.iter_mut().zip(scores.counts(criterion)) {
            *slot += count;
        }
    }
    totals
}

#[test]
fn test_eval() {
    let example = Example::new();
    example.write("eval.js", "var code = '2*2';\neval(code);\n");

    let manager = example.scan(false);
    assert_eq!(counts(&manager, Criterion::Severity), [0, 0, 0, 1]);
    assert_eq!(counts(&manager, Criterion::Confidence), [0, 0, 1, 0]);
    assert!(manager.results[0].text.contains("Use of eval"));
}

#[test]
fn test_new_function() {
    let example = Example::new();
    example.write("fn.js", "var sum = new Function('a', 'b', 'return a + b');\n");

    let manager = example.scan(false);
    assert_eq!(manager.results.len(), 1);
    let issue = &manager.results[0];
    assert_eq!(issue.test_id, "P601");
    assert_eq!(issue.severity, Rank::High);
    assert_eq!(issue.confidence, Rank::Medium);
    assert!(issue.text.contains("Use of Function"));
}

#[test]
fn test_nosql_where() {
    let example = Example::new();
    example.write(
        "nosql.js",
        "db.orders.find({active: true, $where: function() { return 1; }});\n",
    );

    let manager = example.scan(false);
    assert_eq!(manager.results.len(), 1);
    assert_eq!(manager.results[0].test_id, "P603");
    assert_eq!(manager.results[0].severity, Rank::High);
    assert_eq!(manager.results[0].confidence, Rank::Medium);
}

#[test]
fn test_nosql_map_reduce() {
    let example = Example::new();
    example.write("mapreduce.js", "db.collection.mapReduce(m, r, {out: {}});\n");

    let manager = example.scan(false);
    assert_eq!(manager.results.len(), 1);
    assert_eq!(manager.results[0].test_id, "P603");
    assert_eq!(manager.results[0].severity, Rank::Medium);
    assert_eq!(manager.results[0].confidence, Rank::Low);
}

#[test]
fn test_sql_injection() {
    let example = Example::new();
    example.write("sql.js", "var q = 'SELECT Id FROM ' + t;\n");

    let manager = example.scan(false);
    assert_eq!(manager.results.len(), 1);
    assert_eq!(manager.results[0].test_id, "P602");
    assert_eq!(manager.results[0].severity, Rank::High);
    assert_eq!(manager.results[0].confidence, Rank::Medium);
}

#[test]
fn test_sql_injection_escaped_is_clean() {
    let example = Example::new();
    example.write("sql.js", "var q = 'SELECT Id FROM ' + connection.escape(t);\n");

    let manager = example.scan(false);
    assert!(manager.results.is_empty());
}

#[test]
fn test_nonsense_file_is_skipped() {
    let example = Example::new();
    example.write("nonsense.js", "this is not a javascript file at all\n");

    let manager = example.scan(false);
    assert_eq!(manager.skipped.len(), 1);
    assert!(manager.results.is_empty());
}

#[test]
fn test_okay_file() {
    let example = Example::new();
    example.write("okay.js", "var fs = require('fs');\nfs.readFileSync('x');\n");

    let manager = example.scan(false);
    assert!(manager.results.is_empty());
    assert_eq!(counts(&manager, Criterion::Severity), [0, 0, 0, 0]);
}

#[test]
fn test_subdirectory_okay() {
    let example = Example::new();
    example.write("init-js-test/subdirectory-okay.js", "var x = 1;\n");

    let manager = example.scan(false);
    assert!(manager.results.is_empty());
    assert_eq!(manager.files_list.len(), 1);
}

#[test]
fn test_nosec() {
    let example = Example::new();
    example.write("nosec.js", "eval('2*2'); //nosec\n");

    let manager = example.scan(false);
    assert!(manager.results.is_empty());
}

#[test]
fn test_ignore_nosec() {
    let example = Example::new();
    example.write("nosec.js", "eval('2*2'); //nosec\n");

    let manager = example.scan(true);
    assert_eq!(manager.results.len(), 1);
}

#[test]
fn test_code_line_numbers() {
    let example = Example::new();
    example.write("eval.js", "var code = '2*2';\neval(code);\n");

    let manager = example.scan(false);
    let issue = &manager.results[0];
    let code_lines: Vec<&str> = issue.code.lines().collect();
    assert!(code_lines[0].starts_with(&format!("{} ", issue.lineno - 1)));
    assert!(code_lines[1].starts_with(&format!("{} ", issue.lineno)));
}

#[test]
fn test_metrics_totals() {
    let example = Example::new();
    example.write("a.js", "var x = 1;\n// comment\neval('2*2');\n");
    example.write("b.js", "var y = 2;\n");

    let manager = example.scan(false);
    assert_eq!(manager.metrics.totals().loc, 3);
    let issue_counts = &manager.metrics.totals().issue_counts;
    assert_eq!(issue_counts.get("SEVERITY.HIGH"), Some(&1));
    assert_eq!(issue_counts.get("CONFIDENCE.MEDIUM"), Some(&1));
}

#[test]
fn test_baseline_filters_known_issues() {
    let example = Example::new();
    example.write("eval.js", "eval('2*2');\n");

    let mut manager = example.scan(false);
    let baseline = serde_json::json!({"results": manager.results}).to_string();
    manager.populate_baseline(&baseline);

    match manager.filter_results(Rank::Low, Rank::Low) {
        ResultSet::Diffed(entries) => assert!(entries.is_empty()),
        other => panic!("expected diffed results, got {:?}", other),
    }
}

fn tracer_fixture(root: &Path) -> PathBuf {
    let basic = root.join("basic.js");
    fs::write(
        &basic,
        "var helpers = require('./helpers');\n\
         \n\
         app.get('/render', function (req, res) {\n\
           helpers.render(req.query.template);\n\
         });\n\
         \n\
         app.post('/report', function (req, res) {\n\
           helpers.buildReport(req.body);\n\
         });\n",
    )
    .unwrap();
    fs::write(
        root.join("helpers.js"),
        "function render(template) {\n\
           return eval(template);\n\
         }\n\
         \n\
         function buildReport(payload) {\n\
           return summarize(payload);\n\
         }\n\
         \n\
         function summarize(payload) {\n\
           return eval(payload);\n\
         }\n",
    )
    .unwrap();
    basic
}

#[test]
fn test_tracer_depth_bounds() {
    let example = Example::new();
    let basic = tracer_fixture(&example.root);

    let mut finder = RouteFinder::new();
    let routes = finder.fetch_routes(&basic);
    assert_eq!(routes.len(), 2);

    let mut diver = Diver::new(routes.clone(), false).unwrap();
    assert_eq!(diver.dive_all(3), 2);

    let mut diver = Diver::new(routes, false).unwrap();
    assert_eq!(diver.dive_all(2), 1);
}
