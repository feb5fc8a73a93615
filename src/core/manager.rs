//! Run orchestration.
//!
//! Discovers target files, drives parse/visit/score per file in sorted path
//! order, keeps skip reasons, and filters the result store by rank floors
//! and an optional baseline.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use glob::Pattern;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::core::issue::{Issue, Rank, Scores};
use crate::core::metrics::Metrics;
use crate::core::registry::{Profile, TestSet};
use crate::core::visitor::{NodeVisitor, ProcessError};
use crate::plugins;

/// Always excluded from discovery.
pub const NODE_MODULES: &str = "node_modules";

/// Lines carrying the nosec marker, 1-based.
pub fn nosec_lines(source: &str) -> HashSet<usize> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains("//nosec") || line.contains("// nosec"))
        .map(|(index, _)| index + 1)
        .collect()
}

/// An unmatched issue from a baseline diff, with the current issues equal to
/// it. When counts differ between baseline and current run the new finding
/// cannot be localised, so the user picks from the candidates.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub issue: Issue,
    pub candidates: Vec<Issue>,
}

/// The filtered outcome of a run.
#[derive(Debug)]
pub enum ResultSet {
    Plain(Vec<Issue>),
    Diffed(Vec<DiffEntry>),
}

impl ResultSet {
    pub fn count(&self) -> usize {
        match self {
            ResultSet::Plain(issues) => issues.len(),
            ResultSet::Diffed(entries) => entries.len(),
        }
    }
}

pub struct Manager {
    config: Config,
    pub ignore_nosec: bool,
    pub files_list: Vec<PathBuf>,
    pub excluded_files: Vec<PathBuf>,
    /// Files that could not be scanned, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub results: Vec<Issue>,
    /// One score vector per successfully scanned file, in file order.
    pub scores: Vec<Scores>,
    pub metrics: Metrics,
    baseline: Vec<Issue>,
    test_set: TestSet,
}

impl Manager {
    pub fn new(config: Config, profile: Profile, ignore_nosec: bool) -> Result<Manager> {
        let test_set = TestSet::new(&plugins::builtin(), &config, &profile)?;
        Ok(Manager {
            config,
            ignore_nosec,
            files_list: Vec::new(),
            excluded_files: Vec::new(),
            skipped: Vec::new(),
            results: Vec::new(),
            scores: Vec::new(),
            metrics: Metrics::new(),
            baseline: Vec::new(),
            test_set,
        })
    }

    /// Build the list of files to analyze from targets, include globs and
    /// exclusion substrings. `node_modules` is always excluded.
    pub fn discover_files(&mut self, targets: &[PathBuf], recursive: bool, excluded_paths: &[String]) {
        let mut excluded_strings = self.config.exclude_dirs();
        excluded_strings.push(NODE_MODULES.to_string());
        excluded_strings.extend(excluded_paths.iter().cloned());

        let globs: Vec<Pattern> = self
            .config
            .include_globs()
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(pattern) => Some(pattern),
                Err(error) => {
                    warn!(%glob, %error, "ignoring invalid include glob");
                    None
                }
            })
            .collect();

        let mut files: HashSet<PathBuf> = HashSet::new();
        let mut excluded: HashSet<PathBuf> = HashSet::new();

        for target in targets {
            if target.is_dir() {
                if !recursive {
                    warn!(
                        "Skipping directory ({}), use -r flag to scan contents",
                        target.display()
                    );
                    continue;
                }
                for entry in WalkDir::new(target).into_iter().filter_map(|e| e.ok()) {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.into_path();
                    if is_file_included(&path, &globs, &excluded_strings, true) {
                        files.insert(path);
                    } else {
                        excluded.insert(path);
                    }
                }
            } else {
                // A file named on the command line is scanned regardless of
                // the include globs.
                if is_file_included(target, &globs, &excluded_strings, false) {
                    files.insert(target.clone());
                } else {
                    excluded.insert(target.clone());
                }
            }
        }

        self.files_list = files.into_iter().collect();
        self.files_list.sort();
        self.excluded_files = excluded.into_iter().collect();
        self.excluded_files.sort();
    }

    /// Scan every discovered file. Problem files move from the file list to
    /// the skipped list; the run always continues.
    pub fn run_tests(&mut self) {
        let files = std::mem::take(&mut self.files_list);
        let mut scanned = Vec::with_capacity(files.len());
        for path in files {
            debug!(file = %path.display(), "working on file");
            match self.parse_file(&path) {
                Ok(()) => scanned.push(path),
                Err(reason) => self.skipped.push((path, reason)),
            }
        }
        self.files_list = scanned;
        self.metrics.aggregate();
    }

    fn parse_file(&mut self, path: &Path) -> Result<(), String> {
        let source = fs::read_to_string(path).map_err(|error| error.to_string())?;
        let fname = path.to_string_lossy().to_string();

        self.metrics.begin(&fname);
        self.metrics.count_locs(source.lines());

        let nosec = if self.ignore_nosec {
            HashSet::new()
        } else {
            nosec_lines(&source)
        };

        let (scores, issues, outcome) = {
            let mut visitor = NodeVisitor::new(&fname, &self.test_set, nosec, &mut self.metrics);
            let outcome = visitor.process(&source);
            (
                visitor.scores.clone(),
                std::mem::take(&mut visitor.tester.results),
                outcome,
            )
        };

        match outcome {
            Ok(()) => {
                self.results.extend(issues);
                self.metrics.count_issues(&scores);
                self.scores.push(scores);
                Ok(())
            }
            Err(ProcessError::Syntax(_)) => Err("syntax error while parsing AST from file".into()),
            Err(ProcessError::Model(error)) => {
                debug!(file = %path.display(), %error, "model realisation failed");
                Err("exception while scanning file".into())
            }
        }
    }

    /// Load a previous JSON report as the baseline. Unreadable data is
    /// non-fatal: warn and treat the baseline as empty.
    pub fn populate_baseline(&mut self, data: &str) {
        #[derive(Deserialize)]
        struct BaselineReport {
            #[serde(default)]
            results: Vec<Issue>,
        }

        self.baseline = match serde_json::from_str::<BaselineReport>(data) {
            Ok(report) => report.results,
            Err(error) => {
                warn!(%error, "Failed to load baseline data");
                Vec::new()
            }
        };
    }

    /// Results above the rank floors; with a baseline loaded, only findings
    /// not present in it, each paired with its equal candidates.
    pub fn filter_results(&self, severity: Rank, confidence: Rank) -> ResultSet {
        let results: Vec<Issue> = self
            .results
            .iter()
            .filter(|issue| issue.passes(severity, confidence))
            .cloned()
            .collect();

        if self.baseline.is_empty() {
            return ResultSet::Plain(results);
        }

        let entries = results
            .iter()
            .filter(|issue| !self.baseline.contains(issue))
            .map(|unmatched| DiffEntry {
                issue: unmatched.clone(),
                candidates: results
                    .iter()
                    .filter(|candidate| *candidate == unmatched)
                    .cloned()
                    .collect(),
            })
            .collect();
        ResultSet::Diffed(entries)
    }

    pub fn results_count(&self, severity: Rank, confidence: Rank) -> usize {
        self.filter_results(severity, confidence).count()
    }
}

fn is_file_included(
    path: &Path,
    globs: &[Pattern],
    excluded_strings: &[String],
    enforce_glob: bool,
) -> bool {
    let text = path.to_string_lossy();
    let glob_ok = !enforce_glob || globs.iter().any(|pattern| pattern.matches(&text));
    glob_ok && !excluded_strings.iter().any(|needle| text.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn manager() -> Manager {
        Manager::new(Config::default(), Profile::default(), false).unwrap()
    }

    #[test]
    fn test_nosec_lines() {
        let source = "eval('x'); //nosec\nvar a = 1;\neval('y'); // nosec\nvar b = 2; // no sec\n";
        let lines = nosec_lines(source);
        assert!(lines.contains(&1));
        assert!(lines.contains(&3));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_discover_respects_globs_and_node_modules() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "var a = 1;\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
        let deps = dir.path().join("node_modules");
        fs::create_dir(&deps).unwrap();
        fs::write(deps.join("lib.js"), "var b = 2;\n").unwrap();

        let mut mgr = manager();
        mgr.discover_files(&[dir.path().to_path_buf()], true, &[]);

        assert_eq!(mgr.files_list.len(), 1);
        assert!(mgr.files_list[0].ends_with("app.js"));
        assert!(
            mgr.excluded_files
                .iter()
                .all(|p| !p.to_string_lossy().ends_with("app.js"))
        );
    }

    #[test]
    fn test_discover_directory_needs_recursive() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "var a = 1;\n").unwrap();

        let mut mgr = manager();
        mgr.discover_files(&[dir.path().to_path_buf()], false, &[]);
        assert!(mgr.files_list.is_empty());
    }

    #[test]
    fn test_explicit_file_bypasses_glob() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.mjs");
        fs::write(&path, "var a = 1;\n").unwrap();

        let mut mgr = manager();
        mgr.discover_files(&[path.clone()], false, &[]);
        assert_eq!(mgr.files_list, vec![path]);
    }

    #[test]
    fn test_run_collects_issues_and_skips_bad_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.js"), "this is not javascript at all\n").unwrap();
        fs::write(dir.path().join("eval.js"), "eval('2*2');\n").unwrap();
        fs::write(dir.path().join("okay.js"), "var x = 1;\n").unwrap();

        let mut mgr = manager();
        mgr.discover_files(&[dir.path().to_path_buf()], true, &[]);
        mgr.run_tests();

        assert_eq!(mgr.results.len(), 1);
        assert_eq!(mgr.results[0].test_id, "P601");
        assert_eq!(mgr.skipped.len(), 1);
        assert!(mgr.skipped[0].0.ends_with("bad.js"));
        assert_eq!(mgr.skipped[0].1, "syntax error while parsing AST from file");
        // the skipped file is no longer in the scanned list
        assert_eq!(mgr.files_list.len(), 2);
    }

    #[test]
    fn test_nosec_and_ignore_nosec() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("nosec.js"), "eval('2*2'); //nosec\n").unwrap();

        let mut quiet = manager();
        quiet.discover_files(&[dir.path().to_path_buf()], true, &[]);
        quiet.run_tests();
        assert!(quiet.results.is_empty());

        let mut loud = Manager::new(Config::default(), Profile::default(), true).unwrap();
        loud.discover_files(&[dir.path().to_path_buf()], true, &[]);
        loud.run_tests();
        assert_eq!(loud.results.len(), 1);
    }

    #[test]
    fn test_filter_results_by_rank() {
        let mut mgr = manager();
        mgr.results.push(Issue {
            severity: Rank::High,
            confidence: Rank::Medium,
            text: "one".into(),
            test_id: "P601".into(),
            test_name: "eval_used".into(),
            filename: "a.js".into(),
            lineno: 1,
            linerange: (1, 1),
            code: String::new(),
        });
        assert_eq!(mgr.results_count(Rank::Low, Rank::Low), 1);
        assert_eq!(mgr.results_count(Rank::High, Rank::Low), 1);
        assert_eq!(mgr.results_count(Rank::Low, Rank::High), 0);
    }

    #[test]
    fn test_baseline_diff_is_idempotent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("eval.js"), "eval('2*2');\n").unwrap();

        let mut mgr = manager();
        mgr.discover_files(&[dir.path().to_path_buf()], true, &[]);
        mgr.run_tests();
        assert_eq!(mgr.results.len(), 1);

        let report = serde_json::json!({"results": mgr.results}).to_string();
        mgr.populate_baseline(&report);
        match mgr.filter_results(Rank::Low, Rank::Low) {
            ResultSet::Diffed(entries) => assert!(entries.is_empty()),
            other => panic!("expected a diffed result set, got {:?}", other),
        }
    }

    #[test]
    fn test_baseline_surfaces_new_issue_with_candidates() {
        let mut mgr = manager();
        let old = Issue {
            severity: Rank::High,
            confidence: Rank::Medium,
            text: "Use of eval(...)".into(),
            test_id: "P601".into(),
            test_name: "eval_used".into(),
            filename: "a.js".into(),
            lineno: 1,
            linerange: (1, 1),
            code: String::new(),
        };
        let mut new = old.clone();
        new.lineno = 9;
        mgr.results.push(old.clone());
        mgr.results.push(new.clone());
        mgr.populate_baseline(&serde_json::json!({"results": [old]}).to_string());

        match mgr.filter_results(Rank::Low, Rank::Low) {
            ResultSet::Diffed(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].issue, new);
                assert_eq!(entries[0].candidates.len(), 1);
            }
            other => panic!("expected a diffed result set, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_baseline_is_nonfatal() {
        let mut mgr = manager();
        mgr.populate_baseline("not json at all");
        match mgr.filter_results(Rank::Low, Rank::Low) {
            ResultSet::Plain(issues) => assert!(issues.is_empty()),
            other => panic!("expected plain results, got {:?}", other),
        }
    }
}
