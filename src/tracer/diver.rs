//! Bounded depth-first descent through the call graph.
//!
//! Starting from each route's entry callbacks, every frontier function is
//! run through the node visitor with the full test set. A function that
//! yields issues ends its branch and is reported with the stack that led
//! there; otherwise its resolved callees are followed until the depth
//! limit runs out.

use std::collections::HashSet;
use std::fs;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::core::issue::Issue;
use crate::core::metrics::Metrics;
use crate::core::model::Kind;
use crate::core::nsp;
use crate::core::registry::{Profile, TestSet};
use crate::core::visitor::NodeVisitor;
use crate::plugins;
use crate::tracer::entities::{Function, Route};
use crate::tracer::extractor::FileExtractor;

const STACK_SPLITTER: &str = "\n----------------\n";

pub struct Diver {
    routes: Vec<Route>,
    extractor: FileExtractor,
    test_set: TestSet,
    pub vulnerability_count: usize,
    debug: bool,
}

impl Diver {
    pub fn new(routes: Vec<Route>, debug: bool) -> Result<Diver> {
        let test_set = TestSet::new(&plugins::builtin(), &Config::default(), &Profile::default())?;
        Ok(Diver {
            routes,
            extractor: FileExtractor::new(),
            test_set,
            vulnerability_count: 0,
            debug,
        })
    }

    /// Functions called inside the given function that resolve somewhere:
    /// `fn()` in the same file, `module.fn()` through the imports.
    fn find(&mut self, function: &Function) -> Vec<Function> {
        let mut callees = Vec::new();
        for node in function.node.traverse() {
            if node.kind() != Kind::CallExpression {
                continue;
            }
            let callee = if nsp::match_name_space(node, &["*"]) {
                let tokens = nsp::callee_name_space(node);
                nsp::resolved(&tokens[0]).and_then(|identifier| {
                    self.extractor
                        .try_match_function(&function.file_path, identifier)
                })
            } else if nsp::match_name_space(node, &["*", "*"]) {
                let tokens = nsp::callee_name_space(node);
                match (nsp::resolved(&tokens[0]), nsp::resolved(&tokens[1])) {
                    (Some(module), Some(identifier)) => {
                        self.extractor
                            .try_fetch_function(&function.file_path, module, identifier)
                    }
                    _ => None,
                }
            } else {
                None
            };
            if let Some(callee) = callee {
                callees.push(callee);
            }
        }
        callees
    }

    /// Run the full test set over one function node.
    fn test(&mut self, function: &Function) -> Vec<Issue> {
        let fname = function.file_path.to_string_lossy().to_string();
        let mut metrics = Metrics::new();
        metrics.begin(&fname);
        let mut visitor = NodeVisitor::new(&fname, &self.test_set, HashSet::new(), &mut metrics);
        if let Ok(source) = fs::read_to_string(&function.file_path) {
            visitor.with_source(&source);
        }
        visitor.visit(&function.node);
        visitor.tester.results
    }

    /// Trace every entry function of every route. Returns the number of
    /// vulnerable branches found.
    pub fn dive_all(&mut self, depth: usize) -> usize {
        self.vulnerability_count = 0;
        let routes = self.routes.clone();
        for route in &routes {
            for function in &route.entry_point_functions {
                self.dive(function, vec![route.to_string()], depth);
            }
        }
        self.vulnerability_count
    }

    fn dive(&mut self, function: &Function, mut stack_trace: Vec<String>, depth: usize) {
        let depth = depth.saturating_sub(1);
        stack_trace.push(function.to_string());

        let results = self.test(function);
        if !results.is_empty() {
            self.report(&stack_trace, &results);
            self.vulnerability_count += 1;
            return;
        }
        if depth == 0 {
            if self.debug {
                eprintln!(
                    "\nPath search finished but nothing found. See stack trace below.\n\n{}",
                    format_stack_trace(&stack_trace)
                );
            }
            return;
        }
        for callee in self.find(function) {
            self.dive(&callee, stack_trace.clone(), depth);
        }
    }

    fn report(&self, stack_trace: &[String], results: &[Issue]) {
        println!(
            "{}{}\n{}",
            "\n============================\n".magenta(),
            format_stack_trace(stack_trace).blue(),
            format_issues(results).yellow()
        );
    }
}

fn format_stack_trace(stack_trace: &[String]) -> String {
    stack_trace.join(STACK_SPLITTER)
}

fn format_issues(results: &[Issue]) -> String {
    results
        .iter()
        .map(|issue| format!("\nLine: {} - {}\n{}", issue.lineno, issue.text, issue.code))
        .collect::<Vec<_>>()
        .join("----------------\n")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::tracer::routes::RouteFinder;

    /// Two routes: one reaches eval two hops down, the other three hops
    /// down. Depth 2 can only prove the first, depth 3 proves both.
    fn write_fixture(dir: &Path) -> std::path::PathBuf {
        let basic = dir.join("basic.js");
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
            dir.join("helpers.js"),
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

    fn vulnerability_count(depth: usize) -> usize {
        let dir = tempdir().unwrap();
        let basic = write_fixture(dir.path());
        let mut finder = RouteFinder::new();
        let routes = finder.fetch_routes(&basic);
        assert_eq!(routes.len(), 2);
        let mut diver = Diver::new(routes, false).unwrap();
        diver.dive_all(depth)
    }

    #[test]
    fn test_depth_three_finds_both_branches() {
        assert_eq!(vulnerability_count(3), 2);
    }

    #[test]
    fn test_depth_two_finds_one_branch() {
        assert_eq!(vulnerability_count(2), 1);
    }

    #[test]
    fn test_depth_one_finds_nothing() {
        assert_eq!(vulnerability_count(1), 0);
    }
}
