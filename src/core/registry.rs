//! Test registration and profile resolution.
//!
//! The core expects a fully materialised registry: every built-in detector
//! is described by a [`Test`] and the effective set for a run comes from the
//! profile's include/exclude lists. Discovery of third-party plugins is an
//! integration concern and lives outside the engine.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::core::issue::Finding;
use crate::core::visitor::Context;

pub type TestResult = Result<Option<Finding>>;
pub type TestFn = fn(&Context) -> TestResult;

/// One registered detector.
#[derive(Debug, Clone, Copy)]
pub struct Test {
    /// Id of the form `[A-Z]\d+`, e.g. `P601`. Several tests may share one.
    pub id: &'static str,
    pub name: &'static str,
    /// Node kinds this test wants to see.
    pub checks: &'static [&'static str],
    pub func: TestFn,
    /// Config block key, for tests that are driven by configuration.
    pub takes_config: Option<&'static str>,
    /// Fallback when the user config has no block for `takes_config`.
    pub default_config: Option<fn() -> Value>,
}

/// Profile restricting the effective test set.
#[derive(Debug, Default, Clone)]
pub struct Profile {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// A test with its resolved config payload.
#[derive(Debug, Clone)]
pub struct PreparedTest {
    pub test: Test,
    pub config: Option<Value>,
}

/// The effective tests for a run, indexed by the node kinds they check.
#[derive(Debug, Default)]
pub struct TestSet {
    by_kind: HashMap<&'static str, Vec<PreparedTest>>,
}

impl TestSet {
    pub fn new(tests: &[Test], config: &Config, profile: &Profile) -> Result<TestSet> {
        validate_profile(tests, profile)?;
        let effective = effective_ids(tests, profile);

        let mut by_kind: HashMap<&'static str, Vec<PreparedTest>> = HashMap::new();
        for test in tests {
            if !effective.contains(test.id) {
                continue;
            }
            let payload = match test.takes_config {
                Some(key) => config
                    .option_as_json(key)
                    .or_else(|| test.default_config.map(|generate| generate())),
                None => None,
            };
            for check in test.checks {
                by_kind.entry(check).or_default().push(PreparedTest {
                    test: *test,
                    config: payload.clone(),
                });
                debug!(test = test.name, id = test.id, kind = check, "registered test");
            }
        }
        Ok(TestSet { by_kind })
    }

    /// All tests interested in the given node kind.
    pub fn tests_for(&self, kind: &str) -> &[PreparedTest] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn validate_profile(tests: &[Test], profile: &Profile) -> Result<()> {
    let known: BTreeSet<&str> = tests.iter().map(|test| test.id).collect();
    for id in profile.include.iter().chain(&profile.exclude) {
        if !known.contains(id.as_str()) {
            bail!("Unknown test found in profile: {}", id);
        }
    }

    let include: BTreeSet<&String> = profile.include.iter().collect();
    let overlap: Vec<&str> = profile
        .exclude
        .iter()
        .filter(|id| include.contains(id))
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        bail!(
            "Non-exclusive include/exclude test sets: {}",
            overlap.join(", ")
        );
    }
    Ok(())
}

fn effective_ids(tests: &[Test], profile: &Profile) -> BTreeSet<String> {
    let mut effective: BTreeSet<String> = if profile.include.is_empty() {
        tests.iter().map(|test| test.id.to_string()).collect()
    } else {
        profile.include.iter().cloned().collect()
    };
    for id in &profile.exclude {
        effective.remove(id);
    }
    effective
}
