//! P603: NoSQL injection through server-side JavaScript evaluation.
//!
//! These MongoDB operations run arbitrary JavaScript expressions directly on
//! the server:
//!
//! 1) the `$where` query operator,
//! 2) `mapReduce`,
//! 3) `group` (deprecated since MongoDB 3.4).
//!
//! Convenient, but a direct injection vector whenever user-provided values
//! reach them unsanitised.

use crate::core::issue::{Finding, Rank};
use crate::core::nsp;
use crate::core::registry::{Test, TestResult};
use crate::core::visitor::Context;

fn report(severity: Rank, confidence: Rank, value: &str) -> Finding {
    Finding::new(
        severity,
        confidence,
        format!(
            "Potential NoSQL injection vector allowing server side JavaScript execution: '{}'",
            value
        ),
    )
}

/// Detect a `$where` key inside a single object argument, e.g.
/// `db.orders.find({active: true, $where: function() { ... }})`.
pub fn nosql_injection_where(context: &Context) -> TestResult {
    if nsp::match_argument_with_object_key(context.node, "*$where") {
        return Ok(Some(report(
            Rank::High,
            Rank::Medium,
            "Use of $where operator.",
        )));
    }
    Ok(None)
}

/// Detect `collection.mapReduce(...)` and `db.collection.mapReduce(...)`.
pub fn nosql_injection_map_reduce(context: &Context) -> TestResult {
    let node = context.node;
    if nsp::match_name_space(node, &["*", "*mapReduce"])
        || nsp::match_name_space(node, &["*", "*", "*mapReduce"])
    {
        return Ok(Some(report(
            Rank::Medium,
            Rank::Low,
            "Use of mapReduce(...).",
        )));
    }
    Ok(None)
}

/// Detect `collection.group(...)` and `db.collection.group(...)`.
pub fn nosql_injection_group(context: &Context) -> TestResult {
    let node = context.node;
    if nsp::match_name_space(node, &["*", "*group"])
        || nsp::match_name_space(node, &["*", "*", "*group"])
    {
        return Ok(Some(report(Rank::Medium, Rank::Low, "Use of group(...).")));
    }
    Ok(None)
}

pub fn tests() -> Vec<Test> {
    vec![
        Test {
            id: "P603",
            name: "nosql_injection_where",
            checks: &["CallExpression"],
            func: nosql_injection_where,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P603",
            name: "nosql_injection_map_reduce",
            checks: &["CallExpression"],
            func: nosql_injection_map_reduce,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P603",
            name: "nosql_injection_group",
            checks: &["CallExpression"],
            func: nosql_injection_group,
            takes_config: None,
            default_config: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Config;
    use crate::core::metrics::Metrics;
    use crate::core::registry::{Profile, TestSet};
    use crate::core::visitor::NodeVisitor;

    fn scan(source: &str) -> Vec<crate::core::issue::Issue> {
        let set = TestSet::new(&tests(), &Config::default(), &Profile::default()).unwrap();
        let mut metrics = Metrics::new();
        metrics.begin("input.js");
        let mut visitor = NodeVisitor::new("input.js", &set, Default::default(), &mut metrics);
        visitor.process(source).unwrap();
        visitor.tester.results
    }

    #[test]
    fn test_where_operator_detected() {
        let issues = scan("db.orders.find({active: true, $where: function() { return 1; }});");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].test_id, "P603");
        assert_eq!(issues[0].test_name, "nosql_injection_where");
        assert_eq!(issues[0].severity, Rank::High);
        assert_eq!(issues[0].confidence, Rank::Medium);
    }

    #[test]
    fn test_map_reduce_detected() {
        let issues = scan("db.collection.mapReduce(m, r, {out: {}});");
        // the options object has no $where key, only mapReduce fires
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].test_name, "nosql_injection_map_reduce");
        assert_eq!(issues[0].severity, Rank::Medium);
        assert_eq!(issues[0].confidence, Rank::Low);
    }

    #[test]
    fn test_group_detected() {
        let issues = scan("collection.group({key: k, reduce: r, initial: {}});");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].test_name, "nosql_injection_group");
    }

    #[test]
    fn test_plain_find_is_clean() {
        let issues = scan("db.orders.find({active: true});");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unrelated_group_identifier_is_clean() {
        let issues = scan("group(1, 2);");
        assert!(issues.is_empty());
    }
}
