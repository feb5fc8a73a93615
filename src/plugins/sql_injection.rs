//! P602: SQL injection through string-built queries.
//!
//! Looks for strings that resemble SQL statements taking part in some form
//! of string building, e.g.:
//!
//! ```text
//! 'SELECT Id FROM ' + query + 'WHERE Id = 6'
//! concat('SELECT Id FROM ', a, b)
//! ['SELECT Id FROM ', query].join('')
//! `SELECT Id FROM MyTable WHERE Id = ${a() + 2 + 4}`
//! dangerous += 'SELECT Id FROM '
//! ```
//!
//! Mixing an SQL string with escaped expressions only is fine, so when every
//! non-string operand contains an `escape` call no issue is raised.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::issue::{Finding, Rank};
use crate::core::model::{Kind, Node};
use crate::core::nsp;
use crate::core::registry::{Test, TestResult};
use crate::core::visitor::Context;

static SQL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(select\s.*from\s|delete\s+from\s|insert\s+into\s.*values\s|update\s.*set\s)",
    )
    .unwrap()
});

static CALL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)join|append|concat").unwrap());

fn report(value: &str) -> Finding {
    Finding::new(
        Rank::High,
        Rank::Medium,
        format!(
            "Possible SQL injection vector through string-based query construction: '{}'",
            value
        ),
    )
}

/// An SQL-looking string is dangerous unless it is parameterised with `?`.
fn is_dangerous_sql(data: &str) -> bool {
    SQL_REGEX.is_match(data) && !data.contains('?')
}

fn is_dangerous_call(name: &str) -> bool {
    CALL_REGEX.is_match(name)
}

fn contains_escape(node: &Node) -> bool {
    serde_json::to_string(&node.to_value())
        .map(|dump| dump.contains("escape"))
        .unwrap_or(false)
}

/// True when the node list mixes a dangerous SQL string with unescaped
/// expressions.
fn is_dangerous_concatenation(nodes: &[&Node]) -> bool {
    let mut strings = Vec::new();
    let mut expressions = Vec::new();
    for node in nodes {
        match nsp::try_extract_string_value(node) {
            Some(text) => strings.push(text),
            None => expressions.push(*node),
        }
    }

    // Expressions only: we cannot tell whether a string is being mixed in.
    if strings.is_empty() || expressions.is_empty() {
        return false;
    }
    if !strings.iter().any(|text| is_dangerous_sql(text)) {
        return false;
    }
    // All expressions escaped counts as sanitised.
    !expressions.iter().all(|node| contains_escape(node))
}

/// Calls whose name smells like concatenation (`join`, `append`, `concat`)
/// with SQL strings among the callee parts or arguments.
pub fn hardcoded_sql_expressions_merge_function(context: &Context) -> TestResult {
    let node = context.node;
    let Some(callee) = node.child("callee") else {
        return Ok(None);
    };

    let mut node_list: Vec<&Node> = Vec::new();
    let mut dangerous_call = false;
    match callee.kind() {
        Kind::Identifier => {
            dangerous_call = callee
                .str_field("name")
                .map(is_dangerous_call)
                .unwrap_or(false);
        }
        Kind::MemberExpression => {
            dangerous_call = callee
                .child("property")
                .and_then(|property| property.str_field("name"))
                .map(is_dangerous_call)
                .unwrap_or(false);
            if let Some(object) = callee.child("object") {
                if object.kind() == Kind::ArrayExpression {
                    node_list.extend(object.list("elements"));
                } else {
                    node_list.push(object);
                }
            }
        }
        _ => {}
    }

    if dangerous_call {
        node_list.extend(node.list("arguments"));
        if is_dangerous_concatenation(&node_list) {
            return Ok(Some(report(
                "Concatenation of an SQL statement using a function.",
            )));
        }
    }
    Ok(None)
}

/// `+` chains mixing an SQL string with an expression.
pub fn hardcoded_sql_expressions_with_plus(context: &Context) -> TestResult {
    let node = context.node;
    if node.str_field("operator") == Some("+") {
        if let (Some(left), Some(right)) = (node.child("left"), node.child("right")) {
            if is_dangerous_concatenation(&[left, right]) {
                return Ok(Some(report(
                    "Concatenation with an SQL statement and an expression using (+).",
                )));
            }
        }
    }
    Ok(None)
}

/// Template literals interpolating expressions into an SQL string.
pub fn hardcoded_sql_expressions_with_template_literal(context: &Context) -> TestResult {
    let node = context.node;
    let mut node_list = node.list("quasis");
    node_list.extend(node.list("expressions"));
    if is_dangerous_concatenation(&node_list) {
        return Ok(Some(report(
            "Concatenation with an SQL statement using a template literal.",
        )));
    }
    Ok(None)
}

/// `+=` growing a query string.
pub fn hardcoded_sql_expressions_with_plus_equal(context: &Context) -> TestResult {
    let node = context.node;
    if node.str_field("operator") == Some("+=") {
        if let (Some(left), Some(right)) = (node.child("left"), node.child("right")) {
            if is_dangerous_concatenation(&[left, right]) {
                return Ok(Some(report(
                    "Concatenation with an SQL statement and an expression using (+=)",
                )));
            }
        }
    }
    Ok(None)
}

pub fn tests() -> Vec<Test> {
    vec![
        Test {
            id: "P602",
            name: "hardcoded_sql_expressions_merge_function",
            checks: &["CallExpression"],
            func: hardcoded_sql_expressions_merge_function,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P602",
            name: "hardcoded_sql_expressions_with_plus",
            checks: &["BinaryExpression"],
            func: hardcoded_sql_expressions_with_plus,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P602",
            name: "hardcoded_sql_expressions_with_template_literal",
            checks: &["TemplateLiteral"],
            func: hardcoded_sql_expressions_with_template_literal,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P602",
            name: "hardcoded_sql_expressions_with_plus_equal",
            checks: &["AssignmentExpression"],
            func: hardcoded_sql_expressions_with_plus_equal,
            takes_config: None,
            default_config: None,
        },
    ]
}
