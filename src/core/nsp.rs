//! Namespace extraction and pattern matching over call expressions.
//!
//! A callee path is canonicalised into a sequence of tokens. A token starts
//! with `*` when the name is statically resolved and with `?` (followed by
//! the node kind) when it is not. Patterns use the same alphabet: `*` and
//! `?` alone are wildcards over the resolved/unresolved halves, `*name` and
//! `?Kind` require exact matches.
//!
//! Examples of what an expression reduces to:
//!
//! ```text
//! x()            -> ["*x"]
//! x.y.z()        -> ["*x", "*y", "*z"]
//! x[y][z]()      -> ["*x", "?Identifier", "?Identifier"]
//! x[y][z.j]()    -> ["*x", "?Identifier", "?MemberExpression"]
//! x['y'][3]()    -> ["*x", "*y", "*3"]
//! [].x()         -> ["?ArrayExpression", "*x"]
//! ''.x()         -> ["?Literal", "*x"]
//! fn()()         -> ["?CallExpression"]
//! ```
//!
//! Detectors are written against [`match_name_space`],
//! [`match_argument_with_object_key`] and [`try_extract_string_value`]
//! rather than against raw node fields.

use serde_json::Value;

use crate::core::model::{Kind, Node};

fn literal_repr(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Extract one token from a node. With `disable_conversion` the node is
/// reported by kind even when it carries a static name; member expressions
/// need this for computed properties, where `x[y]` must not read as `x.y`.
pub fn extract_name(node: &Node, disable_conversion: bool) -> String {
    if !disable_conversion {
        match node.kind() {
            Kind::Identifier => {
                if let Some(name) = node.str_field("name") {
                    return format!("*{}", name);
                }
            }
            Kind::Literal => {
                if let Some(value) = node.raw("value") {
                    return format!("*{}", literal_repr(value));
                }
            }
            _ => {}
        }
    }
    format!("?{}", node.kind_name())
}

fn read_property(member: &Node) -> String {
    match member.child("property") {
        Some(property) => {
            let disable = member.bool_field("computed") && property.kind() == Kind::Identifier;
            extract_name(property, disable)
        }
        None => format!("?{}", member.kind_name()),
    }
}

/// Tokens for an arbitrary expression. Member chains unroll object-first;
/// anything that is not a member expression is a single token.
pub fn name_space(expression: &Node) -> Vec<String> {
    if expression.kind() != Kind::MemberExpression {
        return vec![extract_name(expression, false)];
    }

    let mut names = vec![read_property(expression)];
    let mut object = expression.child("object");
    while let Some(member) = object.filter(|node| node.kind() == Kind::MemberExpression) {
        names.insert(0, read_property(member));
        object = member.child("object");
    }
    if let Some(base) = object {
        // A literal base keeps its kind: ''.x() reads Literal.x, not .x
        let disable = base.kind() == Kind::Literal;
        names.insert(0, extract_name(base, disable));
    }
    names
}

/// Tokens for the callee path. Call and `new` expressions contribute their
/// callee; any other node is tokenised as an expression.
pub fn callee_name_space(node: &Node) -> Vec<String> {
    match node.kind() {
        Kind::CallExpression | Kind::NewExpression => node
            .child("callee")
            .map(name_space)
            .unwrap_or_default(),
        _ => name_space(node),
    }
}

/// Match one token against one pattern.
pub fn match_pattern(name: &str, pattern: &str) -> bool {
    match pattern.len() {
        0 => false,
        1 => name.starts_with(pattern),
        _ => name == pattern,
    }
}

/// Positional match of the node's namespace against a pattern list.
/// A length mismatch never matches.
pub fn match_name_space(node: &Node, patterns: &[&str]) -> bool {
    let names = callee_name_space(node);
    if patterns.is_empty() || names.len() != patterns.len() {
        return false;
    }
    names
        .iter()
        .zip(patterns)
        .all(|(name, pattern)| match_pattern(name, pattern))
}

/// True when the call has exactly one argument, that argument is an object
/// expression, and at least one property key matches `key_pattern`.
///
/// Computed identifier keys (`{[prop]: …}`) report as `?Identifier`, so
/// `*prop` does not match them.
pub fn match_argument_with_object_key(call: &Node, key_pattern: &str) -> bool {
    let arguments = call.list("arguments");
    if arguments.len() != 1 || arguments[0].kind() != Kind::ObjectExpression {
        return false;
    }

    arguments[0].list("properties").iter().any(|property| {
        let Some(key) = property.child("key") else {
            return false;
        };
        let disable = property.bool_field("computed") && key.kind() == Kind::Identifier;
        match_pattern(&extract_name(key, disable), key_pattern)
    })
}

/// A string, if the node is one: a literal whose raw text is quoted yields
/// its value, a template element yields its cooked value.
pub fn try_extract_string_value(node: &Node) -> Option<String> {
    match node.kind() {
        Kind::Literal => {
            let raw = node.str_field("raw")?;
            if raw.starts_with('"') || raw.starts_with('\'') {
                node.str_field("value").map(str::to_owned)
            } else {
                None
            }
        }
        Kind::TemplateElement => node
            .raw("value")?
            .get("cooked")?
            .as_str()
            .map(str::to_owned),
        _ => None,
    }
}

/// The bare name behind a resolved token, if it is one.
pub fn resolved(token: &str) -> Option<&str> {
    token.strip_prefix('*')
}
