//! Declarative blacklist of call and import sites.
//!
//! Entries are plain data: `{name, id, qualnames, message, severity}`. A
//! call matches when its fully resolved callee path equals one of the
//! qualnames; an import matches on the module name, whether it arrives via
//! an `import` declaration or a `require(...)` call. Findings carry the
//! entry's own id and name.
//!
//! The default data set can be replaced wholesale from the `blacklist`
//! config block.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::issue::{Finding, Rank};
use crate::core::model::Kind;
use crate::core::nsp;
use crate::core::registry::{Test, TestResult};
use crate::core::visitor::Context;

pub const BLACKLIST_CONFIG_KEY: &str = "blacklist";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub name: String,
    pub id: String,
    pub qualnames: Vec<String>,
    /// May contain `{name}`, replaced with the matched qualname.
    pub message: String,
    pub severity: Rank,
}

fn default_calls() -> Vec<BlacklistEntry> {
    vec![
        BlacklistEntry {
            name: "insecure_cipher".into(),
            id: "P304".into(),
            qualnames: vec!["crypto.createCipher".into(), "crypto.createDecipher".into()],
            message: "Use of insecure cipher API {name}.".into(),
            severity: Rank::High,
        },
        BlacklistEntry {
            name: "pseudo_random".into(),
            id: "P311".into(),
            qualnames: vec!["Math.random".into()],
            message: "Standard pseudo-random generators are not suitable for security/cryptographic purposes."
                .into(),
            severity: Rank::Low,
        },
    ]
}

fn default_imports() -> Vec<BlacklistEntry> {
    vec![BlacklistEntry {
        name: "import_child_process".into(),
        id: "P404".into(),
        qualnames: vec!["child_process".into()],
        message: "Consider possible security implications associated with the {name} module."
            .into(),
        severity: Rank::Low,
    }]
}

/// Default config payload: both entry tables, JSON-shaped so a YAML
/// `blacklist` block with the same layout can replace it.
pub fn gen_config() -> Value {
    json!({
        "calls": default_calls(),
        "imports": default_imports(),
    })
}

fn entries(config: Option<&Value>, table: &str) -> Vec<BlacklistEntry> {
    config
        .and_then(|value| value.get(table))
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_else(|| match table {
            "calls" => default_calls(),
            _ => default_imports(),
        })
}

fn finding_for(entry: &BlacklistEntry, matched: &str) -> Finding {
    Finding::new(
        entry.severity,
        Rank::High,
        entry.message.replace("{name}", matched),
    )
    .with_source(entry.id.clone(), entry.name.clone())
}

/// The callee path as a dotted qualname, when fully resolved.
fn resolved_qualname(tokens: &[String]) -> Option<String> {
    let parts: Vec<&str> = tokens
        .iter()
        .map(|token| nsp::resolved(token))
        .collect::<Option<_>>()?;
    Some(parts.join("."))
}

/// Match resolved call and constructor paths against the call table.
pub fn blacklist_calls(context: &Context) -> TestResult {
    let tokens = nsp::callee_name_space(context.node);
    let Some(qualname) = resolved_qualname(&tokens) else {
        return Ok(None);
    };
    for entry in entries(context.config, "calls") {
        if entry.qualnames.iter().any(|candidate| candidate == &qualname) {
            return Ok(Some(finding_for(&entry, &qualname)));
        }
    }
    Ok(None)
}

fn imported_module(context: &Context) -> Option<String> {
    let node = context.node;
    match node.kind() {
        Kind::ImportDeclaration => node
            .child("source")
            .and_then(nsp::try_extract_string_value),
        Kind::CallExpression => {
            if !nsp::match_name_space(node, &["*require"]) {
                return None;
            }
            let arguments = node.list("arguments");
            arguments.first().and_then(|arg| nsp::try_extract_string_value(arg))
        }
        _ => None,
    }
}

/// Match `import ... from 'mod'` and `require('mod')` against the import
/// table.
pub fn blacklist_imports(context: &Context) -> TestResult {
    let Some(module) = imported_module(context) else {
        return Ok(None);
    };
    for entry in entries(context.config, "imports") {
        if entry.qualnames.iter().any(|candidate| candidate == &module) {
            return Ok(Some(finding_for(&entry, &module)));
        }
    }
    Ok(None)
}

pub fn tests() -> Vec<Test> {
    vec![
        Test {
            id: "P301",
            name: "blacklist_calls",
            checks: &["CallExpression", "NewExpression"],
            func: blacklist_calls,
            takes_config: Some(BLACKLIST_CONFIG_KEY),
            default_config: Some(gen_config),
        },
        Test {
            id: "P401",
            name: "blacklist_imports",
            checks: &["ImportDeclaration", "CallExpression"],
            func: blacklist_imports,
            takes_config: Some(BLACKLIST_CONFIG_KEY),
            default_config: Some(gen_config),
        },
    ]
}
