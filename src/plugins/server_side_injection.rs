//! P601: server side code injection through `eval` and `new Function`.
//!
//! `eval()` executes whatever string it is handed, and `new Function(...)`
//! takes code in string form as its last argument, so either one fed
//! unvalidated input lets an attacker run arbitrary JavaScript on the
//! server. Matched patterns:
//!
//! ```text
//! eval(code)                 global.eval(code)
//! new Function(...)          new global.Function(...)
//! ```

use crate::core::issue::{Finding, Rank};
use crate::core::nsp;
use crate::core::registry::{Test, TestResult};
use crate::core::visitor::Context;

fn report(value: &str) -> Finding {
    Finding::new(
        Rank::High,
        Rank::Medium,
        format!("Potential server side code injection detected: '{}'", value),
    )
}

fn check_global_call(context: &Context, function_name: &str) -> Option<Finding> {
    let bare = format!("*{}", function_name);
    if nsp::match_name_space(context.node, &[&bare]) {
        return Some(report(&format!("Use of {}(...)", function_name)));
    }
    if nsp::match_name_space(context.node, &["*global", &bare]) {
        return Some(report(&format!("Use of global.{}(...)", function_name)));
    }
    None
}

/// Detect `eval(code)` and `global.eval(code)`.
pub fn eval_used(context: &Context) -> TestResult {
    Ok(check_global_call(context, "eval"))
}

/// Detect `new Function(...)` and `new global.Function(...)`.
pub fn new_function_used(context: &Context) -> TestResult {
    Ok(check_global_call(context, "Function"))
}

pub fn tests() -> Vec<Test> {
    vec![
        Test {
            id: "P601",
            name: "eval_used",
            checks: &["CallExpression"],
            func: eval_used,
            takes_config: None,
            default_config: None,
        },
        Test {
            id: "P601",
            name: "new_function_used",
            checks: &["NewExpression"],
            func: new_function_used,
            takes_config: None,
            default_config: None,
        },
    ]
}
