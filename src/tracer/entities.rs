//! Entities shared across the tracer.

use std::fmt;
use std::path::PathBuf;

use crate::core::model::Node;

/// A function definition reachable during a trace: where it lives, what it
/// is called, and the subtree to test.
#[derive(Debug, Clone)]
pub struct Function {
    pub file_path: PathBuf,
    /// None for anonymous route callbacks.
    pub identifier: Option<String>,
    pub node: Node,
    /// `alias.name` when the function was reached through an import.
    pub caller: Option<String>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File Path: '{}'", self.file_path.display())?;
        writeln!(
            f,
            "Identifier: '{}'",
            self.identifier.as_deref().unwrap_or("[Anonymous]")
        )?;
        write!(f, "Caller: '{}'", self.caller.as_deref().unwrap_or("None"))
    }
}

/// HTTP verbs whose routing calls seed the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    /// The routing method name as it appears in source.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
            Method::Patch => "patch",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered route call site with its entry callbacks in source order.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: String,
    pub method: Method,
    pub entry_point_functions: Vec<Function>,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pattern: '{}'", self.pattern)?;
        write!(f, "Method: '{}'", self.method)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_function_display() {
        let node = Node::from_value(&json!({
            "type": "FunctionDeclaration",
            "id": {"type": "Identifier", "name": "handler"},
            "params": [],
            "body": {"type": "BlockStatement", "body": []},
            "generator": false,
            "expression": false,
            "async": false
        }))
        .unwrap();
        let function = Function {
            file_path: PathBuf::from("app.js"),
            identifier: Some("handler".into()),
            node,
            caller: Some("routes.handler".into()),
        };
        let text = function.to_string();
        assert!(text.contains("File Path: 'app.js'"));
        assert!(text.contains("Identifier: 'handler'"));
        assert!(text.contains("Caller: 'routes.handler'"));
    }

    #[test]
    fn test_method_names() {
        let names: Vec<&str> = Method::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["get", "post", "put", "delete", "patch"]);
    }
}
