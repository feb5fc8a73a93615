//! Per-file extraction caches for the tracer.
//!
//! Three lazy caches keyed by file path: the realised program, the
//! `require` import table, and the function definition table. Caches fill
//! on first request and are never invalidated during a run. Files that
//! cannot be read or parsed resolve to no-match rather than errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::core::model::{Kind, Node};
use crate::core::nsp;
use crate::parser;
use crate::tracer::entities::Function;

#[derive(Debug, Default)]
pub struct FileExtractor {
    program_cache: HashMap<PathBuf, Option<Node>>,
    import_cache: HashMap<PathBuf, HashMap<String, String>>,
    function_definition_cache: HashMap<PathBuf, HashMap<String, Node>>,
}

fn load_program(file_path: &Path) -> Option<Node> {
    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(error) => {
            debug!(file = %file_path.display(), %error, "cannot read file");
            return None;
        }
    };
    let value = match parser::parse(&source) {
        Ok(value) => value,
        Err(error) => {
            debug!(file = %file_path.display(), %error, "cannot parse file");
            return None;
        }
    };
    match Node::from_value(&value) {
        Ok(node) => Some(node),
        Err(error) => {
            debug!(file = %file_path.display(), %error, "cannot realise file");
            None
        }
    }
}

/// Extract `var x = require('./mod')` bindings to relative module paths.
fn scan_imports(program: &Node) -> HashMap<String, String> {
    let mut imports = HashMap::new();
    for node in program.traverse() {
        if node.kind() != Kind::VariableDeclarator {
            continue;
        }
        let (Some(id), Some(init)) = (node.child("id"), node.child("init")) else {
            continue;
        };
        if id.kind() != Kind::Identifier || init.kind() != Kind::CallExpression {
            continue;
        }
        if !nsp::match_name_space(init, &["*require"]) {
            continue;
        }
        let arguments = init.list("arguments");
        let Some(module_path) = arguments.first().and_then(|arg| nsp::try_extract_string_value(arg))
        else {
            continue;
        };
        if module_path.starts_with('.') || module_path.starts_with('/') {
            if let Some(name) = id.str_field("name") {
                imports.insert(name.to_string(), module_path);
            }
        }
    }
    imports
}

/// A `name = function() {}` style assignment whose target resolves
/// statically yields a named function definition.
fn resolved_assignment<'a>(left: &Node, right: &'a Node) -> Option<(String, &'a Node)> {
    if right.kind() != Kind::FunctionExpression {
        return None;
    }
    let name_space = nsp::name_space(left);
    let last = name_space.last()?;
    nsp::resolved(last).map(|name| (name.to_string(), right))
}

/// Collect function definitions: declarations, assignments and
/// variable initialisers.
fn scan_function_definitions(program: &Node) -> HashMap<String, Node> {
    let mut definitions = HashMap::new();
    for node in program.traverse() {
        match node.kind() {
            Kind::FunctionDeclaration => {
                if let Some(name) = node.child("id").and_then(|id| id.str_field("name")) {
                    definitions.insert(name.to_string(), node.clone());
                }
            }
            Kind::AssignmentExpression if node.str_field("operator") == Some("=") => {
                if let (Some(left), Some(right)) = (node.child("left"), node.child("right")) {
                    if let Some((name, function)) = resolved_assignment(left, right) {
                        definitions.insert(name, function.clone());
                    }
                }
            }
            Kind::VariableDeclaration => {
                for declarator in node.list("declarations") {
                    if let (Some(id), Some(init)) =
                        (declarator.child("id"), declarator.child("init"))
                    {
                        if let Some((name, function)) = resolved_assignment(id, init) {
                            definitions.insert(name, function.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    definitions
}

impl FileExtractor {
    pub fn new() -> FileExtractor {
        FileExtractor::default()
    }

    /// The realised program for a path, parsed on first request.
    pub fn get_program(&mut self, file_path: &Path) -> Option<&Node> {
        if !self.program_cache.contains_key(file_path) {
            let program = load_program(file_path);
            self.program_cache.insert(file_path.to_path_buf(), program);
        }
        self.program_cache.get(file_path)?.as_ref()
    }

    /// The import table for a path, extracted on first request.
    pub fn get_imports(&mut self, file_path: &Path) -> &HashMap<String, String> {
        if !self.import_cache.contains_key(file_path) {
            let imports = self
                .get_program(file_path)
                .map(scan_imports)
                .unwrap_or_default();
            self.import_cache.insert(file_path.to_path_buf(), imports);
        }
        &self.import_cache[file_path]
    }

    /// The function definition table for a path, extracted on first request.
    pub fn get_function_definitions(&mut self, file_path: &Path) -> &HashMap<String, Node> {
        if !self.function_definition_cache.contains_key(file_path) {
            let definitions = self
                .get_program(file_path)
                .map(scan_function_definitions)
                .unwrap_or_default();
            self.function_definition_cache
                .insert(file_path.to_path_buf(), definitions);
        }
        &self.function_definition_cache[file_path]
    }

    /// Resolve a relative import against the importing file: sibling
    /// directory join plus the `.js` extension, normalised.
    pub fn resolve_path(file_path: &Path, relative_path: &str) -> PathBuf {
        let dir = file_path.parent().unwrap_or_else(|| Path::new(""));
        normalize(&dir.join(format!("{}.js", relative_path)))
    }

    /// A function defined under `identifier` in the given file, if any.
    pub fn try_match_function(&mut self, file_path: &Path, identifier: &str) -> Option<Function> {
        let node = self.get_function_definitions(file_path).get(identifier)?;
        Some(Function {
            file_path: file_path.to_path_buf(),
            identifier: Some(identifier.to_string()),
            node: node.clone(),
            caller: None,
        })
    }

    /// Follow `module_name` through the file's imports and look the
    /// identifier up in the resolved file. Any miss is a no-match.
    pub fn try_fetch_function(
        &mut self,
        file_path: &Path,
        module_name: &str,
        identifier: &str,
    ) -> Option<Function> {
        let relative = self.get_imports(file_path).get(module_name)?.clone();
        let next_file = FileExtractor::resolve_path(file_path, &relative);
        let mut function = self.try_match_function(&next_file, identifier)?;
        function.caller = Some(format!("{}.{}", module_name, identifier));
        Some(function)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            FileExtractor::resolve_path(Path::new("/srv/app/index.js"), "./routes"),
            PathBuf::from("/srv/app/routes.js")
        );
        assert_eq!(
            FileExtractor::resolve_path(Path::new("/srv/app/index.js"), "../lib/util"),
            PathBuf::from("/srv/lib/util.js")
        );
    }

    #[test]
    fn test_import_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.js");
        fs::write(
            &path,
            "var helpers = require('./helpers');\nvar fs = require('fs');\nvar x = helpers;\n",
        )
        .unwrap();

        let mut extractor = FileExtractor::new();
        let imports = extractor.get_imports(&path);
        assert_eq!(imports.get("helpers").map(String::as_str), Some("./helpers"));
        // bare module names are not followed
        assert!(!imports.contains_key("fs"));
    }

    #[test]
    fn test_function_definition_patterns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.js");
        fs::write(
            &path,
            "function alpha() {}\n\
             var beta = function() {};\n\
             var gamma = function() {}, delta = function() {};\n\
             exports.epsilon = function() {};\n\
             something[dynamic] = function() {};\n",
        )
        .unwrap();

        let mut extractor = FileExtractor::new();
        let definitions = extractor.get_function_definitions(&path);
        assert!(definitions.contains_key("alpha"));
        assert!(definitions.contains_key("beta"));
        assert!(definitions.contains_key("gamma"));
        assert!(definitions.contains_key("delta"));
        assert!(definitions.contains_key("epsilon"));
        // a computed target has no resolved last token
        assert_eq!(definitions.len(), 5);
    }

    #[test]
    fn test_try_match_function() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lib.js");
        fs::write(&path, "function known() {}\n").unwrap();

        let mut extractor = FileExtractor::new();
        let function = extractor.try_match_function(&path, "known").unwrap();
        assert_eq!(function.identifier.as_deref(), Some("known"));
        assert!(function.caller.is_none());
        assert!(extractor.try_match_function(&path, "unknown").is_none());
    }

    #[test]
    fn test_try_fetch_function_across_files() {
        let dir = tempdir().unwrap();
        let index = dir.path().join("index.js");
        let helpers = dir.path().join("helpers.js");
        fs::write(&index, "var helpers = require('./helpers');\n").unwrap();
        fs::write(&helpers, "function run() { return 1; }\n").unwrap();

        let mut extractor = FileExtractor::new();
        let function = extractor.try_fetch_function(&index, "helpers", "run").unwrap();
        assert_eq!(function.caller.as_deref(), Some("helpers.run"));
        assert_eq!(function.file_path, helpers);

        assert!(extractor.try_fetch_function(&index, "missing", "run").is_none());
        assert!(extractor.try_fetch_function(&index, "helpers", "absent").is_none());
    }

    #[test]
    fn test_missing_file_is_no_match() {
        let mut extractor = FileExtractor::new();
        assert!(
            extractor
                .try_match_function(Path::new("/does/not/exist.js"), "anything")
                .is_none()
        );
    }
}
