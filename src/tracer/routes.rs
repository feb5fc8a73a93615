//! Route discovery.
//!
//! Scans a program for routing calls shaped like `app.get(pattern, cb…)`
//! for the HTTP verbs, and collects each call site's entry callbacks:
//! inline function expressions stay anonymous, `module.fn` references are
//! resolved through the file's imports.

use std::path::Path;

use crate::core::model::Kind;
use crate::core::nsp;
use crate::tracer::entities::{Function, Method, Route};
use crate::tracer::extractor::FileExtractor;

#[derive(Debug, Default)]
pub struct RouteFinder {
    extractor: FileExtractor,
}

impl RouteFinder {
    pub fn new() -> RouteFinder {
        RouteFinder::default()
    }

    /// All routes defined in the given file, in discovery order.
    pub fn fetch_routes(&mut self, file_path: &Path) -> Vec<Route> {
        let Some(program) = self.extractor.get_program(file_path) else {
            return Vec::new();
        };
        let program = program.clone();

        let mut routes = Vec::new();
        for node in program.traverse() {
            if node.kind() != Kind::CallExpression {
                continue;
            }
            let Some(method) = Method::ALL.into_iter().find(|method| {
                nsp::match_name_space(node, &["*", &format!("*{}", method.as_str())])
            }) else {
                continue;
            };

            let arguments = node.list("arguments");
            let Some(pattern) = arguments
                .first()
                .and_then(|argument| nsp::try_extract_string_value(argument))
            else {
                continue;
            };

            let mut entry_point_functions = Vec::new();
            for argument in arguments.iter().skip(1) {
                match argument.kind() {
                    Kind::FunctionExpression => entry_point_functions.push(Function {
                        file_path: file_path.to_path_buf(),
                        identifier: argument
                            .child("id")
                            .and_then(|id| id.str_field("name"))
                            .map(str::to_owned),
                        node: (*argument).clone(),
                        caller: None,
                    }),
                    Kind::MemberExpression if !argument.bool_field("computed") => {
                        let object = argument.child("object");
                        let property = argument.child("property");
                        if let (Some(object), Some(property)) = (object, property) {
                            if object.kind() == Kind::Identifier
                                && property.kind() == Kind::Identifier
                            {
                                let module = object.str_field("name").unwrap_or_default();
                                let name = property.str_field("name").unwrap_or_default();
                                if let Some(function) =
                                    self.extractor.try_fetch_function(file_path, module, name)
                                {
                                    entry_point_functions.push(function);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }

            routes.push(Route {
                pattern,
                method,
                entry_point_functions,
            });
        }
        routes
    }
}
