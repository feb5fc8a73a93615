//! JavaScript parsing.
//!
//! Wraps `swc_ecma_parser` and lowers its AST into the ESTree JSON shape the
//! node model consumes: `type`-tagged objects with child fields in source
//! order and `loc.start/end.{line,column}` attached from the source map.
//!
//! Constructs outside the modelled ESTree surface (TypeScript-only syntax and
//! the like) lower to an `UnsupportedExpression`/`UnsupportedStatement` tag,
//! which the model rejects at realisation time; the file is then recorded as
//! skipped rather than silently mis-analysed.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Number, Value, json};
use swc_common::{FileName, SourceMap, Span, Spanned};
use swc_ecma_ast as ast;
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};

/// The file could not be parsed as JavaScript.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error: {}", self.message)
    }
}

impl std::error::Error for SyntaxError {}

static SHEBANG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#!([^\r\n]+)").unwrap());

/// Trim a shebang such as `#!/usr/bin/env node` at the start of the buffer.
/// The newline stays so line numbers are unaffected.
pub fn clean_code(source: &str) -> String {
    SHEBANG_REGEX.replace(source, "").into_owned()
}

/// Parse UTF-8 source text into an ESTree JSON program.
///
/// Recovered errors count as failures: a file either parses cleanly or is
/// skipped.
pub fn parse(source: &str) -> Result<Value, SyntaxError> {
    let code = clean_code(source);
    let source_map = SourceMap::default();
    let source_file = source_map.new_source_file(FileName::Anon.into(), code);

    let syntax = Syntax::Es(EsSyntax::default());
    let mut parser = Parser::new(syntax, StringInput::from(&*source_file), None);
    let program = parser.parse_program().map_err(|err| SyntaxError {
        message: format!("{:?}", err.kind()),
    })?;

    let errors = parser.take_errors();
    if let Some(err) = errors.first() {
        return Err(SyntaxError {
            message: format!("{:?}", err.kind()),
        });
    }

    Ok(Lower { source_map: &source_map }.program(&program))
}

struct Lower<'a> {
    source_map: &'a SourceMap,
}

impl Lower<'_> {
    fn loc(&self, span: Span) -> Value {
        let start = self.source_map.lookup_char_pos(span.lo);
        let end = self.source_map.lookup_char_pos(span.hi);
        json!({
            "start": {"line": start.line, "column": start.col_display},
            "end": {"line": end.line, "column": end.col_display},
        })
    }

    fn node(&self, span: Span, kind: &str, fields: Vec<(&'static str, Value)>) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(kind.into()));
        for (name, value) in fields {
            map.insert(name.into(), value);
        }
        if !span.is_dummy() {
            map.insert("loc".into(), self.loc(span));
        }
        Value::Object(map)
    }

    fn identifier(&self, span: Span, name: &str) -> Value {
        self.node(span, "Identifier", vec![("name", json!(name))])
    }

    fn program(&self, program: &ast::Program) -> Value {
        match program {
            ast::Program::Module(module) => {
                let body: Vec<Value> = module.body.iter().map(|item| self.module_item(item)).collect();
                self.node(
                    module.span,
                    "Program",
                    vec![("body", Value::Array(body)), ("sourceType", json!("module"))],
                )
            }
            ast::Program::Script(script) => {
                let body: Vec<Value> = script.body.iter().map(|stmt| self.stmt(stmt)).collect();
                self.node(
                    script.span,
                    "Program",
                    vec![("body", Value::Array(body)), ("sourceType", json!("script"))],
                )
            }
        }
    }

    fn module_item(&self, item: &ast::ModuleItem) -> Value {
        match item {
            ast::ModuleItem::Stmt(stmt) => self.stmt(stmt),
            ast::ModuleItem::ModuleDecl(decl) => self.module_decl(decl),
        }
    }

    fn module_decl(&self, decl: &ast::ModuleDecl) -> Value {
        use ast::ModuleDecl::*;
        match decl {
            Import(import) => {
                let specifiers: Vec<Value> = import
                    .specifiers
                    .iter()
                    .map(|spec| self.import_specifier(spec))
                    .collect();
                self.node(
                    import.span,
                    "ImportDeclaration",
                    vec![
                        ("specifiers", Value::Array(specifiers)),
                        ("source", self.str_lit(&import.src)),
                    ],
                )
            }
            ExportDecl(export) => self.node(
                export.span,
                "ExportNamedDeclaration",
                vec![
                    ("declaration", self.decl(&export.decl)),
                    ("specifiers", json!([])),
                    ("source", Value::Null),
                ],
            ),
            ExportNamed(export) => {
                let specifiers: Vec<Value> = export
                    .specifiers
                    .iter()
                    .filter_map(|spec| self.export_specifier(spec))
                    .collect();
                self.node(
                    export.span,
                    "ExportNamedDeclaration",
                    vec![
                        ("declaration", Value::Null),
                        ("specifiers", Value::Array(specifiers)),
                        (
                            "source",
                            export.src.as_deref().map_or(Value::Null, |s| self.str_lit(s)),
                        ),
                    ],
                )
            }
            ExportDefaultDecl(export) => {
                let declaration = match &export.decl {
                    ast::DefaultDecl::Fn(f) => self.fn_expr(f),
                    ast::DefaultDecl::Class(c) => self.class_expr(c),
                    ast::DefaultDecl::TsInterfaceDecl(_) => self.unsupported_stmt(export.span),
                };
                self.node(
                    export.span,
                    "ExportDefaultDeclaration",
                    vec![("declaration", declaration)],
                )
            }
            ExportDefaultExpr(export) => self.node(
                export.span,
                "ExportDefaultDeclaration",
                vec![("declaration", self.expr(&export.expr))],
            ),
            ExportAll(export) => self.node(
                export.span,
                "ExportAllDeclaration",
                vec![("source", self.str_lit(&export.src))],
            ),
            TsImportEquals(_) | TsExportAssignment(_) | TsNamespaceExport(_) => {
                self.unsupported_stmt(decl.span())
            }
        }
    }

    fn import_specifier(&self, spec: &ast::ImportSpecifier) -> Value {
        match spec {
            ast::ImportSpecifier::Named(named) => {
                let imported = match &named.imported {
                    Some(name) => self.module_export_name(name),
                    None => self.ident(&named.local),
                };
                self.node(
                    named.span,
                    "ImportSpecifier",
                    vec![("local", self.ident(&named.local)), ("imported", imported)],
                )
            }
            ast::ImportSpecifier::Default(default) => self.node(
                default.span,
                "ImportDefaultSpecifier",
                vec![("local", self.ident(&default.local))],
            ),
            ast::ImportSpecifier::Namespace(star) => self.node(
                star.span,
                "ImportNamespaceSpecifier",
                vec![("local", self.ident(&star.local))],
            ),
        }
    }

    fn export_specifier(&self, spec: &ast::ExportSpecifier) -> Option<Value> {
        match spec {
            ast::ExportSpecifier::Named(named) => {
                let local = self.module_export_name(&named.orig);
                let exported = match &named.exported {
                    Some(name) => self.module_export_name(name),
                    None => local.clone(),
                };
                Some(self.node(
                    named.span,
                    "ExportSpecifier",
                    vec![("exported", exported), ("local", local)],
                ))
            }
            ast::ExportSpecifier::Default(_) | ast::ExportSpecifier::Namespace(_) => None,
        }
    }

    fn module_export_name(&self, name: &ast::ModuleExportName) -> Value {
        match name {
            ast::ModuleExportName::Ident(ident) => self.ident(ident),
            ast::ModuleExportName::Str(s) => self.str_lit(s),
        }
    }

    fn stmt(&self, stmt: &ast::Stmt) -> Value {
        use ast::Stmt::*;
        match stmt {
            Block(block) => self.block(block),
            Empty(empty) => self.node(empty.span, "EmptyStatement", vec![]),
            Debugger(debugger) => self.node(debugger.span, "DebuggerStatement", vec![]),
            With(with) => self.node(
                with.span,
                "WithStatement",
                vec![("object", self.expr(&with.obj)), ("body", self.stmt(&with.body))],
            ),
            Return(ret) => self.node(
                ret.span,
                "ReturnStatement",
                vec![("argument", self.opt_expr(ret.arg.as_deref()))],
            ),
            Labeled(labeled) => self.node(
                labeled.span,
                "LabeledStatement",
                vec![
                    ("label", self.ident(&labeled.label)),
                    ("body", self.stmt(&labeled.body)),
                ],
            ),
            Break(brk) => self.node(
                brk.span,
                "BreakStatement",
                vec![("label", brk.label.as_ref().map_or(Value::Null, |l| self.ident(l)))],
            ),
            Continue(cont) => self.node(
                cont.span,
                "ContinueStatement",
                vec![("label", cont.label.as_ref().map_or(Value::Null, |l| self.ident(l)))],
            ),
            If(ifs) => self.node(
                ifs.span,
                "IfStatement",
                vec![
                    ("test", self.expr(&ifs.test)),
                    ("consequent", self.stmt(&ifs.cons)),
                    ("alternate", ifs.alt.as_deref().map_or(Value::Null, |s| self.stmt(s))),
                ],
            ),
            Switch(switch) => {
                let cases: Vec<Value> = switch
                    .cases
                    .iter()
                    .map(|case| {
                        let consequent: Vec<Value> =
                            case.cons.iter().map(|s| self.stmt(s)).collect();
                        self.node(
                            case.span,
                            "SwitchCase",
                            vec![
                                ("test", self.opt_expr(case.test.as_deref())),
                                ("consequent", Value::Array(consequent)),
                            ],
                        )
                    })
                    .collect();
                self.node(
                    switch.span,
                    "SwitchStatement",
                    vec![
                        ("discriminant", self.expr(&switch.discriminant)),
                        ("cases", Value::Array(cases)),
                    ],
                )
            }
            Throw(throw) => self.node(
                throw.span,
                "ThrowStatement",
                vec![("argument", self.expr(&throw.arg))],
            ),
            Try(tried) => {
                let handler = tried.handler.as_ref().map_or(Value::Null, |handler| {
                    self.node(
                        handler.span,
                        "CatchClause",
                        vec![
                            (
                                "param",
                                handler.param.as_ref().map_or(Value::Null, |p| self.pat(p)),
                            ),
                            ("body", self.block(&handler.body)),
                        ],
                    )
                });
                self.node(
                    tried.span,
                    "TryStatement",
                    vec![
                        ("block", self.block(&tried.block)),
                        ("handler", handler),
                        (
                            "finalizer",
                            tried.finalizer.as_ref().map_or(Value::Null, |b| self.block(b)),
                        ),
                    ],
                )
            }
            While(whiles) => self.node(
                whiles.span,
                "WhileStatement",
                vec![
                    ("test", self.expr(&whiles.test)),
                    ("body", self.stmt(&whiles.body)),
                ],
            ),
            DoWhile(dos) => self.node(
                dos.span,
                "DoWhileStatement",
                vec![("body", self.stmt(&dos.body)), ("test", self.expr(&dos.test))],
            ),
            For(fors) => {
                let init = match &fors.init {
                    Some(ast::VarDeclOrExpr::VarDecl(decl)) => self.var_decl(decl),
                    Some(ast::VarDeclOrExpr::Expr(expr)) => self.expr(expr),
                    None => Value::Null,
                };
                self.node(
                    fors.span,
                    "ForStatement",
                    vec![
                        ("init", init),
                        ("test", self.opt_expr(fors.test.as_deref())),
                        ("update", self.opt_expr(fors.update.as_deref())),
                        ("body", self.stmt(&fors.body)),
                    ],
                )
            }
            ForIn(forin) => self.node(
                forin.span,
                "ForInStatement",
                vec![
                    ("left", self.for_head(&forin.left)),
                    ("right", self.expr(&forin.right)),
                    ("body", self.stmt(&forin.body)),
                ],
            ),
            ForOf(forof) => self.node(
                forof.span,
                "ForOfStatement",
                vec![
                    ("left", self.for_head(&forof.left)),
                    ("right", self.expr(&forof.right)),
                    ("body", self.stmt(&forof.body)),
                ],
            ),
            Decl(decl) => self.decl(decl),
            Expr(expr_stmt) => self.node(
                expr_stmt.span,
                "ExpressionStatement",
                vec![("expression", self.expr(&expr_stmt.expr))],
            ),
        }
    }

    fn for_head(&self, head: &ast::ForHead) -> Value {
        match head {
            ast::ForHead::VarDecl(decl) => self.var_decl(decl),
            ast::ForHead::Pat(pat) => self.pat(pat),
            ast::ForHead::UsingDecl(using) => self.unsupported_stmt(using.span),
        }
    }

    fn decl(&self, decl: &ast::Decl) -> Value {
        match decl {
            ast::Decl::Fn(fn_decl) => self.function(
                fn_decl.function.span,
                "FunctionDeclaration",
                Some(&fn_decl.ident),
                &fn_decl.function,
            ),
            ast::Decl::Class(class_decl) => {
                self.class(class_decl.class.span, "ClassDeclaration", Some(&class_decl.ident), &class_decl.class)
            }
            ast::Decl::Var(var) => self.var_decl(var),
            other => self.unsupported_stmt(other.span()),
        }
    }

    fn var_decl(&self, var: &ast::VarDecl) -> Value {
        let kind = match var.kind {
            ast::VarDeclKind::Var => "var",
            ast::VarDeclKind::Let => "let",
            ast::VarDeclKind::Const => "const",
        };
        let declarations: Vec<Value> = var
            .decls
            .iter()
            .map(|decl| {
                self.node(
                    decl.span,
                    "VariableDeclarator",
                    vec![
                        ("id", self.pat(&decl.name)),
                        ("init", self.opt_expr(decl.init.as_deref())),
                    ],
                )
            })
            .collect();
        self.node(
            var.span,
            "VariableDeclaration",
            vec![("declarations", Value::Array(declarations)), ("kind", json!(kind))],
        )
    }

    fn block(&self, block: &ast::BlockStmt) -> Value {
        let body: Vec<Value> = block.stmts.iter().map(|stmt| self.stmt(stmt)).collect();
        self.node(block.span, "BlockStatement", vec![("body", Value::Array(body))])
    }

    fn opt_expr(&self, expr: Option<&ast::Expr>) -> Value {
        expr.map_or(Value::Null, |e| self.expr(e))
    }

    fn expr(&self, expr: &ast::Expr) -> Value {
        use ast::Expr::*;
        match expr {
            This(this) => self.node(this.span, "ThisExpression", vec![]),
            Array(array) => {
                let elements: Vec<Value> = array
                    .elems
                    .iter()
                    .map(|element| match element {
                        Some(item) => self.expr_or_spread(item),
                        None => Value::Null,
                    })
                    .collect();
                self.node(array.span, "ArrayExpression", vec![("elements", Value::Array(elements))])
            }
            Object(object) => self.object_lit(object),
            Fn(fn_expr) => self.fn_expr(fn_expr),
            Unary(unary) => self.node(
                unary.span,
                "UnaryExpression",
                vec![
                    ("operator", json!(unary.op.as_str())),
                    ("prefix", json!(true)),
                    ("argument", self.expr(&unary.arg)),
                ],
            ),
            Update(update) => self.node(
                update.span,
                "UpdateExpression",
                vec![
                    ("operator", json!(update.op.as_str())),
                    ("prefix", json!(update.prefix)),
                    ("argument", self.expr(&update.arg)),
                ],
            ),
            Bin(bin) => {
                let kind = match bin.op {
                    ast::BinaryOp::LogicalAnd
                    | ast::BinaryOp::LogicalOr
                    | ast::BinaryOp::NullishCoalescing => "LogicalExpression",
                    _ => "BinaryExpression",
                };
                self.node(
                    bin.span,
                    kind,
                    vec![
                        ("operator", json!(bin.op.as_str())),
                        ("left", self.expr(&bin.left)),
                        ("right", self.expr(&bin.right)),
                    ],
                )
            }
            Assign(assign) => self.node(
                assign.span,
                "AssignmentExpression",
                vec![
                    ("operator", json!(assign.op.as_str())),
                    ("left", self.assign_target(&assign.left)),
                    ("right", self.expr(&assign.right)),
                ],
            ),
            Member(member) => self.member(member),
            SuperProp(super_prop) => {
                let (computed, property) = match &super_prop.prop {
                    ast::SuperProp::Ident(ident) => (false, self.ident_name(ident)),
                    ast::SuperProp::Computed(computed) => (true, self.expr(&computed.expr)),
                };
                self.node(
                    super_prop.span,
                    "MemberExpression",
                    vec![
                        ("computed", json!(computed)),
                        ("object", self.node(super_prop.obj.span, "Super", vec![])),
                        ("property", property),
                    ],
                )
            }
            Cond(cond) => self.node(
                cond.span,
                "ConditionalExpression",
                vec![
                    ("test", self.expr(&cond.test)),
                    ("consequent", self.expr(&cond.cons)),
                    ("alternate", self.expr(&cond.alt)),
                ],
            ),
            Call(call) => {
                let callee = match &call.callee {
                    ast::Callee::Expr(callee) => self.expr(callee),
                    ast::Callee::Super(sup) => self.node(sup.span, "Super", vec![]),
                    ast::Callee::Import(import) => self.identifier(import.span, "import"),
                };
                self.node(
                    call.span,
                    "CallExpression",
                    vec![("callee", callee), ("arguments", self.arguments(&call.args))],
                )
            }
            New(new) => {
                let arguments = new
                    .args
                    .as_ref()
                    .map_or_else(|| json!([]), |args| self.arguments(args));
                self.node(
                    new.span,
                    "NewExpression",
                    vec![("callee", self.expr(&new.callee)), ("arguments", arguments)],
                )
            }
            Seq(seq) => {
                let expressions: Vec<Value> = seq.exprs.iter().map(|e| self.expr(e)).collect();
                self.node(
                    seq.span,
                    "SequenceExpression",
                    vec![("expressions", Value::Array(expressions))],
                )
            }
            Ident(ident) => self.ident(ident),
            Lit(lit) => self.lit(lit),
            Tpl(tpl) => self.template(tpl),
            TaggedTpl(tagged) => self.node(
                tagged.span,
                "TaggedTemplateExpression",
                vec![("tag", self.expr(&tagged.tag)), ("quasi", self.template(&tagged.tpl))],
            ),
            Arrow(arrow) => self.arrow(arrow),
            Class(class_expr) => self.class_expr(class_expr),
            Yield(yields) => self.node(
                yields.span,
                "YieldExpression",
                vec![
                    ("argument", self.opt_expr(yields.arg.as_deref())),
                    ("delegate", json!(yields.delegate)),
                ],
            ),
            MetaProp(meta) => {
                let (meta_name, prop_name) = match meta.kind {
                    ast::MetaPropKind::NewTarget => ("new", "target"),
                    ast::MetaPropKind::ImportMeta => ("import", "meta"),
                };
                self.node(
                    meta.span,
                    "MetaProperty",
                    vec![
                        ("meta", self.identifier(meta.span, meta_name)),
                        ("property", self.identifier(meta.span, prop_name)),
                    ],
                )
            }
            Await(awaits) => self.node(
                awaits.span,
                "AwaitExpression",
                vec![("argument", self.expr(&awaits.arg))],
            ),
            Paren(paren) => self.expr(&paren.expr),
            PrivateName(name) => self.node(
                name.span,
                "PrivateIdentifier",
                vec![("name", json!(name.name.as_str()))],
            ),
            // `a?.b` and `a?.()` lower to plain member/call nodes, without
            // the ChainExpression wrapper.
            OptChain(chain) => match &*chain.base {
                ast::OptChainBase::Member(member) => self.member(member),
                ast::OptChainBase::Call(call) => self.node(
                    call.span,
                    "CallExpression",
                    vec![
                        ("callee", self.expr(&call.callee)),
                        ("arguments", self.arguments(&call.args)),
                    ],
                ),
            },
            other => self.unsupported_expr(other.span()),
        }
    }

    fn arguments(&self, args: &[ast::ExprOrSpread]) -> Value {
        Value::Array(args.iter().map(|arg| self.expr_or_spread(arg)).collect())
    }

    fn expr_or_spread(&self, arg: &ast::ExprOrSpread) -> Value {
        match arg.spread {
            Some(spread_span) => self.node(
                spread_span,
                "SpreadElement",
                vec![("argument", self.expr(&arg.expr))],
            ),
            None => self.expr(&arg.expr),
        }
    }

    fn member(&self, member: &ast::MemberExpr) -> Value {
        let (computed, property) = match &member.prop {
            ast::MemberProp::Ident(ident) => (false, self.ident_name(ident)),
            ast::MemberProp::PrivateName(name) => (
                false,
                self.node(name.span, "PrivateIdentifier", vec![("name", json!(name.name.as_str()))]),
            ),
            ast::MemberProp::Computed(computed) => (true, self.expr(&computed.expr)),
        };
        self.node(
            member.span,
            "MemberExpression",
            vec![
                ("computed", json!(computed)),
                ("object", self.expr(&member.obj)),
                ("property", property),
            ],
        )
    }

    fn assign_target(&self, target: &ast::AssignTarget) -> Value {
        match target {
            ast::AssignTarget::Simple(simple) => match simple {
                ast::SimpleAssignTarget::Ident(ident) => self.ident(&ident.id),
                ast::SimpleAssignTarget::Member(member) => self.member(member),
                ast::SimpleAssignTarget::Paren(paren) => self.expr(&paren.expr),
                other => self.unsupported_expr(other.span()),
            },
            ast::AssignTarget::Pat(pat) => match pat {
                ast::AssignTargetPat::Array(array) => self.array_pat(array),
                ast::AssignTargetPat::Object(object) => self.object_pat(object),
                ast::AssignTargetPat::Invalid(invalid) => self.unsupported_expr(invalid.span),
            },
        }
    }

    fn object_lit(&self, object: &ast::ObjectLit) -> Value {
        let properties: Vec<Value> = object
            .props
            .iter()
            .map(|prop| match prop {
                ast::PropOrSpread::Spread(spread) => self.node(
                    spread.dot3_token,
                    "SpreadElement",
                    vec![("argument", self.expr(&spread.expr))],
                ),
                ast::PropOrSpread::Prop(prop) => self.prop(prop),
            })
            .collect();
        self.node(
            object.span,
            "ObjectExpression",
            vec![("properties", Value::Array(properties))],
        )
    }

    fn prop(&self, prop: &ast::Prop) -> Value {
        match prop {
            ast::Prop::Shorthand(ident) => self.property(
                ident.span,
                false,
                self.ident(ident),
                self.ident(ident),
                "init",
                false,
                true,
            ),
            ast::Prop::KeyValue(kv) => {
                let (computed, key) = self.prop_name(&kv.key);
                self.property(kv.key.span(), computed, key, self.expr(&kv.value), "init", false, false)
            }
            ast::Prop::Assign(assign) => {
                let key = self.ident(&assign.key);
                let value = self.node(
                    assign.key.span,
                    "AssignmentPattern",
                    vec![("left", self.ident(&assign.key)), ("right", self.expr(&assign.value))],
                );
                self.property(assign.key.span, false, key, value, "init", false, true)
            }
            ast::Prop::Getter(getter) => {
                let (computed, key) = self.prop_name(&getter.key);
                let value = self.synthetic_function(getter.span, vec![], getter.body.as_ref());
                self.property(getter.span, computed, key, value, "get", false, false)
            }
            ast::Prop::Setter(setter) => {
                let (computed, key) = self.prop_name(&setter.key);
                let value =
                    self.synthetic_function(setter.span, vec![self.pat(&setter.param)], setter.body.as_ref());
                self.property(setter.span, computed, key, value, "set", false, false)
            }
            ast::Prop::Method(method) => {
                let (computed, key) = self.prop_name(&method.key);
                let value = self.function(method.function.span, "FunctionExpression", None, &method.function);
                self.property(method.key.span(), computed, key, value, "init", true, false)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn property(
        &self,
        span: Span,
        computed: bool,
        key: Value,
        value: Value,
        kind: &str,
        method: bool,
        shorthand: bool,
    ) -> Value {
        self.node(
            span,
            "Property",
            vec![
                ("key", key),
                ("computed", json!(computed)),
                ("value", value),
                ("kind", json!(kind)),
                ("method", json!(method)),
                ("shorthand", json!(shorthand)),
            ],
        )
    }

    fn prop_name(&self, name: &ast::PropName) -> (bool, Value) {
        match name {
            ast::PropName::Ident(ident) => (false, self.ident_name(ident)),
            ast::PropName::Str(s) => (false, self.str_lit(s)),
            ast::PropName::Num(n) => (false, self.num_lit(n)),
            ast::PropName::BigInt(b) => (false, self.bigint_lit(b)),
            ast::PropName::Computed(computed) => (true, self.expr(&computed.expr)),
        }
    }

    fn synthetic_function(&self, span: Span, params: Vec<Value>, body: Option<&ast::BlockStmt>) -> Value {
        self.node(
            span,
            "FunctionExpression",
            vec![
                ("id", Value::Null),
                ("params", Value::Array(params)),
                ("body", body.map_or(Value::Null, |b| self.block(b))),
                ("generator", json!(false)),
                ("expression", json!(false)),
                ("async", json!(false)),
            ],
        )
    }

    fn function(
        &self,
        span: Span,
        kind: &str,
        ident: Option<&ast::Ident>,
        function: &ast::Function,
    ) -> Value {
        let params: Vec<Value> = function.params.iter().map(|param| self.pat(&param.pat)).collect();
        self.node(
            span,
            kind,
            vec![
                ("id", ident.map_or(Value::Null, |i| self.ident(i))),
                ("params", Value::Array(params)),
                (
                    "body",
                    function.body.as_ref().map_or(Value::Null, |b| self.block(b)),
                ),
                ("generator", json!(function.is_generator)),
                ("expression", json!(false)),
                ("async", json!(function.is_async)),
            ],
        )
    }

    fn fn_expr(&self, fn_expr: &ast::FnExpr) -> Value {
        self.function(
            fn_expr.function.span,
            "FunctionExpression",
            fn_expr.ident.as_ref(),
            &fn_expr.function,
        )
    }

    fn arrow(&self, arrow: &ast::ArrowExpr) -> Value {
        let params: Vec<Value> = arrow.params.iter().map(|pat| self.pat(pat)).collect();
        let (body, is_expression) = match &*arrow.body {
            ast::BlockStmtOrExpr::BlockStmt(block) => (self.block(block), false),
            ast::BlockStmtOrExpr::Expr(expr) => (self.expr(expr), true),
        };
        self.node(
            arrow.span,
            "ArrowFunctionExpression",
            vec![
                ("id", Value::Null),
                ("params", Value::Array(params)),
                ("body", body),
                ("generator", json!(arrow.is_generator)),
                ("expression", json!(is_expression)),
                ("async", json!(arrow.is_async)),
            ],
        )
    }

    fn class_expr(&self, class_expr: &ast::ClassExpr) -> Value {
        self.class(
            class_expr.class.span,
            "ClassExpression",
            class_expr.ident.as_ref(),
            &class_expr.class,
        )
    }

    fn class(&self, span: Span, kind: &str, ident: Option<&ast::Ident>, class: &ast::Class) -> Value {
        let body: Vec<Value> = class
            .body
            .iter()
            .filter_map(|member| self.class_member(member))
            .collect();
        self.node(
            span,
            kind,
            vec![
                ("id", ident.map_or(Value::Null, |i| self.ident(i))),
                (
                    "superClass",
                    class.super_class.as_deref().map_or(Value::Null, |e| self.expr(e)),
                ),
                (
                    "body",
                    self.node(span, "ClassBody", vec![("body", Value::Array(body))]),
                ),
            ],
        )
    }

    fn class_member(&self, member: &ast::ClassMember) -> Option<Value> {
        match member {
            ast::ClassMember::Constructor(ctor) => {
                let params: Vec<Value> = ctor
                    .params
                    .iter()
                    .filter_map(|param| match param {
                        ast::ParamOrTsParamProp::Param(param) => Some(self.pat(&param.pat)),
                        ast::ParamOrTsParamProp::TsParamProp(_) => None,
                    })
                    .collect();
                let (computed, key) = self.prop_name(&ctor.key);
                let value = self.node(
                    ctor.span,
                    "FunctionExpression",
                    vec![
                        ("id", Value::Null),
                        ("params", Value::Array(params)),
                        ("body", ctor.body.as_ref().map_or(Value::Null, |b| self.block(b))),
                        ("generator", json!(false)),
                        ("expression", json!(false)),
                        ("async", json!(false)),
                    ],
                );
                Some(self.method_definition(ctor.span, computed, key, value, "constructor", false))
            }
            ast::ClassMember::Method(method) => {
                let (computed, key) = self.prop_name(&method.key);
                let kind = match method.kind {
                    ast::MethodKind::Method => "method",
                    ast::MethodKind::Getter => "get",
                    ast::MethodKind::Setter => "set",
                };
                let value = self.function(method.function.span, "FunctionExpression", None, &method.function);
                Some(self.method_definition(method.span, computed, key, value, kind, method.is_static))
            }
            ast::ClassMember::PrivateMethod(method) => {
                let key = self.node(
                    method.key.span,
                    "PrivateIdentifier",
                    vec![("name", json!(method.key.name.as_str()))],
                );
                let kind = match method.kind {
                    ast::MethodKind::Method => "method",
                    ast::MethodKind::Getter => "get",
                    ast::MethodKind::Setter => "set",
                };
                let value = self.function(method.function.span, "FunctionExpression", None, &method.function);
                Some(self.method_definition(method.span, false, key, value, kind, method.is_static))
            }
            ast::ClassMember::ClassProp(prop) => {
                let (computed, key) = self.prop_name(&prop.key);
                Some(self.node(
                    prop.span,
                    "PropertyDefinition",
                    vec![
                        ("key", key),
                        ("computed", json!(computed)),
                        ("value", self.opt_expr(prop.value.as_deref())),
                        ("static", json!(prop.is_static)),
                    ],
                ))
            }
            ast::ClassMember::PrivateProp(prop) => {
                let key = self.node(
                    prop.key.span,
                    "PrivateIdentifier",
                    vec![("name", json!(prop.key.name.as_str()))],
                );
                Some(self.node(
                    prop.span,
                    "PropertyDefinition",
                    vec![
                        ("key", key),
                        ("computed", json!(false)),
                        ("value", self.opt_expr(prop.value.as_deref())),
                        ("static", json!(prop.is_static)),
                    ],
                ))
            }
            ast::ClassMember::StaticBlock(block) => {
                let body: Vec<Value> = block.body.stmts.iter().map(|stmt| self.stmt(stmt)).collect();
                Some(self.node(block.span, "StaticBlock", vec![("body", Value::Array(body))]))
            }
            ast::ClassMember::Empty(_) | ast::ClassMember::AutoAccessor(_) => None,
            ast::ClassMember::TsIndexSignature(_) => None,
        }
    }

    fn method_definition(
        &self,
        span: Span,
        computed: bool,
        key: Value,
        value: Value,
        kind: &str,
        is_static: bool,
    ) -> Value {
        self.node(
            span,
            "MethodDefinition",
            vec![
                ("key", key),
                ("computed", json!(computed)),
                ("value", value),
                ("kind", json!(kind)),
                ("static", json!(is_static)),
            ],
        )
    }

    fn pat(&self, pat: &ast::Pat) -> Value {
        match pat {
            ast::Pat::Ident(binding) => self.ident(&binding.id),
            ast::Pat::Array(array) => self.array_pat(array),
            ast::Pat::Rest(rest) => self.node(
                rest.span,
                "RestElement",
                vec![("argument", self.pat(&rest.arg))],
            ),
            ast::Pat::Object(object) => self.object_pat(object),
            ast::Pat::Assign(assign) => self.node(
                assign.span,
                "AssignmentPattern",
                vec![("left", self.pat(&assign.left)), ("right", self.expr(&assign.right))],
            ),
            ast::Pat::Expr(expr) => self.expr(expr),
            ast::Pat::Invalid(invalid) => self.unsupported_expr(invalid.span),
        }
    }

    fn array_pat(&self, array: &ast::ArrayPat) -> Value {
        let elements: Vec<Value> = array
            .elems
            .iter()
            .map(|element| element.as_ref().map_or(Value::Null, |p| self.pat(p)))
            .collect();
        self.node(array.span, "ArrayPattern", vec![("elements", Value::Array(elements))])
    }

    fn object_pat(&self, object: &ast::ObjectPat) -> Value {
        let properties: Vec<Value> = object
            .props
            .iter()
            .map(|prop| match prop {
                ast::ObjectPatProp::KeyValue(kv) => {
                    let (computed, key) = self.prop_name(&kv.key);
                    self.property(kv.key.span(), computed, key, self.pat(&kv.value), "init", false, false)
                }
                ast::ObjectPatProp::Assign(assign) => {
                    let key = self.ident(&assign.key.id);
                    let value = match &assign.value {
                        Some(default) => self.node(
                            assign.span,
                            "AssignmentPattern",
                            vec![("left", self.ident(&assign.key.id)), ("right", self.expr(default))],
                        ),
                        None => self.ident(&assign.key.id),
                    };
                    self.property(assign.span, false, key, value, "init", false, true)
                }
                ast::ObjectPatProp::Rest(rest) => self.node(
                    rest.span,
                    "RestElement",
                    vec![("argument", self.pat(&rest.arg))],
                ),
            })
            .collect();
        self.node(
            object.span,
            "ObjectPattern",
            vec![("properties", Value::Array(properties))],
        )
    }

    fn ident(&self, ident: &ast::Ident) -> Value {
        self.node(ident.span, "Identifier", vec![("name", json!(ident.sym.as_str()))])
    }

    fn ident_name(&self, ident: &ast::IdentName) -> Value {
        self.node(ident.span, "Identifier", vec![("name", json!(ident.sym.as_str()))])
    }

    fn lit(&self, lit: &ast::Lit) -> Value {
        match lit {
            ast::Lit::Str(s) => self.str_lit(s),
            ast::Lit::Bool(b) => self.node(
                b.span,
                "Literal",
                vec![
                    ("raw", json!(if b.value { "true" } else { "false" })),
                    ("value", json!(b.value)),
                ],
            ),
            ast::Lit::Null(null) => self.node(
                null.span,
                "Literal",
                vec![("raw", json!("null")), ("value", Value::Null)],
            ),
            ast::Lit::Num(n) => self.num_lit(n),
            ast::Lit::BigInt(b) => self.bigint_lit(b),
            ast::Lit::Regex(regex) => self.node(
                regex.span,
                "Literal",
                vec![
                    ("raw", json!(format!("/{}/{}", regex.exp, regex.flags))),
                    ("value", json!({})),
                    (
                        "regex",
                        json!({"pattern": regex.exp.as_str(), "flags": regex.flags.as_str()}),
                    ),
                ],
            ),
            ast::Lit::JSXText(text) => self.unsupported_expr(text.span),
        }
    }

    fn str_lit(&self, s: &ast::Str) -> Value {
        let value = s.value.as_str().unwrap_or_default().to_string();
        let raw = s
            .raw
            .as_ref()
            .map(|raw| raw.as_str().to_string())
            .unwrap_or_else(|| format!("\"{}\"", value));
        self.node(
            s.span,
            "Literal",
            vec![("raw", json!(raw)), ("value", json!(value))],
        )
    }

    fn num_lit(&self, n: &ast::Number) -> Value {
        let value = if n.value.fract() == 0.0
            && n.value.is_finite()
            && n.value.abs() < i64::MAX as f64
        {
            Value::Number(Number::from(n.value as i64))
        } else {
            Number::from_f64(n.value).map_or(Value::Null, Value::Number)
        };
        let raw = n
            .raw
            .as_ref()
            .map(|raw| raw.as_str().to_string())
            .unwrap_or_else(|| n.value.to_string());
        self.node(n.span, "Literal", vec![("raw", json!(raw)), ("value", value)])
    }

    fn bigint_lit(&self, b: &ast::BigInt) -> Value {
        let raw = b
            .raw
            .as_ref()
            .map(|raw| raw.as_str().to_string())
            .unwrap_or_default();
        self.node(
            b.span,
            "Literal",
            vec![("raw", json!(raw)), ("value", Value::Null)],
        )
    }

    fn template(&self, tpl: &ast::Tpl) -> Value {
        let quasis: Vec<Value> = tpl
            .quasis
            .iter()
            .map(|quasi| {
                let cooked = quasi
                    .cooked
                    .as_ref()
                    .and_then(|cooked| cooked.as_str())
                    .map(Value::from)
                    .unwrap_or(Value::Null);
                self.node(
                    quasi.span,
                    "TemplateElement",
                    vec![
                        ("value", json!({"raw": quasi.raw.as_str(), "cooked": cooked})),
                        ("tail", json!(quasi.tail)),
                    ],
                )
            })
            .collect();
        let expressions: Vec<Value> = tpl.exprs.iter().map(|expr| self.expr(expr)).collect();
        self.node(
            tpl.span,
            "TemplateLiteral",
            vec![
                ("quasis", Value::Array(quasis)),
                ("expressions", Value::Array(expressions)),
            ],
        )
    }

    fn unsupported_expr(&self, span: Span) -> Value {
        self.node(span, "UnsupportedExpression", vec![])
    }

    fn unsupported_stmt(&self, span: Span) -> Value {
        self.node(span, "UnsupportedStatement", vec![])
    }
}
