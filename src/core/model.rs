//! Typed node model over ESTree JSON.
//!
//! The parser hands us a `serde_json::Value` in the ESTree shape: objects
//! tagged with a `type` key, child fields in source order, `loc` attached
//! where the parser knows positions. `Node::from_value` realises that value
//! into a tree of [`Node`]s; `to_value` is its inverse.

use std::fmt;

use serde_json::{Map, Value};

/// Raised when realisation meets a `type` tag we do not model.
///
/// This is fatal for the file being loaded and must never be swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownNodeType(String),
    NotANode,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownNodeType(name) => write!(f, "unknown node type: {}", name),
            ModelError::NotANode => write!(f, "value is not a type-tagged object"),
        }
    }
}

impl std::error::Error for ModelError {}

macro_rules! node_kinds {
    ($($kind:ident => [$($field:literal),* $(,)?]),+ $(,)?) => {
        /// The closed set of ESTree node kinds the model understands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Kind {
            $($kind,)+
        }

        impl Kind {
            pub fn name(self) -> &'static str {
                match self {
                    $(Kind::$kind => stringify!($kind),)+
                }
            }

            pub fn from_name(name: &str) -> Option<Kind> {
                match name {
                    $(stringify!($kind) => Some(Kind::$kind),)+
                    _ => None,
                }
            }

            /// Field names associated with this kind, in canonical order.
            pub fn fields(self) -> &'static [&'static str] {
                match self {
                    $(Kind::$kind => &[$($field),*],)+
                }
            }
        }
    };
}

node_kinds! {
    ArrayExpression => ["elements"],
    ArrayPattern => ["elements"],
    ArrowFunctionExpression => ["id", "params", "body", "generator", "expression", "async"],
    AssignmentExpression => ["operator", "left", "right"],
    AssignmentPattern => ["left", "right"],
    AwaitExpression => ["argument"],
    BinaryExpression => ["operator", "left", "right"],
    BlockStatement => ["body"],
    BreakStatement => ["label"],
    CallExpression => ["callee", "arguments"],
    CatchClause => ["param", "body"],
    ClassBody => ["body"],
    ClassDeclaration => ["id", "superClass", "body"],
    ClassExpression => ["id", "superClass", "body"],
    ConditionalExpression => ["test", "consequent", "alternate"],
    ContinueStatement => ["label"],
    DebuggerStatement => [],
    DoWhileStatement => ["body", "test"],
    EmptyStatement => [],
    ExportAllDeclaration => ["source"],
    ExportDefaultDeclaration => ["declaration"],
    ExportNamedDeclaration => ["declaration", "specifiers", "source"],
    ExportSpecifier => ["exported", "local"],
    ExpressionStatement => ["expression"],
    ForInStatement => ["left", "right", "body"],
    ForOfStatement => ["left", "right", "body"],
    ForStatement => ["init", "test", "update", "body"],
    FunctionDeclaration => ["id", "params", "body", "generator", "expression", "async"],
    FunctionExpression => ["id", "params", "body", "generator", "expression", "async"],
    Identifier => ["name"],
    IfStatement => ["test", "consequent", "alternate"],
    ImportDeclaration => ["specifiers", "source"],
    ImportDefaultSpecifier => ["local"],
    ImportNamespaceSpecifier => ["local"],
    ImportSpecifier => ["local", "imported"],
    LabeledStatement => ["label", "body"],
    Literal => ["raw", "value", "regex"],
    LogicalExpression => ["operator", "left", "right"],
    MemberExpression => ["computed", "object", "property"],
    MetaProperty => ["meta", "property"],
    MethodDefinition => ["key", "computed", "value", "kind", "static"],
    NewExpression => ["callee", "arguments"],
    ObjectExpression => ["properties"],
    ObjectPattern => ["properties"],
    PrivateIdentifier => ["name"],
    Program => ["body", "sourceType"],
    Property => ["key", "computed", "value", "kind", "method", "shorthand"],
    PropertyDefinition => ["key", "computed", "value", "static"],
    RestElement => ["argument"],
    ReturnStatement => ["argument"],
    SequenceExpression => ["expressions"],
    SpreadElement => ["argument"],
    StaticBlock => ["body"],
    Super => [],
    SwitchCase => ["test", "consequent"],
    SwitchStatement => ["discriminant", "cases"],
    TaggedTemplateExpression => ["tag", "quasi"],
    TemplateElement => ["value", "tail"],
    TemplateLiteral => ["quasis", "expressions"],
    ThisExpression => [],
    ThrowStatement => ["argument"],
    TryStatement => ["block", "handler", "finalizer"],
    UnaryExpression => ["operator", "prefix", "argument"],
    UpdateExpression => ["operator", "prefix", "argument"],
    VariableDeclaration => ["declarations", "kind"],
    VariableDeclarator => ["id", "init"],
    WhileStatement => ["test", "body"],
    WithStatement => ["object", "body"],
    YieldExpression => ["argument", "delegate"],
}

/// A realised field value: a child node, an ordered list, or plain JSON
/// (scalars and objects without a `type` tag, such as `regex` or
/// `TemplateElement.value`).
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(Box<Node>),
    List(Vec<Item>),
    Raw(Value),
}

impl Item {
    /// Nodes reachable in this item, in order.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        collect_nodes(self, &mut out);
        out
    }
}

/// One AST node with its declared fields and any undeclared keys
/// (including `loc`) carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: Kind,
    fields: Vec<Option<Item>>,
    extra: Map<String, Value>,
}

fn realize(data: &Value) -> Result<Item, ModelError> {
    match data {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str).is_some() {
                Ok(Item::Node(Box::new(Node::from_value(data)?)))
            } else {
                Ok(Item::Raw(data.clone()))
            }
        }
        Value::Array(items) => Ok(Item::List(
            items.iter().map(realize).collect::<Result<_, _>>()?,
        )),
        other => Ok(Item::Raw(other.clone())),
    }
}

fn item_to_value(item: &Item) -> Value {
    match item {
        Item::Node(node) => node.to_value(),
        Item::List(items) => Value::Array(items.iter().map(item_to_value).collect()),
        Item::Raw(value) => value.clone(),
    }
}

fn collect_nodes<'a>(item: &'a Item, out: &mut Vec<&'a Node>) {
    match item {
        Item::Node(node) => out.push(node),
        Item::List(items) => {
            for inner in items {
                collect_nodes(inner, out);
            }
        }
        Item::Raw(_) => {}
    }
}

impl Node {
    /// Realise an ESTree JSON value into a node tree.
    ///
    /// Objects carrying a known `type` become nodes and consume the fields
    /// declared for that kind; everything else passes through as raw JSON.
    /// An unknown `type` fails with [`ModelError::UnknownNodeType`].
    pub fn from_value(data: &Value) -> Result<Node, ModelError> {
        let map = data.as_object().ok_or(ModelError::NotANode)?;
        let type_name = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ModelError::NotANode)?;
        let kind = Kind::from_name(type_name)
            .ok_or_else(|| ModelError::UnknownNodeType(type_name.to_string()))?;

        let mut fields = Vec::with_capacity(kind.fields().len());
        for &name in kind.fields() {
            fields.push(match map.get(name) {
                Some(value) => Some(realize(value)?),
                None => None,
            });
        }

        let extra = map
            .iter()
            .filter(|(key, _)| *key != "type" && !kind.fields().contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Node {
            kind,
            fields,
            extra,
        })
    }

    /// Reconstruct the ESTree JSON this node was built from: `type` first,
    /// declared fields in canonical order, then the undeclared keys.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String(self.kind.name().into()));
        for (name, field) in self.kind.fields().iter().zip(&self.fields) {
            if let Some(item) = field {
                map.insert((*name).into(), item_to_value(item));
            }
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn field(&self, name: &str) -> Option<&Item> {
        let index = self.kind.fields().iter().position(|f| *f == name)?;
        self.fields[index].as_ref()
    }

    /// The field as a child node, if it holds one.
    pub fn child(&self, name: &str) -> Option<&Node> {
        match self.field(name)? {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Nodes inside a list field, in source order. Empty for anything else.
    pub fn list(&self, name: &str) -> Vec<&Node> {
        let mut out = Vec::new();
        if let Some(item @ Item::List(_)) = self.field(name) {
            collect_nodes(item, &mut out);
        }
        out
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        match self.field(name)? {
            Item::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.raw(name)?.as_str()
    }

    pub fn bool_field(&self, name: &str) -> bool {
        self.raw(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn loc(&self) -> Option<&Value> {
        self.extra.get("loc")
    }

    /// 1-based line the node starts on, where the parser attached `loc`.
    pub fn start_line(&self) -> Option<usize> {
        self.loc()?
            .get("start")?
            .get("line")?
            .as_u64()
            .map(|line| line as usize)
    }

    /// Present fields with their names, in canonical order.
    pub fn named_fields(&self) -> impl Iterator<Item = (&'static str, &Item)> {
        self.kind
            .fields()
            .iter()
            .zip(&self.fields)
            .filter_map(|(name, field)| field.as_ref().map(|item| (*name, item)))
    }

    /// Direct child nodes in source order, flattening list fields.
    pub fn children(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        for item in self.fields.iter().flatten() {
            collect_nodes(item, &mut out);
        }
        out
    }

    /// Lazy pre-order traversal of this node and all of its descendants.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse { stack: vec![self] }
    }
}

pub struct Traverse<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}
