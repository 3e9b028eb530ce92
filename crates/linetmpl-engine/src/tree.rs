// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Serializable view of a parsed template.
//!
//! This is the JSON shape served to editors: a flat list of top-level nodes,
//! each tagged with a `nodeType` and carrying only the fields that apply to
//! its kind. Empty collections and `false` flags are omitted.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::ast::{Ast, BindingKind, Command, Expression, Node as AstNode, Operand, Pipeline};
use crate::error::{line_of, Error};
use crate::{Delims, LEFT_DELIM, RIGHT_DELIM};

/// Kind tag of an exported node, serialized in upper case (`"FIELD"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Text,
    Action,
    Pipe,
    Command,
    Variable,
    Identifier,
    Dot,
    Nil,
    Field,
    Chain,
    Bool,
    Number,
    String,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Text => "TEXT",
            NodeType::Action => "ACTION",
            NodeType::Pipe => "PIPE",
            NodeType::Command => "COMMAND",
            NodeType::Variable => "VARIABLE",
            NodeType::Identifier => "IDENTIFIER",
            NodeType::Dot => "DOT",
            NodeType::Nil => "NIL",
            NodeType::Field => "FIELD",
            NodeType::Chain => "CHAIN",
            NodeType::Bool => "BOOL",
            NodeType::Number => "NUMBER",
            NodeType::String => "STRING",
        }
    }
}

/// Exported template tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Exported node. Which fields are populated depends on `node_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_type: NodeType,
    #[serde(default)]
    pub pos: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_assign: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ident: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decl: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmds: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field: Vec<String>,
    #[serde(default, rename = "true", skip_serializing_if = "is_false")]
    pub is_true: bool,
}

impl Node {
    pub fn new(node_type: NodeType, pos: usize) -> Self {
        Self {
            node_type,
            pos,
            line: 0,
            text: None,
            pipe: None,
            is_assign: false,
            ident: Vec::new(),
            nodes: Vec::new(),
            decl: Vec::new(),
            cmds: Vec::new(),
            args: Vec::new(),
            node: None,
            field: Vec::new(),
            is_true: false,
        }
    }

    /// Text literal node.
    pub fn text(pos: usize, text: impl Into<String>) -> Self {
        let mut node = Self::new(NodeType::Text, pos);
        node.text = Some(text.into());
        node
    }

    /// Action printing a single field, e.g. `[.name]`.
    pub fn field_action(pos: usize, field: impl Into<String>) -> Self {
        let mut field_node = Self::new(NodeType::Field, pos);
        field_node.ident = vec![field.into()];
        let mut command = Self::new(NodeType::Command, pos);
        command.args = vec![field_node];
        let mut pipe = Self::new(NodeType::Pipe, pos);
        pipe.cmds = vec![command];
        let mut action = Self::new(NodeType::Action, pos);
        action.pipe = Some(Box::new(pipe));
        action
    }

    /// Writes this node back as template source.
    pub fn write_source(&self, out: &mut String, delims: &Delims) {
        match self.node_type {
            NodeType::Text => write_text(out, self.text.as_deref().unwrap_or_default(), delims),
            NodeType::Action => {
                out.push_str(&delims.left);
                if let Some(pipe) = &self.pipe {
                    pipe.write_pipe(out, delims);
                }
                out.push_str(&delims.right);
            }
            NodeType::Pipe => {
                out.push('(');
                self.write_pipe(out, delims);
                out.push(')');
            }
            NodeType::Command => {
                for (idx, arg) in self.args.iter().enumerate() {
                    if idx > 0 {
                        out.push(' ');
                    }
                    arg.write_source(out, delims);
                }
            }
            NodeType::Variable => out.push_str(&self.ident.join(".")),
            NodeType::Identifier => out.push_str(self.ident.first().map_or("", String::as_str)),
            NodeType::Dot => out.push('.'),
            NodeType::Nil => out.push_str("nil"),
            NodeType::Field => {
                for part in &self.ident {
                    out.push('.');
                    out.push_str(part);
                }
            }
            NodeType::Chain => {
                if let Some(inner) = &self.node {
                    inner.write_source(out, delims);
                }
                for part in &self.field {
                    out.push('.');
                    out.push_str(part);
                }
            }
            NodeType::Bool => out.push_str(if self.is_true { "true" } else { "false" }),
            NodeType::Number => out.push_str(self.text.as_deref().unwrap_or("0")),
            NodeType::String => {
                quote_into(out, self.text.as_deref().unwrap_or_default());
            }
        }
    }

    fn write_pipe(&self, out: &mut String, delims: &Delims) {
        if !self.decl.is_empty() {
            for (idx, var) in self.decl.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                var.write_source(out, delims);
            }
            out.push_str(if self.is_assign { " = " } else { " := " });
        }
        for (idx, cmd) in self.cmds.iter().enumerate() {
            if idx > 0 {
                out.push_str(" | ");
            }
            cmd.write_source(out, delims);
        }
    }
}

// A left delimiter inside text is written as a string action printing it, so
// the output parses back to the same output text.
fn write_text(out: &mut String, text: &str, delims: &Delims) {
    if delims.left.is_empty() {
        out.push_str(text);
        return;
    }
    let mut rest = text;
    while let Some(idx) = rest.find(delims.left.as_str()) {
        out.push_str(&rest[..idx]);
        out.push_str(&delims.left);
        quote_into(out, &delims.left);
        out.push_str(&delims.right);
        rest = &rest[idx + delims.left.len()..];
    }
    out.push_str(rest);
}

// Go-style quoting: named escapes where they exist, `\x`/`\u` for other
// control characters.
fn quote_into(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if c.is_control() && u32::from(c) < 0x80 => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            other => out.push(other),
        }
    }
    out.push('"');
}

impl Tree {
    /// Template source for this tree using the default `[`/`]` delimiters.
    pub fn to_template_string(&self) -> String {
        self.to_template_string_with(&Delims::new(LEFT_DELIM, RIGHT_DELIM))
    }

    /// Template source using `delims`. Comments and trim markers are gone;
    /// text containing the left delimiter gets it back as a string action.
    pub fn to_template_string_with(&self, delims: &Delims) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.write_source(&mut out, delims);
        }
        out
    }
}

/// Callback invoked for every exported node.
///
/// The node is passed after its own scalar fields are set but before its
/// children are attached. Returning an error aborts the export.
pub trait Visitor {
    fn visit(&mut self, node: &Node) -> Result<(), Error>;
}

impl<F> Visitor for F
where
    F: FnMut(&Node) -> Result<(), Error>,
{
    fn visit(&mut self, node: &Node) -> Result<(), Error> {
        self(node)
    }
}

struct NoopVisitor;

impl Visitor for NoopVisitor {
    fn visit(&mut self, _node: &Node) -> Result<(), Error> {
        Ok(())
    }
}

/// Walks a parsed [`Ast`] and builds the exported [`Tree`].
pub struct Traversal<'a> {
    ast: &'a Ast,
    source: &'a str,
}

impl<'a> Traversal<'a> {
    /// `source` is the text `ast` was parsed from; it is used for line numbers.
    pub fn new(ast: &'a Ast, source: &'a str) -> Self {
        Self { ast, source }
    }

    /// Builds the tree without a visitor.
    pub fn export(&self) -> Tree {
        match self.visit_with(&mut NoopVisitor) {
            Ok(tree) => tree,
            Err(_) => unreachable!("no-op visitor never rejects a node"),
        }
    }

    /// Builds the tree, calling `visitor` for every node.
    pub fn visit_with<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<Tree, Error> {
        let mut tree = Tree {
            name: self.ast.name.clone(),
            nodes: Vec::with_capacity(self.ast.root.nodes.len()),
        };
        for node in &self.ast.root.nodes {
            if let Some(exported) = self.visit_node(node, visitor)? {
                tree.nodes.push(exported);
            }
        }
        Ok(tree)
    }

    fn visit_node<V: Visitor + ?Sized>(
        &self,
        node: &AstNode,
        visitor: &mut V,
    ) -> Result<Option<Node>, Error> {
        let exported = match node {
            AstNode::Text(text) => {
                let mut n = Node::text(text.span.start, text.text.clone());
                n.line = line_of(self.source, text.span.start);
                visitor.visit(&n)?;
                n
            }
            AstNode::Action(action) => {
                let pos = action.pipeline.pos;
                let mut n = Node::new(NodeType::Action, pos);
                n.line = line_of(self.source, pos);
                visitor.visit(&n)?;
                n.pipe = Some(Box::new(self.visit_pipe(&action.pipeline, visitor)?));
                n
            }
            AstNode::Comment(_) => return Ok(None),
        };
        Ok(Some(exported))
    }

    fn visit_pipe<V: Visitor + ?Sized>(
        &self,
        pipeline: &Pipeline,
        visitor: &mut V,
    ) -> Result<Node, Error> {
        let mut n = Node::new(NodeType::Pipe, pipeline.pos);
        if let Some(decls) = &pipeline.declarations {
            n.is_assign = decls.kind == BindingKind::Assign;
        }
        visitor.visit(&n)?;

        if let Some(decls) = &pipeline.declarations {
            for var in &decls.variables {
                n.decl.push(self.visit_operand(var, visitor)?);
            }
        }
        for command in &pipeline.commands {
            n.cmds.push(self.visit_command(command, visitor)?);
        }
        Ok(n)
    }

    fn visit_command<V: Visitor + ?Sized>(
        &self,
        command: &Command,
        visitor: &mut V,
    ) -> Result<Node, Error> {
        let mut n = Node::new(NodeType::Command, command.pos);
        visitor.visit(&n)?;
        for operand in command.operands() {
            n.args.push(self.visit_operand(operand, visitor)?);
        }
        Ok(n)
    }

    fn visit_operand<V: Visitor + ?Sized>(
        &self,
        operand: &Operand,
        visitor: &mut V,
    ) -> Result<Node, Error> {
        let pos = operand.span.start;
        let n = match &operand.expr {
            Expression::PipelineExpr(pipeline) => return self.visit_pipe(pipeline, visitor),
            Expression::Chain { node, fields } => {
                let mut n = Node::new(NodeType::Chain, pos);
                n.field = fields.clone();
                visitor.visit(&n)?;
                n.node = Some(Box::new(self.visit_operand(node, visitor)?));
                return Ok(n);
            }
            Expression::Identifier(name) => {
                let mut n = Node::new(NodeType::Identifier, pos);
                n.ident = vec![name.clone()];
                n
            }
            Expression::Field(parts) => {
                let mut n = Node::new(NodeType::Field, pos);
                n.ident = parts.clone();
                n
            }
            Expression::Variable(parts) => {
                let mut n = Node::new(NodeType::Variable, pos);
                n.ident = parts.clone();
                n
            }
            Expression::Dot => Node::new(NodeType::Dot, pos),
            Expression::Nil => Node::new(NodeType::Nil, pos),
            Expression::BoolLiteral(flag) => {
                let mut n = Node::new(NodeType::Bool, pos);
                n.is_true = *flag;
                n
            }
            Expression::NumberLiteral(text) => {
                let mut n = Node::new(NodeType::Number, pos);
                n.text = Some(text.clone());
                n
            }
            Expression::StringLiteral(text) => {
                let mut n = Node::new(NodeType::String, pos);
                n.text = Some(text.clone());
                n
            }
        };
        visitor.visit(&n)?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, Template};
    use serde_json::json;

    const PATTERN: &str = "/[.日期]/[.车牌]/[.年]/[.月]/[.日]/[.违法代码]_[.序号].jpg";

    #[test]
    fn exports_field_actions_in_go_shape() {
        let tmpl = Template::parse_str("1", "/[.日期].jpg").unwrap();
        let value = serde_json::to_value(tmpl.tree()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "1",
                "nodes": [
                    {"nodeType": "TEXT", "pos": 0, "line": 1, "text": "/"},
                    {
                        "nodeType": "ACTION", "pos": 2, "line": 1,
                        "pipe": {
                            "nodeType": "PIPE", "pos": 2,
                            "cmds": [{
                                "nodeType": "COMMAND", "pos": 2,
                                "args": [{"nodeType": "FIELD", "pos": 2, "ident": ["日期"]}]
                            }]
                        }
                    },
                    {"nodeType": "TEXT", "pos": 10, "line": 1, "text": ".jpg"}
                ]
            })
        );
    }

    #[test]
    fn exports_declarations_and_literals() {
        let tmpl = Template::parse_str("decl", r#"[$x := printf "%d" 1 true nil][$x = .a]"#)
            .unwrap();
        let tree = tmpl.tree();
        let declare = tree.nodes[0].pipe.as_ref().unwrap();
        assert!(!declare.is_assign);
        assert_eq!(declare.decl[0].node_type, NodeType::Variable);
        assert_eq!(declare.decl[0].ident, vec!["$x".to_string()]);

        let kinds: Vec<_> = declare.cmds[0].args.iter().map(|n| n.node_type).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Identifier,
                NodeType::String,
                NodeType::Number,
                NodeType::Bool,
                NodeType::Nil
            ]
        );
        assert_eq!(declare.cmds[0].args[1].text.as_deref(), Some("%d"));
        assert!(declare.cmds[0].args[3].is_true);

        let assign = tree.nodes[1].pipe.as_ref().unwrap();
        assert!(assign.is_assign);
    }

    #[test]
    fn exports_chain_and_nested_pipe() {
        let tmpl = Template::parse_str("chain", "[(index . 0).name | len]").unwrap();
        let pipe = tmpl.tree().nodes[0].pipe.clone().unwrap();
        let chain = &pipe.cmds[0].args[0];
        assert_eq!(chain.node_type, NodeType::Chain);
        assert_eq!(chain.field, vec!["name".to_string()]);
        let inner = chain.node.as_ref().unwrap();
        assert_eq!(inner.node_type, NodeType::Pipe);
        assert_eq!(inner.cmds[0].args[1].node_type, NodeType::Dot);
    }

    #[test]
    fn comments_are_not_exported() {
        let tmpl = Template::parse_str("c", "a[/* hidden */]b").unwrap();
        assert_eq!(tmpl.tree().nodes.len(), 2);
    }

    #[test]
    fn visitor_sees_every_node_and_can_abort() {
        let tmpl = Template::parse_str("v", PATTERN).unwrap();
        let traversal = Traversal::new(tmpl.ast(), tmpl.source());

        let mut fields = Vec::new();
        traversal
            .visit_with(&mut |node: &Node| {
                if node.node_type == NodeType::Field {
                    fields.push(node.ident[0].clone());
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(fields, vec!["日期", "车牌", "年", "月", "日", "违法代码", "序号"]);

        let err = traversal
            .visit_with(&mut |node: &Node| {
                if node.node_type == NodeType::Field && node.ident[0] == "年" {
                    return Err(Error::export("year is not allowed", node.pos));
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
    }

    #[test]
    fn tree_writes_back_to_source() {
        let tmpl = Template::parse_str("w", PATTERN).unwrap();
        assert_eq!(tmpl.tree().to_template_string(), PATTERN);

        let src = r#"[$v := .a | printf "%q\n" ][ $v ][ (len .b).x ]"#;
        let options = ParseOptions::default();
        let tmpl = Template::parse_with("w2", src, &options).unwrap();
        assert_eq!(
            tmpl.tree().to_template_string(),
            r#"[$v := .a | printf "%q\n"][$v][(len .b).x]"#
        );
    }

    #[test]
    fn written_strings_reparse_to_same_text() {
        let src = "[printf `a\u{1}\"b\\c`]";
        let tree = Template::parse_str("q", src).unwrap().tree();
        let written = tree.to_template_string();
        assert_eq!(written, r#"[printf "a\x01\"b\\c"]"#);

        let reparsed = Template::parse_str("q", &written).unwrap().tree();
        assert_eq!(reparsed.to_template_string(), written);
    }

    #[test]
    fn escaped_strings_keep_their_meaning() {
        let tree = Template::parse_str("e", r#"[printf "\x41é\a\x7f\u0085"]"#)
            .unwrap()
            .tree();
        let operand = &tree.nodes[0].pipe.as_ref().unwrap().cmds[0].args[1];
        assert_eq!(operand.node_type, NodeType::String);
        assert_eq!(operand.text.as_deref(), Some("Aé\u{7}\u{7f}\u{85}"));

        let written = tree.to_template_string();
        assert_eq!(written, r#"[printf "Aé\a\x7f\u0085"]"#);
        let reparsed = Template::parse_str("e", &written).unwrap().tree();
        assert_eq!(
            reparsed.nodes[0].pipe.as_ref().unwrap().cmds[0].args[1].text,
            operand.text
        );
    }

    #[test]
    fn invalid_escapes_are_parse_errors() {
        let err = Template::parse_str("e", r#"a[printf "\q"]"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            r"parse error: line 1: invalid escape sequence \q in string literal"
        );
        assert_eq!(err.span().map(|span| span.start), Some(10));
    }

    #[test]
    fn text_with_left_delimiter_writes_parseable_source() {
        let tree = Tree {
            name: "d".into(),
            nodes: vec![Node::text(0, "x[y"), Node::field_action(3, "b")],
        };
        let written = tree.to_template_string();
        assert_eq!(written, r#"x["["]y[.b]"#);

        let reparsed = Template::parse_str("d", &written).unwrap().tree();
        assert_eq!(reparsed.nodes.len(), 4);
        assert_eq!(reparsed.nodes[0].text.as_deref(), Some("x"));
        assert_eq!(
            reparsed.nodes[1].pipe.as_ref().unwrap().cmds[0].args[0].text.as_deref(),
            Some("[")
        );
        assert_eq!(reparsed.to_template_string(), written);

        let braces = Delims::new("{{", "}}");
        let tree = Tree {
            name: "d".into(),
            nodes: vec![Node::text(0, "a{{b[c")],
        };
        assert_eq!(tree.to_template_string_with(&braces), r#"a{{"{{"}}b[c"#);
    }

    #[test]
    fn tree_round_trips_through_json() {
        let tree = Template::parse_str("j", PATTERN).unwrap().tree();
        let body = serde_json::to_string(&tree).unwrap();
        let back: Tree = serde_json::from_str(&body).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn field_action_builder_matches_parsed_shape() {
        let built = Node::field_action(0, "年");
        let mut out = String::new();
        built.write_source(&mut out, &Delims::default());
        assert_eq!(out, "[.年]");
    }
}
