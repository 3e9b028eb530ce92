// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::fmt;

/// Byte offsets into the original template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Root AST structure for a parsed line template.
#[derive(Debug, Clone)]
pub struct Ast {
    pub name: String,
    pub root: Block,
}

impl Ast {
    pub fn new(name: impl Into<String>, root: Block) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }
}

/// Flat sequence of top-level nodes (equivalent to Go's `parse.ListNode`).
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub nodes: Vec<Node>,
}

impl Block {
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

/// Node types recognised by the parser.
///
/// Line templates have no control structures, so the tree never nests blocks.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Node {
    Text(TextNode),
    Action(ActionNode),
    Comment(CommentNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text(node) => node.span,
            Node::Action(node) => node.span,
            Node::Comment(node) => node.span,
        }
    }
}

/// Raw text literal.
#[derive(Debug, Clone)]
pub struct TextNode {
    pub span: Span,
    pub text: String,
}

impl TextNode {
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }
}

/// Template action with its parsed pipeline.
///
/// `span` covers the delimiters; `pipeline.pos` is the offset of the first
/// token inside them.
#[derive(Debug, Clone)]
pub struct ActionNode {
    pub span: Span,
    pub source: String,
    pub pipeline: Pipeline,
    pub trim_left: bool,
    pub trim_right: bool,
}

impl ActionNode {
    pub fn new(
        span: Span,
        source: impl Into<String>,
        pipeline: Pipeline,
        trim_left: bool,
        trim_right: bool,
    ) -> Self {
        Self {
            span,
            source: source.into(),
            pipeline,
            trim_left,
            trim_right,
        }
    }
}

/// Template comment (e.g. `[/* comment */]`). Never exported.
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub span: Span,
    pub text: String,
}

impl CommentNode {
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }
}

/// A complete pipeline inside an action or parenthesised operand.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub pos: usize,
    pub declarations: Option<PipelineDeclarations>,
    pub commands: Vec<Command>,
}

impl Pipeline {
    pub fn new(
        pos: usize,
        declarations: Option<PipelineDeclarations>,
        commands: Vec<Command>,
    ) -> Self {
        Self {
            pos,
            declarations,
            commands,
        }
    }
}

/// Variable declarations leading a pipeline (e.g. `[$x := ...]`).
#[derive(Debug, Clone)]
pub struct PipelineDeclarations {
    pub kind: BindingKind,
    pub variables: Vec<Operand>,
}

impl PipelineDeclarations {
    pub fn new(kind: BindingKind, variables: Vec<Operand>) -> Self {
        Self { kind, variables }
    }
}

/// Whether the pipeline introduces (`:=`) or assigns (`=`) variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindingKind {
    Declare,
    Assign,
}

/// Individual command in a pipeline: the leading operand plus its arguments.
#[derive(Debug, Clone)]
pub struct Command {
    pub pos: usize,
    pub target: Operand,
    pub args: Vec<Operand>,
}

impl Command {
    pub fn new(target: Operand, args: Vec<Operand>) -> Self {
        Self {
            pos: target.span.start,
            target,
            args,
        }
    }

    /// All operands in source order, target first.
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.target).chain(self.args.iter())
    }
}

/// An expression with the span of the tokens it was parsed from.
#[derive(Debug, Clone)]
pub struct Operand {
    pub span: Span,
    pub expr: Expression,
}

impl Operand {
    pub fn new(span: Span, expr: Expression) -> Self {
        Self { span, expr }
    }
}

/// Expression node.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Expression {
    /// Function name.
    Identifier(String),
    /// `.a.b` without the leading dot.
    Field(Vec<String>),
    /// `$x.a` as `["$x", "a"]`.
    Variable(Vec<String>),
    Dot,
    /// Field access on a parenthesised operand, e.g. `(.x).y`.
    Chain {
        node: Box<Operand>,
        fields: Vec<String>,
    },
    PipelineExpr(Pipeline),
    StringLiteral(String),
    NumberLiteral(String),
    BoolLiteral(bool),
    Nil,
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn field(path: Vec<String>) -> Self {
        Expression::Field(path)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(node) => write!(f, "Text({:?})", node.text),
            Node::Action(node) => write!(f, "Action({:?})", node.source),
            Node::Comment(_) => write!(f, "Comment"),
        }
    }
}
