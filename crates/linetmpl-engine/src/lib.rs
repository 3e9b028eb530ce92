#![forbid(unsafe_code)]
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Parser for line templates: Go `text/template` style patterns with `[` and
//! `]` delimiters, such as `/[.日期]/[.车牌]_[.序号].jpg`.
//!
//! Templates are parsed into an [`Ast`] and exported as a serializable
//! [`Tree`] which editors fetch, mutate and write back to source. Templates
//! are never executed here.

pub mod ast;
mod error;
pub mod lexer;
mod parser;
pub mod telemetry;
pub mod tree;

pub use ast::{
    ActionNode, Ast, BindingKind, Block, Command, CommentNode, Expression, Node, Operand,
    Pipeline, PipelineDeclarations, Span, TextNode,
};
pub use error::{line_of, Error};
pub use lexer::{Keyword, Token, TokenKind};
pub use parser::BUILTIN_FUNCTIONS;
pub use tree::{NodeType, Traversal, Tree, Visitor};

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

/// Default left action delimiter.
pub const LEFT_DELIM: &str = "[";
/// Default right action delimiter.
pub const RIGHT_DELIM: &str = "]";

/// Action delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delims {
    pub left: String,
    pub right: String,
}

impl Delims {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Default for Delims {
    fn default() -> Self {
        Self::new(LEFT_DELIM, RIGHT_DELIM)
    }
}

/// Knobs for [`Template::parse_with`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub delims: Delims,
    /// Function names accepted in addition to [`BUILTIN_FUNCTIONS`].
    pub functions: HashSet<String>,
}

impl ParseOptions {
    /// Registers extra function names.
    pub fn with_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Parsed template with associated AST and original source.
#[derive(Clone)]
pub struct Template {
    name: String,
    source: String,
    delims: Delims,
    ast: Ast,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

impl Template {
    /// Parses template source with the default `[`/`]` delimiters.
    pub fn parse_str(name: &str, source: &str) -> Result<Self, Error> {
        Self::parse_with(name, source, &ParseOptions::default())
    }

    /// Parses template source with explicit delimiters and function names.
    pub fn parse_with(name: &str, source: &str, options: &ParseOptions) -> Result<Self, Error> {
        let started = Instant::now();
        let result = parser::parse_template(name, source, options);
        telemetry::record_parse(name, source.len(), started.elapsed(), result.is_ok());
        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            delims: options.delims.clone(),
            ast: result?,
        })
    }

    /// Returns the original template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the original template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the delimiters the template was parsed with.
    pub fn delims(&self) -> &Delims {
        &self.delims
    }

    /// Returns a reference to the parsed AST.
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Exports the serializable tree.
    pub fn tree(&self) -> Tree {
        let tree = Traversal::new(&self.ast, &self.source).export();
        telemetry::record_export(&self.name, tree.nodes.len(), true);
        tree
    }

    /// Exports the tree, letting `visitor` inspect or reject each node.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<Tree, Error> {
        let result = Traversal::new(&self.ast, &self.source).visit_with(visitor);
        let nodes = result.as_ref().map_or(0, |tree| tree.nodes.len());
        telemetry::record_export(&self.name, nodes, result.is_ok());
        result
    }

    /// Returns a canonical string representation of the parsed template.
    /// Comments and trim markers are not preserved.
    pub fn to_template_string(&self) -> String {
        Traversal::new(&self.ast, &self.source)
            .export()
            .to_template_string_with(&self.delims)
    }
}
