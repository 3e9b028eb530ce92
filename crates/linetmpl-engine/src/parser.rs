// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::collections::HashSet;

use crate::ast::{
    ActionNode, Ast, BindingKind, Block, Command, CommentNode, Expression, Node, Operand,
    Pipeline, PipelineDeclarations, Span, TextNode,
};
use crate::error::Error;
use crate::lexer;
use crate::lexer::{Keyword, Token, TokenKind};
use crate::{Delims, ParseOptions};

/// Functions Go's `text/template` predefines for every template.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "and", "call", "html", "index", "slice", "js", "len", "not", "or", "print", "printf",
    "println", "urlquery", "eq", "ge", "gt", "le", "lt", "ne",
];

/// Primary entry point for parsing line templates.
///
/// The parser walks the input once, splitting it into literal text and
/// actions. Line templates are flat, so every node lands in the root block and
/// any control keyword is rejected. Variables are tracked across the whole
/// template because there are no nested scopes.
pub fn parse_template(name: &str, source: &str, options: &ParseOptions) -> Result<Ast, Error> {
    parse_nodes(name, source, options).map_err(|err| err.with_line_from(source))
}

fn parse_nodes(name: &str, source: &str, options: &ParseOptions) -> Result<Ast, Error> {
    let delims = &options.delims;
    if delims.left.is_empty() || delims.right.is_empty() {
        return Err(Error::parse("delimiters must not be empty", None));
    }

    let mut root = Block::default();
    let mut cursor = 0usize;
    let mut scope = Scope::new(options);

    while cursor < source.len() {
        let Some(open) = find_action_start(source, cursor, &delims.left) else {
            root.push(Node::Text(TextNode::new(
                Span::new(cursor, source.len()),
                &source[cursor..],
            )));
            break;
        };

        if open > cursor {
            root.push(Node::Text(TextNode::new(
                Span::new(cursor, open),
                &source[cursor..open],
            )));
        }

        let body_from = open + delims.left.len();
        let Some(close) = find_action_end(source, body_from, &delims.right) else {
            let span = Span::new(open, source.len());
            if source[comment_start(source, body_from)..].starts_with("/*") {
                return Err(Error::parse_with_span("unclosed comment", span));
            }
            return Err(Error::parse_with_span("unclosed action", span));
        };

        let window = trim_action_delimiters(source, delims, open, close);

        if window.trim_left {
            trim_trailing_whitespace(&mut root);
        }

        if let Some(comment) = comment_body(source, body_from, close, &window) {
            let comment = comment?;
            root.push(Node::Comment(CommentNode::new(
                window.span,
                strip_comment(comment),
            )));
        } else {
            let tokens = lexer::lex_action(window.body, window.body_start)?;
            let first = tokens
                .first()
                .ok_or_else(|| Error::parse_with_span("empty action", window.span))?;

            if let TokenKind::Keyword(keyword) = &first.kind {
                if keyword.is_control() {
                    return Err(Error::parse_with_span(
                        format!("unsupported control structure {:?}", keyword.as_str()),
                        first.span,
                    ));
                }
            }

            let pipeline = ActionParser::new(&tokens, &mut scope).parse_pipeline()?;
            root.push(Node::Action(ActionNode::new(
                window.span,
                window.body,
                pipeline,
                window.trim_left,
                window.trim_right,
            )));
        }

        cursor = close + delims.right.len();
        if window.trim_right {
            cursor = skip_leading_whitespace(source.as_bytes(), cursor);
        }
    }

    // Trimming can empty a text node entirely; Go drops those.
    root.nodes
        .retain(|node| !matches!(node, Node::Text(text) if text.text.is_empty()));

    Ok(Ast::new(name, root))
}

#[derive(Debug, Clone, Copy)]
struct ActionWindow<'a> {
    span: Span,
    body_start: usize,
    body: &'a str,
    trim_left: bool,
    trim_right: bool,
}

/// Strips delimiters and trim markers from an action. A trim marker is a `-`
/// separated from the body by whitespace, so `[-3]` stays a negative number.
fn trim_action_delimiters<'a>(
    source: &'a str,
    delims: &Delims,
    open: usize,
    close: usize,
) -> ActionWindow<'a> {
    let bytes = source.as_bytes();
    let mut body_start = open + delims.left.len();
    let mut body_end = close;
    let mut trim_left = false;
    let mut trim_right = false;

    if body_start + 1 < body_end && bytes[body_start] == b'-' && is_space(bytes[body_start + 1]) {
        trim_left = true;
        body_start += 1;
    }
    if body_end >= body_start + 2 && bytes[body_end - 1] == b'-' && is_space(bytes[body_end - 2])
    {
        trim_right = true;
        body_end -= 1;
    }

    let span = Span::new(open, close + delims.right.len());
    let raw = &source[body_start..body_end];
    let trimmed_start = raw.trim_start();
    let prefix_len = raw.len() - trimmed_start.len();
    let body = trimmed_start.trim_end();
    body_start += prefix_len;

    ActionWindow {
        span,
        body_start,
        body,
        trim_left,
        trim_right,
    }
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn trim_trailing_whitespace(block: &mut Block) {
    if let Some(Node::Text(text)) = block.nodes.last_mut() {
        let kept = text.text.trim_end_matches([' ', '\t', '\n', '\r']).len();
        text.text.truncate(kept);
        text.span.end = text.span.start + kept;
    }
}

fn skip_leading_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && is_space(bytes[index]) {
        index += 1;
    }
    index
}

/// Where a comment may open: right after the left delimiter, or after its
/// `- ` trim marker.
fn comment_start(source: &str, body_from: usize) -> usize {
    let bytes = source.as_bytes();
    if bytes.len() > body_from + 1 && bytes[body_from] == b'-' && is_space(bytes[body_from + 1]) {
        body_from + 2
    } else {
        body_from
    }
}

/// Returns the `/* ... */` text of a comment action, `None` for any other
/// action. The comment must close right before the right delimiter or its
/// ` -` trim marker.
fn comment_body<'a>(
    source: &'a str,
    body_from: usize,
    close: usize,
    window: &ActionWindow<'_>,
) -> Option<Result<&'a str, Error>> {
    let start = comment_start(source, body_from);
    if !source.get(start..close).is_some_and(|body| body.starts_with("/*")) {
        return None;
    }
    let end = if window.trim_right { close - 2 } else { close };
    let raw = &source[start..end.max(start)];
    if raw.len() >= 4 && raw.ends_with("*/") {
        return Some(Ok(raw));
    }
    let message = if raw.get(2..).is_some_and(|rest| rest.contains("*/")) {
        "comment ends before closing delimiter"
    } else {
        "unclosed comment"
    };
    Some(Err(Error::parse_with_span(message, window.span)))
}

fn strip_comment(body: &str) -> String {
    body.strip_prefix("/*")
        .and_then(|b| b.strip_suffix("*/"))
        .map(|inner| inner.trim().to_string())
        .unwrap_or_else(|| body.to_string())
}

/// Names visible to the parser: known functions and declared variables.
struct Scope<'o> {
    functions: &'o HashSet<String>,
    variables: Vec<String>,
}

impl<'o> Scope<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            functions: &options.functions,
            variables: vec!["$".to_string()],
        }
    }

    fn has_function(&self, name: &str) -> bool {
        BUILTIN_FUNCTIONS.contains(&name) || self.functions.contains(name)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|var| var == name)
    }
}

struct ActionParser<'a, 's, 'o> {
    tokens: &'a [Token],
    index: usize,
    scope: &'s mut Scope<'o>,
}

impl<'a, 's, 'o> ActionParser<'a, 's, 'o> {
    fn new(tokens: &'a [Token], scope: &'s mut Scope<'o>) -> Self {
        Self {
            tokens,
            index: 0,
            scope,
        }
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, Error> {
        let pos = self
            .peek_token()
            .map(|token| token.span.start)
            .ok_or_else(|| Error::parse("missing value for command", None))?;
        let declarations = self.parse_declarations()?;

        let mut commands = vec![self.parse_command()?];
        while self.consume(|kind| matches!(kind, TokenKind::Pipe)) {
            commands.push(self.parse_command()?);
        }

        if let Some(token) = self.peek_token() {
            return Err(Error::parse_with_span(
                format!("unexpected token {:?}", token.kind),
                token.span,
            ));
        }

        // Declared names only become visible after the pipeline that declares them.
        if let Some(decls) = &declarations {
            if decls.kind == BindingKind::Declare {
                for var in &decls.variables {
                    if let Expression::Variable(path) = &var.expr {
                        self.scope.variables.push(path[0].clone());
                    }
                }
            }
        }

        Ok(Pipeline::new(pos, declarations, commands))
    }

    fn parse_declarations(&mut self) -> Result<Option<PipelineDeclarations>, Error> {
        let save = self.index;
        let mut variables = Vec::new();

        while let Some(token) = self.peek_token() {
            let TokenKind::Variable(name) = &token.kind else {
                break;
            };
            variables.push(Operand::new(
                token.span,
                Expression::Variable(vec![name.clone()]),
            ));
            self.index += 1;
            if !self.consume(|kind| matches!(kind, TokenKind::Comma)) {
                break;
            }
        }

        let kind = match self.peek_token().map(|token| &token.kind) {
            Some(TokenKind::Declare) if !variables.is_empty() => BindingKind::Declare,
            Some(TokenKind::Assign) if !variables.is_empty() => BindingKind::Assign,
            _ => {
                self.index = save;
                return Ok(None);
            }
        };
        let op_span = self.tokens[self.index].span;
        self.index += 1; // consume := or =

        if variables.len() > 1 {
            return Err(Error::parse_with_span("too many declarations", op_span));
        }
        if kind == BindingKind::Assign {
            for var in &variables {
                if let Expression::Variable(path) = &var.expr {
                    if !self.scope.has_variable(&path[0]) {
                        return Err(Error::parse_with_span(
                            format!("undefined variable {:?}", path[0]),
                            var.span,
                        ));
                    }
                }
            }
        }
        if self.peek_token().is_none() {
            return Err(Error::parse_with_span("missing value for command", op_span));
        }

        Ok(Some(PipelineDeclarations::new(kind, variables)))
    }

    fn parse_command(&mut self) -> Result<Command, Error> {
        let target = self.parse_operand()?;
        if matches!(target.expr, Expression::Nil) {
            return Err(Error::parse_with_span("nil is not a command", target.span));
        }

        let mut args = Vec::new();
        loop {
            match self.peek_token().map(|token| &token.kind) {
                None | Some(TokenKind::Pipe) => break,
                Some(TokenKind::RightParen) => {
                    let span = self.tokens[self.index].span;
                    return Err(Error::parse_with_span("unexpected right paren", span));
                }
                Some(TokenKind::Comma) => {
                    let span = self.tokens[self.index].span;
                    return Err(Error::parse_with_span("unexpected comma in command", span));
                }
                _ => args.push(self.parse_operand()?),
            }
        }

        Ok(Command::new(target, args))
    }

    fn parse_operand(&mut self) -> Result<Operand, Error> {
        let token = self
            .next_token()
            .ok_or_else(|| Error::parse("unexpected end of action", None))?;
        let span = token.span;
        let operand = match &token.kind {
            TokenKind::Identifier(name) => {
                if !self.scope.has_function(name) {
                    return Err(Error::parse_with_span(
                        format!("function {:?} not defined", name),
                        span,
                    ));
                }
                Operand::new(span, Expression::Identifier(name.clone()))
            }
            TokenKind::Field(name) => {
                let mut parts = vec![name.clone()];
                let span = self.extend_field_segments(&mut parts, span);
                Operand::new(span, Expression::Field(parts))
            }
            TokenKind::Variable(name) => {
                if !self.scope.has_variable(name) {
                    return Err(Error::parse_with_span(
                        format!("undefined variable {:?}", name),
                        span,
                    ));
                }
                let mut parts = vec![name.clone()];
                let span = self.extend_field_segments(&mut parts, span);
                Operand::new(span, Expression::Variable(parts))
            }
            TokenKind::Dot => Operand::new(span, Expression::Dot),
            TokenKind::StringLiteral(value) => {
                Operand::new(span, Expression::StringLiteral(value.clone()))
            }
            TokenKind::NumberLiteral(value) => {
                Operand::new(span, Expression::NumberLiteral(value.clone()))
            }
            TokenKind::Keyword(Keyword::Nil) => Operand::new(span, Expression::Nil),
            TokenKind::Keyword(Keyword::True) => Operand::new(span, Expression::BoolLiteral(true)),
            TokenKind::Keyword(Keyword::False) => {
                Operand::new(span, Expression::BoolLiteral(false))
            }
            TokenKind::LeftParen => self.parse_parenthesized_pipeline(span)?,
            other => {
                return Err(Error::parse_with_span(
                    format!("unexpected token in operand: {:?}", other),
                    span,
                ));
            }
        };
        Ok(operand)
    }

    fn parse_parenthesized_pipeline(&mut self, open: Span) -> Result<Operand, Error> {
        let mut depth = 1usize;
        let mut end = self.index;
        while end < self.tokens.len() {
            match self.tokens[end].kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            end += 1;
        }

        if depth != 0 {
            return Err(Error::parse_with_span("unclosed left paren", open));
        }

        let sub_tokens = &self.tokens[self.index..end];
        if sub_tokens.is_empty() {
            return Err(Error::parse_with_span("missing value for command", open));
        }

        let pipeline = ActionParser::new(sub_tokens, self.scope).parse_pipeline()?;
        if pipeline.declarations.is_some() {
            return Err(Error::parse_with_span(
                "pipeline declarations not allowed in expression",
                open,
            ));
        }

        let close = self.tokens[end].span;
        self.index = end + 1; // skip the closing ')'
        let operand = Operand::new(open.to(close), Expression::PipelineExpr(pipeline));

        // `(pipeline).field` chains directly onto the closing paren.
        let mut fields = Vec::new();
        let span = self.extend_field_segments(&mut fields, close);
        if fields.is_empty() {
            return Ok(operand);
        }
        Ok(Operand::new(
            open.to(span),
            Expression::Chain {
                node: Box::new(operand),
                fields,
            },
        ))
    }

    /// Appends `.segment` field tokens that follow `last_span` without a gap.
    /// Returns the span covering the extended operand.
    fn extend_field_segments(&mut self, parts: &mut Vec<String>, first_span: Span) -> Span {
        let mut last_span = first_span;
        while let Some(token) = self.tokens.get(self.index) {
            let TokenKind::Field(name) = &token.kind else {
                break;
            };
            if token.span.start != last_span.end {
                break;
            }
            parts.push(name.clone());
            last_span = token.span;
            self.index += 1;
        }
        first_span.to(last_span)
    }

    fn consume(&mut self, pred: impl Fn(&TokenKind) -> bool) -> bool {
        match self.peek_token() {
            Some(token) if pred(&token.kind) => {
                self.index += 1;
                true
            }
            _ => false,
        }
    }

    fn next_token(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn peek_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }
}

fn find_action_start(source: &str, from: usize, left: &str) -> Option<usize> {
    source[from..].find(left).map(|idx| from + idx)
}

/// Finds the right delimiter, skipping over quoted strings, raw strings and
/// comments so a delimiter inside them does not close the action.
fn find_action_end(source: &str, from: usize, right: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let right = right.as_bytes();
    let comment_at = comment_start(source, from);
    let mut i = from;
    let mut in_raw = false;
    let mut in_string = false;
    let mut in_char = false;
    let mut in_comment = false;
    while i < bytes.len() {
        let current = bytes[i];

        if in_comment {
            if bytes[i..].starts_with(b"*/") {
                in_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if in_raw {
            in_raw = current != b'`';
            i += 1;
            continue;
        }

        if in_string || in_char {
            match current {
                b'\\' => i += 2,
                b'"' if in_string => {
                    in_string = false;
                    i += 1;
                }
                b'\'' if in_char => {
                    in_char = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        if i == comment_at && bytes[i..].starts_with(b"/*") {
            in_comment = true;
            i += 2;
            continue;
        }

        match current {
            b'`' => in_raw = true,
            b'"' => in_string = true,
            b'\'' => in_char = true,
            _ if bytes[i..].starts_with(right) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}
