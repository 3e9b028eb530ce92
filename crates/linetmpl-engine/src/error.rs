// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::ast::Span;
use thiserror::Error;

/// Unified error type for the template engine.
///
/// Parse errors carry the `Span` pointing at the offending region and, once
/// the parser has resolved it, the 1-based line of that region. Export errors
/// are raised by tree visitors and carry the `pos` of the rejected node.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {}{message}", line_prefix(*line))]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        span: Option<Span>,
        line: Option<usize>,
    },
    #[error("export error at {pos}: {message}")]
    Export { message: String, pos: usize },
}

fn line_prefix(line: Option<usize>) -> String {
    match line {
        Some(line) => format!("line {line}: "),
        None => String::new(),
    }
}

impl Error {
    pub fn parse(message: impl Into<String>, span: Option<Span>) -> Self {
        Error::Parse {
            message: message.into(),
            source: None,
            span,
            line: None,
        }
    }

    pub fn parse_with_span(message: impl Into<String>, span: Span) -> Self {
        Self::parse(message, Some(span))
    }

    pub fn export(message: impl Into<String>, pos: usize) -> Self {
        Error::Export {
            message: message.into(),
            pos,
        }
    }

    /// Span of the offending source region, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse { span, .. } => *span,
            Error::Export { .. } => None,
        }
    }

    /// Fills in the line number from `source` for span-carrying parse errors.
    pub(crate) fn with_line_from(mut self, source: &str) -> Self {
        if let Error::Parse {
            span: Some(span),
            line,
            ..
        } = &mut self
        {
            if line.is_none() {
                *line = Some(line_of(source, span.start));
            }
        }
        self
    }
}

/// 1-based line containing byte offset `pos`.
pub fn line_of(source: &str, pos: usize) -> usize {
    let end = pos.min(source.len());
    source.as_bytes()[..end]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}
