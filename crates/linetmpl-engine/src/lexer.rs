// SPDX-License-Identifier: Apache-2.0 OR MIT
use std::str::Chars;

use crate::ast::Span;
use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    /// `$` or `$name`.
    Variable(String),
    /// `.name`, without the dot.
    Field(String),
    Dot,
    StringLiteral(String),
    /// Number or character constant, kept as written.
    NumberLiteral(String),
    Pipe,
    Assign,
    Declare,
    Comma,
    LeftParen,
    RightParen,
    Keyword(Keyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Else,
    End,
    Range,
    With,
    Define,
    Template,
    Block,
    Break,
    Continue,
    Nil,
    True,
    False,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::End => "end",
            Keyword::Range => "range",
            Keyword::With => "with",
            Keyword::Define => "define",
            Keyword::Template => "template",
            Keyword::Block => "block",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Nil => "nil",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }

    fn from_ident(ident: &str) -> Option<Self> {
        let keyword = match ident {
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "end" => Keyword::End,
            "range" => Keyword::Range,
            "with" => Keyword::With,
            "define" => Keyword::Define,
            "template" => Keyword::Template,
            "block" => Keyword::Block,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "nil" => Keyword::Nil,
            "true" => Keyword::True,
            "false" => Keyword::False,
            _ => return None,
        };
        Some(keyword)
    }

    /// Keywords that open, continue or close a control structure.
    pub fn is_control(&self) -> bool {
        !matches!(self, Keyword::Nil | Keyword::True | Keyword::False)
    }
}

/// Tokenises the body of a single action. `offset` is the byte position of
/// `input` inside the full template so token spans index the template source.
pub fn lex_action(input: &str, offset: usize) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(input, offset);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    chars: Chars<'a>,
    pos: usize,
    offset: usize,
    peeked: Option<char>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, offset: usize) -> Self {
        Self {
            chars: input.chars(),
            pos: 0,
            offset,
            peeked: None,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.skip_whitespace();

        let start = self.pos;
        let chr = match self.bump_char() {
            Some(c) => c,
            None => return Ok(None),
        };

        let kind = match chr {
            '.' => match self.peek_char() {
                Some(c) if c.is_ascii_digit() => TokenKind::NumberLiteral(self.read_number('.', start)?),
                Some(c) if is_identifier_start(c) => {
                    let first = self.bump_char().unwrap_or(c);
                    TokenKind::Field(self.read_identifier(first))
                }
                _ => TokenKind::Dot,
            },
            '$' => {
                let mut name = String::from("$");
                if let Some(c) = self.peek_char().filter(|c| is_identifier_part(*c)) {
                    let first = self.bump_char().unwrap_or(c);
                    name.push_str(&self.read_identifier(first));
                }
                TokenKind::Variable(name)
            }
            '|' => TokenKind::Pipe,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '=' => TokenKind::Assign,
            ':' => {
                if self.peek_char() == Some('=') {
                    self.bump_char();
                    TokenKind::Declare
                } else {
                    return Err(Error::parse_with_span(
                        "expected :=",
                        self.span_from(start),
                    ));
                }
            }
            '"' => TokenKind::StringLiteral(self.read_string(start)?),
            '`' => TokenKind::StringLiteral(self.read_raw_string(start)?),
            '\'' => TokenKind::NumberLiteral(self.read_char_constant(start)?),
            '+' | '-' if self.peek_char().is_some_and(|c| c.is_ascii_digit() || c == '.') => {
                TokenKind::NumberLiteral(self.read_number(chr, start)?)
            }
            c if c.is_ascii_digit() => TokenKind::NumberLiteral(self.read_number(c, start)?),
            c if is_identifier_start(c) => {
                let ident = self.read_identifier(c);
                match Keyword::from_ident(&ident) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier(ident),
                }
            }
            _ => {
                return Err(Error::parse(
                    format!("unexpected character '{}'", chr),
                    Some(self.span_from(start)),
                ));
            }
        };

        Ok(Some(Token {
            kind,
            span: self.span_from(start),
        }))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.bump_char();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self, first: char) -> String {
        let mut ident = String::new();
        ident.push(first);
        while let Some(ch) = self.peek_char() {
            if !is_identifier_part(ch) {
                break;
            }
            self.bump_char();
            ident.push(ch);
        }
        ident
    }

    fn read_string(&mut self, start: usize) -> Result<String, Error> {
        // `\x` and octal escapes produce raw bytes, so decode into a buffer.
        let mut bytes = Vec::new();
        while let Some(ch) = self.bump_char() {
            match ch {
                '"' => {
                    return String::from_utf8(bytes).map_err(|_| {
                        Error::parse_with_span(
                            "invalid UTF-8 in string literal",
                            self.span_from(start),
                        )
                    });
                }
                '\n' => break,
                '\\' => self.read_escape(start, &mut bytes)?,
                other => push_char(&mut bytes, other),
            }
        }
        Err(Error::parse_with_span(
            "unterminated quoted string",
            self.span_from(start),
        ))
    }

    /// Decodes one escape after a backslash. Accepts Go's set: single
    /// letters, `\xHH`, `\ooo`, `\uHHHH` and `\UHHHHHHHH`.
    fn read_escape(&mut self, start: usize, out: &mut Vec<u8>) -> Result<(), Error> {
        let escape_start = self.pos - 1;
        let Some(kind) = self.bump_char() else {
            return Err(Error::parse_with_span(
                "unterminated escape sequence",
                self.span_from(start),
            ));
        };
        let simple = match kind {
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{b}'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            _ => None,
        };
        if let Some(decoded) = simple {
            push_char(out, decoded);
            return Ok(());
        }

        match kind {
            'x' => {
                let value = self.read_escape_digits(2, 16, escape_start, kind)?;
                out.push(byte_value(value));
            }
            '0'..='7' => {
                let high = kind.to_digit(8).unwrap_or_default();
                let value = high * 64 + self.read_escape_digits(2, 8, escape_start, kind)?;
                if value > 0xff {
                    return Err(self.bad_escape(escape_start, kind));
                }
                out.push(byte_value(value));
            }
            'u' | 'U' => {
                let len = if kind == 'u' { 4 } else { 8 };
                let value = self.read_escape_digits(len, 16, escape_start, kind)?;
                let decoded =
                    char::from_u32(value).ok_or_else(|| self.bad_escape(escape_start, kind))?;
                push_char(out, decoded);
            }
            _ => return Err(self.bad_escape(escape_start, kind)),
        }
        Ok(())
    }

    fn read_escape_digits(
        &mut self,
        count: usize,
        radix: u32,
        escape_start: usize,
        kind: char,
    ) -> Result<u32, Error> {
        let mut value = 0u32;
        for _ in 0..count {
            let Some(digit) = self.peek_char().and_then(|c| c.to_digit(radix)) else {
                return Err(self.bad_escape(escape_start, kind));
            };
            self.bump_char();
            value = value * radix + digit;
        }
        Ok(value)
    }

    fn bad_escape(&self, escape_start: usize, kind: char) -> Error {
        Error::parse_with_span(
            format!("invalid escape sequence \\{kind} in string literal"),
            Span::new(self.offset + escape_start, self.offset + self.pos),
        )
    }

    fn read_raw_string(&mut self, start: usize) -> Result<String, Error> {
        let mut literal = String::new();
        while let Some(ch) = self.bump_char() {
            match ch {
                '`' => return Ok(literal),
                '\r' => {}
                _ => literal.push(ch),
            }
        }
        Err(Error::parse_with_span(
            "unterminated raw quoted string",
            self.span_from(start),
        ))
    }

    fn read_char_constant(&mut self, start: usize) -> Result<String, Error> {
        let mut literal = String::from("'");
        while let Some(ch) = self.bump_char() {
            literal.push(ch);
            match ch {
                '\'' if literal.len() > 2 => return Ok(literal),
                '\\' => {
                    if let Some(next) = self.bump_char() {
                        literal.push(next);
                    }
                }
                '\n' => break,
                _ => {}
            }
        }
        Err(Error::parse_with_span(
            "unterminated character constant",
            self.span_from(start),
        ))
    }

    fn read_number(&mut self, first: char, start: usize) -> Result<String, Error> {
        let mut literal = String::new();
        literal.push(first);

        while let Some(ch) = self.peek_char() {
            let exponent_sign = matches!(ch, '+' | '-')
                && literal
                    .chars()
                    .last()
                    .is_some_and(|last| exponent_marker(&literal, last));
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || exponent_sign {
                self.bump_char();
                literal.push(ch);
            } else {
                break;
            }
        }

        if is_valid_number(&literal) {
            Ok(literal)
        } else {
            Err(Error::parse_with_span(
                format!("bad number syntax: {:?}", literal),
                self.span_from(start),
            ))
        }
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = match self.peeked.take() {
            Some(peek) => peek,
            None => self.chars.next()?,
        };
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn peek_char(&mut self) -> Option<char> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.offset + start, self.offset + self.pos)
    }
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

// Callers only pass values already checked to fit in a byte.
fn byte_value(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

// `e`/`E` mark a decimal exponent, `p`/`P` a hex one.
fn exponent_marker(literal: &str, last: char) -> bool {
    let hex = literal
        .trim_start_matches(['+', '-'])
        .get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("0x"));
    if hex {
        matches!(last, 'p' | 'P')
    } else {
        matches!(last, 'e' | 'E')
    }
}

fn is_valid_number(literal: &str) -> bool {
    let unsigned = literal.trim_start_matches(['+', '-']);
    let digits = unsigned.strip_suffix('i').unwrap_or(unsigned).replace('_', "");
    if digits.is_empty() {
        return false;
    }

    let radix = match digits.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };

    match radix {
        Some(16) if digits.contains(['p', 'P']) || digits.contains('.') => {
            // Hex floats: mantissa digits are hex, exponent is decimal.
            let body = &digits[2..];
            let (mantissa, exponent) = body.split_once(['p', 'P']).unwrap_or((body, "0"));
            let mantissa_ok = !mantissa.is_empty()
                && mantissa.chars().all(|c| c.is_ascii_hexdigit() || c == '.');
            mantissa_ok && exponent.parse::<i32>().is_ok()
        }
        Some(radix) => u64::from_str_radix(&digits[2..], radix).is_ok(),
        None => digits.parse::<f64>().is_ok(),
    }
}
