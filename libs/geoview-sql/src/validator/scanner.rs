// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A lexical scanner for PostgreSQL statements.
//!
//! This is not a parser: it only splits text into tokens while getting the quoting rules right, so
//! that keywords inside literals, quoted identifiers and comments are never mistaken for the real
//! thing.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Keyword or unquoted identifier
    Word,
    /// `"identifier"`
    QuotedIdentifier,
    /// `'text'`, `E'text'` or `$tag$text$tag$`
    StringLiteral,
    Number,
    /// `$1`, `$2`, ...
    Placeholder(usize),
    LineComment,
    BlockComment,
    /// Any other single character: `(`, `)`, `,`, `;`, `.`, operators
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Range<usize>,
}

impl Token<'_> {
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Whether this is the given keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    /// The identifier this token names, folded the way PostgreSQL folds it: unquoted words are
    /// lower-cased, quoted identifiers keep their case.
    pub fn identifier(&self) -> Option<String> {
        match self.kind {
            TokenKind::Word => Some(self.text.to_lowercase()),
            TokenKind::QuotedIdentifier => Some(
                self.text[1..self.text.len() - 1]
                    .replace("\"\"", "\""),
            ),
            _ => None,
        }
    }
}

/// A literal, quoted identifier or comment that runs to the end of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unterminated {
    pub what: &'static str,
    pub offset: usize,
}

#[derive(Debug)]
pub struct Scan<'a> {
    pub tokens: Vec<Token<'a>>,
    pub unterminated: Option<Unterminated>,
}

pub fn scan(sql: &str) -> Scan<'_> {
    Scanner {
        sql,
        bytes: sql.as_bytes(),
        pos: 0,
        tokens: vec![],
    }
    .run()
}

struct Scanner<'a> {
    sql: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token<'a>>,
}

impl<'a> Scanner<'a> {
    fn run(mut self) -> Scan<'a> {
        let mut unterminated = None;

        while self.pos < self.bytes.len() {
            let start = self.pos;
            let c = self.bytes[start];

            let result = match c {
                b if b.is_ascii_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                b'-' if self.peek(1) == Some(b'-') => Ok(self.line_comment()),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment(),
                b'\'' => self.quoted(b'\'', false, TokenKind::StringLiteral, "string literal"),
                b'E' | b'e' if self.peek(1) == Some(b'\'') => {
                    self.pos += 1;
                    self.quoted(b'\'', true, TokenKind::StringLiteral, "string literal")
                }
                b'"' => self.quoted(b'"', false, TokenKind::QuotedIdentifier, "quoted identifier"),
                b'$' => self.dollar(),
                b'0'..=b'9' => Ok(self.number()),
                b'.' if self.peek(1).is_some_and(|b| b.is_ascii_digit()) => Ok(self.number()),
                b if b == b'_' || b.is_ascii_alphabetic() || b >= 0x80 => Ok(self.word()),
                _ => {
                    // Advance by a whole character so spans stay on char boundaries
                    let ch = self.sql[start..].chars().next().unwrap_or(' ');
                    self.pos += ch.len_utf8();
                    Ok(TokenKind::Punct(ch))
                }
            };

            match result {
                Ok(kind) => self.push(kind, start),
                Err(what) => {
                    self.pos = self.bytes.len();
                    self.push(
                        match what {
                            "block comment" => TokenKind::BlockComment,
                            "quoted identifier" => TokenKind::QuotedIdentifier,
                            _ => TokenKind::StringLiteral,
                        },
                        start,
                    );
                    unterminated = Some(Unterminated {
                        what,
                        offset: start,
                    });
                    break;
                }
            }
        }

        Scan {
            tokens: self.tokens,
            unterminated,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.sql[start..self.pos],
            span: start..self.pos,
        });
    }

    fn line_comment(&mut self) -> TokenKind {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
        TokenKind::LineComment
    }

    /// Block comments nest in PostgreSQL
    fn block_comment(&mut self) -> Result<TokenKind, &'static str> {
        let mut depth = 0usize;

        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'/' && self.peek(1) == Some(b'*') {
                depth += 1;
                self.pos += 2;
            } else if self.bytes[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                depth -= 1;
                self.pos += 2;
                if depth == 0 {
                    return Ok(TokenKind::BlockComment);
                }
            } else {
                self.pos += 1;
            }
        }

        Err("block comment")
    }

    /// Scan from the opening quote to the closing one. A doubled quote is an escaped quote, and
    /// with `backslash_escapes` (for `E'...'`) so is `\'`.
    fn quoted(
        &mut self,
        quote: u8,
        backslash_escapes: bool,
        kind: TokenKind,
        what: &'static str,
    ) -> Result<TokenKind, &'static str> {
        self.pos += 1;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if backslash_escapes && b == b'\\' {
                self.pos += 2;
            } else if b == quote {
                if self.peek(1) == Some(quote) {
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    return Ok(kind);
                }
            } else {
                self.pos += 1;
            }
        }

        self.pos = self.pos.min(self.bytes.len());
        Err(what)
    }

    /// `$1` placeholders, `$$...$$` and `$tag$...$tag$` strings
    fn dollar(&mut self) -> Result<TokenKind, &'static str> {
        let start = self.pos;

        let digits = self.bytes[start + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 {
            self.pos = start + 1 + digits;
            let index = self.sql[start + 1..self.pos].parse().unwrap_or(usize::MAX);
            return Ok(TokenKind::Placeholder(index));
        }

        let tag_len = self.bytes[start + 1..]
            .iter()
            .enumerate()
            .take_while(|(i, b)| {
                **b == b'_' || b.is_ascii_alphabetic() || (*i > 0 && b.is_ascii_digit())
            })
            .count();

        if self.bytes.get(start + 1 + tag_len) != Some(&b'$') {
            self.pos += 1;
            return Ok(TokenKind::Punct('$'));
        }

        let delimiter = &self.sql[start..start + tag_len + 2];
        let body_start = start + delimiter.len();

        match self.sql[body_start..].find(delimiter) {
            Some(end) => {
                self.pos = body_start + end + delimiter.len();
                Ok(TokenKind::StringLiteral)
            }
            None => Err("dollar-quoted string"),
        }
    }

    fn number(&mut self) -> TokenKind {
        let mut seen_dot = false;
        let mut seen_exponent = false;

        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'0'..=b'9' | b'_' => self.pos += 1,
                b'.' if !seen_dot && !seen_exponent => {
                    seen_dot = true;
                    self.pos += 1;
                }
                b'e' | b'E' if !seen_exponent => {
                    let sign = usize::from(matches!(self.peek(1), Some(b'+' | b'-')));
                    if self.peek(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                        seen_exponent = true;
                        self.pos += 1 + sign;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }

        TokenKind::Number
    }

    fn word(&mut self) -> TokenKind {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == b'_' || b == b'$' || b.is_ascii_alphanumeric() || b >= 0x80 {
                self.pos += 1;
            } else {
                break;
            }
        }
        TokenKind::Word
    }
}
