// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Tokenizer for build manifests.
//!
//! The scanner is hand-written and byte-oriented. Statement-level tokens are
//! produced by [`Lexer::read_token`]; identifier and eval-string payloads
//! are pulled out by the dedicated `read_ident` and `read_eval_string`
//! methods, mirroring the line-oriented shape of the grammar. The input
//! buffer must end with a NUL sentinel byte, which scans treat as
//! end-of-file wherever it appears.

#[cfg(feature = "term-colors")]
use colored::Colorize;
use thiserror::Error;

use crate::eval::EvalString;

/// A hard parse failure. The payload is the fully formatted diagnostic:
/// `file:line:col: message`, usually followed by the offending source line
/// and a caret marking the error position.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    /// An error with no source position, e.g. a failure to read the
    /// top-level manifest.
    pub(crate) fn bare(message: impl Into<String>) -> ParseError {
        ParseError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A lexical token. Tokens carry no payload; positions live in the lexer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    Build,
    Colon,
    Default,
    End,
    Eof,
    Equals,
    Error,
    For,
    Ident,
    In,
    Include,
    Indent,
    Newline,
    Pipe,
    Pipe2,
    PlusEq,
    Pool,
    Rule,
    Subninja,
}

impl Token {
    /// Human-readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Token::Build => "'build'",
            Token::Colon => "':'",
            Token::Default => "'default'",
            Token::End => "'end'",
            Token::Eof => "eof",
            Token::Equals => "'='",
            Token::Error => "lexing error",
            Token::For => "'for'",
            Token::Ident => "identifier",
            Token::In => "'in'",
            Token::Include => "'include'",
            Token::Indent => "indent",
            Token::Newline => "newline",
            Token::Pipe => "'|'",
            Token::Pipe2 => "'||'",
            Token::PlusEq => "'+='",
            Token::Pool => "'pool'",
            Token::Rule => "'rule'",
            Token::Subninja => "'subninja'",
        }
    }

    /// Extra hint appended to "expected X, got Y" diagnostics.
    pub fn error_hint(self) -> &'static str {
        match self {
            Token::Colon => " ($ also escapes colons, so you may need $: instead of :)",
            _ => "",
        }
    }
}

/// A saved scan position, used to rescan loop bodies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LexerPos(usize);

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'-')
}

/// Variable references written without braces use a narrower alphabet, so
/// that `$foo.o` reads as `${foo}.o`.
fn is_simple_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-')
}

fn keyword_lookup(word: &[u8]) -> Option<Token> {
    match word {
        b"build" => Some(Token::Build),
        b"default" => Some(Token::Default),
        b"end" => Some(Token::End),
        b"for" => Some(Token::For),
        b"in" => Some(Token::In),
        b"include" => Some(Token::Include),
        b"pool" => Some(Token::Pool),
        b"rule" => Some(Token::Rule),
        b"subninja" => Some(Token::Subninja),
        _ => None,
    }
}

pub struct Lexer {
    filename: String,
    input: Vec<u8>,
    ofs: usize,
    last_token: usize,
}

impl Lexer {
    pub fn new() -> Lexer {
        Lexer {
            filename: String::new(),
            input: vec![0],
            ofs: 0,
            last_token: 0,
        }
    }

    /// Begins scanning `input`, which must end with a NUL sentinel byte.
    pub fn start(&mut self, filename: impl Into<String>, input: Vec<u8>) {
        debug_assert_eq!(input.last(), Some(&0));
        self.filename = filename.into();
        self.input = input;
        self.ofs = 0;
        self.last_token = 0;
    }

    fn peek_at(&self, ofs: usize) -> u8 {
        self.input.get(ofs).copied().unwrap_or(0)
    }

    fn ascii(&self, start: usize, end: usize) -> String {
        self.input[start..end].iter().map(|&b| b as char).collect()
    }

    fn finish(&mut self, start: usize, token: Token) -> Token {
        self.last_token = start;
        if token != Token::Newline && token != Token::Eof {
            self.eat_whitespace();
        }
        token
    }

    /// Reads the next statement-level token. Comments and blank-line
    /// indentation are consumed here; leading whitespace at a token position
    /// yields a single [`Token::Indent`].
    pub fn read_token(&mut self) -> Token {
        loop {
            let start = self.ofs;
            match self.peek_at(start) {
                b' ' | b'#' | b'\r' | b'\n' => {
                    let mut p = start;
                    while self.peek_at(p) == b' ' {
                        p += 1;
                    }
                    match self.peek_at(p) {
                        b'#' => {
                            let mut q = p + 1;
                            while !matches!(self.peek_at(q), 0 | b'\r' | b'\n') {
                                q += 1;
                            }
                            let end = match self.peek_at(q) {
                                b'\n' => Some(q + 1),
                                b'\r' if self.peek_at(q + 1) == b'\n' => Some(q + 2),
                                _ => None,
                            };
                            match end {
                                Some(end) => {
                                    self.ofs = end;
                                    continue;
                                }
                                // A comment not terminated by a newline.
                                None if p > start => {
                                    self.ofs = p;
                                    return self.finish(start, Token::Indent);
                                }
                                None => {
                                    self.ofs = start + 1;
                                    return self.finish(start, Token::Error);
                                }
                            }
                        }
                        b'\n' => {
                            self.ofs = p + 1;
                            return self.finish(start, Token::Newline);
                        }
                        b'\r' if self.peek_at(p + 1) == b'\n' => {
                            self.ofs = p + 2;
                            return self.finish(start, Token::Newline);
                        }
                        _ if p > start => {
                            self.ofs = p;
                            return self.finish(start, Token::Indent);
                        }
                        _ => {
                            // a bare '\r' with no '\n'
                            self.ofs = start + 1;
                            return self.finish(start, Token::Error);
                        }
                    }
                }
                b'=' => {
                    self.ofs = start + 1;
                    return self.finish(start, Token::Equals);
                }
                b'+' if self.peek_at(start + 1) == b'=' => {
                    self.ofs = start + 2;
                    return self.finish(start, Token::PlusEq);
                }
                b':' => {
                    self.ofs = start + 1;
                    return self.finish(start, Token::Colon);
                }
                b'|' => {
                    if self.peek_at(start + 1) == b'|' {
                        self.ofs = start + 2;
                        return self.finish(start, Token::Pipe2);
                    }
                    self.ofs = start + 1;
                    return self.finish(start, Token::Pipe);
                }
                0 => {
                    self.ofs = start + 1;
                    return self.finish(start, Token::Eof);
                }
                c if is_ident_char(c) => {
                    let mut p = start + 1;
                    while is_ident_char(self.peek_at(p)) {
                        p += 1;
                    }
                    self.ofs = p;
                    let token = keyword_lookup(&self.input[start..p]).unwrap_or(Token::Ident);
                    return self.finish(start, token);
                }
                _ => {
                    self.ofs = start + 1;
                    return self.finish(start, Token::Error);
                }
            }
        }
    }

    /// Reads a token and consumes it only if it matches `expected`.
    pub fn peek_token(&mut self, expected: Token) -> bool {
        let token = self.read_token();
        if token == expected {
            return true;
        }
        self.unread_token();
        false
    }

    /// Pushes the most recently read token back. Only one token of pushback
    /// is supported.
    pub fn unread_token(&mut self) {
        self.ofs = self.last_token;
    }

    /// Skips horizontal whitespace and `$`-newline line continuations.
    pub fn eat_whitespace(&mut self) {
        loop {
            match self.peek_at(self.ofs) {
                b' ' => {
                    while self.peek_at(self.ofs) == b' ' {
                        self.ofs += 1;
                    }
                }
                b'$' if self.peek_at(self.ofs + 1) == b'\n' => {
                    self.ofs += 2;
                }
                b'$' if self.peek_at(self.ofs + 1) == b'\r' && self.peek_at(self.ofs + 2) == b'\n' => {
                    self.ofs += 3;
                }
                _ => return,
            }
        }
    }

    /// Reads an identifier into `out`, returning `false` without consuming
    /// anything if the input does not start with one.
    pub fn read_ident(&mut self, out: &mut String) -> bool {
        let start = self.ofs;
        let mut p = start;
        while is_ident_char(self.peek_at(p)) {
            p += 1;
        }
        if p == start {
            self.last_token = start;
            return false;
        }
        out.clear();
        out.push_str(&self.ascii(start, p));
        self.last_token = start;
        self.ofs = p;
        self.eat_whitespace();
        true
    }

    /// Scans an eval string into `eval`.
    ///
    /// In path mode the string ends at an unescaped space, `:`, `|`, or
    /// newline, which is left unconsumed for the token reader; in value mode
    /// only a newline ends it, and the newline is consumed. When a `$(name)`
    /// expansion is encountered the scan stops early, the name is stored in
    /// `special`, and the caller resumes against the expanded text. Passing
    /// `special: None` makes `$(name)` an error, which forbids nesting.
    pub fn read_eval_string(
        &mut self,
        eval: &mut EvalString,
        mut special: Option<&mut String>,
        path: bool,
    ) -> Result<(), ParseError> {
        loop {
            let start = self.ofs;
            self.last_token = start;
            match self.peek_at(start) {
                0 => return Err(self.error("unexpected EOF")),
                b'\n' => {
                    if !path {
                        self.ofs = start + 1;
                    }
                    break;
                }
                b'\r' => {
                    if self.peek_at(start + 1) != b'\n' {
                        return Err(self.error(self.describe_last_error()));
                    }
                    if !path {
                        self.ofs = start + 2;
                    }
                    break;
                }
                c @ (b' ' | b':' | b'|') => {
                    if path {
                        break;
                    }
                    eval.add_text(&(c as char).to_string());
                    self.ofs = start + 1;
                }
                b'$' => match self.peek_at(start + 1) {
                    b'$' => {
                        eval.add_text("$");
                        self.ofs = start + 2;
                    }
                    b' ' => {
                        eval.add_text(" ");
                        self.ofs = start + 2;
                    }
                    b':' => {
                        eval.add_text(":");
                        self.ofs = start + 2;
                    }
                    c @ (b'\n' | b'\r') => {
                        // Line continuation, swallowing the next line's
                        // indentation. In value position it reads as a
                        // single space; in a path it reads as nothing.
                        let mut p = start + 2;
                        if c == b'\r' {
                            if self.peek_at(p) != b'\n' {
                                return Err(self.bad_escape());
                            }
                            p += 1;
                        }
                        while self.peek_at(p) == b' ' {
                            p += 1;
                        }
                        self.ofs = p;
                        if !path {
                            eval.add_text(" ");
                        }
                    }
                    b'{' => {
                        let mut p = start + 2;
                        while is_ident_char(self.peek_at(p)) {
                            p += 1;
                        }
                        if p == start + 2 || self.peek_at(p) != b'}' {
                            return Err(self.bad_escape());
                        }
                        let name = self.ascii(start + 2, p);
                        eval.add_variable(&name);
                        self.ofs = p + 1;
                    }
                    b'(' => {
                        let mut p = start + 2;
                        while is_ident_char(self.peek_at(p)) {
                            p += 1;
                        }
                        if p == start + 2 || self.peek_at(p) != b')' {
                            return Err(self.bad_escape());
                        }
                        match special.take() {
                            Some(out) => {
                                out.clear();
                                out.push_str(&self.ascii(start + 2, p));
                                self.ofs = p + 1;
                                break;
                            }
                            None => {
                                return Err(self.error("nested $( ) expansion is not supported"))
                            }
                        }
                    }
                    c if is_simple_ident_char(c) => {
                        let mut p = start + 1;
                        while is_simple_ident_char(self.peek_at(p)) {
                            p += 1;
                        }
                        let name = self.ascii(start + 1, p);
                        eval.add_variable(&name);
                        self.ofs = p;
                    }
                    _ => return Err(self.bad_escape()),
                },
                _ => {
                    let mut p = start;
                    while !matches!(self.peek_at(p), 0 | b'$' | b' ' | b':' | b'|' | b'\r' | b'\n')
                    {
                        p += 1;
                    }
                    eval.add_text(&String::from_utf8_lossy(&self.input[start..p]));
                    self.ofs = p;
                }
            }
        }
        if path {
            self.eat_whitespace();
        }
        // Value strings end in newlines, so there is no whitespace to eat.
        Ok(())
    }

    fn bad_escape(&self) -> ParseError {
        self.error("bad $-escape (literal $ must be written as $$)")
    }

    /// Remembers the position of the next token.
    pub fn store_token_pos(&self) -> LexerPos {
        LexerPos(self.ofs)
    }

    /// Rewinds the scanner to a previously stored position.
    pub fn restore_token_pos(&mut self, pos: LexerPos) {
        self.ofs = pos.0;
    }

    /// Describes the most recent [`Token::Error`].
    pub fn describe_last_error(&self) -> &'static str {
        if self.peek_at(self.last_token) == b'\t' {
            return "tabs are not allowed, use spaces";
        }
        "lexing error"
    }

    /// Formats a positioned diagnostic for the most recently read token:
    /// `file:line:col: message`, followed by the offending line with a
    /// caret, truncated for very long lines.
    pub fn error(&self, message: &str) -> ParseError {
        let mut line = 1;
        let mut line_start = 0;
        for (i, &c) in self.input[..self.last_token].iter().enumerate() {
            if c == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let col = self.last_token - line_start;

        let mut err = format!(
            "{}: {}\n",
            white_bold(&format!("{}:{}:{}", self.filename, line, col + 1)),
            message
        );

        const TRUNCATE_COLUMN: usize = 72;
        if col > 0 && col < TRUNCATE_COLUMN {
            let mut len = 0;
            let mut truncated = true;
            while len < TRUNCATE_COLUMN {
                match self.peek_at(line_start + len) {
                    0 | b'\r' | b'\n' => {
                        truncated = false;
                        break;
                    }
                    _ => len += 1,
                }
            }
            err.push_str(&String::from_utf8_lossy(
                &self.input[line_start..line_start + len],
            ));
            if truncated {
                err.push_str("...");
            }
            err.push('\n');
            err.push_str(&" ".repeat(col));
            err.push_str(&green_bold("^ near here"));
        }

        ParseError(err)
    }
}

impl Default for Lexer {
    fn default() -> Lexer {
        Lexer::new()
    }
}

// coloring functions

#[cfg(feature = "term-colors")]
fn green_bold(str: &str) -> String {
    str.green().bold().to_string()
}
#[cfg(not(feature = "term-colors"))]
fn green_bold(str: &str) -> String {
    str.to_string()
}

#[cfg(feature = "term-colors")]
fn white_bold(str: &str) -> String {
    str.white().bold().to_string()
}
#[cfg(not(feature = "term-colors"))]
fn white_bold(str: &str) -> String {
    str.to_string()
}
