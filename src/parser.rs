// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! The top-level manifest parser.
//!
//! [`ManifestParser`] drives the lexer statement by statement and writes
//! rules, pools, edges, and defaults into a [`State`]. Parsing is
//! single-pass and aborts on the first error; `include` and `subninja`
//! recurse into a fresh parser over the same state.

use std::fs;
use std::io;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::canon::canonicalize_path;
use crate::env::{Rule, ScopeEnv, ScopeRef};
use crate::eval::EvalString;
use crate::graph::{ForLoop, Pool, State};
use crate::lexer::{Lexer, ParseError, Token};
use crate::version;

/// What to do when two edges claim the same output path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DupeEdgeAction {
    /// Warn and drop the duplicate output from the later edge.
    Warn,
    /// Fail the parse.
    Error,
}

/// Parser configuration.
#[derive(Clone, Copy, Debug)]
pub struct ParserOptions {
    pub dupe_edge_action: DupeEdgeAction,
    /// Suppresses non-fatal warnings; used by tests.
    pub quiet: bool,
}

impl Default for ParserOptions {
    fn default() -> ParserOptions {
        ParserOptions {
            dupe_edge_action: DupeEdgeAction::Warn,
            quiet: false,
        }
    }
}

/// An error that can occur while reading a manifest file
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("No such file or directory")]
    NotFound,
    #[error("{0}")]
    Io(String),
}

/// Narrow file-loading interface, so parsing is testable without touching
/// a filesystem.
pub trait FileReader {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, ReadError>;
}

/// [`FileReader`] over the real filesystem.
pub struct DiskFileReader;

impl FileReader for DiskFileReader {
    fn read_file(&self, path: &str) -> Result<Vec<u8>, ReadError> {
        fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ReadError::NotFound,
            _ => ReadError::Io(err.to_string()),
        })
    }
}

/// Parses manifests into a [`State`].
pub struct ManifestParser<'a> {
    state: &'a mut State,
    file_reader: &'a dyn FileReader,
    options: ParserOptions,
    /// The scope new bindings and rules land in.
    env: ScopeRef,
    lexer: Lexer,
    /// Secondary lexer for `$(name)` expansions.
    sublexer: Lexer,
    /// Name of the variable the sublexer is currently expanding.
    subinput: Option<String>,
}

impl<'a> ManifestParser<'a> {
    pub fn new(
        state: &'a mut State,
        file_reader: &'a dyn FileReader,
        options: ParserOptions,
    ) -> ManifestParser<'a> {
        let env = state.scopes.root();
        ManifestParser {
            state,
            file_reader,
            options,
            env,
            lexer: Lexer::new(),
            sublexer: Lexer::new(),
            subinput: None,
        }
    }

    fn with_scope(
        state: &'a mut State,
        file_reader: &'a dyn FileReader,
        options: ParserOptions,
        env: ScopeRef,
    ) -> ManifestParser<'a> {
        let mut parser = ManifestParser::new(state, file_reader, options);
        parser.env = env;
        parser
    }

    /// Loads and parses `filename` through the file reader.
    pub fn load(&mut self, filename: &str) -> Result<(), ParseError> {
        let contents = self
            .file_reader
            .read_file(filename)
            .map_err(|err| ParseError::bare(format!("loading '{}': {}", filename, err)))?;
        self.parse(filename, contents)
    }

    /// Parses an in-memory manifest. The NUL sentinel the lexer needs is
    /// appended here.
    pub fn parse(&mut self, filename: &str, mut contents: Vec<u8>) -> Result<(), ParseError> {
        contents.push(0);
        self.lexer.start(filename, contents);

        loop {
            let token = self.lexer.read_token();
            match token {
                Token::Pool => self.parse_pool()?,
                Token::Build => self.parse_edge()?,
                Token::Rule => self.parse_rule()?,
                Token::Default => self.parse_default()?,
                Token::Ident => {
                    self.lexer.unread_token();
                    let (name, value, pluseq) = self.parse_let()?;
                    let value = value.evaluate(&ScopeEnv::new(&self.state.scopes, self.env));
                    // Check the required version immediately, so a manifest
                    // written for a newer dialect fails before any
                    // syntactic surprises later in the file.
                    if name == "ninja_required_version" {
                        if let Err(err) = version::check_version(&value) {
                            return Err(self.lexer.error(&err.to_string()));
                        }
                    }
                    if pluseq {
                        let mut appended = self
                            .state
                            .scopes
                            .lookup_variable(self.env, &name)
                            .to_string();
                        appended.push_str(&value);
                        self.state.scopes.add_binding(self.env, name, appended);
                    } else {
                        self.state.scopes.add_binding(self.env, name, value);
                    }
                }
                Token::Include => self.parse_file_include(false)?,
                Token::Subninja => self.parse_file_include(true)?,
                Token::For => self.parse_for()?,
                Token::End => self.parse_end()?,
                Token::Newline => {}
                Token::Eof => {
                    if !self.state.forloops.is_empty() {
                        return Err(self.lexer.error("'end for' expected"));
                    }
                    return Ok(());
                }
                Token::Error => {
                    return Err(self.lexer.error(self.lexer.describe_last_error()))
                }
                _ => return Err(self.lexer.error(&format!("unexpected {}", token.name()))),
            }
        }
    }

    fn parse_pool(&mut self) -> Result<(), ParseError> {
        let mut name = String::new();
        if !self.lexer.read_ident(&mut name) {
            return Err(self.lexer.error("expected pool name"));
        }
        self.expect_token(Token::Newline)?;

        if self.state.lookup_pool(&name).is_some() {
            return Err(self.lexer.error(&format!("duplicate pool '{}'", name)));
        }

        let mut depth = None;
        while self.lexer.peek_token(Token::Indent) {
            let (key, value) = self.parse_let_eq()?;
            if key != "depth" {
                return Err(self.lexer.error(&format!("unexpected variable '{}'", key)));
            }
            let depth_string = value.evaluate(&ScopeEnv::new(&self.state.scopes, self.env));
            depth = match depth_string.parse::<u32>() {
                Ok(depth) => Some(depth),
                Err(_) => return Err(self.lexer.error("invalid pool depth")),
            };
        }

        match depth {
            Some(depth) => {
                self.state.add_pool(Pool::new(name, depth));
                Ok(())
            }
            None => Err(self.lexer.error("expected 'depth =' line")),
        }
    }

    fn parse_rule(&mut self) -> Result<(), ParseError> {
        let mut name = String::new();
        if !self.lexer.read_ident(&mut name) {
            return Err(self.lexer.error("expected rule name"));
        }
        self.expect_token(Token::Newline)?;

        if self
            .state
            .scopes
            .lookup_rule_current_scope(self.env, &name)
            .is_some()
        {
            return Err(self.lexer.error(&format!("duplicate rule '{}'", name)));
        }

        let mut rule = Rule::new(name);
        while self.lexer.peek_token(Token::Indent) {
            let (key, value) = self.parse_let_eq()?;
            if !Rule::is_reserved_binding(&key) {
                // No rule-local custom variables; everything else lives in
                // the enclosing scope.
                return Err(self.lexer.error(&format!("unexpected variable '{}'", key)));
            }
            rule.add_binding(&key, value);
        }

        let rspfile_empty = rule.binding("rspfile").map_or(true, EvalString::is_empty);
        let rspfile_content_empty = rule
            .binding("rspfile_content")
            .map_or(true, EvalString::is_empty);
        if rspfile_empty != rspfile_content_empty {
            return Err(self
                .lexer
                .error("rspfile and rspfile_content need to be both specified"));
        }

        if rule.binding("command").map_or(true, EvalString::is_empty) {
            return Err(self.lexer.error("expected 'command =' line"));
        }

        self.state.scopes.add_rule(self.env, Rc::new(rule));
        Ok(())
    }

    fn parse_default(&mut self) -> Result<(), ParseError> {
        let mut eval = self.read_path()?;
        if eval.is_empty() {
            return Err(self.lexer.error("expected target name"));
        }

        loop {
            let mut path = eval.evaluate(&ScopeEnv::new(&self.state.scopes, self.env));
            let slash_bits = canonicalize_path(&mut path)
                .map_err(|err| self.lexer.error(&err.to_string()))?;
            self.state.add_default(&path, slash_bits);

            eval = self.read_path()?;
            if eval.is_empty() {
                break;
            }
        }

        self.expect_token(Token::Newline)
    }

    fn parse_edge(&mut self) -> Result<(), ParseError> {
        let mut outs = Vec::new();
        {
            let mut out = self.read_path()?;
            if out.is_empty() {
                return Err(self.lexer.error("expected path"));
            }
            loop {
                outs.push(out);
                out = self.read_path()?;
                if out.is_empty() {
                    break;
                }
            }
        }

        let mut implicit_outs = 0;
        if self.lexer.peek_token(Token::Pipe) {
            loop {
                let out = self.read_path()?;
                if out.is_empty() {
                    break;
                }
                outs.push(out);
                implicit_outs += 1;
            }
        }

        self.expect_token(Token::Colon)?;

        let mut rule_name = String::new();
        if !self.lexer.read_ident(&mut rule_name) {
            return Err(self.lexer.error("expected build command name"));
        }
        let rule = match self.state.scopes.lookup_rule(self.env, &rule_name) {
            Some(rule) => Rc::clone(rule),
            None => {
                return Err(self
                    .lexer
                    .error(&format!("unknown build rule '{}'", rule_name)))
            }
        };

        let mut ins = Vec::new();
        loop {
            let input = self.read_path()?;
            if input.is_empty() {
                break;
            }
            ins.push(input);
        }

        let mut implicit_deps = 0;
        if self.lexer.peek_token(Token::Pipe) {
            loop {
                let input = self.read_path()?;
                if input.is_empty() {
                    break;
                }
                ins.push(input);
                implicit_deps += 1;
            }
        }

        let mut order_only_deps = 0;
        if self.lexer.peek_token(Token::Pipe2) {
            loop {
                let input = self.read_path()?;
                if input.is_empty() {
                    break;
                }
                ins.push(input);
                order_only_deps += 1;
            }
        }

        self.expect_token(Token::Newline)?;

        // Bindings on edges are rare, so a child scope is only allocated
        // when the edge actually has some.
        let mut has_indent = self.lexer.peek_token(Token::Indent);
        let env = if has_indent {
            self.state.scopes.new_child(self.env)
        } else {
            self.env
        };
        while has_indent {
            let (key, value, pluseq) = self.parse_let()?;
            // Edge bindings are evaluated eagerly, against the enclosing
            // scope; later changes to that scope do not affect the edge.
            let value = value.evaluate(&ScopeEnv::new(&self.state.scopes, self.env));
            if pluseq {
                let mut appended = self.state.scopes.lookup_variable(env, &key).to_string();
                appended.push_str(&value);
                self.state.scopes.add_binding(env, key, appended);
            } else {
                self.state.scopes.add_binding(env, key, value);
            }
            has_indent = self.lexer.peek_token(Token::Indent);
        }

        let edge = self.state.add_edge(Rc::clone(&rule), env);

        let pool_name = self.state.edge_binding(&self.state[edge], "pool");
        if !pool_name.is_empty() {
            let pool = match self.state.lookup_pool(&pool_name) {
                Some(pool) => Rc::clone(pool),
                None => {
                    return Err(self
                        .lexer
                        .error(&format!("unknown pool name '{}'", pool_name)))
                }
            };
            self.state[edge].set_pool(pool);
        }

        let out_count = outs.len();
        for (i, out) in outs.iter().enumerate() {
            let mut path = out.evaluate(&ScopeEnv::new(&self.state.scopes, env));
            let slash_bits = canonicalize_path(&mut path)
                .map_err(|err| self.lexer.error(&err.to_string()))?;
            if !self.state.add_out(edge, &path, slash_bits) {
                match self.options.dupe_edge_action {
                    DupeEdgeAction::Error => {
                        return Err(self
                            .lexer
                            .error(&format!("multiple rules generate {}", path)));
                    }
                    DupeEdgeAction::Warn => {
                        if !self.options.quiet {
                            log::warn!(
                                "multiple rules generate {}; builds involving this target will not be correct",
                                path
                            );
                        }
                        if out_count - i <= implicit_outs {
                            implicit_outs -= 1;
                        }
                    }
                }
            }
        }
        if self.state[edge].outputs().is_empty() {
            // All outputs of the edge are already created by other edges.
            // Drop the edge before any input nodes are wired to it.
            self.state.discard_edge(edge);
            return Ok(());
        }
        self.state[edge].set_implicit_outs(implicit_outs);

        for input in &ins {
            let mut path = input.evaluate(&ScopeEnv::new(&self.state.scopes, env));
            let slash_bits = canonicalize_path(&mut path)
                .map_err(|err| self.lexer.error(&err.to_string()))?;
            self.state.add_in(edge, &path, slash_bits);
        }
        self.state[edge].set_implicit_deps(implicit_deps);
        self.state[edge].set_order_only_deps(order_only_deps);

        // Dependency-scanner output is keyed by a single target.
        let deps = self.state.edge_binding(&self.state[edge], "deps");
        if !deps.is_empty() && self.state[edge].outputs().len() > 1 {
            return Err(self
                .lexer
                .error("multiple outputs are not supported with the deps binding"));
        }

        Ok(())
    }

    fn parse_for(&mut self) -> Result<(), ParseError> {
        let mut key = String::new();
        if !self.lexer.read_ident(&mut key) {
            return Err(self.lexer.error("expected variable name"));
        }
        self.expect_token(Token::In)?;

        let mut values = Vec::new();
        loop {
            let eval = self.read_path()?;
            if eval.is_empty() {
                if values.is_empty() {
                    return Err(self.lexer.error("expected path"));
                }
                break;
            }
            values.push(eval.evaluate(&ScopeEnv::new(&self.state.scopes, self.env)));
        }

        // The loop variable is an ordinary binding in the current scope,
        // reassigned on every iteration.
        self.state
            .scopes
            .add_binding(self.env, key.clone(), values[0].clone());
        let body_pos = self.lexer.store_token_pos();
        self.state.forloops.push(ForLoop {
            key,
            values,
            index: 1,
            body_pos,
        });
        Ok(())
    }

    fn parse_end(&mut self) -> Result<(), ParseError> {
        // the full closer is 'end for'
        self.expect_token(Token::For)?;

        if self.state.forloops.is_empty() {
            return Err(self.lexer.error("'end for' without 'for'"));
        }
        let last = self.state.forloops.len() - 1;
        if self.state.forloops[last].index >= self.state.forloops[last].values.len() {
            self.state.forloops.pop();
            return Ok(());
        }

        let (key, value, body_pos) = {
            let frame = &mut self.state.forloops[last];
            let value = frame.values[frame.index].clone();
            frame.index += 1;
            (frame.key.clone(), value, frame.body_pos)
        };
        self.state.scopes.add_binding(self.env, key, value);
        // Rewind and rescan the loop body with the new binding.
        self.lexer.restore_token_pos(body_pos);
        Ok(())
    }

    fn parse_file_include(&mut self, new_scope: bool) -> Result<(), ParseError> {
        let eval = self.read_path()?;
        let path = eval.evaluate(&ScopeEnv::new(&self.state.scopes, self.env));

        let contents = match self.file_reader.read_file(&path) {
            Ok(contents) => contents,
            Err(err) => {
                return Err(self.lexer.error(&format!("loading '{}': {}", path, err)))
            }
        };

        debug!("parsing included manifest '{}'", path);
        let env = if new_scope {
            self.state.scopes.new_child(self.env)
        } else {
            self.env
        };
        {
            let mut subparser = ManifestParser::with_scope(
                &mut *self.state,
                self.file_reader,
                self.options,
                env,
            );
            subparser.parse(&path, contents)?;
        }

        self.expect_token(Token::Newline)
    }

    /// Parses `IDENT (= | +=) value`, returning the unevaluated value and
    /// whether it was an append.
    fn parse_let(&mut self) -> Result<(String, EvalString, bool), ParseError> {
        let mut key = String::new();
        if !self.lexer.read_ident(&mut key) {
            return Err(self.lexer.error("expected variable name"));
        }
        let token = self.lexer.read_token();
        let pluseq = token == Token::PlusEq;
        if token != Token::Equals && !pluseq {
            return Err(self.lexer.error(&format!(
                "expected {} or {}, got {}{}{}",
                Token::Equals.name(),
                Token::PlusEq.name(),
                token.name(),
                Token::Equals.error_hint(),
                Token::PlusEq.error_hint()
            )));
        }
        let value = self.read_var_value()?;
        Ok((key, value, pluseq))
    }

    /// Parses `IDENT = value`; rule and pool bindings do not support `+=`.
    fn parse_let_eq(&mut self) -> Result<(String, EvalString), ParseError> {
        let mut key = String::new();
        if !self.lexer.read_ident(&mut key) {
            return Err(self.lexer.error("expected variable name"));
        }
        self.expect_token(Token::Equals)?;
        let value = self.read_var_value()?;
        Ok((key, value))
    }

    /// Reads a path, complete with `$` escapes. The result may be empty if
    /// a delimiter was hit immediately.
    fn read_path(&mut self) -> Result<EvalString, ParseError> {
        self.read_eval_string(true)
    }

    /// Reads the value side of a `var = value` line, complete with `$`
    /// escapes.
    fn read_var_value(&mut self) -> Result<EvalString, ParseError> {
        self.read_eval_string(false)
    }

    fn read_eval_string(&mut self, path: bool) -> Result<EvalString, ParseError> {
        let mut eval = EvalString::new();
        loop {
            // Drain a pending $(name) expansion before touching the
            // primary input again.
            if let Some(var) = &self.subinput {
                if let Err(err) = self.sublexer.read_eval_string(&mut eval, None, path) {
                    let var = var.clone();
                    self.subinput = None;
                    return Err(self
                        .lexer
                        .error(&format!("error expanding $({}): {}", var, err)));
                }
                if !eval.is_empty() {
                    return Ok(eval);
                }
                self.subinput = None;
            }

            let mut special = String::new();
            self.lexer
                .read_eval_string(&mut eval, Some(&mut special), path)?;
            if !special.is_empty() {
                let mut text = self
                    .state
                    .scopes
                    .lookup_variable(self.env, &special)
                    .to_string();
                text.push('\n');
                let mut bytes = text.into_bytes();
                bytes.push(0);
                self.sublexer
                    .start(format!("parsing *$({})", special), bytes);
                self.sublexer.eat_whitespace();
                self.subinput = Some(special);
                if eval.is_empty() {
                    continue;
                }
            }
            return Ok(eval);
        }
    }

    /// Reads a token, producing an "expected X, got Y" error if it is not
    /// `expected`.
    fn expect_token(&mut self, expected: Token) -> Result<(), ParseError> {
        let token = self.lexer.read_token();
        if token != expected {
            return Err(self.lexer.error(&format!(
                "expected {}, got {}{}",
                expected.name(),
                token.name(),
                expected.error_hint()
            )));
        }
        Ok(())
    }
}
