// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! This library parses ninja-style build manifests into an in-memory build
//! state: rules (command templates), pools (concurrency limits), edges
//! (input→output build steps), variable bindings arranged in nested scopes,
//! and a set of default targets.
//!
//! # Overview
//!
//! A manifest is a line-oriented, indentation-sensitive description of a
//! build graph. The parser drives a hand-written lexer over each file,
//! reads every path and value as a deferred [`EvalString`], and commits the
//! results into a [`State`]:
//!
//! - `rule` blocks store their bindings *unevaluated*, so `$in` and `$out`
//!   can bind per edge;
//! - `build` lines evaluate their paths immediately, canonicalize them, and
//!   wire an edge into the graph, partitioning inputs and outputs into
//!   explicit, implicit, and order-only groups;
//! - `include` and `subninja` recurse into further files, sharing the
//!   current scope or opening a fresh child scope respectively;
//! - `for`/`end for` rescans a block of the file once per iteration value.
//!
//! ```
//! use ninja_manifest::{DiskFileReader, ManifestParser, ParserOptions, State};
//!
//! let source = b"rule cc
//!   command = gcc -c $in -o $out
//! build hello.o: cc hello.c
//! "
//! .to_vec();
//!
//! let mut state = State::new();
//! let mut parser = ManifestParser::new(&mut state, &DiskFileReader, ParserOptions::default());
//! parser.parse("build.ninja", source).unwrap();
//! assert_eq!(state.edges().len(), 1);
//! ```

pub mod canon;
pub mod env;
pub mod eval;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod version;

pub use canon::canonicalize_path;
pub use canon::PathError;
pub use env::Rule;
pub use env::ScopeEnv;
pub use env::ScopeRef;
pub use env::ScopeTree;
pub use eval::Env;
pub use eval::EvalString;
pub use graph::Edge;
pub use graph::EdgeRef;
pub use graph::Node;
pub use graph::NodeRef;
pub use graph::Pool;
pub use graph::State;
pub use lexer::Lexer;
pub use lexer::ParseError;
pub use lexer::Token;
pub use parser::DiskFileReader;
pub use parser::DupeEdgeAction;
pub use parser::FileReader;
pub use parser::ManifestParser;
pub use parser::ParserOptions;
pub use parser::ReadError;
