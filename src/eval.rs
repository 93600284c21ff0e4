// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Deferred-evaluation strings: literal fragments interleaved with variable
//! references, resolved lazily against a scope.

use std::fmt;

use smallvec::SmallVec;

/// A scope that eval strings can be resolved against.
///
/// Lookup never fails; a name with no binding resolves to the empty string.
pub trait Env {
    fn lookup_variable(&self, var: &str) -> String;
}

/// One piece of an unevaluated string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fragment {
    Literal(String),
    Variable(String),
}

/// A manifest string with embedded `$variable` references, kept unevaluated
/// until a scope to resolve them against is known.
///
/// Rule bindings stay in this form for the lifetime of the rule, so that
/// `$in` and `$out` can bind per edge.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EvalString {
    fragments: SmallVec<[Fragment; 4]>,
}

impl EvalString {
    pub fn new() -> EvalString {
        EvalString::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }

    /// Appends literal text, coalescing with a trailing literal fragment.
    pub fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Literal(last)) = self.fragments.last_mut() {
            last.push_str(text);
            return;
        }
        self.fragments.push(Fragment::Literal(text.to_string()));
    }

    /// Appends a reference to the variable `name`.
    pub fn add_variable(&mut self, name: &str) {
        self.fragments.push(Fragment::Variable(name.to_string()));
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Resolves the string against `env`, concatenating literals verbatim
    /// and looking up each variable reference.
    pub fn evaluate(&self, env: &dyn Env) -> String {
        let mut result = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => result.push_str(text),
                Fragment::Variable(name) => result.push_str(&env.lookup_variable(name)),
            }
        }
        result
    }
}

/// The unevaluated form, with references written as `${name}`.
impl fmt::Display for EvalString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => write!(f, "{}", text)?,
                Fragment::Variable(name) => write!(f, "${{{}}}", name)?,
            }
        }
        Ok(())
    }
}
