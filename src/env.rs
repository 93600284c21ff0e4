// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Lexically nested binding scopes, and the rules that live in them.
//!
//! Scopes are stored in an arena and referred to by index, so a child can
//! never outlive its parent; the arena is owned by the build state being
//! parsed into. Variable bindings hold fully evaluated strings; rules hold
//! unevaluated [`EvalString`]s.

use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::{Env, EvalString};

/// A command template: a name plus unevaluated bindings for the reserved
/// rule variables.
#[derive(Debug)]
pub struct Rule {
    name: String,
    bindings: HashMap<String, EvalString>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Rule {
        Rule {
            name: name.into(),
            bindings: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `var` may be bound inside a `rule` block. The set is closed;
    /// anything else must live in an enclosing scope.
    pub fn is_reserved_binding(var: &str) -> bool {
        matches!(
            var,
            "command"
                | "depfile"
                | "description"
                | "deps"
                | "generator"
                | "pool"
                | "restat"
                | "rspfile"
                | "rspfile_content"
        )
    }

    pub fn add_binding(&mut self, key: &str, value: EvalString) {
        self.bindings.insert(key.to_string(), value);
    }

    pub fn binding(&self, key: &str) -> Option<&EvalString> {
        self.bindings.get(key)
    }
}

/// Index of a scope within a [`ScopeTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScopeRef(u32);

impl ScopeRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeRef>,
    bindings: HashMap<String, String>,
    rules: HashMap<String, Rc<Rule>>,
}

/// Arena of binding scopes. Created with a root scope; every other scope is
/// a child of an existing one.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        ScopeTree {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeRef {
        ScopeRef(0)
    }

    /// Creates a new scope nested inside `parent`.
    pub fn new_child(&mut self, parent: ScopeRef) -> ScopeRef {
        let child = ScopeRef(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        child
    }

    /// Binds `var` in `scope` only, replacing any existing binding there.
    /// Bindings in enclosing scopes are shadowed, not modified.
    pub fn add_binding(&mut self, scope: ScopeRef, var: impl Into<String>, value: impl Into<String>) {
        self.scopes[scope.index()]
            .bindings
            .insert(var.into(), value.into());
    }

    /// Looks up `var` in `scope` and its ancestors; unbound names resolve to
    /// the empty string.
    pub fn lookup_variable(&self, scope: ScopeRef, var: &str) -> &str {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let scope = &self.scopes[scope.index()];
            if let Some(value) = scope.bindings.get(var) {
                return value;
            }
            current = scope.parent;
        }
        ""
    }

    /// Registers `rule` in `scope`. The caller is responsible for rejecting
    /// a rule already defined in that same scope.
    pub fn add_rule(&mut self, scope: ScopeRef, rule: Rc<Rule>) {
        self.scopes[scope.index()]
            .rules
            .insert(rule.name().to_string(), rule);
    }

    /// Looks up a rule in `scope` and its ancestors.
    pub fn lookup_rule(&self, scope: ScopeRef, name: &str) -> Option<&Rc<Rule>> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let scope = &self.scopes[scope.index()];
            if let Some(rule) = scope.rules.get(name) {
                return Some(rule);
            }
            current = scope.parent;
        }
        None
    }

    /// Looks up a rule in `scope` alone, for duplicate detection.
    pub fn lookup_rule_current_scope(&self, scope: ScopeRef, name: &str) -> Option<&Rc<Rule>> {
        self.scopes[scope.index()].rules.get(name)
    }

    /// Looks up `var` starting at `scope`, consulting `fallback` between the
    /// scope's own bindings and its ancestors. The fallback is an
    /// unevaluated rule binding; it is resolved against `env` so that edge
    /// evaluation sees `$in` and `$out`.
    pub(crate) fn lookup_with_fallback(
        &self,
        scope: ScopeRef,
        var: &str,
        fallback: Option<&EvalString>,
        env: &dyn Env,
    ) -> String {
        let s = &self.scopes[scope.index()];
        if let Some(value) = s.bindings.get(var) {
            return value.clone();
        }
        if let Some(eval) = fallback {
            return eval.evaluate(env);
        }
        match s.parent {
            Some(parent) => self.lookup_with_fallback(parent, var, None, env),
            None => String::new(),
        }
    }
}

impl Default for ScopeTree {
    fn default() -> ScopeTree {
        ScopeTree::new()
    }
}

/// [`Env`] view of a single scope in a tree.
pub struct ScopeEnv<'a> {
    tree: &'a ScopeTree,
    scope: ScopeRef,
}

impl<'a> ScopeEnv<'a> {
    pub fn new(tree: &'a ScopeTree, scope: ScopeRef) -> ScopeEnv<'a> {
        ScopeEnv { tree, scope }
    }
}

impl Env for ScopeEnv<'_> {
    fn lookup_variable(&self, var: &str) -> String {
        self.tree.lookup_variable(self.scope, var).to_string()
    }
}
