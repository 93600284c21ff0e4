// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! The build state that manifests are parsed into: file nodes, edges,
//! pools, default targets, and the tree of binding scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::ops::IndexMut;
use std::rc::Rc;

use serde::ser;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;

use crate::env::{Rule, ScopeRef, ScopeTree};
use crate::eval::Env;
use crate::lexer::LexerPos;

type NodeId = u32;
type EdgeId = u32;

/// Reference to a file node in a [`State`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeRef(NodeId);

impl NodeRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference to an edge in a [`State`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EdgeRef(EdgeId);

impl EdgeRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named concurrency bucket shared by edges at execution time.
#[derive(Debug, Eq, PartialEq)]
pub struct Pool {
    name: String,
    depth: u32,
}

impl Pool {
    pub fn new(name: impl Into<String>, depth: u32) -> Pool {
        Pool {
            name: name.into(),
            depth,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// A file participating in the build graph, stored under its canonical
/// path.
#[derive(Debug)]
pub struct Node {
    path: String,
    slash_bits: u64,
    in_edge: Option<EdgeRef>,
    out_edges: Vec<EdgeRef>,
}

impl Node {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Which separators of the canonical path were originally backslashes.
    pub fn slash_bits(&self) -> u64 {
        self.slash_bits
    }

    /// The edge producing this node, if any. At most one edge may claim a
    /// node as an output.
    pub fn in_edge(&self) -> Option<EdgeRef> {
        self.in_edge
    }

    pub fn out_edges(&self) -> &[EdgeRef] {
        &self.out_edges
    }
}

/// One build step: a rule applied to inputs to produce outputs.
///
/// The tails of the output and input lists are partitioned off by the
/// `implicit_outs`, `implicit_deps`, and `order_only_deps` counts, with the
/// order-only tail after the implicit tail.
#[derive(Debug)]
pub struct Edge {
    rule: Rc<Rule>,
    env: ScopeRef,
    pool: Option<Rc<Pool>>,
    outputs: Vec<NodeRef>,
    inputs: Vec<NodeRef>,
    implicit_outs: usize,
    implicit_deps: usize,
    order_only_deps: usize,
}

impl Edge {
    pub fn rule(&self) -> &Rc<Rule> {
        &self.rule
    }

    pub fn env(&self) -> ScopeRef {
        self.env
    }

    pub fn pool(&self) -> Option<&Rc<Pool>> {
        self.pool.as_ref()
    }

    pub fn outputs(&self) -> &[NodeRef] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[NodeRef] {
        &self.inputs
    }

    pub fn implicit_outs(&self) -> usize {
        self.implicit_outs
    }

    pub fn implicit_deps(&self) -> usize {
        self.implicit_deps
    }

    pub fn order_only_deps(&self) -> usize {
        self.order_only_deps
    }

    /// Outputs exposed through `$out`.
    pub fn explicit_outputs(&self) -> &[NodeRef] {
        &self.outputs[..self.outputs.len() - self.implicit_outs]
    }

    /// Inputs exposed through `$in`.
    pub fn explicit_inputs(&self) -> &[NodeRef] {
        &self.inputs[..self.inputs.len() - self.implicit_deps - self.order_only_deps]
    }

    pub(crate) fn set_pool(&mut self, pool: Rc<Pool>) {
        self.pool = Some(pool);
    }

    pub(crate) fn set_implicit_outs(&mut self, implicit_outs: usize) {
        self.implicit_outs = implicit_outs;
    }

    pub(crate) fn set_implicit_deps(&mut self, implicit_deps: usize) {
        self.implicit_deps = implicit_deps;
    }

    pub(crate) fn set_order_only_deps(&mut self, order_only_deps: usize) {
        self.order_only_deps = order_only_deps;
    }
}

/// One active `for` loop: the bound key, the evaluated iteration values,
/// the index of the next value, and the scan position of the loop body.
#[derive(Debug)]
pub struct ForLoop {
    pub(crate) key: String,
    pub(crate) values: Vec<String>,
    pub(crate) index: usize,
    pub(crate) body_pos: LexerPos,
}

/// Everything a parsed manifest produces.
pub struct State {
    /// The tree of binding scopes, rooted at the global scope.
    pub scopes: ScopeTree,
    pools: HashMap<String, Rc<Pool>>,
    nodes: Vec<Node>,
    paths: HashMap<String, NodeRef>,
    edges: Vec<Edge>,
    defaults: Vec<NodeRef>,
    pub(crate) forloops: Vec<ForLoop>,
}

impl State {
    pub fn new() -> State {
        let mut pools = HashMap::new();
        // The console pool is always available.
        pools.insert("console".to_string(), Rc::new(Pool::new("console", 1)));
        State {
            scopes: ScopeTree::new(),
            pools,
            nodes: Vec::new(),
            paths: HashMap::new(),
            edges: Vec::new(),
            defaults: Vec::new(),
            forloops: Vec::new(),
        }
    }

    pub fn add_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.name().to_string(), Rc::new(pool));
    }

    pub fn lookup_pool(&self, name: &str) -> Option<&Rc<Pool>> {
        self.pools.get(name)
    }

    /// Returns the node stored under the canonical `path`, creating it if
    /// necessary.
    pub fn get_node(&mut self, path: &str, slash_bits: u64) -> NodeRef {
        if let Some(&node) = self.paths.get(path) {
            return node;
        }
        let node = NodeRef(self.nodes.len() as NodeId);
        self.nodes.push(Node {
            path: path.to_string(),
            slash_bits,
            in_edge: None,
            out_edges: Vec::new(),
        });
        self.paths.insert(path.to_string(), node);
        node
    }

    pub fn lookup_node(&self, path: &str) -> Option<NodeRef> {
        self.paths.get(path).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn add_edge(&mut self, rule: Rc<Rule>, env: ScopeRef) -> EdgeRef {
        let edge = EdgeRef(self.edges.len() as EdgeId);
        self.edges.push(Edge {
            rule,
            env,
            pool: None,
            outputs: Vec::new(),
            inputs: Vec::new(),
            implicit_outs: 0,
            implicit_deps: 0,
            order_only_deps: 0,
        });
        edge
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Registers `path` as an output of `edge`. Returns `false` without
    /// modifying anything if another edge already produces that path.
    pub fn add_out(&mut self, edge: EdgeRef, path: &str, slash_bits: u64) -> bool {
        let node = self.get_node(path, slash_bits);
        if self.nodes[node.index()].in_edge.is_some() {
            return false;
        }
        self.nodes[node.index()].in_edge = Some(edge);
        self.edges[edge.index()].outputs.push(node);
        true
    }

    /// Registers `path` as an input of `edge`.
    pub fn add_in(&mut self, edge: EdgeRef, path: &str, slash_bits: u64) {
        let node = self.get_node(path, slash_bits);
        self.edges[edge.index()].inputs.push(node);
        self.nodes[node.index()].out_edges.push(edge);
    }

    /// Drops the most recently added edge; used when every output of the
    /// edge turned out to be claimed by other edges. No node may reference
    /// the edge at this point.
    pub(crate) fn discard_edge(&mut self, edge: EdgeRef) {
        debug_assert_eq!(edge.index(), self.edges.len() - 1);
        debug_assert!(self.edges[edge.index()].outputs.is_empty());
        debug_assert!(self.edges[edge.index()].inputs.is_empty());
        self.edges.pop();
    }

    /// Records `path` as a default target. The path does not need to be an
    /// output of any edge.
    pub fn add_default(&mut self, path: &str, slash_bits: u64) -> NodeRef {
        let node = self.get_node(path, slash_bits);
        self.defaults.push(node);
        node
    }

    pub fn defaults(&self) -> &[NodeRef] {
        &self.defaults
    }

    /// Evaluates binding `name` on `edge`: edge-local bindings shadow the
    /// rule's (late-bound) bindings, which shadow the enclosing scopes; the
    /// special names `in`, `out`, and `in_newline` expand to the edge's
    /// explicit paths.
    pub fn edge_binding(&self, edge: &Edge, name: &str) -> String {
        let env = EdgeEnv {
            state: self,
            edge,
            lookups: RefCell::new(Vec::new()),
        };
        env.lookup_variable(name)
    }

    /// Renders the parsed state as manifest-shaped text.
    pub fn display(&self) -> impl fmt::Display + '_ {
        struct DisplayState<'a>(&'a State);

        impl fmt::Display for DisplayState<'_> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                let state = self.0;
                for pool in state.sorted_pools() {
                    writeln!(f, "pool {}", pool.name())?;
                    writeln!(f, "  depth = {}", pool.depth())?;
                }
                for edge in &state.edges {
                    write!(f, "build")?;
                    let explicit_outs = edge.outputs.len() - edge.implicit_outs;
                    for (i, &out) in edge.outputs.iter().enumerate() {
                        if i == explicit_outs && edge.implicit_outs > 0 {
                            write!(f, " |")?;
                        }
                        write!(f, " {}", state[out].path())?;
                    }
                    write!(f, ": {}", edge.rule.name())?;
                    let explicit_ins =
                        edge.inputs.len() - edge.implicit_deps - edge.order_only_deps;
                    let order_only_start = edge.inputs.len() - edge.order_only_deps;
                    for (i, &input) in edge.inputs.iter().enumerate() {
                        if i == explicit_ins && edge.implicit_deps > 0 {
                            write!(f, " |")?;
                        }
                        if i == order_only_start && edge.order_only_deps > 0 {
                            write!(f, " ||")?;
                        }
                        write!(f, " {}", state[input].path())?;
                    }
                    writeln!(f)?;
                    if let Some(pool) = &edge.pool {
                        writeln!(f, "  pool = {}", pool.name())?;
                    }
                }
                for &default in &state.defaults {
                    writeln!(f, "default {}", state[default].path())?;
                }
                Ok(())
            }
        }

        DisplayState(self)
    }

    fn sorted_pools(&self) -> Vec<&Rc<Pool>> {
        let mut pools: Vec<&Rc<Pool>> = self.pools.values().collect();
        pools.sort_by(|a, b| a.name().cmp(b.name()));
        pools
    }
}

impl Default for State {
    fn default() -> State {
        State::new()
    }
}

impl Index<NodeRef> for State {
    type Output = Node;
    fn index(&self, index: NodeRef) -> &Node {
        &self.nodes[index.index()]
    }
}

impl Index<EdgeRef> for State {
    type Output = Edge;
    fn index(&self, index: EdgeRef) -> &Edge {
        &self.edges[index.index()]
    }
}

impl IndexMut<EdgeRef> for State {
    fn index_mut(&mut self, index: EdgeRef) -> &mut Edge {
        &mut self.edges[index.index()]
    }
}

/// Scope for evaluating an edge's bindings.
struct EdgeEnv<'a> {
    state: &'a State,
    edge: &'a Edge,
    /// Rule bindings currently being expanded, to catch reference cycles.
    lookups: RefCell<Vec<String>>,
}

impl EdgeEnv<'_> {
    fn path_list(&self, nodes: &[NodeRef], sep: char) -> String {
        let paths: Vec<&str> = nodes.iter().map(|&n| self.state[n].path()).collect();
        paths.join(&sep.to_string())
    }
}

impl Env for EdgeEnv<'_> {
    fn lookup_variable(&self, var: &str) -> String {
        match var {
            "in" => return self.path_list(self.edge.explicit_inputs(), ' '),
            "in_newline" => return self.path_list(self.edge.explicit_inputs(), '\n'),
            "out" => return self.path_list(self.edge.explicit_outputs(), ' '),
            _ => {}
        }
        let rule_binding = self.edge.rule.binding(var);
        if rule_binding.is_some() {
            if self.lookups.borrow().iter().any(|v| v == var) {
                log::warn!("cycle in rule variables while expanding '{}'", var);
                return String::new();
            }
            self.lookups.borrow_mut().push(var.to_string());
        }
        let result = self
            .state
            .scopes
            .lookup_with_fallback(self.edge.env, var, rule_binding, self);
        if rule_binding.is_some() {
            self.lookups.borrow_mut().pop();
        }
        result
    }
}

// JSON rendering, used by the command line's --json flag.

impl ser::Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("pools", &PoolsJson(self.sorted_pools()))?;
        map.serialize_entry("edges", &EdgesJson(self))?;
        map.serialize_entry("defaults", &DefaultsJson(self))?;
        map.end()
    }
}

struct PoolsJson<'a>(Vec<&'a Rc<Pool>>);

impl ser::Serialize for PoolsJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for &pool in &self.0 {
            seq.serialize_element(&PoolJson(pool))?;
        }
        seq.end()
    }
}

struct PoolJson<'a>(&'a Pool);

impl ser::Serialize for PoolJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", self.0.name())?;
        map.serialize_entry("depth", &self.0.depth())?;
        map.end()
    }
}

struct EdgesJson<'a>(&'a State);

impl ser::Serialize for EdgesJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.edges.len()))?;
        for edge in &self.0.edges {
            seq.serialize_element(&EdgeJson(self.0, edge))?;
        }
        seq.end()
    }
}

struct EdgeJson<'a>(&'a State, &'a Edge);

impl ser::Serialize for EdgeJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let (state, edge) = (self.0, self.1);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("rule", edge.rule.name())?;
        if let Some(pool) = &edge.pool {
            map.serialize_entry("pool", pool.name())?;
        }
        map.serialize_entry("outputs", &PathsJson(state, &edge.outputs))?;
        map.serialize_entry("implicit_outs", &edge.implicit_outs)?;
        map.serialize_entry("inputs", &PathsJson(state, &edge.inputs))?;
        map.serialize_entry("implicit_deps", &edge.implicit_deps)?;
        map.serialize_entry("order_only_deps", &edge.order_only_deps)?;
        map.end()
    }
}

struct PathsJson<'a>(&'a State, &'a [NodeRef]);

impl ser::Serialize for PathsJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.1.len()))?;
        for &node in self.1 {
            seq.serialize_element(self.0[node].path())?;
        }
        seq.end()
    }
}

struct DefaultsJson<'a>(&'a State);

impl ser::Serialize for DefaultsJson<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.0.defaults.len()))?;
        for &node in &self.0.defaults {
            seq.serialize_element(self.0[node].path())?;
        }
        seq.end()
    }
}
