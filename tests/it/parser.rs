// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use indoc::indoc;
use ninja_manifest::eval::Fragment;
use ninja_manifest::DupeEdgeAction;
use ninja_manifest::ManifestParser;
use ninja_manifest::State;

use crate::helpers::*;

#[test]
fn parses_an_empty_manifest() {
    let state = parse("");
    assert!(state.edges().is_empty());
    assert!(state.nodes().is_empty());
}

#[test]
fn blank_lines_and_comments_are_skipped() {
    let state = parse(indoc! {"
        # toolchain definitions

        rule cc
          command = cc
          # inline comments are fine between bindings
          description = CC $out

        build a.o: cc a.c
    "});
    assert_eq!(state.edges().len(), 1);
    assert_eq!(
        state.edge_binding(&state.edges()[0], "description"),
        "CC a.o"
    );
}

#[test]
fn parses_a_minimal_rule_and_edge() {
    let state = parse(indoc! {"
        rule cc
          command = gcc $in -o $out
        build a.o: cc a.c
    "});

    let rule = state
        .scopes
        .lookup_rule(state.scopes.root(), "cc")
        .expect("rule cc is missing");
    let command = rule.binding("command").expect("command is missing");
    assert_eq!(
        command.fragments().to_vec(),
        vec![
            Fragment::Literal("gcc ".to_string()),
            Fragment::Variable("in".to_string()),
            Fragment::Literal(" -o ".to_string()),
            Fragment::Variable("out".to_string()),
        ]
    );

    assert_eq!(state.edges().len(), 1);
    let edge = &state.edges()[0];
    assert_eq!(edge.rule().name(), "cc");
    assert_eq!(node_paths(&state, edge.outputs()), ["a.o"]);
    assert_eq!(node_paths(&state, edge.inputs()), ["a.c"]);
    assert_eq!(edge.implicit_outs(), 0);
    assert_eq!(edge.implicit_deps(), 0);
    assert_eq!(edge.order_only_deps(), 0);
}

#[test]
fn partitions_implicit_and_order_only_paths() {
    let state = parse(indoc! {"
        rule r
          command = r
        build x | ix: r i1 | i2 || o1
    "});

    let edge = &state.edges()[0];
    assert_eq!(node_paths(&state, edge.outputs()), ["x", "ix"]);
    assert_eq!(edge.implicit_outs(), 1);
    assert_eq!(node_paths(&state, edge.inputs()), ["i1", "i2", "o1"]);
    assert_eq!(edge.implicit_deps(), 1);
    assert_eq!(edge.order_only_deps(), 1);
    assert_eq!(node_paths(&state, edge.explicit_outputs()), ["x"]);
    assert_eq!(node_paths(&state, edge.explicit_inputs()), ["i1"]);
}

#[test]
fn variables_bind_and_append() {
    let state = parse("a = foo\na += bar\nb += baz\n");
    let root = state.scopes.root();
    assert_eq!(state.scopes.lookup_variable(root, "a"), "foobar");
    assert_eq!(state.scopes.lookup_variable(root, "b"), "baz");
}

#[test]
fn let_values_expand_against_earlier_bindings() {
    let state = parse("x = a\ny = ${x}-and-${x}\nx = later\n");
    let root = state.scopes.root();
    assert_eq!(state.scopes.lookup_variable(root, "y"), "a-and-a");
}

#[test]
fn rule_bindings_are_late_bound() {
    let state = parse(indoc! {"
        rule cc
          command = $cmd $in -o $out
        cmd = gcc
        build a.o: cc a.c
        build b.o: cc b.c
          cmd = clang
    "});

    assert_eq!(
        state.edge_binding(&state.edges()[0], "command"),
        "gcc a.c -o a.o"
    );
    assert_eq!(
        state.edge_binding(&state.edges()[1], "command"),
        "clang b.c -o b.o"
    );
}

#[test]
fn edge_bindings_are_evaluated_eagerly() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        flags = -O1
        build a.o: cc a.c
          cflags = $flags
        flags = -O2
    "});

    assert_eq!(state.edge_binding(&state.edges()[0], "cflags"), "-O1");
    assert_eq!(
        state.scopes.lookup_variable(state.scopes.root(), "flags"),
        "-O2"
    );
}

#[test]
fn edge_bindings_may_append() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        cflags = -O1
        build a.o: cc a.c
          cflags += $and -g
        and = not-this-one
    "});

    assert_eq!(state.edge_binding(&state.edges()[0], "cflags"), "-O1 -g");
}

#[test]
fn edges_without_bindings_share_the_enclosing_scope() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        build a.o: cc a.c
        build b.o: cc b.c
          x = 1
    "});

    assert_eq!(state.edges()[0].env(), state.scopes.root());
    assert_ne!(state.edges()[1].env(), state.scopes.root());
}

#[test]
fn in_and_out_expand_to_explicit_paths_only() {
    let state = parse(indoc! {"
        rule cc
          command = cc $in > $out
        build x | ximp: cc a d | b || c
    "});

    let edge = &state.edges()[0];
    assert_eq!(state.edge_binding(edge, "in"), "a d");
    assert_eq!(state.edge_binding(edge, "in_newline"), "a\nd");
    assert_eq!(state.edge_binding(edge, "out"), "x");
    assert_eq!(state.edge_binding(edge, "command"), "cc a d > x");
}

#[test]
fn paths_are_canonicalized() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        build ./dir/out.o: cc ../dir/sub/../in.c
    "});

    let edge = &state.edges()[0];
    assert_eq!(node_paths(&state, edge.outputs()), ["dir/out.o"]);
    assert_eq!(node_paths(&state, edge.inputs()), ["../dir/in.c"]);
}

#[test]
fn canonical_paths_are_the_identity_for_duplicate_detection() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        build ./out: cc a
        build out: cc b
    "});

    // The second edge duplicates the first edge's only output, so it is
    // dropped entirely and its inputs are never wired in.
    assert_eq!(state.edges().len(), 1);
    assert!(state.lookup_node("out").is_some());
    assert!(state.lookup_node("./out").is_none());
    assert!(state.lookup_node("b").is_none());
}

#[test]
fn duplicate_outputs_fail_under_the_error_policy() {
    let err = parse_err_dupe(indoc! {"
        rule cat
          command = cat
        build a.o: cat b.c
        build a.o: cat c.c
    "});
    assert_eq!(err, "input:5:1: multiple rules generate a.o");
}

#[test]
fn duplicate_outputs_are_dropped_under_the_warn_policy() {
    let state = parse(indoc! {"
        rule cat
          command = cat
        build out1 out2: cat
        build out1 out3: cat
    "});

    assert_eq!(state.edges().len(), 2);
    assert_eq!(node_paths(&state, state.edges()[1].outputs()), ["out3"]);
}

#[test]
fn dropping_an_implicit_duplicate_adjusts_the_partition() {
    let state = parse(indoc! {"
        rule cat
          command = cat
        build o1 | o2: cat
        build o3 | o2: cat
    "});

    let edge = &state.edges()[1];
    assert_eq!(node_paths(&state, edge.outputs()), ["o3"]);
    assert_eq!(edge.implicit_outs(), 0);
}

#[test]
fn pools_are_parsed_and_attached_to_edges() {
    let state = parse(indoc! {"
        pool link_pool
          depth = 4
        rule link
          command = link
        build a.out: link a.o
          pool = link_pool
        build b.out: link b.o
          pool = console
        build c.out: link c.o
    "});

    let pool = state.lookup_pool("link_pool").expect("pool is missing");
    assert_eq!(pool.depth(), 4);
    assert_eq!(state.edges()[0].pool().unwrap().name(), "link_pool");
    assert_eq!(state.edges()[1].pool().unwrap().name(), "console");
    assert!(state.edges()[2].pool().is_none());
}

#[test]
fn a_rule_level_pool_binding_applies_to_its_edges() {
    let state = parse(indoc! {"
        pool heavy
          depth = 1
        rule link
          command = link
          pool = heavy
        build a.out: link a.o
    "});

    assert_eq!(state.edges()[0].pool().unwrap().name(), "heavy");
}

#[test]
fn pool_errors() {
    assert!(parse_err("pool foo\n").contains("expected 'depth =' line"));
    assert!(parse_err("pool foo\n  depth = -1\n").contains("invalid pool depth"));
    assert!(parse_err("pool foo\n  depth = four\n").contains("invalid pool depth"));
    assert!(parse_err("pool foo\n  volume = 11\n").contains("unexpected variable 'volume'"));
    assert!(
        parse_err("pool foo\n  depth = 1\npool foo\n  depth = 2\n")
            .contains("duplicate pool 'foo'")
    );
    // the console pool is built in
    assert!(parse_err("pool console\n  depth = 2\n").contains("duplicate pool 'console'"));

    let err = parse_err(indoc! {"
        rule link
          command = link
        build a.out: link a.o
          pool = bogus
    "});
    assert!(err.contains("unknown pool name 'bogus'"), "{}", err);
}

#[test]
fn rule_errors() {
    assert!(parse_err("rule cc\n").contains("expected 'command =' line"));
    assert!(parse_err("rule cc\n  command =\n").contains("expected 'command =' line"));
    assert!(parse_err("rule cc\n  command = cc\n  cflags = -O2\n")
        .contains("unexpected variable 'cflags'"));
    assert!(
        parse_err("rule cc\n  command = cc\nrule cc\n  command = cc\n")
            .contains("duplicate rule 'cc'")
    );
    assert!(
        parse_err("rule cc\n  command = cc\n  rspfile = out.rsp\n")
            .contains("rspfile and rspfile_content need to be both specified")
    );
    assert!(
        parse_err("rule cc\n  command = cc\n  rspfile_content = $in\n")
            .contains("rspfile and rspfile_content need to be both specified")
    );
}

#[test]
fn edges_need_a_known_rule() {
    let err = parse_err("build a.o: mystery a.c\n");
    assert_eq!(
        err,
        "input:1:12: unknown build rule 'mystery'\n\
         build a.o: mystery a.c\n\
         \u{20}          ^ near here"
    );
}

#[test]
fn deps_requires_a_single_output() {
    let err = parse_err(indoc! {"
        rule cat
          command = cat
          deps = gcc
        build a b: cat c
    "});
    assert!(err.contains("multiple outputs"), "{}", err);
}

#[test]
fn syntax_errors_carry_position_and_context() {
    assert_eq!(
        parse_err("x 3\n"),
        "input:1:3: expected '=' or '+=', got identifier\nx 3\n  ^ near here"
    );
    assert_eq!(parse_err("  indented\n"), "input:1:1: unexpected indent");
    assert_eq!(
        parse_err("build\n"),
        "input:1:6: expected path\nbuild\n     ^ near here"
    );
    assert_eq!(
        parse_err("x = $%\n"),
        "input:1:5: bad $-escape (literal $ must be written as $$)\nx = $%\n    ^ near here"
    );
    let err = parse_err("build a.o a.c\n");
    assert!(err.contains("expected ':', got newline"), "{}", err);
    assert!(
        err.contains("($ also escapes colons, so you may need $: instead of :)"),
        "{}",
        err
    );
}

#[test]
fn default_targets_are_recorded() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        build a.o: cc a.c
        default a.o
    "});
    assert_eq!(node_paths(&state, state.defaults()), ["a.o"]);
}

#[test]
fn default_targets_may_be_undeclared_and_variable() {
    let state = parse("x = dir/target\ndefault ./$x extra\n");
    assert_eq!(node_paths(&state, state.defaults()), ["dir/target", "extra"]);
}

#[test]
fn default_requires_a_target() {
    assert!(parse_err("default\n").contains("expected target name"));
}

#[test]
fn include_shares_the_current_scope() {
    let mut fs = VirtualFs::new();
    fs.add_file("inc.ninja", "y = from-include\n");
    let state = parse_with(&fs, "x = 1\ninclude inc.ninja\n");
    let root = state.scopes.root();
    assert_eq!(state.scopes.lookup_variable(root, "y"), "from-include");
}

#[test]
fn subninja_opens_a_child_scope() {
    let mut fs = VirtualFs::new();
    fs.add_file("sub.ninja", "x = 2\n");
    let state = parse_with(&fs, "x = 1\nsubninja sub.ninja\n");
    assert_eq!(
        state.scopes.lookup_variable(state.scopes.root(), "x"),
        "1"
    );
}

#[test]
fn subninja_sees_and_may_shadow_outer_rules() {
    let mut fs = VirtualFs::new();
    fs.add_file(
        "sub.ninja",
        indoc! {"
            rule cc
              command = sub-cc
            build sub.o: cc sub.c
        "},
    );
    let state = parse_with(
        &fs,
        indoc! {"
            rule cc
              command = outer-cc
            subninja sub.ninja
            build outer.o: cc outer.c
        "},
    );

    assert_eq!(state.edges().len(), 2);
    assert_eq!(state.edge_binding(&state.edges()[0], "command"), "sub-cc");
    assert_eq!(state.edge_binding(&state.edges()[1], "command"), "outer-cc");
}

#[test]
fn rules_declared_in_a_subninja_stay_there() {
    let mut fs = VirtualFs::new();
    fs.add_file("sub.ninja", "rule zz\n  command = zz\n");
    let err = parse_err_with(
        &fs,
        "subninja sub.ninja\nbuild a: zz b\n",
    );
    assert!(err.contains("unknown build rule 'zz'"), "{}", err);
}

#[test]
fn include_paths_may_use_variables() {
    let mut fs = VirtualFs::new();
    fs.add_file("third_party/rules.ninja", "rule cc\n  command = cc\n");
    let state = parse_with(
        &fs,
        "dir = third_party\ninclude $dir/rules.ninja\nbuild a.o: cc a.c\n",
    );
    assert_eq!(state.edges().len(), 1);
}

#[test]
fn a_missing_include_is_a_positioned_error() {
    let err = parse_err("include missing.ninja\n");
    assert_eq!(
        err,
        "input:1:22: loading 'missing.ninja': No such file or directory\n\
         include missing.ninja\n\
         \u{20}                    ^ near here"
    );
}

#[test]
fn errors_inside_an_include_keep_their_own_context() {
    let mut fs = VirtualFs::new();
    fs.add_file("sub.ninja", "build\n");
    let err = parse_err_with(&fs, "subninja sub.ninja\n");
    assert!(err.starts_with("sub.ninja:1:6: expected path"), "{}", err);
}

#[test]
fn loading_a_missing_toplevel_manifest_fails_without_position() {
    init_log();
    let fs = VirtualFs::new();
    let mut state = State::new();
    let mut parser = ManifestParser::new(&mut state, &fs, quiet_options(DupeEdgeAction::Warn));
    let err = parser.load("nope.ninja").unwrap_err();
    assert_eq!(
        err.to_string(),
        "loading 'nope.ninja': No such file or directory"
    );
}

#[test]
fn loops_rescan_their_body_once_per_value() {
    let state = parse(indoc! {"
        rule r
          command = r
        for t in a b
        build $t.o: r $t.c
        end for
    "});

    assert_eq!(state.edges().len(), 2);
    assert_eq!(node_paths(&state, state.edges()[0].outputs()), ["a.o"]);
    assert_eq!(node_paths(&state, state.edges()[0].inputs()), ["a.c"]);
    assert_eq!(node_paths(&state, state.edges()[1].outputs()), ["b.o"]);
    assert_eq!(node_paths(&state, state.edges()[1].inputs()), ["b.c"]);
}

#[test]
fn loop_variables_rebind_in_the_current_scope() {
    let state = parse(indoc! {"
        x =
        for v in a b c
        x = $x$v
        end for
    "});
    let root = state.scopes.root();
    assert_eq!(state.scopes.lookup_variable(root, "x"), "abc");
    // the loop variable is an ordinary binding and survives the loop
    assert_eq!(state.scopes.lookup_variable(root, "v"), "c");
}

#[test]
fn loop_values_may_come_from_variables() {
    let state = parse(indoc! {"
        targets = one
        for t in $targets two
        seen += <$t>
        end for
    "});
    assert_eq!(
        state.scopes.lookup_variable(state.scopes.root(), "seen"),
        "<one><two>"
    );
}

#[test]
fn loop_errors() {
    assert!(parse_err("for x in\nend for\n").contains("expected path"));
    assert!(parse_err("end for\n").contains("'end for' without 'for'"));
    assert!(parse_err("for x in a\n").contains("'end for' expected"));
    assert!(parse_err("for x in a\nend\n").contains("expected 'for', got newline"));
}

#[test]
fn expansion_references_relex_variable_contents() {
    let state = parse(indoc! {"
        rule cc
          command = cc
        files = a.c b.c
        build out: cc $(files)
    "});

    let edge = &state.edges()[0];
    assert_eq!(node_paths(&state, edge.inputs()), ["a.c", "b.c"]);
}

#[test]
fn expansion_references_do_not_nest() {
    let err = parse_err(indoc! {"
        rule cc
          command = cc
        inner = $$(c)
        build out: cc $(inner)
    "});
    assert!(err.contains("error expanding $(inner)"), "{}", err);
}

#[test]
fn version_requirements_are_checked_up_front() {
    parse("ninja_required_version = 1.0\n");
    parse("ninja_required_version = 1.7.2\n");
    let err = parse_err("ninja_required_version = 99.0\nbad syntax here\n");
    assert!(
        err.contains("manifest requires ninja version 99.0"),
        "{}",
        err
    );
}

#[test]
fn empty_evaluated_paths_are_rejected() {
    let err = parse_err(indoc! {"
        rule cc
          command = cc
        build $nothing: cc a.c
    "});
    assert!(err.contains("empty path"), "{}", err);
}

#[test]
fn carriage_return_newlines_are_accepted() {
    let state = parse("rule cc\r\n  command = cc $in\r\nbuild a.o: cc a.c\r\n");
    assert_eq!(state.edges().len(), 1);
    assert_eq!(state.edge_binding(&state.edges()[0], "command"), "cc a.c");
}

#[test]
fn values_may_span_lines_with_continuations() {
    let state = parse("long = one$\n    two\n");
    assert_eq!(
        state.scopes.lookup_variable(state.scopes.root(), "long"),
        "one two"
    );
}
