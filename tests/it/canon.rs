// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use ninja_manifest::canonicalize_path;
use ninja_manifest::PathError;

fn canon(path: &str) -> (String, u64) {
    let mut path = path.to_string();
    let bits = canonicalize_path(&mut path).expect("cannot canonicalize");
    (path, bits)
}

#[test]
fn plain_paths_are_unchanged() {
    assert_eq!(canon("foo/bar.o"), ("foo/bar.o".to_string(), 0));
}

#[test]
fn dot_components_fold_away() {
    assert_eq!(canon("./foo").0, "foo");
    assert_eq!(canon("foo/./bar").0, "foo/bar");
    assert_eq!(canon("foo/.").0, "foo");
}

#[test]
fn dotdot_folds_against_preceding_components() {
    assert_eq!(canon("foo/../bar").0, "bar");
    assert_eq!(canon("foo/bar/../baz").0, "foo/baz");
    assert_eq!(canon("foo/..").0, ".");
}

#[test]
fn leading_dotdot_is_preserved() {
    assert_eq!(canon("../foo").0, "../foo");
    assert_eq!(canon("../../foo").0, "../../foo");
    assert_eq!(canon("..").0, "..");
}

#[test]
fn absolute_paths_keep_their_root() {
    assert_eq!(canon("/foo/../bar").0, "/bar");
    assert_eq!(canon("/").0, "/");
    assert_eq!(canon("/foo/../..").0, "/..");
}

#[test]
fn duplicate_and_trailing_separators_collapse() {
    assert_eq!(canon("foo//bar").0, "foo/bar");
    assert_eq!(canon("foo/").0, "foo");
    assert_eq!(canon("foo/bar/").0, "foo/bar");
}

#[test]
fn fully_folded_relative_paths_become_dot() {
    assert_eq!(canon("./").0, ".");
    assert_eq!(canon("./.").0, ".");
}

#[test]
fn empty_paths_are_rejected() {
    let mut path = String::new();
    assert_eq!(canonicalize_path(&mut path), Err(PathError::Empty));
}

#[test]
fn backslashes_normalize_and_set_slash_bits() {
    assert_eq!(canon("foo\\bar"), ("foo/bar".to_string(), 0b1));
    assert_eq!(canon("foo\\bar\\baz"), ("foo/bar/baz".to_string(), 0b11));
    assert_eq!(canon("foo\\bar/baz"), ("foo/bar/baz".to_string(), 0b01));
    assert_eq!(canon("foo/bar\\baz"), ("foo/bar/baz".to_string(), 0b10));
}

#[test]
fn slash_bits_track_folded_components() {
    // The separator after "b" disappears along with "b" itself.
    assert_eq!(canon("a\\b\\..\\c"), ("a/c".to_string(), 0b1));
}

#[test]
fn dotted_names_are_not_special() {
    assert_eq!(canon(".hidden").0, ".hidden");
    assert_eq!(canon("...").0, "...");
    assert_eq!(canon("foo/.bar").0, "foo/.bar");
}

#[test]
fn very_deep_paths_are_rejected() {
    let mut path = "x/".repeat(100);
    path.push('x');
    let mut path = path;
    assert_eq!(
        canonicalize_path(&mut path),
        Err(PathError::TooManyComponents)
    );
}
