// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! Path canonicalization. Every edge input, edge output, and default target
//! is stored in canonical form, which is the identity key for graph nodes.

use smallvec::SmallVec;
use thiserror::Error;

/// An error that can occur while canonicalizing a path
#[derive(Debug, Error, Eq, PartialEq)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path has too many components")]
    TooManyComponents,
}

const MAX_PATH_COMPONENTS: usize = 60;

/// Number of leading separators described by the slash-bits mask.
const MAX_SLASH_BITS: usize = 31;

/// Normalizes `path` in place: collapses `.` components and duplicate
/// separators, folds `..` against preceding components where textually
/// possible, and rewrites backslashes to forward slashes.
///
/// Returns a bitmask recording which of the first 31 separators of the
/// canonical path were originally backslashes, so command substitution can
/// later restore platform-specific separators.
pub fn canonicalize_path(path: &mut String) -> Result<u64, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let src = path.as_bytes().to_vec();
    let len = src.len();
    let mut dst: Vec<u8> = Vec::with_capacity(len);
    // (dst offset, separator index) at the start of each foldable component
    let mut components: SmallVec<[(usize, usize); 16]> = SmallVec::new();
    let mut bits: u64 = 0;
    let mut sep_index: usize = 0;
    let mut i = 0;

    if is_separator(src[0]) {
        push_separator(&mut dst, &mut bits, &mut sep_index, src[0]);
        i = 1;
    }

    while i < len {
        let c = src[i];
        if c == b'.' {
            let next = src.get(i + 1).copied();
            if next.map_or(true, is_separator) {
                // a lone '.' component disappears
                i += 2;
                continue;
            }
            if next == Some(b'.') && src.get(i + 2).copied().map_or(true, is_separator) {
                if let Some((dst_start, sep_start)) = components.pop() {
                    dst.truncate(dst_start);
                    if sep_start < MAX_SLASH_BITS {
                        bits &= (1u64 << sep_start) - 1;
                    }
                    sep_index = sep_start;
                    i += 3;
                    continue;
                }
                // nothing left to fold against; the '..' stays
                dst.extend_from_slice(b"..");
                i += 2;
                if i < len {
                    push_separator(&mut dst, &mut bits, &mut sep_index, src[i]);
                    i += 1;
                }
                continue;
            }
        }
        if is_separator(c) {
            // duplicate separators collapse
            i += 1;
            continue;
        }
        if components.len() == MAX_PATH_COMPONENTS {
            return Err(PathError::TooManyComponents);
        }
        components.push((dst.len(), sep_index));
        while i < len && !is_separator(src[i]) {
            dst.push(src[i]);
            i += 1;
        }
        if i < len {
            push_separator(&mut dst, &mut bits, &mut sep_index, src[i]);
            i += 1;
        }
    }

    // drop a trailing separator, keeping a bare root
    if dst.len() > 1 && dst.last() == Some(&b'/') {
        dst.pop();
    }
    if dst.is_empty() {
        dst.push(b'.');
    }

    // Only ASCII separators and dots were rewritten; everything else was
    // copied verbatim from a valid string.
    *path = String::from_utf8(dst).expect("canonical path is valid UTF-8");
    Ok(bits)
}

fn is_separator(c: u8) -> bool {
    c == b'/' || c == b'\\'
}

fn push_separator(dst: &mut Vec<u8>, bits: &mut u64, sep_index: &mut usize, c: u8) {
    if c == b'\\' && *sep_index < MAX_SLASH_BITS {
        *bits |= 1 << *sep_index;
    }
    *sep_index += 1;
    dst.push(b'/');
}
