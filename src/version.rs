// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

//! The `ninja_required_version` gate.

use thiserror::Error;

/// The version of the manifest language this parser implements. Manifests
/// declaring a newer `ninja_required_version` are rejected up front.
pub const LANG_VERSION: &str = "1.7";

#[derive(Debug, Error, Eq, PartialEq)]
#[error("manifest requires ninja version {required}, but this parser implements {supported}")]
pub struct VersionError {
    pub required: String,
    pub supported: &'static str,
}

/// Parses the leading `major.minor` of a version string. Missing or
/// malformed components read as zero; anything after the minor component is
/// ignored.
fn parse_version(version: &str) -> (u32, u32) {
    let mut parts = version.trim().split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    (major, minor)
}

/// Checks a manifest's required version against [`LANG_VERSION`].
pub fn check_version(required: &str) -> Result<(), VersionError> {
    if parse_version(required) > parse_version(LANG_VERSION) {
        return Err(VersionError {
            required: required.trim().to_string(),
            supported: LANG_VERSION,
        });
    }
    Ok(())
}
