// -*- coding: utf-8 -*-
// ------------------------------------------------------------------------------------------------
// Copyright © 2026, ninja-manifest authors.
// Licensed under either of Apache License, Version 2.0, or MIT license, at your option.
// Please see the LICENSE-APACHE or LICENSE-MIT files in this distribution for license details.
// ------------------------------------------------------------------------------------------------

use anyhow::anyhow;
use anyhow::Result;
use clap::App;
use clap::Arg;

use ninja_manifest::DiskFileReader;
use ninja_manifest::DupeEdgeAction;
use ninja_manifest::ManifestParser;
use ninja_manifest::ParserOptions;
use ninja_manifest::State;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    env_logger::init();
    let matches = App::new("ninja-manifest")
        .version(BUILD_VERSION)
        .about("Parses a ninja-style build manifest and dumps the build graph")
        .arg(Arg::with_name("manifest").index(1).required(true))
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Dump the build state as JSON"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("Suppress non-fatal warnings"),
        )
        .arg(
            Arg::with_name("dupe-edges")
                .long("dupe-edges")
                .takes_value(true)
                .possible_values(&["warn", "error"])
                .default_value("warn")
                .help("How to treat multiple edges generating the same output"),
        )
        .get_matches();

    let manifest = matches.value_of("manifest").unwrap();
    let options = ParserOptions {
        dupe_edge_action: match matches.value_of("dupe-edges") {
            Some("error") => DupeEdgeAction::Error,
            _ => DupeEdgeAction::Warn,
        },
        quiet: matches.is_present("quiet"),
    };

    let mut state = State::new();
    let mut parser = ManifestParser::new(&mut state, &DiskFileReader, options);
    parser.load(manifest).map_err(|err| anyhow!("{}", err))?;

    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", state.display());
    }
    Ok(())
}
