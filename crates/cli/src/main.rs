//! Command-line entry point: `viaduct-cli [make_base|process_requests]`.
//!
//! `make_base` reads a request document from stdin, builds a catalogue and
//! router from its `base_requests`, and writes a binary artifact to the path
//! named by `serialization_settings`. `process_requests` loads that artifact
//! back and answers `stat_requests`, writing a JSON array to stdout. Mirrors
//! `original_source/app/main.cpp`'s two-mode contract.

use std::env;
use std::io::{self, Read, Write};
use std::process;

use anyhow::{Context, Result};

use viaduct::dispatch::{self, RequestDocument, StatRequest};
use viaduct::persist::{self, Artifact};
use viaduct::render::RenderSettings;
use viaduct::router::{RoutingSettings, TransportRouter};
use viaduct::Catalogue;

fn usage() {
    eprintln!("Usage: viaduct-cli [make_base|process_requests]");
}

fn main() {
    tracing_subscriber::fmt().init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "make_base" => make_base(),
        "process_requests" => process_requests(),
        _ => {
            usage();
            process::exit(1);
        }
    };

    if let Err(err) = result {
        tracing::error!("{err:#}");
        process::exit(1);
    }
}

fn read_document() -> Result<RequestDocument> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).context("reading request document from stdin")?;
    serde_json::from_str(&input).context("parsing request document")
}

fn make_base() -> Result<()> {
    let document = read_document()?;

    let mut catalogue = Catalogue::new();
    dispatch::ingest_base_requests(&mut catalogue, &document.base_requests)
        .context("ingesting base requests")?;

    let routing_settings = document
        .routing_settings
        .map(RoutingSettings::try_from)
        .transpose()
        .context("parsing routing_settings")?
        .unwrap_or(RoutingSettings::new(6, 40.0).expect("default routing settings are valid"));
    let router = TransportRouter::build(&catalogue, routing_settings);

    let render_settings = document
        .render_settings
        .map(RenderSettings::try_from)
        .transpose()
        .context("parsing render_settings")?
        .unwrap_or_default();

    let serialization_settings = document
        .serialization_settings
        .context("make_base requires serialization_settings")?;

    let artifact = Artifact::from_runtime(&catalogue, &router, render_settings);
    persist::save(&serialization_settings.file, &artifact).context("writing artifact")?;

    tracing::info!(stops = catalogue.stop_count(), buses = catalogue.bus_count(), "wrote base");
    Ok(())
}

fn process_requests() -> Result<()> {
    let document = read_document()?;

    let serialization_settings = document
        .serialization_settings
        .context("process_requests requires serialization_settings")?;

    let artifact = match persist::load(&serialization_settings.file) {
        Ok(artifact) => artifact,
        Err(_) => {
            println!("file not opening!");
            process::exit(1);
        }
    };
    let (catalogue, router, render_settings) = artifact.rehydrate();

    let stat_requests: Vec<StatRequest> = document.stat_requests;
    let responses = dispatch::answer_all(&stat_requests, &catalogue, Some(&router), &render_settings);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &responses).context("writing response document")?;
    handle.write_all(b"\n")?;
    Ok(())
}
