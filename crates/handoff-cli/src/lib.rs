#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end that hands jobs to a qBittorrent instance.
//!
//! Layout:
//! - `cli.rs`: argument parsing, config/telemetry bootstrap and command dispatch
//! - `commands/`: `check` (admission only) and `push` (full handoff cycle)
//! - `client.rs`: CLI errors and client connection helpers
//! - `output.rs`: text and JSON renderers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
