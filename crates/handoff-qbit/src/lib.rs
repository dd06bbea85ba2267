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

//! qBittorrent WebAPI v2 adapter implementing [`handoff_core::DownloadClient`].
//!
//! Layout: `settings.rs` (endpoint and credentials), `client.rs` (session and
//! remote calls), `wire.rs` (JSON payloads), `error.rs`.

pub mod client;
pub mod error;
pub mod settings;
mod wire;

pub use client::QbitClient;
pub use error::{QbitError, QbitResult};
pub use settings::QbitSettings;
