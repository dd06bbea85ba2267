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

//! File-backed configuration for download clients, actions and the
//! convergence loop.
//!
//! Layout: `model.rs` (typed documents), `loader.rs` (YAML/JSON loading),
//! `validate.rs` (validation), `defaults.rs` (default values), `error.rs`.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_PATH_ENV, DocumentFormat, load_from_path, parse_document, resolve_path};
pub use model::{ActionProfile, ClientProfile, ConvergenceSection, HandoffConfig, LoggingSection};
pub use validate::validate;
