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

//! Client-agnostic handoff interfaces and DTOs.
//!
//! Layout: `model/` (jobs, rule sets, tracker state, loop settings), `service/`
//! (`DownloadClient` trait implemented by adapters), `error.rs` (`ClientError`).

pub mod error;
pub mod model;
pub mod service;

pub use error::{ClientError, ClientResult};
pub use model::{
    AddOptions, ClientRuleSet, ContentHash, ConvergenceSettings, InvalidContentHash, Job,
    JobOptions, JobSource, JobSummary, TrackerEntry, TrackerStatus, TransferInfo,
    UnknownTrackerStatus,
};
pub use service::DownloadClient;
