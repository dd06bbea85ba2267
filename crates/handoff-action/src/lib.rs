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

//! Admission control, submission and announce convergence for one job handoff.
//!
//! Layout:
//! - `admission.rs`: decide whether the client has room for another job
//! - `dispatch.rs`: translate job options into the client's add parameters
//! - `convergence.rs`: poll trackers and re-announce until one is working
//! - `cycle.rs`: run admission, submission and convergence as one unit of work
//! - `error.rs`: `HandoffError` and the stage it was raised in

pub mod admission;
pub mod convergence;
pub mod cycle;
pub mod dispatch;
pub mod error;

pub use admission::{AdmissionDecision, AdmissionGate, AdmitReason, DeferReason};
pub use convergence::{AnnounceConvergence, ConvergenceOutcome, trackers_converged};
pub use cycle::{CycleOutcome, HandoffCycle};
pub use dispatch::{SubmissionDispatcher, build_options};
pub use error::{HandoffError, HandoffResult, Stage};
