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

//! Domain types for seedbox session status tracking.
//!
//! The backend reports each session's state as a loose JSON document; this
//! crate decodes it ([`StatusPayload`]), classifies the outcome (healthy,
//! rate-limited soft failure, or hard failure) and produces the canonical
//! in-memory [`StatusRecord`] the rest of the workspace operates on. The
//! mapping lives here so the HTTP client stays transport-only and every
//! consumer sees identical normalization.

mod classify;
mod payload;
mod record;

pub use classify::{RecordKind, normalize};
pub use payload::{
    SeedboxOutcome, SeedboxResponse, SessionLabelRequest, SessionsResponse, StatusPayload,
};
pub use record::{CheckVerdict, Severity, StatusRecord};
