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

//! Typed HTTP client for the seedbox status backend.
//!
//! Wraps `reqwest` with the calls the engine needs: reading (and forcing) the
//! status document, pushing the session's IP to the seedbox, and listing or
//! persisting session labels. The client stays transport-only; payload
//! interpretation lives in `whisker-model`.

mod client;
mod error;

pub use client::StatusClient;
pub use error::{ClientError, ClientResult};
