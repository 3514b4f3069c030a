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

//! Operator CLI for the whisker status backend.
//!
//! `cli.rs` owns argument parsing and dispatch. The handlers under
//! `commands/` do the actual work, sharing the backend context in
//! `client.rs` and rendering through `output.rs`; `main.rs` is a thin
//! entrypoint around [`run`].

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
