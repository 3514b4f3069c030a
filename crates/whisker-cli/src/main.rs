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

//! Binary entrypoint for the whisker CLI.

use std::process;

/// Parses arguments, runs the requested command, and exits with its code.
#[tokio::main]
async fn main() {
    process::exit(whisker_cli::run().await);
}
