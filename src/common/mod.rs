//! Types, functions, constants and other items that are globally relevant throughout the codebase.

mod args;
mod config;
mod context;

pub use args::*;
pub use config::*;
pub use context::*;

use crate::prelude::*;

pub const CONFIG_FILENAME: &str = "issuesmith.toml";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the multithreaded Tokio runtime used by every `async` entrypoint.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to start the async runtime.")
}
