#![warn(clippy::perf, clippy::style, warnings)]

mod cli;
mod common;
mod compose;
mod github;
mod remote;
mod render;
mod serve;
mod template;

mod prelude {
    pub use color_eyre::eyre::{bail, eyre, ContextCompat, Report, Result, WrapErr};
    pub use color_eyre::Section;
    pub use tracing::{debug, error, info, trace, warn};

    pub use crate::common::*;
}

use prelude::*;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    color_eyre::install()?;
    install_logging();

    let ctx = InnerContext::init()?;

    match &ctx.args.command {
        Command::Serve { .. } => serve::serve(&ctx),
        Command::Templates { category } => cli::templates(category.as_deref()),
        Command::Preview { input, fields, raw } => cli::preview(input, fields, *raw),
        Command::Submit(submit) => cli::submit(&ctx, submit),
    }
}

fn install_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .init();
}
