use std::sync::Arc;

use clap::Parser;

use super::{Arguments, Config};
use crate::prelude::*;

/// Type alias for an atomically-refcounted instance of [`InnerContext`].
pub type Context = Arc<InnerContext>;

/// Inner representation of program context. Built once at startup and passed around explicitly.
#[derive(Debug)]
pub struct InnerContext {
    pub args: Arguments,
    pub config: Config,
}

impl InnerContext {
    pub fn init() -> Result<Context> {
        let args = Arguments::parse();
        let config = Config::from_path(&args.config)?;

        Ok(Self::new(args, config))
    }

    pub fn new(args: Arguments, config: Config) -> Context {
        Arc::new(InnerContext { args, config })
    }
}
