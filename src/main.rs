mod cli;
mod commands;
mod config;
mod document;
mod error;
mod model;
mod pipeline;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::PipelineError;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(exit_code_for(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse(args) => commands::parse::run(args),
        Commands::Toc(args) => commands::toc::run(args),
        Commands::Inventory(args) => commands::inventory::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Input { .. }) => 2,
        Some(PipelineError::NoTableOfContents) => 3,
        None => 1,
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
