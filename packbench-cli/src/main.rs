// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! packbench CLI
//!
//! Command-line interface for the packbench compression harness.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// packbench - compare browser-side decompression strategies on a JSON corpus
#[derive(Parser)]
#[command(name = "packbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to packbench.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Benchmark every strategy against every payload
    Run(RunArgs),

    /// List configured strategies
    List,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Corpus directory (overrides corpus_dir)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Scratch/output directory (overrides output_dir); wiped on every run
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Only run the named strategy; repeatable
    #[arg(short, long = "strategy")]
    pub strategies: Vec<String>,

    /// Write the JSON report to this path instead of <out>/reports
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Build every successful pair twice and flag non-identical artifacts
    #[arg(long)]
    pub check_determinism: bool,

    /// Exit non-zero if any pair failed
    #[arg(long)]
    pub check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Run(args) => commands::run::execute(cli.config.as_deref(), args).await,
        Commands::List => commands::list::execute(cli.config.as_deref()).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
    }
}
