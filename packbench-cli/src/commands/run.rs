// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `packbench run` command - Benchmark the corpus.

use std::path::Path;
use std::sync::Arc;

use crossterm::tty::IsTty;
use packbench_core::{
    ConfigLoader, Corpus, EsbuildBundler, NodeEngine, Orchestrator, RunOptions, SandboxEngine,
    StrategyRegistry,
};
use packbench_report::{BenchReport, JsonReporter, TableRenderer};

use crate::RunArgs;

pub async fn execute(
    config_path: Option<&Path>,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(config_path)?;

    // CLI flags override file values
    if let Some(corpus) = args.corpus {
        config.corpus_dir = corpus;
    }
    if let Some(out) = args.out {
        config.output_dir = out;
    }
    config.retain_strategies(&args.strategies)?;

    let registry = StrategyRegistry::from_config(&config.strategies)?;
    let corpus = Corpus::load_dir(&config.corpus_dir)?;

    tracing::info!(
        corpus = %config.corpus_dir.display(),
        output = %config.output_dir.display(),
        strategies = registry.len(),
        "Configuration loaded"
    );

    let engine: Arc<dyn SandboxEngine> =
        Arc::new(NodeEngine::launch(&config.sandbox.program, &config.output_dir).await?);

    let orchestrator = match Orchestrator::new(
        registry,
        Arc::new(EsbuildBundler::new(&config.bundler)),
        Arc::clone(&engine),
        &config,
        RunOptions {
            check_determinism: args.check_determinism,
        },
    ) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            engine.close().await?;
            return Err(e.into());
        }
    };

    // Closes the engine on every path
    let results = orchestrator.run(&corpus, &config.output_dir).await?;

    let color = !args.no_color && std::io::stdout().is_tty();
    println!();
    print!("{}", TableRenderer::new(color).render(&results));

    let report = BenchReport::from_results(&results);
    let report_path = match args.json {
        Some(path) => {
            JsonReporter::write_to(&path, &report)?;
            path
        }
        None => JsonReporter::new(config.output_dir.join("reports"))?.save(&report)?,
    };
    println!("Report: {}", report_path.display());

    if args.check && results.has_failures() {
        eprintln!(
            "✗ {} of {} pair(s) failed",
            results.failure_count(),
            results.pair_count()
        );
        std::process::exit(1);
    }

    Ok(())
}
