// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `packbench validate` command - Validate configuration file.

use std::path::Path;

use packbench_core::{ConfigLoader, StrategyRegistry};

pub async fn execute(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file.display(), "Validating configuration");

    let checked = ConfigLoader::load_file(file).and_then(|config| {
        // duplicate names only surface at registration
        StrategyRegistry::from_config(&config.strategies)?;
        Ok(config)
    });

    match checked {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Run Settings:");
            println!("  Corpus Directory:   {}", config.corpus_dir.display());
            println!("  Output Directory:   {}", config.output_dir.display());
            println!();
            println!("Bundler:");
            println!("  Program:            {}", config.bundler.program);
            println!("  Working Directory:  {}", config.bundler.working_dir.display());
            println!(
                "  Target / Format:    {} / {} ({})",
                config.bundler.target,
                config.bundler.format.as_str(),
                config.bundler.platform
            );
            println!("  Concurrency:        {}", config.bundler.concurrency);
            println!();
            println!("Sandbox:");
            println!("  Program:            {}", config.sandbox.program);
            println!(
                "  Timeout:            {}ms",
                config.sandbox.timeout.as_millis()
            );
            println!("  Concurrency:        {}", config.sandbox.concurrency);
            println!();
            println!("Strategies ({}):", config.strategies.len());
            for strategy in &config.strategies {
                println!(
                    "  - {} (kind: {}, level: {})",
                    strategy.name,
                    strategy.kind,
                    strategy.level.value()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
