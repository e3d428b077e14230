// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `packbench list` command - List strategies from configuration.
//!
//! Lists strategies in registration order, which is also report row order.

use std::path::Path;

use packbench_core::ConfigLoader;

pub async fn execute(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(config_path)?;

    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║                        CONFIGURED STRATEGIES                         ║");
    println!("╠═══════════════════════╦════════════════╦═══════╦═════════════════════╣");
    println!("║ Name                  ║ Kind           ║ Level ║ Decoder             ║");
    println!("╠═══════════════════════╬════════════════╬═══════╬═════════════════════╣");

    for strategy in &config.strategies {
        println!(
            "║ {:<21} ║ {:<14} ║ {:>5} ║ {:<19} ║",
            strategy.name.as_str(),
            strategy.kind.as_str(),
            strategy.level.value(),
            strategy.kind.npm_package().unwrap_or("(built-in atob)")
        );
    }

    println!("╚═══════════════════════╩════════════════╩═══════╩═════════════════════╝");
    println!();
    println!("Total: {} strategy(ies)", config.strategies.len());

    Ok(())
}
