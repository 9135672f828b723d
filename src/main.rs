//! Quill - an incremental static site builder.

mod aggregator;
mod cli;
mod config;
mod context;
mod error;
mod generator;
mod imaging;
mod lint;
mod logger;
mod markup;
mod processors;
mod reconcile;
mod renderers;
mod scheduler;
mod serve;
mod templates;
mod utils;
mod watch;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use generator::Generator;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { watch: false, .. } => {
            let report = Generator::new(config)?.build(None)?;
            if !report.is_clean() {
                bail!("build finished with {} failures", report.failures.len());
            }
            Ok(())
        }
        Commands::Build { watch: true, .. } => {
            let mut generator = Generator::new(config)?;
            generator.build(None)?;

            let changes = watch::aggregator(generator.config());
            let changes_for_signal = Arc::clone(&changes);
            ctrlc::set_handler(move || {
                log!("watch"; "shutting down...");
                changes_for_signal.close();
            })
            .context("Failed to set Ctrl+C handler")?;

            watch::watch_and_rebuild(&mut generator, &changes)
        }
        Commands::Serve { .. } => serve::serve_site(config),
        Commands::Lint { files } => {
            let findings = lint::lint_site(&config, files)?;
            if !findings.is_empty() {
                bail!("lint found {} problems", findings.len());
            }
            Ok(())
        }
    }
}
