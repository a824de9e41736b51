//! photomatch: color-magnitude diagram from two calibrated star catalogs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use photomatch::{analyze, render, Config};

#[derive(Parser)]
#[command(name = "photomatch")]
#[command(about = "Cross-match two stellar catalogs and plot their color-magnitude diagram")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration.
    config: PathBuf,

    /// Log per-run statistics.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("failed to initialize logging")?;

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;

    let analysis = analyze(&config).context("analysis failed")?;
    info!(
        "{} of {} stars have a counterpart.",
        analysis.report.matched, analysis.report.candidates
    );

    render(&analysis.plot, &config.output)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    Ok(())
}
