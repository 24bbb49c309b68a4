use std::io;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use link_file_dups::cli::{Cli, Config};
use link_file_dups::{duplicates, scanner, stats};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet && !cli.dry_run {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    info!("Starting link-file-dups v{}", env!("CARGO_PKG_VERSION"));
    let config = Config::from_cli(&cli);
    if config.dry_run {
        info!("Dry run: nothing will be unlinked or linked");
    }

    let (mut records, scan_stats) = if cli.dirs.is_empty() {
        let stdin = io::stdin();
        scanner::collect_from_list(stdin.lock(), cli.null)?
    } else {
        scanner::collect_from_dirs(&cli.dirs)?
    };

    let run_stats = if records.is_empty() {
        info!("No files left to examine");
        Default::default()
    } else {
        duplicates::run(&mut records, &config)?
    };

    if cli.json {
        stats::print_json(&scan_stats, &run_stats, config.dry_run)?;
    } else if config.narrate() {
        stats::print_summary(&scan_stats, &run_stats, config.dry_run);
    }

    info!(
        "Completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
