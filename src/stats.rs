use anyhow::Result;
use colored::Colorize;
use indicatif::{HumanBytes, HumanCount};
use serde::Serialize;

/// Classification counts from the ingestion pass. Discarded inputs are
/// counted per class but never treated as errors.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanStats {
    pub total: u64,
    pub regular: u64,
    pub directories: u64,
    pub symlinks: u64,
    pub fifos: u64,
    pub sockets: u64,
    pub char_devices: u64,
    pub block_devices: u64,
    pub empty: u64,
    pub stat_failures: u64,
    pub not_accessible: u64,
    pub null_paths: u64,
    /// Paths that survived classification and became candidates.
    pub kept: u64,
}

/// Per-tier digest accounting.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HashStats {
    pub partial_computed: u64,
    pub partial_hits: u64,
    pub full_computed: u64,
    pub full_hits: u64,
    /// Pairs whose partial digests matched but full digests did not.
    pub partial_hit_full_fail: u64,
    /// Full or partial digests served by the streamed fallback after a
    /// failed mapping.
    pub map_fallbacks: u64,
}

/// Accumulated outcome of the scan-and-merge pass, threaded explicitly
/// through the pipeline and handed to the report at the end.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    /// Positive verdicts acted on (under dry run: would have been acted on).
    pub merges: u64,
    /// Candidates that were already hard links to their reference.
    pub already_linked: u64,
    pub unlink_failures: u64,
    /// 512-byte blocks credited from retired sole-link files. An estimate,
    /// not a guarantee.
    pub blocks_reclaimed: u64,
    pub hashes: HashStats,
}

fn blocks_as_bytes(blocks: u64) -> u64 {
    blocks * 512
}

pub fn print_summary(scan: &ScanStats, run: &RunStats, dry_run: bool) {
    println!();
    if run.merges == 0 {
        println!("{}", "No duplicate files found!".green());
    } else {
        let headline = format!(
            "{} {} duplicate files, reclaiming {}",
            if dry_run { "Would merge" } else { "Merged" },
            HumanCount(run.merges),
            HumanBytes(blocks_as_bytes(run.blocks_reclaimed)),
        );
        if dry_run {
            println!("{}", headline.yellow());
        } else {
            println!("{}", headline.green());
        }
    }

    println!(
        "Input paths: {} total, {} kept as candidates",
        HumanCount(scan.total),
        HumanCount(scan.kept)
    );
    for (label, count) in [
        ("directories", scan.directories),
        ("symbolic links", scan.symlinks),
        ("FIFOs", scan.fifos),
        ("sockets", scan.sockets),
        ("character specials", scan.char_devices),
        ("block specials", scan.block_devices),
        ("empty or blockless", scan.empty),
        ("stat failures", scan.stat_failures),
        ("not accessible", scan.not_accessible),
        ("null pathnames", scan.null_paths),
    ] {
        if count > 0 {
            println!("  {}: {}", label, HumanCount(count));
        }
    }

    if run.already_linked > 0 {
        println!(
            "Existing hard links skipped: {}",
            HumanCount(run.already_linked)
        );
    }
    if run.unlink_failures > 0 {
        println!(
            "{}",
            format!("Unlink failures: {}", HumanCount(run.unlink_failures)).red()
        );
    }
    println!(
        "First-page hashes: {} computed, {} cache hits",
        HumanCount(run.hashes.partial_computed),
        HumanCount(run.hashes.partial_hits)
    );
    println!(
        "Full-file hashes: {} computed, {} cache hits, {} partial-hit mismatches, {} map fallbacks",
        HumanCount(run.hashes.full_computed),
        HumanCount(run.hashes.full_hits),
        HumanCount(run.hashes.partial_hit_full_fail),
        HumanCount(run.hashes.map_fallbacks)
    );
    if dry_run {
        println!("{}", "This was a dry run; nothing was modified.".yellow());
    }
}

pub fn print_json(scan: &ScanStats, run: &RunStats, dry_run: bool) -> Result<()> {
    #[derive(Serialize)]
    struct Report<'a> {
        dry_run: bool,
        scan: &'a ScanStats,
        run: &'a RunStats,
        reclaimed_bytes: u64,
    }
    let report = Report {
        dry_run,
        scan,
        run,
        reclaimed_bytes: blocks_as_bytes(run.blocks_reclaimed),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
