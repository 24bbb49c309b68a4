use std::ffi::OsString;
use std::fs;
use std::io::BufRead;
use std::os::unix::ffi::OsStringExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::record::Record;
use crate::stats::ScanStats;

/// Build the candidate sequence from a delimited path list (one path per
/// line, or NUL-separated when `nul` is set).
///
/// Every surviving record is an existing regular file, readable, non-empty,
/// and backed by at least one allocated block; everything downstream trusts
/// this and never re-filters.
pub fn collect_from_list<R: BufRead>(reader: R, nul: bool) -> Result<(Vec<Record>, ScanStats)> {
    let delimiter = if nul { b'\0' } else { b'\n' };
    let mut stats = ScanStats::default();
    let mut records = Vec::new();

    let spinner = scan_spinner();
    for chunk in reader.split(delimiter) {
        let bytes = chunk.context("failed to read path list from stdin")?;
        stats.total += 1;
        if bytes.is_empty() {
            stats.null_paths += 1;
            continue;
        }
        let path = PathBuf::from(OsString::from_vec(bytes));
        if let Some(rec) = classify(path, &mut stats) {
            records.push(rec);
        }
        spinner.set_message(format!("Examined {} paths...", stats.total));
    }
    spinner.finish_and_clear();

    stats.kept = records.len() as u64;
    info!(
        "Kept {} of {} input paths as candidates",
        stats.kept, stats.total
    );
    Ok((records, stats))
}

/// Build the candidate sequence by walking directories, through the same
/// classification as the stdin list.
pub fn collect_from_dirs(dirs: &[PathBuf]) -> Result<(Vec<Record>, ScanStats)> {
    let mut stats = ScanStats::default();
    let mut records = Vec::new();

    let spinner = scan_spinner();
    for dir in dirs {
        info!("Scanning {}", dir.display());
        for entry in WalkDir::new(dir) {
            match entry {
                Ok(entry) => {
                    stats.total += 1;
                    if let Some(rec) = classify(entry.into_path(), &mut stats) {
                        records.push(rec);
                    }
                    spinner.set_message(format!("Examined {} paths...", stats.total));
                }
                Err(e) => {
                    warn!("failed to read directory entry: {}", e);
                    stats.stat_failures += 1;
                }
            }
        }
    }
    spinner.finish_and_clear();

    stats.kept = records.len() as u64;
    info!(
        "Kept {} of {} scanned paths as candidates",
        stats.kept, stats.total
    );
    Ok((records, stats))
}

/// Stat one path and keep it only if it is a readable, non-empty regular
/// file with allocated storage. Everything else is counted and dropped.
fn classify(path: PathBuf, stats: &mut ScanStats) -> Option<Record> {
    let meta = match fs::symlink_metadata(&path) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("cannot stat '{}': {}", path.display(), e);
            stats.stat_failures += 1;
            return None;
        }
    };

    let file_type = meta.file_type();
    if file_type.is_dir() {
        stats.directories += 1;
        return None;
    }
    if file_type.is_symlink() {
        stats.symlinks += 1;
        return None;
    }
    if file_type.is_fifo() {
        stats.fifos += 1;
        return None;
    }
    if file_type.is_socket() {
        stats.sockets += 1;
        return None;
    }
    if file_type.is_char_device() {
        stats.char_devices += 1;
        return None;
    }
    if file_type.is_block_device() {
        stats.block_devices += 1;
        return None;
    }
    stats.regular += 1;

    // Nothing to reclaim from empty files or files whose data lives entirely
    // in the inode; zero-length files are also commonly used as flags and
    // locks that should not be disturbed.
    if meta.size() == 0 || meta.blocks() == 0 {
        stats.empty += 1;
        return None;
    }
    if fs::File::open(&path).is_err() {
        stats.not_accessible += 1;
        return None;
    }

    Some(Record::new(path, &meta))
}

fn scan_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Examining input paths...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
