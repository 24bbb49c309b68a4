use std::fs;
use std::os::unix::fs::MetadataExt;

use anyhow::{bail, Context, Result};
use log::{error, info};

use crate::cli::Config;
use crate::record::{Record, Status};
use crate::stats::RunStats;

/// Retire `duplicate` in favor of `reference`: drop its directory entry and
/// recreate the name as a hard link to the reference inode. Under a dry run
/// the decision is recorded and narrated but nothing is touched.
///
/// The record is retired regardless of the mutation outcome, so it is never
/// revisited in later windows.
///
/// # Errors
///
/// A failed re-validation, or a failed link after a successful unlink, is an
/// unrecoverable inconsistency and aborts the run. A failed unlink is only
/// counted: the merge is abandoned and the run continues.
pub fn execute(
    reference: &Record,
    duplicate: &mut Record,
    config: &Config,
    stats: &mut RunStats,
) -> Result<()> {
    if config.narrate() {
        info!(
            "{} ln {} -> {}",
            duplicate.size,
            duplicate.path.display(),
            reference.path.display()
        );
    }

    validate(reference, duplicate)?;

    if !config.dry_run {
        if let Err(e) = fs::remove_file(&duplicate.path) {
            error!("cannot unlink '{}': {}", duplicate.path.display(), e);
            stats.unlink_failures += 1;
            duplicate.retire(Status::RetiredAfterFailedUnlink);
            return Ok(());
        }
        // With the old entry gone, failing to create the replacement link
        // would lose the name entirely.
        fs::hard_link(&reference.path, &duplicate.path).with_context(|| {
            format!(
                "cannot link '{}' -> '{}' after unlinking",
                duplicate.path.display(),
                reference.path.display()
            )
        })?;
    }

    // Blocks come back only when the last remaining link goes away.
    if duplicate.nlink == 1 {
        stats.blocks_reclaimed += duplicate.blocks;
    }
    stats.merges += 1;
    duplicate.retire(Status::RetiredAsDuplicate);
    Ok(())
}

/// Re-check both paths on disk immediately before mutating. The in-memory
/// snapshot must still describe reality; any drift means the filesystem
/// changed under the run.
fn validate(reference: &Record, duplicate: &Record) -> Result<()> {
    let a = fs::symlink_metadata(&reference.path)
        .with_context(|| format!("cannot stat '{}'", reference.path.display()))?;
    let b = fs::symlink_metadata(&duplicate.path)
        .with_context(|| format!("cannot stat '{}'", duplicate.path.display()))?;

    if a.size() != b.size() {
        bail!(
            "sizes of '{}' and '{}' diverged mid-run",
            reference.path.display(),
            duplicate.path.display()
        );
    }
    if a.ino() == b.ino() {
        bail!(
            "'{}' and '{}' became hard links mid-run",
            reference.path.display(),
            duplicate.path.display()
        );
    }
    if a.dev() != b.dev() {
        bail!(
            "'{}' and '{}' are no longer on the same device",
            reference.path.display(),
            duplicate.path.display()
        );
    }
    if a.mtime() > b.mtime() {
        bail!(
            "modification times of '{}' and '{}' inverted mid-run",
            reference.path.display(),
            duplicate.path.display()
        );
    }
    Ok(())
}
