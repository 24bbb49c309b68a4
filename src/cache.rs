use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use log::trace;
use memmap2::MmapOptions;

use crate::record::Record;
use crate::stats::HashStats;

/// Fixed digest width: 160 bits for both hash tiers.
pub const DIGEST_LEN: usize = 20;

/// Extent covered by the partial tier: the file's first page.
pub const PARTIAL_LEN: u64 = 4096;

/// Buffer size for the streamed fallback. The chunking does not affect the
/// resulting digest.
const CHUNK: usize = 8192;

pub type Digest = [u8; DIGEST_LEN];

/// Digest of the leading `min(size, PARTIAL_LEN)` bytes, memoized on the
/// record. A repeat request returns the stored digest and counts as a cache
/// hit.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read; by this point the
/// path has already passed the ingestion accessibility checks, so a failure
/// here means the filesystem changed mid-run.
pub fn partial_digest(rec: &mut Record, stats: &mut HashStats) -> Result<Digest> {
    if let Some(digest) = rec.partial {
        stats.partial_hits += 1;
        return Ok(digest);
    }
    stats.partial_computed += 1;
    let digest = digest_extent(&rec.path, rec.size.min(PARTIAL_LEN), stats)?;
    rec.partial = Some(digest);
    Ok(digest)
}

/// Digest of the entire file, memoized on the record. A repeat request
/// returns the stored digest and counts as a cache hit.
///
/// # Errors
///
/// Same failure conditions as [`partial_digest`].
pub fn full_digest(rec: &mut Record, stats: &mut HashStats) -> Result<Digest> {
    if let Some(digest) = rec.full {
        stats.full_hits += 1;
        return Ok(digest);
    }
    stats.full_computed += 1;
    let digest = digest_extent(&rec.path, rec.size, stats)?;
    rec.full = Some(digest);
    Ok(digest)
}

/// Digest the leading `len` bytes of the file at `path`.
///
/// Tries a zero-copy memory mapping first and falls back to buffered chunked
/// reads when the mapping cannot be established (address space exhaustion on
/// very large files, filesystems that refuse mmap). Both strategies produce
/// the same digest. The descriptor and mapping are scope-bound and released
/// on every path, including errors.
fn digest_extent(path: &Path, len: u64, stats: &mut HashStats) -> Result<Digest> {
    let file = File::open(path)
        .with_context(|| format!("failed to open '{}' for hashing", path.display()))?;

    let mapped = usize::try_from(len)
        .ok()
        // Safety: the mapping is read-only and candidates are treated as an
        // unchanging file set for the duration of the run.
        .and_then(|len| unsafe { MmapOptions::new().len(len).map(&file) }.ok());

    match mapped {
        Some(map) => Ok(digest_bytes(&map)),
        None => {
            trace!("mmap failed for '{}', streaming instead", path.display());
            stats.map_fallbacks += 1;
            digest_stream(&file, len, path)
        }
    }
}

fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    finalize(hasher)
}

fn digest_stream(file: &File, len: u64, path: &Path) -> Result<Digest> {
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        let n = reader
            .read(&mut buffer[..want])
            .with_context(|| format!("read error on '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        remaining -= n as u64;
    }
    Ok(finalize(hasher))
}

/// BLAKE3 output read in XOF mode and truncated to the fixed 160-bit width.
fn finalize(hasher: blake3::Hasher) -> Digest {
    let mut out = [0u8; DIGEST_LEN];
    hasher.finalize_xof().fill(&mut out);
    out
}
