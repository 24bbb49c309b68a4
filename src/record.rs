use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use crate::cache::Digest;

/// Why a record left the candidate pool.
///
/// All retired states are terminal: a retired record is never compared
/// again and never becomes a merge source or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    /// Already a hard link to an earlier reference inode; nothing to merge.
    RetiredAsLink,
    /// Merged onto a reference inode (or would be, under a dry run).
    RetiredAsDuplicate,
    /// The merge was abandoned after a failed unlink.
    RetiredAfterFailedUnlink,
}

/// One candidate file, as captured by the ingestion stat.
///
/// The inode snapshot (size, device, mtime, link and block counts) is taken
/// once and trusted for the rest of the run; the merge executor re-checks it
/// against the filesystem immediately before mutating anything.
#[derive(Debug, Clone)]
pub struct Record {
    pub path: PathBuf,
    pub dev: u64,
    pub ino: u64,
    pub size: u64,
    pub mtime: i64,
    pub nlink: u64,
    pub blocks: u64,
    pub status: Status,
    /// Digest of the first page, filled in on first use.
    pub partial: Option<Digest>,
    /// Digest of the whole file, filled in on first use.
    pub full: Option<Digest>,
}

impl Record {
    pub fn new(path: PathBuf, meta: &Metadata) -> Self {
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            size: meta.size(),
            mtime: meta.mtime(),
            nlink: meta.nlink(),
            blocks: meta.blocks(),
            status: Status::Active,
            partial: None,
            full: None,
            path,
        }
    }

    pub fn is_retired(&self) -> bool {
        self.status != Status::Active
    }

    pub fn retire(&mut self, status: Status) {
        debug_assert!(!self.is_retired());
        self.status = status;
    }

    pub fn basename(&self) -> Option<&OsStr> {
        self.path.file_name()
    }
}

/// Total order that makes every group of potentially identical files
/// contiguous: size first (largest first unless `small_first`), then device,
/// then modification time ascending, then link count descending.
///
/// Oldest-first puts the likely original at the front of each group, since
/// copy tools often fail to preserve timestamps. Fewer links sorting later
/// makes sparsely linked files the preferred ones to retire. Retired records
/// always sort to the end.
pub fn order(a: &Record, b: &Record, small_first: bool) -> Ordering {
    match (a.is_retired(), b.is_retired()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let by_size = if small_first {
        a.size.cmp(&b.size)
    } else {
        b.size.cmp(&a.size)
    };
    by_size
        .then_with(|| a.dev.cmp(&b.dev))
        .then_with(|| a.mtime.cmp(&b.mtime))
        .then_with(|| b.nlink.cmp(&a.nlink))
}
