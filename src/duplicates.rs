use anyhow::Result;
use log::{debug, info};

use crate::cache;
use crate::cli::Config;
use crate::merge;
use crate::record::{self, Record, Status};
use crate::stats::{HashStats, RunStats};

/// Outcome of the equality cascade for one in-window pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Same device and inode: the same on-disk object enumerated twice.
    AlreadyLinked,
    Duplicate,
    Distinct,
}

/// Sort the candidate sequence, then make a single left-to-right pass over
/// it, merging every duplicate found. Returns the accumulated statistics.
pub fn run(records: &mut [Record], config: &Config) -> Result<RunStats> {
    // One stable sort up front; ties keep their ingestion order. The
    // sequence is never resorted.
    records.sort_by(|a, b| record::order(a, b, config.small_first));
    info!("Sort done, {} candidates", records.len());

    let mut stats = RunStats::default();
    scan_and_merge(records, config, &mut stats)?;
    Ok(stats)
}

/// Walk the sorted sequence. Each active record becomes the reference of its
/// window; the sort guarantees that every record with the same size on the
/// same device sits directly after it.
fn scan_and_merge(records: &mut [Record], config: &Config, stats: &mut RunStats) -> Result<()> {
    for i in 0..records.len() {
        if records[i].is_retired() {
            continue;
        }
        let (size, dev) = (records[i].size, records[i].dev);

        for j in (i + 1)..records.len() {
            if records[j].size != size || records[j].dev != dev {
                break;
            }
            if records[j].is_retired() {
                continue;
            }

            let (head, tail) = records.split_at_mut(j);
            let reference = &mut head[i];
            let candidate = &mut tail[0];

            match compare(reference, candidate, config, &mut stats.hashes)? {
                Verdict::AlreadyLinked => {
                    debug!(
                        "'{}' is an existing link to '{}'",
                        candidate.path.display(),
                        reference.path.display()
                    );
                    stats.already_linked += 1;
                    candidate.retire(Status::RetiredAsLink);
                }
                Verdict::Duplicate => {
                    merge::execute(reference, candidate, config, stats)?;
                }
                Verdict::Distinct => {}
            }
        }
    }
    Ok(())
}

/// Decide whether two candidates hold identical content, cheapest test
/// first, short-circuiting on the first conclusive signal:
/// identity (device+inode), size/device agreement, the optional
/// basename+mtime shortcut, the first-page digest, and finally the
/// full-file digest.
fn compare(
    a: &mut Record,
    b: &mut Record,
    config: &Config,
    hashes: &mut HashStats,
) -> Result<Verdict> {
    if a.dev == b.dev && a.ino == b.ino {
        return Ok(Verdict::AlreadyLinked);
    }

    // The sort guarantees in-window pairs agree on size and device; treat
    // disagreement as conclusive anyway.
    if a.size != b.size || a.dev != b.dev {
        return Ok(Verdict::Distinct);
    }

    // Rsync-style shortcut: a large file with the same basename and the
    // exact same mtime is accepted as equal without reading content. This
    // trades correctness for speed and is opt-in.
    if let Some(threshold) = config.fast_threshold {
        if a.size > threshold
            && a.mtime == b.mtime
            && a.basename().is_some()
            && a.basename() == b.basename()
        {
            debug!(
                "fast match: '{}' == '{}' (basename and mtime)",
                a.path.display(),
                b.path.display()
            );
            return Ok(Verdict::Duplicate);
        }
    }

    if cache::partial_digest(a, hashes)? != cache::partial_digest(b, hashes)? {
        return Ok(Verdict::Distinct);
    }

    if cache::full_digest(a, hashes)? == cache::full_digest(b, hashes)? {
        Ok(Verdict::Duplicate)
    } else {
        hashes.partial_hit_full_fail += 1;
        Ok(Verdict::Distinct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn record_for(path: &Path) -> Record {
        let meta = fs::symlink_metadata(path).unwrap();
        Record::new(path.to_path_buf(), &meta)
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> Record {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        record_for(&path)
    }

    #[test]
    fn hard_linked_pair_is_already_linked() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.bin", &[1u8; 256]);
        let link = dir.path().join("a-link.bin");
        fs::hard_link(&a.path, &link).unwrap();
        let mut b = record_for(&link);
        let mut a = a;

        let mut hashes = HashStats::default();
        let verdict = compare(&mut a, &mut b, &Config::default(), &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::AlreadyLinked);
        // Conclusive without reading any content.
        assert_eq!(hashes.partial_computed, 0);
        assert_eq!(hashes.full_computed, 0);
    }

    #[test]
    fn first_page_mismatch_skips_full_hash() {
        let dir = TempDir::new().unwrap();
        let mut a = write_file(&dir, "a.bin", &[1u8; 8192]);
        let mut b = write_file(&dir, "b.bin", &[2u8; 8192]);

        let mut hashes = HashStats::default();
        let verdict = compare(&mut a, &mut b, &Config::default(), &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::Distinct);
        assert_eq!(hashes.partial_computed, 2);
        assert_eq!(hashes.full_computed, 0);
    }

    #[test]
    fn partial_hit_full_fail_is_counted() {
        let dir = TempDir::new().unwrap();
        let mut same_head_a = vec![9u8; 4096];
        same_head_a.extend_from_slice(&[1u8; 4096]);
        let mut same_head_b = vec![9u8; 4096];
        same_head_b.extend_from_slice(&[2u8; 4096]);
        let mut a = write_file(&dir, "a.bin", &same_head_a);
        let mut b = write_file(&dir, "b.bin", &same_head_b);

        let mut hashes = HashStats::default();
        let verdict = compare(&mut a, &mut b, &Config::default(), &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::Distinct);
        assert_eq!(hashes.full_computed, 2);
        assert_eq!(hashes.partial_hit_full_fail, 1);
    }

    #[test]
    fn identical_content_is_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut a = write_file(&dir, "a.bin", &[5u8; 6000]);
        let mut b = write_file(&dir, "b.bin", &[5u8; 6000]);

        let mut hashes = HashStats::default();
        let verdict = compare(&mut a, &mut b, &Config::default(), &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::Duplicate);
        assert_eq!(hashes.partial_computed, 2);
        assert_eq!(hashes.full_computed, 2);
        assert_eq!(hashes.partial_hit_full_fail, 0);
    }

    #[test]
    fn fast_heuristic_respects_the_size_gate() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("one")).unwrap();
        fs::create_dir(dir.path().join("two")).unwrap();
        let mut a = write_file(&dir, "one/data.bin", &[1u8; 512]);
        let mut b = write_file(&dir, "two/data.bin", &[2u8; 512]);
        // Same basename; force identical mtimes.
        filetime::set_file_mtime(&a.path, filetime::FileTime::from_unix_time(1000, 0)).unwrap();
        filetime::set_file_mtime(&b.path, filetime::FileTime::from_unix_time(1000, 0)).unwrap();
        a.mtime = 1000;
        b.mtime = 1000;

        let config = Config {
            fast_threshold: Some(100_000),
            ..Default::default()
        };
        let mut hashes = HashStats::default();
        // Below the threshold the content decides.
        let verdict = compare(&mut a, &mut b, &config, &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::Distinct);

        let config = Config {
            fast_threshold: Some(100),
            ..Default::default()
        };
        let mut hashes = HashStats::default();
        // Above the threshold the basename+mtime shortcut wins, wrongly here.
        let verdict = compare(&mut a, &mut b, &config, &mut hashes).unwrap();
        assert_eq!(verdict, Verdict::Duplicate);
        assert_eq!(hashes.partial_computed, 0);
    }

    #[test]
    fn sort_makes_same_size_files_adjacent() {
        let dir = TempDir::new().unwrap();
        let big_a = write_file(&dir, "big-a.bin", &[1u8; 9000]);
        let small = write_file(&dir, "small.bin", &[2u8; 100]);
        let big_b = write_file(&dir, "big-b.bin", &[3u8; 9000]);

        let mut records = vec![big_a, small, big_b];
        records.sort_by(|a, b| record::order(a, b, false));
        assert_eq!(records[0].size, 9000);
        assert_eq!(records[1].size, 9000);
        assert_eq!(records[2].size, 100);
    }
}
