use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "link-file-dups")]
#[command(about = "A CLI tool that reclaims disk space by hard-linking identical files")]
pub struct Cli {
    /// Directories to scan for duplicates; reads a path list from stdin when
    /// omitted
    pub dirs: Vec<PathBuf>,

    /// Stdin path list is NUL-delimited, as produced by `find -print0`
    #[arg(short = '0', long)]
    pub null: bool,

    /// Start with the smallest files instead of the largest
    #[arg(short, long)]
    pub small_first: bool,

    /// Suppress per-merge narration and the summary report
    #[arg(short, long)]
    pub quiet: bool,

    /// Report what would be linked without touching the filesystem
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Trust matching basename and mtime on large files instead of reading
    /// their content (rsync-style heuristic; can produce false matches)
    #[arg(short, long)]
    pub fast: bool,

    /// Apply --fast only to files larger than this many bytes
    #[arg(short = 't', long, default_value_t = 100_000)]
    pub fast_threshold: u64,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Immutable run configuration, derived from the CLI once and passed to every
/// component that needs it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub small_first: bool,
    pub quiet: bool,
    pub dry_run: bool,
    /// `Some(threshold)` when the fast heuristic is enabled.
    pub fast_threshold: Option<u64>,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        // A dry run exists to show its decisions, so it overrides --quiet.
        let quiet = if cli.dry_run && cli.quiet {
            log::warn!("--quiet forced off by --dry-run");
            false
        } else {
            cli.quiet
        };
        Self {
            small_first: cli.small_first,
            quiet,
            dry_run: cli.dry_run,
            fast_threshold: cli.fast.then_some(cli.fast_threshold),
        }
    }

    pub fn narrate(&self) -> bool {
        !self.quiet
    }
}
