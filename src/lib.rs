pub mod cache;
pub mod cli;
pub mod duplicates;
pub mod merge;
pub mod record;
pub mod scanner;
pub mod stats;

pub use cli::{Cli, Config};
pub use duplicates::{run, Verdict};
pub use record::{Record, Status};
pub use scanner::{collect_from_dirs, collect_from_list};
pub use stats::{RunStats, ScanStats};
