//! treesum - incremental content-hash indexes for directory trees.
//!
//! Usage:
//!   treesum update [ROOT]            Refresh ROOT/.sha1s, rehashing only changed files
//!   treesum compare LOCAL REMOTE     List remote files whose content is missing locally
//!   treesum --help                   Show help

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use treesum_analyze::IndexComparator;
use treesum_core::{AgePolicy, BuildConfig, DEFAULT_INDEX_NAME, IndexFile};
use treesum_scan::{BuildEvent, BuildStats, IndexBuilder};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Parser)]
#[command(
    name = "treesum",
    version,
    about = "Incremental SHA-1 indexes of directory trees",
    long_about = "treesum keeps a content-hash index of a directory tree up to date.\n\n\
                  Run `treesum update` periodically to refresh the index, and \
                  `treesum compare` to find files on one tree whose content \
                  exists nowhere on another."
)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the index of a tree
    Update {
        /// Root of the tree
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Drop entries for files that no longer exist
        #[arg(short = 'c', long)]
        remove_missing: bool,

        /// Ignore files last modified more than this many days ago
        #[arg(short = 'i', long, value_name = "DAYS")]
        ignore_older_than: Option<u64>,

        /// With --ignore-older-than, keep indexing old files and only expire
        /// entries whose file is gone
        #[arg(long, requires = "ignore_older_than")]
        expire_unseen_only: bool,

        /// Index file name inside the root
        #[arg(short = 'f', long, default_value = DEFAULT_INDEX_NAME)]
        index: String,

        /// Defer files modified less than this many seconds ago (0 disables)
        #[arg(long, value_name = "SECONDS", default_value = "2")]
        settle: u64,

        /// Treat symbolic links as special files instead of following them
        #[arg(long)]
        no_follow_symlinks: bool,

        /// Maximum directory depth below the root
        #[arg(long)]
        max_depth: Option<u32>,

        /// Glob of root-relative paths to leave out (repeatable)
        #[arg(short = 'x', long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List remote files whose content is not present locally
    Compare {
        /// Local index file, or a directory containing one
        local: PathBuf,

        /// Remote index file, or a directory containing one
        remote: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// JSON summary of an update run.
#[derive(Serialize)]
struct UpdateSummary<'a> {
    index: &'a Path,
    loaded: Option<usize>,
    written: bool,
    entries: usize,
    events: &'a [BuildEvent],
    stats: &'a BuildStats,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Update {
            root,
            remove_missing,
            ignore_older_than,
            expire_unseen_only,
            index,
            settle,
            no_follow_symlinks,
            max_depth,
            exclude,
            format,
        } => {
            let age_policy = if expire_unseen_only {
                AgePolicy::ExpireUnseen
            } else {
                AgePolicy::Exclude
            };
            let config = BuildConfig::builder()
                .root(root)
                .index_name(index)
                .remove_missing(remove_missing)
                .ignore_older_than(ignore_older_than.map(days_to_duration).transpose()?)
                .age_policy(age_policy)
                .settle_time(Duration::from_secs(settle))
                .follow_symlinks(!no_follow_symlinks)
                .max_depth(max_depth)
                .exclude_patterns(exclude)
                .build()
                .wrap_err("Invalid options")?;
            run_update(config, format)?;
        }
        Command::Compare {
            local,
            remote,
            format,
        } => {
            run_compare(&local, &remote, format)?;
        }
    }

    Ok(())
}

/// Convert an `--ignore-older-than` day count to a duration.
fn days_to_duration(days: u64) -> Result<Duration> {
    days.checked_mul(SECONDS_PER_DAY)
        .map(Duration::from_secs)
        .ok_or_else(|| eyre!("--ignore-older-than {days} is too big"))
}

/// Install the stderr log subscriber.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Refresh an index and print the changelog.
fn run_update(config: BuildConfig, format: OutputFormat) -> Result<()> {
    let index_file = config.index_file();
    let builder = IndexBuilder::new(config).wrap_err("Invalid options")?;

    if matches!(format, OutputFormat::Text) && !index_file.path().exists() {
        println!("No existing {} file", builder.config().index_name);
    }

    let mut events = Vec::new();
    let outcome = builder
        .update(|event| match format {
            OutputFormat::Text => println!("{event}"),
            OutputFormat::Json => events.push(event.clone()),
        })
        .wrap_err_with(|| format!("Failed to update {}", index_file.path().display()))?;

    let stats = &outcome.build.stats;
    match format {
        OutputFormat::Text => {
            let config = builder.config();
            if stats.files_hashed() == 0 {
                println!("No new or modified files.");
            }
            if config.remove_missing && stats.removed == 0 {
                println!("No missing files.");
            }
            if config.ignore_older_than.is_some() && stats.expired == 0 {
                println!("No expired files.");
            }
            println!(
                "Hashed {} in {} files ({}/s)",
                format_size(stats.bytes_hashed),
                stats.files_hashed(),
                format_size(stats.bytes_per_second() as u64)
            );
        }
        OutputFormat::Json => {
            let summary = UpdateSummary {
                index: index_file.path(),
                loaded: outcome.loaded,
                written: outcome.written,
                entries: outcome.build.index.len(),
                events: &events,
                stats,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Compare two indexes and print the remote paths missing locally.
fn run_compare(local: &Path, remote: &Path, format: OutputFormat) -> Result<()> {
    let local = load_index(local)?;
    let remote = load_index(remote)?;

    let comparator = IndexComparator::new();
    match format {
        OutputFormat::Text => {
            for path in comparator.missing_from_local(&local, &remote) {
                println!("{path}");
            }
        }
        OutputFormat::Json => {
            let report = comparator.compare(&local, &remote);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Load an index given either its file or the tree root holding it.
fn load_index(path: &Path) -> Result<treesum_core::Index> {
    let file = if path.is_dir() {
        IndexFile::new(path.join(DEFAULT_INDEX_NAME))
    } else {
        IndexFile::new(path)
    };

    file.load_existing()
        .wrap_err_with(|| format!("Failed to load index {}", file.path().display()))
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_to_duration() {
        assert_eq!(days_to_duration(0).unwrap(), Duration::ZERO);
        assert_eq!(days_to_duration(2).unwrap(), Duration::from_secs(2 * 86_400));
        assert!(days_to_duration(u64::MAX / SECONDS_PER_DAY + 1).is_err());
        assert!(days_to_duration(u64::MAX).is_err());
    }

    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from(["treesum", "update", "-c", "-i", "30", "/srv"]).unwrap();
        match cli.command {
            Command::Update {
                root,
                remove_missing,
                ignore_older_than,
                ..
            } => {
                assert_eq!(root, PathBuf::from("/srv"));
                assert!(remove_missing);
                assert_eq!(ignore_older_than, Some(30));
            }
            Command::Compare { .. } => panic!("expected update"),
        }
    }
}
