//! Incremental index builder.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use compact_str::CompactString;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};

use treesum_core::{
    AgePolicy, BuildConfig, ContentHash, Entry, Index, IndexError, Modified, Sha1, SkipReason,
};

use crate::classify::{EntryClass, resolve};
use crate::event::{BuildEvent, BuildStats};
use crate::ancestors::AncestorChain;

/// Read buffer size for hashing.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Result of one build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The refreshed index.
    pub index: Index,
    /// Whether any entry was added, rehashed or removed.
    pub changed: bool,
    /// Run counters.
    pub stats: BuildStats,
}

/// Result of [`IndexBuilder::update`].
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Entries in the index file before the run, or `None` if there was none.
    pub loaded: Option<usize>,
    /// The build itself.
    pub build: BuildOutcome,
    /// Whether the index file was rewritten.
    pub written: bool,
}

/// Walks a tree and refreshes a content-hash index, rehashing only files
/// whose modification time changed.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    config: BuildConfig,
    excludes: GlobSet,
}

impl IndexBuilder {
    /// Create a builder, validating the config and compiling exclude patterns.
    pub fn new(config: BuildConfig) -> Result<Self, IndexError> {
        config.validate()?;

        let mut globs = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| IndexError::InvalidConfig {
                message: format!("bad exclude pattern {pattern:?}: {e}"),
            })?;
            globs.add(glob);
        }
        let excludes = globs.build().map_err(|e| IndexError::InvalidConfig {
            message: e.to_string(),
        })?;

        Ok(Self { config, excludes })
    }

    /// The configuration this builder runs with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Refresh `prior` against the tree as of now.
    pub fn build(
        &self,
        prior: Index,
        observer: impl FnMut(&BuildEvent),
    ) -> Result<BuildOutcome, IndexError> {
        self.build_at(prior, SystemTime::now(), observer)
    }

    /// Refresh `prior` using `now` as the reference time for age and
    /// freshness checks.
    ///
    /// Any filesystem error aborts the build; `prior` is consumed either way
    /// and nothing is written to disk.
    pub fn build_at(
        &self,
        prior: Index,
        now: SystemTime,
        observer: impl FnMut(&BuildEvent),
    ) -> Result<BuildOutcome, IndexError> {
        let start = Instant::now();
        let mut run = BuildRun {
            config: &self.config,
            excludes: &self.excludes,
            now: Modified::from(now),
            index: prior,
            seen: HashSet::new(),
            stats: BuildStats::new(),
            changed: false,
            buffer: vec![0u8; READ_BUFFER_SIZE],
            observer,
        };

        run.walk()?;
        run.prune();

        let mut stats = run.stats;
        stats.elapsed = start.elapsed();
        debug!(
            files = stats.files_seen,
            hashed = stats.files_hashed(),
            bytes = stats.bytes_hashed,
            "build finished"
        );

        Ok(BuildOutcome {
            index: run.index,
            changed: run.changed,
            stats,
        })
    }

    /// Load the index file, refresh it, and write it back if anything changed.
    pub fn update(&self, observer: impl FnMut(&BuildEvent)) -> Result<UpdateOutcome, IndexError> {
        let file = self.config.index_file();
        let prior = file.load()?;
        let loaded = prior.as_ref().map(Index::len);
        if let Some(count) = loaded {
            info!(path = %file.path().display(), entries = count, "index loaded");
        }

        let build = self.build(prior.unwrap_or_default(), observer)?;
        if build.changed {
            file.store(&build.index)?;
        }

        Ok(UpdateOutcome {
            loaded,
            written: build.changed,
            build,
        })
    }
}

/// A directory waiting to be listed.
struct PendingDir {
    path: PathBuf,
    /// Root-relative path, empty for the root itself.
    relative: String,
    /// Directories from the root down to this one.
    ancestors: AncestorChain,
}

impl PendingDir {
    /// Levels below the root; the root itself is 0.
    fn depth(&self) -> u32 {
        u32::try_from(self.ancestors.depth().saturating_sub(1)).unwrap_or(u32::MAX)
    }
}

/// Mutable state of one build.
struct BuildRun<'a, F> {
    config: &'a BuildConfig,
    excludes: &'a GlobSet,
    now: Modified,
    index: Index,
    /// Paths observed during this walk.
    seen: HashSet<CompactString>,
    stats: BuildStats,
    changed: bool,
    buffer: Vec<u8>,
    observer: F,
}

impl<F: FnMut(&BuildEvent)> BuildRun<'_, F> {
    fn emit(&mut self, event: BuildEvent) {
        self.changed |= event.is_change();
        self.stats.record(&event);
        (self.observer)(&event);
    }

    fn skip(&mut self, path: String, reason: SkipReason) {
        if reason == SkipReason::NonUtf8Name {
            warn!(path = %path, "file name is not valid UTF-8, skipping");
        } else {
            debug!(path = %path, %reason, "skipping");
        }
        self.emit(BuildEvent::Skipped { path, reason });
    }

    /// Walk the tree depth-first with an explicit stack.
    fn walk(&mut self) -> Result<(), IndexError> {
        let root = self.config.root.as_path();
        let metadata = fs::metadata(root).map_err(|e| IndexError::io(root, e))?;
        if !metadata.is_dir() {
            return Err(IndexError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        let ancestors = AncestorChain::new()
            .descend(root, &metadata)
            .map_err(|e| IndexError::io(root, e))?
            .unwrap_or_default();

        let mut pending = vec![PendingDir {
            path: root.to_path_buf(),
            relative: String::new(),
            ancestors,
        }];

        while let Some(dir) = pending.pop() {
            let subdirs = self.walk_dir(&dir)?;
            // Reversed so the stack pops them in name order.
            pending.extend(subdirs.into_iter().rev());
        }

        Ok(())
    }

    /// Process one directory's entries, returning its subdirectories.
    fn walk_dir(&mut self, dir: &PendingDir) -> Result<Vec<PendingDir>, IndexError> {
        let mut entries = fs::read_dir(&dir.path)
            .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
            .map_err(|e| IndexError::io(&dir.path, e))?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut subdirs = Vec::new();

        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name();

            let Some(name) = file_name.to_str() else {
                let lossy = join_relative(&dir.relative, &file_name.to_string_lossy());
                self.skip(lossy, SkipReason::NonUtf8Name);
                continue;
            };
            let relative = join_relative(&dir.relative, name);

            if self.config.is_index_path(&relative) {
                continue;
            }
            if self.excludes.is_match(&relative) {
                self.skip(relative, SkipReason::Excluded);
                continue;
            }

            let file_type = entry.file_type().map_err(|e| IndexError::io(&path, e))?;

            match resolve(&path, file_type, self.config.follow_symlinks) {
                EntryClass::Directory => {
                    let depth = dir.depth() + 1;
                    if self.config.max_depth.is_some_and(|max| depth > max) {
                        self.skip(relative, SkipReason::DepthLimit);
                        continue;
                    }

                    let metadata = fs::metadata(&path).map_err(|e| IndexError::io(&path, e))?;
                    let descended = dir
                        .ancestors
                        .descend(&path, &metadata)
                        .map_err(|e| IndexError::io(&path, e))?;
                    let Some(ancestors) = descended else {
                        self.skip(relative, SkipReason::SymlinkLoop);
                        continue;
                    };

                    subdirs.push(PendingDir {
                        path,
                        relative,
                        ancestors,
                    });
                }
                EntryClass::File => self.update_file(&path, relative)?,
                EntryClass::Special(kind) => {
                    self.skip(relative, SkipReason::NotRegularFile { kind });
                }
                EntryClass::Dangling => self.skip(relative, SkipReason::DanglingSymlink),
            }
        }

        Ok(subdirs)
    }

    /// Bring the entry for one regular file up to date.
    fn update_file(&mut self, path: &Path, relative: String) -> Result<(), IndexError> {
        self.stats.files_seen += 1;

        let metadata = fs::metadata(path).map_err(|e| IndexError::io(path, e))?;
        let modified = Modified::from(metadata.modified().map_err(|e| IndexError::io(path, e))?);

        if self.config.age_policy == AgePolicy::Exclude && self.is_expired(modified) {
            debug!(path = %relative, "older than age limit, not hashed");
            self.stats.ignored += 1;
            return Ok(());
        }

        if self
            .index
            .get(&relative)
            .is_some_and(|entry| entry.modified == modified)
        {
            self.stats.unchanged += 1;
            self.seen.insert(relative.into());
            return Ok(());
        }

        if self.is_unsettled(modified) {
            self.emit(BuildEvent::Deferred { path: relative });
            return Ok(());
        }

        let mut file = File::open(path).map_err(|e| IndexError::io(path, e))?;
        // Record the time of the handle actually read, in case the file
        // changed since it was stat'ed.
        let modified = Modified::from(
            file.metadata()
                .and_then(|m| m.modified())
                .map_err(|e| IndexError::io(path, e))?,
        );
        if self.is_unsettled(modified) {
            self.emit(BuildEvent::Deferred { path: relative });
            return Ok(());
        }

        let (digest, bytes) = self.hash_file(&mut file, path)?;
        self.stats.bytes_hashed += bytes;
        debug!(path = %relative, bytes, digest = %digest, "hashed");

        let previous = self
            .index
            .insert(relative.as_str(), Entry::new(modified, digest));
        self.seen.insert(relative.as_str().into());

        self.emit(match previous {
            Some(_) => BuildEvent::Updated { path: relative },
            None => BuildEvent::Added { path: relative },
        });
        Ok(())
    }

    /// Stream a file through the digest engine.
    fn hash_file(&mut self, file: &mut File, path: &Path) -> Result<(ContentHash, u64), IndexError> {
        let mut hasher = Sha1::start();

        loop {
            let bytes_read = match file.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(IndexError::io(path, e)),
            };
            hasher.process(&self.buffer[..bytes_read]);
        }

        let bytes = hasher.bytes_processed();
        Ok((hasher.finish(), bytes))
    }

    /// Drop entries for missing files and entries past the age limit.
    fn prune(&mut self) {
        let remove_missing = self.config.remove_missing;
        let max_age = self.config.ignore_older_than;
        if !remove_missing && max_age.is_none() {
            return;
        }

        let expire_seen = self.config.age_policy == AgePolicy::Exclude;
        let now = self.now;
        let seen = &self.seen;
        let mut events = Vec::new();

        self.index.retain(|path, entry| {
            let was_seen = seen.contains(path);
            if remove_missing && !was_seen {
                events.push(BuildEvent::Removed { path: path.to_string() });
                return false;
            }
            let too_old = max_age.is_some_and(|age| exceeds(entry.modified, now, age));
            if too_old && (expire_seen || !was_seen) {
                events.push(BuildEvent::Expired {
                    path: path.to_string(),
                    modified: entry.modified,
                });
                return false;
            }
            true
        });

        for event in events {
            self.emit(event);
        }
    }

    fn is_expired(&self, modified: Modified) -> bool {
        self.config
            .ignore_older_than
            .is_some_and(|age| exceeds(modified, self.now, age))
    }

    /// Freshness guard: true if `modified` is too recent (or in the future).
    fn is_unsettled(&self, modified: Modified) -> bool {
        let settle = self.config.settle_time;
        if settle.is_zero() {
            return false;
        }
        modified
            .elapsed_until(self.now)
            .is_none_or(|elapsed| elapsed < settle)
    }
}

/// Whole-second age comparison: older than `max_age` means strictly more
/// seconds have passed.
fn exceeds(modified: Modified, now: Modified, max_age: Duration) -> bool {
    let limit = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    modified.seconds_until(now) > limit
}

fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
