//! Build events and run statistics.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use strum::Display;

use treesum_core::{Modified, SkipReason};

/// Short changelog label for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChangeKind {
    #[strum(serialize = "add")]
    Add,
    #[strum(serialize = "mod")]
    Mod,
    #[strum(serialize = "rem")]
    Rem,
    #[strum(serialize = "exp")]
    Exp,
    #[strum(serialize = "skip")]
    Skip,
    #[strum(serialize = "wait")]
    Wait,
}

/// Something that happened to one path during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    /// A new file was hashed.
    Added { path: String },
    /// A tracked file changed and was rehashed.
    Updated { path: String },
    /// An entry was dropped because its file was not seen.
    Removed { path: String },
    /// An entry was dropped because it is older than the age limit.
    Expired { path: String, modified: Modified },
    /// An entry was left out of the walk.
    Skipped {
        path: String,
        #[serde(flatten)]
        reason: SkipReason,
    },
    /// A file was modified too recently to hash; retried next run.
    Deferred { path: String },
}

impl BuildEvent {
    /// Changelog label.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Added { .. } => ChangeKind::Add,
            Self::Updated { .. } => ChangeKind::Mod,
            Self::Removed { .. } => ChangeKind::Rem,
            Self::Expired { .. } => ChangeKind::Exp,
            Self::Skipped { .. } => ChangeKind::Skip,
            Self::Deferred { .. } => ChangeKind::Wait,
        }
    }

    /// Root-relative path the event refers to.
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path }
            | Self::Updated { path }
            | Self::Removed { path }
            | Self::Expired { path, .. }
            | Self::Skipped { path, .. }
            | Self::Deferred { path } => path,
        }
    }

    /// Whether the event changed the index.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Updated { .. } | Self::Removed { .. } | Self::Expired { .. }
        )
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.path())?;
        match self {
            Self::Skipped { reason, .. } => write!(f, " -- {reason}"),
            Self::Expired { modified, .. } => match modified.to_datetime() {
                Some(date) => write!(f, " (last modified {})", date.format("%Y-%m-%d")),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// Counters for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Regular files reached by the walk.
    pub files_seen: u64,
    /// Files whose recorded modification time still matched.
    pub unchanged: u64,
    /// New entries.
    pub added: u64,
    /// Rehashed entries.
    pub updated: u64,
    /// Entries removed for missing files.
    pub removed: u64,
    /// Entries removed for age.
    pub expired: u64,
    /// Entries skipped by policy.
    pub skipped: u64,
    /// Files deferred by the freshness guard.
    pub deferred: u64,
    /// Old files left unhashed by the age limit.
    pub ignored: u64,
    /// Bytes read while hashing.
    pub bytes_hashed: u64,
    /// Wall time of the build.
    pub elapsed: Duration,
}

impl BuildStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an event.
    pub fn record(&mut self, event: &BuildEvent) {
        match event {
            BuildEvent::Added { .. } => self.added += 1,
            BuildEvent::Updated { .. } => self.updated += 1,
            BuildEvent::Removed { .. } => self.removed += 1,
            BuildEvent::Expired { .. } => self.expired += 1,
            BuildEvent::Skipped { .. } => self.skipped += 1,
            BuildEvent::Deferred { .. } => self.deferred += 1,
        }
    }

    /// Files hashed this run.
    pub fn files_hashed(&self) -> u64 {
        self.added + self.updated
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
