//! Index build configuration.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::store::IndexFile;

/// Default index file name, created in the tree root.
pub const DEFAULT_INDEX_NAME: &str = ".sha1s";

/// Default freshness guard: files modified more recently are not hashed yet.
pub const DEFAULT_SETTLE_TIME: Duration = Duration::from_secs(2);

/// How `ignore_older_than` treats old files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgePolicy {
    /// Old files are never hashed, and every old entry is expired.
    #[default]
    Exclude,
    /// Old files are still indexed while present; only old entries whose
    /// file was not seen during the walk are expired.
    ExpireUnseen,
}

/// Configuration for one index build.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct BuildConfig {
    /// Root of the tree to index.
    pub root: PathBuf,

    /// Index file name inside `root`. Entries whose root-relative path
    /// starts with this name are never indexed.
    #[builder(default = "DEFAULT_INDEX_NAME.to_string()")]
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Drop entries for files not seen during the walk.
    #[builder(default = "false")]
    #[serde(default)]
    pub remove_missing: bool,

    /// Treat files and entries last modified longer ago than this as expired.
    #[builder(default)]
    #[serde(default)]
    pub ignore_older_than: Option<Duration>,

    /// What expiry means for files still present.
    #[builder(default)]
    #[serde(default)]
    pub age_policy: AgePolicy,

    /// Files modified less than this long ago are deferred to a later run.
    #[builder(default = "DEFAULT_SETTLE_TIME")]
    #[serde(default = "default_settle_time")]
    pub settle_time: Duration,

    /// Resolve symbolic links to their target type.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,

    /// Maximum directory depth below the root (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Glob patterns matched against root-relative paths to leave out.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_index_name() -> String {
    DEFAULT_INDEX_NAME.to_string()
}

fn default_settle_time() -> Duration {
    DEFAULT_SETTLE_TIME
}

fn default_true() -> bool {
    true
}

fn check_index_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Index name cannot be empty".to_string());
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(format!("Index name must be a plain file name: {name}"));
    }
    Ok(())
}

impl BuildConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref name) = self.index_name {
            check_index_name(name)?;
        }
        Ok(())
    }
}

impl BuildConfig {
    /// Create a new build config builder.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::default()
    }

    /// Create a config with default options for a root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_name: default_index_name(),
            remove_missing: false,
            ignore_older_than: None,
            age_policy: AgePolicy::default(),
            settle_time: DEFAULT_SETTLE_TIME,
            follow_symlinks: true,
            max_depth: None,
            exclude_patterns: Vec::new(),
        }
    }

    /// Re-check invariants on a config that did not come from the builder.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.root.as_os_str().is_empty() {
            return Err(IndexError::InvalidConfig {
                message: "Root path cannot be empty".to_string(),
            });
        }
        check_index_name(&self.index_name).map_err(|message| IndexError::InvalidConfig { message })
    }

    /// The index file for this tree.
    pub fn index_file(&self) -> IndexFile {
        IndexFile::new(self.root.join(&self.index_name))
    }

    /// Check if a root-relative path names the index or its temporary sibling.
    pub fn is_index_path(&self, relative: &str) -> bool {
        relative.starts_with(self.index_name.as_str())
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
