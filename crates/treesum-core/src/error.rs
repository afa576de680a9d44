//! Error types for index operations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// A malformed or truncated index file.
///
/// Offsets are byte positions of the record being decoded, or of the
/// offending byte for terminator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Input ended in the middle of a record.
    #[error("index truncated in record at byte {offset}")]
    Truncated { offset: usize },

    /// The modification time field is not `<secs>.<nanos>`.
    #[error("malformed modification time {value:?} in record at byte {offset}")]
    MalformedTimestamp { offset: usize, value: String },

    /// The digest field is not a hex digest of the expected width.
    #[error("malformed digest {value:?} in record at byte {offset}")]
    MalformedDigest { offset: usize, value: String },

    /// The path field is empty or not UTF-8.
    #[error("invalid path in record at byte {offset}")]
    InvalidPath { offset: usize },

    /// A record ended with something other than NUL or newline.
    #[error("expected NUL or newline at byte {offset}, found {byte:#04x}")]
    BadTerminator { offset: usize, byte: u8 },
}

/// Errors that abort an index run.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An index file could not be decoded.
    #[error("Malformed index {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl IndexError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Attach the index file path to a decode error.
    pub fn format(path: impl Into<PathBuf>, source: FormatError) -> Self {
        Self::Format {
            path: path.into(),
            source,
        }
    }
}

/// Type of a directory entry that is neither a regular file nor a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    Fifo,
    Socket,
    #[strum(serialize = "block device")]
    BlockDevice,
    #[strum(serialize = "character device")]
    CharDevice,
    Symlink,
    Unknown,
}

/// Why an entry was left out of the walk. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Not a regular file or directory (after resolving symlinks).
    NotRegularFile { kind: SpecialKind },
    /// Symbolic link whose target does not exist.
    DanglingSymlink,
    /// File name is not valid UTF-8 and cannot be stored in the index.
    NonUtf8Name,
    /// Matched an exclude pattern.
    Excluded,
    /// Directory below the configured maximum depth.
    DepthLimit,
    /// Directory that is its own ancestor through a symlink.
    SymlinkLoop,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegularFile { kind } => write!(f, "not a regular file ({kind})"),
            Self::DanglingSymlink => f.write_str("dangling symlink"),
            Self::NonUtf8Name => f.write_str("name is not valid UTF-8"),
            Self::Excluded => f.write_str("excluded"),
            Self::DepthLimit => f.write_str("maximum depth reached"),
            Self::SymlinkLoop => f.write_str("symlink loop"),
        }
    }
}
