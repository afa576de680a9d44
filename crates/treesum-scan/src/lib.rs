//! Incremental index building for treesum.
//!
//! # Overview
//!
//! `treesum-scan` walks a directory tree and brings a content-hash
//! [`Index`] up to date. Key features:
//!
//! - **Incremental**: files whose modification time matches their entry are
//!   not read again
//! - **Deterministic walk** in name order; symlinked directories are walked
//!   under every path that reaches them, except links back to an ancestor
//! - **Change events** delivered to an observer as they happen
//! - **Pruning** of missing and expired entries
//!
//! # Example
//!
//! ```rust,no_run
//! use treesum_scan::{BuildConfig, IndexBuilder};
//!
//! let config = BuildConfig::new("/path/to/tree");
//! let builder = IndexBuilder::new(config).unwrap();
//! let outcome = builder.update(|event| println!("{event}")).unwrap();
//!
//! println!("{} entries, written: {}", outcome.build.index.len(), outcome.written);
//! ```

mod ancestors;
mod builder;
mod classify;
mod event;

pub use ancestors::AncestorChain;
pub use builder::{BuildOutcome, IndexBuilder, UpdateOutcome};
pub use classify::{EntryClass, classify, resolve};
pub use event::{BuildEvent, BuildStats, ChangeKind};

// Re-export core types for convenience
pub use treesum_core::{
    AgePolicy, BuildConfig, BuildConfigBuilder, ContentHash, Entry, Index, IndexError, IndexFile,
    Modified, SkipReason, SpecialKind,
};
