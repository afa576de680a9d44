//! Core types for treesum.
//!
//! This crate provides the pieces shared by the index builder and the
//! comparator: the SHA-1 digest engine, index entries, the on-disk codec,
//! the index file store, and build configuration.

pub mod codec;
mod config;
mod digest;
mod entry;
mod error;
mod index;
mod store;

pub use config::{AgePolicy, BuildConfig, BuildConfigBuilder, DEFAULT_INDEX_NAME, DEFAULT_SETTLE_TIME};
pub use digest::Sha1;
pub use entry::{ContentHash, DIGEST_LEN, Entry, Modified};
pub use error::{FormatError, IndexError, SkipReason, SpecialKind};
pub use index::Index;
pub use store::{IndexFile, TEMP_SUFFIX};
