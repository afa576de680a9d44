//! Index comparison for treesum.
//!
//! Given a local and a remote index, reports every remote file whose
//! content does not exist anywhere in the local tree:
//!
//! ```rust,no_run
//! use treesum_analyze::IndexComparator;
//! use treesum_core::IndexFile;
//!
//! let local = IndexFile::new("/backup/.sha1s").load_existing().unwrap();
//! let remote = IndexFile::new("/mnt/phone/.sha1s").load_existing().unwrap();
//!
//! for path in IndexComparator::new().missing_from_local(&local, &remote) {
//!     println!("{path}");
//! }
//! ```

mod compare;

pub use compare::{ComparisonReport, IndexComparator};
