//! Ancestor tracking for symlink loop detection.

use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::rc::Rc;

/// Identity of a directory independent of the path used to reach it.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DirKey {
    device: u64,
    inode: u64,
}

#[cfg(not(unix))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DirKey(std::path::PathBuf);

#[derive(Debug)]
struct Link {
    key: DirKey,
    parent: Option<Rc<Link>>,
}

/// The directories between the root and a pending directory, inclusive.
///
/// Only a directory that is its own ancestor closes a loop. The same
/// directory reached through two sibling paths is walked under both.
/// Chains share their common prefix, so extending one is O(1).
#[derive(Debug, Clone, Default)]
pub struct AncestorChain {
    head: Option<Rc<Link>>,
    depth: usize,
}

impl AncestorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the chain with a directory, or `None` if the directory is
    /// already on it.
    pub fn descend(&self, path: &Path, metadata: &Metadata) -> io::Result<Option<Self>> {
        let key = dir_key(path, metadata)?;
        if self.links().any(|link| link.key == key) {
            return Ok(None);
        }

        Ok(Some(Self {
            head: Some(Rc::new(Link {
                key,
                parent: self.head.clone(),
            })),
            depth: self.depth + 1,
        }))
    }

    /// Number of directories on the chain.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn links(&self) -> impl Iterator<Item = &Link> {
        std::iter::successors(self.head.as_deref(), |link| link.parent.as_deref())
    }
}

#[cfg(unix)]
fn dir_key(_path: &Path, metadata: &Metadata) -> io::Result<DirKey> {
    use std::os::unix::fs::MetadataExt;
    Ok(DirKey {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn dir_key(path: &Path, _metadata: &Metadata) -> io::Result<DirKey> {
    Ok(DirKey(std::fs::canonicalize(path)?))
}
