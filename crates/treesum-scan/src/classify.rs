//! Directory entry classification.

use std::fs::{self, FileType};
use std::path::Path;

use treesum_core::SpecialKind;

/// What the walker should do with a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Descend into it.
    Directory,
    /// Hash it.
    File,
    /// Skip it: neither a file nor a directory.
    Special(SpecialKind),
    /// Skip it: a symlink whose target cannot be resolved.
    Dangling,
}

/// Classify a file type without touching the filesystem.
///
/// Symlinks come out as `Special(Symlink)`; use [`resolve`] to follow them.
pub fn classify(file_type: FileType) -> EntryClass {
    if file_type.is_dir() {
        EntryClass::Directory
    } else if file_type.is_file() {
        EntryClass::File
    } else {
        EntryClass::Special(special_kind(file_type))
    }
}

/// Classify an entry, resolving symlinks to their target type when
/// `follow_symlinks` is set.
///
/// A symlink whose target cannot be stat'ed is `Dangling` rather than an
/// error; only the caller's own metadata reads are fatal.
pub fn resolve(path: &Path, file_type: FileType, follow_symlinks: bool) -> EntryClass {
    if !file_type.is_symlink() || !follow_symlinks {
        return classify(file_type);
    }

    match fs::metadata(path) {
        Ok(target) => classify(target.file_type()),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "unresolvable symlink");
            EntryClass::Dangling
        }
    }
}

#[cfg(unix)]
fn special_kind(file_type: FileType) -> SpecialKind {
    use std::os::unix::fs::FileTypeExt;

    if file_type.is_symlink() {
        SpecialKind::Symlink
    } else if file_type.is_fifo() {
        SpecialKind::Fifo
    } else if file_type.is_socket() {
        SpecialKind::Socket
    } else if file_type.is_block_device() {
        SpecialKind::BlockDevice
    } else if file_type.is_char_device() {
        SpecialKind::CharDevice
    } else {
        SpecialKind::Unknown
    }
}

#[cfg(not(unix))]
fn special_kind(file_type: FileType) -> SpecialKind {
    if file_type.is_symlink() {
        SpecialKind::Symlink
    } else {
        SpecialKind::Unknown
    }
}
