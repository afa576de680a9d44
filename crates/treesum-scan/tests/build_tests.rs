use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use treesum_scan::{
    BuildConfig, BuildEvent, ChangeKind, IndexBuilder, IndexFile, Modified,
};
use treesum_core::Sha1;

fn write_aged(path: &Path, content: &[u8], age: Duration) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

fn hour() -> Duration {
    Duration::from_secs(3600)
}

fn changelog(builder: &IndexBuilder) -> Vec<String> {
    let mut lines = Vec::new();
    builder
        .update(|event| lines.push(event.to_string()))
        .unwrap();
    lines
}

#[test]
fn test_update_cycle() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_aged(&root.join("a.txt"), b"alpha", hour());
    write_aged(&root.join("b/c.txt"), b"gamma", hour());

    let config = BuildConfig::builder()
        .root(root)
        .remove_missing(true)
        .build()
        .unwrap();
    let builder = IndexBuilder::new(config).unwrap();

    assert_eq!(changelog(&builder), vec!["add a.txt", "add b/c.txt"]);
    assert!(changelog(&builder).is_empty());

    write_aged(&root.join("a.txt"), b"ALPHA", Duration::from_secs(60));
    fs::remove_file(root.join("b/c.txt")).unwrap();
    assert_eq!(changelog(&builder), vec!["mod a.txt", "rem b/c.txt"]);

    let stored = IndexFile::new(root.join(".sha1s")).load_existing().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.get("a.txt").unwrap().digest, Sha1::digest(b"ALPHA"));
}

#[test]
fn test_stored_entry_matches_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("data.bin");
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    write_aged(&path, &content, hour());

    let builder = IndexBuilder::new(BuildConfig::new(temp.path())).unwrap();
    let outcome = builder.update(|_| {}).unwrap();

    let entry = outcome.build.index.get("data.bin").unwrap();
    let mtime = fs::metadata(&path).unwrap().modified().unwrap();
    assert_eq!(entry.modified, Modified::from(mtime));
    assert_eq!(entry.digest, Sha1::digest(&content));
    assert_eq!(outcome.build.stats.bytes_hashed, content.len() as u64);
}

#[test]
fn test_fresh_file_waits_for_next_run() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("incoming.part"), b"still writing").unwrap();

    let config = BuildConfig::builder()
        .root(temp.path())
        .settle_time(hour())
        .build()
        .unwrap();
    let builder = IndexBuilder::new(config).unwrap();

    let mut kinds = Vec::new();
    let outcome = builder.update(|event| kinds.push(event.kind())).unwrap();

    assert_eq!(kinds, vec![ChangeKind::Wait]);
    assert!(!outcome.written);
    assert!(!temp.path().join(".sha1s").exists());
}

#[test]
fn test_custom_index_name() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("file"), b"x", hour());

    let config = BuildConfig::builder()
        .root(temp.path())
        .index_name("checksums")
        .build()
        .unwrap();
    let builder = IndexBuilder::new(config).unwrap();
    builder.update(|_| {}).unwrap();
    let second = builder.update(|_| {}).unwrap();

    assert!(temp.path().join("checksums").exists());
    assert!(!temp.path().join("checksums.tmp").exists());
    assert_eq!(second.build.index.paths().collect::<Vec<_>>(), vec!["file"]);
}

#[test]
fn test_events_as_json() {
    let temp = TempDir::new().unwrap();
    write_aged(&temp.path().join("a"), b"a", hour());

    let builder = IndexBuilder::new(BuildConfig::new(temp.path())).unwrap();
    let mut events: Vec<BuildEvent> = Vec::new();
    builder.update(|event| events.push(event.clone())).unwrap();

    let json = serde_json::to_string(&events).unwrap();
    assert_eq!(json, r#"[{"event":"added","path":"a"}]"#);
}

#[cfg(unix)]
#[test]
fn test_newline_leading_name_is_stable() {
    let temp = TempDir::new().unwrap();
    // Sorts before "\nfoo", so that record is not the first in the file.
    write_aged(&temp.path().join("\u{1}first"), b"first", hour());
    write_aged(&temp.path().join("\nfoo"), b"odd name", hour());

    let config = BuildConfig::builder()
        .root(temp.path())
        .remove_missing(true)
        .build()
        .unwrap();
    let builder = IndexBuilder::new(config).unwrap();

    let first = builder.update(|_| {}).unwrap();
    assert_eq!(
        first.build.index.paths().collect::<Vec<_>>(),
        vec!["\u{1}first", "\nfoo"]
    );

    let mut events = Vec::new();
    let second = builder.update(|event| events.push(event.clone())).unwrap();
    assert!(events.is_empty(), "{events:?}");
    assert!(!second.written);
    assert_eq!(second.build.index, first.build.index);
}
