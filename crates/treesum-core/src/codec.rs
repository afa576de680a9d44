//! On-disk index format.
//!
//! Each record is four NUL-terminated pieces:
//!
//! ```text
//! path NUL secs.nanos NUL hexdigest NUL NUL NEWLINE
//! ```
//!
//! The trailing newline is optional on input. The decoder also accepts a
//! newline in place of the final NUL. Since exactly one newline is skipped
//! after a NUL terminator, the encoder always writes it so that a following
//! path may itself begin with a newline. Decoding is strict: a truncated or malformed
//! record fails the whole file rather than being dropped.

use std::io::{self, Write};

use crate::entry::{ContentHash, Entry, Modified};
use crate::error::FormatError;
use crate::index::Index;

const NUL: u8 = 0;
const NEWLINE: u8 = b'\n';

/// Decode an index from its on-disk bytes. Empty input yields an empty index.
pub fn decode(bytes: &[u8]) -> Result<Index, FormatError> {
    let mut reader = RecordReader { bytes, pos: 0 };
    let mut index = Index::new();

    while !reader.at_end() {
        let offset = reader.pos;
        let path = reader.field(offset)?;
        let modified = reader.field(offset)?;
        let digest = reader.field(offset)?;
        reader.terminator(offset)?;

        let path = std::str::from_utf8(path)
            .ok()
            .filter(|p| !p.is_empty())
            .ok_or(FormatError::InvalidPath { offset })?;

        let modified = std::str::from_utf8(modified)
            .ok()
            .and_then(Modified::parse)
            .ok_or_else(|| FormatError::MalformedTimestamp {
                offset,
                value: String::from_utf8_lossy(modified).into_owned(),
            })?;

        let digest = std::str::from_utf8(digest)
            .ok()
            .and_then(ContentHash::from_hex)
            .ok_or_else(|| FormatError::MalformedDigest {
                offset,
                value: String::from_utf8_lossy(digest).into_owned(),
            })?;

        index.insert(path, Entry::new(modified, digest));
    }

    Ok(index)
}

/// Encode an index into a byte vector.
pub fn encode(index: &Index) -> Vec<u8> {
    let mut buf = Vec::with_capacity(index.len() * 80);
    // Writing into a Vec cannot fail.
    let _ = write_index(index, &mut buf);
    buf
}

/// Stream the encoded index into a writer.
pub fn write_index<W: Write>(index: &Index, mut writer: W) -> io::Result<()> {
    for (path, entry) in index.iter() {
        writer.write_all(path.as_bytes())?;
        writer.write_all(&[NUL])?;
        write!(writer, "{}", entry.modified)?;
        writer.write_all(&[NUL])?;
        write!(writer, "{}", entry.digest)?;
        writer.write_all(&[NUL, NUL, NEWLINE])?;
    }
    Ok(())
}

/// Cursor over the raw record bytes.
struct RecordReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Read up to the next NUL and step past it.
    fn field(&mut self, record: usize) -> Result<&'a [u8], FormatError> {
        let rest = &self.bytes[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == NUL)
            .ok_or(FormatError::Truncated { offset: record })?;
        self.pos += len + 1;
        Ok(&rest[..len])
    }

    /// Consume the record terminator and an optional trailing newline.
    fn terminator(&mut self, record: usize) -> Result<(), FormatError> {
        match self.bytes.get(self.pos) {
            None => Err(FormatError::Truncated { offset: record }),
            Some(&NUL) => {
                self.pos += 1;
                if self.bytes.get(self.pos) == Some(&NEWLINE) {
                    self.pos += 1;
                }
                Ok(())
            }
            Some(&NEWLINE) => {
                self.pos += 1;
                Ok(())
            }
            Some(&byte) => Err(FormatError::BadTerminator {
                offset: self.pos,
                byte,
            }),
        }
    }
}
