//! Streaming SHA-1 digest engine.
//!
//! The engine buffers partial 64-byte blocks between calls to
//! [`Sha1::process`], so a file can be fed in chunks of any size and still
//! produce the same digest as a single call over the whole input.

use std::io;

use crate::entry::{ContentHash, DIGEST_LEN};

/// Size of one SHA-1 message block in bytes.
const BLOCK_LEN: usize = 64;

/// Offset within the final block where the 64-bit length is written.
const LENGTH_OFFSET: usize = BLOCK_LEN - 8;

const INITIAL_STATE: [u32; 5] = [0x6745_2301, 0xEFCD_AB89, 0x98BA_DCFE, 0x1032_5476, 0xC3D2_E1F0];

/// Incremental SHA-1 state for one in-flight computation.
///
/// `finish` consumes the state, so a finished hasher cannot be fed again
/// without calling [`Sha1::start`].
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    block: [u8; BLOCK_LEN],
    /// Number of buffered bytes in `block`. Always below `BLOCK_LEN`.
    index: usize,
    /// Total bytes processed so far.
    total: u64,
}

impl Sha1 {
    /// Create a fresh hasher.
    pub fn start() -> Self {
        Self {
            state: INITIAL_STATE,
            block: [0; BLOCK_LEN],
            index: 0,
            total: 0,
        }
    }

    /// Hash a complete byte slice in one call.
    pub fn digest(data: &[u8]) -> ContentHash {
        let mut hasher = Self::start();
        hasher.process(data);
        hasher.finish()
    }

    /// Total number of bytes fed to this hasher.
    pub fn bytes_processed(&self) -> u64 {
        self.total
    }

    /// Feed a chunk of input.
    pub fn process(&mut self, mut data: &[u8]) {
        self.total = self.total.wrapping_add(data.len() as u64);

        if self.index != 0 {
            let take = (BLOCK_LEN - self.index).min(data.len());
            self.block[self.index..self.index + take].copy_from_slice(&data[..take]);
            self.index += take;
            data = &data[take..];

            if self.index < BLOCK_LEN {
                return;
            }
            compress(&mut self.state, &self.block);
            self.index = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for block in &mut blocks {
            compress(&mut self.state, block);
        }

        let rest = blocks.remainder();
        self.block[..rest.len()].copy_from_slice(rest);
        self.index = rest.len();
    }

    /// Apply the final padding and return the digest.
    pub fn finish(mut self) -> ContentHash {
        let bit_len = self.total.wrapping_mul(8);

        self.block[self.index] = 0x80;
        self.index += 1;

        // Not enough room left for the length: pad out this block and start another.
        if self.index > LENGTH_OFFSET {
            self.block[self.index..].fill(0);
            compress(&mut self.state, &self.block);
            self.index = 0;
        }

        self.block[self.index..LENGTH_OFFSET].fill(0);
        self.block[LENGTH_OFFSET..].copy_from_slice(&bit_len.to_be_bytes());
        compress(&mut self.state, &self.block);

        let mut out = [0u8; DIGEST_LEN];
        for (bytes, word) in out.chunks_exact_mut(4).zip(self.state) {
            bytes.copy_from_slice(&word.to_be_bytes());
        }
        ContentHash::new(out)
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::start()
    }
}

impl std::fmt::Debug for Sha1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha1").field("total", &self.total).finish_non_exhaustive()
    }
}

/// Lets a reader be streamed into the hasher with [`std::io::copy`].
impl io::Write for Sha1 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.process(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run the SHA-1 compression function over one 64-byte block.
fn compress(state: &mut [u32; 5], block: &[u8]) {
    debug_assert_eq!(block.len(), BLOCK_LEN);

    let mut w = [0u32; 80];
    for (word, bytes) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for t in 16..80 {
        w[t] = (w[t - 3] ^ w[t - 8] ^ w[t - 14] ^ w[t - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (t, &wt) in w.iter().enumerate() {
        let (f, k) = match t {
            0..=19 => ((b & c) | (!b & d), 0x5A82_7999),
            20..=39 => (b ^ c ^ d, 0x6ED9_EBA1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1B_BCDC),
            _ => (b ^ c ^ d, 0xCA62_C1D6),
        };

        let temp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(wt);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(data: &[u8]) -> String {
        Sha1::digest(data).to_hex()
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            hex(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq"),
            "84983e441c3bd26ebaae4aa1f95129e5e54670f1"
        );
        assert_eq!(
            hex(b"abcdefghbcdefghicdefghijdefghijkefghijklfghijklmghijklmnhijklmnoijklmnopjklmnopqklmnopqrlmnopqrsmnopqrstnopqrstu"),
            "a49b2446a02c645bf419f995b67091253a04a259"
        );
        assert_eq!(
            hex(b"The quick brown fox jumps over the lazy dog"),
            "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12"
        );
    }

    #[test]
    fn test_million_a() {
        let mut hasher = Sha1::start();
        let chunk = [b'a'; 1000];
        for _ in 0..1000 {
            hasher.process(&chunk);
        }
        assert_eq!(hasher.bytes_processed(), 1_000_000);
        assert_eq!(
            hasher.finish().to_hex(),
            "34aa973cd4c4daa4f61eeb2bdbad27316534016f"
        );
    }

    #[test]
    fn test_padding_boundaries() {
        // 55 bytes fits the length in the same block; 56..=63 forces an extra block.
        for len in [55usize, 56, 57, 63, 64, 65, 119, 120] {
            let data = vec![0x5au8; len];
            let whole = Sha1::digest(&data);

            let mut split = Sha1::start();
            for byte in &data {
                split.process(std::slice::from_ref(byte));
            }
            assert_eq!(split.finish(), whole, "length {len}");
        }
    }

    #[test]
    fn test_chunk_boundaries() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        let expected = Sha1::digest(&data);

        for chunk_size in [1usize, 3, 7, 63, 64, 65, 128, 999] {
            let mut hasher = Sha1::start();
            for chunk in data.chunks(chunk_size) {
                hasher.process(chunk);
            }
            assert_eq!(hasher.finish(), expected, "chunk size {chunk_size}");
        }

        // Irregular splits, including empty chunks.
        let mut hasher = Sha1::start();
        let (a, rest) = data.split_at(10);
        let (b, c) = rest.split_at(500);
        hasher.process(a);
        hasher.process(&[]);
        hasher.process(b);
        hasher.process(c);
        assert_eq!(hasher.finish(), expected);
    }

    #[test]
    fn test_io_write() {
        let mut hasher = Sha1::start();
        let copied = std::io::copy(&mut &b"abc"[..], &mut hasher).unwrap();
        assert_eq!(copied, 3);
        assert_eq!(hasher.finish(), Sha1::digest(b"abc"));
    }
}
