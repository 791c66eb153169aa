//! Tagged record chunks.
//!
//! A chunk is a 4-byte ASCII magic, a little-endian `u32` record count and
//! `count` fixed-size records laid out back to back:
//!
//! ```text
//! +---------+-----------+---------------------------+
//! | magic 4 | count u32 | count × Record::SIZE bytes |
//! +---------+-----------+---------------------------+
//! ```

use std::io::{self, Write};

use thiserror::Error;

use crate::ppu::{Palette, Tile, PALETTE_BYTES, TILE_BYTES};

pub type Magic = [u8; 4];

const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorruptAsset {
    #[error("expected chunk '{expected}', found '{found}'")]
    MagicMismatch { expected: String, found: String },
    #[error("chunk '{magic}' truncated: needed {needed} bytes, {available} available")]
    Truncated {
        magic: String,
        needed: usize,
        available: usize,
    },
}

/// Printable form of a magic for diagnostics.
pub fn magic_str(magic: &[u8]) -> String {
    String::from_utf8_lossy(magic).into_owned()
}

/// Fixed-size record stored in a chunk.
pub trait Record: Sized {
    const SIZE: usize;

    /// Append exactly `SIZE` bytes to `out`.
    fn write_to(&self, out: &mut Vec<u8>);

    /// Decode from a slice of exactly `SIZE` bytes.
    fn read_from(bytes: &[u8]) -> Self;
}

impl Record for Tile {
    const SIZE: usize = TILE_BYTES;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; TILE_BYTES];
        buf.copy_from_slice(&bytes[..TILE_BYTES]);
        Tile::from_bytes(&buf)
    }
}

impl Record for Palette {
    const SIZE: usize = PALETTE_BYTES;

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; PALETTE_BYTES];
        buf.copy_from_slice(&bytes[..PALETTE_BYTES]);
        Palette::from_bytes(&buf)
    }
}

/// Write one chunk holding `records`.
pub fn write_chunk<T: Record, W: Write>(
    magic: &Magic,
    records: &[T],
    writer: &mut W,
) -> io::Result<()> {
    let count = u32::try_from(records.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "too many records for one chunk")
    })?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + records.len() * T::SIZE);
    buf.extend_from_slice(magic);
    buf.extend_from_slice(&count.to_le_bytes());
    for record in records {
        record.write_to(&mut buf);
    }
    writer.write_all(&buf)
}

/// Sequential reader over a byte buffer holding consecutive chunks.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read the next chunk, which must carry `magic`.
    ///
    /// The declared record count is checked against the bytes actually left
    /// before anything is allocated.
    pub fn read_chunk<T: Record>(&mut self, magic: &Magic) -> Result<Vec<T>, CorruptAsset> {
        let header = self
            .data
            .get(self.pos..self.pos + HEADER_SIZE)
            .ok_or_else(|| CorruptAsset::Truncated {
                magic: magic_str(magic),
                needed: HEADER_SIZE,
                available: self.remaining(),
            })?;

        if &header[..4] != magic {
            return Err(CorruptAsset::MagicMismatch {
                expected: magic_str(magic),
                found: magic_str(&header[..4]),
            });
        }

        let count = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        self.pos += HEADER_SIZE;

        let needed = count.saturating_mul(T::SIZE);
        if needed > self.remaining() {
            return Err(CorruptAsset::Truncated {
                magic: magic_str(magic),
                needed,
                available: self.remaining(),
            });
        }

        let payload = &self.data[self.pos..self.pos + needed];
        self.pos += needed;

        Ok(payload.chunks_exact(T::SIZE).map(T::read_from).collect())
    }
}
