//! Chunk reader
//!
//! One readable resource plus the reusable buffer chunks are read into.

use serde::{Deserialize, Serialize};
use std::io;

use safstream_storage::ReadResource;

/// Consecutive empty reads tolerated before the stream counts as stalled
const MAX_EMPTY_READS: usize = 1024;

/// Result of one chunk read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Chunk {
    /// Between 1 and `buffer_size` bytes, in file order
    Data(Vec<u8>),
    /// The resource reported end-of-data
    End,
}

impl Chunk {
    pub fn is_end(&self) -> bool {
        matches!(self, Chunk::End)
    }

    pub fn len(&self) -> usize {
        match self {
            Chunk::Data(bytes) => bytes.len(),
            Chunk::End => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Chunk::Data(bytes) => Some(bytes),
            Chunk::End => None,
        }
    }
}

pub struct ChunkReader {
    resource: Box<dyn ReadResource>,
    buffer: Vec<u8>,
}

impl ChunkReader {
    pub fn new(resource: Box<dyn ReadResource>, buffer_size: usize) -> Self {
        Self {
            resource,
            buffer: vec![0; buffer_size.max(1)],
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Read the next non-empty chunk.
    ///
    /// Empty reads are retried and never surface as zero-length chunks.
    pub fn next_chunk(&mut self) -> io::Result<Chunk> {
        for _ in 0..MAX_EMPTY_READS {
            match self.resource.read(&mut self.buffer)? {
                None => return Ok(Chunk::End),
                Some(0) => continue,
                Some(n) => return Ok(Chunk::Data(self.buffer[..n].to_vec())),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream stalled on empty reads",
        ))
    }

    /// Skip up to `n` bytes. Returns fewer only when end-of-data was reached.
    pub fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut skipped = 0u64;
        while skipped < n {
            match self.resource.skip(n - skipped)? {
                0 => break,
                step => skipped += step,
            }
        }
        Ok(skipped)
    }

    pub fn close(self) -> io::Result<()> {
        self.resource.close()
    }
}
