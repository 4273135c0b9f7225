//! Stream resource capabilities
//!
//! A resource is an exclusively owned handle to one end of a provider
//! stream. Closing consumes the handle, so release happens at most once.

use serde::{Deserialize, Serialize};
use std::io;

const SKIP_SCRATCH_SIZE: usize = 8192;

/// Readable end of a provider stream.
pub trait ReadResource: Send {
    /// Read into `buf`.
    ///
    /// Returns `Ok(None)` once the stream has reached end-of-data. `Ok(Some(0))`
    /// is an empty read and does not mean the stream is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Advance the stream by up to `n` bytes without surfacing them.
    ///
    /// Returns the number of bytes actually skipped, which is smaller than `n`
    /// only when end-of-data was reached.
    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let mut scratch = [0u8; SKIP_SCRATCH_SIZE];
        let mut skipped = 0u64;

        while skipped < n {
            let want = (n - skipped).min(SKIP_SCRATCH_SIZE as u64) as usize;
            match self.read(&mut scratch[..want])? {
                None => break,
                Some(read) => skipped += read as u64,
            }
        }

        Ok(skipped)
    }

    /// Release the underlying stream.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Writable end of a provider stream.
pub trait WriteResource: Send {
    /// Append all of `buf` to the stream.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush and release the underlying stream.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// How a writable stream treats existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Discard existing content ("wt")
    Truncate,
    /// Target was just created; open without truncation
    Fresh,
}

/// A document resolved inside a directory handle.
///
/// `name` is the name the provider actually used, which may differ from the
/// requested one when the provider renames on collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub uri: String,
    #[serde(rename = "fileName")]
    pub name: String,
}

impl DocumentEntry {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }
}
