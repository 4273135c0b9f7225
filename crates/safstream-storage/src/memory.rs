//! In-memory provider
//!
//! Documents live in process memory under `mem://<dir>/<name>` locators.
//! Every document keeps open/close counters and optional injected faults,
//! which makes resource lifecycles observable.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

use crate::error::StorageError;
use crate::provider::StorageProvider;
use crate::resource::{DocumentEntry, ReadResource, WriteMode, WriteResource};
use crate::Result;

const SCHEME: &str = "mem://";

/// Open/close bookkeeping for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub read_opens: usize,
    pub write_opens: usize,
    pub closes: usize,
}

impl ResourceStats {
    /// Handles opened but not yet closed
    pub fn open_handles(&self) -> usize {
        (self.read_opens + self.write_opens).saturating_sub(self.closes)
    }
}

/// Injected failures for one document.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Reads fail once the read position reaches this offset
    pub read_fails_at: Option<usize>,
    /// Every write fails
    pub write_fails: bool,
    /// Close reports an error (the handle is still released)
    pub close_fails: bool,
}

#[derive(Default)]
struct Document {
    data: Arc<Mutex<Vec<u8>>>,
    stats: Arc<Mutex<ResourceStats>>,
    faults: Faults,
}

#[derive(Default)]
struct MemoryState {
    dirs: HashSet<String>,
    docs: HashMap<String, Document>,
}

#[derive(Clone, Default)]
pub struct MemoryProvider {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory handle. Returns its locator.
    pub fn add_dir(&self, dir: &str) -> String {
        self.state.write().dirs.insert(dir.to_string());
        dir.to_string()
    }

    /// Store a document, creating its directory if needed. Returns its locator.
    pub fn insert(&self, dir: &str, name: &str, bytes: impl Into<Vec<u8>>) -> String {
        let uri = document_uri(dir, name);
        let mut state = self.state.write();
        state.dirs.insert(dir.to_string());
        state.docs.insert(
            uri.clone(),
            Document {
                data: Arc::new(Mutex::new(bytes.into())),
                ..Document::default()
            },
        );
        uri
    }

    pub fn contents(&self, uri: &str) -> Option<Vec<u8>> {
        self.state.read().docs.get(uri).map(|d| d.data.lock().clone())
    }

    pub fn stats(&self, uri: &str) -> ResourceStats {
        self.state
            .read()
            .docs
            .get(uri)
            .map(|d| *d.stats.lock())
            .unwrap_or_default()
    }

    pub fn set_faults(&self, uri: &str, faults: Faults) {
        if let Some(doc) = self.state.write().docs.get_mut(uri) {
            doc.faults = faults;
        }
    }

    fn dir_exists(&self, dir: &str) -> bool {
        self.state.read().dirs.contains(dir)
    }
}

impl StorageProvider for MemoryProvider {
    fn open_read(&self, locator: &str) -> Result<Box<dyn ReadResource>> {
        let state = self.state.read();
        let doc = state
            .docs
            .get(locator)
            .ok_or_else(|| StorageError::NotFound(format!("File not found: {}", locator)))?;

        doc.stats.lock().read_opens += 1;
        let data = doc.data.lock().clone();

        Ok(Box::new(MemoryReader {
            data,
            pos: 0,
            stats: Arc::clone(&doc.stats),
            faults: doc.faults.clone(),
        }))
    }

    fn open_write(&self, locator: &str, mode: WriteMode) -> Result<Box<dyn WriteResource>> {
        let state = self.state.read();
        let doc = state
            .docs
            .get(locator)
            .ok_or_else(|| StorageError::NotFound(format!("File not found: {}", locator)))?;

        if mode == WriteMode::Truncate {
            doc.data.lock().clear();
        }
        doc.stats.lock().write_opens += 1;

        Ok(Box::new(MemoryWriter {
            data: Arc::clone(&doc.data),
            stats: Arc::clone(&doc.stats),
            faults: doc.faults.clone(),
        }))
    }

    fn find_file(&self, dir: &str, name: &str) -> Result<Option<DocumentEntry>> {
        if !self.dir_exists(dir) {
            return Err(StorageError::NotFound("Directory not found".to_string()));
        }

        let uri = document_uri(dir, name);
        let exists = self.state.read().docs.contains_key(&uri);
        Ok(exists.then(|| DocumentEntry::new(uri, name)))
    }

    fn create_file(&self, dir: &str, _mime: &str, name: &str) -> Result<DocumentEntry> {
        if !self.dir_exists(dir) {
            return Err(StorageError::NotFound("Directory not found".to_string()));
        }

        let mut state = self.state.write();
        let mut attempt = 0u32;
        loop {
            let candidate = if attempt == 0 {
                name.to_string()
            } else {
                format!("{} ({})", name, attempt)
            };
            let uri = document_uri(dir, &candidate);
            if !state.docs.contains_key(&uri) {
                state.docs.insert(uri.clone(), Document::default());
                return Ok(DocumentEntry::new(uri, candidate));
            }
            attempt += 1;
        }
    }
}

fn document_uri(dir: &str, name: &str) -> String {
    format!("{}{}/{}", SCHEME, dir.trim_end_matches('/'), name)
}

struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
    stats: Arc<Mutex<ResourceStats>>,
    faults: Faults,
}

impl ReadResource for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if let Some(at) = self.faults.read_fails_at {
            if self.pos >= at {
                return Err(io::Error::other("injected read failure"));
            }
        }
        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let mut n = buf.len().min(self.data.len() - self.pos);
        if let Some(at) = self.faults.read_fails_at {
            n = n.min(at - self.pos);
        }
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(Some(n))
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        let remaining = (self.data.len() - self.pos) as u64;
        let skipped = n.min(remaining);
        self.pos += skipped as usize;
        Ok(skipped)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.stats.lock().closes += 1;
        if self.faults.close_fails {
            return Err(io::Error::other("injected close failure"));
        }
        Ok(())
    }
}

struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
    stats: Arc<Mutex<ResourceStats>>,
    faults: Faults,
}

impl WriteResource for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.faults.write_fails {
            return Err(io::Error::other("injected write failure"));
        }
        self.data.lock().extend_from_slice(buf);
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.stats.lock().closes += 1;
        if self.faults.close_fails {
            return Err(io::Error::other("injected close failure"));
        }
        Ok(())
    }
}
