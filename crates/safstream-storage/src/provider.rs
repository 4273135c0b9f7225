//! Storage provider trait

use crate::resource::{DocumentEntry, ReadResource, WriteMode, WriteResource};
use crate::Result;

/// The external storage subsystem.
///
/// Locators and directory handles are opaque strings owned by the provider.
/// Implementations must be usable from several worker threads at once.
pub trait StorageProvider: Send + Sync + 'static {
    /// Open the document at `locator` for reading.
    fn open_read(&self, locator: &str) -> Result<Box<dyn ReadResource>>;

    /// Open the document at `locator` for writing.
    fn open_write(&self, locator: &str, mode: WriteMode) -> Result<Box<dyn WriteResource>>;

    /// Look up a document by name directly under `dir`.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound) when
    /// `dir` itself does not exist.
    fn find_file(&self, dir: &str, name: &str) -> Result<Option<DocumentEntry>>;

    /// Create a new empty document under `dir`.
    ///
    /// Collision handling is provider-defined; the returned entry carries the
    /// name that was actually used.
    fn create_file(&self, dir: &str, mime: &str, name: &str) -> Result<DocumentEntry>;
}
