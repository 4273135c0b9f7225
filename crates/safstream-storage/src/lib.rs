//! saf_stream Storage Provider Adapter
//!
//! The external storage subsystem, seen only through its capabilities:
//! - open a readable or writable byte stream for an opaque locator
//! - find or create a named document inside a directory handle
//!
//! Stream handles expose nothing but read/write/skip/close. Everything
//! above this crate is written against these traits.

mod error;
mod fs;
mod local;
mod memory;
mod provider;
mod resource;

pub use error::StorageError;
pub use fs::FsProvider;
pub use local::LocalFile;
pub use memory::{Faults, MemoryProvider, ResourceStats};
pub use provider::StorageProvider;
pub use resource::{DocumentEntry, ReadResource, WriteMode, WriteResource};

pub type Result<T> = std::result::Result<T, StorageError>;
