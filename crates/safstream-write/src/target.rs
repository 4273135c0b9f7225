//! Target resolution
//!
//! With `overwrite`, an existing document of the same name is reused and
//! truncated (created if absent). Without it a new document is always
//! created, and the provider decides what happens on a name collision.

use safstream_storage::{DocumentEntry, StorageProvider, WriteMode, WriteResource};

use crate::Result;

pub fn open_target(
    provider: &dyn StorageProvider,
    dir: &str,
    file_name: &str,
    mime: &str,
    overwrite: bool,
) -> Result<(DocumentEntry, Box<dyn WriteResource>)> {
    let (entry, mode) = if overwrite {
        match provider.find_file(dir, file_name)? {
            Some(existing) => (existing, WriteMode::Truncate),
            None => (provider.create_file(dir, mime, file_name)?, WriteMode::Truncate),
        }
    } else {
        (provider.create_file(dir, mime, file_name)?, WriteMode::Fresh)
    };

    let stream = provider.open_write(&entry.uri, mode)?;

    tracing::debug!(
        uri = %entry.uri,
        file_name = %entry.name,
        overwrite,
        "Resolved write target"
    );

    Ok((entry, stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WriteError;
    use safstream_storage::{FsProvider, MemoryProvider, StorageError};

    #[test]
    fn test_overwrite_reuses_existing() {
        let provider = MemoryProvider::new();
        let uri = provider.insert("docs", "a.txt", b"old content".to_vec());

        let (entry, mut stream) = open_target(&provider, "docs", "a.txt", "text/plain", true).unwrap();
        stream.write(b"new").unwrap();
        stream.close().unwrap();

        assert_eq!(entry.uri, uri);
        assert_eq!(provider.contents(&uri).unwrap(), b"new");
    }

    #[test]
    fn test_overwrite_creates_when_absent() {
        let provider = MemoryProvider::new();
        provider.add_dir("docs");

        let (entry, stream) = open_target(&provider, "docs", "a.txt", "text/plain", true).unwrap();
        stream.close().unwrap();

        assert_eq!(entry.name, "a.txt");
        assert_eq!(provider.contents(&entry.uri).unwrap(), b"");
    }

    #[test]
    fn test_no_overwrite_keeps_existing() {
        let provider = MemoryProvider::new();
        let uri = provider.insert("docs", "a.txt", b"keep".to_vec());

        let (entry, mut stream) = open_target(&provider, "docs", "a.txt", "text/plain", false).unwrap();
        stream.write(b"fresh").unwrap();
        stream.close().unwrap();

        assert_ne!(entry.uri, uri);
        assert_eq!(provider.contents(&uri).unwrap(), b"keep");
        assert_eq!(provider.contents(&entry.uri).unwrap(), b"fresh");
    }

    #[test]
    fn test_missing_directory() {
        let provider = MemoryProvider::new();
        let err = open_target(&provider, "nope", "a.txt", "text/plain", false)
            .err()
            .unwrap();
        assert!(matches!(err, WriteError::Storage(StorageError::NotFound(_))));
    }

    #[test]
    fn test_fs_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a much longer old body").unwrap();
        let provider = FsProvider::new();

        let (entry, mut stream) =
            open_target(&provider, dir.path().to_str().unwrap(), "a.txt", "text/plain", true)
                .unwrap();
        stream.write(b"short").unwrap();
        stream.close().unwrap();

        assert_eq!(entry.name, "a.txt");
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"short");
    }
}
