//! Directory-backed provider
//!
//! Treats directory handles and document locators as local paths, given
//! either as `file://` URLs or as plain paths. New documents never replace
//! existing ones: a colliding name becomes `"stem (1).ext"`, `"stem (2).ext"`,
//! and so on, which is how documents providers resolve collisions.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::StorageError;
use crate::local::LocalFile;
use crate::provider::StorageProvider;
use crate::resource::{DocumentEntry, ReadResource, WriteMode, WriteResource};
use crate::Result;

const MAX_RENAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Default)]
pub struct FsProvider;

impl FsProvider {
    pub fn new() -> Self {
        Self
    }

    fn resolve(locator: &str) -> Result<PathBuf> {
        if locator.starts_with("file:") {
            let url =
                Url::parse(locator).map_err(|_| StorageError::InvalidLocator(locator.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| StorageError::InvalidLocator(locator.to_string()));
        }

        if locator.trim().is_empty() {
            return Err(StorageError::InvalidLocator(locator.to_string()));
        }

        Ok(PathBuf::from(locator))
    }

    fn resolve_dir(dir: &str) -> Result<PathBuf> {
        let path = Self::resolve(dir)?;
        if !path.is_dir() {
            return Err(StorageError::NotFound("Directory not found".to_string()));
        }
        Ok(path)
    }

    fn locator_for(path: &Path) -> String {
        Url::from_file_path(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| path.to_string_lossy().into_owned())
    }
}

impl StorageProvider for FsProvider {
    fn open_read(&self, locator: &str) -> Result<Box<dyn ReadResource>> {
        let path = Self::resolve(locator)?;
        let file = LocalFile::open(&path).map_err(|e| open_error(locator, e))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, locator: &str, mode: WriteMode) -> Result<Box<dyn WriteResource>> {
        let path = Self::resolve(locator)?;
        let file = LocalFile::open_write(&path, mode).map_err(|e| open_error(locator, e))?;
        Ok(Box::new(file))
    }

    fn find_file(&self, dir: &str, name: &str) -> Result<Option<DocumentEntry>> {
        let dir = Self::resolve_dir(dir)?;
        let path = dir.join(sanitize_file_name(name));

        if path.is_file() {
            Ok(Some(DocumentEntry::new(
                Self::locator_for(&path),
                display_name(&path),
            )))
        } else {
            Ok(None)
        }
    }

    fn create_file(&self, dir: &str, mime: &str, name: &str) -> Result<DocumentEntry> {
        let dir = Self::resolve_dir(dir)?;
        let name = sanitize_file_name(name);

        for attempt in 0..MAX_RENAME_ATTEMPTS {
            let candidate = dir.join(candidate_name(&name, attempt));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    tracing::debug!(
                        path = %candidate.display(),
                        mime = %mime,
                        "Created document"
                    );
                    return Ok(DocumentEntry::new(
                        Self::locator_for(&candidate),
                        display_name(&candidate),
                    ));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CreationFailed(format!(
                        "File creation failed: {}",
                        e
                    )))
                }
            }
        }

        Err(StorageError::CreationFailed(
            "File creation failed".to_string(),
        ))
    }
}

fn open_error(locator: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(format!("File not found: {}", locator))
    } else {
        StorageError::CreationFailed(format!("Stream creation failed: {}", e))
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document")
        .trim();

    if name.is_empty() {
        "document".to_string()
    } else {
        name.to_string()
    }
}

fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", name, attempt),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("a.txt", 0), "a.txt");
        assert_eq!(candidate_name("a.txt", 2), "a (2).txt");
        assert_eq!(candidate_name("README", 1), "README (1)");
        assert_eq!(candidate_name(".env", 1), ".env (1)");
    }

    #[test]
    fn test_create_file_renames_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();
        let provider = FsProvider::new();

        let first = provider.create_file(dir_str, "text/plain", "notes.txt").unwrap();
        let second = provider.create_file(dir_str, "text/plain", "notes.txt").unwrap();

        assert_eq!(first.name, "notes.txt");
        assert_eq!(second.name, "notes (1).txt");
        assert_ne!(first.uri, second.uri);
    }

    #[test]
    fn test_find_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.bin"), b"x").unwrap();
        let dir_uri = Url::from_file_path(dir.path()).unwrap().to_string();
        let provider = FsProvider::new();

        let found = provider.find_file(&dir_uri, "present.bin").unwrap();
        assert_eq!(found.map(|e| e.name), Some("present.bin".to_string()));
        assert!(provider.find_file(&dir_uri, "absent.bin").unwrap().is_none());
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let provider = FsProvider::new();

        let err = provider
            .create_file(missing.to_str().unwrap(), "text/plain", "a.txt")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_open_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsProvider::new();
        let locator = dir.path().join("missing.bin");

        let err = provider
            .open_read(locator.to_str().unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
