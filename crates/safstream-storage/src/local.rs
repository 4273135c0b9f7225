//! Local filesystem resources
//!
//! Plain `std::fs::File` handles behind the resource capabilities. Used for
//! the local side of copy-to-local and paste-local-file, and by `FsProvider`.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::resource::{ReadResource, WriteMode, WriteResource};

pub struct LocalFile {
    file: File,
}

impl LocalFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }

    /// Create (or truncate) a file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    pub fn open_write<P: AsRef<Path>>(path: P, mode: WriteMode) -> io::Result<Self> {
        let mut opts = OpenOptions::new();
        opts.write(true);
        if mode == WriteMode::Truncate {
            opts.truncate(true);
        }

        Ok(Self {
            file: opts.open(path)?,
        })
    }
}

impl ReadResource for LocalFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }
        match self.file.read(buf)? {
            0 => Ok(None),
            n => Ok(Some(n)),
        }
    }

    fn skip(&mut self, n: u64) -> io::Result<u64> {
        // Seeking past the end is legal for files, so clamp to the length.
        let len = self.file.metadata()?.len();
        let pos = self.file.stream_position()?;
        let target = pos.saturating_add(n).min(len.max(pos));
        self.file.seek(SeekFrom::Start(target))?;
        Ok(target - pos)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self.file);
        Ok(())
    }
}

impl WriteResource for LocalFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_reports_end_of_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut file = LocalFile::open(&path).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(ReadResource::read(&mut file, &mut buf).unwrap(), Some(3));
        assert_eq!(ReadResource::read(&mut file, &mut buf).unwrap(), None);
    }

    #[test]
    fn test_skip_is_clamped_to_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [1u8; 20]).unwrap();

        let mut file = LocalFile::open(&path).unwrap();
        assert_eq!(file.skip(15).unwrap(), 15);
        assert_eq!(file.skip(15).unwrap(), 5);
        assert_eq!(file.skip(15).unwrap(), 0);
    }

    #[test]
    fn test_truncate_mode_discards_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, b"old content").unwrap();

        let mut file = Box::new(LocalFile::open_write(&path, WriteMode::Truncate).unwrap());
        WriteResource::write(file.as_mut(), b"new").unwrap();
        WriteResource::close(file).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
