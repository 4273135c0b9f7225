//! Whole-file transfers
//!
//! Copy, read and write without sessions. Every function closes all the
//! resources it was given, including on error.

use std::io;

use safstream_storage::{ReadResource, WriteResource};

/// Copy `reader` into `writer` until end-of-data. Returns the bytes copied.
pub(crate) fn copy_stream(
    reader: &mut dyn ReadResource,
    writer: &mut dyn WriteResource,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;

    while let Some(n) = reader.read(&mut buffer)? {
        if n > 0 {
            writer.write(&buffer[..n])?;
            copied += n as u64;
        }
    }

    Ok(copied)
}

/// Copy and close both ends
pub(crate) fn copy_and_close(
    mut reader: Box<dyn ReadResource>,
    mut writer: Box<dyn WriteResource>,
    buffer_size: usize,
) -> io::Result<u64> {
    let copied = copy_stream(reader.as_mut(), writer.as_mut(), buffer_size);
    let read_closed = reader.close();
    let write_closed = writer.close();

    let copied = copied?;
    read_closed?;
    write_closed?;
    Ok(copied)
}

/// Write `data` in one go and close
pub(crate) fn write_and_close(mut writer: Box<dyn WriteResource>, data: &[u8]) -> io::Result<()> {
    let written = writer.write(data);
    let closed = writer.close();
    written?;
    closed
}

/// Read `[start, start + count)`, or everything from `start` when `count` is
/// `None`. A range running past end-of-data comes back short, not as an error.
pub(crate) fn read_range(
    mut reader: Box<dyn ReadResource>,
    start: Option<u64>,
    count: Option<usize>,
    buffer_size: usize,
) -> io::Result<Vec<u8>> {
    let result = read_range_inner(reader.as_mut(), start, count, buffer_size);
    let closed = reader.close();
    let bytes = result?;
    closed?;
    Ok(bytes)
}

fn read_range_inner(
    reader: &mut dyn ReadResource,
    start: Option<u64>,
    count: Option<usize>,
    buffer_size: usize,
) -> io::Result<Vec<u8>> {
    if let Some(offset) = start.filter(|offset| *offset > 0) {
        let mut skipped = 0u64;
        while skipped < offset {
            match reader.skip(offset - skipped)? {
                0 => return Ok(Vec::new()),
                step => skipped += step,
            }
        }
    }

    let limit = count.unwrap_or(usize::MAX);
    let mut out = Vec::with_capacity(count.unwrap_or(0).min(buffer_size));
    let mut buffer = vec![0u8; buffer_size.max(1)];

    while out.len() < limit {
        let want = (limit - out.len()).min(buffer.len());
        match reader.read(&mut buffer[..want])? {
            None => break,
            Some(n) => out.extend_from_slice(&buffer[..n]),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use safstream_storage::{MemoryProvider, StorageProvider, WriteMode};

    fn twenty() -> (MemoryProvider, String) {
        let provider = MemoryProvider::new();
        let uri = provider.insert("docs", "f.bin", (0u8..20).collect::<Vec<_>>());
        (provider, uri)
    }

    #[test]
    fn test_read_range() {
        let (provider, uri) = twenty();

        let bytes = read_range(provider.open_read(&uri).unwrap(), Some(10), Some(5), 4).unwrap();
        assert_eq!(bytes, vec![10, 11, 12, 13, 14]);

        let bytes = read_range(provider.open_read(&uri).unwrap(), Some(10), Some(100), 4).unwrap();
        assert_eq!(bytes, (10u8..20).collect::<Vec<_>>());

        let bytes = read_range(provider.open_read(&uri).unwrap(), None, None, 3).unwrap();
        assert_eq!(bytes.len(), 20);

        let bytes = read_range(provider.open_read(&uri).unwrap(), Some(50), None, 8).unwrap();
        assert!(bytes.is_empty());

        assert_eq!(provider.stats(&uri).open_handles(), 0);
    }

    #[test]
    fn test_copy_and_close() {
        let (provider, src) = twenty();
        let dst = provider.insert("docs", "copy.bin", Vec::new());

        let copied = copy_and_close(
            provider.open_read(&src).unwrap(),
            provider.open_write(&dst, WriteMode::Truncate).unwrap(),
            6,
        )
        .unwrap();

        assert_eq!(copied, 20);
        assert_eq!(provider.contents(&dst), provider.contents(&src));
        assert_eq!(provider.stats(&src).open_handles(), 0);
        assert_eq!(provider.stats(&dst).open_handles(), 0);
    }
}
