//! Incremental ZIP writer.
//!
//! Wraps [`zip::ZipWriter`] in streaming mode (local headers followed by data
//! descriptors, no seeking) over an in-memory buffer that the caller drains
//! after every write. Only bytes the ZIP encoder has already produced are
//! buffered, never a whole entry.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZipWriter};

use crate::{GateError, Result};

/// Entries of at least this size need ZIP64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Shared output buffer; the ZIP writer appends, the pipeline drains.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Vec<u8> {
        match self.0.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::other("archive buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn zip_error(e: zip::result::ZipError) -> GateError {
    GateError::Io(io::Error::other(e))
}

/// Streaming ZIP encoder.
pub struct ZipStreamWriter {
    zip: ZipWriter<StreamWriter<SharedBuffer>>,
    output: SharedBuffer,
    options: SimpleFileOptions,
}

impl ZipStreamWriter {
    /// Create a writer using Deflate at `compression_level` (1-9).
    ///
    /// Level 0 stores entries uncompressed.
    pub fn new(compression_level: i64) -> Self {
        let output = SharedBuffer::default();
        let options = if compression_level <= 0 {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        } else {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(compression_level))
        };
        Self {
            zip: ZipWriter::new_stream(output.clone()),
            output,
            options,
        }
    }

    /// Begin a new entry. `size` enables ZIP64 for very large files.
    pub fn start_entry(&mut self, name: &str, size: Option<u64>) -> Result<()> {
        let large = size.is_some_and(|s| s >= ZIP64_THRESHOLD);
        self.zip
            .start_file(name, self.options.large_file(large))
            .map_err(zip_error)
    }

    /// Append data to the current entry.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Push everything written to the current entry through the encoder.
    ///
    /// Call after an entry's last chunk, before fetching the next file.
    pub fn end_entry(&mut self) -> Result<()> {
        self.zip.flush()?;
        Ok(())
    }

    /// Drain the bytes produced so far.
    pub fn take_output(&self) -> Vec<u8> {
        self.output.take()
    }

    /// Close the last entry, write the central directory and return the
    /// remaining bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let output = self.output.clone();
        self.zip.finish().map_err(zip_error)?;
        Ok(output.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    #[test]
    fn test_writes_readable_archive_incrementally() {
        let mut writer = ZipStreamWriter::new(6);
        let mut bytes = Vec::new();

        writer.start_entry("a.txt", Some(10)).unwrap();
        writer.write_chunk(b"hello ").unwrap();
        bytes.extend(writer.take_output());
        writer.write_chunk(b"world").unwrap();
        bytes.extend(writer.take_output());

        writer.start_entry("b.txt", None).unwrap();
        writer.write_chunk(b"second").unwrap();
        bytes.extend(writer.take_output());

        bytes.extend(writer.finish().unwrap());

        assert_eq!(
            read_entries(bytes),
            vec![
                ("a.txt".to_string(), b"hello world".to_vec()),
                ("b.txt".to_string(), b"second".to_vec()),
            ]
        );
    }

    #[test]
    fn test_output_is_drained() {
        let mut writer = ZipStreamWriter::new(0);
        writer.start_entry("a.txt", None).unwrap();
        writer.write_chunk(&[7u8; 4096]).unwrap();

        let first = writer.take_output();
        assert!(!first.is_empty());
        assert!(first.starts_with(b"PK\x03\x04"));
        assert!(writer.take_output().is_empty());
    }

    #[test]
    fn test_stored_level_zero() {
        let mut writer = ZipStreamWriter::new(0);
        let mut bytes = Vec::new();

        writer.start_entry("a.txt", None).unwrap();
        writer.write_chunk(b"plain content").unwrap();
        writer.end_entry().unwrap();
        bytes.extend(writer.take_output());
        assert!(bytes.windows(13).any(|w| w == b"plain content"));

        bytes.extend(writer.finish().unwrap());
        assert_eq!(
            read_entries(bytes),
            vec![("a.txt".to_string(), b"plain content".to_vec())]
        );
    }

    #[test]
    fn test_end_entry_flushes_compressed_data() {
        let mut writer = ZipStreamWriter::new(9);
        writer.start_entry("a.txt", None).unwrap();
        let header = writer.take_output();
        assert!(header.starts_with(b"PK\x03\x04"));

        writer.write_chunk(&[b'x'; 2048]).unwrap();
        writer.end_entry().unwrap();
        let flushed = writer.take_output();
        assert!(!flushed.is_empty());

        let mut bytes = header;
        bytes.extend(flushed);
        bytes.extend(writer.finish().unwrap());
        assert_eq!(read_entries(bytes), vec![("a.txt".to_string(), vec![b'x'; 2048])]);
    }

    #[test]
    fn test_empty_archive() {
        let writer = ZipStreamWriter::new(9);
        let bytes = writer.finish().unwrap();
        assert!(read_entries(bytes).is_empty());
    }
}
