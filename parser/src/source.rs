//! Random-access byte sources for the parser.
//!
//! A [`DataSource`] hands out byte ranges by absolute offset. The two
//! implementations are an in-memory buffer, which serves borrowed
//! slices, and a seekable file handle, which serializes access through
//! an internal lock and returns owned copies. Sources are shared
//! through `Arc`, so one open file can back a data set and any lazy
//! values pointing into it.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use snafu::{ensure, ResultExt, Snafu};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

/// An error reading from a data source.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SourceError {
    /// The requested range is not within the source.
    #[snafu(display(
        "range [{offset}, {offset}+{len}) is out of bounds of source with {available} bytes"
    ))]
    OutOfRange {
        /// requested start offset
        offset: u64,
        /// requested byte count
        len: usize,
        /// total bytes available
        available: u64,
    },
    /// The underlying reader failed.
    #[snafu(display("I/O error reading {len} bytes at offset {offset}"))]
    Io {
        /// requested start offset
        offset: u64,
        /// requested byte count
        len: usize,
        /// the I/O failure
        source: std::io::Error,
    },
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;

/// A random-access reader of byte ranges.
///
/// Implementations may be read concurrently; those wrapping a stateful
/// handle must serialize internally.
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// The total number of bytes in the source.
    fn len(&self) -> u64;

    /// Whether the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Read `len` bytes starting at `offset`.
    ///
    /// In-memory sources return a borrowed slice; others an owned copy.
    fn slice_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(Cow::Owned(buf))
    }

    /// Read an unsigned 16-bit number at `offset` in the given order.
    fn read_u16_at(&self, offset: u64, endianness: Endianness) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_at(offset, &mut buf)?;
        Ok(match endianness {
            Endianness::Little => LittleEndian::read_u16(&buf),
            Endianness::Big => BigEndian::read_u16(&buf),
        })
    }

    /// Read an unsigned 32-bit number at `offset` in the given order.
    fn read_u32_at(&self, offset: u64, endianness: Endianness) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_at(offset, &mut buf)?;
        Ok(match endianness {
            Endianness::Little => LittleEndian::read_u32(&buf),
            Endianness::Big => BigEndian::read_u32(&buf),
        })
    }
}

/// A data source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    /// Wrap a byte buffer as a data source.
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data }
    }

    /// Borrow the full contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(data: Vec<u8>) -> Self {
        MemorySource::new(data)
    }
}

impl DataSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let slice = self.slice_at(offset, buf.len())?;
        buf.copy_from_slice(&slice);
        Ok(())
    }

    fn slice_at(&self, offset: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let end = offset
            .checked_add(len as u64)
            .filter(|&end| end <= self.len());
        match end {
            Some(end) => Ok(Cow::Borrowed(&self.data[offset as usize..end as usize])),
            None => OutOfRangeSnafu {
                offset,
                len,
                available: self.len(),
            }
            .fail(),
        }
    }
}

/// A data source over a seekable file handle.
///
/// Reads seek and copy under an internal lock, so concurrent readers
/// are safe. The handle is owned and closed when the source is dropped.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Open the file at `path` as a data source.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileSource {
            file: Mutex::new(file),
            len,
        })
    }
}

impl DataSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        ensure!(
            offset + buf.len() as u64 <= self.len,
            OutOfRangeSnafu {
                offset,
                len: buf.len(),
                available: self.len,
            }
        );
        let mut file = self.file.lock().expect("file source lock poisoned");
        file.seek(SeekFrom::Start(offset)).context(IoSnafu {
            offset,
            len: buf.len(),
        })?;
        file.read_exact(buf).context(IoSnafu {
            offset,
            len: buf.len(),
        })
    }
}

/// A positioned [`Read`] adapter over a shared data source.
///
/// The parser walks a source through this cursor; skipping is a plain
/// position bump, with no bytes touched.
#[derive(Debug, Clone)]
pub struct SourceReader {
    source: std::sync::Arc<dyn DataSource>,
    position: u64,
}

impl SourceReader {
    /// Create a cursor over the source, starting at offset 0.
    pub fn new(source: std::sync::Arc<dyn DataSource>) -> Self {
        SourceReader {
            source,
            position: 0,
        }
    }

    /// The current read position.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The number of bytes between the position and the end.
    #[inline]
    pub fn remaining(&self) -> u64 {
        self.source.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute offset.
    pub fn seek_to(&mut self, position: u64) {
        self.position = position;
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, bytes: u64) {
        self.position += bytes;
    }

    /// The shared source under this cursor.
    pub fn source(&self) -> &std::sync::Arc<dyn DataSource> {
        &self.source
    }

    /// Read exactly `len` bytes at the cursor, advancing it.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.source.read_at(self.position, &mut buf)?;
        self.position += len as u64;
        Ok(buf)
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let wanted = (buf.len() as u64).min(self.remaining()) as usize;
        if wanted == 0 {
            return Ok(0);
        }
        self.source
            .read_at(self.position, &mut buf[..wanted])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e))?;
        self.position += wanted as u64;
        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    #[test]
    fn memory_source_borrows() {
        let src = MemorySource::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(src.len(), 5);
        let slice = src.slice_at(1, 3).unwrap();
        assert!(matches!(slice, Cow::Borrowed(_)));
        assert_eq!(&*slice, &[2, 3, 4]);
        assert!(src.slice_at(3, 3).is_err());
    }

    #[test]
    fn numeric_reads_by_endianness() {
        let src = MemorySource::new(vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(src.read_u16_at(0, Endianness::Little).unwrap(), 0x0201);
        assert_eq!(src.read_u16_at(0, Endianness::Big).unwrap(), 0x0102);
        assert_eq!(src.read_u32_at(0, Endianness::Little).unwrap(), 0x0403_0201);
    }

    #[test]
    fn file_source_reads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"DICM test payload").unwrap();
        let src = FileSource::open(tmp.path()).unwrap();
        assert_eq!(src.len(), 17);
        let mut buf = [0u8; 4];
        src.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"DICM");
        assert!(src.read_at(15, &mut [0u8; 4]).is_err());
    }

    #[test]
    fn reader_cursor() {
        let src: Arc<dyn DataSource> = Arc::new(MemorySource::new((0u8..32).collect()));
        let mut reader = SourceReader::new(src);
        let mut buf = [0u8; 4];
        reader.read(&mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3]);
        reader.skip(4);
        reader.read(&mut buf).unwrap();
        assert_eq!(buf, [8, 9, 10, 11]);
        assert_eq!(reader.position(), 12);
    }
}
