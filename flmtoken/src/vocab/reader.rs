//! Sequential reader for the fixed width primitives the legacy vocabulary format is made of.
//!
//! Every read consumes exactly the bytes it asks for, or fails.  Unlike the tool that produced
//! these files, running out of input is always an error here; there's no sensible way to keep
//! parsing once the stream has desynchronized.
use crate::error::{FileIoSnafu, NegativeValueSnafu, ReadSnafu, ShortReadSnafu};
use crate::Result;
use snafu::{ensure, ResultExt};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Reads 4 byte little-endian integers and floats, raw byte blocks, and length-prefixed strings
/// from an underlying [`Read`] impl, keeping track of the byte offset for error reporting.
///
/// The underlying reader (and for [`Self::open`], the file handle) is dropped along with this
/// struct.
pub struct ByteStreamReader<R> {
    inner: R,
    offset: u64,
}

impl ByteStreamReader<BufReader<File>> {
    /// Open a file on the filesystem for reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|_| FileIoSnafu {
            path: path.to_path_buf(),
        })?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> ByteStreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// The number of bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read a 4 byte signed integer.
    ///
    /// `field` names what is being read, and is only used in error messages.
    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(field)?))
    }

    /// Read a 4 byte IEEE 754 float.
    pub fn read_f32(&mut self, field: &'static str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(field)?))
    }

    /// Read a 4 byte signed integer that's used as a count, length, or id, and so must not be
    /// negative.
    pub fn read_usize(&mut self, field: &'static str) -> Result<usize> {
        let offset = self.offset;
        let value = self.read_i32(field)?;
        ensure!(
            value >= 0,
            NegativeValueSnafu {
                field,
                offset,
                value
            }
        );

        Ok(value as usize)
    }

    /// Read a length-prefixed string: a 4 byte length, followed by exactly that many raw bytes.
    pub fn read_string(&mut self, field: &'static str) -> Result<Vec<u8>> {
        let len = self.read_usize(field)?;
        let offset = self.offset;

        // Don't trust `len` enough to pre-allocate it; a corrupt file could claim gigabytes.
        let mut buffer = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buffer)
            .context(ReadSnafu { field, offset })?;
        self.offset += buffer.len() as u64;

        ensure!(
            buffer.len() == len,
            ShortReadSnafu {
                field,
                offset,
                expected: len
            }
        );

        Ok(buffer)
    }

    /// Fill `buffer` completely with the next bytes of the stream.
    pub fn read_bytes(&mut self, buffer: &mut [u8], field: &'static str) -> Result<()> {
        let offset = self.offset;
        match self.inner.read_exact(buffer) {
            Ok(()) => {
                self.offset += buffer.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => ShortReadSnafu {
                field,
                offset,
                expected: buffer.len(),
            }
            .fail(),
            Err(e) => Err(e).context(ReadSnafu { field, offset }),
        }
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut buffer = [0u8; N];
        self.read_bytes(&mut buffer, field)?;
        Ok(buffer)
    }
}
