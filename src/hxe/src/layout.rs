//! Fixed-offset binary field access.
//!
//! Every on-disk record handled by this crate is a fixed-length buffer with
//! fields at declared byte offsets. This module provides the bounds-checked
//! primitives the record codecs are built on: slice-level field reads and
//! writes, sequential cursors for sections, and [`Blob`], an in-memory copy of
//! a whole file that is loaded and flushed in one piece.

use byteorder::{ByteOrder, LE};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record truncated: {width} bytes at {offset:#x} requested, buffer holds {len}")]
    TruncatedRecord {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("write of {width} bytes at {offset:#x} exceeds buffer of {len} bytes")]
    OffsetOutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },

    #[error("value of {len} bytes does not fit the {width}-byte field at {offset:#x}")]
    ValueTooLong {
        offset: usize,
        width: usize,
        len: usize,
    },
}

/// Read exactly `width` bytes at `offset`.
pub fn read_field(buffer: &[u8], offset: usize, width: usize) -> Result<&[u8], LayoutError> {
    offset
        .checked_add(width)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(LayoutError::TruncatedRecord {
            offset,
            width,
            len: buffer.len(),
        })
}

/// Overwrite `bytes.len()` bytes at `offset`. The buffer is never resized.
pub fn write_field(buffer: &mut [u8], offset: usize, bytes: &[u8]) -> Result<(), LayoutError> {
    let len = buffer.len();
    let target = offset
        .checked_add(bytes.len())
        .and_then(|end| buffer.get_mut(offset..end))
        .ok_or(LayoutError::OffsetOutOfRange {
            offset,
            width: bytes.len(),
            len,
        })?;
    target.copy_from_slice(bytes);
    Ok(())
}

/// Decode a NUL-padded UTF-8 string occupying `width` bytes.
pub fn read_str(buffer: &[u8], offset: usize, width: usize) -> Result<String, LayoutError> {
    let raw = read_field(buffer, offset, width)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Encode `value` as UTF-8 into a `width`-byte field, NUL-padding the rest.
pub fn write_str(
    buffer: &mut [u8],
    offset: usize,
    width: usize,
    value: &str,
) -> Result<(), LayoutError> {
    let bytes = value.as_bytes();
    if bytes.len() > width {
        return Err(LayoutError::ValueTooLong {
            offset,
            width,
            len: bytes.len(),
        });
    }
    let mut field = vec![0u8; width];
    field[..bytes.len()].copy_from_slice(bytes);
    write_field(buffer, offset, &field)
}

/// Decode a NUL-terminated UTF-16LE string of at most `chars` code units.
pub fn read_utf16(buffer: &[u8], offset: usize, chars: usize) -> Result<String, LayoutError> {
    let raw = read_field(buffer, offset, chars * 2)?;
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(LE::read_u16)
        .take_while(|&u| u != 0)
        .collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Encode `value` as UTF-16LE into a field of `chars` code units, zero-padded.
pub fn write_utf16(
    buffer: &mut [u8],
    offset: usize,
    chars: usize,
    value: &str,
) -> Result<(), LayoutError> {
    let units: Vec<u16> = value.encode_utf16().collect();
    if units.len() > chars {
        return Err(LayoutError::ValueTooLong {
            offset,
            width: chars * 2,
            len: units.len() * 2,
        });
    }
    let mut field = vec![0u8; chars * 2];
    for (i, unit) in units.iter().enumerate() {
        LE::write_u16(&mut field[i * 2..], *unit);
    }
    write_field(buffer, offset, &field)
}

/// Sequential reader over the fields of one section.
pub struct FieldReader<'a> {
    buffer: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buffer: &'a [u8], offset: usize) -> Self {
        FieldReader {
            buffer,
            pos: offset,
        }
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], LayoutError> {
        let bytes = read_field(self.buffer, self.pos, width)?;
        self.pos += width;
        Ok(bytes)
    }

    pub fn u8(&mut self) -> Result<u8, LayoutError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, LayoutError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, LayoutError> {
        Ok(LE::read_u16(self.take(2)?))
    }

    pub fn u32(&mut self) -> Result<u32, LayoutError> {
        Ok(LE::read_u32(self.take(4)?))
    }

    pub fn i32(&mut self) -> Result<i32, LayoutError> {
        Ok(LE::read_i32(self.take(4)?))
    }
}

/// Sequential writer over the fields of one section.
pub struct FieldCursor<'a> {
    buffer: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(buffer: &'a mut [u8], offset: usize) -> Self {
        FieldCursor {
            buffer,
            pos: offset,
        }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), LayoutError> {
        write_field(self.buffer, self.pos, bytes)?;
        self.pos += bytes.len();
        Ok(())
    }

    pub fn u8(&mut self, value: u8) -> Result<(), LayoutError> {
        self.put(&[value])
    }

    pub fn bool(&mut self, value: bool) -> Result<(), LayoutError> {
        self.u8(u8::from(value))
    }

    pub fn u16(&mut self, value: u16) -> Result<(), LayoutError> {
        let mut bytes = [0u8; 2];
        LE::write_u16(&mut bytes, value);
        self.put(&bytes)
    }

    pub fn u32(&mut self, value: u32) -> Result<(), LayoutError> {
        let mut bytes = [0u8; 4];
        LE::write_u32(&mut bytes, value);
        self.put(&bytes)
    }

    pub fn i32(&mut self, value: i32) -> Result<(), LayoutError> {
        let mut bytes = [0u8; 4];
        LE::write_i32(&mut bytes, value);
        self.put(&bytes)
    }

    /// Current absolute position.
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// In-memory image of a whole file.
///
/// The file is read completely by [`Blob::open_at`] and written completely by
/// [`Blob::flush`]; the file handle only lives for the duration of either
/// call.
#[derive(Debug, Clone)]
pub struct Blob {
    path: PathBuf,
    data: Vec<u8>,
}

impl Blob {
    /// Zero-filled buffer of `len` bytes destined for `path`.
    pub fn new(path: impl Into<PathBuf>, len: usize) -> Self {
        Blob {
            path: path.into(),
            data: vec![0u8; len],
        }
    }

    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Blob {
            path: path.into(),
            data,
        }
    }

    /// Copy the file at `path` into memory.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, LayoutError> {
        let path = path.into();
        let mut data = Vec::new();
        {
            let mut file = File::open(&path)?;
            file.read_to_end(&mut data)?;
        }
        Ok(Blob { path, data })
    }

    /// Copy the file at `path` into memory, requiring at least `len` bytes.
    pub fn open_sized(path: impl Into<PathBuf>, len: usize) -> Result<Self, LayoutError> {
        let blob = Self::open_at(path)?;
        if blob.data.len() < len {
            return Err(LayoutError::TruncatedRecord {
                offset: 0,
                width: len,
                len: blob.data.len(),
            });
        }
        Ok(blob)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn read_field(&self, offset: usize, width: usize) -> Result<&[u8], LayoutError> {
        read_field(&self.data, offset, width)
    }

    pub fn write_field(&mut self, offset: usize, bytes: &[u8]) -> Result<(), LayoutError> {
        write_field(&mut self.data, offset, bytes)
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, LayoutError> {
        FieldReader::new(&self.data, offset).u8()
    }

    pub fn read_bool(&self, offset: usize) -> Result<bool, LayoutError> {
        FieldReader::new(&self.data, offset).bool()
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, LayoutError> {
        FieldReader::new(&self.data, offset).u16()
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, LayoutError> {
        FieldReader::new(&self.data, offset).u32()
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), LayoutError> {
        FieldCursor::new(&mut self.data, offset).u8(value)
    }

    pub fn write_bool(&mut self, offset: usize, value: bool) -> Result<(), LayoutError> {
        FieldCursor::new(&mut self.data, offset).bool(value)
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<(), LayoutError> {
        FieldCursor::new(&mut self.data, offset).u16(value)
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), LayoutError> {
        FieldCursor::new(&mut self.data, offset).u32(value)
    }

    pub fn read_str(&self, offset: usize, width: usize) -> Result<String, LayoutError> {
        read_str(&self.data, offset, width)
    }

    pub fn write_str(
        &mut self,
        offset: usize,
        width: usize,
        value: &str,
    ) -> Result<(), LayoutError> {
        write_str(&mut self.data, offset, width, value)
    }

    pub fn read_utf16(&self, offset: usize, chars: usize) -> Result<String, LayoutError> {
        read_utf16(&self.data, offset, chars)
    }

    pub fn write_utf16(
        &mut self,
        offset: usize,
        chars: usize,
        value: &str,
    ) -> Result<(), LayoutError> {
        write_utf16(&mut self.data, offset, chars, value)
    }

    pub fn reader(&self, offset: usize) -> FieldReader<'_> {
        FieldReader::new(&self.data, offset)
    }

    pub fn cursor(&mut self, offset: usize) -> FieldCursor<'_> {
        FieldCursor::new(&mut self.data, offset)
    }

    /// Write the whole buffer back to its path, replacing the file.
    pub fn flush(&self) -> Result<(), LayoutError> {
        let mut file = File::create(&self.path)?;
        file.write_all(&self.data)?;
        file.flush()?;
        Ok(())
    }
}
