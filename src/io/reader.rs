//! Bounds-checked cursor over a vendor map buffer.
//!
//! Every read names the field being read so that truncated input produces
//! an error pointing at the exact section, field and offset:
//!
//! ```text
//! error parsing image.pixel at offset 0x1a4: buffer underrun (needed 1, remaining 0)
//! ```
//!
//! All multi-byte reads are little-endian except [`ByteReader::u16_be`],
//! which exists for headers that store 16-bit values big-endian.

use crate::error::{Error, Result};

/// Cursor over an immutable byte buffer.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
    section: &'static str,
    /// Offset remembered by [`ByteReader::mark`]
    mark: Option<usize>,
}

impl<'a> ByteReader<'a> {
    /// Create a reader over the whole buffer
    pub fn new(section: &'static str, data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            end: data.len(),
            section,
            mark: None,
        }
    }

    /// Create a reader over `len` bytes starting at `offset`.
    ///
    /// Fails if the window does not fit inside the buffer.
    pub fn window(
        section: &'static str,
        data: &'a [u8],
        offset: usize,
        len: usize,
    ) -> Result<Self> {
        let end = offset.checked_add(len).filter(|&end| end <= data.len());
        match end {
            Some(end) => Ok(Self {
                data,
                offset,
                end,
                section,
                mark: None,
            }),
            None => Err(Error::BufferUnderrun {
                section: section.to_string(),
                field: "window".to_string(),
                offset,
                needed: len,
                remaining: data.len().saturating_sub(offset),
            }),
        }
    }

    /// Switch the section name used in error messages
    pub fn set_section(&mut self, section: &'static str) {
        self.section = section;
        log::debug!("SECTION {}: offset {:#x}", section, self.offset);
    }

    /// Current section name
    pub fn section(&self) -> &'static str {
        self.section
    }

    /// Absolute offset of the cursor
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left before the end of the window
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.offset
    }

    /// True when every byte has been consumed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Remember the current offset (e.g. the first pixel of a raster)
    pub fn mark(&mut self) {
        self.mark = Some(self.offset);
    }

    /// Byte at `index` relative to the remembered mark
    pub fn byte_from_mark(&self, index: usize) -> Option<u8> {
        let start = self.mark?;
        let pos = start.checked_add(index)?;
        if pos < self.end {
            Some(self.data[pos])
        } else {
            None
        }
    }

    fn ensure(&self, field: &str, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::BufferUnderrun {
                section: self.section.to_string(),
                field: field.to_string(),
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        self.ensure(field, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    /// Advance the cursor by `n` bytes
    pub fn skip(&mut self, field: &str, n: usize) -> Result<()> {
        self.ensure(field, n)?;
        self.offset += n;
        Ok(())
    }

    /// Move the cursor to an absolute offset inside the window
    pub fn seek(&mut self, field: &str, offset: usize) -> Result<()> {
        if offset > self.end {
            return Err(Error::BufferUnderrun {
                section: self.section.to_string(),
                field: field.to_string(),
                offset,
                needed: offset - self.end,
                remaining: 0,
            });
        }
        self.offset = offset;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them
    pub fn bytes(&mut self, field: &str, n: usize) -> Result<&'a [u8]> {
        self.ensure(field, n)?;
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Borrow everything left in the window
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.offset..self.end];
        self.offset = self.end;
        slice
    }

    /// Read an unsigned byte
    pub fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take::<1>(field)?[0])
    }

    /// Read a signed byte
    pub fn i8(&mut self, field: &str) -> Result<i8> {
        Ok(self.take::<1>(field)?[0] as i8)
    }

    /// Read a little-endian u16
    pub fn u16_le(&mut self, field: &str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(field)?))
    }

    /// Read a little-endian i16
    pub fn i16_le(&mut self, field: &str) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take(field)?))
    }

    /// Read a big-endian u16
    pub fn u16_be(&mut self, field: &str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take(field)?))
    }

    /// Read a little-endian u32
    pub fn u32_le(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(field)?))
    }

    /// Read a little-endian i32
    pub fn i32_le(&mut self, field: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(field)?))
    }

    /// Read a little-endian f32
    pub fn f32_le(&mut self, field: &str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(field)?))
    }

    /// Read a string prefixed by a one-byte length
    pub fn string_len8(&mut self, field: &str) -> Result<String> {
        let len = self.u8(field)? as usize;
        let raw = self.bytes(field, len)?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    /// Read a little-endian u32 without advancing
    pub fn peek_u32(&self, field: &str) -> Result<u32> {
        self.ensure(field, 4)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.data[self.offset..self.offset + 4]);
        Ok(u32::from_le_bytes(out))
    }

    /// Advance to the next occurrence of `needle`.
    ///
    /// Returns `false` (cursor unchanged) when the needle does not occur
    /// before the end of the window.
    pub fn seek_to(&mut self, needle: &[u8]) -> bool {
        if needle.is_empty() {
            return true;
        }
        let haystack = &self.data[self.offset..self.end];
        match haystack.windows(needle.len()).position(|w| w == needle) {
            Some(pos) => {
                self.offset += pos;
                true
            }
            None => false,
        }
    }
}
