//! Binary buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A binary buffer reader over a byte slice.
///
/// The reader keeps a cursor (`x`) and an exclusive `end`. All multi-byte
/// reads are big-endian.
///
/// # Example
///
/// ```
/// use modelplan_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.u16().unwrap(), 0x0203);
/// assert!(reader.u16().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// End position (exclusive).
    pub end: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader for the given byte slice.
    pub fn new(uint8: &'a [u8]) -> Self {
        let end = uint8.len();
        Self { uint8, x: 0, end }
    }

    /// Creates a reader positioned at `x`, reading up to `end`.
    ///
    /// Both bounds are clamped to the slice length.
    pub fn from_slice(uint8: &'a [u8], x: usize, end: usize) -> Self {
        let end = end.min(uint8.len());
        Self {
            uint8,
            x: x.min(end),
            end,
        }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.end - self.x
    }

    /// Peeks at the current byte without advancing the cursor.
    pub fn peek(&self) -> Result<u8, BufferError> {
        self.ensure(1)?;
        Ok(self.uint8[self.x])
    }

    /// Advances the cursor by the given number of bytes.
    pub fn skip(&mut self, length: usize) -> Result<(), BufferError> {
        self.ensure(length)?;
        self.x += length;
        Ok(())
    }

    /// Returns a subarray of the given size and advances the cursor.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.ensure(size)?;
        let x = self.x;
        self.x += size;
        Ok(&self.uint8[x..self.x])
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<(), BufferError> {
        let remaining = self.size();
        if needed > remaining {
            return Err(BufferError::EndOfBuffer { needed, remaining });
        }
        Ok(())
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        let bytes = self.buf(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        let val = self.peek()?;
        self.x += 1;
        Ok(val)
    }

    /// Reads a signed 8-bit integer.
    #[inline]
    pub fn i8(&mut self) -> Result<i8, BufferError> {
        Ok(i8::from_be_bytes(self.array()?))
    }

    /// Reads an unsigned 16-bit integer.
    #[inline]
    pub fn u16(&mut self) -> Result<u16, BufferError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    /// Reads a signed 16-bit integer.
    #[inline]
    pub fn i16(&mut self) -> Result<i16, BufferError> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    /// Reads an unsigned 32-bit integer.
    #[inline]
    pub fn u32(&mut self) -> Result<u32, BufferError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    /// Reads a signed 32-bit integer.
    #[inline]
    pub fn i32(&mut self) -> Result<i32, BufferError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    /// Reads an unsigned 64-bit integer.
    #[inline]
    pub fn u64(&mut self) -> Result<u64, BufferError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    /// Reads a signed 64-bit integer.
    #[inline]
    pub fn i64(&mut self) -> Result<i64, BufferError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// Reads a 32-bit floating point number.
    #[inline]
    pub fn f32(&mut self) -> Result<f32, BufferError> {
        Ok(f32::from_be_bytes(self.array()?))
    }

    /// Reads a 64-bit floating point number.
    #[inline]
    pub fn f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_be_bytes(self.array()?))
    }

    /// Reads a UTF-8 string of the given size.
    pub fn utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        let bytes = self.buf(size)?;
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }

    /// Reads an ASCII string of the given length.
    pub fn ascii(&mut self, length: usize) -> Result<&'a str, BufferError> {
        let bytes = self.buf(length)?;
        if !bytes.is_ascii() {
            return Err(BufferError::InvalidUtf8);
        }
        // ASCII is a subset of UTF-8
        str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8)
    }
}
