//! Auto-growing binary buffer writer.

/// A binary buffer writer that appends big-endian values.
///
/// # Example
///
/// ```
/// use modelplan_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u32(1);
/// writer.u8(0xff);
/// assert_eq!(writer.flush(), vec![0, 0, 0, 1, 0xff]);
/// assert!(writer.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    uint8: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Returns the written bytes and resets the writer.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.uint8)
    }

    /// Borrows the written bytes without resetting.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i16(&mut self, val: i16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Appends raw bytes.
    pub fn buf(&mut self, bytes: &[u8]) {
        self.uint8.extend_from_slice(bytes);
    }

    /// Appends the bytes of an ASCII string.
    pub fn ascii(&mut self, s: &str) {
        self.uint8.extend_from_slice(s.as_bytes());
    }
}
