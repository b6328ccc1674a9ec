//! Big-endian binary buffers for the model codecs.
//!
//! - [`Reader`] - reads from a byte slice with cursor tracking; every read is
//!   bounds-checked and reports [`BufferError`] instead of panicking
//! - [`Writer`] - appends to an auto-growing buffer
//!
//! # Example
//!
//! ```
//! use modelplan_buffers::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.u8(0x01);
//! writer.u16(0x0203);
//! writer.ascii("hello");
//! let data = writer.flush();
//!
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.u8().unwrap(), 0x01);
//! assert_eq!(reader.u16().unwrap(), 0x0203);
//! assert_eq!(reader.ascii(5).unwrap(), "hello");
//! ```

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    #[error("end of buffer: needed {needed} bytes, {remaining} remaining")]
    EndOfBuffer { needed: usize, remaining: usize },
    /// Invalid UTF-8 sequence.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
}
