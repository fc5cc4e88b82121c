use std::io::ErrorKind;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame length {length} exceeds {max} bytes")]
    FrameLength { length: usize, max: usize },

    #[error("checksum error: expected {expected:02x?}, got {found:02x?}")]
    Checksum { expected: [u8; 2], found: [u8; 2] },

    #[error("malformed clock block: {0}")]
    MalformedClock(&'static str),

    #[error("buffer underrun: {needed} byte(s) needed at offset {offset}, {available} available")]
    Underrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid measurement count {0}")]
    InvalidCount(i32),

    #[error("field \"{0}\" does not match its schema")]
    SchemaMismatch(&'static str),

    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("epoch capacity of {0} satellites exceeded")]
    CapacityExceeded(usize),
}

impl Error {
    /// Returns true when decoding may resume on the next frame.
    /// Only I/O errors on the byte source are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }

    /// Returns true when the byte source had nothing to deliver
    /// within its read timeout. Reading may continue.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Io(e) => matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock),
            _ => false,
        }
    }
}
