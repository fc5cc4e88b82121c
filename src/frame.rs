//! Frame synchronization and encoding.
use log::{debug, trace, warn};

use crate::{constants::MAX_FRAME_LEN, Error};

/// Frame synchronization magic
pub const SYNC: [u8; 2] = [0xB5, 0x62];

/// Class byte written in front of a measurement payload
pub const CLASS_ID: u8 = 0x02;

/// Message id byte written in front of a measurement payload
pub const MESSAGE_ID: u8 = 0x15;

/// Magic, class, id and length field
pub const HEADER_LEN: usize = 6;

/// Header and checksum bytes surrounding the payload
pub const OVERHEAD_LEN: usize = HEADER_LEN + 2;

/// Running checksum over `data`, using two 8-bit accumulators.
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let (mut ck_a, mut ck_b) = (0_u8, 0_u8);
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    [ck_a, ck_b]
}

/// [RawFrame] is one validated (or freshly encoded) frame,
/// magic and checksum included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Vec<u8>,
}

impl RawFrame {
    /// Encodes a new [RawFrame] wrapping this payload.
    pub fn encode(class: u8, id: u8, payload: &[u8]) -> Result<Self, Error> {
        let length =
            u16::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge(payload.len()))?;

        let mut bytes = Vec::with_capacity(payload.len() + OVERHEAD_LEN);
        bytes.extend_from_slice(&SYNC);
        bytes.push(class);
        bytes.push(id);
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend_from_slice(payload);

        let ck = checksum(&bytes[2..]);
        bytes.extend_from_slice(&ck);

        Ok(Self { bytes })
    }

    /// Total length, in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A frame is never empty, it always carries its header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn class(&self) -> u8 {
        self.bytes[2]
    }

    pub fn id(&self) -> u8 {
        self.bytes[3]
    }

    /// Payload, past the 6 byte preamble and before the checksum
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..self.bytes.len() - 2]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Synchronization [State]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Scanning for the magic pair
    #[default]
    AwaitingSync,
    /// Magic found, length field not received yet
    ReadingHeader,
    /// Length known, buffering until complete
    ReadingPayload,
}

/// [Synchronizer] consumes one byte at a time and releases
/// checksum-validated [RawFrame]s. One instance per input stream.
#[derive(Debug)]
pub struct Synchronizer {
    state: State,
    /// Last two bytes, while scanning
    sync: [u8; 2],
    /// Pending frame
    buf: Vec<u8>,
    /// Expected frame length
    len: usize,
    /// Maximal frame length
    max_len: usize,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN)
    }
}

impl Synchronizer {
    /// Builds a new [Synchronizer] accepting frames up to `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            len: 0,
            sync: [0, 0],
            state: State::default(),
            buf: Vec::with_capacity(1024),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Number of bytes buffered for the pending frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drops the pending frame, returns to [State::AwaitingSync].
    pub fn reset(&mut self) {
        self.state = State::AwaitingSync;
        self.sync = [0, 0];
        self.buf.clear();
        self.len = 0;
    }

    /// Consumes a new byte.
    ///
    /// ## Returns
    /// - Ok(None) while a frame is pending
    /// - Ok(Some(frame)) once a valid frame was completed
    /// - Err(e) when the pending frame was rejected.
    ///   The [Synchronizer] resumes scanning on next byte.
    pub fn consume(&mut self, byte: u8) -> Result<Option<RawFrame>, Error> {
        match self.state {
            State::AwaitingSync => {
                self.sync = [self.sync[1], byte];
                if self.sync == SYNC {
                    self.buf.clear();
                    self.buf.extend_from_slice(&SYNC);
                    self.state = State::ReadingHeader;
                    trace!("frame sync");
                }
                Ok(None)
            },
            State::ReadingHeader => {
                self.buf.push(byte);

                if self.buf.len() == HEADER_LEN {
                    let length = u16::from_le_bytes([self.buf[4], self.buf[5]]) as usize;
                    let length = length + OVERHEAD_LEN;

                    if length > self.max_len {
                        warn!("frame length error: len={} max={}", length, self.max_len);
                        self.reset();
                        return Err(Error::FrameLength {
                            length,
                            max: self.max_len,
                        });
                    }

                    self.len = length;
                    self.state = State::ReadingPayload;
                }
                Ok(None)
            },
            State::ReadingPayload => {
                self.buf.push(byte);

                if self.buf.len() < self.len {
                    return Ok(None);
                }

                let bytes = std::mem::take(&mut self.buf);
                self.reset();

                let len = bytes.len();
                let expected = checksum(&bytes[2..len - 2]);
                let found = [bytes[len - 2], bytes[len - 1]];

                if expected != found {
                    warn!("frame checksum error: len={}", len);
                    return Err(Error::Checksum { expected, found });
                }

                debug!("new frame: len={}", len);
                Ok(Some(RawFrame { bytes }))
            },
        }
    }
}
