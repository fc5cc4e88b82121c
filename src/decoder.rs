//! Byte stream to [ObservationEpoch] decoder.
use std::io::{ErrorKind, Read};

use log::{debug, error, trace, warn};

use serde::Deserialize;

use crate::{
    constants::{MAX_FRAME_LEN, MAX_SATELLITES},
    epoch::{EpochBuilder, ObservationEpoch},
    frame::{RawFrame, State, Synchronizer},
    payload::decode_fields,
    Error,
};

/// Decoder [Config]uration
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximal frame length, in bytes
    pub max_frame_len: usize,
    /// Maximal number of satellites per epoch
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
            capacity: MAX_SATELLITES,
        }
    }
}

/// Decoding [Statistics]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Statistics {
    /// Validated frames
    pub frames: usize,
    /// Frames dropped on length error
    pub framing_errors: usize,
    /// Frames dropped on checksum error
    pub checksum_errors: usize,
    /// Frames with undecodable content
    pub malformed: usize,
    /// Epochs dropped on capacity error
    pub capacity_errors: usize,
    /// Produced epochs
    pub epochs: usize,
}

impl Statistics {
    /// Total number of rejected frames
    pub fn rejected(&self) -> usize {
        self.framing_errors + self.checksum_errors + self.malformed + self.capacity_errors
    }

    fn account(&mut self, error: &Error) {
        match error {
            Error::FrameLength { .. } => self.framing_errors += 1,
            Error::Checksum { .. } => self.checksum_errors += 1,
            Error::CapacityExceeded(_) => self.capacity_errors += 1,
            Error::MalformedClock(_)
            | Error::Underrun { .. }
            | Error::InvalidCount(_)
            | Error::SchemaMismatch(_) => self.malformed += 1,
            Error::Io(_) | Error::PayloadTooLarge(_) => {},
        }
    }
}

/// [Decoder] turns one byte stream into [ObservationEpoch]s.
/// Each stream requires its own [Decoder].
#[derive(Debug)]
pub struct Decoder {
    sync: Synchronizer,
    builder: EpochBuilder,
    stats: Statistics,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Decoder {
    pub fn new(cfg: Config) -> Self {
        Self {
            sync: Synchronizer::new(cfg.max_frame_len),
            builder: EpochBuilder::new(cfg.capacity),
            stats: Statistics::default(),
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Consumes one byte.
    ///
    /// ## Returns
    /// - Ok(None) until a frame completes
    /// - Ok(Some(epoch)) on each frame completion
    /// - Err(e) when the completed frame was dropped.
    ///   Decoding resumes on next byte, see [Error::is_recoverable].
    pub fn consume(&mut self, byte: u8) -> Result<Option<ObservationEpoch>, Error> {
        let frame = match self.sync.consume(byte) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.stats.account(&e);
                return Err(e);
            },
        };

        self.stats.frames += 1;

        match self.decode_frame(&frame) {
            Ok(epoch) => {
                self.stats.epochs += 1;
                Ok(Some(epoch))
            },
            Err(e) => {
                self.stats.account(&e);
                Err(e)
            },
        }
    }

    /// Decodes one validated [RawFrame].
    pub fn decode_frame(&self, frame: &RawFrame) -> Result<ObservationEpoch, Error> {
        let payload = decode_fields(frame)?;

        debug!(
            "frame content: {} measurement(s)",
            payload.measurements.len()
        );

        self.builder.build(&payload.clock, &payload.measurements)
    }

    /// Reads bytes until the next [ObservationEpoch] is produced.
    ///
    /// ## Returns
    /// - Ok(Some(epoch)) on frame completion
    /// - Ok(None) on end of stream. A partial frame is dropped.
    /// - Err(e) on I/O error or rejected frame. Rejected frames
    ///   are [Error::is_recoverable] and reading may continue.
    ///   So may read timeouts, see [Error::is_idle]: the partial frame is kept.
    pub fn decode_file<R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<ObservationEpoch>, Error> {
        let mut byte = [0_u8; 1];

        loop {
            match reader.read(&mut byte) {
                Ok(0) => {
                    if self.sync.state() != State::AwaitingSync {
                        warn!(
                            "end of stream: dropping partial frame ({} bytes)",
                            self.sync.pending()
                        );
                    }
                    self.sync.reset();
                    return Ok(None);
                },
                Ok(_) => {
                    if let Some(epoch) = self.consume(byte[0])? {
                        return Ok(Some(epoch));
                    }
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    // pending bytes are preserved
                    trace!("idle source: {}", e);
                    return Err(Error::Io(e));
                },
                Err(e) => {
                    error!("i/o error: {}", e);
                    return Err(Error::Io(e));
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        constants::FREQ_L1_HZ,
        payload::{ClockBlock, MeasurementRecord, Payload},
    };
    use std::io::Cursor;

    fn payload(svids: &[i32]) -> Payload {
        let t = 2300 * crate::constants::WEEK_NANOS;
        Payload {
            clock: ClockBlock {
                time_nanos: 0,
                full_bias_nanos: -t,
                ..Default::default()
            },
            measurements: svids
                .iter()
                .map(|svid| MeasurementRecord {
                    constellation_type: 1,
                    svid: *svid,
                    carrier_frequency_hz: FREQ_L1_HZ as f32,
                    cn0_dbhz: 35.0,
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn config_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.max_frame_len, 16384);
        assert_eq!(cfg.capacity, 100);

        let cfg: Config = serde_json::from_str(r#"{"capacity": 12}"#).unwrap();
        assert_eq!(cfg.capacity, 12);
        assert_eq!(cfg.max_frame_len, 16384);
    }

    #[test]
    fn consume_counts() {
        let mut decoder = Decoder::default();

        let frame = payload(&[1, 2, 3]).to_frame().unwrap();
        let mut epochs = Vec::new();

        for _ in 0..2 {
            for byte in frame.as_bytes() {
                if let Some(epoch) = decoder.consume(*byte).unwrap() {
                    epochs.push(epoch);
                }
            }
        }

        assert_eq!(epochs.len(), 2);
        assert_eq!(epochs[0].len(), 3);

        let stats = decoder.statistics();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.epochs, 2);
        assert_eq!(stats.rejected(), 0);
    }

    #[test]
    fn capacity_is_accounted() {
        let mut decoder = Decoder::new(Config {
            capacity: 2,
            ..Default::default()
        });

        let mut stream = payload(&[1, 2, 3]).to_frame().unwrap().into_bytes();
        stream.extend_from_slice(payload(&[4, 5]).to_frame().unwrap().as_bytes());

        let mut reader = Cursor::new(stream);

        assert!(matches!(
            decoder.decode_file(&mut reader),
            Err(Error::CapacityExceeded(2))
        ));

        let epoch = decoder.decode_file(&mut reader).unwrap().unwrap();
        assert_eq!(epoch.len(), 2);

        assert!(decoder.decode_file(&mut reader).unwrap().is_none());

        let stats = decoder.statistics();
        assert_eq!(stats.capacity_errors, 1);
        assert_eq!(stats.epochs, 1);
    }

    /// Serves each chunk in turn, or an error in between
    struct Chunks(Vec<Option<Vec<u8>>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            match self.0.remove(0) {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                },
                None => Err(std::io::Error::new(ErrorKind::TimedOut, "no data")),
            }
        }
    }

    #[test]
    fn read_timeout_keeps_partial_frame() {
        let frame = payload(&[1, 2]).to_frame().unwrap().into_bytes();

        let mut chunks = frame.iter().map(|b| Some(vec![*b])).collect::<Vec<_>>();
        chunks.insert(10, None);
        chunks.insert(3, None);

        let mut reader = Chunks(chunks);
        let mut decoder = Decoder::default();

        for _ in 0..2 {
            let e = decoder.decode_file(&mut reader).unwrap_err();
            assert!(e.is_idle());
            assert!(!e.is_recoverable());
        }

        let epoch = decoder.decode_file(&mut reader).unwrap().unwrap();
        assert_eq!(epoch.len(), 2);
        assert!(decoder.decode_file(&mut reader).unwrap().is_none());
        assert_eq!(decoder.statistics().rejected(), 0);
    }

    #[test]
    fn truncated_stream() {
        let frame = payload(&[1]).to_frame().unwrap();
        let bytes = frame.as_bytes();

        let mut reader = Cursor::new(bytes[..bytes.len() - 3].to_vec());
        let mut decoder = Decoder::default();

        assert!(decoder.decode_file(&mut reader).unwrap().is_none());
        assert_eq!(decoder.statistics().frames, 0);

        // partial frame does not leak into next stream
        let mut reader = Cursor::new(bytes.to_vec());
        assert!(decoder.decode_file(&mut reader).unwrap().is_some());
    }
}
