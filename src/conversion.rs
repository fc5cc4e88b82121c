//! Bulk conversion of one byte source.
use std::{
    io::{BufReader, Read},
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{debug, error, info, warn};

use hifitime::prelude::{Duration, Epoch};

use crate::{
    decoder::{Config, Decoder, Statistics},
    epoch::ObservationEpoch,
    Error,
};

/// Conversion [Settings]
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Settings {
    pub decoder: Config,
    /// Epochs prior this instant are screened out
    pub start: Option<Epoch>,
    /// Epochs past this instant are screened out
    pub end: Option<Epoch>,
    /// Decimation interval
    pub interval: Option<Duration>,
}

/// Decimation tolerance
const INTERVAL_TOLERANCE: Duration = Duration::from_parts(0, 5_000_000);

impl Settings {
    /// Returns true if this epoch should be delivered.
    pub fn accepts(&self, t: Epoch) -> bool {
        if let Some(start) = self.start {
            if t < start {
                return false;
            }
        }

        if let Some(end) = self.end {
            if t > end {
                return false;
            }
        }

        if let Some(interval) = self.interval {
            let interval_nanos = interval.total_nanoseconds();
            if interval_nanos <= 0 {
                return true;
            }

            let (_, tow_nanos) = t.to_time_of_week();
            let rem = tow_nanos as i128 % interval_nanos;
            let tolerance = INTERVAL_TOLERANCE.total_nanoseconds();

            return rem <= tolerance || interval_nanos - rem <= tolerance;
        }

        true
    }
}

/// Conversion [Report]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Report {
    /// Decoder statistics
    pub statistics: Statistics,
    /// Epochs handed over
    pub delivered: usize,
    /// Epochs screened out (empty or out of window)
    pub screened: usize,
    /// True when interrupted by the abort flag
    pub aborted: bool,
}

/// [Conversion] decodes a complete byte source and hands
/// each accepted [ObservationEpoch] to a sink.
#[derive(Debug, Default)]
pub struct Conversion {
    settings: Settings,
    abort: Arc<AtomicBool>,
}

impl Conversion {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns a handle to abort this [Conversion] from any thread.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// Runs the conversion on the calling thread, until end of stream,
    /// abortion or until `sink` returns [ControlFlow::Break].
    ///
    /// The abort flag is checked in between frames and on every read timeout:
    /// live sources should be given a read timeout.
    pub fn run<R, F>(&self, reader: R, mut sink: F) -> Result<Report, Error>
    where
        R: Read,
        F: FnMut(ObservationEpoch) -> ControlFlow<()>,
    {
        let mut reader = BufReader::new(reader);
        let mut decoder = Decoder::new(self.settings.decoder);
        let mut report = Report::default();

        loop {
            if self.abort.load(Ordering::Relaxed) {
                warn!("conversion aborted");
                report.aborted = true;
                break;
            }

            let epoch = match decoder.decode_file(&mut reader) {
                Ok(Some(epoch)) => epoch,
                Ok(None) => {
                    debug!("end of stream");
                    break;
                },
                Err(e) if e.is_idle() => continue,
                Err(e) => {
                    if e.is_recoverable() {
                        warn!("frame dropped: {}", e);
                        continue;
                    }
                    error!("conversion error: {}", e);
                    return Err(e);
                },
            };

            let t = match epoch.epoch() {
                Some(t) => t,
                None => {
                    debug!("empty epoch");
                    report.screened += 1;
                    continue;
                },
            };

            if !self.settings.accepts(t) {
                debug!("{} - screened out", t);
                report.screened += 1;
                continue;
            }

            report.delivered += 1;

            if sink(epoch).is_break() {
                debug!("{} - conversion stopped", t);
                break;
            }
        }

        report.statistics = decoder.statistics();

        info!(
            "conversion: {} frame(s), {} rejected, {} epoch(s) delivered, {} screened",
            report.statistics.frames,
            report.statistics.rejected(),
            report.delivered,
            report.screened
        );

        Ok(report)
    }
}
