mod stream;

use log::LevelFilter;
use std::sync::Once;

use crate::{
    constants::{FREQ_B1I_HZ, FREQ_L1_HZ, FREQ_L5_HZ, WEEK_NANOS},
    payload::{ClockBlock, MeasurementRecord, Payload},
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Test week
pub const WEEK: u32 = 2300;

/// Builds [Payload]s as a receiver would report them
pub struct PayloadBuilder {
    tow_nanos: i64,
    measurements: Vec<MeasurementRecord>,
}

impl PayloadBuilder {
    /// New [PayloadBuilder] dated `tow_nanos` into the test week.
    pub fn new(tow_nanos: i64) -> Self {
        Self {
            tow_nanos,
            measurements: Vec::new(),
        }
    }

    fn signal(mut self, constellation_type: i32, svid: i32, frequency_hz: f64) -> Self {
        self.measurements.push(MeasurementRecord {
            constellation_type,
            svid,
            carrier_frequency_hz: frequency_hz as f32,
            cn0_dbhz: 38.5,
            accumulated_delta_range_m: 12.5,
            accumulated_delta_range_state: 1,
            pseudorange_rate_m_s: 250.0,
            received_sv_time_nanos: self.tow_nanos - 72_000_000,
            ..Default::default()
        });
        self
    }

    pub fn gps_l1(self, svid: i32) -> Self {
        self.signal(1, svid, FREQ_L1_HZ)
    }

    pub fn gps_l5(self, svid: i32) -> Self {
        self.signal(1, svid, FREQ_L5_HZ)
    }

    pub fn galileo_e1(self, svid: i32) -> Self {
        self.signal(6, svid, FREQ_L1_HZ)
    }

    pub fn beidou_b1i(self, svid: i32) -> Self {
        self.signal(5, svid, FREQ_B1I_HZ)
    }

    pub fn glonass(self, svid: i32) -> Self {
        self.signal(3, svid, 1602.0E6)
    }

    pub fn build(self) -> Payload {
        let t = WEEK as i64 * WEEK_NANOS + self.tow_nanos;
        Payload {
            clock: ClockBlock {
                time_nanos: 7_000_000_000,
                full_bias_nanos: 7_000_000_000 - t,
                has_bias_nanos: true,
                has_full_bias_nanos: true,
                ..Default::default()
            },
            measurements: self.measurements,
        }
    }

    /// Complete encoded frame
    pub fn frame_bytes(self) -> Vec<u8> {
        self.build()
            .to_frame()
            .unwrap_or_else(|e| panic!("failed to encode test frame: {}", e))
            .into_bytes()
    }
}
