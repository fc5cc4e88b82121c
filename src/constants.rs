/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// GPS L1, Galileo E1, QZSS L1, SBAS L1 carrier frequency (Hz)
pub const FREQ_L1_HZ: f64 = 1.57542E9;

/// GPS L5, Galileo E5a, QZSS L5, SBAS L5, BeiDou B2a carrier frequency (Hz)
pub const FREQ_L5_HZ: f64 = 1.17645E9;

/// BeiDou B1I carrier frequency (Hz)
pub const FREQ_B1I_HZ: f64 = 1.561098E9;

/// Absolute tolerance when matching a reported carrier frequency (Hz)
pub const FREQ_TOLERANCE_HZ: f64 = 1.0E5;

/// Signal strength resolution (dBHz)
pub const SNR_UNIT_DBHZ: f64 = 0.001;

/// One week, in nanoseconds
pub const WEEK_NANOS: i64 = 7 * 86_400 * 1_000_000_000;

/// BeiDou time lags GPS time by 14s
pub const BDT_GPST_OFFSET_NANOS: i64 = 14_000_000_000;

/// Primary frequency bands per satellite
pub const NFREQ: usize = 3;

/// Extra frequency bands per satellite
pub const NEXOBS: usize = 2;

/// Total number of band slots per satellite
pub const MAX_BANDS: usize = NFREQ + NEXOBS;

/// Default number of satellite slots per epoch
pub const MAX_SATELLITES: usize = 100;

/// Default maximal frame length, in bytes
pub const MAX_FRAME_LEN: usize = 16_384;
