//! Constellation, satellite and signal classification.
use bitflags::bitflags;
use log::trace;

use gnss::prelude::{Constellation, SV};

use crate::{
    constants::{FREQ_B1I_HZ, FREQ_L1_HZ, FREQ_L5_HZ, FREQ_TOLERANCE_HZ},
    payload::MeasurementRecord,
};

/// Supported [GnssSystem]s, indexed by their raw constellation type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GnssSystem {
    GPS,
    SBAS,
    Glonass,
    QZSS,
    BeiDou,
    Galileo,
}

impl TryFrom<i32> for GnssSystem {
    type Error = i32;

    fn try_from(constellation_type: i32) -> Result<Self, Self::Error> {
        match constellation_type {
            1 => Ok(Self::GPS),
            2 => Ok(Self::SBAS),
            3 => Ok(Self::Glonass),
            4 => Ok(Self::QZSS),
            5 => Ok(Self::BeiDou),
            6 => Ok(Self::Galileo),
            unknown => Err(unknown),
        }
    }
}

impl From<GnssSystem> for Constellation {
    fn from(system: GnssSystem) -> Self {
        match system {
            GnssSystem::GPS => Constellation::GPS,
            GnssSystem::SBAS => Constellation::SBAS,
            GnssSystem::Glonass => Constellation::Glonass,
            GnssSystem::QZSS => Constellation::QZSS,
            GnssSystem::BeiDou => Constellation::BeiDou,
            GnssSystem::Galileo => Constellation::Galileo,
        }
    }
}

impl GnssSystem {
    /// All systems, in satellite numbering order
    pub const ALL: [Self; 6] = [
        Self::GPS,
        Self::Glonass,
        Self::Galileo,
        Self::QZSS,
        Self::BeiDou,
        Self::SBAS,
    ];

    /// Valid PRN range
    const fn prn_range(&self) -> (u16, u16) {
        match self {
            Self::GPS => (1, 32),
            Self::Glonass => (1, 27),
            Self::Galileo => (1, 36),
            Self::QZSS => (193, 202),
            Self::BeiDou => (1, 63),
            Self::SBAS => (120, 158),
        }
    }

    /// Satellite numbering offset
    const fn sat_offset(&self) -> u16 {
        match self {
            Self::GPS => 0,
            Self::Glonass => 32,
            Self::Galileo => 59,
            Self::QZSS => 95,
            Self::BeiDou => 105,
            Self::SBAS => 168,
        }
    }

    /// PRN offset between the raw svid and its RINEX designation
    const fn rinex_prn_offset(&self) -> u16 {
        match self {
            Self::QZSS => 192,
            Self::SBAS => 100,
            _ => 0,
        }
    }

    /// Supported signals, in matching priority order
    pub fn bands(&self) -> &'static [BandDefinition] {
        match self {
            Self::GPS | Self::SBAS | Self::QZSS => GPS_BANDS,
            Self::Galileo => GALILEO_BANDS,
            Self::BeiDou => BEIDOU_BANDS,
            Self::Glonass => &[],
        }
    }
}

/// Sequential satellite number, unique across all systems.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatelliteId(u16);

impl std::fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_sv() {
            Some(sv) => write!(f, "{}", sv),
            None => write!(f, "#{}", self.0),
        }
    }
}

impl SatelliteId {
    /// Last valid satellite number
    pub const MAX: u16 = 207;

    /// Numbers a satellite, returns None if svid is not a valid PRN of this system.
    pub fn new(system: GnssSystem, svid: i32) -> Option<Self> {
        let (min, max) = system.prn_range();
        let prn = u16::try_from(svid).ok()?;

        if prn < min || prn > max {
            return None;
        }

        Some(Self(system.sat_offset() + prn - min + 1))
    }

    /// Sequential number
    pub fn number(&self) -> u16 {
        self.0
    }

    /// Returns (system, raw svid)
    pub fn decompose(&self) -> Option<(GnssSystem, u16)> {
        GnssSystem::ALL.iter().find_map(|system| {
            let (min, max) = system.prn_range();
            let offset = system.sat_offset();
            if self.0 > offset && self.0 <= offset + max - min + 1 {
                Some((*system, self.0 - offset - 1 + min))
            } else {
                None
            }
        })
    }

    pub fn system(&self) -> Option<GnssSystem> {
        self.decompose().map(|(system, _)| system)
    }

    /// Converts to [SV] with RINEX PRN numbering.
    pub fn to_sv(&self) -> Option<SV> {
        let (system, svid) = self.decompose()?;
        let prn = svid - system.rinex_prn_offset();
        let prn = u8::try_from(prn).ok()?;
        Some(SV::new(system.into(), prn))
    }
}

/// Signal codes, named after their RINEX attribute
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalCode {
    /// L1 C/A, E1 C
    L1C,
    /// BeiDou B1I
    L2I,
    /// L5 Q
    L5Q,
    /// L5 / E5a / B2a I+Q
    L5X,
}

impl std::fmt::Display for SignalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.rinex_code())
    }
}

impl SignalCode {
    /// Frequency number and attribute, as used in RINEX V3 observables
    pub fn rinex_code(&self) -> &'static str {
        match self {
            Self::L1C => "1C",
            Self::L2I => "2I",
            Self::L5Q => "5Q",
            Self::L5X => "5X",
        }
    }

    /// Frequency number, as used in RINEX V2 observables
    pub fn rinex_v2_code(&self) -> &'static str {
        &self.rinex_code()[..1]
    }
}

/// One supported signal
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BandDefinition {
    pub frequency_hz: f64,
    pub code: SignalCode,
    /// Band slot index
    pub band: usize,
}

const GPS_BANDS: &[BandDefinition] = &[
    BandDefinition {
        frequency_hz: FREQ_L1_HZ,
        code: SignalCode::L1C,
        band: 0,
    },
    BandDefinition {
        frequency_hz: FREQ_L5_HZ,
        code: SignalCode::L5Q,
        band: 2,
    },
];

const GALILEO_BANDS: &[BandDefinition] = &[
    BandDefinition {
        frequency_hz: FREQ_L1_HZ,
        code: SignalCode::L1C,
        band: 0,
    },
    BandDefinition {
        frequency_hz: FREQ_L5_HZ,
        code: SignalCode::L5X,
        band: 2,
    },
];

const BEIDOU_BANDS: &[BandDefinition] = &[
    BandDefinition {
        frequency_hz: FREQ_B1I_HZ,
        code: SignalCode::L2I,
        band: 0,
    },
    BandDefinition {
        frequency_hz: FREQ_L5_HZ,
        code: SignalCode::L5X,
        band: 1,
    },
];

/// Classification result
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Classification {
    pub system: GnssSystem,
    pub sat: SatelliteId,
    pub code: SignalCode,
    pub band: usize,
    /// Reference carrier frequency (Hz)
    pub frequency_hz: f64,
}

/// Classifies one signal. Returns None for unknown constellation types,
/// invalid svids and unrecognized carrier frequencies.
pub fn classify(
    constellation_type: i32,
    svid: i32,
    carrier_frequency_hz: f32,
) -> Option<Classification> {
    let system = GnssSystem::try_from(constellation_type).ok()?;
    let sat = SatelliteId::new(system, svid)?;

    let carrier_frequency_hz = carrier_frequency_hz as f64;

    let definition = system
        .bands()
        .iter()
        .find(|def| (carrier_frequency_hz - def.frequency_hz).abs() < FREQ_TOLERANCE_HZ)?;

    Some(Classification {
        system,
        sat,
        code: definition.code,
        band: definition.band,
        frequency_hz: definition.frequency_hz,
    })
}

/// Classifies a [MeasurementRecord], applying the skip rules.
pub fn classify_record(record: &MeasurementRecord) -> Option<Classification> {
    if record.cn0_dbhz <= 0.0 || record.cn0_dbhz.is_nan() {
        trace!(
            "type={} svid={} - dropped: cn0={}",
            record.constellation_type,
            record.svid,
            record.cn0_dbhz
        );
        return None;
    }

    let classification = classify(
        record.constellation_type,
        record.svid,
        record.carrier_frequency_hz,
    );

    if classification.is_none() {
        trace!(
            "type={} svid={} - dropped: unclassified signal at {}Hz",
            record.constellation_type,
            record.svid,
            record.carrier_frequency_hz
        );
    }

    classification
}

bitflags! {
    /// Accumulated delta range state
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AdrState: i32 {
        const VALID = 0x01;
        const RESET = 0x02;
        const CYCLE_SLIP = 0x04;
        const HALF_CYCLE_RESOLVED = 0x08;
        const HALF_CYCLE_REPORTED = 0x10;
    }
}

/// Lock indicator: phase tracked without slip
pub const LLI_LOCKED: u8 = 0;

/// Lock indicator: slip or unknown tracking state
pub const LLI_SLIP: u8 = 1;

/// Converts the accumulated delta range state to a lock indicator.
/// Locked only for non empty combinations of valid and half cycle flags.
pub fn lock_indicator(adr_state: i32) -> u8 {
    let locked = AdrState::VALID | AdrState::HALF_CYCLE_RESOLVED | AdrState::HALF_CYCLE_REPORTED;
    let state = AdrState::from_bits_retain(adr_state);

    if !state.is_empty() && locked.contains(state) {
        LLI_LOCKED
    } else {
        LLI_SLIP
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 6, 1575.42E6, 6, SignalCode::L1C, 0)]
    #[case(1, 32, 1575.45E6, 32, SignalCode::L1C, 0)]
    #[case(1, 1, 1176.45E6, 1, SignalCode::L5Q, 2)]
    #[case(2, 120, 1575.42E6, 169, SignalCode::L1C, 0)]
    #[case(2, 158, 1176.45E6, 207, SignalCode::L5Q, 2)]
    #[case(4, 193, 1575.42E6, 96, SignalCode::L1C, 0)]
    #[case(4, 195, 1176.45E6, 98, SignalCode::L5Q, 2)]
    #[case(5, 7, 1561.098E6, 112, SignalCode::L2I, 0)]
    #[case(5, 30, 1176.45E6, 135, SignalCode::L5X, 1)]
    #[case(6, 11, 1575.42E6, 70, SignalCode::L1C, 0)]
    #[case(6, 36, 1176.45E6, 95, SignalCode::L5X, 2)]
    fn classified(
        #[case] constellation_type: i32,
        #[case] svid: i32,
        #[case] frequency_hz: f32,
        #[case] sat: u16,
        #[case] code: SignalCode,
        #[case] band: usize,
    ) {
        let classification = classify(constellation_type, svid, frequency_hz).unwrap();
        assert_eq!(classification.sat.number(), sat);
        assert_eq!(classification.code, code);
        assert_eq!(classification.band, band);
    }

    #[rstest]
    #[case(0, 6, 1575.42E6)]
    #[case(7, 6, 1575.42E6)]
    #[case(-1, 6, 1575.42E6)]
    #[case(3, 5, 1602.0E6)]
    #[case(3, 5, 1575.42E6)]
    #[case(5, 7, 1575.42E6)]
    #[case(1, 6, 1227.60E6)]
    #[case(1, 6, 1575.60E6)]
    #[case(1, 0, 1575.42E6)]
    #[case(1, 33, 1575.42E6)]
    #[case(4, 1, 1575.42E6)]
    #[case(2, 100, 1575.42E6)]
    fn unclassified(#[case] constellation_type: i32, #[case] svid: i32, #[case] frequency_hz: f32) {
        assert_eq!(classify(constellation_type, svid, frequency_hz), None);
    }

    #[test]
    fn gps_l1_scenario() {
        let classification = classify(1, 6, 1575.42E6).unwrap();
        assert_eq!(classification.system, GnssSystem::GPS);
        assert_eq!(classification.sat.number(), 6);
        assert_eq!(classification.band, 0);
        assert_eq!(classification.code, SignalCode::L1C);
        assert_eq!(classification.frequency_hz, FREQ_L1_HZ);
    }

    #[test]
    fn frequency_tolerance() {
        assert!(classify(1, 6, 1575.50E6).is_some());
        assert!(classify(1, 6, 1575.34E6).is_some());
        assert!(classify(1, 6, 1575.53E6).is_none());
        assert!(classify(1, 6, 1575.31E6).is_none());
    }

    #[rstest]
    #[case(1, 1, "G01")]
    #[case(1, 32, "G32")]
    #[case(3, 24, "R24")]
    #[case(6, 36, "E36")]
    #[case(4, 193, "J01")]
    #[case(5, 63, "C63")]
    #[case(2, 123, "S23")]
    fn satellite_numbering(#[case] constellation_type: i32, #[case] svid: i32, #[case] sv: &str) {
        let system = GnssSystem::try_from(constellation_type).unwrap();
        let sat = SatelliteId::new(system, svid).unwrap();

        assert!(sat.number() >= 1 && sat.number() <= SatelliteId::MAX);
        assert_eq!(sat.decompose(), Some((system, svid as u16)));
        assert_eq!(sat.system(), Some(system));
        assert_eq!(sat.to_string(), sv);
    }

    #[test]
    fn satellite_numbers_are_unique() {
        let mut numbers = Vec::new();

        for system in GnssSystem::ALL {
            let (min, max) = system.prn_range();
            for prn in min..=max {
                numbers.push(SatelliteId::new(system, prn as i32).unwrap().number());
            }
        }

        let total = numbers.len();
        numbers.sort();
        numbers.dedup();

        assert_eq!(numbers.len(), total);
        assert_eq!(total, SatelliteId::MAX as usize);
        assert_eq!(numbers.first(), Some(&1));
        assert_eq!(numbers.last(), Some(&SatelliteId::MAX));
    }

    #[test]
    fn skip_rules() {
        let mut record = MeasurementRecord {
            constellation_type: 1,
            svid: 6,
            carrier_frequency_hz: 1575.42E6,
            cn0_dbhz: 35.0,
            ..Default::default()
        };

        assert!(classify_record(&record).is_some());

        for cn0 in [0.0, -1.0, f64::NAN] {
            record.cn0_dbhz = cn0;
            assert!(classify_record(&record).is_none());
        }
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(3, 1)]
    #[case(4, 1)]
    #[case(5, 1)]
    #[case(8, 0)]
    #[case(9, 0)]
    #[case(16, 0)]
    #[case(17, 0)]
    #[case(24, 0)]
    #[case(25, 0)]
    #[case(26, 1)]
    #[case(29, 1)]
    #[case(32, 1)]
    #[case(33, 1)]
    #[case(-1, 1)]
    fn lock_indicators(#[case] adr_state: i32, #[case] lli: u8) {
        assert_eq!(lock_indicator(adr_state), lli);
    }
}
