//! Observation epoch assembly.
use log::{debug, error, trace, warn};

use hifitime::prelude::{Epoch, TimeScale};

use crate::{
    constants::{
        BDT_GPST_OFFSET_NANOS, MAX_BANDS, MAX_SATELLITES, SNR_UNIT_DBHZ, SPEED_OF_LIGHT_M_S,
        WEEK_NANOS,
    },
    payload::{ClockBlock, MeasurementRecord},
    signal::{
        classify_record, lock_indicator, Classification, GnssSystem, SatelliteId, SignalCode,
    },
    Error,
};

/// Observations of one signal
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BandObservation {
    pub code: SignalCode,
    /// Pseudo range (m)
    pub pseudo_range_m: f64,
    /// Carrier phase (cycles)
    pub phase_cycles: f64,
    /// Doppler shift (Hz)
    pub doppler_hz: f64,
    /// Signal strength, in 0.001 dBHz
    pub snr: u16,
    /// Lock indicator
    pub lli: u8,
}

impl BandObservation {
    /// Signal strength (dBHz)
    pub fn snr_dbhz(&self) -> f64 {
        self.snr as f64 * SNR_UNIT_DBHZ
    }
}

/// All observations of one satellite
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSlot {
    pub sat: SatelliteId,
    /// Receiver time of the first signal
    pub epoch: Epoch,
    pub bands: [Option<BandObservation>; MAX_BANDS],
}

impl SatelliteSlot {
    fn new(sat: SatelliteId, epoch: Epoch) -> Self {
        Self {
            sat,
            epoch,
            bands: [None; MAX_BANDS],
        }
    }

    /// Populated bands, with their index
    pub fn observations(&self) -> impl Iterator<Item = (usize, &BandObservation)> + '_ {
        self.bands
            .iter()
            .enumerate()
            .filter_map(|(band, obs)| obs.as_ref().map(|obs| (band, obs)))
    }
}

/// One timestamped snapshot of simultaneous satellite observations
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationEpoch {
    slots: Vec<SatelliteSlot>,
}

impl ObservationEpoch {
    /// Epoch of the first observed satellite
    pub fn epoch(&self) -> Option<Epoch> {
        self.slots.first().map(|slot| slot.epoch)
    }

    /// Number of satellites
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SatelliteSlot] {
        &self.slots
    }

    pub fn slot(&self, sat: SatelliteId) -> Option<&SatelliteSlot> {
        self.slots.iter().find(|slot| slot.sat == sat)
    }

    pub fn into_slots(self) -> Vec<SatelliteSlot> {
        self.slots
    }
}

/// Receiver time: whole nanoseconds and a fraction in [0, 1[.
#[derive(Debug, Copy, Clone, PartialEq)]
struct ReceiverTime {
    nanos: i64,
    frac: f64,
}

impl ReceiverTime {
    fn offset(&self, offset_nanos: f64) -> Option<Self> {
        let total = self.frac + offset_nanos;
        if !total.is_finite() {
            return None;
        }
        let whole = total.floor();
        Some(Self {
            nanos: self.nanos.checked_add(whole as i64)?,
            frac: total - whole,
        })
    }

    fn to_epoch(&self) -> Option<Epoch> {
        let week = u32::try_from(self.nanos.div_euclid(WEEK_NANOS)).ok()?;
        let tow_nanos = self.nanos.rem_euclid(WEEK_NANOS) as u64;
        Some(Epoch::from_time_of_week(week, tow_nanos, TimeScale::GPST))
    }
}

/// [EpochBuilder] assembles decoded measurements into [ObservationEpoch]s.
#[derive(Debug, Copy, Clone)]
pub struct EpochBuilder {
    capacity: usize,
}

impl Default for EpochBuilder {
    fn default() -> Self {
        Self::new(MAX_SATELLITES)
    }
}

impl EpochBuilder {
    /// Builds a new [EpochBuilder], holding at most `capacity` satellites per epoch.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builds one [ObservationEpoch] from one frame content.
    pub fn build(
        &self,
        clock: &ClockBlock,
        records: &[MeasurementRecord],
    ) -> Result<ObservationEpoch, Error> {
        clock.validate()?;

        // Integer and sub-nanosecond parts are kept apart,
        // a single f64 cannot hold GNSS time at 1ns resolution.
        let message_time = ReceiverTime {
            nanos: clock
                .time_nanos
                .checked_sub(clock.full_bias_nanos)
                .ok_or(Error::MalformedClock("full bias overflow"))?,
            frac: 0.0,
        }
        .offset(-clock.bias_nanos)
        .ok_or(Error::MalformedClock("bias overflow"))?;

        if message_time.nanos < 0 {
            return Err(Error::MalformedClock("negative receiver time"));
        }

        let mut slots = Vec::<SatelliteSlot>::with_capacity(self.capacity.min(32));

        for record in records {
            let classification = match classify_record(record) {
                Some(classification) => classification,
                None => continue,
            };

            let rx_time = match message_time.offset(record.time_offset_nanos) {
                Some(rx_time) => rx_time,
                None => {
                    warn!(
                        "{} - invalid time offset {}ns",
                        classification.sat, record.time_offset_nanos
                    );
                    continue;
                },
            };

            let epoch = match rx_time.to_epoch() {
                Some(epoch) => epoch,
                None => {
                    warn!("{} - invalid receiver time", classification.sat);
                    continue;
                },
            };

            let index = match slots.iter().position(|slot| slot.sat == classification.sat) {
                Some(index) => index,
                None => {
                    if slots.len() >= self.capacity {
                        error!("{} - epoch capacity exceeded", epoch);
                        return Err(Error::CapacityExceeded(self.capacity));
                    }
                    slots.push(SatelliteSlot::new(classification.sat, epoch));
                    slots.len() - 1
                },
            };

            // Dating uses the uncorrected time, ranging the corrected time
            let rx_time = Self::system_time(classification.system, rx_time);

            let observation = Self::band_observation(&classification, record, rx_time);

            trace!(
                "{}({}) - pr={:.3} cp={:.3} dop={:.3} snr={} lli={}",
                epoch,
                classification.sat,
                observation.pseudo_range_m,
                observation.phase_cycles,
                observation.doppler_hz,
                observation.snr,
                observation.lli
            );

            slots[index].bands[classification.band] = Some(observation);
        }

        let epoch = ObservationEpoch { slots };

        if let Some(t) = epoch.epoch() {
            debug!("{} - new epoch: {} satellite(s)", t, epoch.len());
        }

        Ok(epoch)
    }

    /// Applies the system specific time correction.
    fn system_time(system: GnssSystem, rx_time: ReceiverTime) -> ReceiverTime {
        match system {
            GnssSystem::BeiDou => ReceiverTime {
                nanos: rx_time.nanos - BDT_GPST_OFFSET_NANOS,
                frac: rx_time.frac,
            },
            GnssSystem::GPS
            | GnssSystem::SBAS
            | GnssSystem::Glonass
            | GnssSystem::QZSS
            | GnssSystem::Galileo => rx_time,
        }
    }

    fn band_observation(
        classification: &Classification,
        record: &MeasurementRecord,
        rx_time: ReceiverTime,
    ) -> BandObservation {
        let wavelength_m = SPEED_OF_LIGHT_M_S / classification.frequency_hz;

        let tow_nanos = rx_time.nanos.rem_euclid(WEEK_NANOS);
        let travel_nanos =
            tow_nanos.wrapping_sub(record.received_sv_time_nanos) as f64 + rx_time.frac;

        BandObservation {
            code: classification.code,
            pseudo_range_m: travel_nanos * SPEED_OF_LIGHT_M_S * 1.0E-9,
            phase_cycles: record.accumulated_delta_range_m / wavelength_m,
            doppler_hz: -record.pseudorange_rate_m_s / wavelength_m,
            snr: Self::snr(record),
            lli: lock_indicator(record.accumulated_delta_range_state),
        }
    }

    /// Signal strength in 0.001 dBHz units, saturated at 65.535 dBHz.
    fn snr(record: &MeasurementRecord) -> u16 {
        let units = (record.cn0_dbhz / SNR_UNIT_DBHZ).round();
        if units > u16::MAX as f64 {
            warn!(
                "svid={} - C/N0 {} dBHz saturated to {} dBHz",
                record.svid,
                record.cn0_dbhz,
                u16::MAX as f64 * SNR_UNIT_DBHZ
            );
            u16::MAX
        } else {
            units as u16
        }
    }
}
