//! Frame payload: one [ClockBlock] followed by a count-prefixed
//! list of [MeasurementRecord]s.
use log::trace;

use crate::{
    frame::{RawFrame, CLASS_ID, MESSAGE_ID},
    schema::{schema_width, Cursor, Field, FieldKind, Fields, Value, Writer},
    Error,
};

/// [ClockBlock] wire layout
pub const CLOCK_SCHEMA: &[Field] = &[
    Field::new("biasNanos", FieldKind::F64),
    Field::new("biasUncertaintyNanos", FieldKind::F64),
    Field::new("fullBiasNanos", FieldKind::I64),
    Field::new("timeNanos", FieldKind::I64),
    Field::new("timeUncertaintyNanos", FieldKind::F64),
    Field::new("hasBiasNanos", FieldKind::I32),
    Field::new("hasFullBiasNanos", FieldKind::I32),
];

/// [MeasurementRecord] wire layout
pub const MEASUREMENT_SCHEMA: &[Field] = &[
    Field::new("accumulatedDeltaRangeMeters", FieldKind::F64),
    Field::new("accumulatedDeltaRangeState", FieldKind::I32),
    Field::new("carrierCycles", FieldKind::I64),
    Field::new("carrierFrequencyHz", FieldKind::F32),
    Field::new("cn0DbHz", FieldKind::F64),
    Field::new("constellationType", FieldKind::I32),
    Field::new("pseudorangeRateMetersPerSecond", FieldKind::F64),
    Field::new("pseudorangeRateUncertaintyMetersPerSecond", FieldKind::F64),
    Field::new("receivedSvTimeNanos", FieldKind::I64),
    Field::new("receivedSvTimeUncertaintyNanos", FieldKind::I64),
    Field::new("state", FieldKind::I32),
    Field::new("svid", FieldKind::I32),
    Field::new("timeOffsetNanos", FieldKind::F64),
];

/// Size of a [ClockBlock] on the wire
pub const CLOCK_BLOCK_SIZE: usize = schema_width(CLOCK_SCHEMA);

/// Size of a [MeasurementRecord] on the wire
pub const MEASUREMENT_RECORD_SIZE: usize = schema_width(MEASUREMENT_SCHEMA);

/// Receiver clock state, for one frame
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ClockBlock {
    /// Sub-nanosecond bias (ns)
    pub bias_nanos: f64,
    pub bias_uncertainty_nanos: f64,
    /// Difference between hardware clock and true GNSS time (ns)
    pub full_bias_nanos: i64,
    /// Hardware clock (ns)
    pub time_nanos: i64,
    pub time_uncertainty_nanos: f64,
    pub has_bias_nanos: bool,
    pub has_full_bias_nanos: bool,
}

impl ClockBlock {
    fn from_fields(fields: &Fields) -> Result<Self, Error> {
        Ok(Self {
            bias_nanos: fields.f64("biasNanos")?,
            bias_uncertainty_nanos: fields.f64("biasUncertaintyNanos")?,
            full_bias_nanos: fields.i64("fullBiasNanos")?,
            time_nanos: fields.i64("timeNanos")?,
            time_uncertainty_nanos: fields.f64("timeUncertaintyNanos")?,
            has_bias_nanos: fields.i32("hasBiasNanos")? != 0,
            has_full_bias_nanos: fields.i32("hasFullBiasNanos")? != 0,
        })
    }

    fn to_values(&self) -> [Value; 7] {
        [
            Value::F64(self.bias_nanos),
            Value::F64(self.bias_uncertainty_nanos),
            Value::I64(self.full_bias_nanos),
            Value::I64(self.time_nanos),
            Value::F64(self.time_uncertainty_nanos),
            Value::I32(self.has_bias_nanos as i32),
            Value::I32(self.has_full_bias_nanos as i32),
        ]
    }

    /// Fails with [Error::MalformedClock] when this clock cannot
    /// be used to date measurements.
    pub fn validate(&self) -> Result<(), Error> {
        if self.bias_nanos.is_nan() {
            return Err(Error::MalformedClock("bias is not a number"));
        }
        Ok(())
    }
}

/// One satellite signal measurement
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct MeasurementRecord {
    /// Accumulated delta range (m)
    pub accumulated_delta_range_m: f64,
    /// Accumulated delta range state bitmask
    pub accumulated_delta_range_state: i32,
    pub carrier_cycles: i64,
    pub carrier_frequency_hz: f32,
    pub cn0_dbhz: f64,
    /// Raw constellation type
    pub constellation_type: i32,
    pub pseudorange_rate_m_s: f64,
    pub pseudorange_rate_uncertainty_m_s: f64,
    pub received_sv_time_nanos: i64,
    pub received_sv_time_uncertainty_nanos: i64,
    pub state: i32,
    pub svid: i32,
    /// Offset to the clock time base (ns)
    pub time_offset_nanos: f64,
}

impl MeasurementRecord {
    fn from_fields(fields: &Fields) -> Result<Self, Error> {
        Ok(Self {
            accumulated_delta_range_m: fields.f64("accumulatedDeltaRangeMeters")?,
            accumulated_delta_range_state: fields.i32("accumulatedDeltaRangeState")?,
            carrier_cycles: fields.i64("carrierCycles")?,
            carrier_frequency_hz: fields.f32("carrierFrequencyHz")?,
            cn0_dbhz: fields.f64("cn0DbHz")?,
            constellation_type: fields.i32("constellationType")?,
            pseudorange_rate_m_s: fields.f64("pseudorangeRateMetersPerSecond")?,
            pseudorange_rate_uncertainty_m_s: fields
                .f64("pseudorangeRateUncertaintyMetersPerSecond")?,
            received_sv_time_nanos: fields.i64("receivedSvTimeNanos")?,
            received_sv_time_uncertainty_nanos: fields.i64("receivedSvTimeUncertaintyNanos")?,
            state: fields.i32("state")?,
            svid: fields.i32("svid")?,
            time_offset_nanos: fields.f64("timeOffsetNanos")?,
        })
    }

    fn to_values(&self) -> [Value; 13] {
        [
            Value::F64(self.accumulated_delta_range_m),
            Value::I32(self.accumulated_delta_range_state),
            Value::I64(self.carrier_cycles),
            Value::F32(self.carrier_frequency_hz),
            Value::F64(self.cn0_dbhz),
            Value::I32(self.constellation_type),
            Value::F64(self.pseudorange_rate_m_s),
            Value::F64(self.pseudorange_rate_uncertainty_m_s),
            Value::I64(self.received_sv_time_nanos),
            Value::I64(self.received_sv_time_uncertainty_nanos),
            Value::I32(self.state),
            Value::I32(self.svid),
            Value::F64(self.time_offset_nanos),
        ]
    }
}

/// Decoded frame content
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Payload {
    pub clock: ClockBlock,
    pub measurements: Vec<MeasurementRecord>,
}

impl Payload {
    /// Decodes a [Payload] from raw payload bytes
    /// (past the frame preamble, checksum excluded).
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);

        let clock = ClockBlock::from_fields(&cursor.read_fields(CLOCK_SCHEMA)?)?;
        clock.validate()?;

        let count = match cursor.read(FieldKind::I32)? {
            Value::I32(count) => count,
            _ => return Err(Error::SchemaMismatch("count")),
        };

        let n = usize::try_from(count).map_err(|_| Error::InvalidCount(count))?;

        let needed = n
            .checked_mul(MEASUREMENT_RECORD_SIZE)
            .ok_or(Error::InvalidCount(count))?;

        cursor.ensure(needed)?;

        let measurements = (0..n)
            .map(|_| MeasurementRecord::from_fields(&cursor.read_fields(MEASUREMENT_SCHEMA)?))
            .collect::<Result<Vec<_>, _>>()?;

        if cursor.remaining() > 0 {
            trace!("{} trailing payload byte(s)", cursor.remaining());
        }

        Ok(Self {
            clock,
            measurements,
        })
    }

    /// Encodes this [Payload] using the decoding schemas.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let count =
            i32::try_from(self.measurements.len()).map_err(|_| Error::InvalidCount(i32::MAX))?;

        let mut writer = Writer::with_capacity(
            CLOCK_BLOCK_SIZE + 4 + self.measurements.len() * MEASUREMENT_RECORD_SIZE,
        );

        writer.write_fields(CLOCK_SCHEMA, &self.clock.to_values())?;
        writer.write(Value::I32(count));

        for measurement in self.measurements.iter() {
            writer.write_fields(MEASUREMENT_SCHEMA, &measurement.to_values())?;
        }

        Ok(writer.into_bytes())
    }

    /// Encodes this [Payload] into a complete [RawFrame].
    pub fn to_frame(&self) -> Result<RawFrame, Error> {
        RawFrame::encode(CLASS_ID, MESSAGE_ID, &self.encode()?)
    }
}

/// Decodes the fields of a validated [RawFrame].
pub fn decode_fields(frame: &RawFrame) -> Result<Payload, Error> {
    Payload::decode(frame.payload())
}
