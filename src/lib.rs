#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nav-solutions/.github/master/logos/logo2.jpg"
)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

/*
 * ANDROID2RINEX is part of the nav-solutions framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al,
 * (cf. https://github.com/nav-solutions/rinex/graphs/contributors)
 * (cf. https://github.com/nav-solutions/android2rinex/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/nav-solutions/android2rinex
 */

extern crate gnss_rs as gnss;

pub mod constants;
pub mod conversion;
pub mod decoder;
pub mod epoch;
pub mod frame;
pub mod payload;
pub mod schema;
pub mod signal;

mod error;

#[cfg(test)]
mod tests;

pub use error::Error;

pub mod prelude {
    pub use crate::{
        conversion::{Conversion, Report, Settings},
        decoder::{Config, Decoder, Statistics},
        epoch::{BandObservation, EpochBuilder, ObservationEpoch, SatelliteSlot},
        frame::{RawFrame, Synchronizer},
        payload::{ClockBlock, MeasurementRecord, Payload},
        signal::{classify, GnssSystem, SatelliteId, SignalCode},
        Error,
    };

    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::prelude::{Duration, Epoch, TimeScale};
}
