use std::io::Cursor;

use hifitime::Unit;

use crate::{
    prelude::{Decoder, Epoch, Error, GnssSystem, SatelliteId, SignalCode, TimeScale},
    signal::{LLI_LOCKED, LLI_SLIP},
    tests::{init_logger, PayloadBuilder, WEEK},
};

/// Feeds the complete stream through [Decoder::consume].
fn consume_all(decoder: &mut Decoder, bytes: &[u8]) -> Vec<Result<usize, String>> {
    let mut out = Vec::new();
    for byte in bytes {
        match decoder.consume(*byte) {
            Ok(Some(epoch)) => out.push(Ok(epoch.len())),
            Ok(None) => {},
            Err(e) => out.push(Err(e.to_string())),
        }
    }
    out
}

#[test]
fn multi_constellation_epoch() {
    init_logger();

    let bytes = PayloadBuilder::new(86_400_000_000_000)
        .gps_l1(6)
        .gps_l5(6)
        .galileo_e1(11)
        .beidou_b1i(7)
        .glonass(3)
        .frame_bytes();

    let mut decoder = Decoder::default();
    let epoch = decoder
        .decode_file(&mut Cursor::new(bytes))
        .unwrap()
        .unwrap();

    // glonass is never classified
    assert_eq!(epoch.len(), 3);

    assert_eq!(
        epoch.epoch(),
        Some(Epoch::from_time_of_week(
            WEEK,
            86_400_000_000_000,
            TimeScale::GPST
        ))
    );

    let gps = epoch
        .slot(SatelliteId::new(GnssSystem::GPS, 6).unwrap())
        .unwrap();
    assert_eq!(gps.sat.number(), 6);
    assert_eq!(gps.bands[0].unwrap().code, SignalCode::L1C);
    assert_eq!(gps.bands[2].unwrap().code, SignalCode::L5Q);
    assert_eq!(gps.observations().count(), 2);

    let gal = epoch
        .slot(SatelliteId::new(GnssSystem::Galileo, 11).unwrap())
        .unwrap();
    assert_eq!(gal.sat.number(), 70);
    assert_eq!(gal.sat.to_string(), "E11");

    let bds = epoch
        .slot(SatelliteId::new(GnssSystem::BeiDou, 7).unwrap())
        .unwrap();
    assert_eq!(bds.bands[0].unwrap().code, SignalCode::L2I);

    // same received time of week: BeiDou time runs 14s behind
    let gps_pr = gps.bands[0].unwrap().pseudo_range_m;
    let bds_pr = bds.bands[0].unwrap().pseudo_range_m;
    assert!((bds_pr - gps_pr + 14.0 * 299_792_458.0).abs() < 1.0E-3);

    let obs = gps.bands[0].unwrap();
    assert_eq!(obs.snr, 38_500);
    assert!((obs.snr_dbhz() - 38.5).abs() < 1.0E-9);
    assert_eq!(obs.lli, LLI_LOCKED);
    assert!(obs.doppler_hz < 0.0);

    assert!(decoder
        .decode_file(&mut Cursor::new(Vec::new()))
        .unwrap()
        .is_none());
}

#[test]
fn consecutive_frames() {
    init_logger();

    let mut stream = Vec::new();
    for i in 0..10 {
        let mut builder = PayloadBuilder::new(i * 1_000_000_000);
        for svid in 1..=i as i32 + 1 {
            builder = builder.gps_l1(svid);
        }
        stream.extend(builder.frame_bytes());
        // nmea sentences are interleaved by some producers
        stream.extend_from_slice(b"$GPGSA,A,3,,,,,,,,,,,,,,,*1E\r\n");
    }

    let mut decoder = Decoder::default();
    let out = consume_all(&mut decoder, &stream);

    assert_eq!(out, (1..=10).map(Ok::<usize, String>).collect::<Vec<_>>());

    let mut reader = Cursor::new(stream);
    let mut decoder = Decoder::default();
    let mut times = Vec::new();

    while let Some(epoch) = decoder.decode_file(&mut reader).unwrap() {
        times.push(epoch.epoch().unwrap());
    }

    assert_eq!(times.len(), 10);
    assert!(times.windows(2).all(|w| w[1] - w[0] == 1.0 * Unit::Second));
    assert_eq!(decoder.statistics().epochs, 10);
}

#[test]
fn oversized_frame_then_valid_frame() {
    init_logger();

    let valid = PayloadBuilder::new(0).gps_l1(1).gps_l1(2).frame_bytes();

    let mut stream = vec![0xB5, 0x62, 0x02, 0x15, 0xFF, 0x7F];
    stream.extend_from_slice(&valid);

    let mut decoder = Decoder::default();
    let out = consume_all(&mut decoder, &stream);

    assert_eq!(out.len(), 2);
    assert!(out[0].is_err());
    assert_eq!(out[1], Ok(2));

    let stats = decoder.statistics();
    assert_eq!(stats.framing_errors, 1);
    assert_eq!(stats.frames, 1);
}

#[test]
fn nan_bias_yields_no_epoch() {
    init_logger();

    let mut payload = PayloadBuilder::new(0).gps_l1(1).build();
    payload.clock.bias_nanos = f64::NAN;

    let mut stream = payload.to_frame().unwrap().into_bytes();
    stream.extend(PayloadBuilder::new(1_000_000_000).gps_l1(1).frame_bytes());

    let mut reader = Cursor::new(stream);
    let mut decoder = Decoder::default();

    match decoder.decode_file(&mut reader) {
        Err(e) => {
            assert!(matches!(e, Error::MalformedClock(_)));
            assert!(e.is_recoverable());
        },
        other => panic!("unexpected result: {:?}", other),
    }

    let epoch = decoder.decode_file(&mut reader).unwrap().unwrap();
    assert_eq!(epoch.len(), 1);
    assert_eq!(decoder.statistics().malformed, 1);
}

#[test]
fn weak_and_slipped_signals() {
    init_logger();

    let mut payload = PayloadBuilder::new(0).gps_l1(1).gps_l1(2).gps_l1(3).build();
    payload.measurements[0].cn0_dbhz = 0.0;
    payload.measurements[1].cn0_dbhz = -1.0;
    payload.measurements[2].accumulated_delta_range_state = 2;

    let frame = payload.to_frame().unwrap();
    let epoch = Decoder::default().decode_frame(&frame).unwrap();

    assert_eq!(epoch.len(), 1);
    assert_eq!(epoch.slots()[0].sat.number(), 3);
    assert_eq!(epoch.slots()[0].bands[0].unwrap().lli, LLI_SLIP);
}

#[test]
fn empty_epoch() {
    init_logger();

    let bytes = PayloadBuilder::new(0).glonass(1).frame_bytes();
    let epoch = Decoder::default()
        .decode_file(&mut Cursor::new(bytes))
        .unwrap()
        .unwrap();

    assert!(epoch.is_empty());
    assert!(epoch.epoch().is_none());
}

#[test]
fn io_errors_are_fatal() {
    struct Failing;

    impl std::io::Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    let mut decoder = Decoder::default();
    match decoder.decode_file(&mut Failing) {
        Err(e) => {
            assert!(!e.is_recoverable());
            assert!(!e.is_idle());
        },
        Ok(_) => panic!("i/o error not reported"),
    }
}
