use log::{debug, error, info, warn};

use std::{
    collections::HashMap,
    io::{BufWriter, Write},
};

use rinex::{
    error::FormattingError,
    hardware::{Antenna, Receiver},
    observation::HeaderFields as ObsHeader,
    prelude::{
        obs::{EpochFlag, LliFlags, ObsKey, Observations, SignalObservation, SNR},
        Constellation, Epoch, Header, Observable, RinexType, CRINEX,
    },
};

use tokio::sync::mpsc::Receiver as Rx;

use hifitime::prelude::Duration;

use android2rinex::prelude::ObservationEpoch;

use crate::collecter::{fd::FileDescriptor, settings::Settings, Message};

pub struct Collecter {
    /// Latest [Epoch]
    epoch: Option<Epoch>,

    /// Start of the current file
    file_start: Option<Epoch>,

    /// Redacted [ObsHeader]
    header: Option<ObsHeader>,

    /// Observables per system
    codes: HashMap<Constellation, Vec<Observable>>,

    /// [Message]ing handle
    rx: Rx<Message>,

    /// [Settings]
    settings: Settings,

    /// Current [FileDescriptor] handle
    fd: Option<BufWriter<FileDescriptor>>,

    /// List of header comments
    header_comments: Vec<String>,

    /// Number of released epochs
    released: usize,
}

impl Collecter {
    /// Builds new [Collecter]
    pub fn new(settings: Settings, rx: Rx<Message>) -> Self {
        Self {
            rx,
            codes: settings.observables(),
            settings,
            fd: Default::default(),
            file_start: Default::default(),
            epoch: Default::default(),
            header: Default::default(),
            header_comments: Default::default(),
            released: 0,
        }
    }

    /// Obtain a new file descriptor
    fn fd(&self, t: Epoch) -> FileDescriptor {
        let filename = self.settings.filename(t);
        debug!("{} - new file \"{}\"", t, filename);

        FileDescriptor::new(self.settings.gzip, &filename)
            .unwrap_or_else(|e| panic!("Failed to open \"{}\": {}", filename, e))
    }

    pub async fn run(&mut self) {
        let cfg_precision = Duration::from_seconds(1.0);

        while let Some(msg) = self.rx.recv().await {
            match msg {
                Message::HeaderComment(comment) => {
                    if self.header_comments.len() < 16 {
                        self.header_comments.push(comment);
                    }
                },

                Message::Shutdown => break,

                Message::Epoch(epoch) => {
                    let t = match epoch.epoch() {
                        Some(t) => t,
                        None => continue,
                    };

                    if let Some(latest) = self.epoch {
                        if t <= latest {
                            warn!(
                                "{} - epoch prior {}: dropped",
                                t.round(cfg_precision),
                                latest.round(cfg_precision)
                            );
                            continue;
                        }
                    }

                    if let Some(start) = self.file_start {
                        if self.settings.rotates(start, t) {
                            debug!("{} - file rotation", t.round(cfg_precision));
                            self.close();
                        }
                    }

                    if self.fd.is_none() {
                        let start = self.settings.file_start(t);
                        match self.release_header(start) {
                            Ok(_) => {
                                debug!("{} - RINEX header redacted", t.round(cfg_precision));
                                self.file_start = Some(start);
                            },
                            Err(e) => {
                                error!(
                                    "{} - failed to redact RINEX header: {}",
                                    t.round(cfg_precision),
                                    e
                                );
                                return;
                            },
                        }
                    }

                    self.epoch = Some(t);
                    self.release_epoch(t, &epoch);
                },
            }
        }

        self.close();
    }

    fn release_header(&mut self, t: Epoch) -> Result<(), FormattingError> {
        // obtain new file, release header
        let mut fd = BufWriter::new(self.fd(t));

        let header = self.build_header();

        header.format(&mut fd)?;

        let _ = fd.flush();

        self.fd = Some(fd);
        self.header = header.obs;

        Ok(())
    }

    fn release_epoch(&mut self, t: Epoch, epoch: &ObservationEpoch) {
        let observations = self.observations(epoch);

        if observations.signals.is_empty() {
            debug!("{} - no selected observations", t);
            return;
        }

        let key = ObsKey {
            epoch: t,
            flag: EpochFlag::Ok,
        };

        match (self.fd.as_mut(), self.header.as_ref()) {
            (Some(fd), Some(header)) => {
                match observations.format(self.settings.major == 2, &key, header, fd) {
                    Ok(_) => {
                        let _ = fd.flush();
                        self.released += 1;
                        debug!("{} - new epoch released", t);
                    },
                    Err(e) => {
                        error!("{} - failed to format pending epoch: {}", t, e);
                    },
                }
            },
            _ => {
                error!("{} - internal error: incomplete RINEX header", t);
            },
        }
    }

    /// Converts one [ObservationEpoch] to RINEX [Observations],
    /// limited to the header observables.
    fn observations(&self, epoch: &ObservationEpoch) -> Observations {
        let mut buf = Observations::default();

        for slot in epoch.slots() {
            let sv = match slot.sat.to_sv() {
                Some(sv) => sv,
                None => {
                    error!("{} - invalid satellite", slot.sat);
                    continue;
                },
            };

            let codes = match self.codes.get(&sv.constellation) {
                Some(codes) => codes,
                None => continue,
            };

            for (_, band) in slot.observations() {
                let snr = SNR::from(band.snr_dbhz());

                for observable in self
                    .settings
                    .selection
                    .observables(band.code, self.settings.major)
                {
                    if !codes.contains(&observable) {
                        continue;
                    }

                    let (value, lli) = match &observable {
                        Observable::PseudoRange(_) => (band.pseudo_range_m, None),
                        Observable::Phase(_) => (
                            band.phase_cycles,
                            Some(LliFlags::from_bits_truncate(band.lli)),
                        ),
                        Observable::Doppler(_) => (band.doppler_hz, None),
                        _ => (band.snr_dbhz(), None),
                    };

                    buf.signals.push(SignalObservation {
                        sv,
                        lli,
                        value,
                        observable,
                        snr: Some(snr),
                    });
                }
            }
        }

        buf
    }

    fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            let result = fd
                .into_inner()
                .map_err(|e| e.into_error())
                .and_then(|fd| fd.finish());

            match result {
                Ok(_) => info!("{} epoch(s) released", self.released),
                Err(e) => error!("failed to terminate RINEX file: {}", e),
            }
        }

        self.header = None;
        self.released = 0;
    }

    fn build_header(&self) -> Header {
        let mut header = Header::default();

        let mut receiver = Option::<Receiver>::None;
        let mut obs_header = ObsHeader::default();

        let metadata = &self.settings.metadata;

        // revision
        header.rinex_type = RinexType::ObservationData;
        header.version.major = self.settings.major;

        // GNSS
        if self.codes.len() == 1 {
            header.constellation = self.codes.keys().next().copied();
        } else {
            header.constellation = Some(Constellation::Mixed);
        }

        // CRINEX
        if self.settings.crinex {
            let mut crinex = CRINEX::default();

            if self.settings.major == 2 {
                crinex.version.major = 2;
            } else {
                crinex.version.major = 3;
            }

            obs_header.crinex = Some(crinex);
        }

        // conversion comments
        for comment in self.header_comments.iter() {
            header.comments.push(comment.to_string());
        }

        // user comment
        if let Some(comment) = &metadata.comment {
            header.comments.push(comment.to_string());
        }

        // observer, or program operator
        if let Some(observer) = metadata.observer.as_ref().or(metadata.operator.as_ref()) {
            header.observer = Some(observer.clone());
        }

        // custom agency
        if let Some(agency) = &metadata.agency {
            header.agency = Some(agency.clone());
        }

        // custom receiver
        if let Some(model) = &metadata.model {
            receiver = Some(Receiver::default().with_model(model));
        }

        header.rcvr = receiver;

        // custom antenna
        if let Some(model) = &metadata.antenna {
            header.rcvr_antenna = Some(Antenna::default().with_model(model));
        }

        obs_header.codes = self.codes.clone();

        header.obs = Some(obs_header);
        header
    }
}
