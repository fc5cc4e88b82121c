use std::{collections::HashMap, str::FromStr};

use hifitime::{
    efmt::Format,
    prelude::{Duration, Epoch, Formatter, Unit},
};

use rinex::{
    prelude::{Constellation, Observable},
    production::{FFU, PPU},
};

use serde::Deserialize;

use android2rinex::signal::{GnssSystem, SignalCode};

/// Header metadata, that may be loaded from a JSON file
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeaderMetadata {
    /// Publishing agency
    pub agency: Option<String>,
    /// Observer
    pub observer: Option<String>,
    /// Program operator
    pub operator: Option<String>,
    /// Header comment
    pub comment: Option<String>,
    /// Receiver model
    pub model: Option<String>,
    /// Antenna model
    pub antenna: Option<String>,
}

impl HeaderMetadata {
    /// Fields defined in `rhs` take precedence.
    pub fn merge(self, rhs: Self) -> Self {
        Self {
            agency: rhs.agency.or(self.agency),
            observer: rhs.observer.or(self.observer),
            operator: rhs.operator.or(self.operator),
            comment: rhs.comment.or(self.comment),
            model: rhs.model.or(self.model),
            antenna: rhs.antenna.or(self.antenna),
        }
    }
}

/// Observables selection
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Selection {
    pub pseudo_range: bool,
    pub phase: bool,
    pub doppler: bool,
    pub snr: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            pseudo_range: true,
            phase: true,
            doppler: true,
            snr: true,
        }
    }
}

impl Selection {
    /// Selected [Observable]s for this [SignalCode], in C, L, D, S order.
    pub fn observables(&self, code: SignalCode, major: u8) -> Vec<Observable> {
        let code = if major < 3 {
            code.rinex_v2_code()
        } else {
            code.rinex_code()
        };

        let mut observables = Vec::with_capacity(4);

        if self.pseudo_range {
            observables.push(Observable::PseudoRange(format!("C{}", code)));
        }
        if self.phase {
            observables.push(Observable::Phase(format!("L{}", code)));
        }
        if self.doppler {
            observables.push(Observable::Doppler(format!("D{}", code)));
        }
        if self.snr {
            observables.push(Observable::SSI(format!("S{}", code)));
        }

        observables
    }

    /// Observables per system, for every system we may classify.
    pub fn codes(&self, major: u8) -> HashMap<Constellation, Vec<Observable>> {
        let mut codes = HashMap::new();

        for system in GnssSystem::ALL {
            let observables = system
                .bands()
                .iter()
                .flat_map(|band| self.observables(band.code, major))
                .collect::<Vec<_>>();

            if !observables.is_empty() {
                codes.insert(system.into(), observables);
            }
        }

        codes
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Release Major version
    pub major: u8,

    /// GZIP compression
    pub gzip: bool,
    /// CRINEX compression
    pub crinex: bool,

    /// Custom name
    pub name: String,

    /// Custom country code
    pub country: String,

    /// File period
    pub period: Duration,

    /// Output files are split on multiples of this duration,
    /// counted from the start of the GPS week.
    pub rotation: Option<Duration>,

    /// Sampling period
    pub sampling: Duration,

    /// Prefers short RINEX file name
    pub short_filename: bool,

    /// Custom file prefix
    pub prefix: Option<String>,

    /// Header metadata
    pub metadata: HeaderMetadata,

    /// Observables selection
    pub selection: Selection,
}

impl Settings {
    pub fn filename(&self, t: Epoch) -> String {
        let mut filepath = if let Some(prefix) = &self.prefix {
            format!("{}/", prefix)
        } else {
            "".to_string()
        };

        let filename = if self.short_filename {
            self.obs_v2_filename(t)
        } else {
            self.obs_v3_filename(t)
        };

        filepath.push_str(&filename);
        filepath
    }

    /// Start of the file that should contain this [Epoch].
    pub fn file_start(&self, t: Epoch) -> Epoch {
        let rotation = match self.rotation {
            Some(rotation) if rotation.total_nanoseconds() > 0 => rotation,
            _ => return t,
        };

        let (week, tow_nanos) = t.to_time_of_week();
        let rem = (tow_nanos as i128 % rotation.total_nanoseconds()) as u64;

        Epoch::from_time_of_week(week, tow_nanos - rem, t.time_scale)
    }

    /// Returns true when this [Epoch] no longer fits in the file started at `start`.
    pub fn rotates(&self, start: Epoch, t: Epoch) -> bool {
        match self.rotation {
            Some(rotation) => t >= start + rotation,
            None => false,
        }
    }

    /// Sub daily files, identified by their starting hour.
    fn sub_daily(&self) -> bool {
        self.rotation
            .map(|rotation| rotation < 1.0 * Unit::Day)
            .unwrap_or(false)
    }

    /// Observables per system
    pub fn observables(&self) -> HashMap<Constellation, Vec<Observable>> {
        self.selection.codes(self.major)
    }

    fn obs_v2_filename(&self, t: Epoch) -> String {
        let (y, _, _, _, _, _, _) = t.to_gregorian_utc();

        let fmt = Format::from_str("%j").unwrap();
        let formatter = Formatter::new(t, fmt);

        let mut formatted = self.name.to_string();

        formatted.push_str(&formatter.to_string());

        if self.sub_daily() {
            let fmt = Format::from_str("%H").unwrap();
            let hour = Formatter::new(t, fmt)
                .to_string()
                .parse::<u8>()
                .unwrap_or_default();

            formatted.push((b'a' + hour) as char);
        }

        formatted.push('.');

        formatted.push_str(&format!("{:02}", y % 100));

        if self.crinex {
            formatted.push('D');
        } else {
            formatted.push('O');
        }

        if self.gzip {
            formatted.push_str(".gz")
        }

        formatted
    }

    fn obs_v3_filename(&self, t: Epoch) -> String {
        let ppu: PPU = self.rotation.unwrap_or(self.period).into();
        let ffu: FFU = self.sampling.into();

        let mut formatted = format!("{}{}_R_", self.name, self.country);

        let fmt = Format::from_str("%Y%j").unwrap();
        let formatter = Formatter::new(t, fmt);

        formatted.push_str(&formatter.to_string());

        if self.sub_daily() {
            let fmt = Format::from_str("%H%M").unwrap();
            formatted.push_str(&Formatter::new(t, fmt).to_string());
            formatted.push('_');
        } else {
            formatted.push_str("0000_");
        }

        formatted.push_str(&ppu.to_string());
        formatted.push('_');

        formatted.push_str(&ffu.to_string());
        formatted.push_str("_MO");

        if self.crinex {
            formatted.push_str(".crx");
        } else {
            formatted.push_str(".rnx");
        }

        if self.gzip {
            formatted.push_str(".gz");
        }

        formatted
    }
}

#[cfg(test)]
mod test {
    use super::{HeaderMetadata, Selection, Settings};
    use android2rinex::signal::SignalCode;
    use hifitime::prelude::{Duration, Epoch, TimeScale, Unit};
    use rinex::prelude::{Constellation, Observable};
    use std::str::FromStr;

    fn settings(short_filename: bool) -> Settings {
        Settings {
            major: 3,
            gzip: false,
            crinex: false,
            prefix: None,
            short_filename,
            name: "ANDR".to_string(),
            country: "FRA".to_string(),
            period: Duration::from_days(1.0),
            rotation: None,
            sampling: Duration::from_seconds(30.0),
            metadata: Default::default(),
            selection: Default::default(),
        }
    }

    #[test]
    fn test_v2_filename() {
        let mut settings = settings(true);

        let t0 = Epoch::from_str("2020-01-01T00:00:00 UTC").unwrap();

        assert_eq!(settings.obs_v2_filename(t0), "ANDR001.20O");

        settings.crinex = true;
        assert_eq!(settings.obs_v2_filename(t0), "ANDR001.20D");

        settings.gzip = true;
        assert_eq!(settings.obs_v2_filename(t0), "ANDR001.20D.gz");

        settings.prefix = Some("/tmp".to_string());
        assert_eq!(settings.filename(t0), "/tmp/ANDR001.20D.gz");
    }

    #[test]
    fn test_v3_filename() {
        let mut settings = settings(false);

        let t0 = Epoch::from_str("2020-01-01T00:00:00 UTC").unwrap();

        assert_eq!(
            settings.obs_v3_filename(t0),
            "ANDRFRA_R_20200010000_01D_30S_MO.rnx"
        );

        settings.crinex = true;

        assert_eq!(
            settings.obs_v3_filename(t0),
            "ANDRFRA_R_20200010000_01D_30S_MO.crx"
        );

        settings.gzip = true;

        assert_eq!(
            settings.filename(t0),
            "ANDRFRA_R_20200010000_01D_30S_MO.crx.gz"
        );
    }

    #[test]
    fn hourly_files() {
        let mut settings = settings(true);
        settings.rotation = Some(1.0 * Unit::Hour);

        let t = Epoch::from_time_of_week(2300, 5_400_000_000_000, TimeScale::GPST);
        let start = settings.file_start(t);

        assert_eq!(
            start,
            Epoch::from_time_of_week(2300, 3_600_000_000_000, TimeScale::GPST)
        );

        assert!(!settings.rotates(start, t));
        assert!(settings.rotates(start, start + 1.0 * Unit::Hour));

        let t1 = Epoch::from_str("2020-01-01T01:00:00 UTC").unwrap();
        assert_eq!(settings.filename(t1), "ANDR001b.20O");

        settings.short_filename = false;
        assert_eq!(
            settings.filename(t1),
            "ANDRFRA_R_20200010100_01H_30S_MO.rnx"
        );
    }

    #[test]
    fn daily_files() {
        let settings = settings(true);
        let t = Epoch::from_time_of_week(2300, 5_400_000_000_000, TimeScale::GPST);

        assert_eq!(settings.file_start(t), t);
        assert!(!settings.rotates(t, t + 3.0 * Unit::Day));

        let t1 = Epoch::from_str("2020-01-01T01:00:00 UTC").unwrap();
        assert_eq!(settings.filename(t1), "ANDR001.20O");
    }

    #[test]
    fn observables_selection() {
        let selection = Selection::default();

        assert_eq!(
            selection.observables(SignalCode::L1C, 3),
            vec![
                Observable::PseudoRange("C1C".to_string()),
                Observable::Phase("L1C".to_string()),
                Observable::Doppler("D1C".to_string()),
                Observable::SSI("S1C".to_string()),
            ]
        );

        assert_eq!(
            selection.observables(SignalCode::L5Q, 2),
            vec![
                Observable::PseudoRange("C5".to_string()),
                Observable::Phase("L5".to_string()),
                Observable::Doppler("D5".to_string()),
                Observable::SSI("S5".to_string()),
            ]
        );

        let selection = Selection {
            phase: false,
            snr: false,
            ..Default::default()
        };

        let codes = selection.codes(3);

        // glonass is never classified
        assert!(codes.get(&Constellation::Glonass).is_none());

        assert_eq!(
            codes.get(&Constellation::BeiDou),
            Some(&vec![
                Observable::PseudoRange("C2I".to_string()),
                Observable::Doppler("D2I".to_string()),
                Observable::PseudoRange("C5X".to_string()),
                Observable::Doppler("D5X".to_string()),
            ])
        );

        assert_eq!(codes.get(&Constellation::GPS).map(|c| c.len()), Some(4));
        assert!(codes.contains_key(&Constellation::SBAS));
        assert!(codes.contains_key(&Constellation::QZSS));
        assert!(codes.contains_key(&Constellation::Galileo));

        let none = Selection {
            pseudo_range: false,
            phase: false,
            doppler: false,
            snr: false,
        };
        assert!(none.codes(3).is_empty());
    }

    #[test]
    fn header_metadata() {
        let file: HeaderMetadata = serde_json::from_str(
            r#"{
                "agency": "IGN",
                "observer": "Field team",
                "model": "Pixel 7"
            }"#,
        )
        .unwrap();

        assert_eq!(file.agency.as_deref(), Some("IGN"));
        assert!(file.antenna.is_none());

        let cli = HeaderMetadata {
            agency: Some("CNES".to_string()),
            antenna: Some("internal".to_string()),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.agency.as_deref(), Some("CNES"));
        assert_eq!(merged.observer.as_deref(), Some("Field team"));
        assert_eq!(merged.model.as_deref(), Some("Pixel 7"));
        assert_eq!(merged.antenna.as_deref(), Some("internal"));
    }
}
