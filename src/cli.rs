use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};
use hifitime::prelude::{Duration, Epoch};

use android2rinex::prelude::{Config as DecoderConfig, Settings as ConversionSettings};

use crate::collecter::settings::{HeaderMetadata, Selection, Settings as RinexSettings};

use std::{fs::File, io::BufReader, str::FromStr};

pub struct Cli {
    /// Arguments passed by user
    matches: ArgMatches,
}

impl Cli {
    /// Build new command line interface
    pub fn new() -> Self {
        Self {
            matches: {
                Command::new("android2rinex")
                    .author("Guillaume W. Bres, <guillaume.bressaix@gmail.com>")
                    .version(env!("CARGO_PKG_VERSION"))
                    .about("Android raw GNSS measurements to RINEX converter")
                    .color(ColorChoice::Always)
                    .arg_required_else_help(true)
                    .next_help_heading("File interface")
                    .arg(
                        Arg::new("file")
                            .long("file")
                            .short('f')
                            .value_name("FILENAME")
                            .action(ArgAction::Append)
                            .required_unless_present_any(["tcp"])
                            .help("Load a single file. Use as many as needed.
Each file descriptor is consumed one after the other. You might have to load them according
to their sampling chronology to make sure. Gzip file are supported but they must be terminated with '.gz'")
                    )
                    .next_help_heading("Network interface")
                    .arg(
                        Arg::new("tcp")
                            .long("tcp")
                            .value_name("HOST:PORT")
                            .action(ArgAction::Set)
                            .conflicts_with("file")
                            .required_unless_present_any(["file"])
                            .help("Connect to a live measurement stream. Example: 192.168.1.20:8080")
                    )
                    .next_help_heading("Conversion window")
                    .arg(
                        Arg::new("start")
                            .long("start")
                            .value_name("EPOCH")
                            .action(ArgAction::Set)
                            .help("Drop all epochs prior this instant. Example: \"2024-06-01T10:00:00 GPST\"")
                    )
                    .arg(
                        Arg::new("end")
                            .long("end")
                            .value_name("EPOCH")
                            .action(ArgAction::Set)
                            .help("Drop all epochs past this instant. Example: \"2024-06-01T12:00:00 GPST\"")
                    )
                    .arg(
                        Arg::new("interval")
                            .short('i')
                            .long("interval")
                            .value_name("DURATION")
                            .action(ArgAction::Set)
                            .help("Decimate to this sampling interval. Only epochs aligned to the interval,
within 5ms, are preserved. Example: \"30 s\"")
                    )
                    .next_help_heading("Decoder")
                    .arg(
                        Arg::new("max-frame-len")
                            .long("max-frame-len")
                            .value_name("BYTES")
                            .action(ArgAction::Set)
                            .help("Maximal frame length. Longer frames are considered corrupt. Default is 16384.")
                    )
                    .arg(
                        Arg::new("capacity")
                            .long("capacity")
                            .value_name("SATELLITES")
                            .action(ArgAction::Set)
                            .help("Maximal number of satellites per epoch. Default is 100.")
                    )
                    .next_help_heading("RINEX Collection")
                    .arg(
                        Arg::new("name")
                            .long("name")
                            .short('n')
                            .required(false)
                            .action(ArgAction::Set)
                            .help("Define a custom name. To respect standard naming conventions,
this should be a 4 letter code, usually named after your geodetic marker.
When not defined, the default value is \"ANDR\".")
                    )
                    .arg(
                        Arg::new("prefix")
                            .long("prefix")
                            .required(false)
                            .help("Custom directory prefix for output products. Default is none!"),
                    )
                    .arg(
                        Arg::new("period")
                            .long("period")
                            .short('p')
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Define the file period, used in V3 file names. Default is 1 day.")
                    )
                    .arg(
                        Arg::new("split")
                            .long("split")
                            .value_name("DURATION")
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Split the output into one file per time unit, for example \"1 h\".
Files are aligned to multiples of this unit within the GPS week.
The whole conversion goes in a single file by default.")
                    )
                    .arg(
                        Arg::new("v2")
                            .long("v2")
                            .action(ArgAction::SetTrue)
                            .conflicts_with("v4")
                            .help("Downgrade RINEX revision to V2. You can also upgrade to RINEX V4 with --v4.
We use V3 by default, because very few tools support V4, so we remain compatible.")
                    )
                    .arg(
                        Arg::new("v4")
                            .long("v4")
                            .action(ArgAction::SetTrue)
                            .help("Upgrade RINEX revision to V4. You can also downgrade to RINEX V2 with --v2.
We use V3 by default, because very few tools support V4, so we remain compatible.")
                    )
                    .arg(
                        Arg::new("long")
                            .short('l')
                            .action(ArgAction::SetTrue)
                            .help("Prefer long (V3 like) file names over short (V2) file names")
                    )
                    .arg(
                        Arg::new("country")
                            .short('c')
                            .action(ArgAction::Set)
                            .help("Specify country code (3 letter) in case of V3 file name. Default: \"FRA\"")
                    )
                    .arg(
                        Arg::new("crx")
                            .long("crx")
                            .action(ArgAction::SetTrue)
                            .help("Activate CRINEX compression, for optimized RINEX size. Disabled by default."),
                    )
                    .arg(
                        Arg::new("gzip")
                            .long("gzip")
                            .action(ArgAction::SetTrue)
                            .help("Gzip compress the RINEX output.
You can combine this to CRINEX compression for effiency."))
                    .next_help_heading("Header metadata")
                    .arg(
                        Arg::new("config")
                            .long("config")
                            .value_name("FILE")
                            .action(ArgAction::Set)
                            .help("Load header metadata from a JSON file.
Options defined on the command line take precedence.")
                    )
                    .arg(
                        Arg::new("agency")
                            .long("agency")
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Define name of your Agency, to be used in all Headers"),
                    )
                    .arg(
                        Arg::new("observer")
                            .long("observer")
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Define name of Observer, to be used in all Headers"),
                    )
                    .arg(
                        Arg::new("operator")
                            .long("operator")
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Define name of Operator, used when no Observer is defined"),
                    )
                    .arg(
                        Arg::new("comment")
                            .long("comment")
                            .action(ArgAction::Set)
                            .required(false)
                            .help("Custom header comment"),
                    )
                    .arg(
                        Arg::new("model")
                            .short('m')
                            .long("model")
                            .required(false)
                            .value_name("Model")
                            .help("Define receiver (smartphone) model. For example \"Pixel 7\"")
                    )
                    .arg(
                        Arg::new("antenna")
                            .long("antenna")
                            .required(false)
                            .value_name("Model")
                            .help("Define antenna model")
                    )
                    .next_help_heading("Observations collection (signal sampling)")
                    .arg(
                        Arg::new("no-phase")
                            .long("no-phase")
                            .action(ArgAction::SetTrue)
                            .help("Do not track signal phase")
                    )
                    .arg(
                        Arg::new("no-pr")
                            .long("no-pr")
                            .action(ArgAction::SetTrue)
                            .help("Do not decode pseudo range")
                    )
                    .arg(
                        Arg::new("no-dop")
                            .long("no-dop")
                            .action(ArgAction::SetTrue)
                            .help("Do not track doppler shifts")
                    )
                    .arg(
                        Arg::new("no-snr")
                            .long("no-snr")
                            .action(ArgAction::SetTrue)
                            .help("Do not report signal strength")
                    )
                    .get_matches()
            },
        }
    }

    /// Input file paths
    pub fn filepaths(&self) -> Vec<&String> {
        if let Some(fp) = self.matches.get_many::<String>("file") {
            fp.collect()
        } else {
            Vec::new()
        }
    }

    /// Returns User TCP stream specification
    pub fn tcp_address(&self) -> Option<&String> {
        self.matches.get_one::<String>("tcp")
    }

    fn epoch(&self, key: &str) -> Option<Epoch> {
        let epoch = self.matches.get_one::<String>(key)?;
        let epoch = Epoch::from_str(epoch.trim())
            .unwrap_or_else(|e| panic!("Invalid --{} epoch: {}", key, e));
        Some(epoch)
    }

    fn duration(&self, key: &str) -> Option<Duration> {
        let dt = self.matches.get_one::<String>(key)?;
        let dt = dt
            .trim()
            .parse::<Duration>()
            .unwrap_or_else(|e| panic!("Invalid --{} duration: {}", key, e));
        Some(dt)
    }

    fn usize(&self, key: &str) -> Option<usize> {
        let value = self.matches.get_one::<String>(key)?;
        let value = value
            .trim()
            .parse::<usize>()
            .unwrap_or_else(|e| panic!("Invalid --{} value: {}", key, e));
        Some(value)
    }

    fn interval(&self) -> Option<Duration> {
        let dt = self.duration("interval")?;
        if dt.total_nanoseconds() < 10_000_000 {
            panic!("Decimation interval is limited to 10ms");
        }
        Some(dt)
    }

    fn rotation(&self) -> Option<Duration> {
        let dt = self.duration("split")?;
        if dt.total_nanoseconds() < 60_000_000_000 {
            panic!("File rotation is limited to 1 minute");
        }
        Some(dt)
    }

    pub fn conversion_settings(&self) -> ConversionSettings {
        let mut decoder = DecoderConfig::default();

        if let Some(max_frame_len) = self.usize("max-frame-len") {
            decoder.max_frame_len = max_frame_len;
        }

        if let Some(capacity) = self.usize("capacity") {
            decoder.capacity = capacity;
        }

        let settings = ConversionSettings {
            decoder,
            start: self.epoch("start"),
            end: self.epoch("end"),
            interval: self.interval(),
        };

        if let (Some(start), Some(end)) = (settings.start, settings.end) {
            if end < start {
                panic!("Invalid conversion window: {} is prior {}", end, start);
            }
        }

        settings
    }

    fn string(&self, key: &str) -> Option<String> {
        self.matches.get_one::<String>(key).map(|s| s.to_string())
    }

    fn metadata(&self) -> HeaderMetadata {
        let file = if let Some(path) = self.matches.get_one::<String>("config") {
            let fd = File::open(path)
                .unwrap_or_else(|e| panic!("Failed to open \"{}\": {}", path, e));

            serde_json::from_reader(BufReader::new(fd))
                .unwrap_or_else(|e| panic!("Invalid configuration \"{}\": {}", path, e))
        } else {
            HeaderMetadata::default()
        };

        file.merge(HeaderMetadata {
            agency: self.string("agency"),
            observer: self.string("observer"),
            operator: self.string("operator"),
            comment: self.string("comment"),
            model: self.string("model"),
            antenna: self.string("antenna"),
        })
    }

    pub fn rinex_settings(&self) -> RinexSettings {
        RinexSettings {
            short_filename: !self.matches.get_flag("long"),
            gzip: self.matches.get_flag("gzip"),
            crinex: self.matches.get_flag("crx"),
            major: if self.matches.get_flag("v4") {
                4
            } else if self.matches.get_flag("v2") {
                2
            } else {
                3
            },
            country: self.string("country").unwrap_or("FRA".to_string()),
            prefix: self.string("prefix"),
            name: self.string("name").unwrap_or("ANDR".to_string()),
            period: self
                .duration("period")
                .unwrap_or(Duration::from_days(1.0)),
            rotation: self.rotation(),
            sampling: self
                .interval()
                .unwrap_or(Duration::from_seconds(1.0)),
            metadata: self.metadata(),
            selection: Selection {
                pseudo_range: !self.matches.get_flag("no-pr"),
                phase: !self.matches.get_flag("no-phase"),
                doppler: !self.matches.get_flag("no-dop"),
                snr: !self.matches.get_flag("no-snr"),
            },
        }
    }
}
