#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nav-solutions/.github/master/logos/logo2.jpg"
)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::type_complexity)]

/*
 * ANDROID2RINEX is part of the nav-solutions framework.
 * Authors: Guillaume W. Bres <guillaume.bressaix@gmail.com> et al,
 * (cf. https://github.com/nav-solutions/rinex/graphs/contributors)
 * (cf. https://github.com/nav-solutions/android2rinex/graphs/contributors)
 * This framework is shipped under Mozilla Public V2 license.
 *
 * Documentation: https://github.com/nav-solutions/android2rinex
 */

use env_logger::{Builder, Target};

use log::{error, info, warn};

use tokio::{signal, sync::mpsc};

use std::{ops::ControlFlow, sync::atomic::Ordering};

use hifitime::prelude::{Duration, Epoch, TimeScale};

use android2rinex::prelude::Conversion;

mod cli;
mod collecter;
mod device;

use crate::{
    cli::Cli,
    collecter::{observation::Collecter as ObsCollecter, Message},
    device::Device,
};

#[tokio::main]
pub async fn main() {
    let mut builder = Builder::from_default_env();

    builder
        .target(Target::Stdout)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    let cfg_precision = Duration::from_seconds(1.0);

    let t_utc = Epoch::now()
        .unwrap_or_else(|e| panic!("Failed to determine system time: {}", e))
        .to_time_scale(TimeScale::UTC);

    // cli
    let cli = Cli::new();

    // Input interface
    let device = if let Some(address) = cli.tcp_address() {
        // live stream
        Device::connect(address)
    } else {
        // passive mode (input files)
        Device::open_files(&cli.filepaths())
    };

    // RINEX settings
    let settings = cli.rinex_settings();

    // Conversion settings
    let conversion = Conversion::new(cli.conversion_settings());

    // Observation RINEX
    let (obs_tx, obs_rx) = mpsc::channel(128);

    let mut obs_collecter = ObsCollecter::new(settings, obs_rx);

    // spawns OBS collector
    let collecter = tokio::spawn(async move {
        info!("{} - Observation mode deployed", t_utc.round(cfg_precision));
        obs_collecter.run().await;
    });

    if device.is_read_only() {
        for fullpath in cli.filepaths() {
            let filename = fullpath.rsplit('/').next().unwrap_or(fullpath);
            let comment = Message::HeaderComment(format!("converted from {}", filename));
            if obs_tx.send(comment).await.is_err() {
                error!("collecter has already exited");
            }
        }
    }

    // Ctrl+C interrupts the conversion
    let abort = conversion.abort_handle();

    tokio::spawn(async move {
        signal::ctrl_c()
            .await
            .unwrap_or_else(|e| panic!("Tokio signal handling error: {}", e));

        warn!("interrupted by user");
        abort.store(true, Ordering::Relaxed);
    });

    // conversion worker
    let worker_tx = obs_tx.clone();

    let worker = tokio::task::spawn_blocking(move || {
        conversion.run(device, |epoch| {
            match worker_tx.blocking_send(Message::Epoch(epoch)) {
                Ok(_) => ControlFlow::Continue(()),
                Err(e) => {
                    error!("failed to send epoch: {}", e);
                    ControlFlow::Break(())
                },
            }
        })
    });

    info!("{} - application deployed", t_utc.round(cfg_precision));

    match worker.await {
        Ok(Ok(report)) => {
            let stats = report.statistics;
            info!(
                "{} frame(s) decoded: {} framing error(s), {} checksum error(s), {} malformed, {} capacity error(s)",
                stats.frames,
                stats.framing_errors,
                stats.checksum_errors,
                stats.malformed,
                stats.capacity_errors,
            );

            info!(
                "{} epoch(s) collected, {} screened out",
                report.delivered, report.screened
            );

            if report.aborted {
                warn!("conversion was interrupted: output is incomplete");
            }
        },
        Ok(Err(e)) => {
            error!("conversion error: {}", e);
        },
        Err(e) => {
            error!("conversion worker failure: {}", e);
        },
    }

    // releases pending content
    if obs_tx.send(Message::Shutdown).await.is_err() {
        error!("collecter has already exited");
    }

    if let Err(e) = collecter.await {
        error!("collecter failure: {}", e);
    }
}
