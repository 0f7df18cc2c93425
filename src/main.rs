use clap::{AppSettings, Parser};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use rand::SeedableRng;

use oitools::{
    bootstrap::{bootstrap_replicas, seed_from_time, BootstrapMethod, BootstrapRng},
    calibrate::{recalibrate, ErrorScaling, GaussianDisk, RecalibrationOptions},
    filter::{count_active_data, filter_by_kind},
    simulate::{simulate_dataset, SimulationParams},
    DataKind, OiRow, RowError,
};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The number of complex-visibility rows to simulate.
    #[clap(long, default_value = "10")]
    num_vis: usize,

    /// The number of squared-visibility rows to simulate.
    #[clap(long, default_value = "40")]
    num_vis2: usize,

    /// The number of closure-phase rows to simulate.
    #[clap(long, default_value = "20")]
    num_t3: usize,

    /// The number of spectral channels per row.
    #[clap(short = 'c', long, default_value = "16")]
    num_channels: usize,

    /// The probability that any channel is flagged.
    #[clap(long, default_value = "0.1")]
    flag_fraction: f64,

    /// The FWHM of the Gaussian calibrator model that the data were
    /// calibrated against [milliarcseconds].
    #[clap(long, default_value = "1.0")]
    old_diameter: f64,

    /// The FWHM of the replacement Gaussian calibrator model
    /// [milliarcseconds].
    #[clap(long, default_value = "1.5")]
    new_diameter: f64,

    /// Also rescale errors when recalibrating ("unscaled" or "scaled").
    #[clap(long, default_value = "unscaled")]
    error_scaling: ErrorScaling,

    /// The number of bootstrap replicas to generate.
    #[clap(short = 'n', long, default_value = "100")]
    num_replicas: usize,

    /// How to resample ("spectral" or "random").
    #[clap(short, long, default_value = "spectral")]
    method: BootstrapMethod,

    /// The random seed. If not given, one is taken from the system clock.
    #[clap(short, long)]
    seed: Option<u64>,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);

    if let Err(e) = try_main(args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn try_main(args: Args) -> Result<(), RowError> {
    let seed = args.seed.unwrap_or_else(seed_from_time);
    info!("Using seed {seed}");
    let mut rng = BootstrapRng::seed_from_u64(seed);

    let old_cal = GaussianDisk::from_mas(args.old_diameter);
    let new_cal = GaussianDisk::from_mas(args.new_diameter);
    debug!("Old calibrator: {old_cal:?}");
    debug!("New calibrator: {new_cal:?}");

    let params = SimulationParams {
        num_vis: args.num_vis,
        num_vis2: args.num_vis2,
        num_t3: args.num_t3,
        num_channels: args.num_channels,
        flag_fraction: args.flag_fraction,
        ..Default::default()
    };
    let rows = simulate_dataset(&params, &old_cal, &mut rng)?;
    for kind in DataKind::ALL {
        let of_kind = filter_by_kind(&rows, kind);
        info!(
            "{kind:>7}: {:4} rows, {:5} active channels",
            of_kind.len(),
            count_active_data(of_kind.iter().copied())
        );
    }

    let options = RecalibrationOptions {
        error_scaling: args.error_scaling,
    };
    let recalibrated = recalibrate(&rows, &old_cal, &new_cal, options);
    info!(
        "Mean V2 before recalibration: {:.5}",
        mean_vis2(rows.iter()).unwrap_or(f64::NAN)
    );
    info!(
        "Mean V2 after recalibration:  {:.5}",
        mean_vis2(recalibrated.iter()).unwrap_or(f64::NAN)
    );

    let progress = ProgressBar::with_draw_target(
        Some(args.num_replicas as _),
        if args.no_progress_bars {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:17}: [{wide_bar:.blue}] {pos:3}/{len:3} replicas ({elapsed_precise}<{eta_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Resampling");
    progress.tick();

    let replicas = bootstrap_replicas(
        &recalibrated,
        args.num_replicas,
        seed,
        args.method,
        Some(progress),
    )?;

    let expected = DataKind::ALL.map(|kind| count_active_data(filter_by_kind(&recalibrated, kind)));
    let mut means = Vec::with_capacity(replicas.len());
    for (i, replica) in replicas.iter().enumerate() {
        for (kind, &expected) in DataKind::ALL.iter().zip(expected.iter()) {
            let got = replica.active_data(*kind);
            if got != expected {
                warn!("Replica {i} has {got} active {kind} channels; expected {expected}");
            }
        }
        if let Some(mean) = mean_vis2(replica.iter()) {
            means.push(mean);
        }
    }

    match means.as_slice() {
        [] => info!("No squared visibilities to bootstrap"),
        [m] => info!("Bootstrapped mean V2: {m:.5}"),
        _ => {
            let n = means.len() as f64;
            let mean = means.iter().sum::<f64>() / n;
            let var = means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / (n - 1.0);
            info!(
                "Bootstrapped mean V2 over {} replicas: {mean:.5} +/- {:.5}",
                means.len(),
                var.sqrt()
            );
        }
    }

    Ok(())
}

/// The mean of all unmasked squared visibilities.
fn mean_vis2<'a>(rows: impl Iterator<Item = &'a OiRow>) -> Option<f64> {
    let (sum, count) = rows
        .filter(|row| row.kind() == DataKind::Vis2)
        .filter_map(|row| row.masked_data().as_real().map(|d| (d.sum(), d.len())))
        .fold((0.0, 0), |(s, c), (ds, dc)| (s + ds, c + dc));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
