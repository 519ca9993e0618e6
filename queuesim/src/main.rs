//! Queue simulation experiments.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};

use queuesim::experiment::{Experiment, Preset, Sweep, MBPS};

/// Runs queue simulation experiments and stores the results as CSV.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    #[clap(subcommand)]
    command: Command,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long, global = true)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long, global = true)]
    no_stderr: bool,

    /// Number of worker threads; all available cores by default.
    #[clap(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs one of the predefined experiments.
    Preset {
        /// One of: exponential, mm1-stability, mm1, mm1-unstable, mm1k-stability, mm1k.
        preset: Preset,

        /// Output CSV file; `data/<preset>.csv` by default.
        #[clap(long)]
        output: Option<PathBuf>,

        /// Directory of the charts; `graphs/<preset>` by default.
        #[clap(long)]
        plots: Option<PathBuf>,

        /// Do not draw charts.
        #[clap(long, conflicts_with = "plots")]
        no_plots: bool,
    },

    /// Runs a grid of simulations.
    Sweep {
        /// Simulated times in seconds.
        #[clap(long = "horizon", required = true, use_value_delimiter = true)]
        horizons: Vec<f64>,

        /// Traffic intensities.
        #[clap(long = "rho", required = true, use_value_delimiter = true)]
        traffic_intensities: Vec<f64>,

        /// Buffer capacities. Unbounded if not given.
        #[clap(long = "capacity", use_value_delimiter = true)]
        capacities: Vec<i64>,

        /// Repetitions of each grid point.
        #[clap(long, default_value = "1")]
        runs: usize,

        /// Base seed.
        #[clap(long, default_value = "0")]
        seed: u64,

        /// Average packet length in bits.
        #[clap(long, default_value = "2000")]
        packet_length: f64,

        /// Link transmission rate in bits per second.
        #[clap(long, default_value = "1000000")]
        transmission_rate: f64,

        /// Observer event rate. Five times the faster of arrivals and departures by default.
        #[clap(long)]
        observer_rate: Option<f64>,

        /// Output CSV file.
        #[clap(long)]
        output: PathBuf,

        /// Draw charts of the results into this directory.
        #[clap(long)]
        plots: Option<PathBuf>,
    },

    /// Runs an experiment defined in a JSON file.
    Scenario {
        /// Path to the experiment definition.
        path: PathBuf,

        /// Output CSV file.
        #[clap(long)]
        output: PathBuf,

        /// Draw charts of the results into this directory.
        #[clap(long)]
        plots: Option<PathBuf>,
    },
}

/// Reads an experiment definition in JSON format.
fn read_experiment(path: &Path) -> eyre::Result<Experiment> {
    let file = File::open(path)
        .wrap_err_with(|| format!("unable to open experiment file: {}", path.display()))?;
    serde_json::from_reader(file).wrap_err("unable to parse experiment definition")
}

/// Executes `experiment`, writing its output to the file at `output`, and its charts to `plots`.
fn run(experiment: &Experiment, output: &Path, plots: Option<&Path>) -> eyre::Result<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("unable to create directory: {}", parent.display()))?;
    }
    let writer = BufWriter::new(
        File::create(output)
            .wrap_err_with(|| format!("unable to create output file: {}", output.display()))?,
    );
    let pb = ProgressBar::new(0)
        .with_style(ProgressStyle::default_bar().template("{msg} {wide_bar} {pos}/{len}"));
    pb.set_message(&output.display().to_string());
    let rows = experiment.execute(writer, Some(&pb), plots)?;
    pb.finish();
    log::info!("Written {} rows to {}", rows, output.display());
    Ok(())
}

/// Sets up the logger: the level grows with each `-v`, and records go to stderr and/or a log
/// file that is overwritten on every run.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let level = match opt.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level);
    if let Some(path) = &opt.log_output {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        dispatch = dispatch.chain(file);
    }
    if !opt.no_stderr {
        dispatch = dispatch.chain(std::io::stderr());
    }
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    if let Some(threads) = opt.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .wrap_err("unable to set up the thread pool")?;
    }
    match opt.command {
        Command::Preset {
            preset,
            output,
            plots,
            no_plots,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format!("data/{}.csv", preset)));
            let plots = if no_plots {
                None
            } else {
                Some(plots.unwrap_or_else(|| PathBuf::from(format!("graphs/{}", preset))))
            };
            run(&preset.experiment(), &output, plots.as_deref())
        }
        Command::Sweep {
            horizons,
            traffic_intensities,
            capacities,
            runs,
            seed,
            packet_length,
            transmission_rate,
            observer_rate,
            output,
            plots,
        } => {
            let sweep = Sweep {
                horizons,
                traffic_intensities,
                capacities,
                runs,
                seed,
                packet_length,
                transmission_rate,
                observer_rate,
            };
            log::info!(
                "Sweep over {} runs at {} Mbps",
                sweep.specs().len(),
                sweep.transmission_rate / MBPS
            );
            run(&Experiment::Sweep(sweep), &output, plots.as_deref())
        }
        Command::Scenario {
            path,
            output,
            plots,
        } => run(&read_experiment(&path)?, &output, plots.as_deref()),
    }
}
