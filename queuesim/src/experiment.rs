//! Experiments built on top of the simulation engine: parameter sweeps, the generator
//! self-check, and their CSV output.

use std::io;
use std::path::Path;

use derive_more::{Display, From, Into};
use indicatif::ProgressBar;
use itertools::iproduct;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    plot, Error, ExponentialIntervals, IntervalSource, Result, SampleSummary, Simulation,
    SimulationParameters,
};

/// One megabit per second, in bits per second.
pub const MBPS: f64 = 1_000_000.0;

/// Seed of a pseudo-random stream.
#[derive(
    From, Into, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Copy, Clone, Hash,
    Display,
)]
pub struct Seed(u64);

/// A single run within an experiment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSpec {
    /// Index of the repetition for the same parameters.
    pub run: usize,
    /// Seed of the run's private stream.
    pub seed: Seed,
    /// Simulation parameters.
    pub params: SimulationParameters,
}

impl RunSpec {
    /// Runs the simulation with a fresh stream created from the seed.
    ///
    /// # Errors
    ///
    /// Propagates simulation errors, such as invalid parameters or a degenerate run.
    pub fn execute(&self) -> Result<RunRecord> {
        let mut simulation =
            Simulation::new(self.params, ExponentialIntervals::seeded(self.seed.into()))?;
        let report = simulation.execute()?;
        Ok(RunRecord {
            rho: self.params.traffic_intensity,
            horizon: self.params.horizon,
            capacity: self.params.buffer_capacity()?.limit(),
            run: self.run,
            seed: self.seed,
            occupancy: report.occupancy,
            idle_observations: report.idle_observations,
            losses: report.losses,
            arrivals: report.arrivals,
            departures: report.departures,
            observations: report.observations,
            mean_occupancy: report.mean_occupancy,
            idle_probability: report.idle_probability,
            loss_probability: report.loss_probability,
        })
    }
}

/// Output row of a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunRecord {
    /// Traffic intensity.
    pub rho: f64,
    /// Simulated time.
    pub horizon: f64,
    /// Buffer capacity; empty for an unbounded buffer.
    pub capacity: Option<usize>,
    /// Repetition index.
    pub run: usize,
    /// Seed of the run.
    pub seed: Seed,
    /// Packets left in the system at the end.
    pub occupancy: u64,
    /// Observations of an idle server.
    pub idle_observations: u64,
    /// Dropped packets.
    pub losses: u64,
    /// Arrived packets.
    pub arrivals: u64,
    /// Transmitted packets.
    pub departures: u64,
    /// Observer events.
    pub observations: u64,
    /// Time-average number of packets in the system.
    #[serde(rename = "En")]
    pub mean_occupancy: f64,
    /// Proportion of time the server is idle.
    #[serde(rename = "p_idle")]
    pub idle_probability: f64,
    /// Proportion of dropped packets; empty for an unbounded buffer.
    #[serde(rename = "p_loss")]
    pub loss_probability: Option<f64>,
}

fn default_runs() -> usize {
    1
}

/// A grid of simulation runs: every combination of capacity, horizon, and traffic intensity,
/// repeated `runs` times.
///
/// Repetition `i` of every grid point uses seed `seed + i`, so that different parameters are
/// compared on the same random streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    /// Simulated times.
    pub horizons: Vec<f64>,
    /// Traffic intensities.
    pub traffic_intensities: Vec<f64>,
    /// Buffer capacities. If empty, the buffer is unbounded.
    #[serde(default)]
    pub capacities: Vec<i64>,
    /// Number of repetitions of each grid point.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Base seed.
    #[serde(default)]
    pub seed: u64,
    /// Average packet length in bits.
    pub packet_length: f64,
    /// Transmission rate in bits per second.
    pub transmission_rate: f64,
    /// Observation rate override.
    #[serde(default)]
    pub observer_rate: Option<f64>,
}

impl Sweep {
    /// Expands the grid into individual runs, ordered by capacity, horizon, traffic intensity,
    /// and repetition.
    #[must_use]
    pub fn specs(&self) -> Vec<RunSpec> {
        let capacities: Vec<Option<i64>> = if self.capacities.is_empty() {
            vec![None]
        } else {
            self.capacities.iter().copied().map(Some).collect()
        };
        iproduct!(
            capacities,
            self.horizons.iter().copied(),
            self.traffic_intensities.iter().copied(),
            0..self.runs
        )
        .map(|(capacity, horizon, rho, run)| RunSpec {
            run,
            seed: Seed(self.seed.wrapping_add(run as u64)),
            params: SimulationParameters {
                horizon,
                traffic_intensity: rho,
                packet_length: self.packet_length,
                transmission_rate: self.transmission_rate,
                capacity,
                observer_rate: self.observer_rate,
            },
        })
        .collect()
    }

    /// Executes all runs in parallel. Each run owns its random stream, so the results do not
    /// depend on the number of threads; they are returned in the order of [`Sweep::specs`].
    ///
    /// # Errors
    ///
    /// Returns the first error encountered by any of the runs.
    pub fn execute(&self, pb: Option<&ProgressBar>) -> Result<Vec<RunRecord>> {
        let specs = self.specs();
        if let Some(pb) = pb {
            pb.set_length(specs.len() as u64);
        }
        specs
            .par_iter()
            .map(|spec| {
                let record = spec.execute();
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                record
            })
            .collect()
    }
}

/// Draws samples from the interval generator and compares their moments to the exponential
/// distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorCheck {
    /// Rate of the distribution.
    pub rate: f64,
    /// Number of samples per run.
    pub size: usize,
    /// Number of runs, each using seed `seed + run`.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Base seed.
    #[serde(default)]
    pub seed: u64,
}

/// Output row of a generator check run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeneratorRecord {
    /// Run index.
    pub run: usize,
    /// Sample mean.
    pub mean: f64,
    /// Sample variance.
    pub variance: f64,
    /// Mean of the distribution, `1 / rate`.
    pub expected_mean: f64,
    /// Variance of the distribution, `1 / rate^2`.
    pub expected_variance: f64,
}

impl GeneratorCheck {
    /// Executes all runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the rate is invalid or fewer than two samples are
    /// requested.
    pub fn execute(&self) -> Result<Vec<GeneratorRecord>> {
        let expected_mean = 1.0 / self.rate;
        (0..self.runs)
            .map(|run| -> Result<GeneratorRecord> {
                let mut source = ExponentialIntervals::seeded(self.seed.wrapping_add(run as u64));
                let samples = (0..self.size)
                    .map(|_| source.next_interval(self.rate))
                    .collect::<Result<Vec<_>>>()?;
                let summary =
                    SampleSummary::from_samples(&samples).ok_or(Error::InvalidParameter {
                        name: "size",
                        value: self.size as f64,
                    })?;
                Ok(GeneratorRecord {
                    run,
                    mean: summary.mean,
                    variance: summary.variance,
                    expected_mean,
                    expected_variance: expected_mean * expected_mean,
                })
            })
            .collect()
    }
}

/// An experiment that can be loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Experiment {
    /// See [`GeneratorCheck`].
    Generator(GeneratorCheck),
    /// See [`Sweep`].
    Sweep(Sweep),
}

impl Experiment {
    /// Executes the experiment and writes one CSV row per run to `writer`.
    /// If `plot_dir` is given, the charts of a sweep are drawn into it; a generator check has
    /// nothing to plot. Returns the number of written rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any run fails or the output cannot be written.
    pub fn execute<W: io::Write>(
        &self,
        writer: W,
        pb: Option<&ProgressBar>,
        plot_dir: Option<&Path>,
    ) -> Result<usize> {
        match self {
            Self::Generator(check) => {
                let records = check.execute()?;
                for record in &records {
                    log::info!(
                        "Run {}: mean={} (expected {}), variance={} (expected {})",
                        record.run,
                        record.mean,
                        record.expected_mean,
                        record.variance,
                        record.expected_variance
                    );
                }
                write_csv(writer, &records)?;
                Ok(records.len())
            }
            Self::Sweep(sweep) => {
                let records = sweep.execute(pb)?;
                for record in &records {
                    log::info!(
                        "rho={} T={} K={} run={}: En={} p_idle={} p_loss={}",
                        record.rho,
                        record.horizon,
                        record
                            .capacity
                            .map_or_else(|| String::from("inf"), |k| k.to_string()),
                        record.run,
                        record.mean_occupancy,
                        record.idle_probability,
                        record
                            .loss_probability
                            .map_or_else(|| String::from("-"), |p| p.to_string()),
                    );
                }
                write_csv(writer, &records)?;
                if let Some(dir) = plot_dir {
                    for path in plot::plot_records(&records, dir)? {
                        log::info!("Chart written to {}", path.display());
                    }
                }
                Ok(records.len())
            }
        }
    }
}

/// Writes `records` as CSV with a header row derived from the field names.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_csv<W: io::Write, T: Serialize>(writer: W, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Predefined experiments.
#[derive(Debug, PartialEq, Eq, Clone, Copy, strum::EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// Moments of 1000 exponential samples with rate 75, repeated 5 times.
    Exponential,
    /// M/M/1 with `ρ = 0.25` for horizons from 1000 to 5000 s.
    Mm1Stability,
    /// M/M/1 with `ρ` from 0.25 to 0.95.
    Mm1,
    /// M/M/1 with `ρ = 1.2`, repeated 5 times.
    Mm1Unstable,
    /// M/M/1/K with `ρ = 0.5` and `K = 50` for horizons from 1000 to 5000 s.
    Mm1kStability,
    /// M/M/1/K with `ρ` from 0.5 to 1.5 and `K` in 10, 25, 50.
    Mm1k,
}

/// Evenly spaced values from `start` to `end` inclusive, computed without accumulating rounding
/// errors.
fn steps(start: f64, end: f64, step: f64) -> Vec<f64> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = ((end - start) / step).round() as usize;
    (0..=count)
        .map(|i| ((start + i as f64 * step) * 1e6).round() / 1e6)
        .collect()
}

impl Preset {
    /// Builds the experiment.
    #[must_use]
    pub fn experiment(self) -> Experiment {
        let stability_horizons = vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0];
        let sweep = |horizons: Vec<f64>, traffic_intensities: Vec<f64>| Sweep {
            horizons,
            traffic_intensities,
            capacities: Vec::new(),
            runs: 1,
            seed: 0,
            packet_length: 2000.0,
            transmission_rate: MBPS,
            observer_rate: None,
        };
        match self {
            Self::Exponential => Experiment::Generator(GeneratorCheck {
                rate: 75.0,
                size: 1000,
                runs: 5,
                seed: 0,
            }),
            Self::Mm1Stability => Experiment::Sweep(sweep(stability_horizons, vec![0.25])),
            Self::Mm1 => Experiment::Sweep(sweep(vec![1000.0], steps(0.25, 0.95, 0.1))),
            Self::Mm1Unstable => Experiment::Sweep(Sweep {
                runs: 5,
                ..sweep(vec![2000.0], vec![1.2])
            }),
            Self::Mm1kStability => Experiment::Sweep(Sweep {
                capacities: vec![50],
                ..sweep(stability_horizons, vec![0.5])
            }),
            Self::Mm1k => Experiment::Sweep(Sweep {
                capacities: vec![10, 25, 50],
                ..sweep(vec![1000.0], steps(0.5, 1.5, 0.1))
            }),
        }
    }
}
