//! Single-server queue simulation.
//!
//! Estimates steady-state metrics of M/M/1 and M/M/1/K queues by discrete-event simulation.
//! A run is driven by three self-perpetuating event chains: packet arrivals, departures, and
//! observer events that sample the queue at random instants. See [`Simulation`] for details.
//!
//! # Examples
//!
//! ```
//! # use queuesim::{ExponentialIntervals, Simulation, SimulationParameters};
//! # fn main() -> queuesim::Result<()> {
//! let params = SimulationParameters::new(100.0, 0.25, 2000.0, 1_000_000.0);
//! let mut simulation = Simulation::new(params, ExponentialIntervals::seeded(17))?;
//! let report = simulation.execute()?;
//! assert_eq!(
//!     report.arrivals,
//!     report.departures + report.losses + report.occupancy
//! );
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod engine;
pub use engine::Simulation;

mod event;
pub use event::{Event, EventKind, EventQueue};

pub mod experiment;

pub mod plot;

mod interval;
pub use interval::{check_rate, Exponential, ExponentialIntervals, IntervalSource, SampleSummary};

mod metrics;
pub use metrics::{Metrics, Report};

mod params;
pub use params::SimulationParameters;

mod state;
pub use state::{Capacity, QueueState, ServerStatus};

/// Error type encompassing all simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter is out of its valid range, e.g., a non-positive rate.
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Value that was rejected.
        value: f64,
    },
    /// No observations were collected, so time averages are undefined.
    #[error("no observations collected before the horizon; time averages are undefined")]
    DegenerateRun,
    /// Attempted to extract an event from an empty queue.
    #[error("event queue is empty")]
    EmptyQueue,
    /// Failed to write CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to draw a chart.
    #[error("plot error: {0}")]
    Plot(String),
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
