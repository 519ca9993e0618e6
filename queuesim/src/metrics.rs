use serde::Serialize;

use crate::{Error, QueueState, Result};

/// Running counters collected while dispatching events.
///
/// All counters only ever grow during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    arrivals: u64,
    departures: u64,
    losses: u64,
    observations: u64,
    idle_observations: u64,
    occupancy_sum: u64,
}

impl Metrics {
    pub(crate) fn record_arrival(&mut self) {
        self.arrivals += 1;
    }

    pub(crate) fn record_departure(&mut self) {
        self.departures += 1;
    }

    pub(crate) fn record_loss(&mut self) {
        self.losses += 1;
    }

    pub(crate) fn record_observation(&mut self, occupancy: usize, idle: bool) {
        self.observations += 1;
        self.occupancy_sum += occupancy as u64;
        if idle {
            self.idle_observations += 1;
        }
    }

    /// Number of packets that arrived, including the dropped ones.
    #[must_use]
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    /// Number of packets that finished transmission.
    #[must_use]
    pub fn departures(&self) -> u64 {
        self.departures
    }

    /// Number of packets dropped at arrival because the buffer was full.
    #[must_use]
    pub fn losses(&self) -> u64 {
        self.losses
    }

    /// Number of observer events.
    #[must_use]
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Number of observer events that found the server idle.
    #[must_use]
    pub fn idle_observations(&self) -> u64 {
        self.idle_observations
    }

    /// Sum of occupancies seen by observer events.
    #[must_use]
    pub fn occupancy_sum(&self) -> u64 {
        self.occupancy_sum
    }

    fn observed(&self) -> Result<f64> {
        if self.observations == 0 {
            Err(Error::DegenerateRun)
        } else {
            Ok(self.observations as f64)
        }
    }

    /// Time-average number of packets in the system, `E[N]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateRun`] if there were no observations.
    pub fn mean_occupancy(&self) -> Result<f64> {
        Ok(self.occupancy_sum as f64 / self.observed()?)
    }

    /// Proportion of time the server is idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateRun`] if there were no observations.
    pub fn idle_probability(&self) -> Result<f64> {
        Ok(self.idle_observations as f64 / self.observed()?)
    }

    /// Proportion of arriving packets that were dropped. Zero if nothing arrived.
    #[must_use]
    pub fn loss_probability(&self) -> f64 {
        if self.arrivals == 0 {
            0.0
        } else {
            self.losses as f64 / self.arrivals as f64
        }
    }
}

/// Final outcome of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Report {
    /// Number of packets that arrived, including the dropped ones.
    pub arrivals: u64,
    /// Number of packets that finished transmission.
    pub departures: u64,
    /// Number of dropped packets; always zero for an unbounded buffer.
    pub losses: u64,
    /// Number of observer events.
    pub observations: u64,
    /// Number of observer events that found the server idle.
    pub idle_observations: u64,
    /// Number of packets left in the system at the end of the run.
    pub occupancy: u64,
    /// Time-average number of packets in the system, `E[N]`.
    #[serde(rename = "En")]
    pub mean_occupancy: f64,
    /// Proportion of time the server is idle.
    #[serde(rename = "p_idle")]
    pub idle_probability: f64,
    /// Proportion of dropped packets; `None` for an unbounded buffer.
    #[serde(rename = "p_loss")]
    pub loss_probability: Option<f64>,
}

impl Report {
    /// Derives the final metrics from the counters and the final queue state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateRun`] if there were no observations.
    pub fn new(metrics: &Metrics, state: &QueueState) -> Result<Self> {
        Ok(Self {
            arrivals: metrics.arrivals(),
            departures: metrics.departures(),
            losses: metrics.losses(),
            observations: metrics.observations(),
            idle_observations: metrics.idle_observations(),
            occupancy: state.occupancy() as u64,
            mean_occupancy: metrics.mean_occupancy()?,
            idle_probability: metrics.idle_probability()?,
            loss_probability: state
                .capacity()
                .limit()
                .map(|_| metrics.loss_probability()),
        })
    }
}
