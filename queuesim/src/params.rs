use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::{check_rate, Capacity, Error, Result};

/// Observation rate multiplier used when no explicit observation rate is given.
pub const DEFAULT_OBSERVER_FACTOR: f64 = 5.0;

/// Input parameters of a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Simulated time `T`, in seconds.
    pub horizon: f64,
    /// Traffic intensity `ρ`. Values above 1 describe an unstable queue.
    pub traffic_intensity: f64,
    /// Average packet length `L`, in bits.
    pub packet_length: f64,
    /// Transmission rate of the output link `C`, in bits per second.
    pub transmission_rate: f64,
    /// Buffer capacity `K`; `None` for an unbounded buffer.
    #[serde(default)]
    pub capacity: Option<i64>,
    /// Rate of observer events. Defaults to five times the larger of arrival and service rates.
    #[serde(default)]
    pub observer_rate: Option<f64>,
}

fn positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

impl SimulationParameters {
    /// Parameters of an unbounded queue with the default observation rate.
    #[must_use]
    pub fn new(
        horizon: f64,
        traffic_intensity: f64,
        packet_length: f64,
        transmission_rate: f64,
    ) -> Self {
        Self {
            horizon,
            traffic_intensity,
            packet_length,
            transmission_rate,
            capacity: None,
            observer_rate: None,
        }
    }

    /// Limits the buffer to `capacity` packets.
    #[must_use]
    pub fn with_capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Overrides the observation rate.
    #[must_use]
    pub fn with_observer_rate(mut self, rate: f64) -> Self {
        self.observer_rate = Some(rate);
        self
    }

    /// Checks all parameters.
    ///
    /// The horizon may be zero, in which case the run collects no observations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for the first parameter found out of range.
    pub fn validate(&self) -> Result<()> {
        if !(self.horizon.is_finite() && self.horizon >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "horizon",
                value: self.horizon,
            });
        }
        positive("traffic_intensity", self.traffic_intensity)?;
        positive("packet_length", self.packet_length)?;
        positive("transmission_rate", self.transmission_rate)?;
        check_rate("service_rate", self.service_rate())?;
        check_rate("arrival_rate", self.arrival_rate())?;
        check_rate("observer_rate", self.observation_rate())?;
        self.buffer_capacity()?;
        Ok(())
    }

    /// Service rate `μ = C / L`, in packets per second.
    #[must_use]
    pub fn service_rate(&self) -> f64 {
        self.transmission_rate / self.packet_length
    }

    /// Arrival rate `λ = ρ μ`, in packets per second.
    #[must_use]
    pub fn arrival_rate(&self) -> f64 {
        self.traffic_intensity * self.service_rate()
    }

    /// Rate of observer events `γ`.
    #[must_use]
    pub fn observation_rate(&self) -> f64 {
        self.observer_rate.unwrap_or_else(|| {
            DEFAULT_OBSERVER_FACTOR * self.arrival_rate().max(self.service_rate())
        })
    }

    /// Buffer capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the capacity is negative.
    pub fn buffer_capacity(&self) -> Result<Capacity> {
        self.capacity
            .map(|k| {
                usize::try_from(k).map_err(|_| Error::InvalidParameter {
                    name: "capacity",
                    value: k as f64,
                })
            })
            .transpose()
            .map(Capacity::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn params() -> SimulationParameters {
        SimulationParameters::new(1000.0, 0.25, 2000.0, 1_000_000.0)
    }

    #[rstest]
    fn test_derived_rates(params: SimulationParameters) {
        assert!(params.validate().is_ok());
        assert!(approx_eq!(f64, params.service_rate(), 500.0, ulps = 2));
        assert!(approx_eq!(f64, params.arrival_rate(), 125.0, ulps = 2));
        assert!(approx_eq!(f64, params.observation_rate(), 2500.0, ulps = 2));
        assert!(approx_eq!(
            f64,
            params.with_observer_rate(10.0).observation_rate(),
            10.0,
            ulps = 2
        ));
        assert_eq!(params.buffer_capacity().unwrap(), Capacity::Unbounded);
    }

    #[rstest]
    fn test_overloaded_observation_rate(params: SimulationParameters) {
        let params = SimulationParameters {
            traffic_intensity: 1.5,
            ..params
        };
        assert!(approx_eq!(f64, params.observation_rate(), 3750.0, ulps = 2));
    }

    #[rstest]
    fn test_zero_horizon_is_valid(params: SimulationParameters) {
        let params = SimulationParameters {
            horizon: 0.0,
            ..params
        };
        assert!(params.validate().is_ok());
    }

    #[rstest]
    fn test_invalid(params: SimulationParameters) {
        let invalid = |p: SimulationParameters| match p.validate() {
            Err(Error::InvalidParameter { name, .. }) => Some(name),
            _ => None,
        };
        assert_eq!(
            invalid(SimulationParameters {
                horizon: -1.0,
                ..params
            }),
            Some("horizon")
        );
        assert_eq!(
            invalid(SimulationParameters {
                horizon: f64::NAN,
                ..params
            }),
            Some("horizon")
        );
        assert_eq!(
            invalid(SimulationParameters {
                traffic_intensity: 0.0,
                ..params
            }),
            Some("traffic_intensity")
        );
        assert_eq!(
            invalid(SimulationParameters {
                packet_length: -2000.0,
                ..params
            }),
            Some("packet_length")
        );
        assert_eq!(
            invalid(SimulationParameters {
                transmission_rate: 0.0,
                ..params
            }),
            Some("transmission_rate")
        );
        assert_eq!(
            invalid(params.with_observer_rate(0.0)),
            Some("observer_rate")
        );
        assert_eq!(invalid(params.with_capacity(-1)), Some("capacity"));
        assert_eq!(
            params.with_capacity(0).buffer_capacity().unwrap(),
            Capacity::Bounded(0)
        );
    }

    #[test]
    fn test_rates_without_finite_mean() {
        // λ = 1e-300 * 1e-20 underflows to a subnormal whose reciprocal overflows.
        let params = SimulationParameters::new(10.0, 1e-300, 1.0, 1e-20).with_observer_rate(10.0);
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter {
                name: "arrival_rate",
                ..
            })
        ));
        let params = SimulationParameters::new(10.0, 0.5, 1.0, 1.0).with_observer_rate(1e-320);
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter {
                name: "observer_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_deserialize() {
        let params: SimulationParameters = serde_json::from_str(
            r#"{"horizon":1000,"traffic_intensity":0.5,"packet_length":2000,"transmission_rate":1000000,"capacity":10}"#,
        )
        .unwrap();
        assert_eq!(
            params,
            SimulationParameters::new(1000.0, 0.5, 2000.0, 1_000_000.0).with_capacity(10)
        );
    }
}
