use crate::{Error, Result};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::Distribution;

/// Produces time intervals between consecutive events of a process.
///
/// The engine is generic over this trait so that the random stream is an explicit resource owned
/// by each simulation rather than a process-wide global.
pub trait IntervalSource {
    /// Draws the time until the next event of a process occurring at the given `rate`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `rate` is not a valid rate, see [`check_rate`].
    fn next_interval(&mut self, rate: f64) -> Result<f64>;
}

/// Checks that `rate` is positive and finite, and that its mean interval `1 / rate` is finite.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] reporting `name` otherwise.
pub fn check_rate(name: &'static str, rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 && rate.recip().is_finite() {
        Ok(rate)
    } else {
        Err(Error::InvalidParameter { name, value: rate })
    }
}

/// Exponential distribution with mean `1 / rate`, sampled by inverse transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    /// Constructs a new distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `rate` is not a valid rate, see [`check_rate`].
    pub fn new(rate: f64) -> Result<Self> {
        check_rate("rate", rate).map(|rate| Self { rate })
    }

    /// The rate parameter.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Distribution<f64> for Exponential {
    /// Draws `u` uniformly from `[0, 1)` and returns `-ln(u) / rate`.
    /// A draw of exactly zero has no finite logarithm and is resampled, as is a draw whose interval
    /// underflows to zero. An interval too long to represent is returned as infinity: the event
    /// never happens.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        loop {
            let u: f64 = rng.gen();
            if u > 0.0 {
                let interval = -u.ln() / self.rate;
                if interval > 0.0 {
                    return interval;
                }
            }
            log::trace!("Rejected uniform draw {}", u);
        }
    }
}

/// Interval source backed by its own pseudo-random stream.
#[derive(Debug, Clone)]
pub struct ExponentialIntervals<R> {
    rng: R,
}

impl<R: Rng> ExponentialIntervals<R> {
    /// Constructs a source drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// The underlying random stream.
    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl ExponentialIntervals<ChaChaRng> {
    /// Constructs a source with a ChaCha stream initialized from `seed`.
    /// Two sources created from the same seed produce identical intervals.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaChaRng::seed_from_u64(seed))
    }
}

impl<R: Rng> IntervalSource for ExponentialIntervals<R> {
    fn next_interval(&mut self, rate: f64) -> Result<f64> {
        Ok(Exponential::new(rate)?.sample(&mut self.rng))
    }
}

/// Mean and unbiased variance of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Sample mean.
    pub mean: f64,
    /// Sample variance with `n - 1` in the denominator.
    pub variance: f64,
}

impl SampleSummary {
    /// Summarizes `samples`. Returns `None` if fewer than two values are given.
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(Self { mean, variance })
    }
}
