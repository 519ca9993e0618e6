//! Deterministic random streams for unit tests.

#![warn(
    missing_docs,
    rust_2018_idioms,
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

use rand::RngCore;

/// Number of mantissa bits used by `rand` when sampling a standard `f64`.
const PRECISION: u32 = 53;

/// A random number generator replaying a fixed sequence of uniform draws.
///
/// Each value `u` is encoded so that sampling the standard `f64` distribution
/// (e.g., `rng.gen::<f64>()`) returns exactly `u`, as long as `u` is a multiple of `2^-53`
/// in `[0, 1)`. Values like `0.0`, `0.5`, or `0.25` are therefore reproduced exactly, which makes
/// it possible to drive inverse-transform samplers into their boundary cases.
///
/// The sequence is replayed cyclically.
///
/// # Examples
///
/// ```
/// # use rand::Rng;
/// # use testing::UniformSequenceRng;
/// let mut rng = UniformSequenceRng::new(vec![0.0, 0.5]);
/// assert_eq!(rng.gen::<f64>(), 0.0);
/// assert_eq!(rng.gen::<f64>(), 0.5);
/// assert_eq!(rng.gen::<f64>(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct UniformSequenceRng {
    values: Vec<u64>,
    position: usize,
}

impl UniformSequenceRng {
    /// Constructs a generator replaying `uniforms`.
    ///
    /// # Panics
    ///
    /// Panics if `uniforms` is empty or any value lies outside of `[0, 1)`.
    #[must_use]
    pub fn new(uniforms: Vec<f64>) -> Self {
        assert!(!uniforms.is_empty(), "at least one uniform value required");
        let scale = (1_u64 << PRECISION) as f64;
        let values = uniforms
            .into_iter()
            .map(|u| {
                assert!((0.0..1.0).contains(&u), "uniform value out of range: {}", u);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bits = (u * scale) as u64;
                bits << (64 - PRECISION)
            })
            .collect();
        Self {
            values,
            position: 0,
        }
    }

    /// Number of values drawn so far.
    #[must_use]
    pub fn draws(&self) -> usize {
        self.position
    }
}

impl RngCore for UniformSequenceRng {
    fn next_u32(&mut self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let value = (self.next_u64() >> 32) as u32;
        value
    }

    fn next_u64(&mut self) -> u64 {
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
