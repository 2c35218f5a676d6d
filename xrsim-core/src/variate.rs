//! Random variates used by the arrival processes.
//!
//! Every generator is built from its parameters only, the parameters are
//! checked once when it is built. Values are drawn with the random number
//! generator given to [`Distribution::sample`]. The generator is owned by
//! the caller (one per traffic source) so that a run is reproducible from
//! its seed.
//!
//! ```
//! # use xrsim_core::variate;
//! # use rand_chacha::ChaChaRng;
//! # use rand_core::SeedableRng as _;
//! # use rand_distr::Distribution as _;
//! let interval = variate::exponential(0.010)?;
//! let mut rng = ChaChaRng::seed_from_u64(42);
//!
//! assert!(interval.sample(&mut rng) >= 0.0);
//! # Ok::<(), variate::VariateError>(())
//! ```

use rand_core::Rng;
use rand_distr::{Distribution, Exp, Gamma, Normal, Uniform};
use thiserror::Error;

/// Invalid parameters for one of the distributions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariateError {
    #[error("exponential distribution expects a finite positive mean, got {mean}")]
    Exponential { mean: f64 },
    #[error("normal distribution expects a finite mean and a finite non-negative std, got mean={mean} std={std}")]
    Normal { mean: f64, std: f64 },
    #[error("truncated normal distribution expects a positive mean, got {mean}")]
    TruncatedNormal { mean: f64 },
    #[error("gamma distribution expects finite positive shape and scale, got shape={shape} scale={scale}")]
    Gamma { shape: f64, scale: f64 },
    #[error("uniform distribution expects low <= high, got [{low}, {high}]")]
    Uniform { low: u64, high: u64 },
}

/// Exponential distribution of the given `mean`.
pub fn exponential(mean: f64) -> Result<Exp<f64>, VariateError> {
    if !(mean.is_finite() && mean > 0.0) {
        return Err(VariateError::Exponential { mean });
    }
    Exp::new(1.0 / mean).map_err(|_| VariateError::Exponential { mean })
}

/// Normal distribution truncated to the non-negative values.
pub fn truncnormal(mean: f64, std: f64) -> Result<TruncNormal, VariateError> {
    TruncNormal::new(mean, std)
}

/// Gamma distribution with shape `k` and scale `θ`.
pub fn gamma(shape: f64, scale: f64) -> Result<Gamma<f64>, VariateError> {
    let invalid = || VariateError::Gamma { shape, scale };
    if !(shape.is_finite() && shape > 0.0 && scale.is_finite() && scale > 0.0) {
        return Err(invalid());
    }
    Gamma::new(shape, scale).map_err(|_| invalid())
}

/// Uniform distribution of the integers in `[low, high]` (both inclusive).
pub fn uniform_int(low: u64, high: u64) -> Result<Uniform<u64>, VariateError> {
    Uniform::new_inclusive(low, high).map_err(|_| VariateError::Uniform { low, high })
}

/// A normal distribution sampled again until a non-negative value comes
/// out.
///
/// The mean has to be positive so that the loop terminates quickly (at
/// least half of the draws are accepted).
#[derive(Debug, Clone, Copy)]
pub struct TruncNormal(Normal<f64>);

impl TruncNormal {
    pub fn new(mean: f64, std: f64) -> Result<Self, VariateError> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(VariateError::TruncatedNormal { mean });
        }
        if !(std.is_finite() && std >= 0.0) {
            return Err(VariateError::Normal { mean, std });
        }
        Normal::new(mean, std)
            .map(Self)
            .map_err(|_| VariateError::Normal { mean, std })
    }

    /// mean of the underlying normal distribution
    pub fn mean(&self) -> f64 {
        self.0.mean()
    }

    /// standard deviation of the underlying normal distribution
    pub fn std(&self) -> f64 {
        self.0.std_dev()
    }
}

impl Distribution<f64> for TruncNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        loop {
            let value = self.0.sample(rng);
            if value >= 0.0 {
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    const DRAWS: usize = 20_000;

    fn mean_of<D: Distribution<f64>>(distribution: &D, seed: u64) -> f64 {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        (0..DRAWS).map(|_| distribution.sample(&mut rng)).sum::<f64>() / DRAWS as f64
    }

    #[test]
    fn exponential_mean() {
        let mean = mean_of(&exponential(0.010).unwrap(), 1);
        assert!((mean - 0.010).abs() < 0.001, "mean was {mean}");
    }

    #[test]
    fn exponential_invalid() {
        assert!(exponential(0.0).is_err());
        assert!(exponential(-1.0).is_err());
        assert_eq!(
            exponential(f64::INFINITY).unwrap_err(),
            VariateError::Exponential {
                mean: f64::INFINITY
            }
        );
    }

    #[test]
    fn truncnormal_never_negative() {
        // a standard deviation larger than the mean yields plenty of
        // negative draws to reject
        let distribution = truncnormal(0.001, 0.004).unwrap();
        let mut rng = ChaChaRng::seed_from_u64(2);
        for _ in 0..DRAWS {
            assert!(distribution.sample(&mut rng) >= 0.0);
        }
    }

    #[test]
    fn truncnormal_mean_with_small_std() {
        let distribution = truncnormal(1.0 / 60.0, 2e-3).unwrap();
        assert_eq!(distribution.std(), 2e-3);

        let mean = mean_of(&distribution, 3);
        assert!((mean - 1.0 / 60.0).abs() < 1e-4, "mean was {mean}");
    }

    #[test]
    fn truncnormal_invalid() {
        assert!(truncnormal(0.0, 1.0).is_err());
        assert!(truncnormal(1.0, -1.0).is_err());
        assert!(truncnormal(1.0, f64::NAN).is_err());
    }

    #[test]
    fn truncnormal_zero_std_is_constant() {
        let mut rng = ChaChaRng::seed_from_u64(3);
        assert_eq!(truncnormal(0.25, 0.0).unwrap().sample(&mut rng), 0.25);
    }

    #[test]
    fn gamma_mean() {
        // mean = shape * scale
        let mean = mean_of(&gamma(4.0, 2.5).unwrap(), 4);
        assert!((mean - 10.0).abs() < 0.2, "mean was {mean}");
    }

    #[test]
    fn gamma_invalid() {
        assert!(gamma(0.0, 1.0).is_err());
        assert!(gamma(1.0, 0.0).is_err());
        assert!(gamma(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn uniform_int_bounds() {
        let distribution = uniform_int(64, 70).unwrap();
        let mut rng = ChaChaRng::seed_from_u64(5);
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..DRAWS {
            let value = distribution.sample(&mut rng);
            assert!((64..=70).contains(&value));
            seen_low |= value == 64;
            seen_high |= value == 70;
        }
        assert!(seen_low && seen_high, "both bounds are inclusive");
    }

    #[test]
    fn uniform_int_invalid() {
        assert_eq!(
            uniform_int(10, 9).unwrap_err(),
            VariateError::Uniform { low: 10, high: 9 }
        );
    }
}
