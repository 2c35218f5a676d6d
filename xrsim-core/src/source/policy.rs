use super::{
    config::{ConfigError, PolicyConfig},
    frame::split_frame,
};
use crate::{
    defaults,
    variate::{self, TruncNormal, VariateError},
};
use rand_core::Rng;
use rand_distr::{Distribution, Exp, Gamma, Uniform};
use std::time::Duration;

/// Which inter-arrival draw is being made.
///
/// Only the constant-size policy makes a difference: its first draw is
/// more spread than the following ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Steady,
}

/// What one generation event produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// one packet of the given size
    Packet(u64),
    /// one video frame, already split in fragment sizes
    Frame(Vec<u64>),
}

/// Arrival process and packet sizes of a traffic source.
///
/// Built once from a validated [`PolicyConfig`]: the distributions are
/// constructed upfront so drawing from them cannot fail.
#[derive(Debug, Clone)]
pub enum ArrivalPolicy {
    UniformExponential {
        interval: Exp<f64>,
        size: Uniform<u64>,
    },
    ConstantTruncNormal {
        initial: TruncNormal,
        steady: TruncNormal,
        packet_size: u64,
    },
    Gamma {
        interval: Gamma<f64>,
        packet_size: u64,
    },
    FrameBurst {
        interval: TruncNormal,
        frame_size: TruncNormal,
    },
}

impl ArrivalPolicy {
    /// build the policy of the source `name`
    pub fn new(name: &str, config: &PolicyConfig) -> Result<Self, ConfigError> {
        let invalid = |source: VariateError| ConfigError::Distribution {
            name: name.to_owned(),
            source,
        };

        let policy = match *config {
            PolicyConfig::UniformExponential {
                load,
                max_datarate,
                average_packet_size,
            } => {
                let rate = load * max_datarate.as_f64() / (8.0 * average_packet_size as f64);
                let size =
                    variate::uniform_int(defaults::MIN_PACKET_SIZE, defaults::MAX_PACKET_SIZE);
                Self::UniformExponential {
                    interval: variate::exponential(1.0 / rate).map_err(invalid)?,
                    size: size.map_err(invalid)?,
                }
            }
            PolicyConfig::ConstantTruncNormal {
                sample_rate,
                packet_size,
                interval_scale,
                initial_std,
                steady_std,
            } => {
                let mean = interval_scale / sample_rate;
                Self::ConstantTruncNormal {
                    initial: variate::truncnormal(mean, initial_std).map_err(invalid)?,
                    steady: variate::truncnormal(mean, steady_std).map_err(invalid)?,
                    packet_size,
                }
            }
            PolicyConfig::Gamma {
                sample_rate,
                packet_size,
            } => {
                let scale = defaults::GAMMA_TARGET_STD * sample_rate.sqrt();
                let shape = (1.0 / sample_rate) / scale;
                Self::Gamma {
                    interval: variate::gamma(shape, scale).map_err(invalid)?,
                    packet_size,
                }
            }
            PolicyConfig::FrameBurst {
                frame_rate,
                data_rate,
            } => {
                let average_frame_size = data_rate.as_f64() / (8.0 * frame_rate);
                Self::FrameBurst {
                    interval: variate::truncnormal(1.0 / frame_rate, defaults::FRAME_INTERVAL_STD)
                        .map_err(invalid)?,
                    frame_size: variate::truncnormal(
                        average_frame_size,
                        defaults::FRAME_SIZE_STD_RATIO * average_frame_size,
                    )
                    .map_err(invalid)?,
                }
            }
        };

        Ok(policy)
    }

    /// draw the time until the next generation event
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R, phase: Phase) -> Duration {
        let secs = match self {
            Self::UniformExponential { interval, .. } => interval.sample(rng),
            Self::ConstantTruncNormal {
                initial, steady, ..
            } => match phase {
                Phase::Initial => initial.sample(rng),
                Phase::Steady => steady.sample(rng),
            },
            Self::Gamma { interval, .. } => defaults::GAMMA_INTERVAL_SCALE * interval.sample(rng),
            Self::FrameBurst { interval, .. } => interval.sample(rng),
        };

        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// draw the packet (or the frame) of one generation event
    pub fn next_generation<R: Rng + ?Sized>(&self, rng: &mut R) -> Generation {
        match self {
            Self::UniformExponential { size, .. } => Generation::Packet(size.sample(rng)),
            Self::ConstantTruncNormal { packet_size, .. } | Self::Gamma { packet_size, .. } => {
                Generation::Packet(*packet_size)
            }
            Self::FrameBurst { frame_size, .. } => {
                Generation::Frame(split_frame(frame_size.sample(rng)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bandwidth;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    const DRAWS: u32 = 10_000;

    fn intervals(policy: &ArrivalPolicy, phase: Phase) -> Vec<f64> {
        let mut rng = ChaChaRng::seed_from_u64(7);
        (0..DRAWS)
            .map(|_| policy.next_interval(&mut rng, phase).as_secs_f64())
            .collect()
    }

    fn mean_interval(policy: &ArrivalPolicy, phase: Phase) -> f64 {
        intervals(policy, phase).iter().sum::<f64>() / f64::from(DRAWS)
    }

    fn std_interval(policy: &ArrivalPolicy, phase: Phase) -> f64 {
        let intervals = intervals(policy, phase);
        let mean = intervals.iter().sum::<f64>() / f64::from(DRAWS);
        let variance = intervals
            .iter()
            .map(|interval| (interval - mean).powi(2))
            .sum::<f64>()
            / f64::from(DRAWS - 1);
        variance.sqrt()
    }

    #[test]
    fn background_rate() {
        // 0.5 * 8_030_000 / (8 * 803) = 625 packets per second
        let policy = ArrivalPolicy::new(
            "bkg",
            &PolicyConfig::background(0.5, Bandwidth::new(8_030_000)),
        )
        .unwrap();

        let mean = mean_interval(&policy, Phase::Steady);
        assert!((mean - 1.0 / 625.0).abs() < 1e-4, "mean was {mean}");
    }

    #[test]
    fn background_sizes_are_bounded() {
        let policy = ArrivalPolicy::new(
            "bkg",
            &PolicyConfig::background(0.5, Bandwidth::new(54_000_000)),
        )
        .unwrap();
        let mut rng = ChaChaRng::seed_from_u64(8);

        for _ in 0..DRAWS {
            let Generation::Packet(size) = policy.next_generation(&mut rng) else {
                panic!("background sources produce single packets")
            };
            assert!((64..=1_542).contains(&size));
        }
    }

    #[test]
    fn constant_initial_and_steady_std() {
        let policy = ArrivalPolicy::new("ctrl", &PolicyConfig::constant(0.1, 100)).unwrap();

        let ArrivalPolicy::ConstantTruncNormal {
            initial,
            steady,
            packet_size,
        } = &policy
        else {
            panic!("expected a constant-size policy")
        };
        assert_eq!(*packet_size, 100);
        assert!((initial.mean() - 0.01).abs() < 1e-12);
        assert!((steady.mean() - 0.01).abs() < 1e-12);
        assert_eq!(initial.std(), 4e-3);
        assert_eq!(steady.std(), 1e-3);

        let mean = mean_interval(&policy, Phase::Steady);
        assert!((mean - 0.01).abs() < 1e-4, "mean was {mean}");

        // the truncation at 0 is negligible 2.5 std away from the mean
        let initial_std = std_interval(&policy, Phase::Initial);
        assert!((initial_std - 4e-3).abs() < 3e-4, "initial std was {initial_std}");
        let steady_std = std_interval(&policy, Phase::Steady);
        assert!((steady_std - 1e-3).abs() < 5e-5, "steady std was {steady_std}");

        let mut rng = ChaChaRng::seed_from_u64(9);
        assert_eq!(policy.next_generation(&mut rng), Generation::Packet(100));
    }

    #[test]
    fn gamma_mean_interval() {
        // mean = 1e-3 * shape * scale = 1e-3 / sample_rate
        let policy = ArrivalPolicy::new(
            "hmd",
            &PolicyConfig::Gamma {
                sample_rate: 1.0 / 15.0,
                packet_size: 200,
            },
        )
        .unwrap();

        let mean = mean_interval(&policy, Phase::Steady);
        assert!((mean - 0.015).abs() < 1e-3, "mean was {mean}");
    }

    #[test]
    fn gamma_std() {
        // scale = 0.5 * sqrt(rate), shape = (1 / rate) / scale
        // std = 1e-3 * sqrt(shape) * scale = 1e-3 * sqrt(0.5 / sqrt(rate))
        let sample_rate: f64 = 1.0 / 15.0;
        let policy = ArrivalPolicy::new(
            "hmd",
            &PolicyConfig::Gamma {
                sample_rate,
                packet_size: 200,
            },
        )
        .unwrap();

        let expected = 1e-3 * (0.5 / sample_rate.sqrt()).sqrt();
        let std = std_interval(&policy, Phase::Steady);
        assert!(
            (std - expected).abs() < 0.05 * expected,
            "std was {std}, expected {expected}"
        );
    }

    #[test]
    fn frame_burst() {
        // 60 fps at 7.2Mbps: 15_000 bytes per frame on average
        let policy = ArrivalPolicy::new(
            "xr",
            &PolicyConfig::FrameBurst {
                frame_rate: 60.0,
                data_rate: Bandwidth::new(7_200_000),
            },
        )
        .unwrap();
        assert!(matches!(policy, ArrivalPolicy::FrameBurst { .. }));

        let mean = mean_interval(&policy, Phase::Initial);
        assert!((mean - 1.0 / 60.0).abs() < 1e-4, "mean was {mean}");

        let mut rng = ChaChaRng::seed_from_u64(10);
        let Generation::Frame(sizes) = policy.next_generation(&mut rng) else {
            panic!("frame-burst sources produce frames")
        };
        assert!(sizes.len() >= 8 && sizes.len() <= 14, "{} fragments", sizes.len());
        assert!(sizes[..sizes.len() - 1].iter().all(|size| *size == 1_542));
    }
}
