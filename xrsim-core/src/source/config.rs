use crate::{Bandwidth, TrafficClass, defaults, variate::VariateError};
use std::time::Duration;
use thiserror::Error;

/// Invalid parameters for a traffic source.
///
/// Returned when the source is built: a source never starts with
/// parameters that would make its arrival process meaningless.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("source `{name}': {parameter} must be a finite positive number, got {value}")]
    NotPositive {
        name: String,
        parameter: &'static str,
        value: f64,
    },
    #[error("source `{name}': {parameter} must be a finite non-negative number, got {value}")]
    Negative {
        name: String,
        parameter: &'static str,
        value: f64,
    },
    #[error("source `{name}': {parameter} must not be zero")]
    Zero {
        name: String,
        parameter: &'static str,
    },
    #[error("source `{name}': average frame size of {size} bytes is larger than the maximum of {max} bytes")]
    FrameTooLarge { name: String, size: f64, max: f64 },
    #[error("source `{name}': {source}")]
    Distribution {
        name: String,
        #[source]
        source: VariateError,
    },
}

/// Arrival process and packet sizes of a traffic source.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyConfig {
    /// Exponential inter-arrivals, packet sizes uniform in `[64, 1542]`.
    ///
    /// The arrival rate is `load * max_datarate / (8 * average_packet_size)`.
    UniformExponential {
        load: f64,
        max_datarate: Bandwidth,
        average_packet_size: u64,
    },
    /// Truncated normal inter-arrivals around `interval_scale / sample_rate`
    /// seconds, fixed packet size.
    ///
    /// The first draw uses `initial_std`, the following ones `steady_std`.
    ConstantTruncNormal {
        sample_rate: f64,
        packet_size: u64,
        interval_scale: f64,
        initial_std: f64,
        steady_std: f64,
    },
    /// Gamma distributed inter-arrivals, fixed packet size.
    Gamma { sample_rate: f64, packet_size: u64 },
    /// One video frame per generation, split in fragments.
    FrameBurst { frame_rate: f64, data_rate: Bandwidth },
}

/// Everything needed to build a [`TrafficSource`](crate::TrafficSource).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub class: TrafficClass,
    pub policy: PolicyConfig,
    /// datarate of the outbound channel
    pub datarate: Bandwidth,
    /// propagation delay of the outbound channel
    pub latency: Duration,
}

impl PolicyConfig {
    /// uniform sizes with the default average packet size
    pub fn background(load: f64, max_datarate: Bandwidth) -> Self {
        Self::UniformExponential {
            load,
            max_datarate,
            average_packet_size: defaults::DEFAULT_AVERAGE_PACKET_SIZE,
        }
    }

    /// constant sizes with the default interval constants
    pub fn constant(sample_rate: f64, packet_size: u64) -> Self {
        Self::ConstantTruncNormal {
            sample_rate,
            packet_size,
            interval_scale: defaults::CONSTANT_INTERVAL_SCALE,
            initial_std: defaults::CONSTANT_INITIAL_STD,
            steady_std: defaults::CONSTANT_STEADY_STD,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UniformExponential { .. } => "background",
            Self::ConstantTruncNormal { .. } => "constant",
            Self::Gamma { .. } => "gamma",
            Self::FrameBurst { .. } => "frame_burst",
        }
    }
}

impl SourceConfig {
    /// check the parameters before a source is built from them
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = Check(&self.name);

        check.non_zero_rate("datarate", self.datarate)?;

        match &self.policy {
            PolicyConfig::UniformExponential {
                load,
                max_datarate,
                average_packet_size,
            } => {
                check.positive("load", *load)?;
                check.non_zero_rate("max_datarate", *max_datarate)?;
                check.packet_size("average_packet_size", *average_packet_size)?;
            }
            PolicyConfig::ConstantTruncNormal {
                sample_rate,
                packet_size,
                interval_scale,
                initial_std,
                steady_std,
            } => {
                check.positive("sample_rate", *sample_rate)?;
                check.packet_size("packet_size", *packet_size)?;
                check.positive("interval_scale", *interval_scale)?;
                check.non_negative("initial_std", *initial_std)?;
                check.non_negative("steady_std", *steady_std)?;
            }
            PolicyConfig::Gamma {
                sample_rate,
                packet_size,
            } => {
                check.positive("sample_rate", *sample_rate)?;
                check.packet_size("packet_size", *packet_size)?;
            }
            PolicyConfig::FrameBurst {
                frame_rate,
                data_rate,
            } => {
                check.positive("frame_rate", *frame_rate)?;
                check.non_zero_rate("data_rate", *data_rate)?;
                check.frame_size(data_rate.as_f64() / (8.0 * frame_rate))?;
            }
        }

        Ok(())
    }
}

struct Check<'a>(&'a str);

impl Check<'_> {
    fn positive(&self, parameter: &'static str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::NotPositive {
                name: self.0.to_owned(),
                parameter,
                value,
            })
        }
    }

    fn non_negative(&self, parameter: &'static str, value: f64) -> Result<(), ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Negative {
                name: self.0.to_owned(),
                parameter,
                value,
            })
        }
    }

    fn non_zero_rate(&self, parameter: &'static str, value: Bandwidth) -> Result<(), ConfigError> {
        if value == Bandwidth::ZERO {
            Err(ConfigError::Zero {
                name: self.0.to_owned(),
                parameter,
            })
        } else {
            Ok(())
        }
    }

    fn packet_size(&self, parameter: &'static str, size: u64) -> Result<(), ConfigError> {
        if size == 0 {
            Err(ConfigError::Zero {
                name: self.0.to_owned(),
                parameter,
            })
        } else {
            Ok(())
        }
    }

    fn frame_size(&self, size: f64) -> Result<(), ConfigError> {
        if size <= defaults::MAX_AVERAGE_FRAME_SIZE {
            Ok(())
        } else {
            Err(ConfigError::FrameTooLarge {
                name: self.0.to_owned(),
                size,
                max: defaults::MAX_AVERAGE_FRAME_SIZE,
            })
        }
    }
}
