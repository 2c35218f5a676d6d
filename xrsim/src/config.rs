//! # Testbed configuration
//!
//! A testbed is described in YAML:
//!
//! ```yaml
//! seed: 42
//! duration: 2s
//! access_point:
//!   latency: 100us
//!   classes: [xr_data, hmd_data]   # optional, every class by default
//! sources:
//!   - name: xr
//!     class: xr_data
//!     kind: frame_burst
//!     frame_rate: 60
//!     data_rate: 30mbps
//!     channel:
//!       datarate: 54mbps
//!       latency: 1ms
//! ```
//!
//! The source `kind` is one of `background`, `constant`, `gamma` or
//! `frame_burst`, each with its own parameters:
//!
//! | kind          | parameters |
//! |---------------|------------|
//! | `background`  | `load`, `max_datarate`, `average_packet_size` (optional) |
//! | `constant`    | `sample_rate`, `packet_size`, `interval_scale`, `initial_std`, `steady_std` (last three optional) |
//! | `gamma`       | `sample_rate`, `packet_size` |
//! | `frame_burst` | `frame_rate`, `data_rate` |
//!
//! Sample rates are in samples per millisecond. The configuration is read
//! once, before the run starts, and converted into the typed
//! configurations of `xrsim-core`.

use anyhow::{Context as _, Result, ensure};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use xrsim_core::{Bandwidth, PolicyConfig, SourceConfig, TextDuration, TrafficClass, defaults};

const DEFAULT_TESTBED: &str = include_str!("../testbeds/default.yaml");

/// A validated testbed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub seed: u64,
    pub duration: Duration,
    pub access_point: AccessPointConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessPointConfig {
    /// delay between the access point and the downstream sink
    pub latency: Duration,
    /// traffic classes forwarded downstream
    pub classes: Vec<TrafficClass>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    seed: u64,
    duration: String,
    #[serde(default)]
    access_point: RawAccessPoint,
    sources: Vec<RawSource>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccessPoint {
    latency: Option<String>,
    classes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: String,
    class: String,
    #[serde(flatten)]
    policy: RawPolicy,
    channel: RawChannel,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawPolicy {
    Background {
        load: f64,
        max_datarate: String,
        average_packet_size: Option<u64>,
    },
    Constant {
        sample_rate: f64,
        packet_size: u64,
        interval_scale: Option<f64>,
        initial_std: Option<f64>,
        steady_std: Option<f64>,
    },
    Gamma {
        sample_rate: f64,
        packet_size: u64,
    },
    FrameBurst {
        frame_rate: f64,
        data_rate: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    datarate: String,
    latency: Option<String>,
}

impl Config {
    /// the built-in testbed: 3 background sources, one XR, one HMD, one
    /// control and one haptic source
    pub fn default_testbed() -> Result<Self> {
        Self::from_yaml(DEFAULT_TESTBED).context("Failed to load the default testbed")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read `{}'", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid testbed `{}'", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        Self::try_from(raw)
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = anyhow::Error;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let duration = parse_duration(&raw.duration).context("Invalid `duration'")?;
        let access_point =
            AccessPointConfig::try_from(raw.access_point).context("Invalid `access_point'")?;

        let sources = raw
            .sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let name = source.name.clone();
                SourceConfig::try_from(source)
                    .with_context(|| format!("Invalid source #{index} (`{name}')"))
            })
            .collect::<Result<Vec<_>>>()?;

        ensure!(!sources.is_empty(), "No sources configured");
        for (index, source) in sources.iter().enumerate() {
            ensure!(
                !sources[..index].iter().any(|other| other.name == source.name),
                "Source name `{}' is used more than once",
                source.name
            );
        }

        Ok(Self {
            seed: raw.seed,
            duration,
            access_point,
            sources,
        })
    }
}

impl TryFrom<RawAccessPoint> for AccessPointConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawAccessPoint) -> Result<Self> {
        let latency = match raw.latency {
            Some(latency) => parse_duration(&latency).context("Invalid `latency'")?,
            None => Duration::ZERO,
        };
        let classes = match raw.classes {
            Some(classes) => classes
                .iter()
                .map(|class| class.parse::<TrafficClass>())
                .collect::<Result<Vec<_>, _>>()?,
            None => TrafficClass::ALL.to_vec(),
        };

        Ok(Self { latency, classes })
    }
}

impl TryFrom<RawSource> for SourceConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawSource) -> Result<Self> {
        let class = raw.class.parse::<TrafficClass>()?;
        let policy = PolicyConfig::try_from(raw.policy)?;
        let datarate = parse_bandwidth(&raw.channel.datarate).context("Invalid channel `datarate'")?;
        let latency = match raw.channel.latency {
            Some(latency) => parse_duration(&latency).context("Invalid channel `latency'")?,
            None => Duration::ZERO,
        };

        let config = SourceConfig {
            name: raw.name,
            class,
            policy,
            datarate,
            latency,
        };
        config.validate()?;

        Ok(config)
    }
}

impl TryFrom<RawPolicy> for PolicyConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawPolicy) -> Result<Self> {
        let policy = match raw {
            RawPolicy::Background {
                load,
                max_datarate,
                average_packet_size,
            } => PolicyConfig::UniformExponential {
                load,
                max_datarate: parse_bandwidth(&max_datarate).context("Invalid `max_datarate'")?,
                average_packet_size: average_packet_size
                    .unwrap_or(defaults::DEFAULT_AVERAGE_PACKET_SIZE),
            },
            RawPolicy::Constant {
                sample_rate,
                packet_size,
                interval_scale,
                initial_std,
                steady_std,
            } => PolicyConfig::ConstantTruncNormal {
                sample_rate,
                packet_size,
                interval_scale: interval_scale.unwrap_or(defaults::CONSTANT_INTERVAL_SCALE),
                initial_std: initial_std.unwrap_or(defaults::CONSTANT_INITIAL_STD),
                steady_std: steady_std.unwrap_or(defaults::CONSTANT_STEADY_STD),
            },
            RawPolicy::Gamma {
                sample_rate,
                packet_size,
            } => PolicyConfig::Gamma {
                sample_rate,
                packet_size,
            },
            RawPolicy::FrameBurst {
                frame_rate,
                data_rate,
            } => PolicyConfig::FrameBurst {
                frame_rate,
                data_rate: parse_bandwidth(&data_rate).context("Invalid `data_rate'")?,
            },
        };

        Ok(policy)
    }
}

fn parse_duration(s: &str) -> Result<Duration> {
    Ok(s.parse::<TextDuration>()?.into_duration())
}

fn parse_bandwidth(s: &str) -> Result<Bandwidth> {
    s.parse()
}
