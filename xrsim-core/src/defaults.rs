//! Constants of the traffic models.
//!
//! These are the values the testbed has always been run with. Some of
//! them can be overridden in the [`SourceConfig`], the others are part of
//! the traffic models themselves.
//!
//! [`SourceConfig`]: crate::SourceConfig

/// Smallest packet generated by the uniform-size (background) source.
pub const MIN_PACKET_SIZE: u64 = 64;

/// Largest packet generated by the uniform-size (background) source.
///
/// `1500` bytes of payload plus [`ETHERNET_OVERHEAD`].
pub const MAX_PACKET_SIZE: u64 = MTU_PAYLOAD + ETHERNET_OVERHEAD;

/// Default average packet size used to derive the arrival rate of the
/// uniform-size source: the midpoint of `[64, 1542]`.
///
/// ```
/// # use xrsim_core::defaults::*;
/// assert_eq!(DEFAULT_AVERAGE_PACKET_SIZE, (MIN_PACKET_SIZE + MAX_PACKET_SIZE) / 2);
/// ```
pub const DEFAULT_AVERAGE_PACKET_SIZE: u64 = 803;

/// Payload carried by every fragment of a video frame.
pub const MTU_PAYLOAD: u64 = 1_500;

/// Header bytes added to every fragment of a video frame.
pub const ETHERNET_OVERHEAD: u64 = 42;

/// Size floor of the first fragment of a video frame.
pub const FIRST_FRAGMENT_MIN_SIZE: u64 = 64;

/// Relative standard deviation of the size of a video frame around
/// `data_rate / (8 * frame_rate)`.
pub const FRAME_SIZE_STD_RATIO: f64 = 0.105;

/// Largest average frame size (bytes) a frame-burst source accepts,
/// about 11k fragments per frame.
pub const MAX_AVERAGE_FRAME_SIZE: f64 = 16.0 * 1024.0 * 1024.0;

/// Standard deviation of the frame inter-arrival time (seconds).
pub const FRAME_INTERVAL_STD: f64 = 2e-3;

/// Scale applied to `1 / sample_rate` for the constant-size source:
/// the sample rate is configured per millisecond.
pub const CONSTANT_INTERVAL_SCALE: f64 = 1e-3;

/// Standard deviation (seconds) of the very first inter-arrival draw of
/// the constant-size source.
pub const CONSTANT_INITIAL_STD: f64 = 4e-3;

/// Standard deviation (seconds) of the inter-arrival draws of the
/// constant-size source once it is running.
pub const CONSTANT_STEADY_STD: f64 = 1e-3;

/// Target standard deviation of the gamma-distributed source.
pub const GAMMA_TARGET_STD: f64 = 0.5;

/// Scale applied to the gamma draw to obtain seconds.
pub const GAMMA_INTERVAL_SCALE: f64 = 1e-3;
