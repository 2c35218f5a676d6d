use anyhow::{bail, ensure};
use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};

/// The data rate of a channel, in bits per second.
///
/// The textual representation uses decimal multiples (`1kbps` is
/// `1_000` bits per second) as the datarate of a channel is expressed
/// in the configuration of the testbed.
///
/// # Example
///
/// ```
/// # use xrsim_core::Bandwidth;
/// # use std::time::Duration;
/// let bw: Bandwidth = "1mbps".parse().unwrap();
/// assert_eq!(bw.bits_per_sec(), 1_000_000);
///
/// // time needed to push 1500 bytes on the channel
/// assert_eq!(bw.transmission_time(1_500), Duration::from_millis(12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

const K: u64 = 1_000;
const M: u64 = 1_000 * 1_000;
const G: u64 = 1_000 * 1_000 * 1_000;

impl Bandwidth {
    pub const ZERO: Self = Self(0);

    #[inline(always)]
    pub const fn new(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    #[inline(always)]
    pub const fn bits_per_sec(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Time needed to clear `bytes` on a channel of this bandwidth.
    ///
    /// Computed as `ceil(bytes * 8 / bps)`, at the nanosecond. A zero
    /// bandwidth never clears anything: [`Duration::MAX`] is returned.
    ///
    /// ```
    /// # use xrsim_core::Bandwidth;
    /// # use std::time::Duration;
    /// let bw = Bandwidth::new(1_000_000);
    /// assert_eq!(bw.transmission_time(0), Duration::ZERO);
    /// assert_eq!(bw.transmission_time(1_500), Duration::from_micros(12_000));
    /// assert_eq!(Bandwidth::ZERO.transmission_time(1), Duration::MAX);
    /// ```
    pub fn transmission_time(&self, bytes: u64) -> Duration {
        if bytes == 0 {
            return Duration::ZERO;
        }
        if self.0 == 0 {
            return Duration::MAX;
        }
        let bits = (bytes as u128) * 8;
        let bps = self.0 as u128;
        let nanos = (bits * 1_000_000_000).div_ceil(bps);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.0;

        if v < K || v % K != 0 {
            write!(f, "{v}bps")
        } else if v < M || v % M != 0 {
            write!(f, "{}kbps", v / K)
        } else if v < G || v % G != 0 {
            write!(f, "{}mbps", v / M)
        } else {
            write!(f, "{}gbps", v / G)
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum BandwidthToken {
    #[regex("bps")]
    Bps,
    #[regex("kbps")]
    Kbps,
    #[regex("mbps")]
    Mbps,
    #[regex("gbps")]
    Gbps,

    #[regex("[0-9]+")]
    Value,
}

impl FromStr for Bandwidth {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, BandwidthToken>::new(s);

        let Some(Ok(BandwidthToken::Value)) = lex.next() else {
            bail!("Expecting to parse a number")
        };
        let number: u64 = lex.slice().parse()?;
        let Some(Ok(token)) = lex.next() else {
            bail!("Expecting to parse a unit")
        };
        let multiplier = match token {
            BandwidthToken::Bps => 1,
            BandwidthToken::Kbps => K,
            BandwidthToken::Mbps => M,
            BandwidthToken::Gbps => G,
            BandwidthToken::Value => bail!("Expecting to parse a unit (bps, kbps, ...)"),
        };
        let Some(bps) = number.checked_mul(multiplier) else {
            bail!("Bandwidth `{s}' is too large")
        };

        ensure!(
            lex.next().is_none(),
            "Not expecting any other tokens to parse a bandwidth"
        );

        Ok(Self(bps))
    }
}
