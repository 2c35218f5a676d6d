use anyhow::{Result, anyhow, bail, ensure};
use core::fmt;
use logos::{Lexer, Logos};
use std::{ops, str::FromStr, time::Duration};

/// An instant on the simulated clock.
///
/// The simulation starts at [`SimTime::ZERO`] and only ever moves forward.
/// The resolution is the nanosecond, which is enough to represent the
/// transmission time of a single byte on a 1 Tbps channel.
///
/// ```
/// # use xrsim_core::SimTime;
/// # use std::time::Duration;
/// let t = SimTime::from_secs_f64(10.0) + Duration::from_millis(12);
/// assert_eq!(t.to_string(), "10.012s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    #[inline(always)]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// convert a number of seconds into a [`SimTime`]
    ///
    /// negative and NaN values are clamped to [`SimTime::ZERO`], the value
    /// is rounded to the nearest nanosecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        let nanos = (secs * 1e9).round();
        if nanos >= u64::MAX as f64 {
            Self::MAX
        } else {
            Self(nanos as u64)
        }
    }

    #[inline(always)]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// time elapsed since `earlier`, saturating to zero if `earlier` is
    /// in the future
    pub fn saturating_duration_since(self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl ops::Add<Duration> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(duration_nanos(rhs)))
    }
}

impl ops::AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl ops::Sub<SimTime> for SimTime {
    type Output = Duration;
    fn sub(self, rhs: SimTime) -> Self::Output {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 / 1_000_000_000;
        let nanos = self.0 % 1_000_000_000;
        if nanos == 0 {
            return write!(f, "{secs}s");
        }
        let frac = format!("{nanos:09}");
        write!(f, "{secs}.{}s", frac.trim_end_matches('0'))
    }
}

/// A textual [`Duration`], e.g. `"1s 500ms"`.
///
/// Used for the configuration of the testbed (simulation length, channel
/// latency). Accepted units are `ns`, `us` (or `μs`), `ms`, `s` and `m`.
/// Several terms are summed up.
///
/// ```
/// # use xrsim_core::TextDuration;
/// # use std::time::Duration;
/// let d: TextDuration = "1s 250ms".parse().unwrap();
/// assert_eq!(d.into_duration(), Duration::from_millis(1_250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextDuration(Duration);

impl TextDuration {
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    #[inline]
    pub fn into_duration(self) -> Duration {
        self.0
    }
}

impl From<Duration> for TextDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl fmt::Display for TextDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for TextDuration {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut total: Option<Duration> = None;

        while let Some(next) = lex.next() {
            let number: Token = next.map_err(|()| anyhow!("Failed to parse: {s}"))?;

            ensure!(
                number == Token::Value,
                "Expecting duration to starts with number. Cannot parse {s}"
            );
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                bail!("Expecting a measure, failed to parse: {s}")
            };
            let duration = match measure {
                Token::NanoSeconds => Duration::from_nanos(number),
                Token::MicroSeconds => Duration::from_micros(number),
                Token::MilliSeconds => Duration::from_millis(number),
                Token::Seconds => Duration::from_secs(number),
                Token::Minutes => {
                    let Some(secs) = number.checked_mul(60) else {
                        bail!("Duration `{s}' is too long")
                    };
                    Duration::from_secs(secs)
                }
                Token::Value => bail!("Failed to parse `{s}', expecting a measure."),
            };

            total = match total {
                None => Some(duration),
                Some(total) => match total.checked_add(duration) {
                    Some(total) => Some(total),
                    None => bail!("Duration `{s}' is too long"),
                },
            };
        }

        let Some(total) = total else {
            bail!("Empty duration")
        };

        Ok(Self(total))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logos_lexer() {
        let mut lex = Token::lexer("1ns");

        assert_eq!(lex.next(), Some(Ok(Token::Value)));
        assert_eq!(lex.span(), 0..1);
        assert_eq!(lex.slice(), "1");

        assert_eq!(lex.next(), Some(Ok(Token::NanoSeconds)));
        assert_eq!(lex.span(), 1..3);
        assert_eq!(lex.slice(), "ns");
    }

    #[test]
    fn parse() {
        let TextDuration(duration) = "123ms".parse().unwrap();
        assert_eq!(duration.as_millis(), 123);

        let TextDuration(duration) = "1s 2000ms 3000000us".parse().unwrap();
        assert_eq!(duration.as_secs(), 6);
    }

    #[test]
    fn parse_errors() {
        assert!("".parse::<TextDuration>().is_err());
        assert!("12".parse::<TextDuration>().is_err());
        assert!("ms".parse::<TextDuration>().is_err());
    }

    #[test]
    fn parse_too_long() {
        let minutes = format!("{}m", u64::MAX / 2);
        let error = minutes.parse::<TextDuration>().unwrap_err();
        assert_eq!(error.to_string(), format!("Duration `{minutes}' is too long"));

        let sum = format!("{}s {}s", u64::MAX, u64::MAX);
        let error = sum.parse::<TextDuration>().unwrap_err();
        assert_eq!(error.to_string(), format!("Duration `{sum}' is too long"));

        let TextDuration(duration) = format!("{}s", u64::MAX).parse().unwrap();
        assert_eq!(duration.as_secs(), u64::MAX);
    }

    #[test]
    fn from_secs_f64() {
        assert_eq!(SimTime::from_secs_f64(10.012).as_nanos(), 10_012_000_000);
        assert_eq!(SimTime::from_secs_f64(-1.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs_f64(f64::INFINITY), SimTime::MAX);
    }

    #[test]
    fn arithmetic() {
        let t = SimTime::from_nanos(1_000);
        assert_eq!(t + Duration::from_nanos(500), SimTime::from_nanos(1_500));
        assert_eq!(SimTime::MAX + Duration::from_secs(1), SimTime::MAX);
        assert_eq!(SimTime::from_nanos(1_500) - t, Duration::from_nanos(500));
        assert_eq!(t - SimTime::from_nanos(1_500), Duration::ZERO);
    }

    #[test]
    fn display() {
        assert_eq!(SimTime::ZERO.to_string(), "0s");
        assert_eq!(SimTime::from_secs_f64(10.05).to_string(), "10.05s");
        assert_eq!(SimTime::from_nanos(1).to_string(), "0.000000001s");
    }
}
