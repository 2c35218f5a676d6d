use std::{fmt, time::Duration};
use xrsim_core::{AccessPointStats, Packet, SimTime, SourceStats, TrafficClass};

/// The outcome of a run.
#[derive(Debug, Clone)]
pub struct Report {
    /// simulated time at which the report was taken
    pub end: SimTime,
    pub sources: Vec<SourceReport>,
    pub access_point: AccessPointStats,
    /// packets that reached the downstream sink, per traffic class
    pub classes: Vec<ClassReport>,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub class: TrafficClass,
    pub stats: SourceStats,
}

/// Packets of one traffic class received by the downstream sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassReport {
    pub class: TrafficClass,
    pub delivered: u64,
    pub bytes: u64,
    /// mean time from generation to the arrival at the access point
    pub mean_delay: Duration,
    /// longest time from generation to the arrival at the access point
    pub max_delay: Duration,
}

/// The downstream end of the access point: keeps per-class counters of
/// what it receives.
#[derive(Debug, Clone, Default)]
pub(crate) struct Sink {
    classes: [ClassAccumulator; TrafficClass::ALL.len()],
}

#[derive(Debug, Clone, Copy, Default)]
struct ClassAccumulator {
    delivered: u64,
    bytes: u64,
    total_delay: u128,
    max_delay: Duration,
}

impl Sink {
    pub(crate) fn receive(&mut self, packet: Packet) {
        let delay = packet
            .ap_arrival()
            .map(|arrival| arrival - packet.generated_at())
            .unwrap_or_default();

        let class = &mut self.classes[packet.class().index()];
        class.delivered += 1;
        class.bytes += packet.bytes_size();
        class.total_delay += delay.as_nanos();
        class.max_delay = class.max_delay.max(delay);
    }

    pub(crate) fn report(&self) -> Vec<ClassReport> {
        TrafficClass::ALL
            .into_iter()
            .zip(self.classes.iter())
            .filter(|(_, accumulator)| accumulator.delivered > 0)
            .map(|(class, accumulator)| ClassReport {
                class,
                delivered: accumulator.delivered,
                bytes: accumulator.bytes,
                mean_delay: mean(accumulator.total_delay, accumulator.delivered),
                max_delay: accumulator.max_delay,
            })
            .collect()
    }
}

fn mean(total_nanos: u128, count: u64) -> Duration {
    let nanos = total_nanos / u128::from(count.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl Report {
    pub fn class(&self, class: TrafficClass) -> Option<&ClassReport> {
        self.classes.iter().find(|report| report.class == class)
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulated time: {}", self.end)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<16} {:<13} {:>9} {:>11} {:>9} {:>8} {:>11} {:>7} {:>9}",
            "source", "class", "generated", "immediate", "deferred", "retries", "transmitted", "queued", "backlog"
        )?;
        for source in &self.sources {
            let stats = &source.stats;
            writeln!(
                f,
                "{:<16} {:<13} {:>9} {:>11} {:>9} {:>8} {:>11} {:>7} {:>9}",
                source.name,
                source.class,
                stats.packets_generated,
                stats.transmitted_immediately,
                stats.deferred,
                stats.retries,
                stats.transmitted,
                stats.queue_len,
                stats.backlog_bytes,
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "access point: {} received ({} bits), {} forwarded, {} dropped",
            self.access_point.packets_received,
            self.access_point.bits_received,
            self.access_point.forwarded,
            self.access_point.dropped,
        )?;

        writeln!(f)?;
        writeln!(
            f,
            "{:<13} {:>9} {:>12} {:>12} {:>12}",
            "class", "delivered", "bytes", "mean delay", "max delay"
        )?;
        for class in &self.classes {
            writeln!(
                f,
                "{:<13} {:>9} {:>12} {:>12} {:>12}",
                class.class,
                class.delivered,
                class.bytes,
                format!("{:?}", class.mean_delay),
                format!("{:?}", class.max_delay),
            )?;
        }

        Ok(())
    }
}
