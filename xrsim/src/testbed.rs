use crate::{
    config::Config,
    report::{Report, Sink, SourceReport},
};
use anyhow::{Context as _, Result};
use std::time::Duration;
use tracing::{debug, info, trace};
use xrsim_core::{
    AccessPoint, Inbound, Packet, PacketIdGenerator, Scheduler, SimTime, SourceTimer, TimeQueue,
    TimerId, TrafficSource, source_rng,
};

/// The events of the testbed, in the global time queue.
#[derive(Debug)]
enum Event {
    /// a timer of the source at `index`
    Source { index: usize, timer: SourceTimer },
    /// a packet reaching the access point
    ApArrival(Inbound),
    /// a packet forwarded by the access point reaching the sink
    SinkArrival(Packet),
}

/// N traffic sources, each on its own channel towards one access point,
/// which forwards to one downstream sink.
///
/// The testbed owns the only clock of the simulation. Events are handled
/// one at a time, in time order.
///
/// ```
/// # use xrsim::{Config, Testbed};
/// # use xrsim_core::SimTime;
/// let config = Config::default_testbed()?;
/// let mut testbed = Testbed::new(&config)?;
///
/// let report = testbed.run_until(SimTime::from_secs_f64(0.1));
///
/// assert_eq!(report.end, SimTime::from_secs_f64(0.1));
/// assert!(report.access_point.forwarded > 0);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Testbed {
    now: SimTime,
    started: bool,
    events: TimeQueue<Event>,

    sources: Vec<TrafficSource>,
    access_point: AccessPoint,
    ap_latency: Duration,
    sink: Sink,
}

/// What a source sees of the global time queue: its own timers.
struct SourceScheduler<'a> {
    now: SimTime,
    index: usize,
    events: &'a mut TimeQueue<Event>,
}

impl Scheduler<SourceTimer> for SourceScheduler<'_> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_at(&mut self, time: SimTime, timer: SourceTimer) -> TimerId {
        debug_assert!(self.now <= time, "scheduling a timer in the past");
        self.events.push(
            time,
            Event::Source {
                index: self.index,
                timer,
            },
        )
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.events.cancel(id)
    }
}

impl Testbed {
    pub fn new(config: &Config) -> Result<Self> {
        let generator = PacketIdGenerator::new();

        let sources = config
            .sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                TrafficSource::with_sim_channel(
                    source,
                    generator.clone(),
                    source_rng(config.seed, index as u64),
                )
                .with_context(|| format!("Failed to build source `{}'", source.name))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            now: SimTime::ZERO,
            started: false,
            events: TimeQueue::new(),
            sources,
            access_point: AccessPoint::with_accepted_classes(
                config.access_point.classes.iter().copied(),
            ),
            ap_latency: config.access_point.latency,
            sink: Sink::default(),
        })
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn sources(&self) -> &[TrafficSource] {
        &self.sources
    }

    /// Handle every event due at or before `end`, then move the clock to
    /// `end`.
    ///
    /// The sources are initialized on the first call. Can be called again
    /// with a later `end` to continue the run.
    pub fn run_until(&mut self, end: SimTime) -> Report {
        if !self.started {
            self.start();
        }

        let mut handled = 0u64;
        while let Some((time, event)) = self.events.pop_until(end) {
            self.now = time;
            self.handle(event);
            handled += 1;
        }
        self.now = self.now.max(end);

        debug!(now = %self.now, handled, "run paused");
        self.report()
    }

    /// Stop every source: pending generations are cancelled and the
    /// packets still queued are released.
    pub fn shutdown(&mut self) -> Report {
        for (index, source) in self.sources.iter_mut().enumerate() {
            let mut scheduler = SourceScheduler {
                now: self.now,
                index,
                events: &mut self.events,
            };
            let released = source.shutdown(&mut scheduler);
            if !released.is_empty() {
                info!(source = source.name(), released = released.len(), "packets still queued at shutdown");
            }
        }

        self.report()
    }

    /// Hand a message that is not a packet to the access point at `time`.
    pub fn inject_message(&mut self, time: SimTime, name: impl Into<String>) {
        self.events.push(
            time.max(self.now),
            Event::ApArrival(Inbound::Other { name: name.into() }),
        );
    }

    pub fn report(&self) -> Report {
        Report {
            end: self.now,
            sources: self
                .sources
                .iter()
                .map(|source| SourceReport {
                    name: source.name().to_owned(),
                    class: source.class(),
                    stats: source.stats(),
                })
                .collect(),
            access_point: self.access_point.stats().clone(),
            classes: self.sink.report(),
        }
    }

    fn start(&mut self) {
        self.started = true;
        info!(sources = self.sources.len(), now = %self.now, "starting testbed");

        for index in 0..self.sources.len() {
            let mut scheduler = SourceScheduler {
                now: self.now,
                index,
                events: &mut self.events,
            };
            self.sources[index].initialize(&mut scheduler);
            self.collect_deliveries(index);
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Source { index, timer } => {
                trace!(now = %self.now, source = self.sources[index].name(), %timer, "source timer");
                let mut scheduler = SourceScheduler {
                    now: self.now,
                    index,
                    events: &mut self.events,
                };
                self.sources[index].handle(timer, &mut scheduler);
                self.collect_deliveries(index);
            }
            Event::ApArrival(inbound) => {
                if let Some(packet) = self.access_point.receive(inbound, self.now) {
                    self.events
                        .push(self.now + self.ap_latency, Event::SinkArrival(packet));
                }
            }
            Event::SinkArrival(packet) => {
                trace!(now = %self.now, packet = %packet.id(), "delivered");
                self.sink.receive(packet);
            }
        }
    }

    /// schedule the arrival at the access point of what the source at
    /// `index` just transmitted
    fn collect_deliveries(&mut self, index: usize) {
        for delivery in self.sources[index].channel_mut().take_deliveries() {
            self.events.push(
                delivery.arrival,
                Event::ApArrival(Inbound::Packet(delivery.packet)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> SimTime {
        SimTime::from_secs_f64(s)
    }

    #[test]
    fn run_is_resumable() {
        let config = Config::default_testbed().unwrap();
        let mut testbed = Testbed::new(&config).unwrap();

        let first = testbed.run_until(secs(0.5));
        let second = testbed.run_until(secs(1.0));

        assert_eq!(first.end, secs(0.5));
        assert_eq!(second.end, secs(1.0));
        assert!(second.access_point.forwarded > first.access_point.forwarded);
    }

    #[test]
    fn unknown_message_is_dropped_by_the_access_point() {
        let config = Config::default_testbed().unwrap();
        let mut testbed = Testbed::new(&config).unwrap();

        testbed.inject_message(secs(0.01), "beacon");
        let report = testbed.run_until(secs(0.02));

        assert_eq!(report.access_point.dropped, 1);
    }

    #[test]
    fn shutdown_stops_generation() {
        let config = Config::default_testbed().unwrap();
        let mut testbed = Testbed::new(&config).unwrap();

        testbed.run_until(secs(0.2));
        let stopped = testbed.shutdown();
        let later = testbed.run_until(secs(1.0));

        for (before, after) in stopped.sources.iter().zip(&later.sources) {
            assert_eq!(before.stats.packets_generated, after.stats.packets_generated);
            assert_eq!(after.stats.queue_len, 0);
        }
    }
}
