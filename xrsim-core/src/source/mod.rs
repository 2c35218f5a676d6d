//! # Traffic sources
//!
//! A [`TrafficSource`] drives a recurring generation timer and owns the
//! [`OutboundLinkQueue`] in front of its outbound [`Channel`]. Every
//! source runs the same admission and drain loop, the [`ArrivalPolicy`]
//! decides when packets are generated and how large they are.
//!
//! Sources never read a global clock: every handler takes the
//! [`Scheduler`] of the runtime, which gives the current time and takes
//! back the [`SourceTimer`]s the source wants delivered later.
//!
//! # Example
//!
//! ```
//! # use xrsim_core::{
//! #     Bandwidth, ManualScheduler, PacketIdGenerator, PolicyConfig, SimTime, SourceConfig,
//! #     SourceTimer, TrafficClass, TrafficSource, source_rng,
//! # };
//! # use std::time::Duration;
//! let config = SourceConfig {
//!     name: "control".to_owned(),
//!     class: TrafficClass::Control,
//!     policy: PolicyConfig::constant(0.1, 100),
//!     datarate: Bandwidth::new(54_000_000),
//!     latency: Duration::ZERO,
//! };
//! let mut source = TrafficSource::with_sim_channel(&config, PacketIdGenerator::new(), source_rng(42, 0))?;
//! let mut scheduler = ManualScheduler::<SourceTimer>::new();
//!
//! source.initialize(&mut scheduler);
//! while let Some(timer) = scheduler.advance_until(SimTime::from_secs_f64(1.0)) {
//!     source.handle(timer, &mut scheduler);
//! }
//!
//! // one packet every 10ms on average
//! assert!(source.stats().transmitted > 80);
//! # Ok::<(), xrsim_core::ConfigError>(())
//! ```

mod config;
mod frame;
mod policy;

pub use self::{
    config::{ConfigError, PolicyConfig, SourceConfig},
    frame::split_frame,
    policy::{ArrivalPolicy, Generation, Phase},
};
use crate::{
    Admission, Channel, DrainOutcome, FrameTag, OutboundLinkQueue, Packet, PacketFactory,
    PacketIdGenerator, Scheduler, SimChannel, SimTime, SourceStats, TimerId, TrafficClass,
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// The two timers a source schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTimer {
    /// time to generate the next packet (or frame)
    Generate,
    /// time to give the head of the outbound link queue another chance
    Drain,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown source timer `{0}'")]
pub struct UnknownTimer(pub String);

/// The state of a [`TrafficSource`].
///
/// ```text
///            generate / drain, queue empty
///              ┌──────┐
///              ▼      │
///  ──────►  [ Idle ] ─┘
///            │    ▲
///  deferred  │    │ last packet transmitted
///            ▼    │
///         [ Draining ] ◄─┐ generate / retry
///              │         │
///              └─────────┘
///
///  shutdown from any state ──► [ Stopped ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// nothing waiting in the outbound link queue
    Idle,
    /// packets are waiting for the channel, drains are pending
    Draining,
    /// shut down, late timers are ignored
    Stopped,
}

/// A traffic source and its outbound link.
pub struct TrafficSource<C = SimChannel> {
    name: String,
    policy: ArrivalPolicy,
    rng: ChaChaRng,
    factory: PacketFactory,

    queue: OutboundLinkQueue,
    channel: C,

    state: SourceState,
    generation_timer: Option<TimerId>,
    frames: u64,

    stats: SourceStats,
}

/// The random number generator of the source at `index` in a run seeded
/// with `seed`.
///
/// Every source draws from its own stream so adding a source to a testbed
/// does not change what the other sources draw.
pub fn source_rng(seed: u64, index: u64) -> ChaChaRng {
    let mut rng = ChaChaRng::seed_from_u64(seed);
    rng.set_stream(index);
    rng
}

impl SourceTimer {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Drain => "drain",
        }
    }
}

impl fmt::Display for SourceTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTimer {
    type Err = UnknownTimer;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate" => Ok(Self::Generate),
            "drain" => Ok(Self::Drain),
            unknown => Err(UnknownTimer(unknown.to_owned())),
        }
    }
}

impl TrafficSource<SimChannel> {
    /// build a source transmitting on a [`SimChannel`] set up from the
    /// `datarate` and `latency` of the configuration
    pub fn with_sim_channel(
        config: &SourceConfig,
        generator: PacketIdGenerator,
        rng: ChaChaRng,
    ) -> Result<Self, ConfigError> {
        let channel = SimChannel::new(config.datarate, config.latency);
        Self::new(config, channel, generator, rng)
    }
}

impl<C: Channel> TrafficSource<C> {
    /// build a source from its configuration
    ///
    /// Fails if the configuration does not pass
    /// [`SourceConfig::validate`]. The outbound link queue drains at the
    /// datarate of the `channel`.
    pub fn new(
        config: &SourceConfig,
        channel: C,
        generator: PacketIdGenerator,
        rng: ChaChaRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = ArrivalPolicy::new(&config.name, &config.policy)?;

        Ok(Self {
            name: config.name.clone(),
            policy,
            rng,
            factory: PacketFactory::new(generator, config.class),
            queue: OutboundLinkQueue::new(channel.datarate()),
            channel,
            state: SourceState::Idle,
            generation_timer: None,
            frames: 0,
            stats: SourceStats::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> TrafficClass {
        self.factory.class()
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn queue(&self) -> &OutboundLinkQueue {
        &self.queue
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// snapshot of the counters of the source
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            backlog_bytes: self.queue.backlog_bytes(),
            queue_len: self.queue.len(),
            ..self.stats.clone()
        }
    }

    /// Start the source: generate the first packet (or frame) and arm the
    /// generation timer.
    pub fn initialize<S>(&mut self, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        if self.state == SourceState::Stopped {
            warn!(source = %self.name, "not initializing a stopped source");
            return;
        }

        let now = scheduler.now();
        let interval = self.policy.next_interval(&mut self.rng, Phase::Initial);
        debug!(source = %self.name, %now, ?interval, "initializing");

        self.generate(now, scheduler);
        self.generation_timer = Some(scheduler.schedule_at(now + interval, SourceTimer::Generate));
    }

    /// The generation timer fired: re-arm it and generate the next packet
    /// (or frame).
    pub fn on_generation_timer<S>(&mut self, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        if self.state == SourceState::Stopped {
            debug!(source = %self.name, "generation timer on a stopped source");
            return;
        }

        let now = scheduler.now();
        let interval = self.policy.next_interval(&mut self.rng, Phase::Steady);
        debug!(source = %self.name, %now, ?interval, "generation timer");

        self.generation_timer = Some(scheduler.schedule_at(now + interval, SourceTimer::Generate));
        self.generate(now, scheduler);
    }

    /// A drain timer fired: give the head of the queue another chance.
    pub fn on_drain_timer<S>(&mut self, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        if self.state == SourceState::Stopped {
            debug!(source = %self.name, "drain timer on a stopped source");
            return;
        }

        let now = scheduler.now();
        match self.queue.drain(&mut self.channel, now) {
            DrainOutcome::Empty => {
                debug!(source = %self.name, %now, "drain timer on an empty queue");
                self.stats.empty_drains += 1;
            }
            DrainOutcome::Transmitted => {
                self.stats.transmitted += 1;
            }
            DrainOutcome::Retry { drain_at } => {
                debug!(source = %self.name, %now, %drain_at, "channel still busy");
                self.stats.retries += 1;
                scheduler.schedule_at(drain_at, SourceTimer::Drain);
            }
        }

        self.update_state();
    }

    /// dispatch a timer to its handler
    pub fn handle<S>(&mut self, timer: SourceTimer, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        match timer {
            SourceTimer::Generate => self.on_generation_timer(scheduler),
            SourceTimer::Drain => self.on_drain_timer(scheduler),
        }
    }

    /// dispatch a timer by its name, unknown names are logged and ignored
    pub fn handle_named_timer<S>(&mut self, name: &str, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        match name.parse::<SourceTimer>() {
            Ok(timer) => self.handle(timer, scheduler),
            Err(error) => warn!(source = %self.name, %error, "ignoring timer"),
        }
    }

    /// Stop the source.
    ///
    /// The generation timer is cancelled and the packets still waiting in
    /// the queue are handed back. Drain timers still pending are left to
    /// fire, they are ignored.
    pub fn shutdown<S>(&mut self, scheduler: &mut S) -> Vec<Packet>
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        if let Some(timer) = self.generation_timer.take() {
            scheduler.cancel(timer);
        }

        let released = self.queue.drain_all();
        self.stats.released += released.len() as u64;
        self.state = SourceState::Stopped;

        debug!(source = %self.name, released = released.len(), "shut down");
        released
    }

    fn generate<S>(&mut self, now: SimTime, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        match self.policy.next_generation(&mut self.rng) {
            Generation::Packet(size) => {
                let packet = self.factory.make(size, now);
                self.count_generated(&packet);
                self.admit(packet, now, scheduler);
            }
            Generation::Frame(sizes) => {
                let frame = self.frames;
                self.frames += 1;
                self.stats.frames_generated += 1;

                let fragments = sizes.len() as u32;
                trace!(source = %self.name, frame, fragments, "frame generated");
                for (fragment, size) in (0..).zip(sizes) {
                    let tag = FrameTag {
                        frame,
                        fragment,
                        fragments,
                    };
                    let packet = self.factory.make_fragment(size, now, tag);
                    self.count_generated(&packet);

                    let drain_at = self.queue.enqueue_burst(packet, now);
                    self.stats.deferred += 1;
                    scheduler.schedule_at(drain_at, SourceTimer::Drain);
                }
            }
        }

        self.update_state();
    }

    fn admit<S>(&mut self, packet: Packet, now: SimTime, scheduler: &mut S)
    where
        S: Scheduler<SourceTimer> + ?Sized,
    {
        match self.queue.admit(packet, &mut self.channel, now) {
            Admission::Transmitted => {
                self.stats.transmitted_immediately += 1;
                self.stats.transmitted += 1;
            }
            Admission::Deferred { drain_at } => {
                self.stats.deferred += 1;
                scheduler.schedule_at(drain_at, SourceTimer::Drain);
            }
        }
    }

    fn count_generated(&mut self, packet: &Packet) {
        self.stats.packets_generated += 1;
        self.stats.bytes_generated += packet.bytes_size();
    }

    fn update_state(&mut self) {
        let state = if self.queue.is_empty() {
            SourceState::Idle
        } else {
            SourceState::Draining
        };

        if state != self.state {
            trace!(source = %self.name, from = ?self.state, to = ?state, "state");
            self.state = state;
        }
    }
}

impl<C> fmt::Debug for TrafficSource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrafficSource")
            .field("name", &self.name)
            .field("class", &self.factory.class())
            .field("state", &self.state)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}
