use crate::{Bandwidth, Packet, SimTime};
use std::{collections::VecDeque, time::Duration};

/// The outbound channel of a traffic source.
///
/// The channel owns its busy state: the link queue only queries whether
/// a transmission is in progress and when it finishes, and hands packets
/// over when the channel is free.
///
/// Implementors decide what becomes of a transmitted packet. The
/// [`SimChannel`] keeps them until the runtime collects them.
pub trait Channel {
    /// `true` while a transmission is in progress at `now`
    fn is_busy(&self, now: SimTime) -> bool;

    /// time at which the current (or last) transmission finishes
    fn finish_time(&self) -> SimTime;

    /// the data rate of the channel
    fn datarate(&self) -> Bandwidth;

    /// take ownership of `packet` and start transmitting it at `now`
    ///
    /// Fire and forget: callers are expected to check [`Channel::is_busy`]
    /// before handing over a packet.
    fn transmit(&mut self, packet: Packet, now: SimTime);
}

/// A packet that went through a [`SimChannel`].
#[derive(Debug)]
pub struct Delivery {
    /// time at which the receiving end sees the packet
    pub arrival: SimTime,
    pub packet: Packet,
}

/// A point-to-point channel with a finite datarate and a propagation
/// delay.
///
/// Transmitting `L` bytes keeps the channel busy for
/// [`Bandwidth::transmission_time`]. The receiving end is configured to
/// deliver at the start of the reception: the packet arrives `latency`
/// after the transmission starts.
///
/// ```
/// # use xrsim_core::{Bandwidth, Channel, PacketFactory, PacketIdGenerator, SimChannel, SimTime, TrafficClass};
/// # use std::time::Duration;
/// let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Hmd);
/// let mut channel = SimChannel::new(Bandwidth::new(1_000_000), Duration::ZERO);
///
/// channel.transmit(factory.make(1_500, SimTime::ZERO), SimTime::ZERO);
///
/// assert!(channel.is_busy(SimTime::from_secs_f64(0.011)));
/// assert!(!channel.is_busy(SimTime::from_secs_f64(0.012)));
/// assert_eq!(channel.take_deliveries().len(), 1);
/// ```
#[derive(Debug)]
pub struct SimChannel {
    datarate: Bandwidth,
    latency: Duration,
    finish_time: SimTime,
    deliveries: VecDeque<Delivery>,

    transmitted_packets: u64,
    transmitted_bytes: u64,
}

impl SimChannel {
    pub fn new(datarate: Bandwidth, latency: Duration) -> Self {
        Self {
            datarate,
            latency,
            finish_time: SimTime::ZERO,
            deliveries: VecDeque::new(),
            transmitted_packets: 0,
            transmitted_bytes: 0,
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// collect the packets transmitted since the last call, in
    /// transmission order
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        self.deliveries.drain(..).collect()
    }

    pub fn transmitted_packets(&self) -> u64 {
        self.transmitted_packets
    }

    pub fn transmitted_bytes(&self) -> u64 {
        self.transmitted_bytes
    }
}

impl Channel for SimChannel {
    fn is_busy(&self, now: SimTime) -> bool {
        now < self.finish_time
    }

    fn finish_time(&self) -> SimTime {
        self.finish_time
    }

    fn datarate(&self) -> Bandwidth {
        self.datarate
    }

    fn transmit(&mut self, packet: Packet, now: SimTime) {
        debug_assert!(
            !self.is_busy(now),
            "transmitting on a busy channel (busy until {}, now {now})",
            self.finish_time
        );

        let size = packet.bytes_size();
        self.finish_time = now + self.datarate.transmission_time(size);
        self.transmitted_packets += 1;
        self.transmitted_bytes += size;

        self.deliveries.push_back(Delivery {
            arrival: now + self.latency,
            packet,
        });
    }
}
