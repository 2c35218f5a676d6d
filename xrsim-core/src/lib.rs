//! Deterministic building blocks of an XR/AR access-network testbed.
//!
//! Traffic sources generate synthetic packets following an arrival
//! process and push them to their outbound channel. When the channel is
//! busy the packets wait in the [`OutboundLinkQueue`] of the source and
//! are drained in order as the channel frees up. On the other end of the
//! channels an [`AccessPoint`] stamps and forwards the packets.
//!
//! Nothing here owns a clock: the components are driven by a runtime
//! through the [`Scheduler`] capability (see the `xrsim` crate, or the
//! [`ManualScheduler`] in tests).

mod access_point;
mod bandwidth;
mod channel;
pub mod defaults;
mod link_queue;
mod packet;
mod source;
mod stats;
mod time;
mod time_queue;
pub mod variate;

pub use self::{
    access_point::{AccessPoint, Inbound},
    bandwidth::Bandwidth,
    channel::{Channel, Delivery, SimChannel},
    link_queue::{Admission, DrainOutcome, OutboundLinkQueue},
    packet::{
        FrameTag, Packet, PacketFactory, PacketId, PacketIdGenerator, TrafficClass,
        UnknownTrafficClass,
    },
    source::{
        ArrivalPolicy, ConfigError, Generation, Phase, PolicyConfig, SourceConfig, SourceState,
        SourceTimer, TrafficSource, UnknownTimer, source_rng, split_frame,
    },
    stats::{AccessPointStats, SourceStats},
    time::{SimTime, TextDuration},
    time_queue::{ManualScheduler, Scheduler, TimeQueue, TimerId},
};

#[cfg(test)]
pub(crate) mod testing {
    use crate::{Bandwidth, Channel, Packet, PacketId, SimTime};

    /// A channel whose busy period is set by the test.
    ///
    /// Transmitting does not make it busy, it only records the packet.
    pub(crate) struct ScriptedChannel {
        datarate: Bandwidth,
        busy_until: SimTime,
        transmitted: Vec<(u64, SimTime)>,
        transmitted_ids: Vec<PacketId>,
    }

    impl ScriptedChannel {
        pub(crate) fn free(datarate: Bandwidth) -> Self {
            Self::busy_until(datarate, SimTime::ZERO)
        }

        pub(crate) fn busy_until(datarate: Bandwidth, busy_until: SimTime) -> Self {
            Self {
                datarate,
                busy_until,
                transmitted: Vec::new(),
                transmitted_ids: Vec::new(),
            }
        }

        pub(crate) fn set_busy_until(&mut self, busy_until: SimTime) {
            self.busy_until = busy_until;
        }

        pub(crate) fn set_free(&mut self) {
            self.busy_until = SimTime::ZERO;
        }

        /// size and transmission time of every packet, in order
        pub(crate) fn transmitted(&self) -> &[(u64, SimTime)] {
            &self.transmitted
        }

        pub(crate) fn transmitted_ids(&self) -> &[PacketId] {
            &self.transmitted_ids
        }
    }

    impl Channel for ScriptedChannel {
        fn is_busy(&self, now: SimTime) -> bool {
            now < self.busy_until
        }

        fn finish_time(&self) -> SimTime {
            self.busy_until
        }

        fn datarate(&self) -> Bandwidth {
            self.datarate
        }

        fn transmit(&mut self, packet: Packet, now: SimTime) {
            self.transmitted.push((packet.bytes_size(), now));
            self.transmitted_ids.push(packet.id());
        }
    }
}
