use crate::{AccessPointStats, Packet, SimTime, TrafficClass};
use tracing::{trace, warn};

/// What reaches the access point from upstream.
#[derive(Debug)]
pub enum Inbound {
    Packet(Packet),
    /// any message that is not a packet, only its name is known
    Other { name: String },
}

/// A pass-through access point.
///
/// Packets of an accepted [`TrafficClass`] are stamped with their arrival
/// time, forwarded to the one downstream output and stamped with their
/// departure time. There is no queueing: both stamps are the time of
/// reception. Everything else is logged and dropped.
///
/// ```
/// # use xrsim_core::{AccessPoint, Inbound, PacketFactory, PacketIdGenerator, SimTime, TrafficClass};
/// let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Haptic);
/// let mut ap = AccessPoint::new();
/// let now = SimTime::from_nanos(1_000);
///
/// let packet = ap.receive(Inbound::Packet(factory.make(64, SimTime::ZERO)), now).unwrap();
///
/// assert_eq!(packet.ap_arrival(), Some(now));
/// assert_eq!(packet.ap_departure(), Some(now));
/// assert_eq!(ap.stats().forwarded, 1);
/// ```
#[derive(Debug, Clone)]
pub struct AccessPoint {
    accepted: [bool; TrafficClass::ALL.len()],
    stats: AccessPointStats,
}

impl AccessPoint {
    /// an access point forwarding every traffic class
    pub fn new() -> Self {
        Self::with_accepted_classes(TrafficClass::ALL)
    }

    /// an access point forwarding only the given traffic classes
    pub fn with_accepted_classes<I>(classes: I) -> Self
    where
        I: IntoIterator<Item = TrafficClass>,
    {
        let mut accepted = [false; TrafficClass::ALL.len()];
        for class in classes {
            accepted[class.index()] = true;
        }

        Self {
            accepted,
            stats: AccessPointStats::default(),
        }
    }

    pub fn accepts(&self, class: TrafficClass) -> bool {
        self.accepted[class.index()]
    }

    pub fn stats(&self) -> &AccessPointStats {
        &self.stats
    }

    /// Receive `inbound` at `now`, returns the packet to forward downstream
    /// if any.
    pub fn receive(&mut self, inbound: Inbound, now: SimTime) -> Option<Packet> {
        let mut packet = match inbound {
            Inbound::Packet(packet) => packet,
            Inbound::Other { name } => {
                warn!(message = %name, %now, "unknown message received at the access point, dropping");
                self.stats.dropped += 1;
                return None;
            }
        };

        self.stats.packets_received += 1;
        self.stats.bits_received += packet.bytes_size() * 8;

        if !self.accepts(packet.class()) {
            warn!(packet = %packet.id(), class = %packet.class(), %now, "traffic class not accepted, dropping");
            self.stats.dropped += 1;
            return None;
        }

        packet.stamp_ap_arrival(now);
        packet.stamp_ap_departure(now);
        trace!(packet = %packet.id(), class = %packet.class(), %now, "forwarded");

        self.stats.forwarded += 1;
        self.stats.forwarded_per_class[packet.class().index()] += 1;

        Some(packet)
    }
}

impl Default for AccessPoint {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PacketFactory, PacketIdGenerator};

    fn packet(class: TrafficClass, size: u64) -> Packet {
        PacketFactory::new(PacketIdGenerator::new(), class).make(size, SimTime::ZERO)
    }

    #[test]
    fn forwards_every_class_by_default() {
        let mut ap = AccessPoint::new();
        let now = SimTime::from_nanos(10);

        for class in TrafficClass::ALL {
            let forwarded = ap.receive(Inbound::Packet(packet(class, 100)), now).unwrap();
            assert_eq!(forwarded.class(), class);
            assert_eq!(forwarded.bytes_size(), 100);
            assert_eq!(forwarded.ap_arrival(), Some(now));
            assert_eq!(forwarded.ap_departure(), Some(now));
        }

        let stats = ap.stats();
        assert_eq!(stats.packets_received, 5);
        assert_eq!(stats.forwarded, 5);
        assert_eq!(stats.bits_received, 5 * 800);
        assert_eq!(stats.dropped, 0);
        assert!(TrafficClass::ALL.iter().all(|class| stats.forwarded_for(*class) == 1));
    }

    #[test]
    fn unknown_message_is_dropped() {
        let mut ap = AccessPoint::new();

        let forwarded = ap.receive(
            Inbound::Other {
                name: "beacon".to_owned(),
            },
            SimTime::ZERO,
        );

        assert!(forwarded.is_none());
        assert_eq!(ap.stats().dropped, 1);
        assert_eq!(ap.stats().packets_received, 0);
    }

    #[test]
    fn class_not_accepted_is_dropped() {
        let mut ap = AccessPoint::with_accepted_classes([TrafficClass::Xr, TrafficClass::Hmd]);

        assert!(ap.accepts(TrafficClass::Xr));
        assert!(!ap.accepts(TrafficClass::Background));

        let forwarded = ap.receive(
            Inbound::Packet(packet(TrafficClass::Background, 64)),
            SimTime::ZERO,
        );

        assert!(forwarded.is_none());
        let stats = ap.stats();
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.bits_received, 512);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.forwarded, 0);
    }
}
