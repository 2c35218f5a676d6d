use crate::SimTime;
use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use thiserror::Error;

/// a generator for monotonicaly increasing **unique** [`PacketId`]
///
/// Cloning the generator shares the underlying counter, so all the
/// sources of a testbed can draw from the same sequence.
#[derive(Debug, Clone)]
pub struct PacketIdGenerator(Arc<AtomicU64>);

/// # [`Packet`] Identifier
///
/// During the lifetime of the packet, this identifier can uniquely
/// identify the packet.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(u64);

/// The kind of traffic a [`Packet`] belongs to.
///
/// The access point recognises packets by this tag. The textual form
/// is the name the packet carries on the wire.
///
/// ```
/// # use xrsim_core::TrafficClass;
/// let class: TrafficClass = "xr_data".parse().unwrap();
/// assert_eq!(class, TrafficClass::Xr);
/// assert_eq!(class.to_string(), "xr_data");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrafficClass {
    Background,
    Xr,
    Hmd,
    Control,
    Haptic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown traffic class `{0}'")]
pub struct UnknownTrafficClass(pub String);

/// Position of a packet within a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTag {
    /// sequence number of the frame, per source
    pub frame: u64,
    /// index of the fragment within the frame, starting at `0`
    pub fragment: u32,
    /// number of fragments the frame was split into
    pub fragments: u32,
}

/// # A synthetic packet
///
/// Only the byte length matters to the channel, the rest is
/// bookkeeping: the generation time is stamped by the source, the
/// access point stamps its own arrival and departure times on the way
/// through.
///
/// A packet is owned by exactly one component at a time (source, link
/// queue, channel, access point). It is never cloned.
pub struct Packet {
    id: PacketId,
    class: TrafficClass,
    bytes_size: u64,
    generated_at: SimTime,
    frame: Option<FrameTag>,
    ap_arrival: Option<SimTime>,
    ap_departure: Option<SimTime>,
}

/// Builds the packets of one source: a fixed [`TrafficClass`] and a
/// shared [`PacketIdGenerator`].
#[derive(Debug, Clone)]
pub struct PacketFactory {
    generator: PacketIdGenerator,
    class: TrafficClass,
}

impl PacketIdGenerator {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }

    /// generate a new unique identifier
    pub fn generate(&self) -> PacketId {
        let id = self.0.fetch_add(1, Ordering::SeqCst);

        debug_assert!(
            id != 0,
            "The only case this can be equal to 0 is if the generator overflowed. If this \
            happens it means we have generated `u64::MAX` unique paquet identifier and we \
            wrapped around on overflow. This shouldn't happen!"
        );

        PacketId(id)
    }
}

impl Default for PacketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficClass {
    pub const ALL: [TrafficClass; 5] = [
        TrafficClass::Background,
        TrafficClass::Xr,
        TrafficClass::Hmd,
        TrafficClass::Control,
        TrafficClass::Haptic,
    ];

    /// position of the class in [`TrafficClass::ALL`]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TrafficClass::Background => "bkg_data",
            TrafficClass::Xr => "xr_data",
            TrafficClass::Hmd => "hmd_data",
            TrafficClass::Control => "control_data",
            TrafficClass::Haptic => "haptic_data",
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficClass {
    type Err = UnknownTrafficClass;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| UnknownTrafficClass(s.to_owned()))
    }
}

impl PacketFactory {
    pub fn new(generator: PacketIdGenerator, class: TrafficClass) -> Self {
        Self { generator, class }
    }

    pub fn class(&self) -> TrafficClass {
        self.class
    }

    /// build a packet of `bytes_size` bytes, generated at `now`
    pub fn make(&self, bytes_size: u64, now: SimTime) -> Packet {
        Packet {
            id: self.generator.generate(),
            class: self.class,
            bytes_size,
            generated_at: now,
            frame: None,
            ap_arrival: None,
            ap_departure: None,
        }
    }

    /// build one fragment of a video frame
    pub fn make_fragment(&self, bytes_size: u64, now: SimTime, frame: FrameTag) -> Packet {
        let mut packet = self.make(bytes_size, now);
        packet.frame = Some(frame);
        packet
    }
}

impl Packet {
    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn class(&self) -> TrafficClass {
        self.class
    }

    #[inline]
    pub fn bytes_size(&self) -> u64 {
        self.bytes_size
    }

    pub fn generated_at(&self) -> SimTime {
        self.generated_at
    }

    pub fn frame(&self) -> Option<FrameTag> {
        self.frame
    }

    pub fn ap_arrival(&self) -> Option<SimTime> {
        self.ap_arrival
    }

    pub fn ap_departure(&self) -> Option<SimTime> {
        self.ap_departure
    }

    pub(crate) fn stamp_ap_arrival(&mut self, time: SimTime) {
        self.ap_arrival = Some(time);
    }

    pub(crate) fn stamp_ap_departure(&mut self, time: SimTime) {
        self.ap_departure = Some(time);
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("bytes_size", &self.bytes_size)
            .field("generated_at", &self.generated_at)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_id_display() {
        let id = PacketIdGenerator::new().generate();

        assert_eq!(id, PacketId(1));
        assert_eq!(id.to_string(), "0x0000000000000001");
        assert_eq!(format!("{id:?}"), "PacketId(1)");
    }

    #[test]
    fn generator_is_shared_between_clones() {
        let generator = PacketIdGenerator::new();
        let clone = generator.clone();

        assert_eq!(generator.generate(), PacketId(1));
        assert_eq!(clone.generate(), PacketId(2));
        assert_eq!(generator.generate(), PacketId(3));
    }

    #[test]
    fn factory_stamps_generation_time() {
        let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Control);
        let now = SimTime::from_nanos(42);

        let packet = factory.make(250, now);

        assert_eq!(packet.class(), TrafficClass::Control);
        assert_eq!(packet.bytes_size(), 250);
        assert_eq!(packet.generated_at(), now);
        assert!(packet.frame().is_none());
        assert!(packet.ap_arrival().is_none());
        assert!(packet.ap_departure().is_none());
    }

    #[test]
    fn factory_fragment() {
        let factory = PacketFactory::new(PacketIdGenerator::new(), TrafficClass::Xr);
        let tag = FrameTag {
            frame: 7,
            fragment: 1,
            fragments: 3,
        };

        let packet = factory.make_fragment(1_542, SimTime::ZERO, tag);

        assert_eq!(packet.frame(), Some(tag));
    }

    #[test]
    fn traffic_class_names() {
        for class in TrafficClass::ALL {
            assert_eq!(class.as_str().parse::<TrafficClass>().unwrap(), class);
        }

        let error = "ping".parse::<TrafficClass>().unwrap_err();
        assert_eq!(error.to_string(), "Unknown traffic class `ping'");
    }
}
