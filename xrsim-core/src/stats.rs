//! Counters and observability types.
//!
//! [`SourceStats`] is a point-in-time snapshot of one traffic source.
//! Obtain one via [`TrafficSource::stats`](crate::TrafficSource::stats).
//! [`AccessPointStats`] is obtained via
//! [`AccessPoint::stats`](crate::AccessPoint::stats).

use crate::TrafficClass;

/// Snapshot of the counters of a single traffic source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Packets built by the source (every fragment of a frame counts).
    pub packets_generated: u64,
    /// Frames built by a frame-burst source, `0` for the other sources.
    pub frames_generated: u64,
    /// Bytes built by the source.
    pub bytes_generated: u64,
    /// Packets handed to the channel on admission, without queueing.
    pub transmitted_immediately: u64,
    /// Packets that had to wait in the outbound link queue.
    pub deferred: u64,
    /// Drains that found the channel still busy.
    pub retries: u64,
    /// Drain events that fired on an empty queue.
    pub empty_drains: u64,
    /// Packets handed to the channel, queued or not.
    pub transmitted: u64,
    /// Packets still queued when the source was shut down.
    pub released: u64,
    /// Bytes currently waiting in the outbound link queue.
    pub backlog_bytes: u64,
    /// Packets currently waiting in the outbound link queue.
    pub queue_len: usize,
}

/// Snapshot of the counters of the access point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPointStats {
    /// Packets received, accepted or not.
    pub packets_received: u64,
    /// Bits received, accepted or not.
    pub bits_received: u64,
    /// Packets forwarded downstream.
    pub forwarded: u64,
    /// Packets and messages that were not forwarded.
    pub dropped: u64,
    /// Packets forwarded downstream, per traffic class.
    pub forwarded_per_class: [u64; TrafficClass::ALL.len()],
}

impl AccessPointStats {
    /// packets forwarded downstream for the given `class`
    pub fn forwarded_for(&self, class: TrafficClass) -> u64 {
        self.forwarded_per_class[class.index()]
    }
}
