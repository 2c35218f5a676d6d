//! # Outbound link queue
//!
//! Every traffic source pushes its packets to one outbound [`Channel`].
//! When the channel is transmitting, the packet cannot go through and it
//! waits in the [`OutboundLinkQueue`] of the source. A drain event is then
//! due for every packet waiting in the queue: when it fires the packet at
//! the head of the queue gets a new chance to go through.
//!
//! ```text
//!               admit(p)
//!                  │
//!        channel busy? ── no ──► transmit(p)
//!                  │
//!                 yes
//!                  ▼
//!   [ head ... ... ... p ]  backlog += len(p)
//!                  │         drain at finish_time + backlog_before * 8 / datarate
//!                  ▼
//!               drain()
//!        pop head, backlog -= len(head)
//!        channel busy? ── no ──► transmit(head)
//!                  │
//!                 yes
//!                  ▼
//!   [ head ... ... ... ]    head back in front, backlog += len(head)
//!                           drain at finish_time
//! ```
//!
//! The queue does not own a clock nor a timer: every decision returns the
//! time at which the caller has to schedule the next drain, see
//! [`Admission`] and [`DrainOutcome`].

use crate::{Bandwidth, Channel, Packet, SimTime};
use std::collections::VecDeque;
use tracing::trace;

/// Decision taken by [`OutboundLinkQueue::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// the channel was free, the packet is on its way
    Transmitted,
    /// the channel was busy, the packet waits at the back of the queue;
    /// a drain is due at `drain_at`
    Deferred { drain_at: SimTime },
}

/// Outcome of [`OutboundLinkQueue::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// nothing to drain
    Empty,
    /// the head of the queue went through
    Transmitted,
    /// the channel is still busy: the head is back in front of the queue,
    /// another drain is due at `drain_at`
    Retry { drain_at: SimTime },
}

/// FIFO of the packets waiting for the outbound channel of one source.
///
/// # Invariants
///
/// * packets leave in the order they were admitted. A packet that fails to
///   drain is put back at the head of the queue, ahead of the packets that
///   were already waiting behind it;
/// * [`backlog_bytes`] is always the sum of the length of the packets in
///   the queue.
///
/// Packets still in the queue when it is dropped are released with it.
///
/// [`backlog_bytes`]: OutboundLinkQueue::backlog_bytes
#[derive(Debug)]
pub struct OutboundLinkQueue {
    queue: VecDeque<Packet>,
    backlog: u64,
    datarate: Bandwidth,
}

impl OutboundLinkQueue {
    /// create an empty queue for a source transmitting at `datarate`
    ///
    /// The datarate is used to estimate how long the bytes already waiting
    /// in the queue will take to clear.
    pub fn new(datarate: Bandwidth) -> Self {
        Self {
            queue: VecDeque::new(),
            backlog: 0,
            datarate,
        }
    }

    #[inline]
    pub fn datarate(&self) -> Bandwidth {
        self.datarate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// sum of the length (in bytes) of the packets waiting in the queue
    #[inline]
    pub fn backlog_bytes(&self) -> u64 {
        self.backlog
    }

    /// the waiting packets, head first
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.queue.iter()
    }

    /// Offer `packet` to the outbound `channel`.
    ///
    /// If the channel is free the packet is transmitted straight away and
    /// the queue is left untouched. Otherwise the packet goes at the back
    /// of the queue and the caller must schedule a drain at the returned
    /// time: the end of the current transmission plus the time needed to
    /// clear the bytes that were already waiting.
    pub fn admit<C>(&mut self, packet: Packet, channel: &mut C, now: SimTime) -> Admission
    where
        C: Channel + ?Sized,
    {
        if !channel.is_busy(now) {
            trace!(packet = %packet.id(), size = packet.bytes_size(), "channel free, transmitting");
            channel.transmit(packet, now);
            return Admission::Transmitted;
        }

        let drain_at = channel.finish_time() + self.datarate.transmission_time(self.backlog);
        trace!(
            packet = %packet.id(),
            size = packet.bytes_size(),
            backlog = self.backlog,
            %drain_at,
            "channel busy, deferring"
        );
        self.push_back(packet);

        Admission::Deferred { drain_at }
    }

    /// Queue `packet` without offering it to the channel.
    ///
    /// This is how the fragments of a video frame are pushed back to back:
    /// the drain of the fragment is due once the bytes already waiting are
    /// cleared, counting from `now`. The returned time is when the caller
    /// must schedule the drain.
    pub fn enqueue_burst(&mut self, packet: Packet, now: SimTime) -> SimTime {
        let drain_at = now + self.datarate.transmission_time(self.backlog);
        trace!(
            packet = %packet.id(),
            size = packet.bytes_size(),
            backlog = self.backlog,
            %drain_at,
            "burst fragment queued"
        );
        self.push_back(packet);
        drain_at
    }

    /// A drain event is due: give the head of the queue another chance.
    ///
    /// If the channel is still busy the packet is put back at the head of
    /// the queue and the caller must schedule one more drain at the end of
    /// the current transmission (the waiting bytes are not accounted for a
    /// second time).
    pub fn drain<C>(&mut self, channel: &mut C, now: SimTime) -> DrainOutcome
    where
        C: Channel + ?Sized,
    {
        let Some(packet) = self.pop_front() else {
            return DrainOutcome::Empty;
        };

        if !channel.is_busy(now) {
            trace!(packet = %packet.id(), size = packet.bytes_size(), "drained");
            channel.transmit(packet, now);
            return DrainOutcome::Transmitted;
        }

        let drain_at = channel.finish_time();
        trace!(packet = %packet.id(), %drain_at, "channel still busy, retrying");
        self.push_front(packet);

        DrainOutcome::Retry { drain_at }
    }

    /// Remove all the waiting packets, head first.
    pub fn drain_all(&mut self) -> Vec<Packet> {
        self.backlog = 0;
        self.queue.drain(..).collect()
    }

    /// Drop all the waiting packets, returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.backlog = 0;
        dropped
    }

    fn push_back(&mut self, packet: Packet) {
        self.backlog += packet.bytes_size();
        self.queue.push_back(packet);
        self.debug_check_backlog();
    }

    fn push_front(&mut self, packet: Packet) {
        self.backlog += packet.bytes_size();
        self.queue.push_front(packet);
        self.debug_check_backlog();
    }

    fn pop_front(&mut self) -> Option<Packet> {
        let packet = self.queue.pop_front()?;
        self.backlog -= packet.bytes_size();
        self.debug_check_backlog();
        Some(packet)
    }

    #[inline]
    fn debug_check_backlog(&self) {
        debug_assert_eq!(
            self.backlog,
            self.queue.iter().map(Packet::bytes_size).sum::<u64>(),
            "backlog must match the bytes waiting in the queue"
        );
    }
}
