use crate::SimTime;
use core::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Identifier of a scheduled event, unique within one [`TimeQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// The pending events of a discrete-event simulation.
///
/// Events are popped in time order. Events scheduled for the same time
/// are popped in the order they were pushed. Cancelled events are
/// skipped when they reach the front of the queue.
pub struct TimeQueue<E> {
    map: BinaryHeap<Reverse<OrderedByTime<E>>>,
    cancelled: HashSet<TimerId>,
    next_id: u64,
}

struct OrderedByTime<E> {
    time: SimTime,
    id: TimerId,
    event: E,
}

impl<E> OrderedByTime<E> {
    fn key(&self) -> (SimTime, TimerId) {
        (self.time, self.id)
    }
}

impl<E> PartialEq for OrderedByTime<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E> Eq for OrderedByTime<E> {}

impl<E> PartialOrd for OrderedByTime<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for OrderedByTime<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl<E> TimeQueue<E> {
    pub fn new() -> Self {
        Self {
            map: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        }
    }

    /// `true` if there are no pending events (cancelled events excluded)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// number of pending events (cancelled events excluded)
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len() - self.cancelled.len()
    }

    /// time of the next event to pop, if any
    pub fn time_to_next_event(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.map.peek().map(|v| v.0.time)
    }

    pub fn push(&mut self, time: SimTime, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        self.map.push(Reverse(OrderedByTime { time, id, event }));
        id
    }

    /// cancel a pending event
    ///
    /// Returns `false` if the event already popped or was already
    /// cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let pending = self.map.iter().any(|entry| entry.0.id == id);
        pending && self.cancelled.insert(id)
    }

    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        self.discard_cancelled();
        self.map.pop().map(|Reverse(entry)| (entry.time, entry.event))
    }

    /// pop the next event if it is due at or before `time`
    pub fn pop_until(&mut self, time: SimTime) -> Option<(SimTime, E)> {
        match self.time_to_next_event() {
            Some(next) if next <= time => self.pop(),
            _ => None,
        }
    }

    fn discard_cancelled(&mut self) {
        while let Some(Reverse(entry)) = self.map.peek() {
            if !self.cancelled.remove(&entry.id) {
                break;
            }
            self.map.pop();
        }
    }
}

impl<E> Default for TimeQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduling capability handed to the components of the simulation.
///
/// Components never read a global clock: the runtime gives them the
/// current time and takes back the events they want delivered later.
pub trait Scheduler<E> {
    /// the current simulated time
    fn now(&self) -> SimTime;

    /// deliver `event` back at `time`
    ///
    /// `time` must not be in the past.
    fn schedule_at(&mut self, time: SimTime, event: E) -> TimerId;

    /// cancel a previously scheduled event, `false` if it is no longer
    /// pending
    fn cancel(&mut self, id: TimerId) -> bool;
}

/// A [`Scheduler`] over a bare [`TimeQueue`], with a manually driven
/// clock.
///
/// Useful to drive a single component, e.g. in tests.
///
/// ```
/// # use xrsim_core::{ManualScheduler, Scheduler, SimTime};
/// let mut scheduler = ManualScheduler::new();
/// scheduler.schedule_at(SimTime::from_nanos(10), "b");
/// scheduler.schedule_at(SimTime::from_nanos(5), "a");
///
/// assert_eq!(scheduler.advance(), Some("a"));
/// assert_eq!(scheduler.now(), SimTime::from_nanos(5));
/// assert_eq!(scheduler.advance(), Some("b"));
/// assert_eq!(scheduler.advance(), None);
/// ```
pub struct ManualScheduler<E> {
    now: SimTime,
    queue: TimeQueue<E>,
}

impl<E> ManualScheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            queue: TimeQueue::new(),
        }
    }

    pub fn queue(&self) -> &TimeQueue<E> {
        &self.queue
    }

    /// move the clock to the next event and return it
    pub fn advance(&mut self) -> Option<E> {
        let (time, event) = self.queue.pop()?;
        self.now = time;
        Some(event)
    }

    /// move the clock to the next event if it is due at or before `time`
    pub fn advance_until(&mut self, time: SimTime) -> Option<E> {
        let (time, event) = self.queue.pop_until(time)?;
        self.now = time;
        Some(event)
    }

    /// time of the next pending event
    pub fn next_event_time(&mut self) -> Option<SimTime> {
        self.queue.time_to_next_event()
    }

    /// move the clock forward without processing any events
    pub fn set_now(&mut self, now: SimTime) {
        debug_assert!(self.now <= now, "time only moves forward");
        self.now = now;
    }
}

impl<E> Default for ManualScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> for ManualScheduler<E> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn schedule_at(&mut self, time: SimTime, event: E) -> TimerId {
        debug_assert!(self.now <= time, "scheduling an event in the past");
        self.queue.push(time, event)
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.queue.cancel(id)
    }
}
