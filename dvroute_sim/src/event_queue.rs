//! Event queue with deterministic ordering.

use dvroute_env::{Cost, NodeId, RoutingPacket, SimError, SimTime};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for events scheduled at the same time)
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: SimTime,
    /// Insertion counter, unique per queue.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by sequence (first scheduled, first dispatched)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What happens when an event fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A routing packet reaches its destination node.
    PacketArrival(RoutingPacket),

    /// The target node's direct cost to `neighbor` becomes `cost`.
    LinkCostChange { neighbor: NodeId, cost: Cost },
}

/// A scheduled simulation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Simulated time at which the event fires
    pub time: SimTime,

    /// Node the event is addressed to
    pub target: NodeId,

    /// Payload
    pub kind: EventKind,
}

impl Event {
    /// Packet arrival addressed to the packet's destination.
    pub fn packet_arrival(time: SimTime, packet: RoutingPacket) -> Self {
        Self {
            time,
            target: packet.dest(),
            kind: EventKind::PacketArrival(packet),
        }
    }

    /// Link-cost change seen from `target`'s side of the link.
    pub fn link_cost_change(time: SimTime, target: NodeId, neighbor: NodeId, cost: Cost) -> Self {
        Self {
            time,
            target,
            kind: EventKind::LinkCostChange { neighbor, cost },
        }
    }
}

/// Pending events, earliest first.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: BTreeMap<EventKey, Event>,
    sequence: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event and returns the key it was filed under.
    pub fn insert(&mut self, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: event.time,
            sequence: self.sequence,
        };
        self.events.insert(key, event);
        key
    }

    /// Removes the earliest event (first inserted among equal times).
    pub fn pop_earliest(&mut self) -> Result<Event, SimError> {
        self.events
            .pop_first()
            .map(|(_, event)| event)
            .ok_or(SimError::EmptyQueue)
    }

    /// Time of the next event without removing it.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.first_key_value().map(|(key, _)| key.time)
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Pending events in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> NodeId {
        NodeId::new(n).unwrap()
    }

    fn change(t: f64, target: u32, cost: u32) -> Event {
        let neighbor = if target == 0 { id(1) } else { id(0) };
        Event::link_cost_change(SimTime::new(t), id(target), neighbor, Cost::new(cost))
    }

    #[test]
    fn test_event_key_ordering() {
        let earlier = EventKey {
            time: SimTime::new(1.0),
            sequence: 2,
        };
        let later = EventKey {
            time: SimTime::new(2.0),
            sequence: 1,
        };
        assert!(earlier < later);
    }

    #[test]
    fn test_sequence_breaks_time_ties() {
        let first = EventKey {
            time: SimTime::new(1.0),
            sequence: 1,
        };
        let second = EventKey {
            time: SimTime::new(1.0),
            sequence: 2,
        };
        assert!(first < second, "Earlier insertion should dispatch first");
    }

    #[test]
    fn test_pop_in_time_order() {
        let mut queue = EventQueue::new();
        queue.insert(change(5.0, 0, 1));
        queue.insert(change(1.0, 1, 2));
        queue.insert(change(3.0, 2, 3));

        let times: Vec<f64> = std::iter::from_fn(|| queue.pop_earliest().ok())
            .map(|e| e.time.as_f64())
            .collect();
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_equal_times_are_fifo() {
        let mut queue = EventQueue::new();
        queue.insert(change(2.0, 3, 30));
        queue.insert(change(1.0, 0, 1));
        queue.insert(change(2.0, 1, 10));
        queue.insert(change(2.0, 2, 20));

        assert_eq!(queue.pop_earliest().unwrap().target, id(0));
        assert_eq!(queue.pop_earliest().unwrap().target, id(3));
        assert_eq!(queue.pop_earliest().unwrap().target, id(1));
        assert_eq!(queue.pop_earliest().unwrap().target, id(2));
    }

    #[test]
    fn test_pop_empty_fails() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_earliest(), Err(SimError::EmptyQueue));
    }

    #[test]
    fn test_peek_and_len_do_not_consume() {
        let mut queue = EventQueue::new();
        queue.insert(change(4.0, 0, 1));
        queue.insert(change(2.0, 1, 1));

        assert_eq!(queue.peek_time(), Some(SimTime::new(2.0)));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.iter().count(), 2);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_packet_arrival_targets_destination() {
        let packet = RoutingPacket::new(id(2), id(3), [Cost::ZERO; 4]);
        let event = Event::packet_arrival(SimTime::new(1.0), packet);
        assert_eq!(event.target, id(3));
    }
}
