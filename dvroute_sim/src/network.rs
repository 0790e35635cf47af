//! Simulated link layer: turns sends into scheduled arrival events.

use crate::event_queue::{Event, EventQueue};
use crate::topology::Topology;

use dvroute_env::{Cost, DelaySource, NodeId, RoutingPacket, SimError, SimTime, Transport, NUM_NODES};
use std::collections::HashMap;
use tracing::trace;

/// Directed link state shared by every node's transport.
///
/// Costs here are directional: a link-cost change reaches each endpoint as
/// its own event, and in between the two ends may briefly disagree.
#[derive(Debug, Clone)]
pub struct LinkLayer {
    /// `costs[from][to]` as currently seen by `from`
    costs: [[Cost; NUM_NODES]; NUM_NODES],

    /// Keep per-link arrival order equal to send order
    fifo: bool,

    /// Latest arrival time scheduled on each directed link
    last_arrival: HashMap<(NodeId, NodeId), SimTime>,

    /// Total packets scheduled
    packets_scheduled: u64,
}

impl LinkLayer {
    /// Creates a link layer for the given topology.
    pub fn new(topology: &Topology, fifo: bool) -> Self {
        Self {
            costs: *topology.costs(),
            fifo,
            last_arrival: HashMap::new(),
            packets_scheduled: 0,
        }
    }

    /// Returns true if `from` currently has a live link to `to`.
    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        from != to && !self.costs[from.index()][to.index()].is_infinite()
    }

    /// Cost of the directed link `from -> to`.
    pub fn cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.costs[from.index()][to.index()]
    }

    /// Updates the directed link `from -> to`.
    pub fn set_cost(&mut self, from: NodeId, to: NodeId, cost: Cost) {
        self.costs[from.index()][to.index()] = cost;
    }

    /// Current directed cost matrix.
    pub fn costs(&self) -> &[[Cost; NUM_NODES]; NUM_NODES] {
        &self.costs
    }

    /// Returns the number of packets scheduled so far.
    pub fn packets_scheduled(&self) -> u64 {
        self.packets_scheduled
    }

    /// Computes when a packet sent now arrives, and records it.
    ///
    /// The arrival is `now + delay`. With FIFO links it is raised to the
    /// latest arrival already scheduled on the same directed link, so a
    /// neighbor never sees an older vector after a newer one. Equal arrival
    /// times keep send order through the queue's sequence number.
    pub fn arrival_time(
        &mut self,
        now: SimTime,
        from: NodeId,
        to: NodeId,
        delay: f64,
    ) -> Result<SimTime, SimError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidDelay(delay));
        }

        let last = self.last_arrival.entry((from, to)).or_insert(SimTime::ZERO);
        let arrival = if self.fifo { (now + delay).max(*last) } else { now + delay };
        *last = (*last).max(arrival);

        self.packets_scheduled += 1;
        Ok(arrival)
    }
}

/// The transport a node sees while one event is being dispatched.
///
/// Borrows the simulator's queue, links and delay source for the duration
/// of a single dispatch.
pub struct SimNetwork<'a> {
    now: SimTime,
    queue: &'a mut EventQueue,
    links: &'a mut LinkLayer,
    delay: &'a mut dyn DelaySource,
}

impl<'a> SimNetwork<'a> {
    /// Wraps the simulator state for one dispatch at time `now`.
    pub fn new(
        now: SimTime,
        queue: &'a mut EventQueue,
        links: &'a mut LinkLayer,
        delay: &'a mut dyn DelaySource,
    ) -> Self {
        Self {
            now,
            queue,
            links,
            delay,
        }
    }
}

impl Transport for SimNetwork<'_> {
    fn send(&mut self, packet: RoutingPacket) -> Result<(), SimError> {
        let (from, to) = (packet.source(), packet.dest());
        if !self.links.is_connected(from, to) {
            return Err(SimError::NotNeighbor {
                from: from.as_u8(),
                to: to.as_u8(),
            });
        }

        let delay = self.delay.delay(from, to);
        let arrival = self.links.arrival_time(self.now, from, to, delay)?;
        trace!("schedule {} -> {} at t={} (sent t={})", from, to, arrival, self.now);

        self.queue.insert(Event::packet_arrival(arrival, packet));
        Ok(())
    }

    fn now(&self) -> SimTime {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::EventKind;
    use dvroute_env::FixedDelay;

    fn id(n: u32) -> NodeId {
        NodeId::new(n).unwrap()
    }

    fn packet(from: u32, to: u32) -> RoutingPacket {
        RoutingPacket::new(id(from), id(to), [Cost::ZERO; NUM_NODES])
    }

    #[test]
    fn test_send_schedules_arrival() {
        let mut queue = EventQueue::new();
        let mut links = LinkLayer::new(&Topology::classic(), true);
        let mut delay = FixedDelay(2.0);

        let mut net = SimNetwork::new(SimTime::new(3.0), &mut queue, &mut links, &mut delay);
        net.send(packet(0, 1)).unwrap();

        let event = queue.pop_earliest().unwrap();
        assert_eq!(event.time, SimTime::new(5.0));
        assert_eq!(event.target, id(1));
        assert!(matches!(event.kind, EventKind::PacketArrival(_)));
        assert_eq!(links.packets_scheduled(), 1);
    }

    #[test]
    fn test_send_to_non_neighbor_fails() {
        let mut queue = EventQueue::new();
        let mut links = LinkLayer::new(&Topology::classic(), true);
        let mut delay = FixedDelay(1.0);

        let mut net = SimNetwork::new(SimTime::ZERO, &mut queue, &mut links, &mut delay);
        let err = net.send(packet(1, 3)).unwrap_err();

        assert_eq!(err, SimError::NotNeighbor { from: 1, to: 3 });
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_link_never_overtakes() {
        let mut links = LinkLayer::new(&Topology::classic(), true);

        let first = links.arrival_time(SimTime::ZERO, id(0), id(1), 9.0).unwrap();
        let second = links.arrival_time(SimTime::new(1.0), id(0), id(1), 1.0).unwrap();
        assert_eq!(first, SimTime::new(9.0));
        assert_eq!(second, SimTime::new(9.0));

        // other links are independent
        let other = links.arrival_time(SimTime::new(1.0), id(1), id(0), 1.0).unwrap();
        assert_eq!(other, SimTime::new(2.0));
    }

    #[test]
    fn test_same_instant_sends_arrive_after_one_delay() {
        let mut queue = EventQueue::new();
        let mut links = LinkLayer::new(&Topology::classic(), true);
        let mut delay = FixedDelay(1.0);

        let mut net = SimNetwork::new(SimTime::new(2.0), &mut queue, &mut links, &mut delay);
        let first = RoutingPacket::new(id(0), id(1), [Cost::new(1); NUM_NODES]);
        let second = RoutingPacket::new(id(0), id(1), [Cost::new(2); NUM_NODES]);
        net.send(first.clone()).unwrap();
        net.send(second.clone()).unwrap();

        let a = queue.pop_earliest().unwrap();
        let b = queue.pop_earliest().unwrap();
        assert_eq!(a.time, SimTime::new(3.0));
        assert_eq!(b.time, SimTime::new(3.0));
        assert_eq!(a.kind, EventKind::PacketArrival(first));
        assert_eq!(b.kind, EventKind::PacketArrival(second));
    }

    #[test]
    fn test_later_send_never_lands_earlier() {
        let mut links = LinkLayer::new(&Topology::classic(), true);

        let slow = links.arrival_time(SimTime::ZERO, id(2), id(3), 5.0).unwrap();
        let fast = links.arrival_time(SimTime::new(1.0), id(2), id(3), 1.0).unwrap();
        let late = links.arrival_time(SimTime::new(10.0), id(2), id(3), 1.0).unwrap();
        assert_eq!(slow, SimTime::new(5.0));
        assert_eq!(fast, SimTime::new(5.0));
        assert_eq!(late, SimTime::new(11.0));
    }

    #[test]
    fn test_non_fifo_link_can_reorder() {
        let mut links = LinkLayer::new(&Topology::classic(), false);

        let first = links.arrival_time(SimTime::ZERO, id(0), id(1), 9.0).unwrap();
        let second = links.arrival_time(SimTime::new(1.0), id(0), id(1), 1.0).unwrap();
        assert!(second < first);
    }

    #[test]
    fn test_invalid_delay_rejected() {
        let mut links = LinkLayer::new(&Topology::classic(), true);
        assert_eq!(
            links.arrival_time(SimTime::ZERO, id(0), id(1), -1.0),
            Err(SimError::InvalidDelay(-1.0))
        );
        assert!(links.arrival_time(SimTime::ZERO, id(0), id(1), f64::NAN).is_err());
    }

    #[test]
    fn test_failed_link_is_not_connected() {
        let mut links = LinkLayer::new(&Topology::classic(), true);
        assert!(links.is_connected(id(0), id(1)));
        links.set_cost(id(0), id(1), Cost::INFINITY);
        assert!(!links.is_connected(id(0), id(1)));
        // the other direction waits for its own event
        assert!(links.is_connected(id(1), id(0)));
    }
}
