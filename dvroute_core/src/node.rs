//! Node Agent - one router running the distance-vector protocol.
//!
//! Every node in the network is the same `NodeAgent` type, parameterized by
//! its id and its direct link costs. An agent owns its distance table
//! outright; the only thing that leaves it is a [`RoutingPacket`] handed to a
//! [`Transport`].
//!
//! # Protocol
//!
//! ```text
//!   packet from V arrives        link cost to V changes
//!           │                              │
//!           ▼                              ▼
//!   costs[V][d] = pkt[d] + c(V)    c(V) = new; costs[V][d] = adv_V[d] + c(V)
//!           │                              │
//!           └──────────────┬───────────────┘
//!                          ▼
//!              recompute min over via
//!                          │
//!              changed? ── no ──► stay quiet
//!                          │
//!                         yes
//!                          ▼
//!            send vector to every live neighbor
//! ```

use crate::distance_table::{CostVector, DistanceTable};
use crate::packet::PacketFactory;
use dvroute_env::{Cost, NodeId, RoutingPacket, SimError, Transport, NUM_NODES};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Per-node protocol options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Advertise infinity to the neighbor a route goes through
    pub poisoned_reverse: bool,
}

/// Counters kept by each node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Routing packets processed
    pub packets_received: u64,

    /// Routing packets handed to the transport
    pub packets_sent: u64,

    /// Times the node decided to advertise (including the startup one)
    pub broadcasts: u64,

    /// Link-cost changes applied
    pub link_changes: u64,
}

/// Read-only copy of a node's state for printing and assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub table: DistanceTable,
    pub cost_vector: CostVector,
    pub link_costs: [Cost; NUM_NODES],
    pub stats: NodeStats,
}

/// A router in the simulated network.
#[derive(Debug, Clone)]
pub struct NodeAgent {
    /// This node's id
    id: NodeId,

    /// Protocol options
    config: NodeConfig,

    /// Costs via each first hop
    table: DistanceTable,

    /// Direct link cost to each node (infinity = no link)
    link_costs: [Cost; NUM_NODES],

    /// Last vector each neighbor advertised to us
    advertised: [Option<[Cost; NUM_NODES]>; NUM_NODES],

    /// Builds outgoing advertisements
    factory: PacketFactory,

    stats: NodeStats,
}

/// What a node compares before and after an update to decide whether to speak.
#[derive(PartialEq, Eq)]
struct RouteState {
    vector: CostVector,
    hops: Option<[Option<NodeId>; NUM_NODES]>,
}

impl NodeAgent {
    /// Creates a node with the given direct link costs.
    ///
    /// `link_costs[id]` is forced to zero. Nothing is advertised until
    /// [`NodeAgent::initialize`] is called.
    pub fn new(id: NodeId, mut link_costs: [Cost; NUM_NODES], config: NodeConfig) -> Self {
        link_costs[id.index()] = Cost::ZERO;

        Self {
            id,
            config,
            table: DistanceTable::new(id),
            link_costs,
            advertised: [None; NUM_NODES],
            factory: PacketFactory::new(config.poisoned_reverse),
            stats: NodeStats::default(),
        }
    }

    /// Returns this node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the protocol options.
    pub fn config(&self) -> NodeConfig {
        self.config
    }

    /// Direct link cost to `neighbor` (infinity if no link).
    pub fn link_cost(&self, neighbor: NodeId) -> Cost {
        self.link_costs[neighbor.index()]
    }

    /// Nodes this one currently has a live direct link to.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        NodeId::all()
            .into_iter()
            .filter(move |n| *n != self.id && !self.link_costs[n.index()].is_infinite())
    }

    /// Current minimum cost to every destination.
    pub fn cost_vector(&self) -> CostVector {
        self.table.cost_vector()
    }

    /// Read-only view of the distance table.
    pub fn table(&self) -> &DistanceTable {
        &self.table
    }

    /// Returns the counters.
    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    /// Copies out everything an observer may want to print or check.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            table: self.table.clone(),
            cost_vector: self.cost_vector(),
            link_costs: self.link_costs,
            stats: self.stats,
        }
    }

    /// Loads direct link costs into the table and advertises them.
    ///
    /// Every row other than the node's own is reset to infinity.
    pub fn initialize<T>(&mut self, net: &mut T) -> Result<(), SimError>
    where
        T: Transport + ?Sized,
    {
        self.table = DistanceTable::new(self.id);
        self.table.set_row(self.id, self.link_costs);
        self.advertised = [None; NUM_NODES];

        debug!("node {} initialized: {}", self.id, self.cost_vector());
        self.broadcast(net)
    }

    /// Bellman-Ford relaxation for one incoming advertisement.
    ///
    /// Returns `true` if the update changed this node's routes and a new
    /// round of packets went out.
    pub fn on_packet_arrival<T>(&mut self, packet: &RoutingPacket, net: &mut T) -> Result<bool, SimError>
    where
        T: Transport + ?Sized,
    {
        let via = packet.source();
        debug_assert_eq!(packet.dest(), self.id, "packet delivered to the wrong node");
        self.stats.packets_received += 1;

        let before = self.route_state();

        let advertised = *packet.min_cost();
        // in flight when the link failed
        if !self.link_costs[via.index()].is_infinite() {
            self.advertised[via.index()] = Some(advertised);
        }
        self.table.set_row(via, self.relaxed_row(via, &advertised));

        trace!("node {} <- node {} at t={}: {:?}", self.id, via, net.now(), advertised);
        self.broadcast_if_changed(before, net)
    }

    /// Applies a new direct cost to `neighbor`.
    ///
    /// A cost of [`Cost::INFINITY`] takes the link down; a finite cost on a
    /// previously absent link brings one up. Returns `true` if routes changed
    /// and were re-advertised.
    pub fn on_link_cost_change<T>(
        &mut self,
        neighbor: NodeId,
        new_cost: Cost,
        net: &mut T,
    ) -> Result<bool, SimError>
    where
        T: Transport + ?Sized,
    {
        if neighbor == self.id {
            return Err(SimError::topology(format!(
                "node {} cannot change the cost of a link to itself",
                self.id
            )));
        }
        self.stats.link_changes += 1;

        let before = self.route_state();
        let link_up = self.link_costs[neighbor.index()].is_infinite() && !new_cost.is_infinite();

        self.link_costs[neighbor.index()] = new_cost;
        self.table.set(self.id, neighbor, new_cost);
        if new_cost.is_infinite() {
            self.advertised[neighbor.index()] = None;
        }

        let row = match self.advertised[neighbor.index()] {
            Some(advertised) => self.relaxed_row(neighbor, &advertised),
            None => [Cost::INFINITY; NUM_NODES],
        };
        self.table.set_row(neighbor, row);

        debug!(
            "node {}: link to {} now costs {} at t={}",
            self.id,
            neighbor,
            new_cost,
            net.now()
        );

        // a new neighbor has never seen our vector
        if link_up {
            self.broadcast(net)?;
            return Ok(true);
        }
        self.broadcast_if_changed(before, net)
    }

    /// `advertised[d] + c(via)` for every destination.
    fn relaxed_row(&self, via: NodeId, advertised: &[Cost; NUM_NODES]) -> [Cost; NUM_NODES] {
        let link = self.link_costs[via.index()];
        let mut row = [Cost::INFINITY; NUM_NODES];
        for (slot, cost) in row.iter_mut().zip(advertised) {
            *slot = *cost + link;
        }
        row
    }

    fn route_state(&self) -> RouteState {
        RouteState {
            vector: self.table.cost_vector(),
            // next hops only matter when they shape what we advertise
            hops: self.config.poisoned_reverse.then(|| self.table.next_hops()),
        }
    }

    fn broadcast_if_changed<T>(&mut self, before: RouteState, net: &mut T) -> Result<bool, SimError>
    where
        T: Transport + ?Sized,
    {
        if self.route_state() == before {
            return Ok(false);
        }

        debug!(
            "node {} routes changed at t={}: {} -> {}",
            self.id,
            net.now(),
            before.vector,
            self.cost_vector()
        );
        self.broadcast(net)?;
        Ok(true)
    }

    fn broadcast<T>(&mut self, net: &mut T) -> Result<(), SimError>
    where
        T: Transport + ?Sized,
    {
        self.stats.broadcasts += 1;

        let neighbors: Vec<NodeId> = self.neighbors().collect();
        for neighbor in neighbors {
            let packet = self.factory.advertisement(&self.table, neighbor);
            net.send(packet)?;
            self.stats.packets_sent += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvroute_env::SimTime;

    /// Records packets instead of delivering them.
    #[derive(Default)]
    struct Outbox {
        sent: Vec<RoutingPacket>,
    }

    impl Transport for Outbox {
        fn send(&mut self, packet: RoutingPacket) -> Result<(), SimError> {
            self.sent.push(packet);
            Ok(())
        }

        fn now(&self) -> SimTime {
            SimTime::ZERO
        }
    }

    fn id(n: u32) -> NodeId {
        NodeId::new(n).unwrap()
    }

    fn c(n: u32) -> Cost {
        Cost::new(n)
    }

    const INF: Cost = Cost::INFINITY;

    /// Node 0 of the classic topology: 0-1:1, 0-2:3, 0-3:7.
    fn classic_node0(config: NodeConfig) -> NodeAgent {
        NodeAgent::new(id(0), [c(0), c(1), c(3), c(7)], config)
    }

    #[test]
    fn test_initialize_broadcasts_direct_costs() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();

        node.initialize(&mut out).unwrap();

        assert_eq!(out.sent.len(), 3);
        let dests: Vec<NodeId> = out.sent.iter().map(|p| p.dest()).collect();
        assert_eq!(dests, vec![id(1), id(2), id(3)]);
        for packet in &out.sent {
            assert_eq!(packet.source(), id(0));
            assert_eq!(packet.min_cost(), &[c(0), c(1), c(3), c(7)]);
        }

        // rows other than self are unreachable
        for via in [id(1), id(2), id(3)] {
            assert!(node.table().row(via).iter().all(|cost| cost.is_infinite()));
        }
        assert_eq!(node.stats().broadcasts, 1);
    }

    #[test]
    fn test_initialize_without_links_sends_nothing() {
        let mut node = NodeAgent::new(id(3), [INF; NUM_NODES], NodeConfig::default());
        let mut out = Outbox::default();

        node.initialize(&mut out).unwrap();

        assert!(out.sent.is_empty());
        assert_eq!(node.cost_vector().costs(), &[INF, INF, INF, c(0)]);
    }

    #[test]
    fn test_packet_arrival_relaxes_and_broadcasts_on_change() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        out.sent.clear();

        // node 1 reaches 2 at cost 1
        let packet = PacketFactory::create(id(1), id(0), [c(1), c(0), c(1), INF]);
        let changed = node.on_packet_arrival(&packet, &mut out).unwrap();

        assert!(changed);
        assert_eq!(node.table().row(id(1)), &[c(2), c(1), c(2), INF]);
        assert_eq!(node.cost_vector().costs(), &[c(0), c(1), c(2), c(7)]);
        assert_eq!(out.sent.len(), 3);
        assert!(out.sent.iter().all(|p| p.min_cost()[2] == c(2)));
    }

    #[test]
    fn test_no_propagation_when_vector_unchanged() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        out.sent.clear();

        // node 3 offers nothing better than what node 0 already has
        let packet = PacketFactory::create(id(3), id(0), [c(7), INF, c(2), c(0)]);
        let changed = node.on_packet_arrival(&packet, &mut out).unwrap();

        assert!(!changed);
        assert!(out.sent.is_empty());
        assert_eq!(node.table().row(id(3)), &[c(14), INF, c(9), c(7)]);
        assert_eq!(node.stats().packets_received, 1);
    }

    #[test]
    fn test_infinity_saturates_in_relaxation() {
        let mut node = NodeAgent::new(id(0), [c(0), c(998), INF, INF], NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();

        let packet = PacketFactory::create(id(1), id(0), [c(998), c(0), c(5), INF]);
        node.on_packet_arrival(&packet, &mut out).unwrap();

        let row = node.table().row(id(1));
        assert!(row[2].is_infinite());
        assert!(row[3].is_infinite());
        assert!(node.cost_vector()[id(3)].is_infinite());
    }

    #[test]
    fn test_link_cost_increase_recomputes_row() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        let packet = PacketFactory::create(id(1), id(0), [c(1), c(0), c(1), c(3)]);
        node.on_packet_arrival(&packet, &mut out).unwrap();
        out.sent.clear();

        let changed = node.on_link_cost_change(id(1), c(20), &mut out).unwrap();

        assert!(changed);
        assert_eq!(node.link_cost(id(1)), c(20));
        assert_eq!(node.table().get(id(0), id(1)), c(20));
        assert_eq!(node.table().row(id(1)), &[c(21), c(20), c(21), c(23)]);
        // nothing heard from 2 or 3 yet, so the direct link is still best to 1
        assert_eq!(node.cost_vector().costs(), &[c(0), c(20), c(3), c(7)]);
        assert_eq!(out.sent.len(), 3);
        assert_eq!(node.stats().link_changes, 1);
    }

    #[test]
    fn test_link_failure_stops_sending_to_neighbor() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        out.sent.clear();

        node.on_link_cost_change(id(3), INF, &mut out).unwrap();

        assert_eq!(node.neighbors().collect::<Vec<_>>(), vec![id(1), id(2)]);
        assert!(out.sent.iter().all(|p| p.dest() != id(3)));
        assert!(node.cost_vector()[id(3)].is_infinite());
    }

    #[test]
    fn test_link_up_always_advertises() {
        // 0 reaches 3 through 2 at cost 3 before the direct link exists
        let mut node = NodeAgent::new(id(0), [c(0), INF, c(1), INF], NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        let packet = PacketFactory::create(id(2), id(0), [c(1), INF, c(0), c(2)]);
        node.on_packet_arrival(&packet, &mut out).unwrap();
        out.sent.clear();

        // a costlier direct link changes nothing in the vector
        let changed = node.on_link_cost_change(id(3), c(5), &mut out).unwrap();

        assert!(changed);
        assert_eq!(node.cost_vector()[id(3)], c(3));
        assert!(out.sent.iter().any(|p| p.dest() == id(3)));
        assert_eq!(node.table().get(id(0), id(3)), c(5));
        assert!(node.table().row(id(3)).iter().all(|cost| cost.is_infinite()));
    }

    #[test]
    fn test_link_change_to_self_rejected() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        let err = node.on_link_cost_change(id(0), c(1), &mut out).unwrap_err();
        assert!(matches!(err, SimError::InvalidTopology(_)));
    }

    #[test]
    fn test_poisoned_reverse_advertisement() {
        let mut node = classic_node0(NodeConfig {
            poisoned_reverse: true,
        });
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();
        out.sent.clear();

        // route to 2 now goes through 1
        let packet = PacketFactory::create(id(1), id(0), [c(1), c(0), c(1), INF]);
        node.on_packet_arrival(&packet, &mut out).unwrap();

        let to_one = out.sent.iter().find(|p| p.dest() == id(1)).unwrap();
        assert!(to_one.min_cost()[2].is_infinite());
        let to_three = out.sent.iter().find(|p| p.dest() == id(3)).unwrap();
        assert_eq!(to_three.min_cost()[2], c(2));
    }

    #[test]
    fn test_snapshot_json() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();

        let snapshot = node.snapshot();
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["id"], 0);
        assert_eq!(value["cost_vector"], serde_json::json!([0, 1, 3, 7]));
        assert_eq!(value["table"]["costs"][1], serde_json::json!([999, 999, 999, 999]));
        assert_eq!(value["stats"]["packets_sent"], 3);

        let back: NodeSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut node = classic_node0(NodeConfig::default());
        let mut out = Outbox::default();
        node.initialize(&mut out).unwrap();

        let snapshot = node.snapshot();
        node.on_link_cost_change(id(1), c(50), &mut out).unwrap();

        assert_eq!(snapshot.link_costs[1], c(1));
        assert_eq!(snapshot.cost_vector[id(1)], c(1));
        assert_eq!(node.cost_vector()[id(1)], c(50));
    }
}
