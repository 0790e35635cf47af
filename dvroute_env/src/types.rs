//! Common types shared by the routing protocol and the simulator.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Number of nodes in the simulated network.
pub const NUM_NODES: usize = 4;

/// Identifier of one of the fixed network nodes (0..=3).
///
/// A `NodeId` can only be built through [`NodeId::new`] or [`NodeId::all`],
/// so holding one means the id is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u8")]
pub struct NodeId(u8);

impl NodeId {
    /// Creates a NodeId, rejecting ids outside the fixed range.
    pub fn new(raw: u32) -> Result<Self, SimError> {
        if (raw as usize) < NUM_NODES {
            Ok(Self(raw as u8))
        } else {
            Err(SimError::UnknownEntity(raw))
        }
    }

    /// Returns every node id in ascending order.
    pub fn all() -> [NodeId; NUM_NODES] {
        [NodeId(0), NodeId(1), NodeId(2), NodeId(3)]
    }

    /// Returns the id as an array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw id.
    pub fn as_u8(self) -> u8 {
        self.0
    }
}

impl TryFrom<u32> for NodeId {
    type Error = SimError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<NodeId> for u8 {
    fn from(id: NodeId) -> u8 {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A link or path cost.
///
/// Costs are non-negative integers with a sentinel [`Cost::INFINITY`] for
/// unreachable destinations. Addition saturates: any sum that reaches the
/// sentinel is infinity, and infinity plus anything stays infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Cost(u32);

impl Cost {
    /// Sentinel for "no known path".
    pub const INFINITY: Cost = Cost(999);

    /// Cost of reaching yourself.
    pub const ZERO: Cost = Cost(0);

    /// Creates a cost; anything at or above the sentinel is infinity.
    pub fn new(value: u32) -> Self {
        Self(value.min(Self::INFINITY.0))
    }

    /// Returns true for the unreachable sentinel.
    pub fn is_infinite(self) -> bool {
        self == Self::INFINITY
    }

    /// Returns the finite value, or `None` for infinity.
    pub fn finite(self) -> Option<u32> {
        if self.is_infinite() {
            None
        } else {
            Some(self.0)
        }
    }

    /// Returns the raw value (infinity reads as the sentinel).
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost::new(self.0.saturating_add(rhs.0))
    }
}

impl From<u32> for Cost {
    fn from(value: u32) -> Self {
        Cost::new(value)
    }
}

impl From<Cost> for u32 {
    fn from(cost: Cost) -> u32 {
        cost.0
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            f.pad("inf")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}

/// A point on the simulated clock.
///
/// Wraps an `f64` with a total order so it can key an ordered map.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every simulation.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates a time from a raw value.
    pub fn new(t: f64) -> Self {
        Self(t)
    }

    /// Returns the raw value.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, delay: f64) -> SimTime {
        SimTime(self.0 + delay)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Routing-update packet carried between neighboring nodes.
///
/// An immutable snapshot of the sender's minimum-cost vector. The cost
/// array is owned by value, so later changes to the sender's table never
/// reach a packet already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPacket {
    source: NodeId,
    dest: NodeId,
    min_cost: [Cost; NUM_NODES],
}

impl RoutingPacket {
    /// Creates a new packet.
    pub fn new(source: NodeId, dest: NodeId, min_cost: [Cost; NUM_NODES]) -> Self {
        Self {
            source,
            dest,
            min_cost,
        }
    }

    /// Node that sent the packet.
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Node the packet is addressed to.
    pub fn dest(&self) -> NodeId {
        self.dest
    }

    /// Sender's advertised cost to each destination.
    pub fn min_cost(&self) -> &[Cost; NUM_NODES] {
        &self.min_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_range() {
        assert_eq!(NodeId::new(3).unwrap().index(), 3);
        assert_eq!(NodeId::new(4), Err(SimError::UnknownEntity(4)));
        assert_eq!(NodeId::all().len(), NUM_NODES);
    }

    #[test]
    fn test_node_id_serde_rejects_out_of_range() {
        let ok: NodeId = serde_json::from_str("2").unwrap();
        assert_eq!(ok.as_u8(), 2);
        assert!(serde_json::from_str::<NodeId>("9").is_err());
    }

    #[test]
    fn test_cost_saturates() {
        let one = Cost::new(1);
        assert_eq!(one + Cost::new(2), Cost::new(3));
        assert_eq!(Cost::INFINITY + one, Cost::INFINITY);
        assert_eq!(one + Cost::INFINITY, Cost::INFINITY);
        assert_eq!(Cost::new(998) + one, Cost::INFINITY);
        assert_eq!(Cost::new(u32::MAX) + Cost::new(u32::MAX), Cost::INFINITY);
        assert!(Cost::new(5000).is_infinite());
        assert_eq!(Cost::INFINITY.finite(), None);
    }

    #[test]
    fn test_cost_display() {
        assert_eq!(format!("{:>4}", Cost::new(7)), "   7");
        assert_eq!(format!("{:>4}", Cost::INFINITY), " inf");
    }

    #[test]
    fn test_sim_time_total_order() {
        let a = SimTime::new(1.5);
        let b = a + 0.5;
        assert!(a < b);
        assert_eq!(b, SimTime::new(2.0));
        assert_eq!(SimTime::ZERO.as_f64(), 0.0);
    }

    #[test]
    fn test_packet_copies_costs() {
        let src = NodeId::new(0).unwrap();
        let dst = NodeId::new(1).unwrap();
        let mut costs = [Cost::ZERO, Cost::new(1), Cost::new(2), Cost::INFINITY];
        let packet = RoutingPacket::new(src, dst, costs);
        costs[1] = Cost::new(50);
        assert_eq!(packet.min_cost()[1], Cost::new(1));
        assert_eq!(packet.source(), src);
        assert_eq!(packet.dest(), dst);
    }
}
