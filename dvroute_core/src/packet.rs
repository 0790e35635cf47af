//! Routing-update packet construction.

use crate::distance_table::DistanceTable;
use dvroute_env::{Cost, NodeId, RoutingPacket, NUM_NODES};

/// Builds the packets a node advertises to its neighbors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketFactory {
    /// Advertise infinity back toward the next hop of each route
    poisoned_reverse: bool,
}

impl PacketFactory {
    /// Creates a factory.
    pub fn new(poisoned_reverse: bool) -> Self {
        Self { poisoned_reverse }
    }

    /// Builds a packet from an explicit cost array.
    ///
    /// The array is copied, so the caller may keep mutating its own vector.
    pub fn create(source: NodeId, dest: NodeId, min_costs: [Cost; NUM_NODES]) -> RoutingPacket {
        RoutingPacket::new(source, dest, min_costs)
    }

    /// Builds the advertisement `table`'s owner sends to `neighbor`.
    ///
    /// Without poisoned reverse this is the plain cost vector. With it, any
    /// destination whose best route leaves through `neighbor` is advertised
    /// as unreachable.
    pub fn advertisement(&self, table: &DistanceTable, neighbor: NodeId) -> RoutingPacket {
        let mut costs = *table.cost_vector().costs();

        if self.poisoned_reverse {
            for (dest, hop) in table.next_hops().iter().enumerate() {
                if *hop == Some(neighbor) {
                    costs[dest] = Cost::INFINITY;
                }
            }
        }

        Self::create(table.owner(), neighbor, costs)
    }
}
