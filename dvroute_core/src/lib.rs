//! DVRoute Core - Distributed Bellman-Ford Routing Protocol
//!
//! Each router keeps a distance table of costs via every first hop, derives
//! its minimum-cost vector from it, and advertises that vector to its direct
//! neighbors whenever it changes:
//! 1. **Distance table**: `costs[via][dest]`, owned by exactly one node
//! 2. **Packet factory**: immutable advertisements, optionally poisoned
//! 3. **Node agent**: initialize / packet arrival / link-cost change
//!
//! Nodes never see each other's tables. Everything they learn arrives in a
//! [`dvroute_env::RoutingPacket`] delivered through a [`dvroute_env::Transport`].

pub mod distance_table;
pub mod node;
pub mod packet;

// Re-export key types for convenience
pub use distance_table::{CostVector, DistanceTable};
pub use node::{NodeAgent, NodeConfig, NodeSnapshot, NodeStats};
pub use packet::PacketFactory;
