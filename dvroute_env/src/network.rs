//! Transport abstraction between a node agent and whatever carries its packets.

use crate::error::SimError;
use crate::types::{RoutingPacket, SimTime};

/// Outbound side of a node's link layer.
///
/// A node agent never schedules anything itself; it hands finished packets
/// to a `Transport`, which decides when they arrive.
///
/// # Packet Flow
///
/// ```text
/// Node A                    Transport                  Node B
///   |                           |                          |
///   |-- send(packet) ---------->|                          |
///   |                           |-- [link delay] --------->|
///   |                           |                          |-- on_packet_arrival()
/// ```
pub trait Transport {
    /// Queues a packet for delivery to `packet.dest()`.
    ///
    /// # Returns
    /// * `Ok(())` - Arrival scheduled
    /// * `Err(SimError::NotNeighbor)` - No live link between source and dest
    fn send(&mut self, packet: RoutingPacket) -> Result<(), SimError>;

    /// Current simulated time as seen by the sender.
    fn now(&self) -> SimTime;
}
