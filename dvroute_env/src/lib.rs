//! Distance-Vector Simulator Environment Layer
//!
//! Everything a node agent touches that is not routing logic lives here:
//! identifiers, the saturating cost type, the simulated clock value, the
//! packet envelope, and the two seams through which the outside world
//! reaches a node:
//!
//! - [`Transport`]: where outgoing packets go
//! - [`DelaySource`]: how long each transmission takes
//!
//! The simulator supplies both. Because all entropy enters through the delay
//! source, seeding it makes an entire run reproducible.

mod delay;
mod error;
mod network;
mod types;

pub use delay::{DelaySource, FixedDelay};
pub use error::SimError;
pub use network::Transport;
pub use types::{Cost, NodeId, RoutingPacket, SimTime, NUM_NODES};
