//! Transmission delay sources.

use crate::types::NodeId;

/// Produces the simulated-time delta for each packet transmission.
///
/// This is the only source of non-determinism in a run. Implementations
/// backed by a seeded RNG make runs reproducible; tests can substitute a
/// [`FixedDelay`] or a closure.
pub trait DelaySource {
    /// Returns a non-negative delay for a packet travelling `from -> to`.
    fn delay(&mut self, from: NodeId, to: NodeId) -> f64;
}

impl<F> DelaySource for F
where
    F: FnMut(NodeId, NodeId) -> f64,
{
    fn delay(&mut self, from: NodeId, to: NodeId) -> f64 {
        self(from, to)
    }
}

/// Every transmission takes the same time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDelay(pub f64);

impl DelaySource for FixedDelay {
    fn delay(&mut self, _from: NodeId, _to: NodeId) -> f64 {
        self.0
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self(1.0)
    }
}
