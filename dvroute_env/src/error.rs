//! Error types for the distance-vector simulation environment.

use thiserror::Error;

/// Errors that can occur while configuring or running a simulation.
///
/// None of these are transient. Every variant halts the run it was raised in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Popped from an event queue with nothing left in it
    #[error("Event queue is empty")]
    EmptyQueue,

    /// Event or configuration addressed to a node outside the fixed range
    #[error("Unknown entity: {0}")]
    UnknownEntity(u32),

    /// Scheduler delivered an event earlier than the current clock
    #[error("Out-of-order event: event at t={event_time} but clock is t={clock}")]
    OutOfOrderEvent { event_time: f64, clock: f64 },

    /// Packet sent over a link that does not exist (or has failed)
    #[error("Node {from} has no link to node {to}")]
    NotNeighbor { from: u8, to: u8 },

    /// Link-cost matrix or link change rejected during validation
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Delay source produced a negative or non-finite delay
    #[error("Invalid transmission delay: {0}")]
    InvalidDelay(f64),

    /// Export or topology file could not be read or written
    #[error("I/O error: {0}")]
    Io(String),
}

impl SimError {
    /// Creates a topology error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }

    /// Creates an I/O error from anything displayable.
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }
}
