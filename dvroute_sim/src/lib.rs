//! DVRoute Discrete-Event Simulator
//!
//! Runs four [`dvroute_core::NodeAgent`]s on one simulated clock. The
//! simulator owns every piece of mutable state: the event queue, the link
//! layer, the delay source and the nodes themselves.
//!
//! # Core Principle: One Clock, One Queue
//!
//! - **Time**: the clock only moves when the next event is dispatched
//! - **Network**: a send becomes a packet-arrival event `delay` later,
//!   in send order per link
//! - **Randomness**: all delays come from a single seeded source
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Simulator                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ EventQueue (time, sequence) -> Event                 │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │ dispatch                  ▲ schedule                │
//! │  ┌────▼────┐   SimNetwork    ┌────┴─────┐                   │
//! │  │  Node   │────────────────►│LinkLayer │◄── DelaySource    │
//! │  │  0..3   │                 └──────────┘                   │
//! │  └─────────┘                                                │
//! │       │ snapshots                                           │
//! │  ┌────▼──────────────────────────────┐                      │
//! │  │ Oracle (Floyd–Warshall)           │                      │
//! │  └───────────────────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use dvroute_sim::{SimConfig, Simulator};
//!
//! let mut sim = Simulator::new(SimConfig {
//!     seed: 42,
//!     ..Default::default()
//! })
//! .unwrap();
//! let summary = sim.run().unwrap();
//! assert!(summary.events_dispatched > 0);
//! ```

mod context;
mod event_queue;
mod exporter;
mod network;
mod oracle;
mod runner;
pub mod scenarios;
mod simulator;
mod topology;

pub use context::{DelayModel, ExponentialDelay, UniformDelay};
pub use event_queue::{Event, EventKey, EventKind, EventQueue};
pub use exporter::SimExport;
pub use network::{LinkLayer, SimNetwork};
pub use oracle::{Oracle, RouteMismatch};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRun, ScenarioRunner, DEFAULT_MAX_EVENTS};
pub use simulator::{DispatchKind, DispatchRecord, HaltReason, RunSummary, SimConfig, SimState, Simulator};
pub use topology::{LinkChange, Topology};
