//! Simulator - the single-threaded dispatch loop that owns all simulation state.

use crate::context::DelayModel;
use crate::event_queue::{Event, EventKind, EventQueue};
use crate::network::{LinkLayer, SimNetwork};
use crate::topology::{LinkChange, Topology};

use dvroute_core::{NodeAgent, NodeConfig, NodeSnapshot};
use dvroute_env::{Cost, DelaySource, NodeId, SimError, SimTime, NUM_NODES};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the delay source
    pub seed: u64,

    /// Initial link costs
    pub topology: Topology,

    /// Link-cost changes injected before the run starts
    pub link_changes: Vec<LinkChange>,

    /// Halt after this many dispatched events (None = run until quiet)
    pub max_events: Option<u64>,

    /// Nodes advertise infinity back toward a route's next hop
    pub poisoned_reverse: bool,

    /// Links deliver in send order
    pub fifo_links: bool,

    /// Transmission delay distribution
    pub delay: DelayModel,

    /// Keep a record of every dispatched event
    pub record_trace: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            topology: Topology::classic(),
            link_changes: Vec::new(),
            max_events: None,
            poisoned_reverse: false,
            fifo_links: true,
            delay: DelayModel::default(),
            record_trace: true,
        }
    }
}

/// Why the dispatch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// No events left: every node has converged
    Quiescent,

    /// The configured event limit was reached
    EventLimit,

    /// A dispatch failed; the state is not trustworthy
    Fault,
}

/// Simulator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Running,
    Halted(HaltReason),
}

/// What a dispatched event was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchKind {
    PacketArrival {
        source: NodeId,
        min_cost: [Cost; NUM_NODES],
    },
    LinkCostChange {
        neighbor: NodeId,
        cost: Cost,
    },
}

/// One entry of the dispatch trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// 1-based dispatch index
    pub index: u64,

    /// Clock value at dispatch
    pub time: SimTime,

    /// Node the event was delivered to
    pub target: NodeId,

    pub kind: DispatchKind,

    /// Whether the target re-advertised as a result
    pub broadcast: bool,
}

/// Outcome of [`Simulator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub halt: HaltReason,
    pub events_dispatched: u64,
    pub final_time: SimTime,
    pub packets_sent: u64,
}

/// The Simulator - owns the clock, the event queue, the links and the nodes.
///
/// Nothing here is global, so independent simulators can run side by side.
pub struct Simulator {
    config: SimConfig,

    /// Simulated clock, advanced only by dispatch
    clock: SimTime,

    queue: EventQueue,

    /// One agent per node, indexed by `NodeId::index`
    nodes: Vec<NodeAgent>,

    links: LinkLayer,

    delay: Box<dyn DelaySource>,

    state: SimState,

    dispatched: u64,

    trace: Vec<DispatchRecord>,
}

impl Simulator {
    /// Creates a simulator using the delay model from `config`.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let delay = config.delay.build(config.seed)?;
        Self::with_delay_source(config, delay)
    }

    /// Creates a simulator with an explicit delay source.
    ///
    /// Link changes are validated first. Every node is then initialized at
    /// t=0 (in id order, each advertising its direct costs), and each link
    /// change is injected as two events, one per endpoint.
    pub fn with_delay_source(config: SimConfig, delay: Box<dyn DelaySource>) -> Result<Self, SimError> {
        for change in &config.link_changes {
            change.validate()?;
        }

        let node_config = NodeConfig {
            poisoned_reverse: config.poisoned_reverse,
        };
        let nodes = NodeId::all()
            .into_iter()
            .map(|id| NodeAgent::new(id, config.topology.link_costs(id), node_config))
            .collect();
        let links = LinkLayer::new(&config.topology, config.fifo_links);

        let mut sim = Self {
            config,
            clock: SimTime::ZERO,
            queue: EventQueue::new(),
            nodes,
            links,
            delay,
            state: SimState::Running,
            dispatched: 0,
            trace: Vec::new(),
        };

        for node in sim.nodes.iter_mut() {
            let mut net = SimNetwork::new(sim.clock, &mut sim.queue, &mut sim.links, sim.delay.as_mut());
            node.initialize(&mut net)?;
        }

        for change in &sim.config.link_changes {
            let at = SimTime::new(change.time);
            sim.queue.insert(Event::link_cost_change(at, change.a, change.b, change.cost));
            sim.queue.insert(Event::link_cost_change(at, change.b, change.a, change.cost));
        }

        debug!(
            "simulator ready: {} events pending, {} link changes",
            sim.queue.len(),
            sim.config.link_changes.len()
        );
        Ok(sim)
    }

    /// Dispatches exactly one event.
    ///
    /// Returns `Ok(None)` once the simulator is halted, either because the
    /// queue is empty or because the event limit was reached.
    pub fn step(&mut self) -> Result<Option<DispatchRecord>, SimError> {
        if let SimState::Halted(_) = self.state {
            return Ok(None);
        }

        if self.queue.is_empty() {
            info!("converged at t={} after {} events", self.clock, self.dispatched);
            self.state = SimState::Halted(HaltReason::Quiescent);
            return Ok(None);
        }

        if self.config.max_events.is_some_and(|max| self.dispatched >= max) {
            warn!(
                "event limit {} reached at t={} with {} events pending",
                self.dispatched,
                self.clock,
                self.queue.len()
            );
            self.state = SimState::Halted(HaltReason::EventLimit);
            return Ok(None);
        }

        let event = self.queue.pop_earliest()?;
        match self.dispatch(event) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                self.state = SimState::Halted(HaltReason::Fault);
                Err(e)
            }
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<DispatchRecord, SimError> {
        if event.time < self.clock {
            return Err(SimError::OutOfOrderEvent {
                event_time: event.time.as_f64(),
                clock: self.clock.as_f64(),
            });
        }
        self.clock = event.time;
        self.dispatched += 1;

        let target = event.target;
        let node = &mut self.nodes[target.index()];

        let (kind, broadcast) = match event.kind {
            EventKind::PacketArrival(packet) => {
                let mut net = SimNetwork::new(self.clock, &mut self.queue, &mut self.links, self.delay.as_mut());
                let broadcast = node.on_packet_arrival(&packet, &mut net)?;
                let kind = DispatchKind::PacketArrival {
                    source: packet.source(),
                    min_cost: *packet.min_cost(),
                };
                (kind, broadcast)
            }
            EventKind::LinkCostChange { neighbor, cost } => {
                self.links.set_cost(target, neighbor, cost);
                let mut net = SimNetwork::new(self.clock, &mut self.queue, &mut self.links, self.delay.as_mut());
                let broadcast = node.on_link_cost_change(neighbor, cost, &mut net)?;
                (DispatchKind::LinkCostChange { neighbor, cost }, broadcast)
            }
        };

        let record = DispatchRecord {
            index: self.dispatched,
            time: self.clock,
            target,
            kind,
            broadcast,
        };
        trace!("dispatch #{} t={} -> node {}: {:?}", record.index, record.time, target, record.kind);

        if self.config.record_trace {
            self.trace.push(record.clone());
        }
        Ok(record)
    }

    /// Runs until the queue drains or the event limit is reached.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while self.step()?.is_some() {}
        Ok(self.summary())
    }

    /// Summary of the run so far. A simulator that is still running reports
    /// [`HaltReason::EventLimit`].
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            halt: match self.state {
                SimState::Halted(reason) => reason,
                SimState::Running => HaltReason::EventLimit,
            },
            events_dispatched: self.dispatched,
            final_time: self.clock,
            packets_sent: self.links.packets_scheduled(),
        }
    }

    /// Returns the current simulation clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Returns the state machine's state.
    pub fn state(&self) -> SimState {
        self.state
    }

    /// Returns the number of events dispatched.
    pub fn events_dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Returns the number of events still queued.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next queued event, if any.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.queue.peek_time()
    }

    /// Returns the recorded dispatch trace.
    pub fn trace(&self) -> &[DispatchRecord] {
        &self.trace
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current directed link costs (both ends agree once a change is fully applied).
    pub fn link_costs(&self) -> &[[Cost; NUM_NODES]; NUM_NODES] {
        self.links.costs()
    }

    /// Read-only copy of one node's state.
    pub fn snapshot(&self, id: NodeId) -> NodeSnapshot {
        self.nodes[id.index()].snapshot()
    }

    /// Read-only copies of every node's state, in id order.
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(NodeAgent::snapshot).collect()
    }
}
