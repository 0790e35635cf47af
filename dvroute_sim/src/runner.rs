//! Scenario runner - executes routing scenarios and checks them against the oracle.

use crate::context::DelayModel;
use crate::oracle::Oracle;
use crate::scenarios::ScenarioId;
use crate::simulator::{HaltReason, SimConfig, Simulator};

use dvroute_env::{Cost, NodeId, SimError, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default cap on dispatched events per run.
pub const DEFAULT_MAX_EVENTS: u64 = 200_000;

/// Results from running a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total events dispatched
    pub events_dispatched: u64,

    /// Final simulation clock
    pub final_time: SimTime,

    /// Why the simulator stopped (None if it never started)
    pub halt: Option<HaltReason>,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// Routing packets put on a link
    pub packets_sent: u64,

    /// Advertisements across all nodes, including startup
    pub broadcasts: u64,

    /// Link-cost change events applied
    pub link_changes: u64,
}

impl ScenarioResult {
    /// Result for a run that could not be set up or aborted with an error.
    pub fn errored(scenario: &str, seed: u64, error: &SimError) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            passed: false,
            events_dispatched: 0,
            final_time: SimTime::ZERO,
            halt: None,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
        }
    }
}

/// A finished run together with the simulator it ran on.
pub struct ScenarioRun {
    pub result: ScenarioResult,
    pub simulator: Simulator,
    pub oracle: Oracle,
}

impl ScenarioRun {
    /// Shortest-path cost the oracle expects from `node` to `dest`.
    pub fn expected(&self, node: NodeId, dest: NodeId) -> Cost {
        self.oracle.cost(node, dest)
    }
}

/// Runs routing scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Event cap per run
    max_events: u64,

    /// Enable poisoned reverse on every node
    poisoned_reverse: bool,

    /// Replaces the configured delay model when set
    delay: Option<DelayModel>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_events: DEFAULT_MAX_EVENTS,
            poisoned_reverse: false,
            delay: None,
        }
    }

    /// Sets the event cap.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = max_events;
        self
    }

    /// Enables or disables poisoned reverse.
    pub fn with_poisoned_reverse(mut self, enabled: bool) -> Self {
        self.poisoned_reverse = enabled;
        self
    }

    /// Overrides the transmission delay model.
    pub fn with_delay(mut self, delay: DelayModel) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        match self.execute(scenario) {
            Ok(run) => run.result,
            Err(e) => ScenarioResult::errored(scenario.name(), self.seed, &e),
        }
    }

    /// Runs a scenario and keeps the simulator for inspection.
    pub fn execute(&self, scenario: ScenarioId) -> Result<ScenarioRun, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);
        debug!("{}", scenario.description());

        let config = scenario.config(self.seed)?;
        let mut run = self.execute_config(scenario.name(), config)?;

        if run.result.passed {
            for (node, dest, expected) in scenario.expectations() {
                let actual = run.simulator.snapshot(node).cost_vector[dest];
                if actual != expected {
                    run.result.passed = false;
                    run.result.failure_reason = Some(format!(
                        "node {} -> {}: expected {}, got {}",
                        node, dest, expected, actual
                    ));
                    break;
                }
            }
        }
        Ok(run)
    }

    /// Runs an arbitrary configuration under this runner's overrides.
    pub fn execute_config(&self, name: &str, mut config: SimConfig) -> Result<ScenarioRun, SimError> {
        config.seed = self.seed;
        config.max_events = Some(self.max_events);
        config.poisoned_reverse = self.poisoned_reverse;
        if let Some(delay) = &self.delay {
            config.delay = delay.clone();
        }

        let final_topology = config.topology.after(&config.link_changes);
        let oracle = Oracle::new(final_topology.costs());

        let mut simulator = Simulator::new(config)?;
        let summary = simulator.run()?;

        let snapshots = simulator.snapshots();
        let metrics = ScenarioMetrics {
            packets_sent: summary.packets_sent,
            broadcasts: snapshots.iter().map(|s| s.stats.broadcasts).sum(),
            link_changes: snapshots.iter().map(|s| s.stats.link_changes).sum(),
        };

        let failure_reason = if summary.halt != HaltReason::Quiescent {
            warn!("{} did not converge within {} events", name, self.max_events);
            Some(format!("no convergence within {} events", self.max_events))
        } else {
            let mismatches = oracle.check(&snapshots);
            mismatches.first().map(|first| {
                format!(
                    "{} route(s) differ from shortest paths, first: {}",
                    mismatches.len(),
                    first
                )
            })
        };

        let result = ScenarioResult {
            scenario: name.to_string(),
            seed: self.seed,
            passed: failure_reason.is_none(),
            events_dispatched: summary.events_dispatched,
            final_time: summary.final_time,
            halt: Some(summary.halt),
            failure_reason,
            metrics,
        };

        Ok(ScenarioRun {
            result,
            simulator,
            oracle,
        })
    }
}
