//! JSON exporter for finished runs.
//!
//! Writes the dispatch trace, every node's final table and the oracle's
//! expected matrix, for offline inspection or plotting.

use crate::runner::ScenarioRun;
use crate::simulator::{DispatchRecord, RunSummary};

use dvroute_core::NodeSnapshot;
use dvroute_env::{Cost, SimError, NUM_NODES};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub summary: RunSummary,

    /// Directed link costs at the end of the run
    pub link_costs: [[Cost; NUM_NODES]; NUM_NODES],

    /// Shortest-path costs the nodes should have converged to
    pub expected: [[Cost; NUM_NODES]; NUM_NODES],

    /// Final node state, in id order
    pub nodes: Vec<NodeSnapshot>,

    /// Every dispatched event (empty if tracing was off)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub trace: Vec<DispatchRecord>,
}

impl SimExport {
    /// Captures a finished run.
    pub fn from_run(run: &ScenarioRun) -> Self {
        let sim = &run.simulator;
        Self {
            scenario: run.result.scenario.clone(),
            seed: run.result.seed,
            passed: run.result.passed,
            failure_reason: run.result.failure_reason.clone(),
            summary: sim.summary(),
            link_costs: *sim.link_costs(),
            expected: *run.oracle.matrix(),
            nodes: sim.snapshots(),
            trace: sim.trace().to_vec(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self).map_err(SimError::io)?;
        let mut file = File::create(path).map_err(SimError::io)?;
        file.write_all(json.as_bytes()).map_err(SimError::io)?;
        Ok(())
    }
}
