//! Network topology and scheduled link-cost changes.

use dvroute_env::{Cost, NodeId, SimError, NUM_NODES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Symmetric 4x4 link-cost matrix.
///
/// The diagonal is zero and pairs without a link are [`Cost::INFINITY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTopology", into = "RawTopology")]
pub struct Topology {
    costs: [[Cost; NUM_NODES]; NUM_NODES],
}

/// On-disk form, validated into a [`Topology`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTopology {
    costs: [[Cost; NUM_NODES]; NUM_NODES],
}

impl TryFrom<RawTopology> for Topology {
    type Error = SimError;

    fn try_from(raw: RawTopology) -> Result<Self, Self::Error> {
        Topology::new(raw.costs)
    }
}

impl From<Topology> for RawTopology {
    fn from(topology: Topology) -> Self {
        RawTopology {
            costs: topology.costs,
        }
    }
}

impl Topology {
    /// Validates and wraps a cost matrix.
    pub fn new(costs: [[Cost; NUM_NODES]; NUM_NODES]) -> Result<Self, SimError> {
        for i in 0..NUM_NODES {
            if costs[i][i] != Cost::ZERO {
                return Err(SimError::topology(format!(
                    "cost from node {} to itself must be 0, got {}",
                    i, costs[i][i]
                )));
            }
            for j in (i + 1)..NUM_NODES {
                if costs[i][j] != costs[j][i] {
                    return Err(SimError::topology(format!(
                        "link {}-{} is asymmetric ({} vs {})",
                        i, j, costs[i][j], costs[j][i]
                    )));
                }
            }
        }
        Ok(Self { costs })
    }

    /// Network with no links at all.
    pub fn disconnected() -> Self {
        let mut costs = [[Cost::INFINITY; NUM_NODES]; NUM_NODES];
        for (i, row) in costs.iter_mut().enumerate() {
            row[i] = Cost::ZERO;
        }
        Self { costs }
    }

    /// Builds a topology from `(a, b, cost)` triples; unlisted pairs have no link.
    pub fn from_links(links: &[(u32, u32, u32)]) -> Result<Self, SimError> {
        let mut topology = Self::disconnected();
        for &(a, b, cost) in links {
            let (a, b) = (NodeId::new(a)?, NodeId::new(b)?);
            if a == b {
                return Err(SimError::topology(format!("self-link on node {}", a)));
            }
            topology.set_link(a, b, Cost::new(cost));
        }
        Ok(topology)
    }

    /// The four-router network from the textbook exercise.
    ///
    /// ```text
    ///        1
    ///   0 ------- 1
    ///   | \       |
    /// 7 |  \3     | 1
    ///   |   \     |
    ///   3 ------- 2
    ///        2
    /// ```
    pub fn classic() -> Self {
        let mut topology = Self::disconnected();
        for (a, b, cost) in [(0, 1, 1), (0, 2, 3), (0, 3, 7), (1, 2, 1), (2, 3, 2)] {
            topology.costs[a][b] = Cost::new(cost);
            topology.costs[b][a] = Cost::new(cost);
        }
        topology
    }

    /// Loads a topology from a JSON file of the form `{"costs": [[...], ...]}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path).map_err(SimError::io)?;
        serde_json::from_str(&text).map_err(|e| SimError::topology(e.to_string()))
    }

    /// Cost of the direct link `a - b`.
    pub fn cost(&self, a: NodeId, b: NodeId) -> Cost {
        self.costs[a.index()][b.index()]
    }

    /// Row of direct costs from `node`.
    pub fn link_costs(&self, node: NodeId) -> [Cost; NUM_NODES] {
        self.costs[node.index()]
    }

    /// Full matrix.
    pub fn costs(&self) -> &[[Cost; NUM_NODES]; NUM_NODES] {
        &self.costs
    }

    /// Sets both directions of a link.
    pub fn set_link(&mut self, a: NodeId, b: NodeId, cost: Cost) {
        self.costs[a.index()][b.index()] = cost;
        self.costs[b.index()][a.index()] = cost;
    }

    /// Returns the topology after applying `changes` in order.
    pub fn after(&self, changes: &[LinkChange]) -> Topology {
        let mut next = self.clone();
        for change in changes {
            next.set_link(change.a, change.b, change.cost);
        }
        next
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::classic()
    }
}

/// A link whose cost changes at a given time.
///
/// Each change is delivered to both endpoints as two events at `time`,
/// first to `a`, then to `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLinkChange", into = "RawLinkChange")]
pub struct LinkChange {
    pub time: f64,
    pub a: NodeId,
    pub b: NodeId,
    pub cost: Cost,
}

/// On-disk form, validated into a [`LinkChange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLinkChange {
    time: f64,
    a: NodeId,
    b: NodeId,
    cost: Cost,
}

impl TryFrom<RawLinkChange> for LinkChange {
    type Error = SimError;

    fn try_from(raw: RawLinkChange) -> Result<Self, Self::Error> {
        let change = LinkChange {
            time: raw.time,
            a: raw.a,
            b: raw.b,
            cost: raw.cost,
        };
        change.validate()?;
        Ok(change)
    }
}

impl From<LinkChange> for RawLinkChange {
    fn from(change: LinkChange) -> Self {
        RawLinkChange {
            time: change.time,
            a: change.a,
            b: change.b,
            cost: change.cost,
        }
    }
}

impl LinkChange {
    /// Creates a validated link change from raw ids.
    pub fn new(time: f64, a: u32, b: u32, cost: u32) -> Result<Self, SimError> {
        let change = Self {
            time,
            a: NodeId::new(a)?,
            b: NodeId::new(b)?,
            cost: Cost::new(cost),
        };
        change.validate()?;
        Ok(change)
    }

    /// Rejects self-links and times that are negative or not finite.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.a == self.b {
            return Err(SimError::topology(format!("link change on self-link {}", self.a)));
        }
        if !self.time.is_finite() || self.time < 0.0 {
            return Err(SimError::topology(format!(
                "link change at invalid time {}",
                self.time
            )));
        }
        Ok(())
    }

    /// The textbook schedule: link 0-1 goes to 20 at t=10000 and back to 1 at t=20000.
    pub fn classic_schedule() -> Vec<LinkChange> {
        let at = |time: f64, cost: u32| LinkChange {
            time,
            a: NodeId::all()[0],
            b: NodeId::all()[1],
            cost: Cost::new(cost),
        };
        vec![at(10000.0, 20), at(20000.0, 1)]
    }
}
