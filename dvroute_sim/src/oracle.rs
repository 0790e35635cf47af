//! Ground truth oracle for simulation.
//!
//! The Oracle has the "God's eye view" the routers never get: it runs
//! Floyd–Warshall over the whole cost matrix and reports where the nodes'
//! converged cost vectors disagree with true shortest paths.

use dvroute_core::{CostVector, NodeSnapshot};
use dvroute_env::{Cost, NodeId, NUM_NODES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A destination whose converged cost differs from the true shortest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMismatch {
    pub node: NodeId,
    pub dest: NodeId,
    pub expected: Cost,
    pub actual: Cost,
}

impl fmt::Display for RouteMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} -> {}: expected {}, got {}",
            self.node, self.dest, self.expected, self.actual
        )
    }
}

/// All-pairs shortest path costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oracle {
    dist: [[Cost; NUM_NODES]; NUM_NODES],
}

impl Oracle {
    /// Runs Floyd–Warshall over a (possibly directed) cost matrix.
    pub fn new(costs: &[[Cost; NUM_NODES]; NUM_NODES]) -> Self {
        let mut dist = *costs;
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = Cost::ZERO;
        }

        for k in 0..NUM_NODES {
            for i in 0..NUM_NODES {
                for j in 0..NUM_NODES {
                    let through_k = dist[i][k] + dist[k][j];
                    if through_k < dist[i][j] {
                        dist[i][j] = through_k;
                    }
                }
            }
        }

        Self { dist }
    }

    /// Shortest cost from `from` to `to`.
    pub fn cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.dist[from.index()][to.index()]
    }

    /// Expected converged cost vector of `node`.
    pub fn vector(&self, node: NodeId) -> CostVector {
        CostVector::new(self.dist[node.index()])
    }

    /// Full distance matrix.
    pub fn matrix(&self) -> &[[Cost; NUM_NODES]; NUM_NODES] {
        &self.dist
    }

    /// Compares each node's cost vector against ground truth.
    pub fn check(&self, snapshots: &[NodeSnapshot]) -> Vec<RouteMismatch> {
        let mut mismatches = Vec::new();
        for snapshot in snapshots {
            for dest in NodeId::all() {
                let expected = self.cost(snapshot.id, dest);
                let actual = snapshot.cost_vector[dest];
                if expected != actual {
                    mismatches.push(RouteMismatch {
                        node: snapshot.id,
                        dest,
                        expected,
                        actual,
                    });
                }
            }
        }
        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Topology;

    fn id(n: u32) -> NodeId {
        NodeId::new(n).unwrap()
    }

    #[test]
    fn test_oracle_classic_shortest_paths() {
        let oracle = Oracle::new(Topology::classic().costs());

        assert_eq!(oracle.cost(id(0), id(2)), Cost::new(2));
        assert_eq!(oracle.cost(id(0), id(3)), Cost::new(4));
        assert_eq!(oracle.cost(id(1), id(3)), Cost::new(3));
        assert_eq!(
            oracle.vector(id(3)).costs(),
            &[Cost::new(4), Cost::new(3), Cost::new(2), Cost::ZERO]
        );
    }

    #[test]
    fn test_oracle_unreachable_is_infinite() {
        let topology = Topology::from_links(&[(0, 1, 1), (2, 3, 1)]).unwrap();
        let oracle = Oracle::new(topology.costs());

        assert!(oracle.cost(id(0), id(3)).is_infinite());
        assert_eq!(oracle.cost(id(3), id(2)), Cost::new(1));
    }

    #[test]
    fn test_oracle_saturates_long_paths() {
        let topology = Topology::from_links(&[(0, 1, 600), (1, 2, 600)]).unwrap();
        let oracle = Oracle::new(topology.costs());
        assert!(oracle.cost(id(0), id(2)).is_infinite());
    }

    #[test]
    fn test_check_reports_mismatch() {
        use dvroute_core::{DistanceTable, NodeStats};

        let oracle = Oracle::new(Topology::classic().costs());
        let snapshot = NodeSnapshot {
            id: id(3),
            table: DistanceTable::new(id(3)),
            cost_vector: CostVector::new([Cost::new(4), Cost::new(3), Cost::new(5), Cost::ZERO]),
            link_costs: Topology::classic().link_costs(id(3)),
            stats: NodeStats::default(),
        };

        let mismatches = oracle.check(&[snapshot]);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].dest, id(2));
        assert_eq!(mismatches[0].expected, Cost::new(2));
        assert_eq!(mismatches[0].to_string(), "node 3 -> 2: expected 2, got 5");
    }
}
