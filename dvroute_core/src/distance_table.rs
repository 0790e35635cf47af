//! Per-node distance table and the cost vector derived from it.
//!
//! `costs[via][dest]` is the owner's best known cost to `dest` when the
//! first hop is `via`. The row for `via == owner` holds direct link costs.

use dvroute_env::{Cost, NodeId, NUM_NODES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Minimum cost from the owner to every destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostVector([Cost; NUM_NODES]);

impl CostVector {
    /// Wraps a raw cost array.
    pub fn new(costs: [Cost; NUM_NODES]) -> Self {
        Self(costs)
    }

    /// Returns the cost to `dest`.
    pub fn get(&self, dest: NodeId) -> Cost {
        self.0[dest.index()]
    }

    /// Returns the underlying array.
    pub fn costs(&self) -> &[Cost; NUM_NODES] {
        &self.0
    }
}

impl Index<NodeId> for CostVector {
    type Output = Cost;

    fn index(&self, dest: NodeId) -> &Cost {
        &self.0[dest.index()]
    }
}

impl fmt::Display for CostVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, cost) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", cost)?;
        }
        write!(f, "]")
    }
}

/// A node's 4x4 table of costs via each first hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceTable {
    /// Node that owns this table
    owner: NodeId,

    /// `costs[via][dest]`
    costs: [[Cost; NUM_NODES]; NUM_NODES],
}

impl DistanceTable {
    /// Creates a table where everything is unreachable except the owner itself.
    pub fn new(owner: NodeId) -> Self {
        let mut costs = [[Cost::INFINITY; NUM_NODES]; NUM_NODES];
        costs[owner.index()][owner.index()] = Cost::ZERO;
        Self { owner, costs }
    }

    /// Returns the owning node.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Cost to `dest` with `via` as the first hop.
    pub fn get(&self, via: NodeId, dest: NodeId) -> Cost {
        self.costs[via.index()][dest.index()]
    }

    /// Returns the whole row for one first hop.
    pub fn row(&self, via: NodeId) -> &[Cost; NUM_NODES] {
        &self.costs[via.index()]
    }

    /// Sets a single entry. The owner's self-to-self entry stays zero.
    pub(crate) fn set(&mut self, via: NodeId, dest: NodeId, cost: Cost) {
        self.costs[via.index()][dest.index()] = cost;
        self.pin_diagonal();
    }

    /// Replaces the row for one first hop.
    pub(crate) fn set_row(&mut self, via: NodeId, row: [Cost; NUM_NODES]) {
        self.costs[via.index()] = row;
        self.pin_diagonal();
    }

    fn pin_diagonal(&mut self) {
        let me = self.owner.index();
        self.costs[me][me] = Cost::ZERO;
    }

    /// Minimum over every first hop, per destination.
    pub fn cost_vector(&self) -> CostVector {
        let mut out = [Cost::INFINITY; NUM_NODES];
        for (dest, slot) in out.iter_mut().enumerate() {
            *slot = self
                .costs
                .iter()
                .map(|row| row[dest])
                .min()
                .unwrap_or(Cost::INFINITY);
        }
        CostVector(out)
    }

    /// First hop of the best route to each destination, `None` if unreachable.
    ///
    /// Ties go to the direct link, then to the lowest neighbor id. A direct
    /// route's first hop is the destination itself.
    pub fn next_hops(&self) -> [Option<NodeId>; NUM_NODES] {
        let mut hops = [None; NUM_NODES];
        let order: Vec<NodeId> = std::iter::once(self.owner)
            .chain(NodeId::all().into_iter().filter(|v| *v != self.owner))
            .collect();

        for dest in NodeId::all() {
            let mut best: Option<(Cost, NodeId)> = None;
            for via in &order {
                let cost = self.get(*via, dest);
                if cost.is_infinite() {
                    continue;
                }
                if best.map_or(true, |(c, _)| cost < c) {
                    best = Some((cost, *via));
                }
            }
            hops[dest.index()] = best.map(|(_, via)| if via == self.owner { dest } else { via });
        }
        hops
    }
}

impl fmt::Display for DistanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "              via")?;
        write!(f, "   D{} |", self.owner)?;
        for via in NodeId::all() {
            write!(f, " {:>5}", via)?;
        }
        writeln!(f)?;
        writeln!(f, "  ----|{}", "-".repeat(6 * NUM_NODES))?;
        for dest in NodeId::all() {
            write!(f, "  {:>4}|", dest)?;
            for via in NodeId::all() {
                write!(f, " {:>5}", self.get(via, dest))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
