//! Canned routing scenarios.

use crate::simulator::SimConfig;
use crate::topology::{LinkChange, Topology};

use dvroute_env::{Cost, NodeId, SimError};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Textbook four-router network, no link changes
    Classic,

    /// Textbook network with link 0-1 going to 20 and back to 1
    ClassicLinks,

    /// Line 0-1-2, then link 0-1 rises from 1 to 5
    LineIncrease,

    /// Line 0-1-2-3, then link 1-2 fails (count to infinity)
    LinkFailure,

    /// Textbook network with link 2-3 going down and coming back up
    LinkFlap,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Classic,
            ScenarioId::ClassicLinks,
            ScenarioId::LineIncrease,
            ScenarioId::LinkFailure,
            ScenarioId::LinkFlap,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Classic => "classic",
            ScenarioId::ClassicLinks => "classic_links",
            ScenarioId::LineIncrease => "line_increase",
            ScenarioId::LinkFailure => "link_failure",
            ScenarioId::LinkFlap => "link_flap",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Classic => "4 routers, static links, converge to shortest paths",
            ScenarioId::ClassicLinks => "4 routers, link 0-1 goes 1 -> 20 at t=10000 and back at t=20000",
            ScenarioId::LineIncrease => "line 0-1-2, link 0-1 goes 1 -> 5 at t=500",
            ScenarioId::LinkFailure => "line 0-1-2-3, link 1-2 fails at t=500",
            ScenarioId::LinkFlap => "4 routers, link 2-3 fails at t=300 and returns at t=600",
        }
    }

    /// Builds the run configuration for this scenario.
    pub fn config(&self, seed: u64) -> Result<SimConfig, SimError> {
        let (topology, link_changes) = match self {
            ScenarioId::Classic => (Topology::classic(), Vec::new()),
            ScenarioId::ClassicLinks => (Topology::classic(), LinkChange::classic_schedule()),
            ScenarioId::LineIncrease => (
                Topology::from_links(&[(0, 1, 1), (1, 2, 1)])?,
                vec![LinkChange::new(500.0, 0, 1, 5)?],
            ),
            ScenarioId::LinkFailure => (
                Topology::from_links(&[(0, 1, 1), (1, 2, 1), (2, 3, 1)])?,
                vec![LinkChange::new(500.0, 1, 2, Cost::INFINITY.raw())?],
            ),
            ScenarioId::LinkFlap => (
                Topology::classic(),
                vec![
                    LinkChange::new(300.0, 2, 3, Cost::INFINITY.raw())?,
                    LinkChange::new(600.0, 2, 3, 2)?,
                ],
            ),
        };

        Ok(SimConfig {
            seed,
            topology,
            link_changes,
            ..Default::default()
        })
    }

    /// Extra expectations beyond matching shortest paths: `(node, dest, cost)`.
    pub fn expectations(&self) -> Vec<(NodeId, NodeId, Cost)> {
        let id = |n: usize| NodeId::all()[n];
        match self {
            ScenarioId::Classic | ScenarioId::ClassicLinks | ScenarioId::LinkFlap => {
                vec![(id(0), id(3), Cost::new(4)), (id(3), id(0), Cost::new(4))]
            }
            ScenarioId::LineIncrease => {
                vec![(id(0), id(2), Cost::new(6)), (id(2), id(0), Cost::new(6))]
            }
            ScenarioId::LinkFailure => vec![
                (id(0), id(3), Cost::INFINITY),
                (id(3), id(0), Cost::INFINITY),
                (id(0), id(1), Cost::new(1)),
            ],
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(ScenarioId::Classic),
            "classic_links" | "classiclinks" => Ok(ScenarioId::ClassicLinks),
            "line_increase" | "lineincrease" => Ok(ScenarioId::LineIncrease),
            "link_failure" | "linkfailure" => Ok(ScenarioId::LinkFailure),
            "link_flap" | "linkflap" => Ok(ScenarioId::LinkFlap),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert_eq!("LinkFailure".parse::<ScenarioId>(), Ok(ScenarioId::LinkFailure));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_configs_build() {
        for scenario in ScenarioId::all() {
            let config = scenario.config(5).unwrap();
            assert_eq!(config.seed, 5);
            assert!(config.fifo_links);
        }
        let failure = ScenarioId::LinkFailure.config(1).unwrap();
        assert!(failure.link_changes[0].cost.is_infinite());
    }
}
