// Initial peer graph generation

use std::collections::BTreeSet;

use rand::seq::index;
use rand::Rng;

use crate::gt_config::ConfigError;
use crate::gt_interface::NodeId;

/// Topology modes for the initial peer graph
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopologyMode {
    /// Every pair connected independently with probability `connectivity`
    Random { connectivity: f64 },
    /// Every node picks `k` random others; edges are made symmetric
    Fanout { k: usize },
    /// Ring with `neighbors` nodes on each side
    Ring { neighbors: usize },
    /// 0 - 1 - 2 - ... - (n-1)
    Path,
    FullyConnected,
    /// Explicit edge list
    Edges { edges: Vec<(NodeId, NodeId)> },
}

/// Undirected, loop-free adjacency over `0..n`
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    neighbors: Vec<BTreeSet<NodeId>>,
}

impl Adjacency {
    pub fn empty(n: usize) -> Self {
        Self {
            neighbors: vec![BTreeSet::new(); n],
        }
    }

    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut adjacency = Self::empty(n);
        for &(a, b) in edges {
            adjacency.add_edge(a, b);
        }
        adjacency
    }

    /// Adds `a - b`. Self-loops and out of range ids are ignored.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || a >= self.len() || b >= self.len() {
            return false;
        }
        let added = self.neighbors[a].insert(b);
        self.neighbors[b].insert(a);
        added
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn neighbors(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.neighbors[node]
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn average_degree(&self) -> f64 {
        if self.neighbors.is_empty() {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / self.len() as f64
    }

    pub fn is_symmetric(&self) -> bool {
        self.neighbors
            .iter()
            .enumerate()
            .all(|(a, peers)| !peers.contains(&a) && peers.iter().all(|b| self.neighbors[*b].contains(&a)))
    }

    pub(crate) fn into_neighbors(self) -> Vec<BTreeSet<NodeId>> {
        self.neighbors
    }
}

impl TopologyMode {
    pub fn generate<R: Rng>(&self, n: usize, rng: &mut R) -> Adjacency {
        let mut adjacency = Adjacency::empty(n);
        match self {
            TopologyMode::Random { connectivity } => {
                for a in 0..n {
                    for b in (a + 1)..n {
                        if rng.gen_bool(*connectivity) {
                            adjacency.add_edge(a, b);
                        }
                    }
                }
            }
            TopologyMode::Fanout { k } => {
                if n > 1 {
                    let k = (*k).min(n - 1);
                    for a in 0..n {
                        // sample from the n-1 other ids, shifting past `a`
                        for pick in index::sample(rng, n - 1, k).into_iter() {
                            let b = if pick >= a { pick + 1 } else { pick };
                            adjacency.add_edge(a, b);
                        }
                    }
                }
            }
            TopologyMode::Ring { neighbors } => {
                for a in 0..n {
                    for offset in 1..=*neighbors {
                        adjacency.add_edge(a, (a + offset) % n);
                    }
                }
            }
            TopologyMode::Path => {
                for a in 1..n {
                    adjacency.add_edge(a - 1, a);
                }
            }
            TopologyMode::FullyConnected => {
                for a in 0..n {
                    for b in (a + 1)..n {
                        adjacency.add_edge(a, b);
                    }
                }
            }
            TopologyMode::Edges { edges } => {
                for &(a, b) in edges {
                    adjacency.add_edge(a, b);
                }
            }
        }
        adjacency
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let TopologyMode::Random { connectivity } = self {
            if !(0.0..=1.0).contains(connectivity) {
                return Err(ConfigError::RatioOutOfRange {
                    name: "connectivity",
                    value: *connectivity,
                });
            }
        }
        Ok(())
    }
}
