// Propagation and incentive statistics

use std::fmt;

use crate::gt_interface::{MessageId, NodeId, Role, Timestamp};
use crate::gt_ledger::PropagationLedger;
use crate::gt_node::Node;

// ============================================================================
// Propagation
// ============================================================================

/// How far and how fast one message spread
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationReport {
    /// `None` when no broadcast could be started
    pub message: Option<MessageId>,
    pub nodes_reached: usize,
    pub total_nodes: usize,
    /// Latest first receipt minus the origin time
    pub max_propagation_time: Timestamp,
    /// Mean first-receipt latency over the nodes reached, origin excluded
    pub average_latency: Timestamp,
    /// Relays of this message sent by all nodes
    pub total_messages_sent: u64,
}

impl PropagationReport {
    /// Report for a run in which nothing was broadcast
    pub fn unreached(total_nodes: usize) -> Self {
        Self {
            message: None,
            nodes_reached: 0,
            total_nodes,
            max_propagation_time: 0.0,
            average_latency: 0.0,
            total_messages_sent: 0,
        }
    }

    /// Fraction of nodes reached (0.0 to 1.0)
    pub fn coverage(&self) -> f64 {
        if self.total_nodes == 0 {
            return 0.0;
        }
        self.nodes_reached as f64 / self.total_nodes as f64
    }
}

impl fmt::Display for PropagationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reached {}/{} ({:.1}%), max time {:.2}, avg latency {:.2}, {} sent",
            self.nodes_reached,
            self.total_nodes,
            self.coverage() * 100.0,
            self.max_propagation_time,
            self.average_latency,
            self.total_messages_sent
        )
    }
}

/// Summarise the propagation of `message`. Unknown messages give zero reach.
pub fn analyze(ledger: &PropagationLedger, message: MessageId, nodes: &[Node]) -> PropagationReport {
    let mut report = PropagationReport {
        message: Some(message),
        total_messages_sent: ledger.sent(message),
        ..PropagationReport::unreached(nodes.len())
    };

    let Some(origin) = ledger.origin_time(message) else {
        return report;
    };

    let mut latency_sum = 0.0;
    let mut latest = origin;
    for (_, time) in ledger.entries(message).skip(1) {
        latency_sum += time - origin;
        latest = latest.max(time);
    }

    report.nodes_reached = ledger.reached(message);
    report.max_propagation_time = latest - origin;
    if report.nodes_reached > 1 {
        report.average_latency = latency_sum / (report.nodes_reached - 1) as f64;
    }
    report
}

// ============================================================================
// Stake and reputation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStake {
    pub id: NodeId,
    pub role: Role,
    pub stake: f64,
    pub reputation: f64,
}

/// Stake and reputation across incentivized nodes, split by role
#[derive(Debug, Clone, PartialEq)]
pub struct StakeSummary {
    pub per_node: Vec<NodeStake>,
    pub honest_avg_stake: f64,
    pub free_rider_avg_stake: f64,
    pub free_rider_min_stake: f64,
    pub honest_avg_reputation: f64,
    pub free_rider_avg_reputation: f64,
}

impl StakeSummary {
    pub fn free_riders(&self) -> impl Iterator<Item = &NodeStake> {
        self.per_node.iter().filter(|s| s.role == Role::FreeRider)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// `None` when no node carries incentive state
pub fn stake_summary(nodes: &[Node]) -> Option<StakeSummary> {
    let per_node: Vec<NodeStake> = nodes
        .iter()
        .filter_map(|n| {
            let incentive = n.incentive()?;
            Some(NodeStake {
                id: n.id(),
                role: n.role(),
                stake: incentive.stake(),
                reputation: incentive.reputation(),
            })
        })
        .collect();
    if per_node.is_empty() {
        return None;
    }

    let of_role = |role: Role| per_node.iter().filter(move |s| s.role == role);

    Some(StakeSummary {
        honest_avg_stake: mean(of_role(Role::Honest).map(|s| s.stake)),
        free_rider_avg_stake: mean(of_role(Role::FreeRider).map(|s| s.stake)),
        free_rider_min_stake: of_role(Role::FreeRider)
            .map(|s| s.stake)
            .reduce(f64::min)
            .unwrap_or(0.0),
        honest_avg_reputation: mean(of_role(Role::Honest).map(|s| s.reputation)),
        free_rider_avg_reputation: mean(of_role(Role::FreeRider).map(|s| s.reputation)),
        per_node,
    })
}

// ============================================================================
// Topology
// ============================================================================

/// Degree statistics of the peer graph
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeerStats {
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
    pub edges: usize,
    /// Nodes without any peer
    pub isolated: usize,
    /// Average number of peers that are free-riders, over honest nodes
    pub free_rider_peers_per_honest: f64,
}

pub fn peer_stats(nodes: &[Node]) -> PeerStats {
    if nodes.is_empty() {
        return PeerStats::default();
    }

    let degrees = nodes.iter().map(|n| n.num_peers());
    let total: usize = degrees.clone().sum();

    PeerStats {
        min_degree: degrees.clone().min().unwrap_or(0),
        max_degree: degrees.clone().max().unwrap_or(0),
        avg_degree: total as f64 / nodes.len() as f64,
        edges: total / 2,
        isolated: degrees.filter(|d| *d == 0).count(),
        free_rider_peers_per_honest: mean(nodes.iter().filter(|n| n.is_honest()).map(|n| {
            n.peers()
                .iter()
                .filter(|p| nodes[**p].is_free_rider())
                .count() as f64
        })),
    }
}
