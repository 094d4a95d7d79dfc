//! Free-rider detection strategies.
//!
//! A policy only decides: it inspects the network and returns
//! [`IncentiveAction`]s. The network applies them and enforces the guards
//! (no self punishment, target must be a peer, connectivity floor).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::gt_config::{PunishmentConfig, Slash};
use crate::gt_incentive::HistoryEntry;
use crate::gt_interface::NodeId;
use crate::gt_node::Node;

/// Actions a policy asks the network to perform
#[derive(Debug, Clone, PartialEq)]
pub enum IncentiveAction {
    /// Remove the edge and slash the target
    Punish {
        punisher: NodeId,
        target: NodeId,
        slash: Slash,
    },
    /// Soft signal, the edge stays
    LowerPriority {
        node: NodeId,
        peer: NodeId,
        factor: f64,
    },
    /// Audited peer showed relay evidence
    AuditPassed { auditor: NodeId, target: NodeId },
}

pub trait PunishmentPolicy {
    /// Called after `observer` first receives a message
    fn on_receive(
        &mut self,
        _observer: NodeId,
        _entry: HistoryEntry,
        _nodes: &mut [Node],
        _rng: &mut StdRng,
    ) -> Vec<IncentiveAction> {
        Vec::new()
    }

    /// Called on every audit timer
    fn on_audit(&mut self, _nodes: &mut [Node], _rng: &mut StdRng) -> Vec<IncentiveAction> {
        Vec::new()
    }

    /// Period of the audit timer, `None` if the policy does not audit
    fn audit_interval(&self) -> Option<f64> {
        None
    }
}

pub fn policy_for(config: &PunishmentConfig) -> Box<dyn PunishmentPolicy> {
    match config {
        PunishmentConfig::Audit {
            interval,
            auditors_per_round,
            slash,
        } => Box::new(AuditPolicy {
            interval: *interval,
            auditors_per_round: *auditors_per_round,
            slash: *slash,
        }),
        PunishmentConfig::History {
            window,
            scan_probability,
            missing_threshold,
            punish_threshold,
            punish_probability,
            priority_penalty,
            slash,
        } => Box::new(HistoryPolicy {
            window: *window,
            scan_probability: *scan_probability,
            missing_threshold: *missing_threshold,
            punish_threshold: *punish_threshold,
            punish_probability: *punish_probability,
            priority_penalty: *priority_penalty,
            slash: *slash,
        }),
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Random audits of relay evidence.
///
/// Each round a few nodes are drawn; an enforcing node among them checks one
/// random peer. A peer that received messages since its last audit without
/// taking any of them up for relay is punished. An honest leaf with nobody
/// left to forward to still passes.
pub struct AuditPolicy {
    pub interval: f64,
    pub auditors_per_round: usize,
    pub slash: Slash,
}

impl PunishmentPolicy for AuditPolicy {
    fn on_audit(&mut self, nodes: &mut [Node], rng: &mut StdRng) -> Vec<IncentiveAction> {
        let mut actions = Vec::new();
        if nodes.is_empty() {
            return actions;
        }

        for _ in 0..self.auditors_per_round {
            let auditor = rng.gen_range(0..nodes.len());
            if !nodes[auditor].is_enforcer() {
                continue;
            }
            let peers: Vec<NodeId> = nodes[auditor].peers().iter().copied().collect();
            let Some(&target) = peers.choose(rng) else {
                continue;
            };

            let guilty = match nodes[target].incentive_mut() {
                Some(incentive) => {
                    let guilty = incentive.fails_audit();
                    incentive.reset_audit();
                    guilty
                }
                None => false,
            };

            actions.push(if guilty {
                IncentiveAction::Punish {
                    punisher: auditor,
                    target,
                    slash: self.slash,
                }
            } else {
                IncentiveAction::AuditPassed { auditor, target }
            });
        }
        actions
    }

    fn audit_interval(&self) -> Option<f64> {
        Some(self.interval)
    }
}

// ============================================================================
// History comparison
// ============================================================================

/// Compares the observer's recent receipts against what each peer has seen.
///
/// Suspicion grows by one per scan in which a peer misses more than
/// `missing_threshold` recent messages, and only resets when a punishment
/// executes.
pub struct HistoryPolicy {
    pub window: f64,
    pub scan_probability: f64,
    pub missing_threshold: usize,
    pub punish_threshold: u32,
    pub punish_probability: f64,
    pub priority_penalty: f64,
    pub slash: Slash,
}

impl HistoryPolicy {
    /// Score every peer of `observer` and decide on punishments
    pub fn scan(&self, observer: NodeId, nodes: &mut [Node], rng: &mut StdRng) -> Vec<IncentiveAction> {
        let peers: Vec<NodeId> = nodes[observer].peers().iter().copied().collect();

        let lagging: Vec<NodeId> = match nodes[observer].incentive() {
            Some(incentive) => peers
                .iter()
                .copied()
                .filter(|&peer| {
                    incentive.missing_count(peer, |m| nodes[peer].has_seen(m)) > self.missing_threshold
                })
                .collect(),
            None => return Vec::new(),
        };

        let Some(incentive) = nodes[observer].incentive_mut() else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for peer in lagging {
            if incentive.raise_suspicion(peer) == 1 {
                actions.push(IncentiveAction::LowerPriority {
                    node: observer,
                    peer,
                    factor: self.priority_penalty,
                });
            }
        }

        let suspects: Vec<(NodeId, u32)> = incentive.suspects().collect();
        for (peer, level) in suspects {
            if level < self.punish_threshold || peers.binary_search(&peer).is_err() {
                continue;
            }
            if rng.gen_bool(self.punish_probability) {
                actions.push(IncentiveAction::Punish {
                    punisher: observer,
                    target: peer,
                    slash: self.slash,
                });
            }
        }
        actions
    }
}

impl PunishmentPolicy for HistoryPolicy {
    fn on_receive(
        &mut self,
        observer: NodeId,
        entry: HistoryEntry,
        nodes: &mut [Node],
        rng: &mut StdRng,
    ) -> Vec<IncentiveAction> {
        if !nodes[observer].is_enforcer() {
            return Vec::new();
        }
        if let Some(incentive) = nodes[observer].incentive_mut() {
            incentive.observe(entry, self.window);
        }
        if !rng.gen_bool(self.scan_probability) {
            return Vec::new();
        }
        self.scan(observer, nodes, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gt_config::IncentiveConfig;
    use crate::gt_incentive::IncentiveState;
    use crate::gt_interface::Role;
    use crate::gt_ledger::PropagationLedger;
    use rand::SeedableRng;

    fn star(roles: &[Role]) -> Vec<Node> {
        // node 0 in the middle, connected to everyone
        let config = IncentiveConfig::default();
        let mut nodes: Vec<Node> = roles
            .iter()
            .enumerate()
            .map(|(id, role)| Node::new(id, *role, Some(IncentiveState::new(&config))))
            .collect();
        for peer in 1..nodes.len() {
            nodes[0].add_peer(peer);
            nodes[peer].add_peer(0);
        }
        nodes
    }

    fn history_policy(punish_probability: f64) -> HistoryPolicy {
        HistoryPolicy {
            window: 100.0,
            scan_probability: 1.0,
            missing_threshold: 2,
            punish_threshold: 3,
            punish_probability,
            priority_penalty: 0.5,
            slash: Slash::Fixed { amount: 25.0 },
        }
    }

    #[test]
    fn test_history_scan_raises_suspicion_of_lagging_peer() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut nodes = star(&[Role::Honest, Role::Honest, Role::FreeRider]);
        let mut ledger = PropagationLedger::new();
        let policy = history_policy(1.0);

        // node 0 and the honest peer saw messages 1..=3, the free-rider none
        for message in 1..=3 {
            nodes[0].receive(message, message as f64, &mut ledger);
            nodes[1].receive(message, message as f64, &mut ledger);
            nodes[0].incentive_mut().unwrap().observe(
                HistoryEntry {
                    message,
                    source: None,
                    time: message as f64,
                },
                100.0,
            );
        }

        let actions = policy.scan(0, &mut nodes, &mut rng);
        assert_eq!(
            actions,
            vec![IncentiveAction::LowerPriority {
                node: 0,
                peer: 2,
                factor: 0.5
            }]
        );
        assert_eq!(nodes[0].incentive().unwrap().suspicion(2), 1);
        assert_eq!(nodes[0].incentive().unwrap().suspicion(1), 0);

        policy.scan(0, &mut nodes, &mut rng);
        let actions = policy.scan(0, &mut nodes, &mut rng);
        assert_eq!(
            actions,
            vec![IncentiveAction::Punish {
                punisher: 0,
                target: 2,
                slash: Slash::Fixed { amount: 25.0 }
            }]
        );
    }

    #[test]
    fn test_history_punishment_is_probabilistic() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut nodes = star(&[Role::Honest, Role::FreeRider]);
        nodes[0].incentive_mut().unwrap().set_suspicion(1, 5);

        let never = history_policy(0.0);
        assert!(never.scan(0, &mut nodes, &mut rng).is_empty());
    }

    #[test]
    fn test_history_ignores_non_enforcers() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut nodes = star(&[Role::FreeRider, Role::Honest]);
        let mut policy = history_policy(1.0);
        let entry = HistoryEntry {
            message: 1,
            source: Some(1),
            time: 0.0,
        };

        assert!(policy.on_receive(0, entry, &mut nodes, &mut rng).is_empty());
        assert_eq!(nodes[0].incentive().unwrap().history().count(), 0);
    }

    #[test]
    fn test_audit_catches_silent_receiver() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut nodes = star(&[Role::Honest, Role::FreeRider]);
        let mut ledger = PropagationLedger::new();
        nodes[1].receive(1, 0.5, &mut ledger);

        let mut policy = AuditPolicy {
            interval: 5.0,
            auditors_per_round: 20,
            slash: Slash::Fraction { fraction: 0.2 },
        };
        let actions = policy.on_audit(&mut nodes, &mut rng);

        // the first audit of node 1 punishes, later ones find reset evidence
        let punishments: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, IncentiveAction::Punish { .. }))
            .collect();
        assert_eq!(punishments.len(), 1);
        assert_eq!(
            punishments[0],
            &IncentiveAction::Punish {
                punisher: 0,
                target: 1,
                slash: Slash::Fraction { fraction: 0.2 }
            }
        );
    }

    #[test]
    fn test_audit_passes_honest_leaf() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut nodes = star(&[Role::Honest, Role::Honest]);
        let mut ledger = PropagationLedger::new();
        // node 1 only peers with the hub it heard from, so it sends nothing
        nodes[1].receive(1, 0.5, &mut ledger);
        assert_eq!(nodes[1].sent_count(), 0);

        let mut policy = AuditPolicy {
            interval: 5.0,
            auditors_per_round: 10,
            slash: Slash::Fraction { fraction: 0.2 },
        };
        let actions = policy.on_audit(&mut nodes, &mut rng);
        assert!(actions
            .iter()
            .all(|a| !matches!(a, IncentiveAction::Punish { .. })));
    }
}
