use std::collections::BTreeSet;

use hashbrown::HashSet;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::gt_config::RelayStrategy;
use crate::gt_incentive::IncentiveState;
use crate::gt_interface::{MessageId, NodeId, Role, Timestamp};
use crate::gt_ledger::PropagationLedger;

/// Outcome of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    /// Message already seen, nothing changed
    Duplicate,
    /// First receipt. `relay` is false for free-riders.
    Informed { relay: bool },
}

/// A simulated participant.
///
/// Relay behaviour is picked at construction: the role decides whether the
/// node forwards at all, and the presence of incentive state decides whether
/// it takes part in monitoring and punishment.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    peers: BTreeSet<NodeId>,
    seen: HashSet<MessageId>,
    sent_count: u64,
    role: Role,
    incentive: Option<IncentiveState>,
}

impl Node {
    pub fn new(id: NodeId, role: Role, incentive: Option<IncentiveState>) -> Self {
        Self {
            id,
            peers: BTreeSet::new(),
            seen: HashSet::new(),
            sent_count: 0,
            role,
            incentive,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_free_rider(&self) -> bool {
        self.role == Role::FreeRider
    }

    pub fn is_honest(&self) -> bool {
        self.role == Role::Honest
    }

    /// Honest and incentivized: the nodes that enforce the rules
    pub fn is_enforcer(&self) -> bool {
        self.is_honest() && self.incentive.is_some()
    }

    pub fn peers(&self) -> &BTreeSet<NodeId> {
        &self.peers
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    pub fn has_peer(&self, peer: NodeId) -> bool {
        self.peers.contains(&peer)
    }

    pub fn has_seen(&self, message: MessageId) -> bool {
        self.seen.contains(&message)
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn incentive(&self) -> Option<&IncentiveState> {
        self.incentive.as_ref()
    }

    pub fn incentive_mut(&mut self) -> Option<&mut IncentiveState> {
        self.incentive.as_mut()
    }

    pub fn stake(&self) -> Option<f64> {
        self.incentive.as_ref().map(|i| i.stake())
    }

    pub fn reputation(&self) -> Option<f64> {
        self.incentive.as_ref().map(|i| i.reputation())
    }

    // Edge changes are only made by the network, which keeps both ends in step.
    pub(crate) fn add_peer(&mut self, peer: NodeId) -> bool {
        peer != self.id && self.peers.insert(peer)
    }

    pub(crate) fn remove_peer(&mut self, peer: NodeId) -> bool {
        self.peers.remove(&peer)
    }

    /// Handle a delivery at time `now`.
    ///
    /// The first delivery of a message records the receipt in the ledger and
    /// marks it seen; later deliveries are dropped.
    pub fn receive(
        &mut self,
        message: MessageId,
        now: Timestamp,
        ledger: &mut PropagationLedger,
    ) -> Reception {
        ledger.ensure(message);
        if self.seen.contains(&message) {
            return Reception::Duplicate;
        }

        ledger.record(message, self.id, now);
        self.seen.insert(message);

        let relay = self.is_honest();
        if let Some(incentive) = self.incentive.as_mut() {
            incentive.note_received();
            if relay {
                incentive.note_proof();
            }
        }

        Reception::Informed { relay }
    }

    /// Peers to forward a message to. Never includes `source`.
    ///
    /// `rank` scores a peer for the strategic part of `Hybrid`; higher first.
    pub fn relay_targets<R, F>(
        &self,
        source: Option<NodeId>,
        strategy: &RelayStrategy,
        rank: F,
        rng: &mut R,
    ) -> Vec<NodeId>
    where
        R: Rng,
        F: Fn(NodeId) -> f64,
    {
        if self.is_free_rider() {
            return Vec::new();
        }

        let candidates: Vec<NodeId> = self
            .peers
            .iter()
            .copied()
            .filter(|peer| Some(*peer) != source)
            .collect();

        match *strategy {
            RelayStrategy::Flood => candidates,
            RelayStrategy::Fanout { k } => candidates.choose_multiple(rng, k).copied().collect(),
            RelayStrategy::Hybrid { k, strategic_share } => {
                let mut ranked = candidates;
                ranked.sort_by(|a, b| rank(*b).total_cmp(&rank(*a)));

                let strategic = ((k as f64 * strategic_share) as usize).min(ranked.len());
                let rest = ranked.split_off(strategic);
                let random = k.saturating_sub(strategic);

                ranked.extend(rest.choose_multiple(rng, random).copied());
                ranked
            }
        }
    }

    /// Account for relays just scheduled
    pub fn note_sent(&mut self, count: usize) {
        self.sent_count += count as u64;
        if let Some(incentive) = self.incentive.as_mut() {
            incentive.note_relays(count as u64);
        }
    }

    /// Clear per-run state. Peers are kept.
    pub fn reset(&mut self, incentive: Option<IncentiveState>) {
        self.seen.clear();
        self.sent_count = 0;
        self.incentive = incentive;
    }
}
