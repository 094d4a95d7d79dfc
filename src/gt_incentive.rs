use std::collections::{BTreeMap, VecDeque};

use crate::gt_config::{IncentiveConfig, Slash};
use crate::gt_interface::{MessageId, NodeId, Timestamp};

/// One observed receipt in the monitoring window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub message: MessageId,
    pub source: Option<NodeId>,
    pub time: Timestamp,
}

/// Economic and monitoring state carried by incentivized nodes.
///
/// Stake only grows through `reward` and only shrinks through `slash`,
/// which never takes it below the configured floor.
#[derive(Debug, Clone)]
pub struct IncentiveState {
    stake: f64,
    reputation: f64,
    suspicion: BTreeMap<NodeId, u32>,
    history: VecDeque<HistoryEntry>,
    priority: BTreeMap<NodeId, f64>,

    // relay evidence
    relay_proofs: u64,
    proofs_since_audit: u64,
    received_since_audit: u64,
}

impl IncentiveState {
    pub fn new(config: &IncentiveConfig) -> Self {
        Self {
            stake: config.initial_stake.max(config.stake_floor),
            reputation: config.initial_reputation,
            suspicion: BTreeMap::new(),
            history: VecDeque::new(),
            priority: BTreeMap::new(),
            relay_proofs: 0,
            proofs_since_audit: 0,
            received_since_audit: 0,
        }
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn reputation(&self) -> f64 {
        self.reputation
    }

    pub fn suspicion(&self, peer: NodeId) -> u32 {
        self.suspicion.get(&peer).copied().unwrap_or(0)
    }

    pub fn set_suspicion(&mut self, peer: NodeId, level: u32) {
        self.suspicion.insert(peer, level);
    }

    /// Increments and returns the new suspicion level of `peer`
    pub fn raise_suspicion(&mut self, peer: NodeId) -> u32 {
        let level = self.suspicion.entry(peer).or_insert(0);
        *level += 1;
        *level
    }

    pub fn clear_suspicion(&mut self, peer: NodeId) {
        self.suspicion.remove(&peer);
    }

    /// Peers with non-zero suspicion, ascending by id
    pub fn suspects(&self) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.suspicion
            .iter()
            .filter(|(_, level)| **level > 0)
            .map(|(peer, level)| (*peer, *level))
    }

    /// Connection priority of `peer`, 1.0 unless lowered
    pub fn priority(&self, peer: NodeId) -> f64 {
        self.priority.get(&peer).copied().unwrap_or(1.0)
    }

    pub fn lower_priority(&mut self, peer: NodeId, factor: f64) -> f64 {
        let priority = self.priority.entry(peer).or_insert(1.0);
        *priority *= factor;
        *priority
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Append a receipt and drop entries older than `window`
    pub fn observe(&mut self, entry: HistoryEntry, window: f64) {
        self.history.push_back(entry);
        let cutoff = entry.time - window;
        while let Some(front) = self.history.front() {
            if front.time >= cutoff {
                break;
            }
            self.history.pop_front();
        }
    }

    /// Messages in the window that `has_seen` reports as unseen.
    /// Entries that `peer` itself delivered are not counted against it.
    pub fn missing_count<F>(&self, peer: NodeId, mut has_seen: F) -> usize
    where
        F: FnMut(MessageId) -> bool,
    {
        self.history
            .iter()
            .filter(|entry| entry.source != Some(peer))
            .filter(|entry| !has_seen(entry.message))
            .count()
    }

    pub fn note_received(&mut self) {
        self.received_since_audit += 1;
    }

    /// An honest node took up a message and committed to forward it. Counts
    /// even when it has no one left to forward to.
    pub fn note_proof(&mut self) {
        self.proofs_since_audit += 1;
    }

    /// Reward evidence only
    pub fn note_relays(&mut self, relays: u64) {
        self.relay_proofs += relays;
    }

    pub fn relay_proofs(&self) -> u64 {
        self.relay_proofs
    }

    /// Received something since the last audit but relayed nothing
    pub fn fails_audit(&self) -> bool {
        self.received_since_audit > 0 && self.proofs_since_audit == 0
    }

    pub fn reset_audit(&mut self) {
        self.proofs_since_audit = 0;
        self.received_since_audit = 0;
    }

    /// Convert relay proofs into stake. Returns the number of proofs spent.
    pub fn reward(&mut self, rate: f64) -> u64 {
        let relays = self.relay_proofs;
        self.stake += relays as f64 * rate;
        self.relay_proofs = 0;
        relays
    }

    /// Slash stake, clamped at `floor`. Returns the amount taken.
    pub fn slash(&mut self, slash: &Slash, floor: f64) -> f64 {
        let after = slash.apply(self.stake, floor).min(self.stake);
        let taken = self.stake - after;
        self.stake = after;
        taken
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.reputation += delta;
    }

    /// Let reputation above `baseline` decay towards it
    pub fn decay_reputation(&mut self, rate: f64, baseline: f64) {
        if self.reputation > baseline {
            self.reputation = (self.reputation * rate).max(baseline);
        }
    }
}
