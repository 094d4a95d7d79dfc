use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::gt_interface::{MessageId, NodeId, Timestamp};

/// Record of first-receipt times per message per node.
///
/// Entries are write-once: the first time recorded for a (message, node)
/// pair is permanent. Rows keep nodes in the order they were reached.
/// Relay sends are tallied per message next to the receipts.
#[derive(Debug, Clone, Default)]
pub struct PropagationLedger {
    rows: BTreeMap<MessageId, IndexMap<NodeId, Timestamp>>,
    sent: BTreeMap<MessageId, u64>,
}

impl PropagationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a row exists for `message`
    pub fn ensure(&mut self, message: MessageId) {
        self.rows.entry(message).or_default();
    }

    /// Record a receipt. Returns `false` if the pair was already recorded.
    pub fn record(&mut self, message: MessageId, node: NodeId, time: Timestamp) -> bool {
        let row = self.rows.entry(message).or_default();
        if row.contains_key(&node) {
            return false;
        }
        row.insert(node, time);
        true
    }

    pub fn receive_time(&self, message: MessageId, node: NodeId) -> Option<Timestamp> {
        self.rows.get(&message)?.get(&node).copied()
    }

    pub fn reached(&self, message: MessageId) -> usize {
        self.rows.get(&message).map_or(0, |row| row.len())
    }

    /// Time of the first receipt (the origin) of `message`
    pub fn origin_time(&self, message: MessageId) -> Option<Timestamp> {
        self.rows
            .get(&message)?
            .values()
            .copied()
            .min_by(|a, b| a.total_cmp(b))
    }

    /// (node, time) pairs in arrival order
    pub fn entries(&self, message: MessageId) -> impl Iterator<Item = (NodeId, Timestamp)> + '_ {
        self.rows
            .get(&message)
            .into_iter()
            .flat_map(|row| row.iter().map(|(node, time)| (*node, *time)))
    }

    /// Count `count` relays of `message`
    pub fn note_sent(&mut self, message: MessageId, count: u64) {
        *self.sent.entry(message).or_default() += count;
    }

    /// Relays of `message` sent so far
    pub fn sent(&self, message: MessageId) -> u64 {
        self.sent.get(&message).copied().unwrap_or(0)
    }

    pub fn messages(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.rows.keys().copied()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.sent.clear();
    }
}
