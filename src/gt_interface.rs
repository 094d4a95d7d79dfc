// all ids index straight into the network's node table
pub type NodeId = usize;
pub type MessageId = u64;

/// Simulated time in abstract time units
pub type Timestamp = f64;

/// Behaviour of a node towards relaying. Fixed for the lifetime of a run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Honest,
    FreeRider,
}

/// Forwarding policy of a whole network
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Plain gossip, peer sets never change
    Baseline,
    /// Nodes carry stake/reputation and punish peers that do not relay
    Incentivized,
}

// ============================================================================
// Event Logging System
// ============================================================================

/// Events emitted by the network for debugging and analysis
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// First receipt of a message
    MessageReceived {
        message: MessageId,
        from: Option<NodeId>,
        relayed_to: usize,
    },
    /// A delivery for an already seen message was dropped
    DuplicateDropped {
        message: MessageId,
        from: Option<NodeId>,
    },
    /// Edge removed and stake slashed
    PeerPunished {
        target: NodeId,
        slashed: f64,
        stake_after: f64,
    },
    /// Punishment refused by one of the guards
    PunishmentRefused {
        target: NodeId,
        reason: RefusalReason,
    },
    /// Suspicion reached the soft level
    PriorityLowered { target: NodeId, priority: f64 },
    /// Audited peer showed relay evidence
    AuditPassed { target: NodeId },
    /// Maintenance added an edge back
    PeerReconnected { peer: NodeId },
    /// Relay evidence converted into stake
    StakeRewarded { relays: u64, stake_after: f64 },
}

/// Why a punishment was turned into a no-op
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefusalReason {
    SelfTarget,
    NotAPeer,
    ConnectivityFloor,
    NotIncentivized,
}

/// Trait for consuming events from the simulation
pub trait EventSink {
    fn log(&mut self, time: Timestamp, node: NodeId, event: Event);
}

/// No-op event sink (zero overhead)
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&mut self, _time: Timestamp, _node: NodeId, _event: Event) {}
}
