// Simulation Configuration

use std::fmt;

use rand::Rng;

use crate::gt_graph::TopologyMode;
use crate::gt_interface::{NodeId, Policy, Timestamp};

// ============================================================================
// Main Configuration
// ============================================================================

/// Main simulation configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub node_count: usize,
    /// Fraction of nodes drawn as free-riders (0.0 to 1.0)
    pub free_rider_ratio: f64,
    /// Exact free-rider ids; overrides `free_rider_ratio` when set
    pub free_riders: Option<Vec<NodeId>>,
    pub topology: TopologyMode,
    /// Events past this time are discarded
    pub horizon: Timestamp,
    pub relay_delay: RelayDelay,
    pub relay_strategy: RelayStrategy,
    pub policy: Policy,
    pub incentive: IncentiveConfig,
    /// Number of messages broadcast during one run
    pub broadcasts: usize,
    /// Time between consecutive broadcasts
    pub broadcast_interval: f64,
    pub seed: Option<[u8; 32]>,
}

/// Per-edge forwarding delay
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayDelay {
    Fixed { delay: f64 },
    /// Uniform over `[low, high)`
    Uniform { low: f64, high: f64 },
}

impl RelayDelay {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            RelayDelay::Fixed { delay } => delay,
            RelayDelay::Uniform { low, high } if high > low => rng.gen_range(low..high),
            RelayDelay::Uniform { low, .. } => low,
        }
    }
}

/// How a relaying node picks targets among its peers (the source is always excluded)
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayStrategy {
    /// Every peer
    Flood,
    /// `k` peers chosen uniformly
    Fanout { k: usize },
    /// The best `k * strategic_share` peers by reputation and priority, the rest at random
    Hybrid { k: usize, strategic_share: f64 },
}

// ============================================================================
// Incentive Configuration
// ============================================================================

/// Stake, reputation and punishment parameters for incentivized networks
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct IncentiveConfig {
    pub initial_stake: f64,
    pub initial_reputation: f64,
    /// Reputation gained by sender and receiver when a delivery informs a new node
    pub boost_on_success: f64,
    /// Reputation lost by a sender whose delivery was a duplicate
    pub penalty_on_redundancy: f64,
    /// Reputation lost by a punished node
    pub penalty_on_failure: f64,
    /// Multiplier applied each reward round to reputation above the initial value
    pub decay_rate: f64,
    /// Stake earned per relayed message
    pub reward_rate: f64,
    pub reward_interval: f64,
    /// Slashing never takes stake below this value
    pub stake_floor: f64,
    /// A node never punishes if that would leave it with fewer peers
    pub min_connectivity: usize,
    pub punishment: PunishmentConfig,
    pub maintenance: Option<MaintenanceConfig>,
}

/// How much stake a punishment takes
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Slash {
    Fraction { fraction: f64 },
    Fixed { amount: f64 },
}

impl Slash {
    /// Stake after slashing, clamped at `floor`
    pub fn apply(&self, stake: f64, floor: f64) -> f64 {
        let slashed = match *self {
            Slash::Fraction { fraction } => stake - stake * fraction,
            Slash::Fixed { amount } => stake - amount,
        };
        slashed.max(floor).max(0.0)
    }
}

/// Punishment strategy and its parameters
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PunishmentConfig {
    /// Periodic random audits of relay evidence
    Audit {
        interval: f64,
        auditors_per_round: usize,
        slash: Slash,
    },
    /// Compare recent message history against what peers have seen
    History {
        /// Entries older than this are pruned
        window: f64,
        /// Chance of scanning peers on each receive
        scan_probability: f64,
        /// Missing messages tolerated before suspicion grows
        missing_threshold: usize,
        /// Suspicion at which punishment may fire
        punish_threshold: u32,
        punish_probability: f64,
        /// Priority multiplier applied at the first suspicion level
        priority_penalty: f64,
        slash: Slash,
    },
}

/// Re-adding edges for nodes that fell below the connectivity floor
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub interval: f64,
    pub reconnect_probability: f64,
    /// Only honest nodes are offered as new peers
    pub honest_only: bool,
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoNodes,
    RatioOutOfRange { name: &'static str, value: f64 },
    NonPositive { name: &'static str, value: f64 },
    InvalidDelay { low: f64, high: f64 },
    UnknownNode(NodeId),
    NoBroadcasts,
    /// Incentive timers re-arm forever without a finite horizon
    UnboundedHorizon,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoNodes => write!(f, "node_count must be at least 1"),
            ConfigError::RatioOutOfRange { name, value } => {
                write!(f, "{} must lie in [0, 1], got {}", name, value)
            }
            ConfigError::NonPositive { name, value } => {
                write!(f, "{} must be positive, got {}", name, value)
            }
            ConfigError::InvalidDelay { low, high } => {
                write!(f, "invalid relay delay range [{}, {})", low, high)
            }
            ConfigError::UnknownNode(id) => write!(f, "node {} does not exist", id),
            ConfigError::NoBroadcasts => write!(f, "broadcasts must be at least 1"),
            ConfigError::UnboundedHorizon => {
                write!(f, "incentivized runs need a finite horizon")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RatioOutOfRange { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count == 0 {
            return Err(ConfigError::NoNodes);
        }
        ratio("free_rider_ratio", self.free_rider_ratio)?;
        if let Some(ids) = &self.free_riders {
            if let Some(&bad) = ids.iter().find(|&&id| id >= self.node_count) {
                return Err(ConfigError::UnknownNode(bad));
            }
        }
        if self.horizon < 0.0 || self.horizon.is_nan() {
            return Err(ConfigError::NonPositive {
                name: "horizon",
                value: self.horizon,
            });
        }
        if self.policy == Policy::Incentivized && self.horizon.is_infinite() {
            return Err(ConfigError::UnboundedHorizon);
        }
        if self.broadcasts == 0 {
            return Err(ConfigError::NoBroadcasts);
        }
        if self.broadcasts > 1 {
            positive("broadcast_interval", self.broadcast_interval)?;
        }
        match self.relay_delay {
            RelayDelay::Fixed { delay } if delay < 0.0 || !delay.is_finite() => {
                return Err(ConfigError::InvalidDelay {
                    low: delay,
                    high: delay,
                });
            }
            RelayDelay::Uniform { low, high } if low < 0.0 || high < low || !high.is_finite() => {
                return Err(ConfigError::InvalidDelay { low, high });
            }
            _ => {}
        }
        if let RelayStrategy::Hybrid { strategic_share, .. } = self.relay_strategy {
            ratio("strategic_share", strategic_share)?;
        }
        self.topology.validate()?;
        if self.policy == Policy::Incentivized {
            self.incentive.validate()?;
        }
        Ok(())
    }
}

impl IncentiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("reward_interval", self.reward_interval)?;
        ratio("decay_rate", self.decay_rate)?;
        if self.stake_floor < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "stake_floor",
                value: self.stake_floor,
            });
        }
        match &self.punishment {
            PunishmentConfig::Audit { interval, slash, .. } => {
                positive("audit interval", *interval)?;
                slash.validate()?;
            }
            PunishmentConfig::History {
                window,
                scan_probability,
                punish_probability,
                priority_penalty,
                slash,
                ..
            } => {
                positive("history window", *window)?;
                ratio("scan_probability", *scan_probability)?;
                ratio("punish_probability", *punish_probability)?;
                ratio("priority_penalty", *priority_penalty)?;
                slash.validate()?;
            }
        }
        if let Some(m) = &self.maintenance {
            positive("maintenance interval", m.interval)?;
            ratio("reconnect_probability", m.reconnect_probability)?;
        }
        Ok(())
    }
}

impl Slash {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Slash::Fraction { fraction } => ratio("slash fraction", fraction),
            Slash::Fixed { amount } if amount < 0.0 => Err(ConfigError::NonPositive {
                name: "slash amount",
                value: amount,
            }),
            Slash::Fixed { .. } => Ok(()),
        }
    }
}

// ============================================================================
// Default Configurations
// ============================================================================

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 100,
            free_rider_ratio: 0.3,
            free_riders: None,
            topology: TopologyMode::Random { connectivity: 0.1 },
            horizon: 50.0,
            relay_delay: RelayDelay::Uniform {
                low: 0.1,
                high: 1.0,
            },
            relay_strategy: RelayStrategy::Flood,
            policy: Policy::Baseline,
            incentive: IncentiveConfig::default(),
            broadcasts: 1,
            broadcast_interval: 5.0,
            seed: None,
        }
    }
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            initial_stake: 100.0,
            initial_reputation: 100.0,
            boost_on_success: 10.0,
            penalty_on_redundancy: 5.0,
            penalty_on_failure: 5.0,
            decay_rate: 0.99,
            reward_rate: 0.1,
            reward_interval: 10.0,
            stake_floor: 0.0,
            min_connectivity: 4,
            punishment: PunishmentConfig::default(),
            maintenance: None,
        }
    }
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        PunishmentConfig::Audit {
            interval: 5.0,
            auditors_per_round: 1,
            slash: Slash::Fraction { fraction: 0.2 },
        }
    }
}

impl PunishmentConfig {
    /// History comparison with the stock thresholds
    pub fn history() -> Self {
        PunishmentConfig::History {
            window: 10.0,
            scan_probability: 0.2,
            missing_threshold: 2,
            punish_threshold: 3,
            punish_probability: 0.7,
            priority_penalty: 0.5,
            slash: Slash::Fixed { amount: 25.0 },
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: 5.0,
            reconnect_probability: 0.5,
            honest_only: false,
        }
    }
}
