//! # gtRust - Gossip Trust
//!
//! A discrete-event simulator for gossip propagation in the presence of
//! free-riders: nodes that accept messages but never relay them.
//!
//! Two policies are compared over the same graph and the same roles:
//!
//! - **Baseline**: honest nodes relay, free-riders stay silent, nothing else happens
//! - **Incentivized**: nodes carry stake and reputation, monitor their peers
//!   (random audits or history comparison) and punish free-riders by dropping
//!   the edge and slashing stake
//!
//! ## Core Components
//!
//! - **EventScheduler**: time-ordered event queue driving the run
//! - **Node**: relay behaviour, seen set and optional incentive state
//! - **Network**: owns the nodes and applies every peer-set and stake change
//! - **PunishmentPolicy**: audit or history based free-rider detection
//! - **PropagationLedger / analyze**: first-receipt times and per-message reports
//!
//! ```no_run
//! use gt_rust::{Policy, SimConfig, SimRunner};
//!
//! let config = SimConfig {
//!     policy: Policy::Incentivized,
//!     seed: Some([42u8; 32]),
//!     ..Default::default()
//! };
//! let result = SimRunner::new(config).run().unwrap();
//! result.print_summary();
//! ```
//!
//! Runnable scenarios live in `simulator/`.

pub mod gt_analyzer;
pub mod gt_config;
pub mod gt_graph;
pub mod gt_incentive;
pub mod gt_interface;
pub mod gt_ledger;
pub mod gt_network;
pub mod gt_node;
pub mod gt_punishment;
pub mod gt_runner;
pub mod gt_scheduler;

// Re-export commonly used types
pub use gt_analyzer::{analyze, peer_stats, stake_summary, PeerStats, PropagationReport, StakeSummary};
pub use gt_config::{
    ConfigError, IncentiveConfig, MaintenanceConfig, PunishmentConfig, RelayDelay, RelayStrategy,
    SimConfig, Slash,
};
pub use gt_graph::{Adjacency, TopologyMode};
pub use gt_interface::{
    Event, EventSink, MessageId, NoOpSink, NodeId, Policy, RefusalReason, Role, Timestamp,
};
pub use gt_network::Network;
pub use gt_runner::{Comparison, SimResult, SimRunner};
