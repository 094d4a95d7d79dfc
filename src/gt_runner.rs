// Simulation driver: build the network from a config, broadcast, run, analyze

use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::gt_analyzer::{analyze, peer_stats, stake_summary, PeerStats, PropagationReport, StakeSummary};
use crate::gt_config::{ConfigError, SimConfig};
use crate::gt_interface::{EventSink, NoOpSink, Policy, Role};
use crate::gt_network::Network;

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct SimResult {
    pub policy: Policy,
    /// One report per broadcast, in broadcast order
    pub reports: Vec<PropagationReport>,
    /// Present for incentivized runs
    pub stakes: Option<StakeSummary>,
    pub initial_peer_stats: PeerStats,
    pub peer_stats: PeerStats,
    pub delivered_events: usize,
    /// Events still pending at the horizon
    pub discarded_events: usize,
    pub seed_used: [u8; 32],
}

impl SimResult {
    /// Coverage averaged over all broadcasts
    pub fn average_coverage(&self) -> f64 {
        if self.reports.is_empty() {
            return 0.0;
        }
        self.reports.iter().map(|r| r.coverage()).sum::<f64>() / self.reports.len() as f64
    }

    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║  {:<54}║", format!("{:?} run", self.policy));
        println!("╚════════════════════════════════════════════════════════╝");
        for report in &self.reports {
            match report.message {
                Some(m) => println!("  m:{:<4} {}", m, report),
                None => println!("  no broadcast: {}", report),
            }
        }
        println!(
            "  Peers: avg degree {:.1} -> {:.1}, isolated {}",
            self.initial_peer_stats.avg_degree, self.peer_stats.avg_degree, self.peer_stats.isolated
        );
        if let Some(stakes) = &self.stakes {
            println!(
                "  Stake: honest avg {:.1}, free-rider avg {:.1} (min {:.1})",
                stakes.honest_avg_stake, stakes.free_rider_avg_stake, stakes.free_rider_min_stake
            );
            println!(
                "  Reputation: honest avg {:.1}, free-rider avg {:.1}",
                stakes.honest_avg_reputation, stakes.free_rider_avg_reputation
            );
        }
        println!(
            "  Events: {} delivered, {} discarded at horizon",
            self.delivered_events, self.discarded_events
        );
    }
}

/// Baseline and incentivized runs over the same graph and roles
#[derive(Debug, Clone)]
pub struct Comparison {
    pub baseline: SimResult,
    pub incentivized: SimResult,
}

impl Comparison {
    pub fn print_summary(&self) {
        self.baseline.print_summary();
        self.incentivized.print_summary();
        println!(
            "\n  Coverage: baseline {:.1}% vs incentivized {:.1}%",
            self.baseline.average_coverage() * 100.0,
            self.incentivized.average_coverage() * 100.0
        );
    }
}

/// Assign roles from the explicit id list, or draw `⌊n·ratio⌋` free-riders
pub fn assign_roles<R: Rng>(config: &SimConfig, rng: &mut R) -> Vec<Role> {
    let n = config.node_count;
    let mut roles = vec![Role::Honest; n];
    match &config.free_riders {
        Some(ids) => {
            for &id in ids.iter().filter(|id| **id < n) {
                roles[id] = Role::FreeRider;
            }
        }
        None => {
            let count = ((n as f64 * config.free_rider_ratio) as usize).min(n);
            for id in index::sample(rng, n, count).into_iter() {
                roles[id] = Role::FreeRider;
            }
        }
    }
    roles
}

pub struct SimRunner {
    config: SimConfig,
    seed: [u8; 32],
    event_sink: Option<Box<dyn EventSink>>,
}

impl SimRunner {
    pub fn new(config: SimConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| {
            let mut seed = [0u8; 32];
            rand::thread_rng().fill(&mut seed);
            seed
        });
        Self {
            config,
            seed,
            event_sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    /// Graph, roles and then the run itself all draw from one RNG seeded
    /// with `seed`, so two runs with the same seed differ only by policy.
    pub fn run(self) -> Result<SimResult, ConfigError> {
        self.config.validate()?;

        let config = &self.config;
        let mut rng = StdRng::from_seed(self.seed);
        let adjacency = config.topology.generate(config.node_count, &mut rng);
        let roles = assign_roles(config, &mut rng);

        info!(
            "{:?} run: {} nodes, {} edges, {} free-riders",
            config.policy,
            adjacency.len(),
            adjacency.edge_count(),
            roles.iter().filter(|r| **r == Role::FreeRider).count()
        );

        let sink = self.event_sink.unwrap_or_else(|| Box::new(NoOpSink));
        let mut network = Network::new_with_sink(adjacency, &roles, config, rng, sink);
        let initial_peer_stats = peer_stats(network.nodes());

        let Some(first) = network.random_honest() else {
            warn!("no honest node to broadcast from, nothing propagates");
            return Ok(SimResult {
                policy: config.policy,
                reports: vec![PropagationReport::unreached(network.len())],
                stakes: stake_summary(network.nodes()),
                initial_peer_stats,
                peer_stats: initial_peer_stats,
                delivered_events: 0,
                discarded_events: 0,
                seed_used: self.seed,
            });
        };

        network.broadcast(first);
        for k in 1..config.broadcasts {
            let Some(source) = network.random_honest() else {
                break;
            };
            let at = k as f64 * config.broadcast_interval;
            if let Err(e) = network.schedule_broadcast(at, source) {
                warn!("broadcast {} not scheduled: {}", k, e);
            }
        }

        let summary = network.run(config.horizon);

        let ledger = network.ledger();
        let reports: Vec<PropagationReport> = ledger
            .messages()
            .map(|message| analyze(ledger, message, network.nodes()))
            .collect();
        for report in &reports {
            info!("{:?}: {}", config.policy, report);
        }

        Ok(SimResult {
            policy: config.policy,
            reports,
            stakes: stake_summary(network.nodes()),
            initial_peer_stats,
            peer_stats: peer_stats(network.nodes()),
            delivered_events: summary.delivered,
            discarded_events: summary.discarded,
            seed_used: self.seed,
        })
    }

    /// Run the config under both policies with the same seed
    pub fn compare(config: SimConfig) -> Result<Comparison, ConfigError> {
        let seed = SimRunner::new(config.clone()).seed();

        let baseline = SimConfig {
            policy: Policy::Baseline,
            seed: Some(seed),
            ..config.clone()
        };
        let incentivized = SimConfig {
            policy: Policy::Incentivized,
            seed: Some(seed),
            ..config
        };

        Ok(Comparison {
            baseline: SimRunner::new(baseline).run()?,
            incentivized: SimRunner::new(incentivized).run()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gt_config::{RelayDelay, PunishmentConfig};
    use crate::gt_graph::TopologyMode;

    fn config() -> SimConfig {
        SimConfig {
            node_count: 50,
            seed: Some([42u8; 32]),
            ..Default::default()
        }
    }

    #[test]
    fn test_assign_roles_ratio_and_explicit() {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let roles = assign_roles(&config(), &mut rng);
        assert_eq!(roles.iter().filter(|r| **r == Role::FreeRider).count(), 15);

        let explicit = SimConfig {
            node_count: 4,
            free_riders: Some(vec![1, 3]),
            ..Default::default()
        };
        assert_eq!(
            assign_roles(&explicit, &mut rng),
            vec![Role::Honest, Role::FreeRider, Role::Honest, Role::FreeRider]
        );
    }

    #[test]
    fn test_run_reports_seed_and_reach() {
        let result = SimRunner::new(config()).run().unwrap();
        assert_eq!(result.seed_used, [42u8; 32]);
        assert_eq!(result.reports.len(), 1);
        assert!(result.reports[0].nodes_reached >= 1);
        assert!(result.reports[0].nodes_reached <= 50);
        assert!(result.stakes.is_none());
    }

    #[test]
    fn test_all_free_riders_reach_nobody() {
        let all_free = SimConfig {
            free_rider_ratio: 1.0,
            ..config()
        };
        let result = SimRunner::new(all_free).run().unwrap();
        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].nodes_reached, 0);
        assert_eq!(result.reports[0].message, None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let bad = SimConfig {
            free_rider_ratio: 1.5,
            ..config()
        };
        assert!(matches!(
            SimRunner::new(bad).run(),
            Err(ConfigError::RatioOutOfRange { .. })
        ));

        let silent = SimConfig {
            broadcasts: 0,
            ..config()
        };
        assert!(matches!(SimRunner::new(silent).run(), Err(ConfigError::NoBroadcasts)));
    }

    #[test]
    fn test_path_with_free_rider() {
        // only 0, 1 and 2 are honest, so the source sits left of node 3
        let path = SimConfig {
            node_count: 6,
            topology: TopologyMode::Path,
            free_riders: Some(vec![3, 4, 5]),
            relay_delay: RelayDelay::Fixed { delay: 1.0 },
            ..config()
        };
        let result = SimRunner::new(path).run().unwrap();
        let report = &result.reports[0];
        assert_eq!(report.nodes_reached, 4);
        // one send across each edge of 0-1-2-3
        assert_eq!(report.total_messages_sent, 3);
    }

    #[test]
    fn test_ring_sends_counted_per_broadcast() {
        let ring = SimConfig {
            node_count: 6,
            topology: TopologyMode::Ring { neighbors: 1 },
            free_rider_ratio: 0.0,
            relay_delay: RelayDelay::Fixed { delay: 1.0 },
            broadcasts: 2,
            broadcast_interval: 10.0,
            horizon: 30.0,
            ..config()
        };
        let result = SimRunner::new(ring).run().unwrap();
        let sent: Vec<u64> = result.reports.iter().map(|r| r.total_messages_sent).collect();
        assert_eq!(sent, vec![7, 7]);
    }

    #[test]
    fn test_multiple_broadcasts() {
        let many = SimConfig {
            broadcasts: 4,
            broadcast_interval: 2.0,
            horizon: 30.0,
            ..config()
        };
        let result = SimRunner::new(many).run().unwrap();
        assert_eq!(result.reports.len(), 4);
        let ids: Vec<_> = result.reports.iter().map(|r| r.message).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_compare_shares_graph_and_roles() {
        let mut shared = config();
        shared.incentive.punishment = PunishmentConfig::history();
        shared.broadcasts = 3;
        let comparison = SimRunner::compare(shared).unwrap();

        assert_eq!(comparison.baseline.seed_used, comparison.incentivized.seed_used);
        assert_eq!(
            comparison.baseline.initial_peer_stats,
            comparison.incentivized.initial_peer_stats
        );
        assert!(comparison.baseline.stakes.is_none());
        let stakes = comparison.incentivized.stakes.unwrap();
        assert_eq!(stakes.free_riders().count(), 15);
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut incentivized = config();
        incentivized.policy = Policy::Incentivized;
        incentivized.broadcasts = 3;

        let a = SimRunner::new(incentivized.clone()).run().unwrap();
        let b = SimRunner::new(incentivized).run().unwrap();
        assert_eq!(a.reports, b.reports);
        assert_eq!(a.stakes, b.stakes);
        assert_eq!(a.peer_stats, b.peer_stats);
    }
}
