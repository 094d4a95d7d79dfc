use std::time::Instant;

use gt_rust::{Policy, PunishmentConfig, RelayStrategy, SimConfig, SimRunner, TopologyMode};

/// Wall-clock cost of large propagation runs
fn main() {
    std::env::set_var("RUST_LOG", "error");
    let _ = simple_logger::init();

    println!("\n=== Gossip Propagation Benchmark ===\n");

    let configs = vec![
        ("1k nodes, fanout 8, flood", 1_000, 8, RelayStrategy::Flood),
        ("5k nodes, fanout 8, flood", 5_000, 8, RelayStrategy::Flood),
        ("5k nodes, fanout 8, relay 5", 5_000, 8, RelayStrategy::Fanout { k: 5 }),
        (
            "10k nodes, fanout 10, hybrid 5",
            10_000,
            10,
            RelayStrategy::Hybrid {
                k: 5,
                strategic_share: 0.6,
            },
        ),
    ];

    println!(
        "{:<34} {:>14} {:>12} {:>12} {:>10}",
        "Configuration", "Policy", "Time (ms)", "Events", "Coverage"
    );
    println!("{}", "-".repeat(86));

    for (name, nodes, fanout, strategy) in configs {
        for (policy, punishment) in [
            (Policy::Baseline, PunishmentConfig::default()),
            (Policy::Incentivized, PunishmentConfig::default()),
            (Policy::Incentivized, PunishmentConfig::history()),
        ] {
            let config = SimConfig {
                node_count: nodes,
                topology: TopologyMode::Fanout { k: fanout },
                relay_strategy: strategy,
                policy,
                broadcasts: 10,
                horizon: 100.0,
                seed: Some([0x42u8; 32]),
                incentive: gt_rust::IncentiveConfig {
                    punishment,
                    ..Default::default()
                },
                ..Default::default()
            };
            let label = match (policy, &config.incentive.punishment) {
                (Policy::Baseline, _) => "baseline",
                (_, PunishmentConfig::Audit { .. }) => "audit",
                (_, PunishmentConfig::History { .. }) => "history",
            };

            let start = Instant::now();
            let result = match SimRunner::new(config).run() {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("{}: {}", name, e);
                    continue;
                }
            };
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            println!(
                "{:<34} {:>14} {:>12.1} {:>12} {:>9.1}%",
                name,
                label,
                elapsed_ms,
                result.delivered_events,
                result.average_coverage() * 100.0
            );
        }
    }
    println!();
}
