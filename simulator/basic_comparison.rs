// Baseline vs incentivized gossip on the default 100 node network

mod event_sinks;

use event_sinks::{CountingSink, LoggingEventSink};
use gt_rust::{Policy, PunishmentConfig, SimConfig, SimRunner};
use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;

    println!("╔════════════════════════════════════════════════════════╗");
    println!("║    Gossip Free-Rider Comparison                        ║");
    println!("╚════════════════════════════════════════════════════════╝\n");

    let mut config = SimConfig::default();
    config.broadcasts = 5;
    config.broadcast_interval = 5.0;

    let comparison = SimRunner::compare(config.clone())?;
    comparison.print_summary();

    // Same seed again, history comparison instead of audits, punishments logged
    println!("\n--- history comparison, events ---\n");
    let counts = CountingSink::new();
    config.policy = Policy::Incentivized;
    config.seed = Some(comparison.baseline.seed_used);
    config.incentive.punishment = PunishmentConfig::history();

    let result = SimRunner::new(config.clone())
        .with_event_sink(Box::new(counts.clone()))
        .run()?;
    result.print_summary();
    for (kind, count) in counts.snapshot() {
        println!("  {:<18} {}", kind, count);
    }
    if counts.count("punished") == 0 {
        println!("  no free-rider was caught with this seed");
    }

    SimRunner::new(config)
        .with_event_sink(Box::new(LoggingEventSink))
        .run()?;

    Ok(())
}
