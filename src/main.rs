use std::error::Error;

use log::info;
use simple_logger::SimpleLogger;

use gt_rust::{SimConfig, SimRunner};

fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new().init()?;

    info!("starting");

    // 100 nodes, 30% free-riders, 10% connectivity, run until t=50
    let comparison = SimRunner::compare(SimConfig::default())?;

    for result in [&comparison.baseline, &comparison.incentivized] {
        for report in &result.reports {
            info!("{:?}: {}", result.policy, report);
        }
        if let Some(stakes) = &result.stakes {
            info!(
                "free-rider stake avg {:.1} min {:.1}, honest avg {:.1}",
                stakes.free_rider_avg_stake, stakes.free_rider_min_stake, stakes.honest_avg_stake
            );
        }
        info!(
            "avg degree {:.2} -> {:.2}",
            result.initial_peer_stats.avg_degree, result.peer_stats.avg_degree
        );
    }

    info!("seed {:02x?}", comparison.baseline.seed_used);
    Ok(())
}
