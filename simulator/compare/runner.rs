// Trial runner: repeats a scenario under each policy and averages the results

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gt_rust::{ConfigError, Policy, SimConfig, SimRunner};

use super::stats::{TrialAverages, TrialReport};

/// Run `trials` trials per policy. Trial `i` uses the same seed for every
/// policy, so policies are compared on identical graphs and roles.
pub fn run_trials(
    config: &SimConfig,
    policies: &[Policy],
    trials: usize,
    seed: Option<[u8; 32]>,
) -> Result<Vec<TrialAverages>, ConfigError> {
    let base_seed = seed.or(config.seed).unwrap_or_else(|| {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill(&mut seed);
        seed
    });
    let mut seeds = StdRng::from_seed(base_seed);
    let trial_seeds: Vec<[u8; 32]> = (0..trials).map(|_| seeds.gen()).collect();

    info!("base seed {:02x?}", base_seed);

    let mut averages = Vec::with_capacity(policies.len());
    for &policy in policies {
        let mut reports = Vec::with_capacity(trials);
        for (i, trial_seed) in trial_seeds.iter().enumerate() {
            let trial = SimConfig {
                policy,
                seed: Some(*trial_seed),
                ..config.clone()
            };
            let result = SimRunner::new(trial).run()?;
            info!(
                "{:?} trial {}/{}: coverage {:.1}%",
                policy,
                i + 1,
                trials,
                result.average_coverage() * 100.0
            );
            reports.push(TrialReport::from(&result));
        }
        averages.push(TrialAverages::from_trials(policy, &reports));
    }
    Ok(averages)
}
