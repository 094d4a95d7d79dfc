// Trial Statistics

use gt_rust::{Policy, SimResult};

/// Per-trial numbers pulled out of a `SimResult`
#[derive(Debug, Clone)]
pub struct TrialReport {
    pub coverage: f64,
    pub max_propagation_time: f64,
    pub average_latency: f64,
    pub messages_sent: u64,
    pub edges_removed: usize,
    pub free_rider_stake: Option<f64>,
    pub honest_stake: Option<f64>,
}

impl From<&SimResult> for TrialReport {
    fn from(result: &SimResult) -> Self {
        let n = result.reports.len().max(1) as f64;
        let reports = &result.reports;
        Self {
            coverage: result.average_coverage(),
            max_propagation_time: reports.iter().map(|r| r.max_propagation_time).sum::<f64>() / n,
            average_latency: reports.iter().map(|r| r.average_latency).sum::<f64>() / n,
            messages_sent: reports.iter().map(|r| r.total_messages_sent).sum(),
            edges_removed: result
                .initial_peer_stats
                .edges
                .saturating_sub(result.peer_stats.edges),
            free_rider_stake: result.stakes.as_ref().map(|s| s.free_rider_avg_stake),
            honest_stake: result.stakes.as_ref().map(|s| s.honest_avg_stake),
        }
    }
}

/// Averages over all trials of one policy
#[derive(Debug, Clone)]
pub struct TrialAverages {
    pub policy: Policy,
    pub trials: usize,
    pub coverage: f64,
    pub coverage_stddev: f64,
    pub max_propagation_time: f64,
    pub average_latency: f64,
    pub messages_sent: f64,
    pub edges_removed: f64,
    pub free_rider_stake: Option<f64>,
    pub honest_stake: Option<f64>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

impl TrialAverages {
    pub fn from_trials(policy: Policy, trials: &[TrialReport]) -> Self {
        let collect = |f: fn(&TrialReport) -> f64| trials.iter().map(f).collect::<Vec<f64>>();
        let optional = |f: fn(&TrialReport) -> Option<f64>| {
            let values: Vec<f64> = trials.iter().filter_map(f).collect();
            (!values.is_empty()).then(|| mean(&values))
        };

        let coverage = collect(|t| t.coverage);
        Self {
            policy,
            trials: trials.len(),
            coverage: mean(&coverage),
            coverage_stddev: stddev(&coverage),
            max_propagation_time: mean(&collect(|t| t.max_propagation_time)),
            average_latency: mean(&collect(|t| t.average_latency)),
            messages_sent: mean(&collect(|t| t.messages_sent as f64)),
            edges_removed: mean(&collect(|t| t.edges_removed as f64)),
            free_rider_stake: optional(|t| t.free_rider_stake),
            honest_stake: optional(|t| t.honest_stake),
        }
    }

    pub fn print_summary(&self) {
        println!("  {:?} ({} trials)", self.policy, self.trials);
        println!(
            "    Coverage:        {:.1}% ± {:.1}",
            self.coverage * 100.0,
            self.coverage_stddev * 100.0
        );
        println!("    Max prop. time:  {:.2}", self.max_propagation_time);
        println!("    Avg latency:     {:.2}", self.average_latency);
        println!("    Messages sent:   {:.1}", self.messages_sent);
        println!("    Edges removed:   {:.1}", self.edges_removed);
        if let (Some(free), Some(honest)) = (self.free_rider_stake, self.honest_stake) {
            println!("    Stake:           free-rider {:.1} / honest {:.1}", free, honest);
        }
    }
}

pub fn print_table(averages: &[TrialAverages]) {
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  Results                                               ║");
    println!("╚════════════════════════════════════════════════════════╝");
    for avg in averages {
        avg.print_summary();
    }
    println!();
}
