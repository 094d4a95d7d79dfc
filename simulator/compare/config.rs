// Scenario file format

use std::fs;
use std::path::Path;

use gt_rust::{Policy, SimConfig};

/// A YAML scenario. Everything under `config` falls back to `SimConfig::default()`.
#[derive(Debug, serde::Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub meta: ScenarioMeta,

    /// Independent trials per policy
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Policies to run, both by default
    #[serde(default = "default_policies")]
    pub policies: Vec<Policy>,

    #[serde(default)]
    pub config: SimConfig,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub hypothesis: Option<String>,
}

fn default_trials() -> usize {
    10
}

fn default_policies() -> Vec<Policy> {
    vec![Policy::Baseline, Policy::Incentivized]
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = fs::read_to_string(path)?;
        let scenario: ScenarioFile = serde_yaml::from_str(&yaml)?;
        scenario.config.validate()?;
        Ok(scenario)
    }
}
