// Policy Comparison Module

pub mod config;
pub mod runner;
pub mod stats;

pub use config::ScenarioFile;
pub use runner::run_trials;
