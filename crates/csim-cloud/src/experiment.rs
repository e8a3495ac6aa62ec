//! Tools for comparing scheduling policies on the same cluster and workload.

use std::sync::{Arc, Mutex};

use log::info;
use threadpool::ThreadPool;

use crate::core::config::{parse_config_value, SimulationConfig};
use crate::core::error::SimError;
use crate::core::metrics::{CloudletMetrics, RunSummary};
use crate::handshake::HandshakeStats;
use crate::simulation::CloudSimulation;

/// Results of a single simulation run.
#[derive(Clone, Debug)]
pub struct RunResult {
    pub policy: String,
    pub summary: RunSummary,
    pub metrics: Vec<CloudletMetrics>,
    pub handshake: Option<HandshakeStats>,
    /// Error which aborted the run, the summary then covers the cloudlets finished before it.
    pub error: Option<SimError>,
}

/// Runs the same config with each of the policies.
pub struct Experiment {
    pub config: SimulationConfig,
    pub policies: Vec<String>,
}

impl Experiment {
    pub fn new(config: SimulationConfig, policies: Vec<String>) -> Self {
        Self { config, policies }
    }

    /// Runs the experiment using the specified number of threads, returns results in the order of policies.
    ///
    /// Runs with an external agent share the agent slots, so they are always executed one at a time.
    pub fn run(&self, num_threads: usize) -> Result<Vec<RunResult>, SimError> {
        let uses_agent = self
            .policies
            .iter()
            .any(|policy| parse_config_value(policy).0 == "ExternalAgent");
        let num_threads = if uses_agent { 1 } else { num_threads.max(1) };

        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads);
        for (run_id, policy) in self.policies.iter().enumerate() {
            let mut config = self.config.clone();
            config.policy = policy.clone();
            let results = results.clone();
            pool.execute(move || {
                info!("RUN {}: {}", run_id, config.policy);
                let result = run_simulation(&config);
                if let Ok(mut results) = results.lock() {
                    results.push((run_id, result));
                }
            });
        }
        pool.join();

        let mut results = results
            .lock()
            .map_err(|_| SimError::Io("experiment results are poisoned".to_string()))?
            .drain(..)
            .collect::<Vec<_>>();
        if results.len() != self.policies.len() {
            return Err(SimError::Io("some experiment runs panicked".to_string()));
        }
        results.sort_by_key(|(run_id, _)| *run_id);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

/// Builds and runs the simulation described by the config.
///
/// Setup errors are returned as `Err`, while errors aborting the run are reported inside the result.
pub fn run_simulation(config: &SimulationConfig) -> Result<RunResult, SimError> {
    let mut cloud_sim = CloudSimulation::from_config(config)?;
    let error = cloud_sim.run().err();
    Ok(RunResult {
        policy: config.policy.clone(),
        summary: cloud_sim.summary(),
        metrics: cloud_sim.metrics(),
        handshake: cloud_sim.handshake_stats(),
        error,
    })
}
