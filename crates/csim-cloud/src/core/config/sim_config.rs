//! Simulation configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::config::params::NumericParam;
use crate::core::error::SimError;
use crate::handshake::PollingOptions;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawSimulationConfig {
    pub seed: Option<u64>,
    pub cost_per_second: Option<f64>,
    pub policy: Option<String>,
    pub clock_tick_period: Option<f64>,
    pub hosts: Option<Vec<HostConfig>>,
    pub vms: Option<Vec<VmConfig>>,
    pub workload: Option<WorkloadConfig>,
    pub agent: Option<RawAgentConfig>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawAgentConfig {
    pub state_path: Option<PathBuf>,
    pub decision_path: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

/// Holds configuration of a single host or a set of similar hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Host name prefix. Full name is produced by appending host instance number to the prefix.
    pub name_prefix: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
    /// Number of processing elements.
    pub pes: NumericParam<u32>,
    /// Rate of each processing element in MIPS.
    pub pe_mips: NumericParam<f64>,
    pub ram: NumericParam<u64>,
    pub bw: Option<NumericParam<u64>>,
    pub storage: Option<NumericParam<u64>>,
}

/// Holds configuration of a single VM or a set of similar VMs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    /// Number of such VMs.
    pub count: Option<u32>,
    pub pes: NumericParam<u32>,
    /// Requested rate of each processing element in MIPS.
    pub mips: NumericParam<f64>,
    pub ram: Option<NumericParam<u64>>,
    pub bw: Option<NumericParam<u64>>,
    pub storage: Option<NumericParam<u64>>,
    pub rate_cap: Option<f64>,
}

/// Workload submitted at the start of the run.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum WorkloadConfig {
    /// `count` cloudlets with lengths `base_length + i * step`, all arriving at `start_time`.
    Linear {
        count: u32,
        base_length: u64,
        step: u64,
        #[serde(default)]
        start_time: f64,
    },
    /// `count` cloudlets with random small/medium/huge lengths and random gaps between arrivals.
    Mixed {
        count: u32,
        #[serde(default = "default_max_gap")]
        max_gap: f64,
    },
}

fn default_max_gap() -> f64 {
    0.1
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig::Linear {
            count: 10,
            base_length: 10000,
            step: 500,
            start_time: 0.,
        }
    }
}

/// Settings of the external agent handshake.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    pub state_path: PathBuf,
    pub decision_path: PathBuf,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub timeout_ms: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("state.json"),
            decision_path: PathBuf::from("action.json"),
            poll_interval_ms: 50,
            settle_delay_ms: 50,
            timeout_ms: None,
        }
    }
}

impl AgentConfig {
    pub fn polling_options(&self) -> PollingOptions {
        PollingOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Seed of the simulation random generator.
    pub seed: u64,
    /// Price of one second of cloudlet execution.
    pub cost_per_second: f64,
    /// Cloudlet scheduling policy, e.g. `FirstFit`, `RoundRobin` or `ExternalAgent[poll_ms=10]`.
    pub policy: String,
    /// Period of host and VM state sampling. Sampling is disabled if not set.
    pub clock_tick_period: Option<f64>,
    pub hosts: Vec<HostConfig>,
    pub vms: Vec<VmConfig>,
    pub workload: WorkloadConfig,
    pub agent: AgentConfig,
}

impl SimulationConfig {
    /// Creates simulation config with default parameter values.
    pub fn new() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        let default_agent = AgentConfig::default();
        let agent = raw.agent.unwrap_or_default();
        Self {
            seed: raw.seed.unwrap_or(42),
            cost_per_second: raw.cost_per_second.unwrap_or(0.1),
            policy: raw.policy.unwrap_or_else(|| "FirstFit".to_string()),
            clock_tick_period: raw.clock_tick_period,
            hosts: raw.hosts.unwrap_or_default(),
            vms: raw.vms.unwrap_or_default(),
            workload: raw.workload.unwrap_or_default(),
            agent: AgentConfig {
                state_path: agent.state_path.unwrap_or(default_agent.state_path),
                decision_path: agent.decision_path.unwrap_or(default_agent.decision_path),
                poll_interval_ms: agent.poll_interval_ms.unwrap_or(default_agent.poll_interval_ms),
                settle_delay_ms: agent.settle_delay_ms.unwrap_or(default_agent.settle_delay_ms),
                timeout_ms: agent.timeout_ms,
            },
        }
    }

    /// Creates simulation config from YAML string (uses default values if some parameters are absent).
    pub fn from_yaml(content: &str) -> Result<Self, SimError> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(content).map_err(|e| SimError::Config(format!("can't parse YAML: {}", e)))?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(file_name)
            .map_err(|e| SimError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.cost_per_second < 0. {
            return Err(SimError::Config("cost_per_second must be non-negative".to_string()));
        }
        if let Some(period) = self.clock_tick_period {
            if period <= 0. {
                return Err(SimError::Config("clock_tick_period must be positive".to_string()));
            }
        }
        for (i, host) in self.hosts.iter().enumerate() {
            let count = host.count.unwrap_or(1);
            if host.pes.min_value(count) == 0 {
                return Err(SimError::Config(format!("host group {}: pes must be positive", i)));
            }
            let pe_mips = host.pe_mips.min_value(count);
            if pe_mips.is_nan() || pe_mips <= 0. {
                return Err(SimError::Config(format!("host group {}: pe_mips must be positive", i)));
            }
        }
        for (i, vm) in self.vms.iter().enumerate() {
            let count = vm.count.unwrap_or(1);
            if vm.pes.min_value(count) == 0 {
                return Err(SimError::Config(format!("vm group {}: pes must be positive", i)));
            }
            let mips = vm.mips.min_value(count);
            if mips.is_nan() || mips <= 0. {
                return Err(SimError::Config(format!("vm group {}: mips must be positive", i)));
            }
            if let Some(cap) = vm.rate_cap {
                if cap.is_nan() || cap <= 0. {
                    return Err(SimError::Config(format!("vm group {}: rate_cap must be positive", i)));
                }
            }
        }
        Ok(())
    }

    /// Returns total hosts count.
    pub fn number_of_hosts(&self) -> u32 {
        self.hosts.iter().map(|host| host.count.unwrap_or(1)).sum()
    }

    /// Returns total VMs count.
    pub fn number_of_vms(&self) -> u32 {
        self.vms.iter().map(|vm| vm.count.unwrap_or(1)).sum()
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
