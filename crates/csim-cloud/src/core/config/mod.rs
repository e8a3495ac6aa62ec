//! Simulation configuration.

pub mod options;
pub mod params;
pub mod sim_config;

pub use options::{parse_config_value, parse_options};
pub use params::NumericParam;
pub use sim_config::{AgentConfig, HostConfig, SimulationConfig, VmConfig, WorkloadConfig};
