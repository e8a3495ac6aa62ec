//! Cloudlet scheduling policies.

use serde::Serialize;

use crate::core::cloudlet::Cloudlet;
use crate::core::config::options::option_value;
use crate::core::config::{parse_config_value, parse_options, AgentConfig};
use crate::core::error::SimError;
use crate::core::vm::VmInfo;
use crate::handshake::{AgentState, DecisionChannel, FileSlots, HandshakeStats, SlotChannel};

/// Broker view of a VM: its description and the number of cloudlets assigned to it and not finished yet.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VmState {
    pub info: VmInfo,
    pub running: usize,
}

impl VmState {
    pub fn new(info: VmInfo) -> Self {
        Self { info, running: 0 }
    }

    /// Returns `true` if at least one processing element of the VM is not occupied.
    pub fn has_free_pe(&self) -> bool {
        self.running < self.info.pes as usize
    }
}

/// Aggregated cluster load passed to the policy.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ClusterState {
    pub time: f64,
    /// Fraction of busy VM processing elements.
    pub cpu_load: f64,
    /// Fraction of total host RAM held by VMs with running cloudlets.
    pub ram_load: f64,
}

/// Trait for implementation of cloudlet scheduling policies.
///
/// The policy is defined as a function of the arriving cloudlet, the broker view of VMs and the cluster load, which
/// returns the index of the selected VM in `vms` or `None` if the cloudlet should wait in the queue.
pub trait VmSelectionPolicy {
    fn select_vm(&mut self, cloudlet: &Cloudlet, vms: &[VmState], cluster: &ClusterState)
        -> Result<Option<usize>, SimError>;

    /// Returns the counters of the external handshake if the policy uses one.
    fn handshake_stats(&self) -> Option<HandshakeStats> {
        None
    }
}

/// Creates policy from its config string, e.g. `RoundRobin` or `ExternalAgent[poll_ms=10,timeout_ms=500]`.
///
/// Supported `ExternalAgent` options override the agent settings: `state`, `decision`, `poll_ms`, `settle_ms`,
/// `timeout_ms`.
pub fn policy_resolver(config_str: &str, agent: &AgentConfig) -> Result<Box<dyn VmSelectionPolicy>, SimError> {
    let (policy_name, options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "RoundRobin" => Ok(Box::new(RoundRobin::new())),
        "ExternalAgent" => {
            let mut agent = agent.clone();
            if let Some(options) = options {
                let options = parse_options(&options);
                if let Some(path) = options.get("state") {
                    agent.state_path = path.into();
                }
                if let Some(path) = options.get("decision") {
                    agent.decision_path = path.into();
                }
                agent.poll_interval_ms = option_value(&options, "poll_ms")?.unwrap_or(agent.poll_interval_ms);
                agent.settle_delay_ms = option_value(&options, "settle_ms")?.unwrap_or(agent.settle_delay_ms);
                agent.timeout_ms = option_value(&options, "timeout_ms")?.or(agent.timeout_ms);
            }
            let slots = FileSlots::new(agent.state_path.clone(), agent.decision_path.clone());
            Ok(Box::new(ExternalAgent::new(Box::new(SlotChannel::new(
                slots,
                agent.polling_options(),
            )))))
        }
        _ => Err(SimError::UnknownPolicy(config_str.to_string())),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Selects the first VM with a free processing element, otherwise leaves the cloudlet queued.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for FirstFit {
    fn select_vm(
        &mut self,
        _cloudlet: &Cloudlet,
        vms: &[VmState],
        _cluster: &ClusterState,
    ) -> Result<Option<usize>, SimError> {
        Ok(vms.iter().position(|vm| vm.has_free_pe()))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Assigns the cloudlet with arrival index `i` to VM `i mod len(vms)` regardless of VM load.
#[derive(Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for RoundRobin {
    fn select_vm(
        &mut self,
        cloudlet: &Cloudlet,
        vms: &[VmState],
        _cluster: &ClusterState,
    ) -> Result<Option<usize>, SimError> {
        if vms.is_empty() {
            return Ok(None);
        }
        let index = cloudlet.arrival_index().unwrap_or(0);
        Ok(Some((index % vms.len() as u64) as usize))
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Delegates each decision to an external agent and blocks until it answers.
pub struct ExternalAgent {
    channel: Box<dyn DecisionChannel>,
}

impl ExternalAgent {
    pub fn new(channel: Box<dyn DecisionChannel>) -> Self {
        Self { channel }
    }
}

impl VmSelectionPolicy for ExternalAgent {
    fn select_vm(
        &mut self,
        cloudlet: &Cloudlet,
        vms: &[VmState],
        cluster: &ClusterState,
    ) -> Result<Option<usize>, SimError> {
        if vms.is_empty() {
            return Ok(None);
        }
        let state = AgentState {
            cpu_load: cluster.cpu_load,
            ram_load: cluster.ram_load,
            task_size: cloudlet.length,
        };
        let decision = self.channel.request(&state)?;
        match usize::try_from(decision.vm_index) {
            Ok(index) if index < vms.len() => Ok(Some(index)),
            _ => Err(SimError::ProtocolViolation(format!(
                "vm index {} is out of range [0, {})",
                decision.vm_index,
                vms.len()
            ))),
        }
    }

    fn handshake_stats(&self) -> Option<HandshakeStats> {
        Some(self.channel.stats())
    }
}
