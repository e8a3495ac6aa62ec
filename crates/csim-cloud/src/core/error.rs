//! Errors produced while building and running a simulation.

use std::io;
use std::time::Duration;

use thiserror::Error;

use csim_core::CausalityViolation;

use crate::core::common::AllocationVerdict;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// No host can satisfy the VM request. Fatal during setup, recoverable by queuing during scheduling.
    #[error("insufficient capacity for vm #{vm_id}: {verdict}")]
    InsufficientCapacity { vm_id: u32, verdict: AllocationVerdict },

    /// The external agent returned an unparsable or out-of-range decision.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The external agent did not publish a decision before the deadline.
    #[error("external agent did not respond within {timeout:?}")]
    AgentUnresponsive { timeout: Duration },

    #[error(transparent)]
    CausalityViolation(#[from] CausalityViolation),

    #[error("vm #{vm_id} can't be released while {running} cloudlets are executing")]
    VmBusy { vm_id: u32, running: usize },

    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io(err.to_string())
    }
}

impl SimError {
    /// Returns `true` for errors after which the run can't continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SimError::AgentUnresponsive { .. })
    }
}
