use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Outcome of checking whether a VM fits into a host.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    Success,
    NotEnoughPes,
    NotEnoughMips,
    NotEnoughRam,
    NotEnoughBandwidth,
    NotEnoughStorage,
    HostNotFound,
    InvalidRequest,
}

impl Display for AllocationVerdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationVerdict::Success => write!(f, "success"),
            AllocationVerdict::NotEnoughPes => write!(f, "not enough pes"),
            AllocationVerdict::NotEnoughMips => write!(f, "not enough mips"),
            AllocationVerdict::NotEnoughRam => write!(f, "not enough ram"),
            AllocationVerdict::NotEnoughBandwidth => write!(f, "not enough bandwidth"),
            AllocationVerdict::NotEnoughStorage => write!(f, "not enough storage"),
            AllocationVerdict::HostNotFound => write!(f, "no suitable host"),
            AllocationVerdict::InvalidRequest => write!(f, "invalid vm request"),
        }
    }
}
