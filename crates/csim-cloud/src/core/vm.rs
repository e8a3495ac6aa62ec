//! Virtual machine.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use csim_core::EventId;
use csim_models::throughput_sharing::{make_capped_throughput_fn, FairThroughputSharingModel};

use crate::core::cloudlet::Cloudlet;
use crate::core::error::SimError;

/// Resources requested by a VM.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VmSpec {
    /// Number of processing elements.
    pub pes: u32,
    /// Requested rate of each processing element in MIPS.
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
    /// External limit of the total VM rate.
    pub rate_cap: Option<f64>,
}

impl VmSpec {
    pub fn new(pes: u32, mips: f64) -> Self {
        Self {
            pes,
            mips,
            ram: 512,
            bw: 1000,
            storage: 10000,
            rate_cap: None,
        }
    }

    pub fn with_ram(mut self, ram: u64) -> Self {
        self.ram = ram;
        self
    }

    pub fn with_bw(mut self, bw: u64) -> Self {
        self.bw = bw;
        self
    }

    pub fn with_storage(mut self, storage: u64) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_rate_cap(mut self, rate_cap: f64) -> Self {
        self.rate_cap = Some(rate_cap);
        self
    }

    /// Checks that the VM gets a positive rate: at least one PE, positive PE rate and rate cap.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.pes == 0 {
            return Err(SimError::Config("vm must have at least one pe".to_string()));
        }
        if self.mips.is_nan() || self.mips <= 0. {
            return Err(SimError::Config(format!("vm pe rate must be positive, got {}", self.mips)));
        }
        if let Some(cap) = self.rate_cap {
            if cap.is_nan() || cap <= 0. {
                return Err(SimError::Config(format!("vm rate cap must be positive, got {}", cap)));
            }
        }
        Ok(())
    }

    /// Total MIPS requested over all processing elements.
    pub fn requested_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmStatus {
    Running,
    Released,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VmStatus::Running => write!(f, "running"),
            VmStatus::Released => write!(f, "released"),
        }
    }
}

/// Static description of a placed VM, shared with the broker.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VmInfo {
    pub id: u32,
    pub host_id: u32,
    pub pes: u32,
    /// Effective VM rate: allocated PE rates limited by the rate cap.
    pub rate: f64,
    pub ram: u64,
}

/// VM placed on a host. Executes its cloudlets under fair time sharing of the VM rate.
pub struct VirtualMachine {
    pub id: u32,
    pub host_id: u32,
    spec: VmSpec,
    pe_rates: Vec<f64>,
    status: VmStatus,
    pub(crate) execution: FairThroughputSharingModel<Cloudlet>,
    pub(crate) next_finish: Option<EventId>,
}

impl VirtualMachine {
    pub fn new(id: u32, host_id: u32, spec: VmSpec, pe_rates: Vec<f64>) -> Self {
        let allocated: f64 = pe_rates.iter().sum();
        let execution = FairThroughputSharingModel::with_dynamic_throughput(make_capped_throughput_fn(
            allocated,
            spec.rate_cap,
        ));
        Self {
            id,
            host_id,
            spec,
            pe_rates,
            status: VmStatus::Running,
            execution,
            next_finish: None,
        }
    }

    pub fn spec(&self) -> &VmSpec {
        &self.spec
    }

    pub fn pe_rates(&self) -> &[f64] {
        &self.pe_rates
    }

    /// Returns min(sum of allocated PE rates, rate cap).
    pub fn rate(&self) -> f64 {
        let allocated: f64 = self.pe_rates.iter().sum();
        match self.spec.rate_cap {
            Some(cap) => allocated.min(cap),
            None => allocated,
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    /// Number of cloudlets currently executing on the VM.
    pub fn running_count(&self) -> usize {
        self.execution.activity_count()
    }

    /// Rate currently received by each executing cloudlet.
    pub fn rate_per_cloudlet(&self) -> f64 {
        self.execution.throughput_per_activity()
    }

    /// Fraction of the VM processing elements occupied by executing cloudlets.
    pub fn cpu_utilization(&self) -> f64 {
        if self.spec.pes == 0 {
            return 0.;
        }
        self.running_count().min(self.spec.pes as usize) as f64 / self.spec.pes as f64
    }

    /// Returns executing cloudlets together with their remaining length at the given time.
    pub fn executing_cloudlets(&self, time: f64) -> Vec<(u64, f64)> {
        let mut result: Vec<(u64, f64)> = self
            .execution
            .remaining_volumes(time)
            .into_iter()
            .map(|(_, cloudlet, remaining)| (cloudlet.id, remaining))
            .collect();
        result.sort_by_key(|(id, _)| *id);
        result
    }

    pub fn info(&self) -> VmInfo {
        VmInfo {
            id: self.id,
            host_id: self.host_id,
            pes: self.spec.pes,
            rate: self.rate(),
            ram: self.spec.ram,
        }
    }
}
