//! Physical host and its processing elements.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::common::AllocationVerdict;
use crate::core::error::SimError;
use crate::core::vm::VmSpec;

/// Single compute lane with a fixed rate in MIPS.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ProcessingElement {
    mips: f64,
}

impl ProcessingElement {
    pub fn new(mips: f64) -> Self {
        Self { mips }
    }

    pub fn mips(&self) -> f64 {
        self.mips
    }
}

/// Resources held by a VM placed on the host.
#[derive(Clone, Debug)]
struct Reservation {
    mips: f64,
    ram: u64,
    bw: u64,
    storage: u64,
}

/// Stores host capacity and the resources reserved by resident VMs.
///
/// Allocated RAM, bandwidth, storage and MIPS never exceed the host capacity.
pub struct Host {
    pub id: u32,
    pub name: String,
    pes: Vec<ProcessingElement>,
    ram_total: u64,
    bw_total: u64,
    storage_total: u64,

    mips_available: f64,
    ram_available: u64,
    bw_available: u64,
    storage_available: u64,

    vms: BTreeMap<u32, Reservation>,
}

impl Host {
    pub fn new(id: u32, name: &str, pes: Vec<ProcessingElement>, ram: u64, bw: u64, storage: u64) -> Self {
        let mips_total = pes.iter().map(|pe| pe.mips()).sum();
        Self {
            id,
            name: name.to_string(),
            pes,
            ram_total: ram,
            bw_total: bw,
            storage_total: storage,
            mips_available: mips_total,
            ram_available: ram,
            bw_available: bw,
            storage_available: storage,
            vms: BTreeMap::new(),
        }
    }

    pub fn pes(&self) -> &[ProcessingElement] {
        &self.pes
    }

    pub fn mips_total(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips()).sum()
    }

    pub fn mips_available(&self) -> f64 {
        self.mips_available
    }

    pub fn ram_total(&self) -> u64 {
        self.ram_total
    }

    pub fn ram_available(&self) -> u64 {
        self.ram_available
    }

    pub fn bw_available(&self) -> u64 {
        self.bw_available
    }

    pub fn storage_available(&self) -> u64 {
        self.storage_available
    }

    pub fn bw_total(&self) -> u64 {
        self.bw_total
    }

    pub fn storage_total(&self) -> u64 {
        self.storage_total
    }

    /// IDs of VMs placed on the host.
    pub fn vms(&self) -> Vec<u32> {
        self.vms.keys().cloned().collect()
    }

    /// Rates assigned to the VM processing elements, each VM PE gets exactly the requested rate.
    fn pe_rates(&self, spec: &VmSpec) -> Vec<f64> {
        vec![spec.mips; spec.pes as usize]
    }

    /// Checks if the VM can currently be placed on the host.
    ///
    /// Each VM PE maps onto the host PE with the same index, which must be at least as fast as requested.
    pub fn can_place(&self, spec: &VmSpec) -> AllocationVerdict {
        if spec.validate().is_err() {
            return AllocationVerdict::InvalidRequest;
        }
        if spec.pes as usize > self.pes.len() {
            return AllocationVerdict::NotEnoughPes;
        }
        if self.pes.iter().take(spec.pes as usize).any(|pe| spec.mips > pe.mips()) {
            return AllocationVerdict::NotEnoughMips;
        }
        if spec.requested_mips() > self.mips_available + csim_core::EPSILON {
            return AllocationVerdict::NotEnoughMips;
        }
        if spec.ram > self.ram_available {
            return AllocationVerdict::NotEnoughRam;
        }
        if spec.bw > self.bw_available {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if spec.storage > self.storage_available {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    /// Reserves host resources for the VM and returns the allocated PE rates.
    pub fn try_place(&mut self, vm_id: u32, spec: &VmSpec) -> Result<Vec<f64>, SimError> {
        let verdict = self.can_place(spec);
        if verdict != AllocationVerdict::Success {
            return Err(SimError::InsufficientCapacity { vm_id, verdict });
        }
        let pe_rates = self.pe_rates(spec);
        let reservation = Reservation {
            mips: pe_rates.iter().sum(),
            ram: spec.ram,
            bw: spec.bw,
            storage: spec.storage,
        };
        self.mips_available = (self.mips_available - reservation.mips).max(0.);
        self.ram_available -= reservation.ram;
        self.bw_available -= reservation.bw;
        self.storage_available -= reservation.storage;
        self.vms.insert(vm_id, reservation);
        Ok(pe_rates)
    }

    /// Returns the resources of the VM to the host. Unknown VMs are ignored.
    pub fn release(&mut self, vm_id: u32) {
        if let Some(reservation) = self.vms.remove(&vm_id) {
            self.mips_available = (self.mips_available + reservation.mips).min(self.mips_total());
            self.ram_available += reservation.ram;
            self.bw_available += reservation.bw;
            self.storage_available += reservation.storage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host::new(0, "h", vec![ProcessingElement::new(10000.); 4], 8192, 100000, 1000000)
    }

    #[test]
    fn placement_decrements_capacity() {
        let mut host = host();
        let rates = host.try_place(0, &VmSpec::new(2, 1000.).with_ram(2048)).unwrap();
        assert_eq!(rates, vec![1000., 1000.]);
        assert_eq!(host.mips_available(), 38000.);
        assert_eq!(host.ram_available(), 6144);
        assert_eq!(host.bw_available(), 99000);
        assert_eq!(host.storage_available(), 990000);
        assert_eq!(host.vms(), vec![0]);
    }

    #[test]
    fn vm_faster_than_host_pe_is_rejected() {
        let pes = vec![ProcessingElement::new(1500.), ProcessingElement::new(4000.)];
        let mut host = Host::new(0, "h", pes, 1024, 1000, 10000);
        assert_eq!(
            host.try_place(3, &VmSpec::new(1, 4000.)),
            Err(SimError::InsufficientCapacity {
                vm_id: 3,
                verdict: AllocationVerdict::NotEnoughMips
            })
        );
        assert_eq!(host.mips_available(), 5500.);
        assert!(host.vms().is_empty());
        assert_eq!(host.try_place(4, &VmSpec::new(1, 1500.)), Ok(vec![1500.]));
    }

    #[test]
    fn vm_without_capacity_is_rejected() {
        let host = host();
        for spec in [
            VmSpec::new(0, 1000.),
            VmSpec::new(1, 0.),
            VmSpec::new(1, -5.),
            VmSpec::new(1, f64::NAN),
            VmSpec::new(1, 1000.).with_rate_cap(0.),
        ] {
            assert_eq!(host.can_place(&spec), AllocationVerdict::InvalidRequest);
        }
    }

    #[test]
    fn overcommit_is_rejected() {
        let mut host = host();
        assert_eq!(
            host.try_place(0, &VmSpec::new(5, 100.)),
            Err(SimError::InsufficientCapacity {
                vm_id: 0,
                verdict: AllocationVerdict::NotEnoughPes
            })
        );
        host.try_place(1, &VmSpec::new(1, 100.).with_ram(8000)).unwrap();
        assert_eq!(
            host.try_place(2, &VmSpec::new(1, 100.).with_ram(512)),
            Err(SimError::InsufficientCapacity {
                vm_id: 2,
                verdict: AllocationVerdict::NotEnoughRam
            })
        );
        assert_eq!(host.vms(), vec![1]);
    }

    #[test]
    fn release_restores_capacity() {
        let mut host = host();
        host.try_place(0, &VmSpec::new(4, 10000.).with_ram(8192)).unwrap();
        assert_eq!(host.can_place(&VmSpec::new(1, 10.)), AllocationVerdict::NotEnoughMips);
        host.release(0);
        assert_eq!(host.mips_available(), 40000.);
        assert_eq!(host.ram_available(), 8192);
        assert_eq!(host.can_place(&VmSpec::new(1, 10.)), AllocationVerdict::Success);
    }
}
