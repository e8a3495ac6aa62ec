//! Datacenter component: owns hosts and VMs and executes cloudlets.

use csim_core::{cast, log_debug, log_info, Event, EventHandler, Id, SimulationContext};
use csim_models::throughput_sharing::ThroughputSharingModel;

use crate::core::cloudlet::Cloudlet;
use crate::core::common::AllocationVerdict;
use crate::core::error::SimError;
use crate::core::events::cloudlet::{CloudletFinish, CloudletFinished, CloudletStart};
use crate::core::host::{Host, ProcessingElement};
use crate::core::vm::{VirtualMachine, VmInfo, VmSpec, VmStatus};

/// Owns the hosts and the VMs placed on them.
///
/// Placement happens synchronously during setup. Cloudlets are started by [`CloudletStart`] events from the broker,
/// share the rate of their VM fairly and are reported back with [`CloudletFinished`] upon completion.
pub struct Datacenter {
    hosts: Vec<Host>,
    vms: Vec<VirtualMachine>,
    broker_id: Id,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(broker_id: Id, ctx: SimulationContext) -> Self {
        Self {
            hosts: Vec::new(),
            vms: Vec::new(),
            broker_id,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Adds host and returns its ID.
    pub fn add_host(&mut self, name: &str, pes: Vec<ProcessingElement>, ram: u64, bw: u64, storage: u64) -> u32 {
        let id = self.hosts.len() as u32;
        let host = Host::new(id, name, pes, ram, bw, storage);
        log_debug!(
            self.ctx,
            "added host {} (#{}): {} pes, {} mips, {} ram",
            name,
            id,
            host.pes().len(),
            host.mips_total(),
            ram
        );
        self.hosts.push(host);
        id
    }

    /// Places VM on the first host with enough free capacity.
    pub fn place_vm(&mut self, spec: VmSpec) -> Result<VmInfo, SimError> {
        spec.validate()?;
        let vm_id = self.vms.len() as u32;
        let host_id = self
            .hosts
            .iter()
            .find(|host| host.can_place(&spec) == AllocationVerdict::Success)
            .map(|host| host.id);
        match host_id {
            Some(host_id) => self.place_vm_on(host_id, spec),
            None => Err(SimError::InsufficientCapacity {
                vm_id,
                verdict: self.first_host_verdict(&spec),
            }),
        }
    }

    fn first_host_verdict(&self, spec: &VmSpec) -> AllocationVerdict {
        self.hosts
            .first()
            .map(|host| host.can_place(spec))
            .unwrap_or(AllocationVerdict::HostNotFound)
    }

    /// Places VM on the specified host.
    pub fn place_vm_on(&mut self, host_id: u32, spec: VmSpec) -> Result<VmInfo, SimError> {
        spec.validate()?;
        let vm_id = self.vms.len() as u32;
        let host = self
            .hosts
            .get_mut(host_id as usize)
            .ok_or(SimError::InsufficientCapacity {
                vm_id,
                verdict: AllocationVerdict::HostNotFound,
            })?;
        let pe_rates = host.try_place(vm_id, &spec)?;
        let vm = VirtualMachine::new(vm_id, host_id, spec, pe_rates);
        let info = vm.info();
        log_info!(
            self.ctx,
            "vm #{} placed on host {} with rate {} mips",
            vm_id,
            self.hosts[host_id as usize].name,
            info.rate
        );
        self.vms.push(vm);
        Ok(info)
    }

    /// Releases an idle VM and returns its resources to the host.
    pub fn release_vm(&mut self, vm_id: u32) -> Result<(), SimError> {
        let vm = &mut self.vms[vm_id as usize];
        if vm.status() == VmStatus::Released {
            return Ok(());
        }
        let running = vm.running_count();
        if running > 0 {
            return Err(SimError::VmBusy { vm_id, running });
        }
        vm.set_status(VmStatus::Released);
        self.hosts[vm.host_id as usize].release(vm_id);
        log_info!(self.ctx, "vm #{} released", vm_id);
        Ok(())
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> &Host {
        &self.hosts[host_id as usize]
    }

    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn vm(&self, vm_id: u32) -> &VirtualMachine {
        &self.vms[vm_id as usize]
    }

    fn on_cloudlet_start(&mut self, vm_id: u32, mut cloudlet: Cloudlet) {
        cloudlet.start(self.ctx.time());
        let vm = &mut self.vms[vm_id as usize];
        assert_eq!(
            vm.status(),
            VmStatus::Running,
            "cloudlet #{} started on released vm #{}",
            cloudlet.id,
            vm_id
        );
        log_debug!(self.ctx, "cloudlet #{} started on vm #{}", cloudlet.id, vm_id);
        let length = cloudlet.length as f64;
        vm.execution.insert(cloudlet, length, &self.ctx);
        self.reschedule_finish(vm_id);
    }

    fn on_cloudlet_finish(&mut self, vm_id: u32, cloudlet_id: u64) {
        let vm = &mut self.vms[vm_id as usize];
        vm.next_finish = None;
        let mut cloudlet = match vm.execution.pop() {
            Some((_, cloudlet)) => cloudlet,
            None => panic!("no executing cloudlets on vm #{}", vm_id),
        };
        assert_eq!(cloudlet.id, cloudlet_id, "unexpected CloudletFinish event");
        cloudlet.finish(self.ctx.time());
        log_debug!(self.ctx, "cloudlet #{} finished on vm #{}", cloudlet_id, vm_id);
        self.ctx.emit_now(CloudletFinished { cloudlet }, self.broker_id);
        self.reschedule_finish(vm_id);
    }

    /// Cancels the pending finish event of the VM and schedules the new one for the earliest completion.
    fn reschedule_finish(&mut self, vm_id: u32) {
        let vm = &mut self.vms[vm_id as usize];
        if let Some(event_id) = vm.next_finish.take() {
            self.ctx.cancel_event(event_id);
        }
        if let Some((time, cloudlet)) = vm.execution.peek() {
            let cloudlet_id = cloudlet.id;
            let delay = (time - self.ctx.time()).max(0.);
            vm.next_finish = Some(self.ctx.emit_self(CloudletFinish { vm_id, cloudlet_id }, delay));
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            CloudletStart { vm_id, cloudlet } => {
                self.on_cloudlet_start(vm_id, cloudlet);
            }
            CloudletFinish { vm_id, cloudlet_id } => {
                self.on_cloudlet_finish(vm_id, cloudlet_id);
            }
        })
    }
}
