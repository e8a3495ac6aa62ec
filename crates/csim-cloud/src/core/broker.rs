//! Broker component: assigns arriving cloudlets to VMs.

use std::collections::VecDeque;

use serde::Serialize;

use csim_core::{cast, log_debug, log_error, log_warn, Event, EventHandler, Id, SimulationContext};

use crate::core::cloudlet::Cloudlet;
use crate::core::error::SimError;
use crate::core::events::cloudlet::{CloudletArrival, CloudletFinished, CloudletStart};
use crate::core::events::vm::VmCreate;
use crate::core::policy::{ClusterState, FirstFit, VmSelectionPolicy, VmState};
use crate::handshake::HandshakeStats;

/// Assignment of a cloudlet to a VM made by the broker.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Assignment {
    pub time: f64,
    pub arrival_index: u64,
    pub cloudlet_id: u64,
    pub vm_id: u32,
}

/// Assigns cloudlets to VMs using the configured policy.
///
/// The broker keeps its own view of VM occupancy, which is updated at assignment time, so that decisions made at the
/// same moment see each other. Cloudlets that can't be placed wait in a FIFO queue, which is retried whenever a VM
/// is created or a cloudlet finishes.
///
/// A fatal policy error stops the run: the error is stored and all pending events are cancelled.
pub struct Broker {
    vms: Vec<VmState>,
    host_ram_total: u64,
    queue: VecDeque<Cloudlet>,
    policy: Box<dyn VmSelectionPolicy>,
    fallback: FirstFit,
    next_arrival_index: u64,
    assignments: Vec<Assignment>,
    finished: Vec<Cloudlet>,
    failure: Option<SimError>,
    datacenter_id: Id,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(policy: Box<dyn VmSelectionPolicy>, datacenter_id: Id, ctx: SimulationContext) -> Self {
        Self {
            vms: Vec::new(),
            host_ram_total: 0,
            queue: VecDeque::new(),
            policy,
            fallback: FirstFit::new(),
            next_arrival_index: 0,
            assignments: Vec::new(),
            finished: Vec::new(),
            failure: None,
            datacenter_id,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Accounts the RAM of a new host in the cluster load.
    pub fn add_host(&mut self, ram_total: u64) {
        self.host_ram_total += ram_total;
    }

    pub fn vms(&self) -> &[VmState] {
        &self.vms
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Assignments in the order they were made.
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Finished cloudlets in the order of completion.
    pub fn finished_cloudlets(&self) -> &[Cloudlet] {
        &self.finished
    }

    /// Error which stopped the run, if any.
    pub fn failure(&self) -> Option<&SimError> {
        self.failure.as_ref()
    }

    pub fn handshake_stats(&self) -> Option<HandshakeStats> {
        self.policy.handshake_stats()
    }

    /// Returns the cluster load as seen by the broker.
    pub fn cluster_state(&self) -> ClusterState {
        let total_pes: usize = self.vms.iter().map(|vm| vm.info.pes as usize).sum();
        let busy_pes: usize = self
            .vms
            .iter()
            .map(|vm| vm.running.min(vm.info.pes as usize))
            .sum();
        let busy_ram: u64 = self.vms.iter().filter(|vm| vm.running > 0).map(|vm| vm.info.ram).sum();
        ClusterState {
            time: self.ctx.time(),
            cpu_load: if total_pes > 0 {
                busy_pes as f64 / total_pes as f64
            } else {
                0.
            },
            ram_load: if self.host_ram_total > 0 {
                (busy_ram as f64 / self.host_ram_total as f64).min(1.)
            } else {
                0.
            },
        }
    }

    fn on_vm_created(&mut self, vm: VmState) {
        log_debug!(self.ctx, "vm #{} is available with rate {}", vm.info.id, vm.info.rate);
        self.vms.push(vm);
        self.process_queue();
    }

    fn on_cloudlet_arrival(&mut self, mut cloudlet: Cloudlet) {
        if self.failure.is_some() {
            return;
        }
        cloudlet.enqueue(self.next_arrival_index);
        self.next_arrival_index += 1;
        if !self.queue.is_empty() {
            // keep FIFO order behind cloudlets which are already waiting
            self.queue.push_back(cloudlet);
            self.process_queue();
            return;
        }
        match self.try_assign(cloudlet) {
            Ok(None) => {}
            Ok(Some(cloudlet)) => {
                log_debug!(self.ctx, "no free vm for cloudlet #{}, queued", cloudlet.id);
                self.queue.push_back(cloudlet);
            }
            Err(err) => self.abort(err),
        }
    }

    fn on_cloudlet_finished(&mut self, cloudlet: Cloudlet) {
        if let Some(vm_id) = cloudlet.vm_id() {
            if let Some(vm) = self.vms.iter_mut().find(|vm| vm.info.id == vm_id) {
                vm.running -= 1;
            }
        }
        log_debug!(
            self.ctx,
            "cloudlet #{} completed, turnaround {:.3}",
            cloudlet.id,
            self.ctx.time() - cloudlet.arrival_time
        );
        self.finished.push(cloudlet);
        self.process_queue();
    }

    /// Retries queued cloudlets in FIFO order until the first one that still can't be placed.
    fn process_queue(&mut self) {
        while self.failure.is_none() {
            let cloudlet = match self.queue.pop_front() {
                Some(cloudlet) => cloudlet,
                None => break,
            };
            match self.try_assign(cloudlet) {
                Ok(None) => {}
                Ok(Some(cloudlet)) => {
                    self.queue.push_front(cloudlet);
                    break;
                }
                Err(err) => self.abort(err),
            }
        }
    }

    /// Assigns the cloudlet or returns it back if it has to wait.
    fn try_assign(&mut self, cloudlet: Cloudlet) -> Result<Option<Cloudlet>, SimError> {
        let cluster = self.cluster_state();
        let selected = match self.policy.select_vm(&cloudlet, &self.vms, &cluster) {
            Ok(selected) => selected,
            Err(err) if !err.is_fatal() => {
                log_warn!(self.ctx, "{}, using first fit for cloudlet #{}", err, cloudlet.id);
                self.fallback.select_vm(&cloudlet, &self.vms, &cluster)?
            }
            Err(err) => return Err(err),
        };
        match selected {
            Some(index) if index < self.vms.len() => {
                self.assign(cloudlet, index);
                Ok(None)
            }
            Some(index) => Err(SimError::ProtocolViolation(format!(
                "policy selected vm index {} out of {} vms",
                index,
                self.vms.len()
            ))),
            None => Ok(Some(cloudlet)),
        }
    }

    fn assign(&mut self, mut cloudlet: Cloudlet, index: usize) {
        let vm = &mut self.vms[index];
        cloudlet.assign(vm.info.id);
        vm.running += 1;
        let vm_id = vm.info.id;
        self.assignments.push(Assignment {
            time: self.ctx.time(),
            arrival_index: cloudlet.arrival_index().unwrap_or_default(),
            cloudlet_id: cloudlet.id,
            vm_id,
        });
        log_debug!(self.ctx, "cloudlet #{} assigned to vm #{}", cloudlet.id, vm_id);
        self.ctx.emit_now(CloudletStart { vm_id, cloudlet }, self.datacenter_id);
    }

    fn abort(&mut self, err: SimError) {
        log_error!(self.ctx, "run aborted: {}", err);
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        self.ctx.cancel_events(|_| true);
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreate { vm } => {
                self.on_vm_created(VmState::new(vm));
            }
            CloudletArrival { cloudlet } => {
                self.on_cloudlet_arrival(cloudlet);
            }
            CloudletFinished { cloudlet } => {
                self.on_cloudlet_finished(cloudlet);
            }
        })
    }
}
