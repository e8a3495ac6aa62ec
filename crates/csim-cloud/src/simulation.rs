//! Simulation facade: builds the cluster, submits the workload and runs the simulation.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use csim_core::{log_info, Simulation, SimulationContext};

use crate::core::broker::{Assignment, Broker};
use crate::core::cloudlet::Cloudlet;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::error::SimError;
use crate::core::events::cloudlet::CloudletArrival;
use crate::core::events::vm::VmCreate;
use crate::core::host::ProcessingElement;
use crate::core::metrics::{collect_metrics, CloudletMetrics, RunSummary};
use crate::core::monitoring::Monitoring;
use crate::core::policy::{policy_resolver, VmSelectionPolicy};
use crate::core::vm::VmSpec;
use crate::extensions::workload::{workload_resolver, WorkloadGenerator};
use crate::handshake::HandshakeStats;

pub struct CloudSimulation {
    datacenter: Rc<RefCell<Datacenter>>,
    broker: Rc<RefCell<Broker>>,
    broker_id: u32,
    monitoring: Option<Rc<RefCell<Monitoring>>>,
    policy_name: String,
    cost_per_second: f64,
    next_cloudlet_id: u64,
    sim: Simulation,
    ctx: SimulationContext,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, policy: Box<dyn VmSelectionPolicy>) -> Self {
        let datacenter_ctx = sim.create_context("datacenter");
        let broker_ctx = sim.create_context("broker");
        let datacenter_id = datacenter_ctx.id();
        let broker_id = broker_ctx.id();
        let datacenter = rc!(refcell!(Datacenter::new(broker_id, datacenter_ctx)));
        sim.add_handler("datacenter", datacenter.clone());
        let broker = rc!(refcell!(Broker::new(policy, datacenter_id, broker_ctx)));
        sim.add_handler("broker", broker.clone());
        let ctx = sim.create_context("simulation");
        Self {
            datacenter,
            broker,
            broker_id,
            monitoring: None,
            policy_name: "custom".to_string(),
            cost_per_second: 0.1,
            next_cloudlet_id: 0,
            sim,
            ctx,
        }
    }

    /// Builds the whole simulation from config: hosts, VMs, policy, workload and optional clock ticks.
    ///
    /// Setup errors (unknown policy, VM that fits no host) are returned before any event is processed.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimError> {
        let policy = policy_resolver(&config.policy, &config.agent)?;
        let mut cloud_sim = Self::new(Simulation::new(config.seed), policy);
        cloud_sim.policy_name = config.policy.clone();
        cloud_sim.cost_per_second = config.cost_per_second;

        for host_config in &config.hosts {
            let prefix = host_config.name_prefix.clone().unwrap_or_else(|| "host".to_string());
            for i in 0..host_config.count.unwrap_or(1) {
                let ctx = &cloud_sim.ctx;
                let pes = host_config.pes.resolve(i, ctx);
                let mips = host_config.pe_mips.resolve(i, ctx);
                let ram = host_config.ram.resolve(i, ctx);
                let bw = host_config.bw.as_ref().map_or(100000, |bw| bw.resolve(i, ctx));
                let storage = host_config.storage.as_ref().map_or(1000000, |s| s.resolve(i, ctx));
                let name = format!("{}{}", prefix, cloud_sim.datacenter.borrow().hosts().len());
                cloud_sim.add_host(&name, vec![ProcessingElement::new(mips); pes as usize], ram, bw, storage);
            }
        }

        for vm_config in &config.vms {
            for i in 0..vm_config.count.unwrap_or(1) {
                let ctx = &cloud_sim.ctx;
                let mut spec = VmSpec::new(vm_config.pes.resolve(i, ctx), vm_config.mips.resolve(i, ctx));
                if let Some(ram) = &vm_config.ram {
                    spec = spec.with_ram(ram.resolve(i, ctx));
                }
                if let Some(bw) = &vm_config.bw {
                    spec = spec.with_bw(bw.resolve(i, ctx));
                }
                if let Some(storage) = &vm_config.storage {
                    spec = spec.with_storage(storage.resolve(i, ctx));
                }
                if let Some(cap) = vm_config.rate_cap {
                    spec = spec.with_rate_cap(cap);
                }
                cloud_sim.add_vm(spec)?;
            }
        }

        cloud_sim.submit_workload(workload_resolver(&config.workload).as_mut())?;
        if let Some(period) = config.clock_tick_period {
            cloud_sim.enable_clock_ticks(period);
        }
        Ok(cloud_sim)
    }

    /// Sets the name reported in the run summary.
    pub fn set_policy_name(&mut self, name: &str) {
        self.policy_name = name.to_string();
    }

    pub fn set_cost_per_second(&mut self, cost_per_second: f64) {
        self.cost_per_second = cost_per_second;
    }

    pub fn add_host(&mut self, name: &str, pes: Vec<ProcessingElement>, ram: u64, bw: u64, storage: u64) -> u32 {
        let id = self.datacenter.borrow_mut().add_host(name, pes, ram, bw, storage);
        self.broker.borrow_mut().add_host(ram);
        id
    }

    /// Places VM on the first suitable host and makes it available to the broker.
    pub fn add_vm(&mut self, spec: VmSpec) -> Result<u32, SimError> {
        let vm = self.datacenter.borrow_mut().place_vm(spec)?;
        let id = vm.id;
        self.ctx.emit_now(VmCreate { vm }, self.broker_id);
        Ok(id)
    }

    /// Places VM on the specified host and makes it available to the broker.
    pub fn add_vm_on_host(&mut self, host_id: u32, spec: VmSpec) -> Result<u32, SimError> {
        let vm = self.datacenter.borrow_mut().place_vm_on(host_id, spec)?;
        let id = vm.id;
        self.ctx.emit_now(VmCreate { vm }, self.broker_id);
        Ok(id)
    }

    pub fn release_vm(&mut self, vm_id: u32) -> Result<(), SimError> {
        self.datacenter.borrow_mut().release_vm(vm_id)
    }

    /// Submits cloudlet arriving at the specified absolute time, returns cloudlet ID.
    pub fn submit_cloudlet(&mut self, length: u64, arrival_time: f64) -> Result<u64, SimError> {
        let id = self.next_cloudlet_id;
        let cloudlet = Cloudlet::new(id, length, arrival_time);
        self.ctx
            .emit_at(CloudletArrival { cloudlet }, self.broker_id, arrival_time)?;
        self.next_cloudlet_id += 1;
        Ok(id)
    }

    pub fn submit_workload(&mut self, generator: &mut dyn WorkloadGenerator) -> Result<(), SimError> {
        let workload = generator.get_workload(&self.ctx);
        log_info!(self.ctx, "submitting {} cloudlets", workload.len());
        for request in workload {
            self.submit_cloudlet(request.length, request.arrival_time)?;
        }
        Ok(())
    }

    /// Enables periodic sampling of host and VM state, returns the monitoring component.
    pub fn enable_clock_ticks(&mut self, period: f64) -> Rc<RefCell<Monitoring>> {
        if let Some(monitoring) = &self.monitoring {
            return monitoring.clone();
        }
        let monitoring = rc!(refcell!(Monitoring::new(
            self.datacenter.clone(),
            period,
            self.sim.create_context("monitoring"),
        )));
        self.sim.add_handler("monitoring", monitoring.clone());
        self.monitoring = Some(monitoring.clone());
        monitoring
    }

    /// Runs the simulation until there are no pending events.
    ///
    /// Returns the error which aborted the run, finished cloudlets stay available in this case.
    pub fn run(&mut self) -> Result<(), SimError> {
        self.start_monitoring();
        self.sim.step_until_no_events();
        self.result()
    }

    /// Performs the specified number of steps through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.start_monitoring();
        self.sim.steps(step_count)
    }

    /// Steps through the simulation with duration limit.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.start_monitoring();
        self.sim.step_for_duration(duration)
    }

    fn start_monitoring(&mut self) {
        if let Some(monitoring) = &self.monitoring {
            monitoring.borrow_mut().start();
        }
    }

    /// Returns the error which stopped the run, if any.
    pub fn result(&self) -> Result<(), SimError> {
        match self.broker.borrow().failure() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn datacenter(&self) -> Rc<RefCell<Datacenter>> {
        self.datacenter.clone()
    }

    pub fn broker(&self) -> Rc<RefCell<Broker>> {
        self.broker.clone()
    }

    pub fn monitoring(&self) -> Option<Rc<RefCell<Monitoring>>> {
        self.monitoring.clone()
    }

    /// Number of submitted cloudlets.
    pub fn submitted_count(&self) -> usize {
        self.next_cloudlet_id as usize
    }

    /// Finished cloudlets in the order of completion.
    pub fn finished_cloudlets(&self) -> Vec<Cloudlet> {
        self.broker.borrow().finished_cloudlets().to_vec()
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.broker.borrow().assignments().to_vec()
    }

    pub fn handshake_stats(&self) -> Option<HandshakeStats> {
        self.broker.borrow().handshake_stats()
    }

    pub fn metrics(&self) -> Vec<CloudletMetrics> {
        collect_metrics(self.broker.borrow().finished_cloudlets(), self.cost_per_second)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(&self.policy_name, self.submitted_count(), &self.metrics())
    }
}
