//! Periodic sampling of host and VM state.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use csim_core::{cast, log_trace, Event, EventHandler, SimulationContext};

use crate::core::datacenter::Datacenter;
use crate::core::events::monitoring::ClockTick;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VmSample {
    pub vm_id: u32,
    pub host_id: u32,
    /// Number of executing cloudlets.
    pub running: usize,
    pub rate: f64,
    pub rate_per_cloudlet: f64,
    /// Fraction of VM processing elements occupied by cloudlets.
    pub cpu_utilization: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HostSample {
    pub host_id: u32,
    pub mips_allocated: f64,
    pub mips_total: f64,
    pub ram_allocated: u64,
    pub ram_total: u64,
}

/// State of the datacenter at a clock tick.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ClockSample {
    pub time: f64,
    pub vms: Vec<VmSample>,
    pub hosts: Vec<HostSample>,
}

pub type TickListener = Box<dyn FnMut(&ClockSample)>;

/// Samples the datacenter state on each [`ClockTick`] and keeps the history of samples.
///
/// The next tick is scheduled only while other events are pending, so ticking stops together with the rest of the
/// simulation.
pub struct Monitoring {
    datacenter: Rc<RefCell<Datacenter>>,
    period: f64,
    started: bool,
    samples: Vec<ClockSample>,
    listeners: Vec<TickListener>,
    ctx: SimulationContext,
}

impl Monitoring {
    pub fn new(datacenter: Rc<RefCell<Datacenter>>, period: f64, ctx: SimulationContext) -> Self {
        Self {
            datacenter,
            period,
            started: false,
            samples: Vec::new(),
            listeners: Vec::new(),
            ctx,
        }
    }

    pub fn id(&self) -> u32 {
        self.ctx.id()
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Schedules the first tick at the current time. Does nothing if ticking has already started.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.ctx.emit_self_now(ClockTick {});
        }
    }

    /// Registers a callback invoked with each new sample.
    pub fn add_listener(&mut self, listener: TickListener) {
        self.listeners.push(listener);
    }

    pub fn samples(&self) -> &[ClockSample] {
        &self.samples
    }

    fn sample(&self) -> ClockSample {
        let datacenter = self.datacenter.borrow();
        let vms = datacenter
            .vms()
            .iter()
            .map(|vm| VmSample {
                vm_id: vm.id,
                host_id: vm.host_id,
                running: vm.running_count(),
                rate: vm.rate(),
                rate_per_cloudlet: vm.rate_per_cloudlet(),
                cpu_utilization: vm.cpu_utilization(),
            })
            .collect();
        let hosts = datacenter
            .hosts()
            .iter()
            .map(|host| HostSample {
                host_id: host.id,
                mips_allocated: host.mips_total() - host.mips_available(),
                mips_total: host.mips_total(),
                ram_allocated: host.ram_total() - host.ram_available(),
                ram_total: host.ram_total(),
            })
            .collect();
        ClockSample {
            time: self.ctx.time(),
            vms,
            hosts,
        }
    }

    fn on_clock_tick(&mut self) {
        let sample = self.sample();
        for vm in sample.vms.iter().filter(|vm| vm.running > 0) {
            log_trace!(
                self.ctx,
                "vm #{}: {} cloudlets, cpu utilization {:.0}%",
                vm.vm_id,
                vm.running,
                vm.cpu_utilization * 100.
            );
        }
        for listener in self.listeners.iter_mut() {
            listener(&sample);
        }
        self.samples.push(sample);
        if self.ctx.has_pending_events() {
            self.ctx.emit_self(ClockTick {}, self.period);
        }
    }
}

impl EventHandler for Monitoring {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ClockTick {} => {
                self.on_clock_tick();
            }
        })
    }
}
