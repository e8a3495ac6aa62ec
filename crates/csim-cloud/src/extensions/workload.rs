//! Synthetic workload generators.

use serde::Serialize;

use csim_core::SimulationContext;

use crate::core::config::WorkloadConfig;

/// Cloudlet to be submitted: its length in MI and arrival time.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CloudletRequest {
    pub length: u64,
    pub arrival_time: f64,
}

/// Produces cloudlet requests using the simulation random generator.
pub trait WorkloadGenerator {
    fn get_workload(&mut self, ctx: &SimulationContext) -> Vec<CloudletRequest>;
}

pub fn workload_resolver(config: &WorkloadConfig) -> Box<dyn WorkloadGenerator> {
    match *config {
        WorkloadConfig::Linear {
            count,
            base_length,
            step,
            start_time,
        } => Box::new(LinearWorkload::new(count, base_length, step, start_time)),
        WorkloadConfig::Mixed { count, max_gap } => Box::new(MixedWorkload::new(count, max_gap)),
    }
}

/// Cloudlets with lengths `base_length + i * step`, all arriving at the same time.
pub struct LinearWorkload {
    count: u32,
    base_length: u64,
    step: u64,
    start_time: f64,
}

impl LinearWorkload {
    pub fn new(count: u32, base_length: u64, step: u64, start_time: f64) -> Self {
        Self {
            count,
            base_length,
            step,
            start_time,
        }
    }
}

impl WorkloadGenerator for LinearWorkload {
    fn get_workload(&mut self, _ctx: &SimulationContext) -> Vec<CloudletRequest> {
        (0..self.count as u64)
            .map(|i| CloudletRequest {
                length: self.base_length + i * self.step,
                arrival_time: self.start_time,
            })
            .collect()
    }
}

/// Mix of small (50%), medium (40%) and huge (10%) cloudlets arriving one by one with random gaps.
pub struct MixedWorkload {
    count: u32,
    max_gap: f64,
}

impl MixedWorkload {
    pub fn new(count: u32, max_gap: f64) -> Self {
        Self { count, max_gap }
    }
}

impl WorkloadGenerator for MixedWorkload {
    fn get_workload(&mut self, ctx: &SimulationContext) -> Vec<CloudletRequest> {
        let mut arrival_time = ctx.time();
        let mut workload = Vec::with_capacity(self.count as usize);
        for _ in 0..self.count {
            let kind = ctx.rand();
            let length = if kind < 0.5 {
                ctx.gen_range(1000..5000)
            } else if kind < 0.9 {
                ctx.gen_range(10000..50000)
            } else {
                ctx.gen_range(100000..500000)
            };
            arrival_time += ctx.rand() * self.max_gap;
            workload.push(CloudletRequest { length, arrival_time });
        }
        workload
    }
}

#[cfg(test)]
mod tests {
    use csim_core::Simulation;

    use super::*;

    #[test]
    fn linear_workload() {
        let mut sim = Simulation::new(42);
        let ctx = sim.create_context("workload");
        let workload = LinearWorkload::new(10, 10000, 500, 0.).get_workload(&ctx);
        assert_eq!(workload.len(), 10);
        assert_eq!(workload[0].length, 10000);
        assert_eq!(workload[9].length, 14500);
        assert!(workload.iter().all(|r| r.arrival_time == 0.));
    }

    #[test]
    fn mixed_workload_is_reproducible() {
        let generate = || {
            let mut sim = Simulation::new(42);
            let ctx = sim.create_context("workload");
            MixedWorkload::new(200, 0.1).get_workload(&ctx)
        };
        let workload = generate();
        assert_eq!(workload, generate());

        let mut previous = 0.;
        for request in &workload {
            assert!(
                (1000..5000).contains(&request.length)
                    || (10000..50000).contains(&request.length)
                    || (100000..500000).contains(&request.length)
            );
            assert!(request.arrival_time >= previous);
            assert!(request.arrival_time - previous <= 0.1);
            previous = request.arrival_time;
        }
        assert!(workload.iter().any(|r| r.length < 5000));
        assert!(workload.iter().any(|r| r.length >= 100000));
    }
}
