//! Agent side of the handshake: answers published states with decisions.

use std::thread;
use std::time::Duration;

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::error::SimError;
use crate::handshake::transport::AgentEndpoint;
use crate::handshake::{AgentState, Decision};

/// Chooses a VM index for a published state.
pub trait DecisionMaker {
    fn decide(&mut self, state: &AgentState) -> i64;
}

impl<F: FnMut(&AgentState) -> i64> DecisionMaker for F {
    fn decide(&mut self, state: &AgentState) -> i64 {
        self(state)
    }
}

/// Explores a random VM with probability `epsilon`, otherwise maps the task size onto the VM range so that larger
/// tasks go to VMs with higher indices.
pub struct EpsilonGreedy {
    vm_count: u32,
    epsilon: f64,
    max_task_size: u64,
    rand: Pcg64,
}

impl EpsilonGreedy {
    pub fn new(vm_count: u32, epsilon: f64, max_task_size: u64, seed: u64) -> Self {
        Self {
            vm_count,
            epsilon,
            max_task_size: max_task_size.max(1),
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl DecisionMaker for EpsilonGreedy {
    fn decide(&mut self, state: &AgentState) -> i64 {
        if self.vm_count == 0 {
            return 0;
        }
        if self.rand.gen::<f64>() < self.epsilon {
            return self.rand.gen_range(0..self.vm_count) as i64;
        }
        let size = state.task_size.min(self.max_task_size) as f64 / self.max_task_size as f64;
        ((size * self.vm_count as f64) as i64).min(self.vm_count as i64 - 1)
    }
}

/// Serves at most one pending request. Returns `true` if a decision was published.
///
/// Does nothing while the previous decision is still in the slot.
pub fn serve_once<E: AgentEndpoint, D: DecisionMaker>(endpoint: &E, maker: &mut D) -> Result<bool, SimError> {
    if endpoint.decision_pending()? {
        return Ok(false);
    }
    let content = match endpoint.take_state()? {
        Some(content) => content,
        None => return Ok(false),
    };
    let state = AgentState::decode(&content)?;
    let decision = Decision::new(maker.decide(&state));
    endpoint.write_decision(&decision.encode())?;
    Ok(true)
}

/// Polls the endpoint and serves requests until `limit` decisions are published (forever if not set).
pub fn serve<E: AgentEndpoint, D: DecisionMaker>(
    endpoint: &E,
    maker: &mut D,
    poll_interval: Duration,
    limit: Option<u64>,
) -> Result<u64, SimError> {
    let mut served = 0;
    while limit.map_or(true, |limit| served < limit) {
        if serve_once(endpoint, maker)? {
            served += 1;
        } else {
            thread::sleep(poll_interval);
        }
    }
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::transport::{MemorySlots, SlotTransport};

    fn state(task_size: u64) -> AgentState {
        AgentState {
            cpu_load: 0.,
            ram_load: 0.,
            task_size,
        }
    }

    #[test]
    fn greedy_maps_size_to_vm() {
        let mut agent = EpsilonGreedy::new(5, 0., 500000, 42);
        assert_eq!(agent.decide(&state(1000)), 0);
        assert_eq!(agent.decide(&state(250000)), 2);
        assert_eq!(agent.decide(&state(500000)), 4);
        assert_eq!(agent.decide(&state(10000000)), 4);
    }

    #[test]
    fn exploration_stays_in_range() {
        let mut agent = EpsilonGreedy::new(3, 1., 1000, 7);
        for i in 0..100 {
            let index = agent.decide(&state(i));
            assert!((0..3).contains(&index));
        }
    }

    #[test]
    fn serve_once_waits_for_consumption() {
        let slots = MemorySlots::new();
        let mut maker = |s: &AgentState| s.task_size as i64 % 2;
        assert!(!serve_once(&slots, &mut maker).unwrap());

        slots.write_state(&state(3).encode().unwrap()).unwrap();
        assert!(serve_once(&slots, &mut maker).unwrap());
        assert_eq!(slots.peek_decision().unwrap().as_deref(), Some("{\"vm_index\": 1}"));

        slots.write_state(&state(4).encode().unwrap()).unwrap();
        assert!(!serve_once(&slots, &mut maker).unwrap());
        slots.clear_decision().unwrap();
        assert!(serve_once(&slots, &mut maker).unwrap());
        assert_eq!(slots.peek_decision().unwrap().as_deref(), Some("{\"vm_index\": 0}"));
    }
}
