//! Synchronous exchange of cluster state and scheduling decisions with an external agent.
//!
//! Each round the engine publishes an [`AgentState`] into the state slot, waits until the agent puts a
//! [`Decision`] into the decision slot, reads it and clears the slot. Only one round is outstanding at a time and the
//! whole simulation is suspended while waiting.
//!
//! The rounds are driven by [`SlotChannel`], which is generic over the [`SlotTransport`] holding the two slots:
//! [`FileSlots`] for an agent running in another process and [`MemorySlots`] for an agent running in another thread.

pub mod agent;
pub mod transport;

use std::thread;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::SimError;

pub use transport::{AgentEndpoint, FileSlots, MemorySlots, SlotTransport};

/// Cluster state published to the agent before each decision.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AgentState {
    /// Fraction of busy VM processing elements.
    pub cpu_load: f64,
    /// Fraction of host RAM held by busy VMs.
    pub ram_load: f64,
    /// Length of the cloudlet being scheduled.
    pub task_size: u64,
}

impl AgentState {
    pub fn encode(&self) -> Result<String, SimError> {
        serde_json::to_string(self).map_err(|e| SimError::Io(e.to_string()))
    }

    pub fn decode(content: &str) -> Result<Self, SimError> {
        serde_json::from_str(content).map_err(|e| SimError::ProtocolViolation(format!("malformed state: {}", e)))
    }
}

/// Index of the VM selected by the agent.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    #[serde(alias = "vm_id")]
    pub vm_index: i64,
}

impl Decision {
    pub fn new(vm_index: i64) -> Self {
        Self { vm_index }
    }

    /// Canonical encoding: `{"vm_index": <int>}`.
    pub fn encode(&self) -> String {
        format!("{{\"vm_index\": {}}}", self.vm_index)
    }

    /// Decodes a decision. Besides the canonical JSON record, accepts legacy text holding a single integer
    /// (`vm_id:3`, `VM 3`, `[3]`), surrounding text is ignored. For `key: value` text only the value is looked at.
    /// A minus sign right before the digits is kept, so `-1` decodes to a negative index.
    pub fn decode(content: &str) -> Result<Self, SimError> {
        lazy_static! {
            static ref INTEGER: Regex = Regex::new(r"-?\d+").unwrap();
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(SimError::ProtocolViolation("empty decision".to_string()));
        }
        if content.starts_with('{') {
            return serde_json::from_str(content)
                .map_err(|e| SimError::ProtocolViolation(format!("malformed decision {}: {}", content, e)));
        }
        let value = match content.rsplit_once(':') {
            Some((_, value)) => value,
            None => content,
        };
        let mut numbers = INTEGER.find_iter(value);
        match (numbers.next(), numbers.next()) {
            (Some(number), None) => number
                .as_str()
                .parse::<i64>()
                .map(Decision::new)
                .map_err(|e| SimError::ProtocolViolation(format!("malformed decision {}: {}", content, e))),
            (None, _) => Err(SimError::ProtocolViolation(format!("no vm index in decision: {}", content))),
            (Some(_), Some(_)) => Err(SimError::ProtocolViolation(format!("ambiguous decision: {}", content))),
        }
    }
}

/// Counters of the handshake rounds.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandshakeStats {
    pub state_writes: u64,
    pub decision_reads: u64,
    /// Rounds abandoned after the deadline expired.
    pub abandoned: u64,
}

/// Request/response channel to a decision maker.
pub trait DecisionChannel {
    /// Publishes the state and blocks until the decision is available.
    fn request(&mut self, state: &AgentState) -> Result<Decision, SimError>;

    fn stats(&self) -> HandshakeStats;
}

/// Timing parameters of the polling loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollingOptions {
    pub poll_interval: Duration,
    /// Extra wait after the decision appears and before it is read, gives a non-atomic writer time to finish.
    pub settle_delay: Duration,
    /// Deadline of a single round. Waits forever if not set.
    pub timeout: Option<Duration>,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            settle_delay: Duration::from_millis(50),
            timeout: None,
        }
    }
}

/// Decision channel polling a pair of single-value slots.
pub struct SlotChannel<T: SlotTransport> {
    transport: T,
    options: PollingOptions,
    stats: HandshakeStats,
}

impl<T: SlotTransport> SlotChannel<T> {
    pub fn new(transport: T, options: PollingOptions) -> Self {
        Self {
            transport,
            options,
            stats: HandshakeStats::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn wait_for_decision(&mut self) -> Result<(), SimError> {
        let started = Instant::now();
        while self.transport.peek_decision()?.is_none() {
            if let Some(timeout) = self.options.timeout {
                if started.elapsed() >= timeout {
                    return Err(SimError::AgentUnresponsive { timeout });
                }
            }
            thread::sleep(self.options.poll_interval);
        }
        Ok(())
    }
}

impl<T: SlotTransport> DecisionChannel for SlotChannel<T> {
    /// A decision left over from an abandoned round is dropped before the new state is published. An agent still
    /// working on the abandoned state can answer after that, and its answer is taken for the new round.
    fn request(&mut self, state: &AgentState) -> Result<Decision, SimError> {
        self.transport.clear_decision()?;
        self.transport.write_state(&state.encode()?)?;
        self.stats.state_writes += 1;

        if let Err(err) = self.wait_for_decision() {
            // withdraw the request so that a late answer is not taken for the next round
            self.stats.abandoned += 1;
            self.transport.clear_state()?;
            self.transport.clear_decision()?;
            return Err(err);
        }
        thread::sleep(self.options.settle_delay);

        let content = self.transport.peek_decision()?.unwrap_or_default();
        self.transport.clear_decision()?;
        self.stats.decision_reads += 1;
        Decision::decode(&content)
    }

    fn stats(&self) -> HandshakeStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_decision() {
        assert_eq!(Decision::decode("{\"vm_index\": 2}"), Ok(Decision::new(2)));
        assert_eq!(Decision::decode("{\"vm_id\": 4}"), Ok(Decision::new(4)));
        assert_eq!(Decision::decode(&Decision::new(11).encode()), Ok(Decision::new(11)));
    }

    #[test]
    fn legacy_decision() {
        assert_eq!(Decision::decode("vm_id:3"), Ok(Decision::new(3)));
        assert_eq!(Decision::decode(" 7\n"), Ok(Decision::new(7)));
        assert_eq!(Decision::decode("\"vm_id\": \"1\""), Ok(Decision::new(1)));
        assert_eq!(Decision::decode("-1"), Ok(Decision::new(-1)));
        assert_eq!(Decision::decode("vm_id=3"), Ok(Decision::new(3)));
        assert_eq!(Decision::decode("VM 3"), Ok(Decision::new(3)));
        assert_eq!(Decision::decode("[3]"), Ok(Decision::new(3)));
        assert_eq!(Decision::decode("action: vm 3"), Ok(Decision::new(3)));
        assert_eq!(Decision::decode("vm2: 5"), Ok(Decision::new(5)));
        assert_eq!(Decision::decode("index=-1"), Ok(Decision::new(-1)));
    }

    #[test]
    fn malformed_decision() {
        for content in ["", "   ", "vm_id:", "three", "{\"vm\": 1}", "{broken", "vm 1 or 2", "99999999999999999999"] {
            assert!(
                matches!(Decision::decode(content), Err(SimError::ProtocolViolation(_))),
                "{:?} must be rejected",
                content
            );
        }
    }

    #[test]
    fn state_encoding() {
        let state = AgentState {
            cpu_load: 0.5,
            ram_load: 0.25,
            task_size: 5000,
        };
        let encoded = state.encode().unwrap();
        assert_eq!(encoded, "{\"cpu_load\":0.5,\"ram_load\":0.25,\"task_size\":5000}");
        assert_eq!(AgentState::decode(&encoded), Ok(state));
    }

    fn answer_once(agent: MemorySlots, decision: &'static str) -> thread::JoinHandle<Option<String>> {
        thread::spawn(move || loop {
            if let Some(state) = agent.take_state().unwrap() {
                agent.write_decision(decision).unwrap();
                return Some(state);
            }
            thread::sleep(Duration::from_millis(1));
        })
    }

    #[test]
    fn round_over_memory_slots() {
        let slots = MemorySlots::new();
        let agent = answer_once(slots.clone(), "vm_id:3");
        let options = PollingOptions {
            poll_interval: Duration::from_millis(1),
            settle_delay: Duration::from_millis(0),
            timeout: None,
        };
        let mut channel = SlotChannel::new(slots, options);
        let state = AgentState {
            cpu_load: 0.5,
            ram_load: 0.5,
            task_size: 5000,
        };
        assert_eq!(channel.request(&state), Ok(Decision::new(3)));
        assert_eq!(agent.join().unwrap().map(|s| AgentState::decode(&s)), Some(Ok(state)));
        assert_eq!(channel.transport().peek_decision().unwrap(), None);
        assert_eq!(
            channel.stats(),
            HandshakeStats {
                state_writes: 1,
                decision_reads: 1,
                abandoned: 0
            }
        );
    }

    #[test]
    fn leftover_decision_is_not_taken_for_new_round() {
        let slots = MemorySlots::new();
        // late answer to a withdrawn round
        slots.write_decision("4").unwrap();
        let agent = answer_once(slots.clone(), "1");
        let options = PollingOptions {
            poll_interval: Duration::from_millis(1),
            settle_delay: Duration::from_millis(0),
            timeout: None,
        };
        let mut channel = SlotChannel::new(slots, options);
        let state = AgentState {
            cpu_load: 0.,
            ram_load: 0.,
            task_size: 100,
        };
        assert_eq!(channel.request(&state), Ok(Decision::new(1)));
        assert!(agent.join().unwrap().is_some());
        assert_eq!(channel.stats().decision_reads, 1);
    }

    #[test]
    fn expired_round_is_withdrawn() {
        let options = PollingOptions {
            poll_interval: Duration::from_millis(1),
            settle_delay: Duration::from_millis(0),
            timeout: Some(Duration::from_millis(20)),
        };
        let slots = MemorySlots::new();
        let agent = slots.clone();
        let mut channel = SlotChannel::new(slots, options);
        let state = AgentState {
            cpu_load: 0.,
            ram_load: 0.,
            task_size: 1,
        };
        assert_eq!(
            channel.request(&state),
            Err(SimError::AgentUnresponsive {
                timeout: Duration::from_millis(20)
            })
        );
        assert_eq!(agent.take_state().unwrap(), None);
        assert_eq!(channel.stats().abandoned, 1);
        assert_eq!(channel.stats().decision_reads, 0);
    }
}
