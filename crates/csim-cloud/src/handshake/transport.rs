//! Slot transports used by the handshake.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Engine side of a pair of single-value slots: the state slot written by the engine and the decision slot written
/// by the agent.
pub trait SlotTransport {
    /// Overwrites the state slot.
    fn write_state(&self, payload: &str) -> io::Result<()>;

    /// Returns the content of the decision slot if it is not empty. The slot is left untouched.
    fn peek_decision(&self) -> io::Result<Option<String>>;

    fn clear_decision(&self) -> io::Result<()>;

    fn clear_state(&self) -> io::Result<()>;
}

/// Agent side of the slots.
pub trait AgentEndpoint {
    /// Takes the published state out of the state slot.
    fn take_state(&self) -> io::Result<Option<String>>;

    /// Publishes a decision. Must only be called after the previous decision has been consumed.
    fn write_decision(&self, payload: &str) -> io::Result<()>;

    /// Returns `true` if the previous decision is still waiting in the slot.
    fn decision_pending(&self) -> io::Result<bool>;
}

////////////////////////////////////////////////////////////////////////////////

/// Slots stored as files, for agents running in a separate process.
///
/// Payloads are written to a temporary file in the same directory and renamed into place, so the reader never
/// observes a partially written slot.
#[derive(Clone, Debug)]
pub struct FileSlots {
    state_path: PathBuf,
    decision_path: PathBuf,
}

impl FileSlots {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(state_path: P, decision_path: Q) -> Self {
        Self {
            state_path: state_path.into(),
            decision_path: decision_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn decision_path(&self) -> &Path {
        &self.decision_path
    }
}

fn publish(path: &Path, payload: &str) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}

fn read_slot(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_slot(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl SlotTransport for FileSlots {
    fn write_state(&self, payload: &str) -> io::Result<()> {
        publish(&self.state_path, payload)
    }

    fn peek_decision(&self) -> io::Result<Option<String>> {
        read_slot(&self.decision_path)
    }

    fn clear_decision(&self) -> io::Result<()> {
        remove_slot(&self.decision_path)
    }

    fn clear_state(&self) -> io::Result<()> {
        remove_slot(&self.state_path)
    }
}

impl AgentEndpoint for FileSlots {
    fn take_state(&self) -> io::Result<Option<String>> {
        let state = read_slot(&self.state_path)?;
        if state.is_some() {
            remove_slot(&self.state_path)?;
        }
        Ok(state)
    }

    fn write_decision(&self, payload: &str) -> io::Result<()> {
        publish(&self.decision_path, payload)
    }

    fn decision_pending(&self) -> io::Result<bool> {
        Ok(read_slot(&self.decision_path)?.is_some())
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Default)]
struct Slots {
    state: Option<String>,
    decision: Option<String>,
}

/// In-process slots shared between the engine and an agent thread.
#[derive(Clone, Default)]
pub struct MemorySlots {
    slots: Arc<Mutex<Slots>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Slots>> {
        self.slots
            .lock()
            .map_err(|_| io::Error::new(ErrorKind::Other, "slots mutex is poisoned"))
    }
}

fn non_empty(payload: &str) -> Option<String> {
    if payload.trim().is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

impl SlotTransport for MemorySlots {
    fn write_state(&self, payload: &str) -> io::Result<()> {
        self.lock()?.state = non_empty(payload);
        Ok(())
    }

    fn peek_decision(&self) -> io::Result<Option<String>> {
        Ok(self.lock()?.decision.clone())
    }

    fn clear_decision(&self) -> io::Result<()> {
        self.lock()?.decision = None;
        Ok(())
    }

    fn clear_state(&self) -> io::Result<()> {
        self.lock()?.state = None;
        Ok(())
    }
}

impl AgentEndpoint for MemorySlots {
    fn take_state(&self) -> io::Result<Option<String>> {
        Ok(self.lock()?.state.take())
    }

    fn write_decision(&self, payload: &str) -> io::Result<()> {
        self.lock()?.decision = non_empty(payload);
        Ok(())
    }

    fn decision_pending(&self) -> io::Result<bool> {
        Ok(self.lock()?.decision.is_some())
    }
}
