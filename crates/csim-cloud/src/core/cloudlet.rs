//! Cloudlet (task) and its lifecycle.

use std::fmt::{Display, Formatter};

use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CloudletStatus {
    Created,
    Queued,
    Assigned,
    Executing,
    Finished,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Queued => write!(f, "queued"),
            CloudletStatus::Assigned => write!(f, "assigned"),
            CloudletStatus::Executing => write!(f, "executing"),
            CloudletStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Unit of work measured in millions of instructions. Always requires a single PE.
///
/// Status only moves forward: created, queued, assigned, executing, finished.
/// Once assigned, a cloudlet stays bound to its VM.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Cloudlet {
    pub id: u64,
    pub length: u64,
    pub pes: u32,
    pub arrival_time: f64,
    arrival_index: Option<u64>,
    vm_id: Option<u32>,
    status: CloudletStatus,
    start_time: Option<f64>,
    finish_time: Option<f64>,
}

impl Cloudlet {
    pub fn new(id: u64, length: u64, arrival_time: f64) -> Self {
        Self {
            id,
            length,
            pes: 1,
            arrival_time,
            arrival_index: None,
            vm_id: None,
            status: CloudletStatus::Created,
            start_time: None,
            finish_time: None,
        }
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    /// Position of the cloudlet in the broker arrival sequence.
    pub fn arrival_index(&self) -> Option<u64> {
        self.arrival_index
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    pub fn is_finished(&self) -> bool {
        self.status == CloudletStatus::Finished
    }

    pub(crate) fn enqueue(&mut self, arrival_index: u64) {
        assert_eq!(self.status, CloudletStatus::Created, "cloudlet #{} arrived twice", self.id);
        self.arrival_index = Some(arrival_index);
        self.status = CloudletStatus::Queued;
    }

    pub(crate) fn assign(&mut self, vm_id: u32) {
        assert_eq!(
            self.status,
            CloudletStatus::Queued,
            "cloudlet #{} can't be reassigned to vm #{}",
            self.id,
            vm_id
        );
        self.vm_id = Some(vm_id);
        self.status = CloudletStatus::Assigned;
    }

    pub(crate) fn start(&mut self, time: f64) {
        assert_eq!(self.status, CloudletStatus::Assigned);
        self.start_time = Some(time);
        self.status = CloudletStatus::Executing;
    }

    pub(crate) fn finish(&mut self, time: f64) {
        assert_eq!(self.status, CloudletStatus::Executing);
        self.finish_time = Some(time);
        self.status = CloudletStatus::Finished;
    }
}
