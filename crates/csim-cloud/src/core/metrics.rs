//! Per-cloudlet metrics and run summary.

use std::io;

use serde::Serialize;

use crate::core::cloudlet::Cloudlet;
use crate::core::error::SimError;

/// Timing and cost of a finished cloudlet.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CloudletMetrics {
    pub cloudlet_id: u64,
    pub vm_id: u32,
    pub length: u64,
    pub arrival_time: f64,
    pub start_time: f64,
    pub finish_time: f64,
    /// `finish - start`
    pub execution_time: f64,
    /// `finish - arrival`
    pub turnaround_time: f64,
    /// `start - arrival`
    pub wait_time: f64,
    /// `execution_time * cost_per_second`
    pub cost: f64,
}

impl CloudletMetrics {
    /// Returns `None` for cloudlets which are not finished.
    pub fn from_cloudlet(cloudlet: &Cloudlet, cost_per_second: f64) -> Option<Self> {
        let vm_id = cloudlet.vm_id()?;
        let start_time = cloudlet.start_time()?;
        let finish_time = cloudlet.finish_time()?;
        let execution_time = finish_time - start_time;
        Some(Self {
            cloudlet_id: cloudlet.id,
            vm_id,
            length: cloudlet.length,
            arrival_time: cloudlet.arrival_time,
            start_time,
            finish_time,
            execution_time,
            turnaround_time: finish_time - cloudlet.arrival_time,
            wait_time: start_time - cloudlet.arrival_time,
            cost: execution_time * cost_per_second,
        })
    }
}

pub fn collect_metrics(cloudlets: &[Cloudlet], cost_per_second: f64) -> Vec<CloudletMetrics> {
    cloudlets
        .iter()
        .filter_map(|cloudlet| CloudletMetrics::from_cloudlet(cloudlet, cost_per_second))
        .collect()
}

/// Aggregated results of a run.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub policy: String,
    pub submitted: usize,
    pub processed: usize,
    pub avg_turnaround_time: f64,
    pub avg_wait_time: f64,
    pub avg_execution_time: f64,
    pub total_cost: f64,
    /// Finish time of the last cloudlet.
    pub makespan: f64,
}

impl RunSummary {
    pub fn new(policy: &str, submitted: usize, metrics: &[CloudletMetrics]) -> Self {
        let processed = metrics.len();
        let avg = |f: fn(&CloudletMetrics) -> f64| {
            if processed == 0 {
                0.
            } else {
                metrics.iter().map(f).sum::<f64>() / processed as f64
            }
        };
        Self {
            policy: policy.to_string(),
            submitted,
            processed,
            avg_turnaround_time: avg(|m| m.turnaround_time),
            avg_wait_time: avg(|m| m.wait_time),
            avg_execution_time: avg(|m| m.execution_time),
            total_cost: metrics.iter().map(|m| m.cost).sum(),
            makespan: metrics.iter().map(|m| m.finish_time).fold(0., f64::max),
        }
    }
}

/// Writes metrics as CSV with a header row.
pub fn write_csv<W: io::Write>(metrics: &[CloudletMetrics], writer: W) -> Result<(), SimError> {
    let mut writer = csv::Writer::from_writer(writer);
    for entry in metrics {
        writer.serialize(entry).map_err(|e| SimError::Io(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn finished(id: u64, arrival: f64, start: f64, finish: f64) -> Cloudlet {
        let mut cloudlet = Cloudlet::new(id, 1000, arrival);
        cloudlet.enqueue(id);
        cloudlet.assign(0);
        cloudlet.start(start);
        cloudlet.finish(finish);
        cloudlet
    }

    #[test]
    fn cloudlet_metrics() {
        let metrics = CloudletMetrics::from_cloudlet(&finished(1, 1., 3., 8.), 0.1).unwrap();
        assert_eq!(metrics.execution_time, 5.);
        assert_eq!(metrics.turnaround_time, 7.);
        assert_eq!(metrics.wait_time, 2.);
        assert_abs_diff_eq!(metrics.cost, 0.5);
        assert_eq!(CloudletMetrics::from_cloudlet(&Cloudlet::new(2, 10, 0.), 0.1), None);
    }

    #[test]
    fn summary() {
        let cloudlets = vec![finished(0, 0., 0., 4.), finished(1, 0., 2., 10.), Cloudlet::new(2, 10, 0.)];
        let metrics = collect_metrics(&cloudlets, 0.5);
        let summary = RunSummary::new("FirstFit", cloudlets.len(), &metrics);
        assert_eq!(summary.submitted, 3);
        assert_eq!(summary.processed, 2);
        assert_abs_diff_eq!(summary.avg_turnaround_time, 7.);
        assert_abs_diff_eq!(summary.avg_wait_time, 1.);
        assert_abs_diff_eq!(summary.total_cost, 6.);
        assert_eq!(summary.makespan, 10.);

        let empty = RunSummary::new("RoundRobin", 0, &[]);
        assert_eq!(empty.avg_turnaround_time, 0.);
        assert_eq!(empty.makespan, 0.);
    }

    #[test]
    fn csv_export() {
        let metrics = collect_metrics(&[finished(4, 0., 1., 2.)], 1.);
        let mut buffer = Vec::new();
        write_csv(&metrics, &mut buffer).unwrap();
        let content = String::from_utf8(buffer).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("cloudlet_id,vm_id,length,arrival_time,start_time,finish_time,execution_time,turnaround_time,wait_time,cost")
        );
        assert_eq!(lines.next(), Some("4,0,1000,0.0,1.0,2.0,1.0,2.0,1.0,1.0"));
    }
}
