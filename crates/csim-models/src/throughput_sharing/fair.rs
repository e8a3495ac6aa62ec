//! Fair throughput sharing model which recalculates the remaining work of all activities
//! each time the number of activities changes.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use csim_core::SimulationContext;

use super::functions::make_constant_throughput_fn;
use super::model::{ActivityId, ResourceThroughputFn, ThroughputSharingModel};

struct Activity<T> {
    remaining_volume: f64,
    id: ActivityId,
    item: T,
}

impl<T> Activity<T> {
    fn new(remaining_volume: f64, id: ActivityId, item: T) -> Self {
        Self {
            remaining_volume,
            id,
            item,
        }
    }
}

impl<T> PartialOrd for Activity<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Activity<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .remaining_volume
            .total_cmp(&self.remaining_volume)
            .then(other.id.cmp(&self.id))
    }
}

impl<T> PartialEq for Activity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.remaining_volume == other.remaining_volume && self.id == other.id
    }
}

impl<T> Eq for Activity<T> {}

/// Fair throughput sharing model: `n` concurrent activities each get `throughput(n) / n`.
///
/// Each insertion or completion re-derives the remaining work of every activity from the work processed since the
/// previous change, so completion times always reflect the current share.
pub struct FairThroughputSharingModel<T> {
    throughput_function: ResourceThroughputFn,
    entries: BinaryHeap<Activity<T>>,
    next_id: ActivityId,
    throughput_per_activity: f64,
    last_recalculation_time: f64,
}

impl<T> FairThroughputSharingModel<T> {
    /// Creates model with fixed throughput.
    pub fn with_fixed_throughput(throughput: f64) -> Self {
        Self::with_dynamic_throughput(make_constant_throughput_fn(throughput))
    }

    /// Creates model with dynamic throughput, represented by given closure.
    pub fn with_dynamic_throughput(throughput_function: ResourceThroughputFn) -> Self {
        Self {
            throughput_function,
            entries: BinaryHeap::new(),
            next_id: 0,
            throughput_per_activity: 0.,
            last_recalculation_time: 0.,
        }
    }

    /// Returns the number of running activities.
    pub fn activity_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no running activities.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the throughput currently received by each activity (zero if there are no activities).
    pub fn throughput_per_activity(&self) -> f64 {
        self.throughput_per_activity
    }

    /// Returns the total throughput currently delivered to all activities.
    pub fn total_throughput(&self) -> f64 {
        self.throughput_per_activity * self.entries.len() as f64
    }

    /// Returns the remaining work of each activity at the given time (not earlier than the last change).
    pub fn remaining_volumes(&self, current_time: f64) -> Vec<(ActivityId, &T, f64)> {
        let processed = (current_time - self.last_recalculation_time) * self.throughput_per_activity;
        self.entries
            .iter()
            .map(|entry| (entry.id, &entry.item, (entry.remaining_volume - processed).max(0.)))
            .collect()
    }

    fn share(&self, count: usize) -> f64 {
        if count == 0 {
            0.
        } else {
            (self.throughput_function)(count) / count as f64
        }
    }

    fn recalculate(&mut self, current_time: f64, throughput_per_activity: f64) {
        let processed_volume = (current_time - self.last_recalculation_time) * self.throughput_per_activity;
        let mut new_entries = BinaryHeap::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop() {
            new_entries.push(Activity::new(
                entry.remaining_volume - processed_volume,
                entry.id,
                entry.item,
            ));
        }
        self.entries = new_entries;
        self.throughput_per_activity = throughput_per_activity;
        self.last_recalculation_time = current_time;
    }
}

impl<T> ThroughputSharingModel<T> for FairThroughputSharingModel<T> {
    fn insert(&mut self, item: T, volume: f64, ctx: &SimulationContext) -> ActivityId {
        let new_count = self.entries.len() + 1;
        let share = self.share(new_count);
        self.recalculate(ctx.time(), share);
        let id = self.next_id;
        self.entries.push(Activity::new(volume, id, item));
        self.next_id += 1;
        id
    }

    fn pop(&mut self) -> Option<(f64, T)> {
        let entry = self.entries.pop()?;
        let complete_time = self.last_recalculation_time + entry.remaining_volume / self.throughput_per_activity;
        let share = self.share(self.entries.len());
        self.recalculate(complete_time, share);
        Some((complete_time, entry.item))
    }

    fn peek(&mut self) -> Option<(f64, &T)> {
        self.entries.peek().map(|entry| {
            (
                self.last_recalculation_time + entry.remaining_volume / self.throughput_per_activity,
                &entry.item,
            )
        })
    }
}
