//! Definition of the throughput sharing model trait.

use csim_core::SimulationContext;

/// Identifier of activity inside a model.
pub type ActivityId = u64;

/// Function describing the total resource throughput depending on the number of concurrent activities.
pub type ResourceThroughputFn = Box<dyn Fn(usize) -> f64>;

/// Trait for throughput sharing model.
pub trait ThroughputSharingModel<T> {
    /// Adds new activity with the amount of work `volume` starting at the current simulation time.
    fn insert(&mut self, item: T, volume: f64, ctx: &SimulationContext) -> ActivityId;
    /// Returns the next activity completion time (if any) along with corresponding activity item.
    ///
    /// The returned activity is removed from the model.
    fn pop(&mut self) -> Option<(f64, T)>;
    /// Returns the next activity completion time (if any) along with corresponding activity item.
    ///
    /// In contrast to `pop`, the returned activity is not removed from the model.
    fn peek(&mut self) -> Option<(f64, &T)>;
}
