//! Models of resource throughput sharing between concurrent activities.
//!
//! A resource (e.g. a VM CPU) with some total throughput executes several activities at once. Each activity has
//! an amount of work (volume) and receives an equal share of the throughput, which changes each time an activity is
//! added or completed. The models compute activity completion times under these conditions.

mod fair;
mod functions;
mod model;


pub use fair::FairThroughputSharingModel;
pub use functions::{make_capped_throughput_fn, make_constant_throughput_fn};
pub use model::{ActivityId, ResourceThroughputFn, ThroughputSharingModel};
