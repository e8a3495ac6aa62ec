//! Basic resource throughput functions.

use sugars::boxed;

use super::model::ResourceThroughputFn;

/// Creates resource throughput function which always returns the given value.
pub fn make_constant_throughput_fn(throughput: f64) -> ResourceThroughputFn {
    boxed!(move |_| throughput)
}

/// Creates resource throughput function returning `throughput` limited by an optional external cap.
pub fn make_capped_throughput_fn(throughput: f64, cap: Option<f64>) -> ResourceThroughputFn {
    let limited = cap.map_or(throughput, |cap| throughput.min(cap));
    make_constant_throughput_fn(limited)
}
