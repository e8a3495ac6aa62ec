#![warn(missing_docs)]
//! Resource models used by the cluster simulation.

pub mod throughput_sharing;
