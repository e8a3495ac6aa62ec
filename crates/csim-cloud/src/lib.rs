//! Simulation of task scheduling on a cluster of hosts carved into virtual machines.
//!
//! Cloudlets (tasks) arrive over simulated time and are assigned to VMs by a broker using a pluggable policy, which
//! can also be delegated to an external decision-making process via [`handshake`].

pub mod core;
pub mod experiment;
pub mod extensions;
pub mod handshake;
pub mod simulation;
