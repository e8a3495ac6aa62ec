pub mod broker;
pub mod cloudlet;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod events;
pub mod host;
pub mod metrics;
pub mod monitoring;
pub mod policy;
pub mod vm;
