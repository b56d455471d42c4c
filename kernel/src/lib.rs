// Meridian Kernel
//
// Per-class metadata and sharding state for the cluster metadata store.

pub mod command;
pub mod config;
pub mod log;
pub mod metaclass;
pub mod replay;
pub mod schema;
pub mod sharding;
