#![forbid(unsafe_code)]

//! `interplex` — master-node coordination layer for distributed
//! interactive-processing pipelines.
//!
//! A master node accepts logical sessions, each describing a pipeline of
//! processing modules wired together by I/O mappings over named topics,
//! and distributes module execution across itself and remote worker
//! nodes. Lockstep-mode modules advance in synchronized passes gated on
//! every participating node's reply; peer reachability is tracked by a
//! heartbeat-driven liveness monitor.

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod runtime;
pub mod topics;
pub mod transport;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
