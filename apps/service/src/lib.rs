//! Pingkeeper monitor scheduling engine.
//!
//! Turns persisted HTTP monitor definitions into independently-timed
//! recurring probes, records every run, and exposes the scheduler state to
//! the HTTP API and the standalone daemon.

pub mod config;
pub mod database;
pub mod monitoring;
pub mod pool;
pub mod validation;

pub use database::{Database, DatabaseImpl, MemoryDatabase};
pub use monitoring::{MonitorDefinition, MonitorScheduler, RunRecord};
