/// Monitoring engine module - turns stored monitor definitions into
/// recurring HTTP probes
///
/// This module is responsible for:
/// - Running single HTTP probes and classifying the outcome
/// - Keeping one live trigger per enabled monitor
/// - Bootstrapping the registry from the store exactly once
pub mod checker;
pub mod driver;
pub mod init;
pub mod registry;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use checker::{HttpProbe, Probe};
pub use driver::{DueOutcome, DueRun};
pub use init::InitError;
pub use scheduler::MonitorScheduler;
pub use types::{FormParams, HttpMethod, MonitorDefinition, RunRecord, TaskStatus};
