use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;

use super::types::{MonitorDefinition, TaskStatus};

/// Live scheduling state of one registered monitor.
///
/// Owns the trigger task; dropping the entry aborts the trigger, so an entry
/// leaving the registry can never leave a timer behind.
#[derive(Debug)]
pub struct ScheduledTask {
    definition: MonitorDefinition,
    trigger: JoinHandle<()>,
    generation: u64,
    interval_ms: u64,
    pub is_running: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(
        definition: MonitorDefinition,
        trigger: JoinHandle<()>,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let interval_ms = definition.effective_interval_ms();
        Self {
            definition,
            trigger,
            generation,
            interval_ms,
            is_running: false,
            last_run_at: None,
            next_run_at: advance(now, interval_ms),
        }
    }

    /// Copy of the definition this task was registered with
    pub fn definition(&self) -> &MonitorDefinition {
        &self.definition
    }

    /// Identifies the registration; a replaced monitor gets a new generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Effective cadence in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus { last_run_at: self.last_run_at, next_run_at: self.next_run_at }
    }

    /// Bookkeeping after an execution attempt, successful or not
    pub fn record_completion(&mut self, now: DateTime<Utc>) {
        self.is_running = false;
        self.last_run_at = Some(now);
        self.next_run_at = advance(now, self.interval_ms);
    }
}

/// `now + interval_ms`, saturating at the latest representable time
fn advance(now: DateTime<Utc>, interval_ms: u64) -> DateTime<Utc> {
    i64::try_from(interval_ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.trigger.abort();
    }
}

/// In-memory map of monitor id to scheduling state.
///
/// Not persisted; rebuilt from the store on every initialization. Iteration
/// order is unspecified.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, ScheduledTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ScheduledTask> {
        self.tasks.get_mut(id)
    }

    /// Insert a task, returning the one it displaced
    pub fn put(&mut self, id: String, task: ScheduledTask) -> Option<ScheduledTask> {
        self.tasks.insert(id, task)
    }

    pub fn remove(&mut self, id: &str) -> Option<ScheduledTask> {
        self.tasks.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn all(&self) -> impl Iterator<Item = (&str, &ScheduledTask)> {
        self.tasks.iter().map(|(id, task)| (id.as_str(), task))
    }

    pub fn running_count(&self) -> usize {
        self.tasks.values().filter(|task| task.is_running).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Take every task out of the registry; triggers abort as the tasks drop.
    pub fn drain(&mut self) -> Vec<ScheduledTask> {
        self.tasks.drain().map(|(_, task)| task).collect()
    }
}
