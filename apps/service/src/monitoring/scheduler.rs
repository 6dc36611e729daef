use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::checker::Probe;
use super::init::InitState;
use super::registry::{ScheduledTask, TaskRegistry};
use super::types::{MonitorDefinition, RunRecord, TaskStatus};
use crate::database::Database;

pub(super) struct SchedulerInner {
    pub(super) registry: RwLock<TaskRegistry>,
    pub(super) probe: Arc<dyn Probe>,
    pub(super) database: Arc<dyn Database>,
    pub(super) init: Mutex<InitState>,
    generation: AtomicU64,
}

/// Monitoring scheduler - owns the task registry and drives every monitor's
/// recurring trigger.
///
/// Cloning is cheap and every clone shares the same registry. Triggers only
/// hold a weak reference, so dropping the last handle stops scheduling.
#[derive(Clone)]
pub struct MonitorScheduler {
    pub(super) inner: Arc<SchedulerInner>,
}

impl MonitorScheduler {
    pub fn new(probe: Arc<dyn Probe>, database: Arc<dyn Database>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                registry: RwLock::new(TaskRegistry::new()),
                probe,
                database,
                init: Mutex::new(InitState::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.inner.database
    }

    pub fn probe(&self) -> &Arc<dyn Probe> {
        &self.inner.probe
    }

    /// Register (or re-register) a monitor.
    ///
    /// Any previous trigger for the id is aborted first. Disabled definitions
    /// end up unregistered.
    pub async fn schedule_monitor(&self, definition: &MonitorDefinition) {
        let mut registry = self.inner.registry.write().await;
        self.schedule_locked(&mut registry, definition);
    }

    /// Same as [`schedule_monitor`](Self::schedule_monitor) for callers that
    /// already hold the registry write lock.
    pub(super) fn schedule_locked(&self, registry: &mut TaskRegistry, definition: &MonitorDefinition) {
        if registry.remove(&definition.id).is_some() {
            tracing::debug!(monitor = %definition.id, "Replaced existing schedule");
        }

        if !definition.enabled {
            tracing::info!(monitor = %definition.id, "Monitor disabled, not scheduling");
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let period = definition.effective_interval();
        let trigger = spawn_trigger(Arc::downgrade(&self.inner), definition.clone(), period);
        let task = ScheduledTask::new(definition.clone(), trigger, generation, Utc::now());

        tracing::info!(
            monitor = %definition.id,
            name = %definition.name,
            interval_ms = task.interval_ms(),
            next_run_at = %task.next_run_at,
            "Monitor scheduled"
        );
        registry.put(definition.id.clone(), task);
    }

    /// Unregister one monitor. Returns whether it was registered.
    pub async fn stop_monitor(&self, monitor_id: &str) -> bool {
        let removed = self.inner.registry.write().await.remove(monitor_id);
        if removed.is_some() {
            tracing::info!(monitor = %monitor_id, "Monitor stopped");
        }
        removed.is_some()
    }

    /// Unregister every monitor. Returns how many were stopped.
    pub async fn stop_all_monitors(&self) -> usize {
        let stopped = self.inner.registry.write().await.drain().len();
        tracing::info!(stopped, "All monitors stopped");
        stopped
    }

    /// Run one probe for a registered monitor and record the outcome.
    ///
    /// Returns `None` without probing when the monitor is not registered or
    /// a run is already in flight for it.
    pub async fn execute_monitor(&self, definition: &MonitorDefinition) -> Option<RunRecord> {
        let generation = {
            let mut registry = self.inner.registry.write().await;
            let Some(task) = registry.get_mut(&definition.id) else {
                tracing::debug!(monitor = %definition.id, "Monitor not registered, skipping run");
                return None;
            };
            if task.is_running {
                tracing::debug!(monitor = %definition.id, "Previous run still in flight, skipping");
                return None;
            }
            task.is_running = true;
            task.generation()
        };

        let record = self.inner.probe.run(definition).await;

        if record.ok {
            tracing::info!(
                monitor = %definition.id,
                status = ?record.http_status,
                duration_ms = record.duration_ms,
                "Monitor run succeeded"
            );
        } else {
            tracing::warn!(
                monitor = %definition.id,
                status = ?record.http_status,
                error = ?record.error_message,
                duration_ms = record.duration_ms,
                "Monitor run failed"
            );
        }

        if let Err(e) = self.inner.database.append_run_record(&record).await {
            tracing::error!(monitor = %definition.id, "Failed to store run record: {:#}", e);
        }

        let mut registry = self.inner.registry.write().await;
        match registry.get_mut(&definition.id) {
            Some(task) if task.generation() == generation => task.record_completion(Utc::now()),
            _ => tracing::debug!(monitor = %definition.id, "Registration changed during run"),
        }

        Some(record)
    }

    pub async fn get_task_status(&self, monitor_id: &str) -> Option<TaskStatus> {
        self.inner.registry.read().await.get(monitor_id).map(ScheduledTask::status)
    }

    pub async fn get_all_task_status(&self) -> HashMap<String, TaskStatus> {
        let registry = self.inner.registry.read().await;
        registry.all().map(|(id, task)| (id.to_string(), task.status())).collect()
    }

    pub async fn get_running_tasks_count(&self) -> usize {
        self.inner.registry.read().await.running_count()
    }

    /// Number of registered monitors
    pub async fn task_count(&self) -> usize {
        self.inner.registry.read().await.len()
    }

    pub async fn is_monitor_running(&self, monitor_id: &str) -> bool {
        self.inner.registry.read().await.get(monitor_id).is_some_and(|task| task.is_running)
    }
}

/// Fire every `period`, first tick one period from now. Each tick hands the
/// run to its own task so aborting the trigger never cancels a probe.
fn spawn_trigger(
    inner: Weak<SchedulerInner>,
    definition: MonitorDefinition,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let Some(inner) = inner.upgrade() else {
                break;
            };
            let scheduler = MonitorScheduler { inner };
            let definition = definition.clone();
            tokio::spawn(async move {
                scheduler.execute_monitor(&definition).await;
            });
        }
    })
}
