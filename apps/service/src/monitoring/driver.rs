use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scheduler::MonitorScheduler;
use super::types::{MonitorDefinition, RunRecord, TaskStatus};

/// What one pass of the tick driver did for a monitor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueRun {
    pub config_id: String,
    #[serde(flatten)]
    pub outcome: DueOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DueOutcome {
    Executed { record: RunRecord },
    #[serde(rename_all = "camelCase")]
    Skipped { next_run_at: DateTime<Utc> },
    /// A run was already in flight
    Busy,
}

impl MonitorScheduler {
    /// Run every enabled monitor whose next run time has passed.
    ///
    /// Meant for deployments without a long-lived process, where something
    /// external calls this periodically. Monitors not yet registered are
    /// registered and treated as due.
    pub async fn run_due_monitors(&self) -> Result<Vec<DueRun>> {
        let monitors = self
            .inner
            .database
            .list_enabled_monitors()
            .await
            .context("failed to list enabled monitors")?;

        let mut runs = Vec::with_capacity(monitors.len());
        for monitor in monitors {
            let status = self.ensure_scheduled(&monitor).await;

            let outcome = if status.is_due(Utc::now()) {
                match self.execute_monitor(&monitor).await {
                    Some(record) => DueOutcome::Executed { record },
                    None => DueOutcome::Busy,
                }
            } else {
                tracing::debug!(
                    monitor = %monitor.id,
                    next_run_at = %status.next_run_at,
                    "Monitor not due yet"
                );
                DueOutcome::Skipped { next_run_at: status.next_run_at }
            };

            runs.push(DueRun { config_id: monitor.id, outcome });
        }

        let executed = runs.iter().filter(|r| matches!(r.outcome, DueOutcome::Executed { .. })).count();
        tracing::info!(checked = runs.len(), executed, "Due monitor pass complete");
        Ok(runs)
    }

    /// Register the monitor unless an equivalent definition is already
    /// registered, keeping existing bookkeeping intact.
    async fn ensure_scheduled(&self, monitor: &MonitorDefinition) -> TaskStatus {
        let mut registry = self.inner.registry.write().await;
        if let Some(task) = registry.get(&monitor.id).filter(|task| task.definition().same_schedule(monitor)) {
            return task.status();
        }

        self.schedule_locked(&mut registry, monitor);
        let now = Utc::now();
        match registry.get_mut(&monitor.id) {
            Some(task) => {
                task.next_run_at = now;
                task.status()
            }
            None => TaskStatus { last_run_at: None, next_run_at: now },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::database::{Database, MemoryDatabase};
    use crate::monitoring::testing::ScriptedProbe;
    use crate::monitoring::types::HttpMethod;

    fn setup() -> (MonitorScheduler, Arc<MemoryDatabase>, Arc<ScriptedProbe>, MonitorDefinition) {
        let def = MonitorDefinition::new("api", "https://example.test/a", HttpMethod::Get, 10_000);
        let database = Arc::new(MemoryDatabase::with_monitors([def.clone()]));
        let probe = Arc::new(ScriptedProbe::responding(200));
        (MonitorScheduler::new(probe.clone(), database.clone()), database, probe, def)
    }

    #[tokio::test]
    async fn test_first_pass_runs_then_skips() {
        let (scheduler, database, probe, def) = setup();

        let runs = scheduler.run_due_monitors().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(matches!(&runs[0].outcome, DueOutcome::Executed { record } if record.ok));
        assert_eq!(database.runs().await.len(), 1);

        let runs = scheduler.run_due_monitors().await.unwrap();
        let DueOutcome::Skipped { next_run_at } = &runs[0].outcome else {
            panic!("expected skip, got {:?}", runs[0].outcome);
        };
        let status = scheduler.get_task_status(&def.id).await.unwrap();
        assert_eq!(*next_run_at, status.next_run_at);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_edited_definition_is_rescheduled_and_run() {
        let (scheduler, database, probe, def) = setup();
        scheduler.run_due_monitors().await.unwrap();

        let mut edited = def.clone();
        edited.interval_ms = 60_000;
        database.save_monitor(&edited).await.unwrap();

        let runs = scheduler.run_due_monitors().await.unwrap();
        assert!(matches!(runs[0].outcome, DueOutcome::Executed { .. }));
        assert_eq!(probe.calls(), 2);

        let status = scheduler.get_task_status(&def.id).await.unwrap();
        let last = status.last_run_at.unwrap();
        assert_eq!(status.next_run_at, last + chrono::Duration::milliseconds(60_000));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let (scheduler, database, _probe, _def) = setup();
        database.set_fail_listing(true);
        assert!(scheduler.run_due_monitors().await.is_err());
    }

    #[test]
    fn test_outcome_json_shape() {
        let now = Utc::now();
        let skipped = DueRun { config_id: "m1".into(), outcome: DueOutcome::Skipped { next_run_at: now } };
        let value = serde_json::to_value(&skipped).unwrap();
        assert_eq!(value["configId"], "m1");
        assert_eq!(value["status"], "skipped");
        assert!(value["nextRunAt"].is_string());

        let busy = serde_json::to_value(DueRun { config_id: "m1".into(), outcome: DueOutcome::Busy }).unwrap();
        assert_eq!(busy["status"], "busy");
    }
}
