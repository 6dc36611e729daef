use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::StoredRunRecord;
use super::repository::Database;
use crate::monitoring::types::{MonitorDefinition, RunRecord};

/// In-process store; nothing survives a restart.
///
/// Monitors are kept in insertion order, which doubles as creation order.
/// Listing and appending can be made to fail for exercising error paths.
#[derive(Default)]
pub struct MemoryDatabase {
    monitors: RwLock<Vec<MonitorDefinition>>,
    runs: RwLock<Vec<StoredRunRecord>>,
    listing_delay: Option<Duration>,
    fail_listing: AtomicBool,
    fail_appends: AtomicBool,
    list_calls: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given monitors
    pub fn with_monitors(monitors: impl IntoIterator<Item = MonitorDefinition>) -> Self {
        Self { monitors: RwLock::new(monitors.into_iter().collect()), ..Self::default() }
    }

    /// Make every enabled-monitor listing take at least `delay`
    pub fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = Some(delay);
        self
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// How many times enabled monitors were listed
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Every stored run, oldest first
    pub async fn runs(&self) -> Vec<RunRecord> {
        self.runs.read().await.iter().map(|stored| stored.record.clone()).collect()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_enabled_monitors(&self) -> Result<Vec<MonitorDefinition>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            bail!("monitor store unavailable");
        }

        Ok(self.monitors.read().await.iter().filter(|m| m.enabled).cloned().collect())
    }

    async fn list_monitors(&self) -> Result<Vec<MonitorDefinition>> {
        Ok(self.monitors.read().await.clone())
    }

    async fn get_monitor(&self, id: &str) -> Result<Option<MonitorDefinition>> {
        Ok(self.monitors.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn save_monitor(&self, monitor: &MonitorDefinition) -> Result<()> {
        let mut monitors = self.monitors.write().await;
        match monitors.iter_mut().find(|m| m.id == monitor.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = monitor.clone();
                existing.created_at = created_at;
            }
            None => monitors.push(monitor.clone()),
        }
        Ok(())
    }

    async fn delete_monitor(&self, id: &str) -> Result<bool> {
        self.runs.write().await.retain(|stored| stored.record.monitor_id != id);
        let mut monitors = self.monitors.write().await;
        let before = monitors.len();
        monitors.retain(|m| m.id != id);
        Ok(monitors.len() < before)
    }

    async fn append_run_record(&self, record: &RunRecord) -> Result<i64> {
        if self.fail_appends.load(Ordering::SeqCst) {
            bail!("run log store unavailable");
        }

        let mut runs = self.runs.write().await;
        let log_id = runs.len() as i64 + 1;
        runs.push(StoredRunRecord { log_id, record: record.clone() });
        Ok(log_id)
    }

    async fn recent_runs(&self, monitor_id: Option<&str>, limit: usize) -> Result<Vec<StoredRunRecord>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<StoredRunRecord> = runs
            .iter()
            .filter(|stored| monitor_id.is_none_or(|id| stored.record.monitor_id == id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.record.started_at.cmp(&a.record.started_at).then(b.log_id.cmp(&a.log_id))
        });
        matching.truncate(limit);
        Ok(matching)
    }
}
