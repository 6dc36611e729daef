use std::sync::Arc;

use anyhow::Context;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::scheduler::MonitorScheduler;

type InitFuture = Shared<BoxFuture<'static, Result<(), InitError>>>;

/// Cloneable so every caller awaiting the same load receives the failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("scheduler initialization failed: {0:#}")]
pub struct InitError(Arc<anyhow::Error>);

impl From<anyhow::Error> for InitError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

/// Bootstrap state. `epoch` changes on every reset so a load started
/// before the reset cannot mark the scheduler initialized.
#[derive(Default)]
pub(super) struct InitState {
    initialized: bool,
    in_flight: Option<InitFuture>,
    epoch: u64,
}

impl MonitorScheduler {
    /// Load every enabled monitor from the store and schedule it.
    ///
    /// Returns immediately once initialized. Concurrent callers share one
    /// load and all observe its result; after a failure the next call
    /// starts a fresh load.
    pub async fn initialize_scheduler(&self) -> Result<(), InitError> {
        let load = {
            let mut state = self.inner.init.lock().await;
            if state.initialized {
                return Ok(());
            }

            match &state.in_flight {
                Some(load) => load.clone(),
                None => {
                    let scheduler = self.clone();
                    let epoch = state.epoch;
                    let load = async move { scheduler.finish_load(epoch).await }.boxed().shared();
                    state.in_flight = Some(load.clone());
                    load
                }
            }
        };

        load.await
    }

    async fn finish_load(self, epoch: u64) -> Result<(), InitError> {
        let result = self.load_enabled_monitors().await;

        let mut state = self.inner.init.lock().await;
        if state.epoch == epoch {
            state.in_flight = None;
            state.initialized = result.is_ok();
        } else {
            tracing::debug!("Initialization finished after a reset, state left untouched");
        }

        match result {
            Ok(count) => {
                tracing::info!(monitors = count, "Scheduler initialized");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Scheduler initialization failed: {:#}", e);
                Err(e.into())
            }
        }
    }

    async fn load_enabled_monitors(&self) -> anyhow::Result<usize> {
        self.stop_all_monitors().await;

        let monitors = self
            .inner
            .database
            .list_enabled_monitors()
            .await
            .context("failed to list enabled monitors")?;

        let mut registry = self.inner.registry.write().await;
        for monitor in &monitors {
            self.schedule_locked(&mut registry, monitor);
        }
        Ok(monitors.len())
    }

    /// Forget the initialized flag and any in-flight load
    pub async fn reset_initialization(&self) {
        let mut state = self.inner.init.lock().await;
        state.initialized = false;
        state.in_flight = None;
        state.epoch += 1;
        tracing::info!("Scheduler initialization reset");
    }

    pub async fn is_scheduler_initialized(&self) -> bool {
        self.inner.init.lock().await.initialized
    }

    /// Drop every registration and load the store again
    pub async fn reload(&self) -> Result<(), InitError> {
        self.stop_all_monitors().await;
        self.reset_initialization().await;
        self.initialize_scheduler().await
    }
}
