//! Background runner — drives the three engine stages on a fixed cadence.
//!
//! One tokio task executes cycles sequentially; cycles never overlap. Each
//! stage is caught independently, so a fault in generation still lets the
//! lifecycle and notification stages run in the same cycle, and no cycle
//! failure ever stops the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use upkeep_core::config::SchedulerConfig;
use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::traits::{NotificationSender, WorkOrderStore};

use crate::engine::ScheduleEngine;
use crate::lifecycle::LifecycleTracker;
use crate::notifier::NotificationScheduler;

/// Minimum allowed check interval; guards against a misconfigured
/// sub-second loop hammering the store.
pub const MIN_CHECK_INTERVAL_SECS: u64 = 60;

/// Owns the scheduler loop task and its cancellation signal.
pub struct BackgroundRunner {
    engine: ScheduleEngine,
    lifecycle: LifecycleTracker,
    notifier: NotificationScheduler,
    check_interval: Duration,
    error_cooldown: Duration,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundRunner {
    pub fn new(
        store: Arc<dyn WorkOrderStore>,
        sender: Arc<dyn NotificationSender>,
        config: &SchedulerConfig,
    ) -> Result<Self> {
        if config.check_interval_secs < MIN_CHECK_INTERVAL_SECS {
            return Err(UpkeepError::Config(format!(
                "Check interval must be at least {MIN_CHECK_INTERVAL_SECS} seconds (got {})",
                config.check_interval_secs
            )));
        }
        Ok(Self {
            engine: ScheduleEngine::new(store.clone()),
            lifecycle: LifecycleTracker::new(store.clone()),
            notifier: NotificationScheduler::new(store, sender, config.upcoming_days),
            check_interval: Duration::from_secs(config.check_interval_secs),
            error_cooldown: Duration::from_secs(config.error_cooldown_secs),
            shutdown: None,
            handle: None,
        })
    }

    /// Start the scheduler loop. No-op if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::info!("Scheduler is already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let engine = self.engine.clone();
        let lifecycle = self.lifecycle.clone();
        let notifier = self.notifier.clone();
        let check_interval = self.check_interval;
        let error_cooldown = self.error_cooldown;

        let handle = tokio::spawn(async move {
            loop {
                let clean = run_cycle(&engine, &lifecycle, &notifier).await;
                // A failing cycle retries sooner than the normal cadence.
                let sleep = if clean { check_interval } else { error_cooldown };
                tokio::select! {
                    _ = tokio::time::sleep(sleep) => {}
                    _ = rx.changed() => break,
                }
            }
            tracing::info!("⏹️ Maintenance scheduler loop exited");
        });

        self.shutdown = Some(tx);
        self.handle = Some(handle);
        tracing::info!(
            "⏰ Maintenance scheduler started (check every {}s)",
            self.check_interval.as_secs()
        );
    }

    /// Request termination and wait (bounded) for the current cycle to
    /// finish. If it does not finish in time, termination proceeds anyway.
    pub async fn stop(&mut self) {
        tracing::info!("Stopping maintenance scheduler...");
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(Duration::from_secs(10), handle).await {
                Ok(_) => tracing::info!("Maintenance scheduler stopped"),
                Err(_) => tracing::warn!("Scheduler loop did not stop gracefully"),
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run a single cycle immediately, outside the loop. Used by the CLI
    /// `check` command.
    pub async fn run_once(&self) -> bool {
        run_cycle(&self.engine, &self.lifecycle, &self.notifier).await
    }
}

/// One cycle: generation, then lifecycle rescheduling, then notification
/// scanning. The ordering guarantees a work order generated this cycle is
/// never flagged overdue in the same cycle. Returns false if any stage
/// failed outright.
async fn run_cycle(
    engine: &ScheduleEngine,
    lifecycle: &LifecycleTracker,
    notifier: &NotificationScheduler,
) -> bool {
    let today = Utc::now().date_naive();
    let mut clean = true;

    if let Err(e) = engine.run_pass(today).await {
        tracing::error!("⚠️ Generation stage failed: {e}");
        clean = false;
    }
    if let Err(e) = lifecycle.run_pass(today).await {
        tracing::error!("⚠️ Lifecycle stage failed: {e}");
        clean = false;
    }
    if let Err(e) = notifier.run_pass(today).await {
        tracing::error!("⚠️ Notification stage failed: {e}");
        clean = false;
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockSender, MockStore};

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            check_interval_secs: 3600,
            error_cooldown_secs: 60,
            upcoming_days: 1,
        }
    }

    fn runner(store: Arc<MockStore>) -> BackgroundRunner {
        BackgroundRunner::new(store, Arc::new(MockSender::new()), &config()).unwrap()
    }

    #[test]
    fn sub_minute_interval_is_rejected() {
        let bad = SchedulerConfig {
            check_interval_secs: 5,
            ..config()
        };
        let err = BackgroundRunner::new(
            Arc::new(MockStore::new()),
            Arc::new(MockSender::new()),
            &bad,
        )
        .err()
        .unwrap();
        assert!(matches!(err, UpkeepError::Config(_)));
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_terminates() {
        let store = Arc::new(MockStore::new());
        let mut runner = runner(store.clone());
        assert!(!runner.is_running());

        runner.start();
        assert!(runner.is_running());
        runner.start(); // no-op

        // The first cycle runs immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.calls().contains(&"due_templates"));

        runner.stop().await;
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn failing_stage_does_not_skip_later_stages() {
        let store = Arc::new(MockStore::new());
        store.fail_queries(true);
        let runner = runner(store.clone());

        let clean = runner.run_once().await;
        assert!(!clean);

        // All three stages were attempted despite every one of them failing.
        let calls = store.calls();
        assert!(calls.contains(&"due_templates"));
        assert!(calls.contains(&"completed_unrescheduled"));
        assert!(calls.contains(&"work_orders_due_on"));
    }

    #[tokio::test]
    async fn loop_survives_failing_cycles() {
        let store = Arc::new(MockStore::new());
        store.fail_queries(true);
        let mut runner = runner(store.clone());

        runner.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(runner.is_running());
        runner.stop().await;
    }
}
