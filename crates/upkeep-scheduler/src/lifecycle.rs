//! Lifecycle tracker — spawns the successor of a completed, schedule-linked
//! work order.

use std::sync::Arc;

use chrono::NaiveDate;

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::traits::WorkOrderStore;

use crate::engine::PassStats;

/// Watches for completed scheduled work and creates the next occurrence,
/// marking the original so it is never reprocessed.
#[derive(Clone)]
pub struct LifecycleTracker {
    store: Arc<dyn WorkOrderStore>,
}

impl LifecycleTracker {
    pub fn new(store: Arc<dyn WorkOrderStore>) -> Self {
        Self { store }
    }

    /// One rescheduling pass.
    ///
    /// The `rescheduled` flag on the original is the sole guard against
    /// duplicate successor chains: it is set only after the successor insert
    /// succeeds, and an unmarked original is simply retried next cycle.
    pub async fn run_pass(&self, today: NaiveDate) -> Result<PassStats> {
        let completed = self
            .store
            .completed_unrescheduled(today)
            .await
            .map_err(|e| UpkeepError::StoreUnavailable(format!("completed work orders: {e}")))?;

        let mut stats = PassStats::default();
        for (order, rule) in &completed {
            // Defensive default: a Completed row without a completion date
            // reschedules from today.
            let completion = order.completed_date.unwrap_or(today);
            let next_due = completion + rule.step();

            if let Some(end) = rule.end_date
                && next_due > end
            {
                tracing::info!(
                    "🏁 Work order #{} schedule #{} has ended; no successor created",
                    order.work_order_id,
                    rule.schedule_id
                );
                continue;
            }

            match self.store.create_work_order(&order.follow_up(next_due)).await {
                Ok(new_id) => {
                    tracing::info!(
                        "🔁 Created work order #{new_id} from completed #{} (due {next_due})",
                        order.work_order_id
                    );
                    if let Err(e) = self.store.mark_rescheduled(order.work_order_id).await {
                        // The successor exists but the original is unmarked;
                        // the next pass may create a duplicate.
                        tracing::error!(
                            "⚠️ Failed to mark work order #{} rescheduled: {e}",
                            order.work_order_id
                        );
                        stats.failed += 1;
                    } else {
                        stats.processed += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "⚠️ Failed to create successor for work order #{}: {e}",
                        order.work_order_id
                    );
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}
