//! Schedule engine — instantiates work orders from due templates, exactly
//! once per due cycle.

use std::sync::Arc;

use chrono::NaiveDate;

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::traits::WorkOrderStore;

/// Outcome of one generation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassStats {
    pub processed: usize,
    pub failed: usize,
}

/// Generates work orders for every template whose recurrence rule is due.
#[derive(Clone)]
pub struct ScheduleEngine {
    store: Arc<dyn WorkOrderStore>,
}

impl ScheduleEngine {
    pub fn new(store: Arc<dyn WorkOrderStore>) -> Self {
        Self { store }
    }

    /// One generation pass as of the given date.
    ///
    /// `last_generated` is only advanced after the instance insert succeeds,
    /// so a transient failure leaves the template due and it is retried on
    /// the next cycle instead of silently skipping an occurrence.
    pub async fn run_pass(&self, as_of: NaiveDate) -> Result<PassStats> {
        let templates = self
            .store
            .due_templates(as_of)
            .await
            .map_err(|e| UpkeepError::StoreUnavailable(format!("due templates: {e}")))?;

        let mut stats = PassStats::default();
        for template in &templates {
            let due_date = template.rule.next_due_date();
            match self.store.create_work_order(&template.instantiate(due_date)).await {
                Ok(work_order_id) => {
                    tracing::info!(
                        "📅 Generated work order #{} from schedule #{} (due {})",
                        work_order_id,
                        template.schedule_id(),
                        due_date
                    );
                    if let Err(e) = self
                        .store
                        .update_last_generated(template.schedule_id(), as_of)
                        .await
                    {
                        // The instance exists but the rule still looks due;
                        // the next cycle may generate a duplicate.
                        tracing::error!(
                            "⚠️ Failed to record generation for schedule #{}: {e}",
                            template.schedule_id()
                        );
                        stats.failed += 1;
                    } else {
                        stats.processed += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "⚠️ Failed to generate work order from schedule #{}: {e}",
                        template.schedule_id()
                    );
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}
