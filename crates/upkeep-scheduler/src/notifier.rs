//! Notification scan — detects upcoming, due-today, and overdue work orders
//! and delivers one notification per condition occurrence.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::traits::{NotificationSender, WorkOrderStore};
use upkeep_core::types::{Assignment, NotificationKind, NotificationMessage, WorkOrderInstance};

use crate::templates;

/// Outcome of one notification pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyStats {
    pub upcoming: usize,
    pub due_today: usize,
    pub overdue: usize,
    pub failed: usize,
}

/// Scans active work orders against the three time thresholds and dispatches
/// notifications through the configured sender.
///
/// Dedup state lives on the work order: a boolean for the one-shot upcoming
/// reminder, dated fields for due-today and overdue so overdue re-escalates
/// at most once per calendar day.
#[derive(Clone)]
pub struct NotificationScheduler {
    store: Arc<dyn WorkOrderStore>,
    sender: Arc<dyn NotificationSender>,
    upcoming_days: u32,
}

impl NotificationScheduler {
    pub fn new(
        store: Arc<dyn WorkOrderStore>,
        sender: Arc<dyn NotificationSender>,
        upcoming_days: u32,
    ) -> Self {
        Self {
            store,
            sender,
            upcoming_days,
        }
    }

    /// One notification pass as of the given date.
    pub async fn run_pass(&self, today: NaiveDate) -> Result<NotifyStats> {
        let mut stats = NotifyStats::default();

        let upcoming_date = today + Duration::days(self.upcoming_days as i64);
        let upcoming = self
            .store
            .work_orders_due_on(upcoming_date)
            .await
            .map_err(|e| UpkeepError::StoreUnavailable(format!("upcoming work orders: {e}")))?;
        for order in &upcoming {
            if !order.status.is_active() || order.notification_sent {
                continue;
            }
            match self.notify(order, NotificationKind::Upcoming, today).await {
                true => stats.upcoming += 1,
                false => stats.failed += 1,
            }
        }

        let due_today = self
            .store
            .work_orders_due_on(today)
            .await
            .map_err(|e| UpkeepError::StoreUnavailable(format!("due-today work orders: {e}")))?;
        for order in &due_today {
            if !order.status.is_active() || order.due_today_notified_on == Some(today) {
                continue;
            }
            match self.notify(order, NotificationKind::DueToday, today).await {
                true => stats.due_today += 1,
                false => stats.failed += 1,
            }
        }

        let overdue = self
            .store
            .overdue_work_orders(today)
            .await
            .map_err(|e| UpkeepError::StoreUnavailable(format!("overdue work orders: {e}")))?;
        for order in &overdue {
            if !order.status.is_active() || order.last_overdue_notice_on == Some(today) {
                continue;
            }
            match self.notify(order, NotificationKind::Overdue, today).await {
                true => stats.overdue += 1,
                false => stats.failed += 1,
            }
        }

        tracing::info!(
            "📧 Notification pass: {} upcoming, {} due today, {} overdue, {} failed",
            stats.upcoming,
            stats.due_today,
            stats.overdue,
            stats.failed
        );
        Ok(stats)
    }

    /// Deliver one notification to every resolved recipient. The dedup flag
    /// is set when at least one delivery succeeded, so a partially failed
    /// team fan-out is not re-spammed to the members already reached; a
    /// total failure leaves the flag unset for retry next pass.
    async fn notify(
        &self,
        order: &WorkOrderInstance,
        kind: NotificationKind,
        today: NaiveDate,
    ) -> bool {
        let recipients = match self.recipients(order).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    "⚠️ Recipient lookup failed for work order #{}: {e}",
                    order.work_order_id
                );
                return false;
            }
        };
        if recipients.is_empty() {
            tracing::warn!(
                "⚠️ Work order #{} has no reachable assignee; {} notification skipped",
                order.work_order_id,
                kind.as_str()
            );
            return false;
        }

        let subject = templates::subject(kind, order, self.upcoming_days);
        let html_body = templates::body(kind, order, self.upcoming_days);

        let mut delivered = 0usize;
        for recipient in recipients {
            let message = NotificationMessage {
                recipient: recipient.clone(),
                subject: subject.clone(),
                html_body: html_body.clone(),
                kind,
                work_order_id: order.work_order_id,
            };
            match self.sender.send(&message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(
                        "⚠️ Failed to send {} notification for work order #{} to {recipient}: {e}",
                        kind.as_str(),
                        order.work_order_id
                    );
                }
            }
        }

        if delivered == 0 {
            return false;
        }
        if let Err(e) = self
            .store
            .mark_notified(order.work_order_id, kind, today)
            .await
        {
            tracing::error!(
                "⚠️ Failed to mark work order #{} notified ({}): {e}",
                order.work_order_id,
                kind.as_str()
            );
        }
        true
    }

    /// Resolve the assignee to one or more email addresses.
    async fn recipients(&self, order: &WorkOrderInstance) -> Result<Vec<String>> {
        match order.assignment {
            Assignment::Craftsman(id) => Ok(self
                .store
                .craftsman_email(id)
                .await?
                .into_iter()
                .collect()),
            Assignment::Team(id) => self.store.team_emails(id).await,
        }
    }
}
