//! Collaborator interfaces the scheduler consumes but does not implement.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::recurrence::RecurrenceRule;
use crate::types::{
    NewWorkOrder, NotificationKind, NotificationMessage, WorkOrderInstance, WorkOrderTemplate,
};

/// Persistence of work order templates and instances. The store is the
/// single source of truth; each operation is atomic at the row level and no
/// cross-row transactions are assumed.
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    /// Every template whose rule is due as of the given date.
    async fn due_templates(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderTemplate>>;

    /// Insert a new work order. Fails with `Generation` when the store
    /// rejects the row (e.g. a dangling equipment or craftsman reference).
    async fn create_work_order(&self, order: &NewWorkOrder) -> Result<i64>;

    /// Record that a schedule produced an instance on the given date.
    async fn update_last_generated(&self, schedule_id: i64, date: NaiveDate) -> Result<()>;

    /// Completed, schedule-linked work orders whose successor has not been
    /// generated yet and whose schedule has not ended.
    async fn completed_unrescheduled(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<(WorkOrderInstance, RecurrenceRule)>>;

    /// Flag a completed work order so it is never reprocessed.
    async fn mark_rescheduled(&self, work_order_id: i64) -> Result<()>;

    /// Work orders due exactly on the given date.
    async fn work_orders_due_on(&self, date: NaiveDate) -> Result<Vec<WorkOrderInstance>>;

    /// Work orders whose due date has passed.
    async fn overdue_work_orders(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderInstance>>;

    /// Set the dedup state for the given notification kind.
    async fn mark_notified(
        &self,
        work_order_id: i64,
        kind: NotificationKind,
        on: NaiveDate,
    ) -> Result<()>;

    /// Email address of a craftsman, if one is on file.
    async fn craftsman_email(&self, craftsman_id: i64) -> Result<Option<String>>;

    /// Email addresses of every member of a team.
    async fn team_emails(&self, team_id: i64) -> Result<Vec<String>>;
}

/// Delivers notifications and keeps an audit trail of every attempt
/// (pending before the send, sent/failed after).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver one message. The implementation records the attempt before
    /// touching the network.
    async fn send(&self, message: &NotificationMessage) -> Result<()>;

    /// Operator-triggered resend of one specific failed record. Failed
    /// records are never retried automatically.
    async fn retry(&self, notification_id: i64) -> Result<()>;
}
