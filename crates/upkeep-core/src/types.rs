//! Work order data model — templates, instances, and notification records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceRule;

/// Work order priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            "Critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

/// Who the work is assigned to — exactly one craftsman or one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Craftsman(i64),
    Team(i64),
}

impl Assignment {
    /// Assignment type label as stored ("Individual" / "Team").
    pub fn type_str(&self) -> &'static str {
        match self {
            Assignment::Craftsman(_) => "Individual",
            Assignment::Team(_) => "Team",
        }
    }

    pub fn craftsman_id(&self) -> Option<i64> {
        match self {
            Assignment::Craftsman(id) => Some(*id),
            Assignment::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<i64> {
        match self {
            Assignment::Craftsman(_) => None,
            Assignment::Team(id) => Some(*id),
        }
    }
}

/// Work order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    Open,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Open => "Open",
            WorkOrderStatus::InProgress => "In Progress",
            WorkOrderStatus::OnHold => "On Hold",
            WorkOrderStatus::Completed => "Completed",
            WorkOrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Open" => Some(WorkOrderStatus::Open),
            "In Progress" => Some(WorkOrderStatus::InProgress),
            "On Hold" => Some(WorkOrderStatus::OnHold),
            "Completed" => Some(WorkOrderStatus::Completed),
            "Cancelled" => Some(WorkOrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether the work order still needs attention (neither completed nor
    /// cancelled). Notifications only ever target active work orders.
    pub fn is_active(&self) -> bool {
        !matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }
}

/// Reusable descriptor for a recurring work order, paired 1:1 with its
/// recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderTemplate {
    pub template_id: i64,
    pub title: String,
    pub description: String,
    pub equipment_id: i64,
    pub assignment: Assignment,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub tools_required: Vec<String>,
    pub spares_required: Vec<String>,
    pub rule: RecurrenceRule,
}

impl WorkOrderTemplate {
    pub fn schedule_id(&self) -> i64 {
        self.rule.schedule_id
    }

    /// Stamp out a new work order due on the given date.
    pub fn instantiate(&self, due_date: NaiveDate) -> NewWorkOrder {
        NewWorkOrder {
            title: self.title.clone(),
            description: self.description.clone(),
            equipment_id: self.equipment_id,
            assignment: self.assignment,
            priority: self.priority,
            estimated_hours: self.estimated_hours,
            tools_required: self.tools_required.clone(),
            spares_required: self.spares_required.clone(),
            due_date,
            notes: format!("Auto-generated from schedule #{}", self.rule.schedule_id),
            schedule_id: Some(self.rule.schedule_id),
        }
    }
}

/// Insert payload for a work order, either stamped from a template or copied
/// from a completed instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub title: String,
    pub description: String,
    pub equipment_id: i64,
    pub assignment: Assignment,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub tools_required: Vec<String>,
    pub spares_required: Vec<String>,
    pub due_date: NaiveDate,
    pub notes: String,
    /// `None` for one-off, manually created work orders.
    pub schedule_id: Option<i64>,
}

/// One concrete, trackable work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderInstance {
    pub work_order_id: i64,
    pub title: String,
    pub description: String,
    pub equipment_id: i64,
    pub assignment: Assignment,
    pub priority: Priority,
    pub estimated_hours: f64,
    pub tools_required: Vec<String>,
    pub spares_required: Vec<String>,
    pub status: WorkOrderStatus,
    pub due_date: NaiveDate,
    /// Set only when status becomes Completed.
    pub completed_date: Option<NaiveDate>,
    pub schedule_id: Option<i64>,
    /// Set once a successor has been generated; the sole guard against
    /// duplicate successor chains.
    pub rescheduled: bool,
    /// Dedup flag for the "upcoming" reminder.
    pub notification_sent: bool,
    /// Date the "due today" notice went out, if any.
    pub due_today_notified_on: Option<NaiveDate>,
    /// Date of the most recent overdue notice; overdue re-escalates at most
    /// once per day.
    pub last_overdue_notice_on: Option<NaiveDate>,
    pub notes: String,
}

impl WorkOrderInstance {
    /// Copy this work order into a successor due on the given date, keeping
    /// the same schedule link.
    pub fn follow_up(&self, next_due: NaiveDate) -> NewWorkOrder {
        NewWorkOrder {
            title: self.title.clone(),
            description: self.description.clone(),
            equipment_id: self.equipment_id,
            assignment: self.assignment,
            priority: self.priority,
            estimated_hours: self.estimated_hours,
            tools_required: self.tools_required.clone(),
            spares_required: self.spares_required.clone(),
            due_date: next_due,
            notes: self.notes.clone(),
            schedule_id: self.schedule_id,
        }
    }
}

/// The three time-relative notification conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Upcoming,
    DueToday,
    Overdue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Upcoming => "upcoming",
            NotificationKind::DueToday => "due_today",
            NotificationKind::Overdue => "overdue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upcoming" => Some(NotificationKind::Upcoming),
            "due_today" => Some(NotificationKind::DueToday),
            "overdue" => Some(NotificationKind::Overdue),
            _ => None,
        }
    }
}

/// A fully composed notification, ready to hand to a sender.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
    pub kind: NotificationKind,
    pub work_order_id: i64,
}

/// Delivery state of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

/// Audit record for one delivery attempt. Created `pending` before the send
/// so the attempt is visible even if the sender crashes mid-flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub notification_id: i64,
    pub recipient: String,
    pub subject: String,
    pub content: String,
    pub status: NotificationStatus,
    pub kind: NotificationKind,
    /// Work order this notification refers to.
    pub reference_id: i64,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{RecurrenceRule, RecurrenceUnit};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            WorkOrderStatus::Open,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::OnHold,
            WorkOrderStatus::Completed,
            WorkOrderStatus::Cancelled,
        ] {
            assert_eq!(WorkOrderStatus::parse(status.as_str()), Some(status));
        }
        assert!(WorkOrderStatus::Open.is_active());
        assert!(WorkOrderStatus::OnHold.is_active());
        assert!(!WorkOrderStatus::Completed.is_active());
        assert!(!WorkOrderStatus::Cancelled.is_active());
    }

    #[test]
    fn assignment_is_exclusive() {
        let individual = Assignment::Craftsman(7);
        assert_eq!(individual.type_str(), "Individual");
        assert_eq!(individual.craftsman_id(), Some(7));
        assert_eq!(individual.team_id(), None);

        let team = Assignment::Team(3);
        assert_eq!(team.type_str(), "Team");
        assert_eq!(team.craftsman_id(), None);
        assert_eq!(team.team_id(), Some(3));
    }

    #[test]
    fn instantiate_copies_template_fields() {
        let template = WorkOrderTemplate {
            template_id: 1,
            title: "Lubricate bearings".into(),
            description: "Grease both drive-end bearings".into(),
            equipment_id: 42,
            assignment: Assignment::Craftsman(7),
            priority: Priority::High,
            estimated_hours: 1.5,
            tools_required: vec!["Grease gun".into()],
            spares_required: vec![],
            rule: RecurrenceRule {
                schedule_id: 9,
                interval: 1,
                unit: RecurrenceUnit::Weeks,
                start_date: date(2024, 1, 1),
                end_date: None,
                last_generated: None,
            },
        };

        let new = template.instantiate(date(2024, 1, 1));
        assert_eq!(new.title, template.title);
        assert_eq!(new.schedule_id, Some(9));
        assert_eq!(new.due_date, date(2024, 1, 1));
        assert_eq!(new.notes, "Auto-generated from schedule #9");
    }

    #[test]
    fn notification_kind_round_trip() {
        for kind in [
            NotificationKind::Upcoming,
            NotificationKind::DueToday,
            NotificationKind::Overdue,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }
}
