//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::recurrence::{RecurrenceRule, RecurrenceUnit};
use upkeep_core::traits::{NotificationSender, WorkOrderStore};
use upkeep_core::types::{
    Assignment, NewWorkOrder, NotificationKind, NotificationMessage, Priority, WorkOrderInstance,
    WorkOrderStatus, WorkOrderTemplate,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A template recurring every `every_days` days, active from 2024-01-01.
pub fn recurring_template(schedule_id: i64, every_days: u32) -> WorkOrderTemplate {
    WorkOrderTemplate {
        template_id: schedule_id,
        title: "Inspect conveyor".into(),
        description: "Check belt tension and rollers".into(),
        equipment_id: 42,
        assignment: Assignment::Craftsman(7),
        priority: Priority::Medium,
        estimated_hours: 2.0,
        tools_required: vec!["Torque wrench".into()],
        spares_required: vec![],
        rule: RecurrenceRule {
            schedule_id,
            interval: every_days,
            unit: RecurrenceUnit::Days,
            start_date: date(2024, 1, 1),
            end_date: None,
            last_generated: None,
        },
    }
}

/// An open work order assigned to craftsman #7.
pub fn open_order(id: i64, schedule_id: Option<i64>, due: NaiveDate) -> WorkOrderInstance {
    WorkOrderInstance {
        work_order_id: id,
        title: "Inspect conveyor".into(),
        description: "Check belt tension and rollers".into(),
        equipment_id: 42,
        assignment: Assignment::Craftsman(7),
        priority: Priority::Medium,
        estimated_hours: 2.0,
        tools_required: vec![],
        spares_required: vec![],
        status: WorkOrderStatus::Open,
        due_date: due,
        completed_date: None,
        schedule_id,
        rescheduled: false,
        notification_sent: false,
        due_today_notified_on: None,
        last_overdue_notice_on: None,
        notes: String::new(),
    }
}

#[derive(Default)]
struct MockState {
    templates: Vec<WorkOrderTemplate>,
    orders: Vec<WorkOrderInstance>,
    craftsman_emails: HashMap<i64, String>,
    team_emails: HashMap<i64, Vec<String>>,
    fail_creates: bool,
    fail_queries: bool,
    calls: Vec<&'static str>,
}

/// In-memory `WorkOrderStore` with switchable failure modes.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<MockState>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_template(&self, template: WorkOrderTemplate) {
        self.state.lock().unwrap().templates.push(template);
    }

    pub fn push_order(&self, order: WorkOrderInstance) {
        self.state.lock().unwrap().orders.push(order);
    }

    pub fn set_craftsman_email(&self, id: i64, email: &str) {
        self.state
            .lock()
            .unwrap()
            .craftsman_emails
            .insert(id, email.into());
    }

    pub fn set_team_emails(&self, id: i64, emails: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .team_emails
            .insert(id, emails.iter().map(|s| s.to_string()).collect());
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_queries = fail;
    }

    pub fn orders(&self) -> Vec<WorkOrderInstance> {
        self.state.lock().unwrap().orders.clone()
    }

    pub fn rule(&self, schedule_id: i64) -> RecurrenceRule {
        self.state
            .lock()
            .unwrap()
            .templates
            .iter()
            .find(|t| t.schedule_id() == schedule_id)
            .map(|t| t.rule.clone())
            .unwrap()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn check_query(state: &mut MockState, call: &'static str) -> Result<()> {
        state.calls.push(call);
        if state.fail_queries {
            Err(UpkeepError::Store(format!("{call}: connection refused")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorkOrderStore for MockStore {
    async fn due_templates(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderTemplate>> {
        let mut state = self.state.lock().unwrap();
        Self::check_query(&mut state, "due_templates")?;
        Ok(state
            .templates
            .iter()
            .filter(|t| t.rule.is_due(as_of))
            .cloned()
            .collect())
    }

    async fn create_work_order(&self, order: &NewWorkOrder) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(UpkeepError::Generation("foreign key violation".into()));
        }
        let id = state
            .orders
            .iter()
            .map(|o| o.work_order_id)
            .max()
            .unwrap_or(0)
            + 1;
        state.orders.push(WorkOrderInstance {
            work_order_id: id,
            title: order.title.clone(),
            description: order.description.clone(),
            equipment_id: order.equipment_id,
            assignment: order.assignment,
            priority: order.priority,
            estimated_hours: order.estimated_hours,
            tools_required: order.tools_required.clone(),
            spares_required: order.spares_required.clone(),
            status: WorkOrderStatus::Open,
            due_date: order.due_date,
            completed_date: None,
            schedule_id: order.schedule_id,
            rescheduled: false,
            notification_sent: false,
            due_today_notified_on: None,
            last_overdue_notice_on: None,
            notes: order.notes.clone(),
        });
        Ok(id)
    }

    async fn update_last_generated(&self, schedule_id: i64, on: NaiveDate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for template in &mut state.templates {
            if template.schedule_id() == schedule_id {
                template.rule.last_generated = Some(on);
            }
        }
        Ok(())
    }

    async fn completed_unrescheduled(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<(WorkOrderInstance, RecurrenceRule)>> {
        let mut state = self.state.lock().unwrap();
        Self::check_query(&mut state, "completed_unrescheduled")?;
        let mut out = Vec::new();
        for order in &state.orders {
            if order.status != WorkOrderStatus::Completed || order.rescheduled {
                continue;
            }
            let Some(schedule_id) = order.schedule_id else {
                continue;
            };
            let Some(rule) = state
                .templates
                .iter()
                .find(|t| t.schedule_id() == schedule_id)
                .map(|t| t.rule.clone())
            else {
                continue;
            };
            if rule.end_date.is_some_and(|end| end < as_of) {
                continue;
            }
            out.push((order.clone(), rule));
        }
        Ok(out)
    }

    async fn mark_rescheduled(&self, work_order_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for order in &mut state.orders {
            if order.work_order_id == work_order_id {
                order.rescheduled = true;
            }
        }
        Ok(())
    }

    async fn work_orders_due_on(&self, on: NaiveDate) -> Result<Vec<WorkOrderInstance>> {
        let mut state = self.state.lock().unwrap();
        Self::check_query(&mut state, "work_orders_due_on")?;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.due_date == on)
            .cloned()
            .collect())
    }

    async fn overdue_work_orders(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderInstance>> {
        let mut state = self.state.lock().unwrap();
        Self::check_query(&mut state, "overdue_work_orders")?;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.due_date < as_of)
            .cloned()
            .collect())
    }

    async fn mark_notified(
        &self,
        work_order_id: i64,
        kind: NotificationKind,
        on: NaiveDate,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for order in &mut state.orders {
            if order.work_order_id == work_order_id {
                match kind {
                    NotificationKind::Upcoming => order.notification_sent = true,
                    NotificationKind::DueToday => order.due_today_notified_on = Some(on),
                    NotificationKind::Overdue => order.last_overdue_notice_on = Some(on),
                }
            }
        }
        Ok(())
    }

    async fn craftsman_email(&self, craftsman_id: i64) -> Result<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .craftsman_emails
            .get(&craftsman_id)
            .cloned())
    }

    async fn team_emails(&self, team_id: i64) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .team_emails
            .get(&team_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// In-memory `NotificationSender` that records everything it delivers.
#[derive(Default)]
pub struct MockSender {
    sent: Mutex<Vec<NotificationMessage>>,
    failing: AtomicBool,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockSender {
    async fn send(&self, message: &NotificationMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpkeepError::Notification("smtp unreachable".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn retry(&self, _notification_id: i64) -> Result<()> {
        Ok(())
    }
}
