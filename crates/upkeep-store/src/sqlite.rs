//! SQLite-backed `WorkOrderStore`.
//!
//! Dates are stored as ISO `YYYY-MM-DD` text, list columns as JSON arrays.
//! Due-ness filtering reuses `RecurrenceRule::is_due` in Rust rather than
//! duplicating the date math in SQL.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::recurrence::{RecurrenceRule, RecurrenceUnit};
use upkeep_core::traits::WorkOrderStore;
use upkeep_core::types::{
    Assignment, NewWorkOrder, NotificationKind, Priority, WorkOrderInstance, WorkOrderStatus,
    WorkOrderTemplate,
};

/// SQLite-backed work order store.
pub struct SqliteWorkOrderStore {
    conn: Mutex<Connection>,
}

impl SqliteWorkOrderStore {
    /// Open or create the work order database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| UpkeepError::Store(format!("DB open: {e}")))?;
        let store = Self::init(conn)?;
        tracing::info!("🗄️  Work order store ready: {}", path.display());
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| UpkeepError::Store(format!("DB open: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| UpkeepError::Store(format!("Pragma: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS craftsmen (
                craftsman_id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT
            );

            CREATE TABLE IF NOT EXISTS teams (
                team_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS team_members (
                team_id INTEGER NOT NULL REFERENCES teams(team_id) ON DELETE CASCADE,
                craftsman_id INTEGER NOT NULL REFERENCES craftsmen(craftsman_id) ON DELETE CASCADE,
                PRIMARY KEY (team_id, craftsman_id)
            );

            CREATE TABLE IF NOT EXISTS maintenance_schedules (
                schedule_id INTEGER PRIMARY KEY AUTOINCREMENT,
                frequency INTEGER NOT NULL,
                frequency_unit TEXT NOT NULL,     -- 'days', 'weeks', 'months'
                start_date TEXT NOT NULL,
                end_date TEXT,
                last_generated TEXT
            );

            CREATE TABLE IF NOT EXISTS work_order_templates (
                template_id INTEGER PRIMARY KEY AUTOINCREMENT,
                schedule_id INTEGER NOT NULL UNIQUE
                    REFERENCES maintenance_schedules(schedule_id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                equipment_id INTEGER NOT NULL,
                assignment_type TEXT NOT NULL,    -- 'Individual' or 'Team'
                craftsman_id INTEGER REFERENCES craftsmen(craftsman_id),
                team_id INTEGER REFERENCES teams(team_id),
                priority TEXT NOT NULL DEFAULT 'Medium',
                estimated_hours REAL NOT NULL DEFAULT 0,
                tools_required TEXT NOT NULL DEFAULT '[]',
                spares_required TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS work_orders (
                work_order_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                equipment_id INTEGER NOT NULL,
                assignment_type TEXT NOT NULL,
                craftsman_id INTEGER REFERENCES craftsmen(craftsman_id),
                team_id INTEGER REFERENCES teams(team_id),
                priority TEXT NOT NULL DEFAULT 'Medium',
                status TEXT NOT NULL DEFAULT 'Open',
                created_date TEXT NOT NULL,
                due_date TEXT NOT NULL,
                completed_date TEXT,
                estimated_hours REAL NOT NULL DEFAULT 0,
                tools_required TEXT NOT NULL DEFAULT '[]',
                spares_required TEXT NOT NULL DEFAULT '[]',
                notes TEXT NOT NULL DEFAULT '',
                schedule_id INTEGER REFERENCES maintenance_schedules(schedule_id),
                rescheduled INTEGER NOT NULL DEFAULT 0,
                notification_sent INTEGER NOT NULL DEFAULT 0,
                due_today_notified_on TEXT,
                last_overdue_notice_on TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_work_orders_due ON work_orders(due_date, status);
            CREATE INDEX IF NOT EXISTS idx_work_orders_schedule ON work_orders(schedule_id);
            ",
        )
        .map_err(|e| UpkeepError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Admin helpers (used by the CLI and tests) ─────────────

    pub fn add_craftsman(&self, first_name: &str, last_name: &str, email: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO craftsmen (first_name, last_name, email) VALUES (?1, ?2, ?3)",
            rusqlite::params![first_name, last_name, email],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_team(&self, name: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute("INSERT INTO teams (name) VALUES (?1)", [name])
            .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_team_member(&self, team_id: i64, craftsman_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO team_members (team_id, craftsman_id) VALUES (?1, ?2)",
            [team_id, craftsman_id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn add_schedule(
        &self,
        interval: u32,
        unit: RecurrenceUnit,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<i64> {
        let rule = RecurrenceRule {
            schedule_id: 0,
            interval,
            unit,
            start_date,
            end_date,
            last_generated: None,
        };
        rule.validate()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO maintenance_schedules (frequency, frequency_unit, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                interval,
                unit.as_str(),
                start_date.to_string(),
                end_date.map(|d| d.to_string()),
            ],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    /// Attach a template to an existing schedule. `template.rule.schedule_id`
    /// names the schedule; the template_id field is ignored on insert.
    pub fn insert_template(&self, template: &WorkOrderTemplate) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO work_order_templates
             (schedule_id, title, description, equipment_id, assignment_type,
              craftsman_id, team_id, priority, estimated_hours, tools_required, spares_required)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                template.schedule_id(),
                template.title,
                template.description,
                template.equipment_id,
                template.assignment.type_str(),
                template.assignment.craftsman_id(),
                template.assignment.team_id(),
                template.priority.as_str(),
                template.estimated_hours,
                to_json(&template.tools_required)?,
                to_json(&template.spares_required)?,
            ],
        )
        .map_err(store_err)?;
        Ok(conn.last_insert_rowid())
    }

    /// Update a work order's status, recording the completion date when the
    /// new status is Completed.
    pub fn set_status(
        &self,
        work_order_id: i64,
        status: WorkOrderStatus,
        completed_date: Option<NaiveDate>,
    ) -> Result<()> {
        let completed = match status {
            WorkOrderStatus::Completed => completed_date.map(|d| d.to_string()),
            _ => None,
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE work_orders SET status = ?1, completed_date = ?2 WHERE work_order_id = ?3",
            rusqlite::params![status.as_str(), completed, work_order_id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    pub fn get_work_order(&self, work_order_id: i64) -> Result<Option<WorkOrderInstance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM work_orders wo WHERE wo.work_order_id = ?1"
            ))
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map([work_order_id], raw_order_from_row)
            .map_err(store_err)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw.map_err(store_err)?.decode()?)),
            None => Ok(None),
        }
    }

    fn query_orders(&self, where_clause: &str, date: NaiveDate) -> Result<Vec<WorkOrderInstance>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM work_orders wo WHERE {where_clause} ORDER BY wo.work_order_id"
            ))
            .map_err(store_err)?;
        let raws: Vec<RawOrder> = stmt
            .query_map([date.to_string()], raw_order_from_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(store_err)?;
        raws.into_iter().map(|raw| raw.decode()).collect()
    }
}

#[async_trait]
impl WorkOrderStore for SqliteWorkOrderStore {
    async fn due_templates(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderTemplate>> {
        let raws: Vec<RawTemplate> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare(
                    "SELECT t.template_id, t.title, t.description, t.equipment_id,
                            t.assignment_type, t.craftsman_id, t.team_id, t.priority,
                            t.estimated_hours, t.tools_required, t.spares_required,
                            s.schedule_id, s.frequency, s.frequency_unit,
                            s.start_date, s.end_date, s.last_generated
                     FROM work_order_templates t
                     JOIN maintenance_schedules s ON t.schedule_id = s.schedule_id
                     ORDER BY s.schedule_id",
                )
                .map_err(store_err)?;
            stmt.query_map([], raw_template_from_row)
                .map_err(store_err)?
                .collect::<rusqlite::Result<_>>()
                .map_err(store_err)?
        };
        let templates: Vec<WorkOrderTemplate> = raws
            .into_iter()
            .map(|raw| raw.decode())
            .collect::<Result<_>>()?;
        Ok(templates
            .into_iter()
            .filter(|t| t.rule.is_due(as_of))
            .collect())
    }

    async fn create_work_order(&self, order: &NewWorkOrder) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO work_orders
             (title, description, equipment_id, assignment_type, craftsman_id, team_id,
              priority, status, created_date, due_date, estimated_hours,
              tools_required, spares_required, notes, schedule_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                order.title,
                order.description,
                order.equipment_id,
                order.assignment.type_str(),
                order.assignment.craftsman_id(),
                order.assignment.team_id(),
                order.priority.as_str(),
                WorkOrderStatus::Open.as_str(),
                chrono::Utc::now().date_naive().to_string(),
                order.due_date.to_string(),
                order.estimated_hours,
                to_json(&order.tools_required)?,
                to_json(&order.spares_required)?,
                order.notes,
                order.schedule_id,
            ],
        )
        .map_err(|e| UpkeepError::Generation(format!("Work order insert: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    async fn update_last_generated(&self, schedule_id: i64, date: NaiveDate) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE maintenance_schedules SET last_generated = ?1 WHERE schedule_id = ?2",
            rusqlite::params![date.to_string(), schedule_id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn completed_unrescheduled(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<(WorkOrderInstance, RecurrenceRule)>> {
        let raws: Vec<(RawOrder, RawRule)> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ORDER_COLUMNS},
                            s.schedule_id, s.frequency, s.frequency_unit,
                            s.start_date, s.end_date, s.last_generated
                     FROM work_orders wo
                     JOIN maintenance_schedules s ON wo.schedule_id = s.schedule_id
                     WHERE wo.status = 'Completed'
                       AND wo.rescheduled = 0
                       AND (s.end_date IS NULL OR s.end_date >= ?1)
                     ORDER BY wo.work_order_id"
                ))
                .map_err(store_err)?;
            stmt.query_map([as_of.to_string()], |row| {
                Ok((raw_order_from_row(row)?, raw_rule_from_row(row, 20)?))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(store_err)?
        };
        raws.into_iter()
            .map(|(order, rule)| Ok((order.decode()?, rule.decode()?)))
            .collect()
    }

    async fn mark_rescheduled(&self, work_order_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE work_orders SET rescheduled = 1 WHERE work_order_id = ?1",
            [work_order_id],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn work_orders_due_on(&self, date: NaiveDate) -> Result<Vec<WorkOrderInstance>> {
        self.query_orders("due_date = ?1", date)
    }

    async fn overdue_work_orders(&self, as_of: NaiveDate) -> Result<Vec<WorkOrderInstance>> {
        self.query_orders("due_date < ?1", as_of)
    }

    async fn mark_notified(
        &self,
        work_order_id: i64,
        kind: NotificationKind,
        on: NaiveDate,
    ) -> Result<()> {
        let sql = match kind {
            NotificationKind::Upcoming => {
                "UPDATE work_orders SET notification_sent = 1 WHERE work_order_id = ?2"
            }
            NotificationKind::DueToday => {
                "UPDATE work_orders SET due_today_notified_on = ?1 WHERE work_order_id = ?2"
            }
            NotificationKind::Overdue => {
                "UPDATE work_orders SET last_overdue_notice_on = ?1 WHERE work_order_id = ?2"
            }
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(sql, rusqlite::params![on.to_string(), work_order_id])
            .map_err(store_err)?;
        Ok(())
    }

    async fn craftsman_email(&self, craftsman_id: i64) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let email: Option<Option<String>> = conn
            .query_row(
                "SELECT email FROM craftsmen WHERE craftsman_id = ?1",
                [craftsman_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(store_err(other)),
            })?;
        Ok(email.flatten().filter(|e| !e.is_empty()))
    }

    async fn team_emails(&self, team_id: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT c.email FROM craftsmen c
                 JOIN team_members tm ON tm.craftsman_id = c.craftsman_id
                 WHERE tm.team_id = ?1 ORDER BY c.craftsman_id",
            )
            .map_err(store_err)?;
        let emails: Vec<Option<String>> = stmt
            .query_map([team_id], |row| row.get(0))
            .map_err(store_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(store_err)?;
        Ok(emails
            .into_iter()
            .flatten()
            .filter(|e| !e.is_empty())
            .collect())
    }
}

// ─── Row decoding ──────────────────────────────────────────────

const ORDER_COLUMNS: &str = "wo.work_order_id, wo.title, wo.description, wo.equipment_id, \
     wo.assignment_type, wo.craftsman_id, wo.team_id, wo.priority, wo.status, \
     wo.due_date, wo.completed_date, wo.estimated_hours, wo.tools_required, \
     wo.spares_required, wo.notes, wo.schedule_id, wo.rescheduled, \
     wo.notification_sent, wo.due_today_notified_on, wo.last_overdue_notice_on";

/// Raw row as stored; decoded into the typed model at the boundary so bad
/// data surfaces as a `Store` error, not a panic deep in business logic.
struct RawOrder {
    work_order_id: i64,
    title: String,
    description: String,
    equipment_id: i64,
    assignment_type: String,
    craftsman_id: Option<i64>,
    team_id: Option<i64>,
    priority: String,
    status: String,
    due_date: String,
    completed_date: Option<String>,
    estimated_hours: f64,
    tools_required: String,
    spares_required: String,
    notes: String,
    schedule_id: Option<i64>,
    rescheduled: bool,
    notification_sent: bool,
    due_today_notified_on: Option<String>,
    last_overdue_notice_on: Option<String>,
}

fn raw_order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawOrder> {
    Ok(RawOrder {
        work_order_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        equipment_id: row.get(3)?,
        assignment_type: row.get(4)?,
        craftsman_id: row.get(5)?,
        team_id: row.get(6)?,
        priority: row.get(7)?,
        status: row.get(8)?,
        due_date: row.get(9)?,
        completed_date: row.get(10)?,
        estimated_hours: row.get(11)?,
        tools_required: row.get(12)?,
        spares_required: row.get(13)?,
        notes: row.get(14)?,
        schedule_id: row.get(15)?,
        rescheduled: row.get::<_, i64>(16)? != 0,
        notification_sent: row.get::<_, i64>(17)? != 0,
        due_today_notified_on: row.get(18)?,
        last_overdue_notice_on: row.get(19)?,
    })
}

impl RawOrder {
    fn decode(self) -> Result<WorkOrderInstance> {
        let id = self.work_order_id;
        Ok(WorkOrderInstance {
            work_order_id: id,
            title: self.title,
            description: self.description,
            equipment_id: self.equipment_id,
            assignment: decode_assignment(
                &self.assignment_type,
                self.craftsman_id,
                self.team_id,
                &format!("work order #{id}"),
            )?,
            priority: Priority::parse(&self.priority)
                .ok_or_else(|| bad_row(&format!("work order #{id} priority {}", self.priority)))?,
            estimated_hours: self.estimated_hours,
            tools_required: from_json(&self.tools_required)?,
            spares_required: from_json(&self.spares_required)?,
            status: WorkOrderStatus::parse(&self.status)
                .ok_or_else(|| bad_row(&format!("work order #{id} status {}", self.status)))?,
            due_date: parse_date(&self.due_date)?,
            completed_date: self.completed_date.as_deref().map(parse_date).transpose()?,
            schedule_id: self.schedule_id,
            rescheduled: self.rescheduled,
            notification_sent: self.notification_sent,
            due_today_notified_on: self
                .due_today_notified_on
                .as_deref()
                .map(parse_date)
                .transpose()?,
            last_overdue_notice_on: self
                .last_overdue_notice_on
                .as_deref()
                .map(parse_date)
                .transpose()?,
            notes: self.notes,
        })
    }
}

struct RawRule {
    schedule_id: i64,
    frequency: u32,
    frequency_unit: String,
    start_date: String,
    end_date: Option<String>,
    last_generated: Option<String>,
}

fn raw_rule_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<RawRule> {
    Ok(RawRule {
        schedule_id: row.get(offset)?,
        frequency: row.get(offset + 1)?,
        frequency_unit: row.get(offset + 2)?,
        start_date: row.get(offset + 3)?,
        end_date: row.get(offset + 4)?,
        last_generated: row.get(offset + 5)?,
    })
}

impl RawRule {
    fn decode(self) -> Result<RecurrenceRule> {
        let id = self.schedule_id;
        Ok(RecurrenceRule {
            schedule_id: id,
            interval: self.frequency,
            unit: RecurrenceUnit::parse(&self.frequency_unit).ok_or_else(|| {
                bad_row(&format!("schedule #{id} unit {}", self.frequency_unit))
            })?,
            start_date: parse_date(&self.start_date)?,
            end_date: self.end_date.as_deref().map(parse_date).transpose()?,
            last_generated: self.last_generated.as_deref().map(parse_date).transpose()?,
        })
    }
}

struct RawTemplate {
    template_id: i64,
    title: String,
    description: String,
    equipment_id: i64,
    assignment_type: String,
    craftsman_id: Option<i64>,
    team_id: Option<i64>,
    priority: String,
    estimated_hours: f64,
    tools_required: String,
    spares_required: String,
    rule: RawRule,
}

fn raw_template_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTemplate> {
    Ok(RawTemplate {
        template_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        equipment_id: row.get(3)?,
        assignment_type: row.get(4)?,
        craftsman_id: row.get(5)?,
        team_id: row.get(6)?,
        priority: row.get(7)?,
        estimated_hours: row.get(8)?,
        tools_required: row.get(9)?,
        spares_required: row.get(10)?,
        rule: raw_rule_from_row(row, 11)?,
    })
}

impl RawTemplate {
    fn decode(self) -> Result<WorkOrderTemplate> {
        let id = self.template_id;
        Ok(WorkOrderTemplate {
            template_id: id,
            title: self.title,
            description: self.description,
            equipment_id: self.equipment_id,
            assignment: decode_assignment(
                &self.assignment_type,
                self.craftsman_id,
                self.team_id,
                &format!("template #{id}"),
            )?,
            priority: Priority::parse(&self.priority)
                .ok_or_else(|| bad_row(&format!("template #{id} priority {}", self.priority)))?,
            estimated_hours: self.estimated_hours,
            tools_required: from_json(&self.tools_required)?,
            spares_required: from_json(&self.spares_required)?,
            rule: self.rule.decode()?,
        })
    }
}

fn decode_assignment(
    assignment_type: &str,
    craftsman_id: Option<i64>,
    team_id: Option<i64>,
    context: &str,
) -> Result<Assignment> {
    match (assignment_type, craftsman_id, team_id) {
        ("Individual", Some(id), _) => Ok(Assignment::Craftsman(id)),
        ("Team", _, Some(id)) => Ok(Assignment::Team(id)),
        _ => Err(bad_row(&format!(
            "{context} has assignment type '{assignment_type}' without a matching assignee"
        ))),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| UpkeepError::Store(format!("Bad stored date '{s}': {e}")))
}

fn to_json(list: &[String]) -> Result<String> {
    serde_json::to_string(list).map_err(|e| UpkeepError::Store(format!("Serialize list: {e}")))
}

fn from_json(s: &str) -> Result<Vec<String>> {
    serde_json::from_str(s).map_err(|e| UpkeepError::Store(format!("Bad stored list '{s}': {e}")))
}

fn bad_row(context: &str) -> UpkeepError {
    UpkeepError::Store(format!("Corrupt row: {context}"))
}

fn store_err(e: rusqlite::Error) -> UpkeepError {
    UpkeepError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template(schedule_id: i64, craftsman_id: i64) -> WorkOrderTemplate {
        WorkOrderTemplate {
            template_id: 0,
            title: "Grease pump".into(),
            description: "Replace grease in main pump".into(),
            equipment_id: 11,
            assignment: Assignment::Craftsman(craftsman_id),
            priority: Priority::High,
            estimated_hours: 1.0,
            tools_required: vec!["Grease gun".into()],
            spares_required: vec!["EP2 grease".into()],
            rule: RecurrenceRule {
                schedule_id,
                interval: 2,
                unit: RecurrenceUnit::Weeks,
                start_date: date(2024, 1, 1),
                end_date: None,
                last_generated: None,
            },
        }
    }

    fn seeded_store() -> (SqliteWorkOrderStore, i64, i64) {
        let store = SqliteWorkOrderStore::open_in_memory().unwrap();
        let craftsman = store
            .add_craftsman("Jo", "Smith", Some("jo@example.com"))
            .unwrap();
        let schedule = store
            .add_schedule(2, RecurrenceUnit::Weeks, date(2024, 1, 1), None)
            .unwrap();
        store.insert_template(&template(schedule, craftsman)).unwrap();
        (store, schedule, craftsman)
    }

    #[tokio::test]
    async fn due_template_generates_and_retires_until_next_cycle() {
        let (store, schedule, _) = seeded_store();

        let due = store.due_templates(date(2024, 1, 1)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].schedule_id(), schedule);
        assert!(store.due_templates(date(2023, 12, 31)).await.unwrap().is_empty());

        let id = store
            .create_work_order(&due[0].instantiate(date(2024, 1, 1)))
            .await
            .unwrap();
        store
            .update_last_generated(schedule, date(2024, 1, 1))
            .await
            .unwrap();

        assert!(store.due_templates(date(2024, 1, 1)).await.unwrap().is_empty());
        assert_eq!(store.due_templates(date(2024, 1, 15)).await.unwrap().len(), 1);

        let order = store.get_work_order(id).unwrap().unwrap();
        assert_eq!(order.status, WorkOrderStatus::Open);
        assert_eq!(order.due_date, date(2024, 1, 1));
        assert_eq!(order.schedule_id, Some(schedule));
        assert_eq!(order.tools_required, vec!["Grease gun".to_string()]);
        assert_eq!(order.notes, format!("Auto-generated from schedule #{schedule}"));
    }

    #[tokio::test]
    async fn dangling_craftsman_reference_is_a_generation_error() {
        let (store, schedule, _) = seeded_store();
        let due = store.due_templates(date(2024, 1, 1)).await.unwrap();
        let mut order = due[0].instantiate(date(2024, 1, 1));
        order.assignment = Assignment::Craftsman(999);
        order.schedule_id = Some(schedule);

        let err = store.create_work_order(&order).await.unwrap_err();
        assert!(matches!(err, UpkeepError::Generation(_)));
    }

    #[tokio::test]
    async fn completed_unrescheduled_respects_flags_and_end_date() {
        let (store, schedule, _) = seeded_store();
        let due = store.due_templates(date(2024, 1, 1)).await.unwrap();
        let id = store
            .create_work_order(&due[0].instantiate(date(2024, 1, 1)))
            .await
            .unwrap();

        assert!(store
            .completed_unrescheduled(date(2024, 1, 2))
            .await
            .unwrap()
            .is_empty());

        store
            .set_status(id, WorkOrderStatus::Completed, Some(date(2024, 1, 2)))
            .unwrap();
        let completed = store.completed_unrescheduled(date(2024, 1, 3)).await.unwrap();
        assert_eq!(completed.len(), 1);
        let (order, rule) = &completed[0];
        assert_eq!(order.completed_date, Some(date(2024, 1, 2)));
        assert_eq!(rule.schedule_id, schedule);

        store.mark_rescheduled(id).await.unwrap();
        assert!(store
            .completed_unrescheduled(date(2024, 1, 3))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn due_and_overdue_queries_split_on_date() {
        let (store, _, _) = seeded_store();
        let due = store.due_templates(date(2024, 1, 1)).await.unwrap();
        store
            .create_work_order(&due[0].instantiate(date(2024, 5, 1)))
            .await
            .unwrap();
        store
            .create_work_order(&due[0].instantiate(date(2024, 4, 20)))
            .await
            .unwrap();

        let today = date(2024, 5, 1);
        let due_today = store.work_orders_due_on(today).await.unwrap();
        assert_eq!(due_today.len(), 1);
        assert_eq!(due_today[0].due_date, today);

        let overdue = store.overdue_work_orders(today).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].due_date, date(2024, 4, 20));
    }

    #[tokio::test]
    async fn mark_notified_sets_per_kind_state() {
        let (store, _, _) = seeded_store();
        let due = store.due_templates(date(2024, 1, 1)).await.unwrap();
        let id = store
            .create_work_order(&due[0].instantiate(date(2024, 5, 1)))
            .await
            .unwrap();

        let today = date(2024, 4, 30);
        store
            .mark_notified(id, NotificationKind::Upcoming, today)
            .await
            .unwrap();
        store
            .mark_notified(id, NotificationKind::DueToday, today)
            .await
            .unwrap();
        store
            .mark_notified(id, NotificationKind::Overdue, today)
            .await
            .unwrap();

        let order = store.get_work_order(id).unwrap().unwrap();
        assert!(order.notification_sent);
        assert_eq!(order.due_today_notified_on, Some(today));
        assert_eq!(order.last_overdue_notice_on, Some(today));
    }

    #[tokio::test]
    async fn email_lookups() {
        let (store, _, craftsman) = seeded_store();
        assert_eq!(
            store.craftsman_email(craftsman).await.unwrap(),
            Some("jo@example.com".into())
        );
        assert_eq!(store.craftsman_email(999).await.unwrap(), None);

        let no_mail = store.add_craftsman("Sam", "Lee", None).unwrap();
        assert_eq!(store.craftsman_email(no_mail).await.unwrap(), None);

        let team = store.add_team("Mechanical").unwrap();
        store.add_team_member(team, craftsman).unwrap();
        store.add_team_member(team, no_mail).unwrap();
        // Members without an address are filtered out of the fan-out.
        assert_eq!(
            store.team_emails(team).await.unwrap(),
            vec!["jo@example.com".to_string()]
        );
        assert!(store.team_emails(999).await.unwrap().is_empty());
    }
}
