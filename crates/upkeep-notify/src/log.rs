//! Notification audit log.
//!
//! Every delivery attempt gets a row before the network is touched, so a
//! crash mid-send still leaves a visible `pending` record. Kept in its own
//! database file, separate from the work order store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use upkeep_core::error::{Result, UpkeepError};
use upkeep_core::types::{
    NotificationKind, NotificationMessage, NotificationRecord, NotificationStatus,
};

pub struct NotificationLog {
    conn: Mutex<Connection>,
}

impl NotificationLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| UpkeepError::Notification(format!("Log open: {e}")))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| UpkeepError::Notification(format!("Log open: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS email_notifications (
                notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                kind TEXT NOT NULL,
                reference_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                sent_at TEXT,
                error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_status
                ON email_notifications(status);",
        )
        .map_err(|e| UpkeepError::Notification(format!("Log migration: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record an attempt before delivery. Returns the new record id.
    pub fn create_pending(&self, message: &NotificationMessage) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO email_notifications
             (recipient, subject, content, status, kind, reference_id, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)",
            rusqlite::params![
                message.recipient,
                message.subject,
                message.html_body,
                message.kind.as_str(),
                message.work_order_id,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(log_err)?;
        Ok(conn.last_insert_rowid())
    }

    pub fn mark_sent(&self, notification_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE email_notifications
             SET status = 'sent', sent_at = ?1, error = NULL
             WHERE notification_id = ?2",
            rusqlite::params![Utc::now().to_rfc3339(), notification_id],
        )
        .map_err(log_err)?;
        Ok(())
    }

    pub fn mark_failed(&self, notification_id: i64, error: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE email_notifications
             SET status = 'failed', error = ?1
             WHERE notification_id = ?2",
            rusqlite::params![error, notification_id],
        )
        .map_err(log_err)?;
        Ok(())
    }

    pub fn get(&self, notification_id: i64) -> Result<Option<NotificationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM email_notifications WHERE notification_id = ?1"
            ))
            .map_err(log_err)?;
        let mut rows = stmt
            .query_map([notification_id], raw_from_row)
            .map_err(log_err)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw.map_err(log_err)?.decode()?)),
            None => Ok(None),
        }
    }

    /// Most recent records first.
    pub fn recent(&self, limit: u32) -> Result<Vec<NotificationRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM email_notifications
                 ORDER BY notification_id DESC LIMIT ?1"
            ))
            .map_err(log_err)?;
        let raws: Vec<RawRecord> = stmt
            .query_map([limit], raw_from_row)
            .map_err(log_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(log_err)?;
        raws.into_iter().map(|raw| raw.decode()).collect()
    }
}

const COLUMNS: &str = "notification_id, recipient, subject, content, status, kind, \
     reference_id, created_at, sent_at, error";

struct RawRecord {
    notification_id: i64,
    recipient: String,
    subject: String,
    content: String,
    status: String,
    kind: String,
    reference_id: i64,
    created_at: String,
    sent_at: Option<String>,
    error: Option<String>,
}

fn raw_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        notification_id: row.get(0)?,
        recipient: row.get(1)?,
        subject: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
        kind: row.get(5)?,
        reference_id: row.get(6)?,
        created_at: row.get(7)?,
        sent_at: row.get(8)?,
        error: row.get(9)?,
    })
}

impl RawRecord {
    fn decode(self) -> Result<NotificationRecord> {
        let id = self.notification_id;
        Ok(NotificationRecord {
            notification_id: id,
            recipient: self.recipient,
            subject: self.subject,
            content: self.content,
            status: NotificationStatus::parse(&self.status).ok_or_else(|| {
                UpkeepError::Notification(format!("Record #{id}: bad status {}", self.status))
            })?,
            kind: NotificationKind::parse(&self.kind).ok_or_else(|| {
                UpkeepError::Notification(format!("Record #{id}: bad kind {}", self.kind))
            })?,
            reference_id: self.reference_id,
            created_at: parse_timestamp(&self.created_at)?,
            sent_at: self.sent_at.as_deref().map(parse_timestamp).transpose()?,
            error: self.error,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| UpkeepError::Notification(format!("Bad stored timestamp '{s}': {e}")))
}

fn log_err(e: rusqlite::Error) -> UpkeepError {
    UpkeepError::Notification(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(recipient: &str) -> NotificationMessage {
        NotificationMessage {
            recipient: recipient.into(),
            subject: "Work Order #5 Due Today".into(),
            html_body: "<html></html>".into(),
            kind: NotificationKind::DueToday,
            work_order_id: 5,
        }
    }

    #[test]
    fn pending_then_sent() {
        let log = NotificationLog::open_in_memory().unwrap();
        let id = log.create_pending(&message("jo@example.com")).unwrap();

        let record = log.get(id).unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Pending);
        assert_eq!(record.kind, NotificationKind::DueToday);
        assert_eq!(record.reference_id, 5);
        assert!(record.sent_at.is_none());

        log.mark_sent(id).unwrap();
        let record = log.get(id).unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Sent);
        assert!(record.sent_at.is_some());
        assert!(record.error.is_none());
    }

    #[test]
    fn failed_keeps_the_error() {
        let log = NotificationLog::open_in_memory().unwrap();
        let id = log.create_pending(&message("jo@example.com")).unwrap();
        log.mark_failed(id, "SMTP send: connection refused").unwrap();

        let record = log.get(id).unwrap().unwrap();
        assert_eq!(record.status, NotificationStatus::Failed);
        assert_eq!(
            record.error.as_deref(),
            Some("SMTP send: connection refused")
        );
        assert!(record.sent_at.is_none());
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let log = NotificationLog::open_in_memory().unwrap();
        for i in 0..5 {
            log.create_pending(&message(&format!("r{i}@example.com")))
                .unwrap();
        }
        let recent = log.recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].recipient, "r4@example.com");
        assert_eq!(recent[2].recipient, "r2@example.com");
    }

    #[test]
    fn missing_record_is_none() {
        let log = NotificationLog::open_in_memory().unwrap();
        assert!(log.get(42).unwrap().is_none());
    }
}
