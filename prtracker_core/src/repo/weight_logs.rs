//! Body-weight log entries.

use crate::db::{Database, FromRow};
use crate::{Result, UserId, WeightLog, WeightLogId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

impl FromRow for WeightLog {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            logged_at: row.get("date")?,
            weight: row.get("weight")?,
        })
    }
}

pub struct WeightLogRepo<'db> {
    db: &'db Database,
}

impl<'db> WeightLogRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn record(&self, user_id: UserId, at: DateTime<Utc>, weight: f64) -> Result<WeightLogId> {
        self.db.insert(
            "INSERT INTO weight_logs (user_id, date, weight) VALUES (?1, ?2, ?3)",
            params![user_id, at, weight],
        )
    }

    /// Entries for a user, newest first
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<WeightLog>> {
        self.db.query_all(
            "SELECT * FROM weight_logs WHERE user_id = ?1 ORDER BY date DESC, id DESC",
            [user_id],
            WeightLog::from_row,
        )
    }

    pub fn latest(&self, user_id: UserId) -> Result<Option<WeightLog>> {
        self.db.query_one(
            "SELECT * FROM weight_logs WHERE user_id = ?1 ORDER BY date DESC, id DESC LIMIT 1",
            [user_id],
            WeightLog::from_row,
        )
    }

    pub fn delete(&self, id: WeightLogId) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM weight_logs WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}
