//! Workout sessions and the series (completed sets) recorded in them.

use crate::db::{Database, FromRow};
use crate::{
    ExerciseId, NewSeries, Result, Series, SeriesId, Session, SessionId, SessionStatus,
    TemplateId, UserId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

impl FromRow for Session {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            template_id: row.get("template_id")?,
            started_at: row.get("date")?,
            status: row.get("status")?,
            duration: row.get("duration")?,
        })
    }
}

impl FromRow for Series {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            exercise_id: row.get("exercise_id")?,
            weight: row.get("weight")?,
            reps: row.get("reps")?,
            rpe: row.get("rpe")?,
            kind: row.get("type")?,
            note: row.get("note")?,
        })
    }
}

pub struct SessionRepo<'db> {
    db: &'db Database,
}

impl<'db> SessionRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Insert an in-progress session
    pub fn create(
        &self,
        user_id: UserId,
        template_id: Option<TemplateId>,
        started_at: DateTime<Utc>,
    ) -> Result<SessionId> {
        self.db.insert(
            "INSERT INTO sessions (user_id, template_id, date, status) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, template_id, started_at, SessionStatus::InProgress],
        )
    }

    pub fn get(&self, id: SessionId) -> Result<Option<Session>> {
        self.db
            .query_one("SELECT * FROM sessions WHERE id = ?1", [id], Session::from_row)
    }

    /// Set the status without touching the duration
    pub fn set_status(&self, id: SessionId, status: SessionStatus) -> Result<bool> {
        let changed = self.db.execute(
            "UPDATE sessions SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(changed > 0)
    }

    /// Mark a session completed with its final duration in seconds
    pub fn complete(&self, id: SessionId, duration: u32) -> Result<bool> {
        let changed = self.db.execute(
            "UPDATE sessions SET status = ?1, duration = ?2 WHERE id = ?3",
            params![SessionStatus::Completed, duration, id],
        )?;
        Ok(changed > 0)
    }

    /// Completed sessions of a user, newest first
    pub fn list_completed(&self, user_id: UserId) -> Result<Vec<Session>> {
        self.db.query_all(
            "SELECT * FROM sessions WHERE user_id = ?1 AND status = ?2 ORDER BY date DESC, id DESC",
            params![user_id, SessionStatus::Completed],
            Session::from_row,
        )
    }

    /// Delete a session and, by cascade, its series
    pub fn delete(&self, id: SessionId) -> Result<bool> {
        let changed = self.db.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}

pub struct SeriesRepo<'db> {
    db: &'db Database,
}

impl<'db> SeriesRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn create(&self, series: &NewSeries) -> Result<SeriesId> {
        self.db.insert(
            "INSERT INTO series (session_id, exercise_id, weight, reps, rpe, type, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                series.session_id,
                series.exercise_id,
                series.weight,
                series.reps,
                series.rpe,
                series.kind,
                series.note
            ],
        )
    }

    pub fn delete(&self, id: SeriesId) -> Result<bool> {
        let changed = self.db.execute("DELETE FROM series WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    /// Series of a session in completion order
    pub fn for_session(&self, session_id: SessionId) -> Result<Vec<Series>> {
        self.db.query_all(
            "SELECT * FROM series WHERE session_id = ?1 ORDER BY id",
            [session_id],
            Series::from_row,
        )
    }

    pub fn for_exercise(&self, session_id: SessionId, exercise_id: ExerciseId) -> Result<Vec<Series>> {
        self.db.query_all(
            "SELECT * FROM series WHERE session_id = ?1 AND exercise_id = ?2 ORDER BY id",
            [session_id, exercise_id],
            Series::from_row,
        )
    }
}
