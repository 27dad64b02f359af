//! Workout history.
//!
//! Only completed sessions are listed. A session's detail view groups its
//! series by exercise in the order each exercise was first performed, keeping
//! the sets of an exercise in completion order.

use crate::db::{Database, FromRow};
use crate::{ExerciseId, Result, Series, Session, SessionId, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::HashSet;

/// A completed session with summary counts
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub session: Session,
    pub template_name: Option<String>,
    pub exercise_count: usize,
    pub set_count: usize,
}

/// The series of one exercise within a session
#[derive(Clone, Debug, Serialize)]
pub struct ExerciseGroup {
    pub exercise_id: ExerciseId,
    pub name: String,
    pub sets: Vec<Series>,
}

/// A session with its series grouped by exercise
#[derive(Clone, Debug, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub exercises: Vec<ExerciseGroup>,
}

impl SessionDetail {
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Completed sessions of a user, newest first
pub fn list_completed(db: &Database, user_id: UserId) -> Result<Vec<SessionSummary>> {
    let sessions = db.sessions().list_completed(user_id)?;
    let mut summaries = Vec::with_capacity(sessions.len());

    for session in sessions {
        let series = db.series().for_session(session.id)?;
        let exercise_count = series
            .iter()
            .map(|s| s.exercise_id)
            .collect::<HashSet<_>>()
            .len();
        let template_name = match session.template_id {
            Some(id) => db.templates().get(id)?.map(|t| t.name),
            None => None,
        };

        summaries.push(SessionSummary {
            session,
            template_name,
            exercise_count,
            set_count: series.len(),
        });
    }

    tracing::debug!("Loaded {} completed sessions for user {}", summaries.len(), user_id);
    Ok(summaries)
}

/// Series of a session grouped by exercise; `None` if the session is unknown
pub fn get_detail(db: &Database, session_id: SessionId) -> Result<Option<SessionDetail>> {
    let session = match db.sessions().get(session_id)? {
        Some(session) => session,
        None => return Ok(None),
    };

    let rows = db.query_all(
        "SELECT se.*, e.name AS exercise_name
         FROM series se
         JOIN exercises e ON e.id = se.exercise_id
         WHERE se.session_id = ?1
         ORDER BY se.id",
        [session_id],
        |row| Ok((Series::from_row(row)?, row.get::<_, String>("exercise_name")?)),
    )?;

    let mut exercises: Vec<ExerciseGroup> = Vec::new();
    let mut positions: HashMap<ExerciseId, usize> = HashMap::new();

    for (series, name) in rows {
        let position = *positions.entry(series.exercise_id).or_insert_with(|| {
            exercises.push(ExerciseGroup {
                exercise_id: series.exercise_id,
                name,
                sets: Vec::new(),
            });
            exercises.len() - 1
        });
        exercises[position].sets.push(series);
    }

    Ok(Some(SessionDetail { session, exercises }))
}

/// Render seconds as `m:ss`, or `0:00` when no duration was recorded
pub fn format_duration(seconds: Option<u32>) -> String {
    let seconds = seconds.unwrap_or(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
