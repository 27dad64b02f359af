//! Core domain types for PR Tracker.
//!
//! This module defines the durable entities stored in the embedded database:
//! - Users and their body-weight logs
//! - Exercises (the catalog grows as users type new names)
//! - Templates and their ordered exercises with prescriptions
//! - Sessions and the series (completed sets) recorded in them

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type ExerciseId = i64;
pub type TemplateId = i64;
pub type TemplateExerciseId = i64;
pub type SessionId = i64;
pub type SeriesId = i64;
pub type WeightLogId = i64;

/// Rest timer used when nothing more specific is configured
pub const DEFAULT_REST_SECONDS: u32 = 90;

/// Target set count when a prescription does not say otherwise
pub const DEFAULT_TARGET_SETS: u32 = 3;

/// Upper bound on the sets a template may prescribe for one exercise
pub const MAX_TARGET_SETS: u32 = 50;

// ============================================================================
// Users
// ============================================================================

/// A registered user; the password is only ever held as a digest
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// A body-weight measurement, independent of sessions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightLog {
    pub id: WeightLogId,
    pub user_id: UserId,
    pub logged_at: DateTime<Utc>,
    pub weight: f64,
}

// ============================================================================
// Exercises and Templates
// ============================================================================

/// An exercise in the shared catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// A named, ordered workout plan owned by a user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
}

/// Target sets, weight and reps prescribed for one template exercise
///
/// Stored as an opaque JSON payload. Older payloads carried weight and reps
/// as free text, so decoding accepts numbers, numeric strings, empty strings
/// and nulls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    #[serde(default = "default_sets", deserialize_with = "lenient_sets")]
    pub sets: u32,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub reps: Option<u32>,
}

impl Default for Prescription {
    fn default() -> Self {
        Self {
            sets: DEFAULT_TARGET_SETS,
            weight: None,
            reps: None,
        }
    }
}

impl Prescription {
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

fn default_sets() -> u32 {
    DEFAULT_TARGET_SETS
}

fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.to_string().parse().ok(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_sets<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number::<D, u32>(deserializer)?
        .filter(|sets| *sets > 0)
        .map(|sets| sets.min(MAX_TARGET_SETS))
        .unwrap_or(DEFAULT_TARGET_SETS))
}

/// One exercise slot of a template, joined with the exercise name
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub id: TemplateExerciseId,
    pub template_id: TemplateId,
    pub exercise_id: ExerciseId,
    pub exercise_name: String,
    /// 1-based position within the template
    pub order_index: u32,
    pub prescription: Prescription,
    pub rest_timer: u32,
}

// ============================================================================
// Sessions and Series
// ============================================================================

/// Lifecycle status of a workout session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl FromStr for SessionStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "in_progress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(crate::Error::Other(format!("Unknown session status: {}", other))),
        }
    }
}

/// A workout session row
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub template_id: Option<TemplateId>,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Seconds; only recorded on completion
    pub duration: Option<u32>,
}

/// Kind of set, used for history labels
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    Warmup,
    #[default]
    Normal,
    Failure,
    PersonalRecord,
    Dropset,
}

impl SetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetKind::Warmup => "warmup",
            SetKind::Normal => "normal",
            SetKind::Failure => "failure",
            SetKind::PersonalRecord => "personal_record",
            SetKind::Dropset => "dropset",
        }
    }

    /// Display label for the set at 1-based `number`, e.g. `W1` or `3`
    pub fn label(&self, number: usize) -> String {
        match self {
            SetKind::Warmup => format!("W{}", number),
            SetKind::Failure => format!("F{}", number),
            SetKind::PersonalRecord => format!("P{}", number),
            SetKind::Dropset => format!("D{}", number),
            SetKind::Normal => number.to_string(),
        }
    }
}

impl FromStr for SetKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "warmup" | "w" => Ok(SetKind::Warmup),
            "normal" | "n" => Ok(SetKind::Normal),
            "failure" | "f" => Ok(SetKind::Failure),
            "personal_record" | "pr" | "p" => Ok(SetKind::PersonalRecord),
            "dropset" | "d" => Ok(SetKind::Dropset),
            other => Err(crate::Error::Validation(format!("Unknown set kind: {}", other))),
        }
    }
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed set persisted under a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub id: SeriesId,
    pub session_id: SessionId,
    pub exercise_id: ExerciseId,
    pub weight: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
    pub kind: SetKind,
    pub note: Option<String>,
}

/// Fields of a series before it has a durable id
#[derive(Clone, Debug, PartialEq)]
pub struct NewSeries {
    pub session_id: SessionId,
    pub exercise_id: ExerciseId,
    pub weight: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
    pub kind: SetKind,
    pub note: Option<String>,
}

/// Check a perceived-exertion rating: 6.0 to 10.0 in half-point steps
pub fn validate_rpe(rpe: f64) -> crate::Result<()> {
    if !(6.0..=10.0).contains(&rpe) || (rpe * 2.0).fract() != 0.0 {
        return Err(crate::Error::Validation(format!(
            "RPE must be between 6 and 10 in steps of 0.5, got {}",
            rpe
        )));
    }
    Ok(())
}

// ============================================================================
// Storage tokens
// ============================================================================

impl ToSql for SessionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SessionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::Error| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for SetKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SetKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: crate::Error| FromSqlError::Other(Box::new(e)))
    }
}
