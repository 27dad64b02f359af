//! Workout session engine.
//!
//! A [`SessionEngine`] is created together with its durable session row and
//! then accumulates sets in memory. A set entry is ephemeral (no durable id)
//! until it is completed, at which point a series row is written and its id
//! stored on the entry.
//!
//! States:
//! - `Created`: session row exists with status `in_progress`, elapsed timer runs
//! - `Completed`: terminal, status `completed` with the elapsed duration
//! - `Abandoned`: terminal, status `cancelled`, no duration
//!
//! Timers are advanced by [`SessionEngine::tick`], called once per second by
//! the host's event loop. Both stop on any terminal transition.

use crate::config::SessionConfig;
use crate::db::Database;
use crate::timer::{ActiveRest, ElapsedTimer, RestTimer};
use crate::{
    validate_rpe, Error, Exercise, ExerciseId, NewSeries, Result, SeriesId, SessionId,
    SessionStatus, SetKind, TemplateId, UserId, DEFAULT_REST_SECONDS,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Engine defaults
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Rest duration for exercises the template does not cover
    pub default_rest_seconds: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_rest_seconds: DEFAULT_REST_SECONDS,
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            default_rest_seconds: config.default_rest_seconds,
        }
    }
}

/// Lifecycle state of the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Completed,
    Abandoned,
}

impl EngineState {
    pub fn status(&self) -> SessionStatus {
        match self {
            EngineState::Created => SessionStatus::InProgress,
            EngineState::Completed => SessionStatus::Completed,
            EngineState::Abandoned => SessionStatus::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, EngineState::Created)
    }
}

/// One set being entered or already completed
#[derive(Clone, Debug, PartialEq)]
pub struct SetEntry {
    /// 1-based position within the exercise, recomputed after deletions
    pub number: usize,
    pub weight: Option<f64>,
    pub reps: Option<u32>,
    pub kind: SetKind,
    pub rpe: Option<f64>,
    pub note: Option<String>,
    /// Durable id of the series row once completed
    pub series_id: Option<SeriesId>,
}

impl SetEntry {
    fn blank(number: usize) -> Self {
        Self {
            number,
            weight: None,
            reps: None,
            kind: SetKind::Normal,
            rpe: None,
            note: None,
            series_id: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.series_id.is_some()
    }

    /// History-style label such as `W1` or `2`
    pub fn label(&self) -> String {
        self.kind.label(self.number)
    }
}

/// An exercise performed in the session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionExercise {
    pub exercise_id: ExerciseId,
    pub name: String,
    pub rest_seconds: u32,
    pub sets: Vec<SetEntry>,
}

impl SessionExercise {
    fn new(exercise: &Exercise, rest_seconds: u32) -> Self {
        Self {
            exercise_id: exercise.id,
            name: exercise.name.clone(),
            rest_seconds,
            sets: vec![SetEntry::blank(1)],
        }
    }

    fn renumber(&mut self) {
        for (index, entry) in self.sets.iter_mut().enumerate() {
            entry.number = index + 1;
        }
    }
}

/// Editable field of an ephemeral set entry
#[derive(Clone, Debug, PartialEq)]
pub enum SetField {
    Weight(Option<f64>),
    Reps(Option<u32>),
    Kind(SetKind),
    Rpe(Option<f64>),
    Note(Option<String>),
}

impl SetField {
    /// Build a field update from UI text; empty text unsets the field
    pub fn parse(field: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let field = field.trim().to_lowercase();

        match field.as_str() {
            "weight" | "w" => Ok(SetField::Weight(parse_optional(&field, value)?)),
            "reps" | "r" => Ok(SetField::Reps(parse_optional(&field, value)?)),
            "rpe" => Ok(SetField::Rpe(parse_optional(&field, value)?)),
            "kind" | "type" => {
                if value.is_empty() {
                    Ok(SetField::Kind(SetKind::Normal))
                } else {
                    Ok(SetField::Kind(value.parse()?))
                }
            }
            "note" => Ok(SetField::Note(
                Some(value.to_string()).filter(|v| !v.is_empty()),
            )),
            other => Err(Error::Validation(format!("Unknown set field: {}", other))),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            SetField::Weight(Some(weight)) if !weight.is_finite() || *weight < 0.0 => Err(
                Error::Validation(format!("Weight must be zero or more, got {}", weight)),
            ),
            SetField::Rpe(Some(rpe)) => validate_rpe(*rpe),
            _ => Ok(()),
        }
    }
}

fn parse_optional<T: std::str::FromStr>(field: &str, value: &str) -> Result<Option<T>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| Error::Validation(format!("Invalid {}: {:?}", field, value)))
}

/// Read-only view of the engine for rendering
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: EngineState,
    pub elapsed_seconds: u32,
    pub rest: Option<ActiveRest>,
    pub exercises: Vec<SessionExercise>,
}

/// In-memory workout session backed by a durable session row
pub struct SessionEngine<'db> {
    db: &'db Database,
    session_id: SessionId,
    user_id: UserId,
    template_id: Option<TemplateId>,
    state: EngineState,
    exercises: Vec<SessionExercise>,
    template_rest: HashMap<ExerciseId, u32>,
    settings: SessionSettings,
    elapsed: ElapsedTimer,
    rest: RestTimer,
}

impl<'db> SessionEngine<'db> {
    /// Begin a session now; see [`SessionEngine::start_at`]
    pub fn start(
        db: &'db Database,
        user_id: UserId,
        template_id: Option<TemplateId>,
        settings: SessionSettings,
    ) -> Result<Self> {
        Self::start_at(db, user_id, template_id, settings, Utc::now())
    }

    /// Begin a session, writing its row immediately
    ///
    /// When started from a template, the template's exercises are laid out
    /// with their prescribed set count and targets pre-filled.
    pub fn start_at(
        db: &'db Database,
        user_id: UserId,
        template_id: Option<TemplateId>,
        settings: SessionSettings,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut exercises = Vec::new();
        let mut template_rest = HashMap::new();

        if let Some(template_id) = template_id {
            if db.templates().get(template_id)?.is_none() {
                return Err(Error::NotFound(format!("template {}", template_id)));
            }

            for slot in db.templates().exercises(template_id)? {
                template_rest.entry(slot.exercise_id).or_insert(slot.rest_timer);

                let sets = (1..=slot.prescription.sets as usize)
                    .map(|number| SetEntry {
                        weight: slot.prescription.weight,
                        reps: slot.prescription.reps,
                        ..SetEntry::blank(number)
                    })
                    .collect();
                exercises.push(SessionExercise {
                    exercise_id: slot.exercise_id,
                    name: slot.exercise_name,
                    rest_seconds: slot.rest_timer,
                    sets,
                });
            }
        }

        let session_id = db.sessions().create(user_id, template_id, started_at)?;
        tracing::info!(
            "Started session {} for user {} (template {:?})",
            session_id,
            user_id,
            template_id
        );

        Ok(Self {
            db,
            session_id,
            user_id,
            template_id,
            state: EngineState::Created,
            exercises,
            template_rest,
            settings,
            elapsed: ElapsedTimer::started(),
            rest: RestTimer::default(),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn template_id(&self) -> Option<TemplateId> {
        self.template_id
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn exercises(&self) -> &[SessionExercise] {
        &self.exercises
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed.seconds()
    }

    pub fn rest(&self) -> Option<ActiveRest> {
        self.rest.active()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            state: self.state,
            elapsed_seconds: self.elapsed.seconds(),
            rest: self.rest.active(),
            exercises: self.exercises.clone(),
        }
    }

    /// Log a failed write; engine state is left as it was before the call
    fn storage_failed(&self, action: &str, error: Error) -> Error {
        tracing::error!("Session {}: {} failed: {}", self.session_id, action, error);
        error
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn entry(&self, exercise: usize, set: usize) -> Result<&SetEntry> {
        self.exercises
            .get(exercise)
            .ok_or(Error::NoSuchExercise(exercise))?
            .sets
            .get(set)
            .ok_or(Error::NoSuchSet { exercise, set })
    }

    fn entry_mut(&mut self, exercise: usize, set: usize) -> Result<&mut SetEntry> {
        self.exercises
            .get_mut(exercise)
            .ok_or(Error::NoSuchExercise(exercise))?
            .sets
            .get_mut(set)
            .ok_or(Error::NoSuchSet { exercise, set })
    }

    /// Append an exercise by name, creating it in the catalog if needed
    ///
    /// Returns the new exercise's index. It starts with one blank set.
    pub fn add_exercise(&mut self, name: &str) -> Result<usize> {
        self.ensure_open()?;
        let exercise = self.db.exercises().get_or_create(name)?;
        let rest_seconds = self
            .template_rest
            .get(&exercise.id)
            .copied()
            .unwrap_or(self.settings.default_rest_seconds);

        self.exercises
            .push(SessionExercise::new(&exercise, rest_seconds));
        tracing::debug!("Session {}: added exercise {}", self.session_id, exercise.name);
        Ok(self.exercises.len() - 1)
    }

    /// Append a blank set to an exercise, returning its index
    pub fn add_set(&mut self, exercise: usize) -> Result<usize> {
        self.ensure_open()?;
        let entry = self
            .exercises
            .get_mut(exercise)
            .ok_or(Error::NoSuchExercise(exercise))?;
        let number = entry.sets.len() + 1;
        entry.sets.push(SetEntry::blank(number));
        Ok(number - 1)
    }

    /// Edit an ephemeral set entry
    ///
    /// Returns `false` without changing anything when the set is already
    /// completed, whatever the value.
    pub fn set_field(&mut self, exercise: usize, set: usize, field: SetField) -> Result<bool> {
        self.ensure_open()?;

        if self.entry(exercise, set)?.is_completed() {
            return Ok(false);
        }
        field.validate()?;

        let entry = self.entry_mut(exercise, set)?;

        match field {
            SetField::Weight(weight) => entry.weight = weight,
            SetField::Reps(reps) => entry.reps = reps,
            SetField::Kind(kind) => entry.kind = kind,
            SetField::Rpe(rpe) => entry.rpe = rpe,
            SetField::Note(note) => entry.note = note,
        }
        Ok(true)
    }

    /// Persist a set as a series row and start the exercise's rest timer
    ///
    /// Rejected without side effects when weight or reps is unset or the set
    /// is already completed.
    pub fn complete_set(&mut self, exercise: usize, set: usize) -> Result<SeriesId> {
        self.ensure_open()?;

        let entry = self.entry(exercise, set)?;
        if entry.is_completed() {
            return Err(Error::Validation(format!(
                "Set {} is already completed",
                entry.number
            )));
        }
        let (weight, reps) = match (entry.weight, entry.reps) {
            (Some(weight), Some(reps)) => (weight, reps),
            _ => {
                return Err(Error::Validation(
                    "Weight and reps are required to complete a set".into(),
                ))
            }
        };

        let new_series = NewSeries {
            session_id: self.session_id,
            exercise_id: self.exercises[exercise].exercise_id,
            weight,
            reps,
            rpe: entry.rpe,
            kind: entry.kind,
            note: entry.note.clone(),
        };
        let series_id = self
            .db
            .transaction(|db| db.series().create(&new_series))
            .map_err(|e| self.storage_failed("saving set", e))?;

        self.entry_mut(exercise, set)?.series_id = Some(series_id);

        let rest_seconds = self.exercises[exercise].rest_seconds;
        if rest_seconds > 0 {
            self.rest.start(exercise, rest_seconds);
        }

        tracing::info!(
            "Session {}: completed set {} of {} ({} x {})",
            self.session_id,
            set + 1,
            self.exercises[exercise].name,
            weight,
            reps
        );
        Ok(series_id)
    }

    /// Reverse a completion: delete the series row and make the entry editable
    ///
    /// Returns `false` if the set was not completed.
    pub fn uncomplete_set(&mut self, exercise: usize, set: usize) -> Result<bool> {
        self.ensure_open()?;

        let series_id = match self.entry(exercise, set)?.series_id {
            Some(id) => id,
            None => return Ok(false),
        };

        self.db
            .series()
            .delete(series_id)
            .map_err(|e| self.storage_failed("retracting set", e))?;
        self.entry_mut(exercise, set)?.series_id = None;
        tracing::debug!("Session {}: series {} retracted", self.session_id, series_id);
        Ok(true)
    }

    /// Flip a set's completion, returning whether it is now completed
    pub fn toggle_set(&mut self, exercise: usize, set: usize) -> Result<bool> {
        if self.entry(exercise, set)?.is_completed() {
            self.uncomplete_set(exercise, set)?;
            Ok(false)
        } else {
            self.complete_set(exercise, set)?;
            Ok(true)
        }
    }

    /// Remove a set, deleting its series row first if it was completed
    ///
    /// Remaining sets of the exercise are renumbered from 1.
    pub fn delete_set(&mut self, exercise: usize, set: usize) -> Result<()> {
        self.ensure_open()?;

        if let Some(series_id) = self.entry(exercise, set)?.series_id {
            self.db
                .series()
                .delete(series_id)
                .map_err(|e| self.storage_failed("deleting set", e))?;
        }

        let entry = &mut self.exercises[exercise];
        entry.sets.remove(set);
        entry.renumber();
        Ok(())
    }

    /// Advance both timers by one second
    pub fn tick(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.elapsed.tick();
        if let Some(exercise) = self.rest.tick() {
            tracing::debug!(
                "Session {}: rest over for {}",
                self.session_id,
                self.exercises
                    .get(exercise)
                    .map(|e| e.name.as_str())
                    .unwrap_or("?")
            );
        }
    }

    /// Deliver several one-second ticks at once
    pub fn advance(&mut self, seconds: u32) {
        for _ in 0..seconds {
            self.tick();
        }
    }

    fn stop_timers(&mut self) {
        self.elapsed.stop();
        self.rest.cancel();
    }

    /// Complete the session with the elapsed time as its duration
    ///
    /// A no-op once the session has reached a terminal state.
    pub fn finish(&mut self) -> Result<EngineState> {
        if self.state.is_terminal() {
            tracing::debug!("Session {} already {:?}", self.session_id, self.state);
            return Ok(self.state);
        }

        let duration = self.elapsed.seconds();
        self.db
            .sessions()
            .complete(self.session_id, duration)
            .map_err(|e| self.storage_failed("finishing", e))?;
        self.stop_timers();
        self.state = EngineState::Completed;
        tracing::info!("Session {} completed after {}s", self.session_id, duration);
        Ok(self.state)
    }

    /// Cancel the session, leaving its duration unset
    ///
    /// A no-op once the session has reached a terminal state.
    pub fn abandon(&mut self) -> Result<EngineState> {
        if self.state.is_terminal() {
            tracing::debug!("Session {} already {:?}", self.session_id, self.state);
            return Ok(self.state);
        }

        self.db
            .sessions()
            .set_status(self.session_id, SessionStatus::Cancelled)
            .map_err(|e| self.storage_failed("abandoning", e))?;
        self.stop_timers();
        self.state = EngineState::Abandoned;
        tracing::info!("Session {} abandoned", self.session_id);
        Ok(self.state)
    }
}

impl Drop for SessionEngine<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!(
                "Session {} torn down while in progress; timers stopped",
                self.session_id
            );
        }
        self.stop_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::test_db;
    use crate::{composer::TemplateComposer, history, Prescription, MAX_TARGET_SETS};

    fn alice(db: &Database) -> UserId {
        db.users().create("Alice", "alice@example.com", "pw").unwrap()
    }

    fn fill(engine: &mut SessionEngine<'_>, exercise: usize, set: usize, weight: f64, reps: u32) {
        engine
            .set_field(exercise, set, SetField::Weight(Some(weight)))
            .unwrap();
        engine
            .set_field(exercise, set, SetField::Reps(Some(reps)))
            .unwrap();
    }

    #[test]
    fn test_start_writes_session_row_immediately() {
        let db = test_db();
        let user = alice(&db);
        let engine = SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();

        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.status, SessionStatus::InProgress);
        assert_eq!(engine.state(), EngineState::Created);
    }

    #[test]
    fn test_add_exercise_uses_default_rest_and_one_set() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();

        let index = engine.add_exercise("Squat").unwrap();
        let exercise = &engine.exercises()[index];
        assert_eq!(exercise.name, "Squat");
        assert_eq!(exercise.rest_seconds, 90);
        assert_eq!(exercise.sets.len(), 1);
        assert_eq!(exercise.sets[0].kind, SetKind::Normal);
        assert!(db.exercises().get_by_name("Squat").unwrap().is_some());
    }

    #[test]
    fn test_sets_renumber_after_deletion() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        for _ in 0..4 {
            engine.add_set(squat).unwrap();
        }

        engine.delete_set(squat, 1).unwrap();
        engine.delete_set(squat, 2).unwrap();
        engine.add_set(squat).unwrap();
        engine.delete_set(squat, 0).unwrap();

        let numbers: Vec<_> = engine.exercises()[squat]
            .sets
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_complete_requires_weight_and_reps() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();

        engine
            .set_field(squat, 0, SetField::Weight(Some(60.0)))
            .unwrap();
        let err = engine.complete_set(squat, 0).unwrap_err();
        assert!(err.is_validation());

        engine.set_field(squat, 0, SetField::parse("reps", "").unwrap()).unwrap();
        assert!(engine.complete_set(squat, 0).is_err());

        assert!(db.series().for_session(engine.session_id()).unwrap().is_empty());
        assert_eq!(engine.rest(), None);
        assert!(!engine.exercises()[squat].sets[0].is_completed());
    }

    #[test]
    fn test_complete_persists_and_starts_rest() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);

        let series_id = engine.complete_set(squat, 0).unwrap();

        assert_eq!(engine.exercises()[squat].sets[0].series_id, Some(series_id));
        assert_eq!(
            engine.rest(),
            Some(ActiveRest {
                exercise: squat,
                remaining: 90
            })
        );
        let rows = db.series().for_session(engine.session_id()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weight, 60.0);
        assert_eq!(rows[0].reps, 5);
    }

    #[test]
    fn test_completed_sets_are_read_only() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        engine.complete_set(squat, 0).unwrap();

        let applied = engine
            .set_field(squat, 0, SetField::Weight(Some(100.0)))
            .unwrap();
        assert!(!applied);
        assert_eq!(engine.exercises()[squat].sets[0].weight, Some(60.0));

        // A second completion must not create a duplicate row
        assert!(engine.complete_set(squat, 0).unwrap_err().is_validation());
        assert_eq!(db.series().for_session(engine.session_id()).unwrap().len(), 1);
    }

    #[test]
    fn test_second_completion_supersedes_rest_timer() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        let bench = engine.add_exercise("Bench Press").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        fill(&mut engine, bench, 0, 40.0, 8);

        engine.complete_set(squat, 0).unwrap();
        engine.advance(10);
        engine.complete_set(bench, 0).unwrap();

        assert_eq!(
            engine.rest(),
            Some(ActiveRest {
                exercise: bench,
                remaining: 90
            })
        );
    }

    #[test]
    fn test_rest_timer_clears_at_zero() {
        let db = test_db();
        let user = alice(&db);
        let settings = SessionSettings {
            default_rest_seconds: 3,
        };
        let mut engine = SessionEngine::start(&db, user, None, settings).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        engine.complete_set(squat, 0).unwrap();

        engine.advance(2);
        assert_eq!(engine.rest().map(|r| r.remaining), Some(1));
        engine.tick();
        assert_eq!(engine.rest(), None);
        assert_eq!(engine.elapsed_seconds(), 3);
    }

    #[test]
    fn test_zero_rest_starts_no_timer() {
        let db = test_db();
        let user = alice(&db);
        let settings = SessionSettings {
            default_rest_seconds: 0,
        };
        let mut engine = SessionEngine::start(&db, user, None, settings).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        engine.complete_set(squat, 0).unwrap();
        assert_eq!(engine.rest(), None);
    }

    #[test]
    fn test_delete_completed_set_removes_series() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        engine.add_set(squat).unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        fill(&mut engine, squat, 1, 70.0, 3);
        engine.complete_set(squat, 0).unwrap();
        engine.complete_set(squat, 1).unwrap();

        engine.delete_set(squat, 0).unwrap();
        engine.finish().unwrap();

        let detail = history::get_detail(&db, engine.session_id()).unwrap().unwrap();
        assert_eq!(detail.exercises.len(), 1);
        let weights: Vec<_> = detail.exercises[0].sets.iter().map(|s| s.weight).collect();
        assert_eq!(weights, vec![70.0]);
        assert_eq!(engine.exercises()[squat].sets[0].number, 1);
    }

    #[test]
    fn test_uncomplete_removes_series_row() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);

        assert!(engine.toggle_set(squat, 0).unwrap());
        assert_eq!(db.series().for_session(engine.session_id()).unwrap().len(), 1);

        assert!(!engine.toggle_set(squat, 0).unwrap());
        assert!(db.series().for_session(engine.session_id()).unwrap().is_empty());
        assert!(engine
            .set_field(squat, 0, SetField::Reps(Some(6)))
            .unwrap());

        assert!(!engine.uncomplete_set(squat, 0).unwrap());
    }

    #[test]
    fn test_finish_records_elapsed_duration() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        engine.advance(125);

        assert_eq!(engine.finish().unwrap(), EngineState::Completed);
        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.status, SessionStatus::Completed);
        assert_eq!(row.duration, Some(125));

        // Timers are stopped
        engine.advance(10);
        assert_eq!(engine.elapsed_seconds(), 125);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        engine.complete_set(squat, 0).unwrap();
        engine.advance(30);

        assert_eq!(engine.abandon().unwrap(), EngineState::Abandoned);
        assert_eq!(engine.rest(), None);
        assert_eq!(engine.finish().unwrap(), EngineState::Abandoned);

        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.status, SessionStatus::Cancelled);
        assert_eq!(row.duration, None);

        assert!(matches!(engine.add_exercise("Bench"), Err(Error::SessionClosed)));
        assert!(matches!(engine.add_set(squat), Err(Error::SessionClosed)));
    }

    #[test]
    fn test_invalid_positions_are_reported() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        assert!(matches!(engine.add_set(0), Err(Error::NoSuchExercise(0))));
        let squat = engine.add_exercise("Squat").unwrap();
        assert!(matches!(
            engine.delete_set(squat, 5),
            Err(Error::NoSuchSet { exercise: 0, set: 5 })
        ));
    }

    #[test]
    fn test_failed_write_leaves_set_retryable() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);

        db.execute_batch(
            "CREATE TEMP TRIGGER reject_series BEFORE INSERT ON series
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        let err = engine.complete_set(squat, 0).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(engine.state(), EngineState::Created);
        assert!(!engine.exercises()[squat].sets[0].is_completed());
        assert_eq!(engine.rest(), None);

        db.execute_batch("DROP TRIGGER reject_series;").unwrap();
        engine.complete_set(squat, 0).unwrap();
        assert_eq!(db.series().for_session(engine.session_id()).unwrap().len(), 1);

        assert_eq!(engine.abandon().unwrap(), EngineState::Abandoned);
        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.status, SessionStatus::Cancelled);
    }

    #[test]
    fn test_failed_finish_can_be_retried() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        engine.advance(42);

        db.execute_batch(
            "CREATE TEMP TRIGGER reject_finish BEFORE UPDATE ON sessions
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();
        assert!(matches!(engine.finish(), Err(Error::Storage(_))));
        assert_eq!(engine.state(), EngineState::Created);

        db.execute_batch("DROP TRIGGER reject_finish;").unwrap();
        assert_eq!(engine.finish().unwrap(), EngineState::Completed);
        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.duration, Some(42));
    }

    #[test]
    fn test_completed_set_ignores_invalid_edits() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();
        fill(&mut engine, squat, 0, 60.0, 5);
        engine.complete_set(squat, 0).unwrap();

        assert!(!engine
            .set_field(squat, 0, SetField::Rpe(Some(7.3)))
            .unwrap());
        assert!(!engine
            .set_field(squat, 0, SetField::Weight(Some(-5.0)))
            .unwrap());
        assert_eq!(engine.exercises()[squat].sets[0].rpe, None);
    }

    #[test]
    fn test_oversized_stored_prescription_is_capped() {
        let db = test_db();
        let user = alice(&db);
        let template = db.templates().create(user, "Volume", None).unwrap();
        let squat = db.exercises().get_or_create("Squat").unwrap();
        let prescription = Prescription {
            sets: 4_000_000_000,
            weight: Some(100.0),
            reps: Some(5),
        };
        db.templates()
            .add_exercise(template, squat.id, 1, &prescription, 90)
            .unwrap();

        let engine =
            SessionEngine::start(&db, user, Some(template), SessionSettings::default()).unwrap();
        assert_eq!(engine.exercises()[0].sets.len(), MAX_TARGET_SETS as usize);
    }

    #[test]
    fn test_rpe_must_be_half_steps() {
        let db = test_db();
        let user = alice(&db);
        let mut engine =
            SessionEngine::start(&db, user, None, SessionSettings::default()).unwrap();
        let squat = engine.add_exercise("Squat").unwrap();

        assert!(engine
            .set_field(squat, 0, SetField::Rpe(Some(7.3)))
            .unwrap_err()
            .is_validation());
        assert!(engine
            .set_field(squat, 0, SetField::parse("rpe", "8.5").unwrap())
            .unwrap());
        assert_eq!(engine.exercises()[squat].sets[0].rpe, Some(8.5));
    }

    #[test]
    fn test_start_from_template_lays_out_prescription() {
        let db = test_db();
        let user = alice(&db);
        let mut composer = TemplateComposer::new(&db);
        composer.set_name("Push Day");
        let bench = composer.add_exercise("Bench Press").unwrap();
        composer.set_target_sets(bench, 2).unwrap();
        composer.set_target_weight(bench, Some(80.0)).unwrap();
        composer.set_target_reps(bench, Some(5)).unwrap();
        composer.set_rest_timer(bench, "120").unwrap();
        let template = composer.save(user).unwrap();

        let mut engine =
            SessionEngine::start(&db, user, Some(template), SessionSettings::default()).unwrap();

        let exercise = &engine.exercises()[0];
        assert_eq!(exercise.name, "Bench Press");
        assert_eq!(exercise.rest_seconds, 120);
        assert_eq!(exercise.sets.len(), 2);
        assert_eq!(exercise.sets[1].weight, Some(80.0));
        assert_eq!(exercise.sets[1].reps, Some(5));

        // Adding the same exercise again inherits the template rest
        let again = engine.add_exercise("Bench Press").unwrap();
        assert_eq!(engine.exercises()[again].rest_seconds, 120);
        let other = engine.add_exercise("Dips").unwrap();
        assert_eq!(engine.exercises()[other].rest_seconds, 90);

        let row = db.sessions().get(engine.session_id()).unwrap().unwrap();
        assert_eq!(row.template_id, Some(template));
    }

    #[test]
    fn test_unknown_template_is_rejected_before_writing() {
        let db = test_db();
        let user = alice(&db);
        let result = SessionEngine::start(&db, user, Some(99), SessionSettings::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(db.row_count("sessions").unwrap(), 0);
    }

    #[test]
    fn test_set_field_parse() {
        assert_eq!(
            SetField::parse("weight", "62.5").unwrap(),
            SetField::Weight(Some(62.5))
        );
        assert_eq!(SetField::parse("reps", " ").unwrap(), SetField::Reps(None));
        assert_eq!(
            SetField::parse("kind", "warmup").unwrap(),
            SetField::Kind(SetKind::Warmup)
        );
        assert!(SetField::parse("reps", "five").unwrap_err().is_validation());
        assert!(SetField::parse("tempo", "3-1-1").is_err());
    }
}
