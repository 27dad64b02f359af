//! Template composer.
//!
//! Collects an ordered list of exercises with their prescriptions and rest
//! durations, then saves the template and all of its exercise rows in one
//! transaction. Order indexes are assigned from list position, starting at 1.

use crate::db::Database;
use crate::{
    Error, ExerciseId, Prescription, Result, TemplateId, UserId, DEFAULT_REST_SECONDS,
    DEFAULT_TARGET_SETS, MAX_TARGET_SETS,
};

/// Rest duration from user text; blank or unparsable input gives the default
pub fn parse_rest_timer(text: &str) -> u32 {
    text.trim().parse().unwrap_or(DEFAULT_REST_SECONDS)
}

/// One exercise in a template being composed
#[derive(Clone, Debug, PartialEq)]
pub struct DraftExercise {
    pub exercise_id: ExerciseId,
    pub name: String,
    pub prescription: Prescription,
    pub rest_timer: u32,
}

/// Builds a template before it is saved
pub struct TemplateComposer<'db> {
    db: &'db Database,
    name: String,
    description: Option<String>,
    default_sets: u32,
    exercises: Vec<DraftExercise>,
}

impl<'db> TemplateComposer<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            name: String::new(),
            description: None,
            default_sets: DEFAULT_TARGET_SETS,
            exercises: Vec::new(),
        }
    }

    /// Target set count given to newly added exercises
    pub fn with_default_sets(mut self, sets: u32) -> Self {
        self.default_sets = sets.clamp(1, MAX_TARGET_SETS);
        self
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_description(&mut self, description: Option<&str>) {
        self.description = description.map(str::to_string);
    }

    pub fn exercises(&self) -> &[DraftExercise] {
        &self.exercises
    }

    /// Append an exercise by name, creating it in the catalog if needed
    pub fn add_exercise(&mut self, name: &str) -> Result<usize> {
        let exercise = self.db.exercises().get_or_create(name)?;
        self.exercises.push(DraftExercise {
            exercise_id: exercise.id,
            name: exercise.name,
            prescription: Prescription {
                sets: self.default_sets,
                ..Prescription::default()
            },
            rest_timer: DEFAULT_REST_SECONDS,
        });
        Ok(self.exercises.len() - 1)
    }

    pub fn remove_exercise(&mut self, index: usize) -> Result<DraftExercise> {
        if index >= self.exercises.len() {
            return Err(Error::NoSuchExercise(index));
        }
        Ok(self.exercises.remove(index))
    }

    fn draft_mut(&mut self, index: usize) -> Result<&mut DraftExercise> {
        self.exercises
            .get_mut(index)
            .ok_or(Error::NoSuchExercise(index))
    }

    pub fn set_target_sets(&mut self, index: usize, sets: u32) -> Result<()> {
        if sets == 0 {
            return Err(Error::Validation("A template exercise needs at least one set".into()));
        }
        if sets > MAX_TARGET_SETS {
            return Err(Error::Validation(format!(
                "A template exercise can have at most {} sets, got {}",
                MAX_TARGET_SETS, sets
            )));
        }
        self.draft_mut(index)?.prescription.sets = sets;
        Ok(())
    }

    pub fn set_target_weight(&mut self, index: usize, weight: Option<f64>) -> Result<()> {
        self.draft_mut(index)?.prescription.weight = weight;
        Ok(())
    }

    pub fn set_target_reps(&mut self, index: usize, reps: Option<u32>) -> Result<()> {
        self.draft_mut(index)?.prescription.reps = reps;
        Ok(())
    }

    /// Set the rest duration from user text (see [`parse_rest_timer`])
    pub fn set_rest_timer(&mut self, index: usize, text: &str) -> Result<()> {
        self.draft_mut(index)?.rest_timer = parse_rest_timer(text);
        Ok(())
    }

    /// Save the template and its exercises atomically
    pub fn save(&self, user_id: UserId) -> Result<TemplateId> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Template name must not be empty".into()));
        }

        let template_id = self.db.transaction(|db| {
            let templates = db.templates();
            let template_id = templates.create(user_id, name, self.description.as_deref())?;
            for (position, draft) in self.exercises.iter().enumerate() {
                templates.add_exercise(
                    template_id,
                    draft.exercise_id,
                    position as u32 + 1,
                    &draft.prescription,
                    draft.rest_timer,
                )?;
            }
            Ok(template_id)
        })?;

        tracing::info!(
            "Saved template '{}' ({}) with {} exercises",
            name,
            template_id,
            self.exercises.len()
        );
        Ok(template_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::test_db;

    #[test]
    fn test_push_day_roundtrip_with_default_rest() {
        let db = test_db();
        let user = db.users().create("Alice", "alice@example.com", "pw").unwrap();

        let mut composer = TemplateComposer::new(&db);
        composer.set_name("Push Day");
        composer.add_exercise("Bench Press").unwrap();
        composer.add_exercise("Dips").unwrap();
        let template = composer.save(user).unwrap();

        let slots = db.templates().exercises(template).unwrap();
        let layout: Vec<_> = slots
            .iter()
            .map(|s| (s.exercise_name.as_str(), s.order_index, s.rest_timer))
            .collect();
        assert_eq!(layout, vec![("Bench Press", 1, 90), ("Dips", 2, 90)]);
        assert_eq!(slots[0].prescription.sets, 3);
    }

    #[test]
    fn test_order_follows_list_after_removal() {
        let db = test_db();
        let user = db.users().create("Alice", "alice@example.com", "pw").unwrap();

        let mut composer = TemplateComposer::new(&db);
        composer.set_name("Full Body");
        for name in ["Squat", "Row", "Bench Press", "Curl"] {
            composer.add_exercise(name).unwrap();
        }
        composer.remove_exercise(3).unwrap();
        composer.remove_exercise(1).unwrap();
        let template = composer.save(user).unwrap();

        let layout: Vec<_> = db
            .templates()
            .exercises(template)
            .unwrap()
            .into_iter()
            .map(|s| (s.exercise_name, s.order_index))
            .collect();
        assert_eq!(
            layout,
            vec![("Squat".to_string(), 1), ("Bench Press".to_string(), 2)]
        );
    }

    #[test]
    fn test_prescription_is_persisted() {
        let db = test_db();
        let user = db.users().create("Alice", "alice@example.com", "pw").unwrap();

        let mut composer = TemplateComposer::new(&db).with_default_sets(4);
        composer.set_name("Legs");
        composer.set_description(Some("Heavy"));
        let squat = composer.add_exercise("Squat").unwrap();
        composer.set_target_weight(squat, Some(100.0)).unwrap();
        composer.set_target_reps(squat, Some(5)).unwrap();
        composer.set_rest_timer(squat, "180").unwrap();
        let template = composer.save(user).unwrap();

        let slot = &db.templates().exercises(template).unwrap()[0];
        assert_eq!(
            slot.prescription,
            Prescription {
                sets: 4,
                weight: Some(100.0),
                reps: Some(5)
            }
        );
        assert_eq!(slot.rest_timer, 180);
        assert_eq!(
            db.templates().get(template).unwrap().unwrap().description.as_deref(),
            Some("Heavy")
        );
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let db = test_db();
        let user = db.users().create("Alice", "alice@example.com", "pw").unwrap();

        let mut composer = TemplateComposer::new(&db);
        composer.set_name("   ");
        composer.add_exercise("Squat").unwrap();
        assert!(composer.save(user).unwrap_err().is_validation());
        assert_eq!(db.row_count("templates").unwrap(), 0);
    }

    #[test]
    fn test_failed_save_leaves_no_orphans() {
        let db = test_db();
        let user = db.users().create("Alice", "alice@example.com", "pw").unwrap();

        let mut composer = TemplateComposer::new(&db);
        composer.set_name("Broken");
        composer.add_exercise("Squat").unwrap();
        composer.exercises[0].exercise_id = 9999; // violates the foreign key

        assert!(composer.save(user).is_err());
        assert_eq!(db.row_count("templates").unwrap(), 0);
        assert_eq!(db.row_count("template_exercises").unwrap(), 0);
    }

    #[test]
    fn test_target_sets_are_bounded() {
        let db = test_db();
        let mut composer = TemplateComposer::new(&db).with_default_sets(1000);
        let squat = composer.add_exercise("Squat").unwrap();
        assert_eq!(composer.exercises()[squat].prescription.sets, MAX_TARGET_SETS);

        assert!(composer.set_target_sets(squat, 0).unwrap_err().is_validation());
        assert!(composer
            .set_target_sets(squat, 4_000_000_000)
            .unwrap_err()
            .is_validation());
        assert_eq!(composer.exercises()[squat].prescription.sets, MAX_TARGET_SETS);

        composer.set_target_sets(squat, 5).unwrap();
        assert_eq!(composer.exercises()[squat].prescription.sets, 5);
    }

    #[test]
    fn test_rest_timer_parsing() {
        assert_eq!(parse_rest_timer("60"), 60);
        assert_eq!(parse_rest_timer(" 0 "), 0);
        assert_eq!(parse_rest_timer(""), 90);
        assert_eq!(parse_rest_timer("1m30"), 90);
    }
}
