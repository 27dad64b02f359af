//! Exercise catalog.
//!
//! The catalog grows organically: the first time a user types a new exercise
//! name it is created, afterwards the existing row is reused by name.

use crate::db::{Database, FromRow};
use crate::{Error, Exercise, ExerciseId, Result};
use rusqlite::{params, Row};

impl FromRow for Exercise {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            description: row.get("description")?,
            image: row.get("image")?,
        })
    }
}

pub struct ExerciseRepo<'db> {
    db: &'db Database,
}

impl<'db> ExerciseRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
        image: Option<&str>,
    ) -> Result<ExerciseId> {
        let id = self.db.insert(
            "INSERT INTO exercises (name, category, description, image) VALUES (?1, ?2, ?3, ?4)",
            params![name, category, description, image],
        )?;
        tracing::debug!("Created exercise {} ({})", name, id);
        Ok(id)
    }

    pub fn get(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        self.db
            .query_one("SELECT * FROM exercises WHERE id = ?1", [id], Exercise::from_row)
    }

    /// First exercise with exactly this name
    pub fn get_by_name(&self, name: &str) -> Result<Option<Exercise>> {
        self.db.query_one(
            "SELECT * FROM exercises WHERE name = ?1 ORDER BY id LIMIT 1",
            [name],
            Exercise::from_row,
        )
    }

    /// Resolve an exercise by name, creating it if the catalog lacks it
    pub fn get_or_create(&self, name: &str) -> Result<Exercise> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Exercise name must not be empty".into()));
        }

        if let Some(existing) = self.get_by_name(name)? {
            return Ok(existing);
        }

        let id = self.create(name, None, None, None)?;
        tracing::info!("Added new exercise '{}' to catalog", name);
        Ok(Exercise {
            id,
            name: name.to_string(),
            category: None,
            description: None,
            image: None,
        })
    }

    /// All exercises ordered by name
    pub fn list(&self) -> Result<Vec<Exercise>> {
        self.db.query_all(
            "SELECT * FROM exercises ORDER BY name, id",
            [],
            Exercise::from_row,
        )
    }

    /// Overwrite every descriptive field; returns false if the id is unknown
    pub fn update(&self, exercise: &Exercise) -> Result<bool> {
        let changed = self.db.execute(
            "UPDATE exercises SET name = ?1, category = ?2, description = ?3, image = ?4 WHERE id = ?5",
            params![
                exercise.name,
                exercise.category,
                exercise.description,
                exercise.image,
                exercise.id
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete an exercise; fails while series still reference it
    pub fn delete(&self, id: ExerciseId) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM exercises WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::repo::test_db;

    #[test]
    fn test_get_or_create_reuses_by_name() {
        let db = test_db();
        let first = db.exercises().get_or_create("Squat").unwrap();
        let second = db.exercises().get_or_create("  Squat ").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.exercises().list().unwrap().len(), 1);
    }

    #[test]
    fn test_get_or_create_rejects_blank_names() {
        let db = test_db();
        let err = db.exercises().get_or_create("   ").unwrap_err();
        assert!(err.is_validation());
        assert!(db.exercises().list().unwrap().is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_name() {
        let db = test_db();
        for name in ["Squat", "Bench Press", "Deadlift"] {
            db.exercises().create(name, None, None, None).unwrap();
        }
        let names: Vec<_> = db
            .exercises()
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Bench Press", "Deadlift", "Squat"]);
    }

    #[test]
    fn test_update_and_delete() {
        let db = test_db();
        let id = db
            .exercises()
            .create("Dips", Some("push"), None, None)
            .unwrap();

        let mut exercise = db.exercises().get(id).unwrap().unwrap();
        assert_eq!(exercise.category.as_deref(), Some("push"));
        exercise.description = Some("Parallel bars".into());
        assert!(db.exercises().update(&exercise).unwrap());
        assert_eq!(
            db.exercises().get(id).unwrap().unwrap().description.as_deref(),
            Some("Parallel bars")
        );

        assert!(db.exercises().delete(id).unwrap());
        assert!(db.exercises().get(id).unwrap().is_none());
        assert!(!db.exercises().delete(id).unwrap());
    }
}
