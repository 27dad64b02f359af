//! Templates and their ordered exercise slots.

use crate::db::{Database, FromRow};
use crate::{
    ExerciseId, Prescription, Result, Template, TemplateExercise, TemplateExerciseId, TemplateId,
    UserId, DEFAULT_REST_SECONDS,
};
use rusqlite::{params, Row};

impl FromRow for Template {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
        })
    }
}

impl FromRow for TemplateExercise {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let payload: Option<String> = row.get("prescription")?;
        let prescription = match payload {
            Some(payload) => Prescription::decode(&payload).unwrap_or_else(|e| {
                tracing::warn!("Unreadable prescription payload {:?}: {}", payload, e);
                Prescription::default()
            }),
            None => Prescription::default(),
        };
        let rest_timer: Option<u32> = row.get("rest_timer")?;

        Ok(Self {
            id: row.get("id")?,
            template_id: row.get("template_id")?,
            exercise_id: row.get("exercise_id")?,
            exercise_name: row.get("exercise_name")?,
            order_index: row.get::<_, Option<u32>>("order_index")?.unwrap_or(0),
            prescription,
            rest_timer: rest_timer.unwrap_or(DEFAULT_REST_SECONDS),
        })
    }
}

pub struct TemplateRepo<'db> {
    db: &'db Database,
}

impl<'db> TemplateRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        user_id: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<TemplateId> {
        self.db.insert(
            "INSERT INTO templates (user_id, name, description) VALUES (?1, ?2, ?3)",
            params![user_id, name, description],
        )
    }

    pub fn get(&self, id: TemplateId) -> Result<Option<Template>> {
        self.db
            .query_one("SELECT * FROM templates WHERE id = ?1", [id], Template::from_row)
    }

    /// Templates owned by `user_id`, ordered by name
    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<Template>> {
        self.db.query_all(
            "SELECT * FROM templates WHERE user_id = ?1 ORDER BY name, id",
            [user_id],
            Template::from_row,
        )
    }

    pub fn update(&self, id: TemplateId, name: &str, description: Option<&str>) -> Result<bool> {
        let changed = self.db.execute(
            "UPDATE templates SET name = ?1, description = ?2 WHERE id = ?3",
            params![name, description, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a template; its exercise slots go with it
    pub fn delete(&self, id: TemplateId) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM templates WHERE id = ?1", [id])?;
        if changed > 0 {
            tracing::info!("Deleted template {}", id);
        }
        Ok(changed > 0)
    }

    pub fn add_exercise(
        &self,
        template_id: TemplateId,
        exercise_id: ExerciseId,
        order_index: u32,
        prescription: &Prescription,
        rest_timer: u32,
    ) -> Result<TemplateExerciseId> {
        self.db.insert(
            "INSERT INTO template_exercises (template_id, exercise_id, order_index, prescription, rest_timer)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                template_id,
                exercise_id,
                order_index,
                prescription.encode()?,
                rest_timer
            ],
        )
    }

    /// Exercise slots of a template with exercise names, in order
    pub fn exercises(&self, template_id: TemplateId) -> Result<Vec<TemplateExercise>> {
        self.db.query_all(
            "SELECT te.*, e.name AS exercise_name
             FROM template_exercises te
             JOIN exercises e ON te.exercise_id = e.id
             WHERE te.template_id = ?1
             ORDER BY te.order_index, te.id",
            [template_id],
            TemplateExercise::from_row,
        )
    }

    pub fn exercise_count(&self, template_id: TemplateId) -> Result<usize> {
        let count: Option<i64> = self.db.query_one(
            "SELECT COUNT(*) FROM template_exercises WHERE template_id = ?1",
            [template_id],
            |row| row.get(0),
        )?;
        Ok(count.unwrap_or(0) as usize)
    }

    pub fn remove_exercise(&self, id: TemplateExerciseId) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM template_exercises WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}
