//! Entity repositories.
//!
//! Each repository is a thin, synchronous accessor over one entity family.
//! Repositories validate nothing beyond what the schema enforces; the session
//! engine and template composer own domain validation.

pub mod exercises;
pub mod sessions;
pub mod templates;
pub mod users;
pub mod weight_logs;

pub use exercises::ExerciseRepo;
pub use sessions::{SeriesRepo, SessionRepo};
pub use templates::TemplateRepo;
pub use users::{digest_password, UserRepo};
pub use weight_logs::WeightLogRepo;

use crate::db::Database;

impl Database {
    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(self)
    }

    pub fn exercises(&self) -> ExerciseRepo<'_> {
        ExerciseRepo::new(self)
    }

    pub fn templates(&self) -> TemplateRepo<'_> {
        TemplateRepo::new(self)
    }

    pub fn sessions(&self) -> SessionRepo<'_> {
        SessionRepo::new(self)
    }

    pub fn series(&self) -> SeriesRepo<'_> {
        SeriesRepo::new(self)
    }

    pub fn weight_logs(&self) -> WeightLogRepo<'_> {
        WeightLogRepo::new(self)
    }
}

/// In-memory database with the full schema, for tests
#[cfg(test)]
pub(crate) fn test_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    crate::db::ensure_schema(&db).unwrap();
    db
}
