//! Schema creation and forward migrations.
//!
//! [`ensure_schema`] runs on every process start:
//! 1. Every base table is created if absent (fatal on failure).
//! 2. An ordered list of versioned steps upgrades stores created by older
//!    releases. Applied steps are recorded in `schema_migrations` and skipped
//!    afterwards; each step also inspects the live columns, so re-running one
//!    is harmless.
//!
//! A failing step is logged and reported but does not abort startup. The base
//! tables already exist at that point, so the application keeps working with
//! whatever shape the store reached.

use super::{schema, Database};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::params;

/// Owner assigned to templates that predate the `user_id` column
pub const LEGACY_TEMPLATE_OWNER: i64 = 1;

/// One forward migration
pub struct MigrationStep {
    pub version: i64,
    pub name: &'static str,
    apply: fn(&Database, &mut MigrationReport) -> Result<()>,
}

/// Migration steps in the order they must run
pub const STEPS: &[MigrationStep] = &[
    MigrationStep {
        version: 1,
        name: "templates_owner",
        apply: add_template_owner,
    },
    MigrationStep {
        version: 2,
        name: "template_exercises_rest_timer",
        apply: add_rest_timer,
    },
    MigrationStep {
        version: 3,
        name: "sessions_duration",
        apply: add_session_duration,
    },
];

/// Outcome of a schema-ensure run
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Steps executed during this run
    pub applied: Vec<&'static str>,
    /// Steps already recorded as applied
    pub skipped: Vec<&'static str>,
    /// Steps that failed, with the error message
    pub failed: Vec<(&'static str, String)>,
    /// Data-quality compromises the operator should review
    pub warnings: Vec<String>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.warnings.is_empty()
    }
}

/// Create missing tables and apply pending migration steps
pub fn ensure_schema(db: &Database) -> Result<MigrationReport> {
    for table in schema::TABLES {
        db.execute_batch(table.create_sql)
            .map_err(|e| Error::Migration(format!("creating table {}: {}", table.name, e)))?;
        tracing::debug!("Table {} OK", table.name);
    }

    let report = run_steps(db, STEPS);

    if !report.failed.is_empty() {
        tracing::error!(
            "{} migration step(s) failed; continuing with partial schema",
            report.failed.len()
        );
    }

    Ok(report)
}

fn run_steps(db: &Database, steps: &[MigrationStep]) -> MigrationReport {
    let mut report = MigrationReport::default();

    for step in steps {
        match is_applied(db, step.version) {
            Ok(true) => {
                tracing::debug!("Migration {} already applied, skipping", step.name);
                report.skipped.push(step.name);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Unable to read migration ledger for {}: {}", step.name, e);
                report.failed.push((step.name, e.to_string()));
                continue;
            }
        }

        let outcome = db.transaction(|db| {
            (step.apply)(db, &mut report)?;
            db.insert(
                "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
                params![step.version, step.name, Utc::now()],
            )?;
            Ok(())
        });

        match outcome {
            Ok(()) => {
                tracing::info!("Migration {} applied", step.name);
                report.applied.push(step.name);
            }
            Err(e) => {
                tracing::error!("Error during migration {}: {}", step.name, e);
                report.failed.push((step.name, e.to_string()));
            }
        }
    }

    report
}

fn is_applied(db: &Database, version: i64) -> Result<bool> {
    let found: Option<i64> = db.query_one(
        "SELECT version FROM schema_migrations WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;
    Ok(found.is_some())
}

fn has_column(db: &Database, table: &str, column: &str) -> Result<bool> {
    Ok(db.table_columns(table)?.iter().any(|c| c == column))
}

fn add_template_owner(db: &Database, report: &mut MigrationReport) -> Result<()> {
    if has_column(db, schema::TEMPLATES.name, "user_id")? {
        return Ok(());
    }

    if db.row_count(schema::TEMPLATES.name)? == 0 {
        tracing::info!("Recreating empty templates table with owner column");
        db.execute_batch("DROP TABLE IF EXISTS templates")?;
        db.execute_batch(schema::TEMPLATES.create_sql)?;
        return Ok(());
    }

    db.execute_batch(&format!(
        "ALTER TABLE templates ADD COLUMN user_id INTEGER DEFAULT {}",
        LEGACY_TEMPLATE_OWNER
    ))?;
    let warning = format!(
        "Existing templates assigned to user_id={}; verify template owners",
        LEGACY_TEMPLATE_OWNER
    );
    tracing::warn!("{}", warning);
    report.warnings.push(warning);
    Ok(())
}

fn add_rest_timer(db: &Database, _report: &mut MigrationReport) -> Result<()> {
    if has_column(db, schema::TEMPLATE_EXERCISES.name, "rest_timer")? {
        return Ok(());
    }
    tracing::info!("Adding rest_timer column to template_exercises");
    db.execute_batch(&format!(
        "ALTER TABLE template_exercises ADD COLUMN rest_timer INTEGER DEFAULT {}",
        crate::DEFAULT_REST_SECONDS
    ))
}

fn add_session_duration(db: &Database, _report: &mut MigrationReport) -> Result<()> {
    if has_column(db, schema::SESSIONS.name, "duration")? {
        return Ok(());
    }
    tracing::info!("Adding duration column to sessions");
    db.execute_batch("ALTER TABLE sessions ADD COLUMN duration INTEGER")
}
