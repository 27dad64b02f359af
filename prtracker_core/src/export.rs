//! CSV export of completed workouts.
//!
//! The file is written to a temporary sibling and renamed into place, so a
//! failed export never leaves a truncated CSV behind.

use crate::db::Database;
use crate::history::{self, format_duration};
use crate::{Result, UserId};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    session_id: i64,
    date: String,
    duration: String,
    exercise: &'a str,
    set: String,
    weight: f64,
    reps: u32,
    rpe: Option<f64>,
    kind: &'static str,
    note: Option<&'a str>,
}

/// Write one row per series of every completed session, oldest session first
///
/// Returns the number of rows written. An existing file at `path` is
/// replaced.
pub fn sessions_to_csv(db: &Database, user_id: UserId, path: &Path) -> Result<usize> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(temp);

    let mut summaries = history::list_completed(db, user_id)?;
    summaries.reverse();

    let mut written = 0;
    for summary in &summaries {
        let detail = match history::get_detail(db, summary.session.id)? {
            Some(detail) => detail,
            None => continue,
        };
        let date = detail.session.started_at.to_rfc3339();
        let duration = format_duration(detail.session.duration);

        for group in &detail.exercises {
            for (index, series) in group.sets.iter().enumerate() {
                writer.serialize(CsvRow {
                    session_id: detail.session.id,
                    date: date.clone(),
                    duration: duration.clone(),
                    exercise: &group.name,
                    set: series.kind.label(index + 1),
                    weight: series.weight,
                    reps: series.reps,
                    rpe: series.rpe,
                    kind: series.kind.as_str(),
                    note: series.note.as_deref(),
                })?;
                written += 1;
            }
        }
    }

    // Flush and sync before the rename makes the file visible
    writer.flush()?;
    let mut temp = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    tracing::info!("Exported {} series to {:?}", written, path);
    Ok(written)
}
