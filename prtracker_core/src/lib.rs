#![forbid(unsafe_code)]

//! Core domain model and business logic for the PR Tracker workout log.
//!
//! This crate provides:
//! - Domain types (users, exercises, templates, sessions, series)
//! - SQLite storage with versioned schema migrations
//! - Repositories over each table
//! - Session engine with elapsed and rest timers
//! - Template composer
//! - History aggregation and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod db;
pub mod repo;
pub mod timer;
pub mod session;
pub mod composer;
pub mod history;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use db::{ensure_schema, Database, MigrationReport};
pub use session::{EngineState, SessionEngine, SessionSettings, SetField};
pub use composer::TemplateComposer;
pub use history::{SessionDetail, SessionSummary};
