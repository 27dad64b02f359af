//! Canonical table definitions.
//!
//! Every statement is `CREATE TABLE IF NOT EXISTS`, so applying the whole list
//! to an existing store never touches populated tables.

/// A table and the statement that creates it in its current shape
pub struct TableDef {
    pub name: &'static str,
    pub create_sql: &'static str,
}

pub const USERS: TableDef = TableDef {
    name: "users",
    create_sql: "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
};

pub const EXERCISES: TableDef = TableDef {
    name: "exercises",
    create_sql: "CREATE TABLE IF NOT EXISTS exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT,
        description TEXT,
        image TEXT
    )",
};

pub const TEMPLATES: TableDef = TableDef {
    name: "templates",
    create_sql: "CREATE TABLE IF NOT EXISTS templates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )",
};

pub const TEMPLATE_EXERCISES: TableDef = TableDef {
    name: "template_exercises",
    create_sql: "CREATE TABLE IF NOT EXISTS template_exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id INTEGER NOT NULL,
        exercise_id INTEGER NOT NULL,
        order_index INTEGER,
        prescription TEXT,
        rest_timer INTEGER DEFAULT 90,
        FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE CASCADE,
        FOREIGN KEY (exercise_id) REFERENCES exercises(id) ON DELETE CASCADE
    )",
};

pub const SESSIONS: TableDef = TableDef {
    name: "sessions",
    create_sql: "CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        template_id INTEGER,
        date DATETIME NOT NULL,
        status TEXT NOT NULL DEFAULT 'in_progress'
            CHECK(status IN ('in_progress', 'completed', 'cancelled')),
        duration INTEGER,
        FOREIGN KEY (user_id) REFERENCES users(id),
        FOREIGN KEY (template_id) REFERENCES templates(id) ON DELETE SET NULL
    )",
};

pub const SERIES: TableDef = TableDef {
    name: "series",
    create_sql: "CREATE TABLE IF NOT EXISTS series (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL,
        exercise_id INTEGER NOT NULL,
        weight REAL NOT NULL,
        reps INTEGER NOT NULL CHECK(reps >= 0),
        rpe REAL,
        type TEXT NOT NULL DEFAULT 'normal'
            CHECK(type IN ('warmup', 'normal', 'failure', 'personal_record', 'dropset')),
        note TEXT,
        FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
        FOREIGN KEY (exercise_id) REFERENCES exercises(id)
    )",
};

pub const WEIGHT_LOGS: TableDef = TableDef {
    name: "weight_logs",
    create_sql: "CREATE TABLE IF NOT EXISTS weight_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        date DATETIME NOT NULL,
        weight REAL NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )",
};

/// Ledger of applied migration steps
pub const SCHEMA_MIGRATIONS: TableDef = TableDef {
    name: "schema_migrations",
    create_sql: "CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at DATETIME NOT NULL
    )",
};

/// Tables in creation order (referenced tables first)
pub const TABLES: &[TableDef] = &[
    USERS,
    EXERCISES,
    TEMPLATES,
    TEMPLATE_EXERCISES,
    SESSIONS,
    SERIES,
    WEIGHT_LOGS,
    SCHEMA_MIGRATIONS,
];
