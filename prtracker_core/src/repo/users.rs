//! User accounts and email/password authentication.

use crate::db::{Database, FromRow};
use crate::{Result, User, UserId};
use rusqlite::{params, Row};
use sha2::{Digest, Sha256};

/// One-way digest of a password: lowercase hex SHA-256
pub fn digest_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
        })
    }
}

pub struct UserRepo<'db> {
    db: &'db Database,
}

impl<'db> UserRepo<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Register a user, storing only the password digest
    ///
    /// A duplicate email fails with the UNIQUE constraint as a storage error.
    pub fn create(&self, name: &str, email: &str, password: &str) -> Result<UserId> {
        let id = self.db.insert(
            "INSERT INTO users (name, email, password_hash) VALUES (?1, ?2, ?3)",
            params![name, email, digest_password(password)],
        )?;
        tracing::info!("Created user {}", id);
        Ok(id)
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>> {
        self.db
            .query_one("SELECT * FROM users WHERE id = ?1", [id], User::from_row)
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db
            .query_one("SELECT * FROM users WHERE email = ?1", [email], User::from_row)
    }

    /// Return the user only if the email exists and the password digest matches
    ///
    /// An unknown email and a wrong password both yield `None`.
    pub fn login(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = match self.get_by_email(email)? {
            Some(user) => user,
            None => return Ok(None),
        };

        if user.password_hash == digest_password(password) {
            Ok(Some(user))
        } else {
            tracing::debug!("Password mismatch for user {}", user.id);
            Ok(None)
        }
    }
}
