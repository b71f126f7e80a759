//! # Database State
//!
//! Wraps the `Database` handle for the register commands.
//!
//! `Database` holds a `SqlitePool` and the change feed, both thread-safe, so
//! commands share it without extra locking.

use duka_db::Database;

#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}
