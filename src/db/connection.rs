// src/db/connection.rs
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::cell::RefCell;
use std::time::Duration;

use crate::errors::ServerError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, remembered together with the path it was
// opened for so two databases on one thread never share a handle.
thread_local! {
    static DB_CONN: RefCell<Option<(String, Connection)>> = RefCell::new(None);
}

#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn open(&self) -> Result<Connection, ServerError> {
        let conn = Connection::open(&self.path)
            .map_err(|e| ServerError::DbError(format!("Open DB failed: {e}")))?;
        // Per-connection settings.
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ServerError::DbError(format!("enable foreign keys failed: {e}")))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| ServerError::DbError(format!("set busy timeout failed: {e}")))?;
        register_functions(&conn)?;
        tracing::debug!(path = %self.path, "opened sqlite connection");
        Ok(conn)
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ServerError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                let stale = !matches!(&*slot, Some((path, _)) if *path == self.path);
                if stale {
                    *slot = Some((self.path.clone(), self.open()?));
                }
                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(ServerError::InternalError),
                }
            })
            .map_err(|_| ServerError::InternalError)?
    }
}

/// SQLite's `lower()` only folds ASCII; text filters use this instead.
fn register_functions(conn: &Connection) -> Result<(), ServerError> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(|e| ServerError::DbError(format!("register unicode_lower failed: {e}")))
}

/// Applies the bundled schema. Safe to run on every start.
pub fn init_db(db: &Database) -> Result<(), ServerError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| ServerError::DbError(format!("Failed to apply schema: {e}")))
    })?;

    tracing::info!(path = %db.path(), "database schema applied");
    Ok(())
}
