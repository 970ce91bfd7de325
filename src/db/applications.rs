// src/db/applications.rs
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::models::{Application, NewApplication};
use crate::errors::ServerError;

pub(crate) const APPLICATION_COLUMNS: &str = "a.id, a.name, a.description, a.owner_id, a.created_at";

/// Reads the five `APPLICATION_COLUMNS` starting at `offset`.
pub(crate) fn application_from_row(r: &Row<'_>, offset: usize) -> rusqlite::Result<Application> {
    Ok(Application {
        id: r.get(offset)?,
        name: r.get(offset + 1)?,
        description: r.get(offset + 2)?,
        owner_id: r.get(offset + 3)?,
        created_at: r.get(offset + 4)?,
    })
}

pub fn create_application(
    conn: &Connection,
    new: &NewApplication,
    now: NaiveDateTime,
) -> Result<Application, ServerError> {
    conn.execute(
        "insert into applications (name, description, owner_id, created_at) values (?, ?, ?, ?)",
        params![new.name.trim(), new.description, new.owner_id, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert application failed: {e}")))?;

    let id = conn.last_insert_rowid();
    get_application(conn, id)?
        .ok_or_else(|| ServerError::DbError(format!("application {id} vanished after insert")))
}

pub fn get_application(conn: &Connection, id: i64) -> Result<Option<Application>, ServerError> {
    conn.query_row(
        &format!("select {APPLICATION_COLUMNS} from applications a where a.id = ?"),
        params![id],
        |r| application_from_row(r, 0),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select application failed: {e}")))
}

pub fn list_applications(conn: &Connection) -> Result<Vec<Application>, ServerError> {
    let mut stmt = conn
        .prepare(&format!(
            "select {APPLICATION_COLUMNS} from applications a order by a.name, a.id"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], |r| application_from_row(r, 0))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
