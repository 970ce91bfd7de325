// src/db/users.rs
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::models::User;
use crate::domain::status::Role;
use crate::errors::ServerError;

const USER_COLUMNS: &str = "id, name, email, role, created_at";

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        role: r.get(3)?,
        created_at: r.get(4)?,
    })
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>, ServerError> {
    conn.query_row(
        &format!("select {USER_COLUMNS} from users where id = ?"),
        params![id],
        user_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select user failed: {e}")))
}

pub fn find_user_by_name(conn: &Connection, name: &str) -> Result<Option<User>, ServerError> {
    conn.query_row(
        &format!("select {USER_COLUMNS} from users where name = ?"),
        params![name],
        user_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select user by name failed: {e}")))
}

/// Insert the user if the name is new, then return the stored row. The role
/// only applies on creation; an existing user keeps theirs.
pub fn get_or_create_user(
    conn: &Connection,
    name: &str,
    role: Role,
    now: NaiveDateTime,
) -> Result<User, ServerError> {
    conn.execute(
        "insert or ignore into users (name, role, created_at) values (?, ?, ?)",
        params![name, role, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert user failed: {e}")))?;

    find_user_by_name(conn, name)?
        .ok_or_else(|| ServerError::DbError(format!("user '{name}' vanished after insert")))
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, ServerError> {
    let mut stmt = conn
        .prepare(&format!("select {USER_COLUMNS} from users order by name"))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map([], user_from_row)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
