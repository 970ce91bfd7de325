// src/db/validations.rs
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::db::applications::{application_from_row, APPLICATION_COLUMNS};
use crate::db::change_requests::{change_request_from_row, CHANGE_REQUEST_COLUMNS};
use crate::domain::models::{OwnerAssignment, OwnerRef, ValidationRecord, ValidationUpdate};
use crate::domain::status::Side;
use crate::errors::ServerError;

pub(crate) const RECORD_COLUMNS: &str = "x.change_request_id, x.application_id, \
     x.pre_status, x.post_status, x.pre_comments, x.post_comments, \
     x.pre_attachments, x.post_attachments, x.pre_updated_at, x.post_updated_at, x.created_at";

/// Number of columns in `RECORD_COLUMNS`.
pub(crate) const RECORD_WIDTH: usize = 11;

fn attachments_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = r.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn attachments_json(ids: &[String]) -> Result<String, ServerError> {
    serde_json::to_string(ids)
        .map_err(|e| ServerError::DbError(format!("encode attachments failed: {e}")))
}

/// Reads `RECORD_COLUMNS` starting at `offset`.
pub(crate) fn record_from_row(r: &Row<'_>, offset: usize) -> rusqlite::Result<ValidationRecord> {
    Ok(ValidationRecord {
        change_request_id: r.get(offset)?,
        application_id: r.get(offset + 1)?,
        pre_status: r.get(offset + 2)?,
        post_status: r.get(offset + 3)?,
        pre_comments: r.get(offset + 4)?,
        post_comments: r.get(offset + 5)?,
        pre_attachments: attachments_at(r, offset + 6)?,
        post_attachments: attachments_at(r, offset + 7)?,
        pre_updated_at: r.get(offset + 8)?,
        post_updated_at: r.get(offset + 9)?,
        created_at: r.get(offset + 10)?,
    })
}

/// Optional `(id, name, email)` triple from a left join.
pub(crate) fn user_ref_at(r: &Row<'_>, offset: usize) -> rusqlite::Result<Option<OwnerRef>> {
    let id: Option<i64> = r.get(offset)?;
    match id {
        Some(id) => Ok(Some(OwnerRef {
            id,
            name: r.get(offset + 1)?,
            email: r.get(offset + 2)?,
        })),
        None => Ok(None),
    }
}

/// Attach applications with fresh pending/pending records.
///
/// Runs in one transaction: either every application is attached or none.
/// - change request must exist (`NotFound`)
/// - every application must exist (`NotFound`)
/// - no application may already be attached (`Conflict`)
pub fn attach_applications(
    conn: &mut Connection,
    change_request_id: i64,
    application_ids: &[i64],
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

    attach_in_tx(&tx, change_request_id, application_ids, now)?;

    tx.commit()
        .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

    tracing::info!(
        change_request_id,
        count = application_ids.len(),
        "applications attached"
    );
    Ok(())
}

/// Checks and inserts for `attach_applications`, on a transaction the
/// caller owns and commits.
pub(crate) fn attach_in_tx(
    tx: &Connection,
    change_request_id: i64,
    application_ids: &[i64],
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    let exists = tx
        .query_row(
            "select 1 from change_requests where id = ?",
            params![change_request_id],
            |_| Ok(()),
        )
        .optional()
        .map_err(|e| ServerError::DbError(format!("select change request failed: {e}")))?;
    if exists.is_none() {
        return Err(ServerError::NotFound(format!(
            "change request {change_request_id}"
        )));
    }

    for &application_id in application_ids {
        let app = tx
            .query_row(
                "select 1 from applications where id = ?",
                params![application_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| ServerError::DbError(format!("select application failed: {e}")))?;
        if app.is_none() {
            return Err(ServerError::NotFound(format!("application {application_id}")));
        }

        let attached = tx
            .query_row(
                "select 1 from change_request_applications
                 where change_request_id = ? and application_id = ?",
                params![change_request_id, application_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| ServerError::DbError(format!("select attachment failed: {e}")))?;
        if attached.is_some() {
            return Err(ServerError::Conflict(format!(
                "application {application_id} is already attached to change request {change_request_id}"
            )));
        }

        tx.execute(
            "insert into change_request_applications (change_request_id, application_id, created_at)
             values (?, ?, ?)",
            params![change_request_id, application_id, now],
        )
        .map_err(|e| ServerError::DbError(format!("insert validation record failed: {e}")))?;
    }

    tx.execute(
        "update change_requests set updated_at = ? where id = ?",
        params![now, change_request_id],
    )
    .map_err(|e| ServerError::DbError(format!("touch change request failed: {e}")))?;

    Ok(())
}

/// Apply an owner's update to one side of a record.
///
/// The owner check and the write share one immediate transaction, and the
/// UPDATE itself repeats the ownership guard so a reassigned application
/// can never be written by its previous owner.
pub fn update_validation(
    conn: &mut Connection,
    change_request_id: i64,
    application_id: i64,
    caller_id: i64,
    update: &ValidationUpdate,
    now: NaiveDateTime,
) -> Result<(), ServerError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

    let current = tx
        .query_row(
            &format!(
                "select {RECORD_COLUMNS}, a.owner_id
                 from change_request_applications x
                 join applications a on a.id = x.application_id
                 where x.change_request_id = ? and x.application_id = ?"
            ),
            params![change_request_id, application_id],
            |r| Ok((record_from_row(r, 0)?, r.get::<_, Option<i64>>(RECORD_WIDTH)?)),
        )
        .optional()
        .map_err(|e| ServerError::DbError(format!("select validation record failed: {e}")))?;

    let Some((mut record, owner_id)) = current else {
        return Err(ServerError::NotFound(format!(
            "application {application_id} on change request {change_request_id}"
        )));
    };
    if owner_id != Some(caller_id) {
        return Err(ServerError::Forbidden(format!(
            "user {caller_id} does not own application {application_id}"
        )));
    }

    record.apply(update, now);

    let (sql, status, comments, attachments, updated_at) = match update.side {
        Side::Pre => (
            "update change_request_applications
             set pre_status = ?, pre_comments = ?, pre_attachments = ?, pre_updated_at = ?
             where change_request_id = ? and application_id = ?
               and exists (select 1 from applications where id = ? and owner_id = ?)",
            record.pre_status,
            &record.pre_comments,
            attachments_json(&record.pre_attachments)?,
            record.pre_updated_at,
        ),
        Side::Post => (
            "update change_request_applications
             set post_status = ?, post_comments = ?, post_attachments = ?, post_updated_at = ?
             where change_request_id = ? and application_id = ?
               and exists (select 1 from applications where id = ? and owner_id = ?)",
            record.post_status,
            &record.post_comments,
            attachments_json(&record.post_attachments)?,
            record.post_updated_at,
        ),
    };

    let updated = tx
        .execute(
            sql,
            params![
                status,
                comments,
                attachments,
                updated_at,
                change_request_id,
                application_id,
                application_id,
                caller_id
            ],
        )
        .map_err(|e| ServerError::DbError(format!("update validation record failed: {e}")))?;

    if updated != 1 {
        return Err(ServerError::Forbidden(format!(
            "user {caller_id} does not own application {application_id}"
        )));
    }

    tx.commit()
        .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

    tracing::info!(
        change_request_id,
        application_id,
        side = %update.side,
        status = %update.status,
        "validation updated"
    );
    Ok(())
}

/// Work list for one owner: records of their applications in active change
/// requests, soonest window first.
pub fn records_for_owner(
    conn: &Connection,
    owner_id: i64,
) -> Result<Vec<OwnerAssignment>, ServerError> {
    let sql = format!(
        "select {RECORD_COLUMNS}, {APPLICATION_COLUMNS}, {CHANGE_REQUEST_COLUMNS},
                m.id, m.name, m.email
         from change_request_applications x
         join applications a on a.id = x.application_id
         join change_requests cr on cr.id = x.change_request_id
         left join users m on m.id = cr.manager_id
         where a.owner_id = ? and cr.status = 'active'
         order by cr.start_time asc, cr.id asc, a.name asc"
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let app_at = RECORD_WIDTH;
    let cr_at = app_at + 5;
    let manager_at = cr_at + 11;

    let rows = stmt
        .query_map(params![owner_id], |r| {
            Ok(OwnerAssignment {
                record: record_from_row(r, 0)?,
                application: application_from_row(r, app_at)?,
                change_request: change_request_from_row(r, cr_at)?,
                manager: user_ref_at(r, manager_at)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
