// src/db/change_requests.rs
use chrono::{Datelike, NaiveDateTime};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;

use crate::db::applications::{application_from_row, APPLICATION_COLUMNS};
use crate::db::validations::{
    attach_in_tx, record_from_row, user_ref_at, RECORD_COLUMNS, RECORD_WIDTH,
};
use crate::domain::models::{
    AttachedApplication, ChangeRequest, ChangeRequestDetail, NewChangeRequest,
};
use crate::domain::query::StoreFilter;
use crate::domain::store::{change_id_sequence, format_change_id};
use crate::errors::ServerError;

pub(crate) const CHANGE_REQUEST_COLUMNS: &str = "cr.id, cr.change_id, cr.title, cr.description, \
     cr.change_type, cr.status, cr.start_time, cr.end_time, cr.manager_id, cr.created_at, cr.updated_at";

/// Reads `CHANGE_REQUEST_COLUMNS` starting at `offset`.
pub(crate) fn change_request_from_row(
    r: &Row<'_>,
    offset: usize,
) -> rusqlite::Result<ChangeRequest> {
    Ok(ChangeRequest {
        id: r.get(offset)?,
        change_id: r.get(offset + 1)?,
        title: r.get(offset + 2)?,
        description: r.get(offset + 3)?,
        change_type: r.get(offset + 4)?,
        status: r.get(offset + 5)?,
        start_time: r.get(offset + 6)?,
        end_time: r.get(offset + 7)?,
        manager_id: r.get(offset + 8)?,
        created_at: r.get(offset + 9)?,
        updated_at: r.get(offset + 10)?,
    })
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?")
        .take(n)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Change request rows matching `filter`, newest first.
///
/// Mirrors `StoreFilter::matches`: text matching is Unicode case-insensitive
/// substring search through `unicode_lower`; role scope is applied as plain
/// predicates.
pub fn select_change_requests(
    conn: &Connection,
    filter: &StoreFilter,
) -> Result<Vec<ChangeRequest>, ServerError> {
    // Build clauses + bind vector in the exact same order.
    let mut clauses: Vec<&str> = Vec::new();
    let mut bind: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(owner_id) = filter.owner_id {
        clauses.push(
            "exists (select 1 from change_request_applications ox
                     join applications oa on oa.id = ox.application_id
                     where ox.change_request_id = cr.id and oa.owner_id = ?)",
        );
        bind.push(Box::new(owner_id));
    }
    if let Some(manager_id) = filter.manager_id {
        clauses.push("cr.manager_id = ?");
        bind.push(Box::new(manager_id));
    }
    if let Some(q) = &filter.search {
        let q = q.to_lowercase();
        clauses.push(
            "(instr(unicode_lower(cr.change_id), ?) > 0
              or instr(unicode_lower(cr.title), ?) > 0
              or instr(unicode_lower(coalesce(cr.description, '')), ?) > 0)",
        );
        bind.push(Box::new(q.clone()));
        bind.push(Box::new(q.clone()));
        bind.push(Box::new(q));
    }
    if let Some(t) = filter.change_type {
        clauses.push("cr.change_type = ?");
        bind.push(Box::new(t));
    }
    if let Some(l) = filter.lifecycle {
        clauses.push("cr.status = ?");
        bind.push(Box::new(l));
    }
    if let Some(name) = &filter.application {
        clauses.push(
            "exists (select 1 from change_request_applications nx
                     join applications na on na.id = nx.application_id
                     where nx.change_request_id = cr.id and instr(unicode_lower(na.name), ?) > 0)",
        );
        bind.push(Box::new(name.to_lowercase()));
    }
    if let Some(from) = filter.start_from {
        clauses.push("cr.start_time >= ?");
        bind.push(Box::new(from));
    }
    if let Some(before) = filter.start_before {
        clauses.push("cr.start_time < ?");
        bind.push(Box::new(before));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("where {}", clauses.join("\n  and "))
    };

    let sql = format!(
        r#"
        select {CHANGE_REQUEST_COLUMNS}
        from change_requests cr
        {where_clause}
        order by cr.created_at desc, cr.id desc
        "#
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params_from_iter(bind.iter()), |r| change_request_from_row(r, 0))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}

/// Every attached row for the given change requests, grouped by request id.
fn attached_for(
    conn: &Connection,
    change_request_ids: &[i64],
) -> Result<HashMap<i64, Vec<AttachedApplication>>, ServerError> {
    let mut grouped: HashMap<i64, Vec<AttachedApplication>> = HashMap::new();
    if change_request_ids.is_empty() {
        return Ok(grouped);
    }

    let sql = format!(
        "select {RECORD_COLUMNS}, {APPLICATION_COLUMNS}, u.id, u.name, u.email
         from change_request_applications x
         join applications a on a.id = x.application_id
         left join users u on u.id = a.owner_id
         where x.change_request_id in ({})
         order by a.name, a.id",
        placeholders(change_request_ids.len())
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let app_at = RECORD_WIDTH;
    let owner_at = app_at + 5;

    let rows = stmt
        .query_map(params_from_iter(change_request_ids.iter()), |r| {
            Ok(AttachedApplication {
                record: record_from_row(r, 0)?,
                application: application_from_row(r, app_at)?,
                owner: user_ref_at(r, owner_at)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    for r in rows {
        let attached = r.map_err(|e| ServerError::DbError(e.to_string()))?;
        grouped
            .entry(attached.record.change_request_id)
            .or_default()
            .push(attached);
    }
    Ok(grouped)
}

fn with_applications(
    conn: &Connection,
    requests: Vec<ChangeRequest>,
) -> Result<Vec<ChangeRequestDetail>, ServerError> {
    let ids: Vec<i64> = requests.iter().map(|cr| cr.id).collect();
    let mut attached = attached_for(conn, &ids)?;

    Ok(requests
        .into_iter()
        .map(|change_request| ChangeRequestDetail {
            applications: attached.remove(&change_request.id).unwrap_or_default(),
            change_request,
        })
        .collect())
}

pub fn list_details(
    conn: &Connection,
    filter: &StoreFilter,
) -> Result<Vec<ChangeRequestDetail>, ServerError> {
    let requests = select_change_requests(conn, filter)?;
    with_applications(conn, requests)
}

pub fn get_detail(conn: &Connection, id: i64) -> Result<Option<ChangeRequestDetail>, ServerError> {
    let row = conn
        .query_row(
            &format!("select {CHANGE_REQUEST_COLUMNS} from change_requests cr where cr.id = ?"),
            params![id],
            |r| change_request_from_row(r, 0),
        )
        .optional()
        .map_err(|e| ServerError::DbError(format!("select change request failed: {e}")))?;

    match row {
        Some(cr) => Ok(with_applications(conn, vec![cr])?.pop()),
        None => Ok(None),
    }
}

/// Next `CR-<year>-<seq>` for the year of `now`.
fn next_change_id(conn: &Connection, year: i32) -> Result<String, ServerError> {
    let mut stmt = conn
        .prepare("select change_id from change_requests where change_id like ?")
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![format!("CR-{year}-%")], |r| r.get::<_, String>(0))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut max_seq = 0;
    for r in rows {
        let id = r.map_err(|e| ServerError::DbError(e.to_string()))?;
        if let Some(seq) = change_id_sequence(&id, year) {
            max_seq = max_seq.max(seq);
        }
    }
    Ok(format_change_id(year, max_seq + 1))
}

/// Insert a new active change request and attach `new.application_ids`.
/// Id allocation, insert and attach share one immediate transaction: a
/// failed attach leaves no change request behind.
pub fn insert_change_request(
    conn: &mut Connection,
    new: &NewChangeRequest,
    manager_id: i64,
    now: NaiveDateTime,
) -> Result<ChangeRequest, ServerError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

    let change_id = next_change_id(&tx, now.year())?;

    tx.execute(
        "insert into change_requests
           (change_id, title, description, change_type, status, start_time, end_time,
            manager_id, created_at, updated_at)
         values (?, ?, ?, ?, 'active', ?, ?, ?, ?, ?)",
        params![
            change_id,
            new.title.trim(),
            new.description,
            new.change_type,
            new.start_time,
            new.end_time,
            manager_id,
            now,
            now
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert change request failed: {e}")))?;
    let id = tx.last_insert_rowid();

    if !new.application_ids.is_empty() {
        attach_in_tx(&tx, id, &new.application_ids, now)?;
    }

    let created = tx
        .query_row(
            &format!("select {CHANGE_REQUEST_COLUMNS} from change_requests cr where cr.id = ?"),
            params![id],
            |r| change_request_from_row(r, 0),
        )
        .map_err(|e| ServerError::DbError(format!("select new change request failed: {e}")))?;

    tx.commit()
        .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

    tracing::info!(
        change_id = %created.change_id,
        manager_id,
        applications = new.application_ids.len(),
        "change request created"
    );
    Ok(created)
}
