// src/router.rs
use crate::auth::sessions;
use crate::config::AppConfig;
use crate::db::connection::Database;
use crate::db::users;
use crate::domain::access::{self, AccessFilter};
use crate::domain::models::{NewApplication, NewChangeRequest, User, ValidationUpdate, Viewer};
use crate::domain::query::ListFilters;
use crate::domain::service::TrackerService;
use crate::domain::status::{ChangeType, Role, Side, ValidationStatus};
use crate::errors::{ResultResp, ServerError};
use crate::responses::{
    html_error_response, html_response, json_error_response, json_response, no_content,
    redirect, redirect_with_cookie,
};
use crate::spreadsheets::export_change_requests_xlsx;
use crate::templates::pages::{
    self, ChangeRequestVm, DashboardVm, MyApplicationsVm, RoleStats,
};
use astra::{Request, Response};
use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;

const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Everything a request handler needs; shared by all workers.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub db: Database,
    pub config: AppConfig,
}

impl AppContext {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self { db, config }
    }

    fn service(&self) -> TrackerService<'_, Database> {
        TrackerService::new(&self.db, AccessFilter::new(self.config.manager_scope))
    }
}

/// Route one request. Errors become JSON under `/api/` and HTML pages
/// elsewhere; a missing session on a page redirects to the sign-in form.
pub fn handle(req: Request, ctx: &AppContext) -> Response {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let is_api = path.starts_with("/api/");

    match route(req, ctx) {
        Ok(resp) => {
            tracing::debug!(%method, %path, status = resp.status().as_u16(), "handled");
            resp
        }
        Err(err) => {
            if err.status_code() >= 500 {
                tracing::error!(%method, %path, error = %err, "request failed");
            } else {
                tracing::warn!(%method, %path, error = %err, "request rejected");
            }

            match err {
                ServerError::Unauthorized(_) if !is_api => {
                    redirect("/login").unwrap_or_else(|e| html_error_response(&e))
                }
                err if is_api => json_error_response(&err),
                err => html_error_response(&err),
            }
        }
    }
}

fn route(mut req: Request, ctx: &AppContext) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let now = Utc::now().naive_utc();

    match (method.as_str(), segments.as_slice()) {
        ("GET", [""]) => match current_user(&req, ctx)? {
            Some(_) => redirect("/dashboard"),
            None => redirect("/login"),
        },

        // Sign in / out
        ("GET", ["login"]) => html_response(pages::login_page(None)),
        ("POST", ["login"]) => {
            let form = read_form(&mut req)?;
            login(ctx, &form, now)
        }
        ("POST", ["logout"]) => logout(&req, ctx),

        // JSON API
        ("GET", ["api", "auth", "user"]) => {
            let user = require_user(&req, ctx)?;
            json_response(200, &user)
        }
        ("GET", ["api", "applications"]) => {
            require_user(&req, ctx)?;
            json_response(200, &ctx.service().list_applications()?)
        }
        ("POST", ["api", "applications"]) => {
            let user = require_user(&req, ctx)?;
            let new: NewApplication = read_json(&mut req)?;
            let created = ctx.service().create_application(&viewer(&user), &new, now)?;
            tracing::info!(application_id = created.id, by = user.id, "application created");
            json_response(201, &created)
        }
        ("GET", ["api", "change-requests"]) => {
            let user = require_user(&req, ctx)?;
            let filters = query_filters(&req)?;
            json_response(
                200,
                &ctx.service().list_change_requests(&viewer(&user), &filters)?,
            )
        }
        ("POST", ["api", "change-requests"]) => {
            let user = require_user(&req, ctx)?;
            let new: NewChangeRequest = read_json(&mut req)?;
            let created = ctx.service().create_change_request(&viewer(&user), &new, now)?;
            let view = ctx.service().get_change_request(&viewer(&user), created.id)?;
            json_response(201, &view)
        }
        ("GET", ["api", "change-requests", id]) => {
            let user = require_user(&req, ctx)?;
            let id = parse_id(id)?;
            json_response(200, &ctx.service().get_change_request(&viewer(&user), id)?)
        }
        ("POST", ["api", "change-requests", id, "applications"]) => {
            let user = require_user(&req, ctx)?;
            let id = parse_id(id)?;
            let body: AttachBody = read_json(&mut req)?;
            ctx.service()
                .attach_applications(&viewer(&user), id, &body.application_ids, now)?;
            json_response(201, &ctx.service().get_change_request(&viewer(&user), id)?)
        }
        ("PATCH", ["api", "change-requests", cr, "applications", app, "validation"]) => {
            let user = require_user(&req, ctx)?;
            let (cr, app) = (parse_id(cr)?, parse_id(app)?);
            let update: ValidationUpdate = read_json(&mut req)?;
            ctx.service()
                .update_validation(&viewer(&user), cr, app, &update, now)?;
            no_content()
        }
        ("GET", ["api", "my-applications"]) => {
            let user = require_user(&req, ctx)?;
            json_response(200, &ctx.service().my_assignments(&viewer(&user))?)
        }
        ("GET", ["api", "stats", "change-manager"]) => {
            let user = require_user(&req, ctx)?;
            json_response(200, &ctx.service().manager_stats(&viewer(&user))?)
        }
        ("GET", ["api", "stats", "application-owner"]) => {
            let user = require_user(&req, ctx)?;
            json_response(
                200,
                &ctx.service().owner_stats(&viewer(&user), now.date())?,
            )
        }

        // Pages
        ("GET", ["dashboard"]) => {
            let user = require_user(&req, ctx)?;
            let filters = query_filters(&req)?;
            dashboard(ctx, user, filters, now)
        }
        ("GET", ["my-applications"]) => {
            let user = require_user(&req, ctx)?;
            let service = ctx.service();
            let v = viewer(&user);
            let vm = MyApplicationsVm {
                assignments: service.my_assignments(&v)?,
                stats: service.owner_stats(&v, now.date())?,
                user,
                now,
            };
            html_response(pages::my_applications_page(&vm))
        }
        ("GET", ["change-requests", "export.xlsx"]) => {
            let user = require_user(&req, ctx)?;
            let filters = query_filters(&req)?;
            let views = ctx.service().list_change_requests(&viewer(&user), &filters)?;
            tracing::info!(rows = views.len(), by = user.id, "change requests exported");
            export_change_requests_xlsx(&views, &now.date().to_string())
        }
        ("GET", ["change-requests", id]) => {
            let user = require_user(&req, ctx)?;
            let id = parse_id(id)?;
            change_request_page(ctx, user, id, now)
        }
        ("POST", ["change-requests"]) => {
            let user = require_user(&req, ctx)?;
            let form = read_form(&mut req)?;
            let new = new_change_request_from_form(&form)?;
            let created = ctx.service().create_change_request(&viewer(&user), &new, now)?;
            redirect(&format!("/change-requests/{}", created.id))
        }
        ("POST", ["change-requests", id, "applications"]) => {
            let user = require_user(&req, ctx)?;
            let id = parse_id(id)?;
            let form = read_form(&mut req)?;
            let ids = form_ids(&form, "applicationIds")?;
            ctx.service()
                .attach_applications(&viewer(&user), id, &ids, now)?;
            redirect(&format!("/change-requests/{id}"))
        }
        ("POST", ["change-requests", cr, "applications", app, "validation"]) => {
            let user = require_user(&req, ctx)?;
            let (cr, app) = (parse_id(cr)?, parse_id(app)?);
            let form = read_form(&mut req)?;
            let update = validation_update_from_form(&form)?;
            ctx.service()
                .update_validation(&viewer(&user), cr, app, &update, now)?;
            redirect("/my-applications")
        }
        ("POST", ["applications"]) => {
            let user = require_user(&req, ctx)?;
            let form = read_form(&mut req)?;
            let owner_id = match form_value(&form, "ownerId").filter(|v| !v.is_empty()) {
                Some(raw) => Some(parse_id(raw)?),
                None => None,
            };
            let new = NewApplication {
                name: form_value(&form, "name").unwrap_or_default().to_string(),
                description: form_value(&form, "description")
                    .filter(|d| !d.is_empty())
                    .map(str::to_string),
                owner_id,
            };
            ctx.service().create_application(&viewer(&user), &new, now)?;
            redirect("/dashboard")
        }

        _ => Err(ServerError::NotFound(format!("{method} {path}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachBody {
    application_ids: Vec<i64>,
}

fn viewer(user: &User) -> Viewer {
    Viewer::from(user)
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn session_token(req: &Request) -> Option<String> {
    req.headers()
        .get_all("Cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(sessions::session_token_from_cookie)
        .map(str::to_string)
}

fn current_user(req: &Request, ctx: &AppContext) -> Result<Option<User>, ServerError> {
    let Some(token) = session_token(req) else {
        return Ok(None);
    };
    ctx.db
        .with_conn(|conn| sessions::load_user_from_session(conn, &token, now_unix()))
}

fn require_user(req: &Request, ctx: &AppContext) -> Result<User, ServerError> {
    current_user(req, ctx)?.ok_or_else(|| ServerError::Unauthorized("sign in required".into()))
}

fn login(ctx: &AppContext, form: &[(String, String)], now: NaiveDateTime) -> ResultResp {
    let name = form_value(form, "name").unwrap_or_default();
    if name.is_empty() {
        return html_response(pages::login_page(Some("Please enter your name.")));
    }
    let role = match form_value(form, "role").filter(|r| !r.is_empty()) {
        Some(raw) => Role::parse(raw)?,
        None => Role::ApplicationOwner,
    };

    let ttl = ctx.config.session_ttl_secs;
    let (user, token) = ctx.db.with_conn(|conn| {
        let user = users::get_or_create_user(conn, name, role, now)?;
        let token = sessions::create_session(conn, user.id, now_unix(), ttl)?;
        Ok((user, token))
    })?;

    tracing::info!(user_id = user.id, role = %user.role, "signed in");
    redirect_with_cookie("/dashboard", &sessions::session_cookie(&token, ttl))
}

fn logout(req: &Request, ctx: &AppContext) -> ResultResp {
    if let Some(token) = session_token(req) {
        ctx.db
            .with_conn(|conn| sessions::revoke_session(conn, &token, now_unix()))?;
    }
    redirect_with_cookie("/login", &sessions::expired_session_cookie())
}

fn dashboard(
    ctx: &AppContext,
    user: User,
    filters: ListFilters,
    now: NaiveDateTime,
) -> ResultResp {
    let service = ctx.service();
    let v = viewer(&user);

    let stats = match user.role {
        Role::ApplicationOwner => RoleStats::Owner(service.owner_stats(&v, now.date())?),
        Role::ChangeManager | Role::Admin => RoleStats::Manager(service.manager_stats(&v)?),
    };
    let applications = if access::can_create_change_request(&v) {
        service.list_applications()?
    } else {
        Vec::new()
    };
    let users = if access::can_manage_catalog(&v) {
        ctx.db.with_conn(|conn| users::list_users(conn))?
    } else {
        Vec::new()
    };

    let export_href = match filters.to_pairs() {
        pairs if pairs.is_empty() => "/change-requests/export.xlsx".to_string(),
        pairs => format!(
            "/change-requests/export.xlsx?{}",
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish()
        ),
    };

    let vm = DashboardVm {
        requests: service.list_change_requests(&v, &filters)?,
        alerts: service.priority_alerts(&v, now)?,
        stats,
        applications,
        users,
        export_href,
        filters,
        user,
        now,
    };
    html_response(pages::dashboard_page(&vm))
}

fn change_request_page(ctx: &AppContext, user: User, id: i64, now: NaiveDateTime) -> ResultResp {
    let service = ctx.service();
    let v = viewer(&user);
    let view = service.get_change_request(&v, id)?;

    let attachable = if access::can_attach_applications(&v) {
        let attached: HashSet<i64> = view.applications.iter().map(|a| a.application.id).collect();
        service
            .list_applications()?
            .into_iter()
            .filter(|a| !attached.contains(&a.id))
            .collect()
    } else {
        Vec::new()
    };

    let vm = ChangeRequestVm {
        user,
        view,
        attachable,
        now,
    };
    html_response(pages::change_request_page(&vm))
}

// ---- request parsing ----

fn parse_id(raw: &str) -> Result<i64, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::InvalidInput(format!("invalid id '{raw}'")))
}

fn query_filters(req: &Request) -> Result<ListFilters, ServerError> {
    let query = req.uri().query().unwrap_or("");
    ListFilters::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
}

fn read_body(req: &mut Request) -> Result<Vec<u8>, ServerError> {
    let mut buf = Vec::new();
    req.body_mut()
        .reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ServerError::InvalidInput(format!("failed to read body: {e}")))?;
    if buf.len() as u64 > MAX_BODY_BYTES {
        return Err(ServerError::InvalidInput("request body too large".into()));
    }
    Ok(buf)
}

fn read_json<T: DeserializeOwned>(req: &mut Request) -> Result<T, ServerError> {
    let body = read_body(req)?;
    serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidInput(format!("invalid JSON body: {e}")))
}

fn read_form(req: &mut Request) -> Result<Vec<(String, String)>, ServerError> {
    let body = read_body(req)?;
    Ok(url::form_urlencoded::parse(&body).into_owned().collect())
}

fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
}

fn form_ids(form: &[(String, String)], key: &str) -> Result<Vec<i64>, ServerError> {
    form.iter()
        .filter(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| parse_id(v.trim()))
        .collect()
}

fn parse_form_datetime(field: &str, raw: &str) -> Result<NaiveDateTime, ServerError> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| ServerError::InvalidInput(format!("{field}: invalid date/time '{raw}'")))
}

fn new_change_request_from_form(
    form: &[(String, String)],
) -> Result<NewChangeRequest, ServerError> {
    let required = |key: &str| {
        form_value(form, key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServerError::InvalidInput(format!("{key} is required")))
    };

    Ok(NewChangeRequest {
        title: required("title")?.to_string(),
        description: form_value(form, "description")
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        change_type: ChangeType::parse(required("changeType")?)?,
        start_time: parse_form_datetime("startTime", required("startTime")?)?,
        end_time: parse_form_datetime("endTime", required("endTime")?)?,
        application_ids: form_ids(form, "applicationIds")?,
    })
}

/// The HTML form always posts the whole side, so comments and attachments
/// replace what is stored.
fn validation_update_from_form(
    form: &[(String, String)],
) -> Result<ValidationUpdate, ServerError> {
    let side = Side::parse(form_value(form, "side").unwrap_or_default())?;
    let status = ValidationStatus::parse(form_value(form, "status").unwrap_or_default())?;
    let comments = form_value(form, "comments").map(str::to_string);
    let attachments = form_value(form, "attachments").map(|raw| {
        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    });

    Ok(ValidationUpdate {
        side,
        status,
        comments,
        attachments,
    })
}
