use crate::auth::sessions;
use crate::config::AppConfig;
use crate::db::connection::{init_db, Database};
use crate::db::users::get_or_create_user;
use crate::domain::models::User;
use crate::domain::status::Role;
use crate::router::{handle, AppContext};
use astra::{Body, Response};
use chrono::Utc;
use http::{Method, Request};
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// Fresh context over a new SQLite file with the production schema.
pub fn init_test_ctx() -> AppContext {
    init_test_ctx_with(AppConfig::default())
}

pub fn init_test_ctx_with(config: AppConfig) -> AppContext {
    let path = std::env::temp_dir().join(format!(
        "change_tracker_test_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let db = Database::new(path.to_string_lossy());
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    AppContext::new(db, config)
}

/// Creates the user and a live session, returning the cookie token.
pub fn sign_in(ctx: &AppContext, name: &str, role: Role) -> (User, String) {
    let now = Utc::now();
    ctx.db
        .with_conn(|conn| {
            let user = get_or_create_user(conn, name, role, now.naive_utc())?;
            let token = sessions::create_session(conn, user.id, now.timestamp(), 3600)?;
            Ok((user, token))
        })
        .expect("Failed to sign in")
}

pub fn send(
    ctx: &AppContext,
    method: Method,
    uri: &str,
    session: Option<&str>,
    content_type: Option<&str>,
    body: &str,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = session {
        builder = builder.header("Cookie", format!("session={token}"));
    }
    if let Some(ct) = content_type {
        builder = builder.header("Content-Type", ct);
    }
    let req = builder
        .body(Body::from(body.as_bytes().to_vec()))
        .unwrap();
    handle(req, ctx)
}

pub fn get(ctx: &AppContext, uri: &str, session: &str) -> Response {
    send(ctx, Method::GET, uri, Some(session), None, "")
}

pub fn send_json(
    ctx: &AppContext,
    method: Method,
    uri: &str,
    session: &str,
    json: serde_json::Value,
) -> Response {
    send(
        ctx,
        method,
        uri,
        Some(session),
        Some("application/json"),
        &json.to_string(),
    )
}

pub fn post_form(ctx: &AppContext, uri: &str, session: Option<&str>, form: &str) -> Response {
    send(
        ctx,
        Method::POST,
        uri,
        session,
        Some("application/x-www-form-urlencoded"),
        form,
    )
}

pub fn body_string(resp: Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}

pub fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(resp)).expect("response is not JSON")
}
