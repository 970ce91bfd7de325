use crate::domain::status::Role;
use crate::tests::utils::{body_json, body_string, get, init_test_ctx, post_form, send, sign_in};
use http::Method;

#[test]
fn login_page_loads_successfully() {
    let ctx = init_test_ctx();
    let resp = send(&ctx, Method::GET, "/login", None, None, "");

    assert_eq!(resp.status(), 200);
    let body = body_string(resp);
    assert!(body.contains("Sign in"));
    assert!(body.contains("form"));
}

#[test]
fn login_creates_user_and_sets_session_cookie() {
    let ctx = init_test_ctx();
    let resp = post_form(&ctx, "/login", None, "name=carol&role=change_manager");

    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers().get("Location").unwrap(), "/dashboard");
    let cookie = resp
        .headers()
        .get("Set-Cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let token = cookie
        .trim_start_matches("session=")
        .split(';')
        .next()
        .unwrap();
    let me = body_json(get(&ctx, "/api/auth/user", token));
    assert_eq!(me["name"], "carol");
    assert_eq!(me["role"], "change_manager");
}

#[test]
fn existing_user_keeps_role_on_login() {
    let ctx = init_test_ctx();
    sign_in(&ctx, "uma", Role::ApplicationOwner);

    let resp = post_form(&ctx, "/login", None, "name=uma&role=admin");
    assert_eq!(resp.status(), 303);

    let (_, token) = sign_in(&ctx, "uma", Role::Admin);
    let me = body_json(get(&ctx, "/api/auth/user", &token));
    assert_eq!(me["role"], "application_owner");
}

#[test]
fn api_without_session_is_unauthorized_json() {
    let ctx = init_test_ctx();
    let resp = send(&ctx, Method::GET, "/api/change-requests", None, None, "");

    assert_eq!(resp.status(), 401);
    assert_eq!(body_json(resp)["error"], "unauthorized");
}

#[test]
fn pages_without_session_redirect_to_login() {
    let ctx = init_test_ctx();
    let resp = send(&ctx, Method::GET, "/dashboard", None, None, "");

    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers().get("Location").unwrap(), "/login");
}

#[test]
fn logout_revokes_session() {
    let ctx = init_test_ctx();
    let (_, token) = sign_in(&ctx, "carol", Role::ChangeManager);
    assert_eq!(get(&ctx, "/api/auth/user", &token).status(), 200);

    let resp = post_form(&ctx, "/logout", Some(&token), "");
    assert_eq!(resp.status(), 303);
    assert!(resp
        .headers()
        .get("Set-Cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    assert_eq!(get(&ctx, "/api/auth/user", &token).status(), 401);
}

#[test]
fn unknown_route_is_not_found() {
    let ctx = init_test_ctx();
    let (_, token) = sign_in(&ctx, "carol", Role::ChangeManager);
    assert_eq!(get(&ctx, "/api/nothing-here", &token).status(), 404);
}
