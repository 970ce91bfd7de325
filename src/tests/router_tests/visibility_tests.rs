use crate::config::AppConfig;
use crate::domain::access::ManagerScope;
use crate::domain::status::Role;
use crate::router::AppContext;
use crate::tests::utils::{body_json, get, init_test_ctx, init_test_ctx_with, send_json, sign_in};
use http::Method;
use serde_json::json;

fn app(ctx: &AppContext, admin: &str, name: &str, owner: i64) -> i64 {
    let resp = send_json(
        ctx,
        Method::POST,
        "/api/applications",
        admin,
        json!({ "name": name, "ownerId": owner }),
    );
    body_json(resp)["id"].as_i64().unwrap()
}

fn change_request(ctx: &AppContext, manager: &str, title: &str, apps: &[i64]) -> i64 {
    let resp = send_json(
        ctx,
        Method::POST,
        "/api/change-requests",
        manager,
        json!({
            "title": title,
            "changeType": "Standard",
            "startTime": "2031-04-01T08:00:00",
            "endTime": "2031-04-01T09:00:00",
            "applicationIds": apps,
        }),
    );
    assert_eq!(resp.status(), 201);
    body_json(resp)["id"].as_i64().unwrap()
}

fn titles(ctx: &AppContext, session: &str) -> Vec<String> {
    body_json(get(ctx, "/api/change-requests", session))
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn owners_only_see_requests_touching_their_applications() {
    let ctx = init_test_ctx();
    let (_, manager) = sign_in(&ctx, "carol", Role::ChangeManager);
    let (_, admin) = sign_in(&ctx, "ada", Role::Admin);
    let (uma, uma_token) = sign_in(&ctx, "uma", Role::ApplicationOwner);
    let (ulf, ulf_token) = sign_in(&ctx, "ulf", Role::ApplicationOwner);
    let (_, ursula_token) = sign_in(&ctx, "ursula", Role::ApplicationOwner);

    let a = app(&ctx, &admin, "A", uma.id);
    let b = app(&ctx, &admin, "B", ulf.id);
    let both = change_request(&ctx, &manager, "Both", &[a, b]);
    let only_b = change_request(&ctx, &manager, "Only B", &[b]);

    assert_eq!(titles(&ctx, &uma_token), vec!["Both"]);
    assert_eq!(titles(&ctx, &ulf_token), vec!["Only B", "Both"]);
    assert!(titles(&ctx, &ursula_token).is_empty());

    // Owners still see every attached row of a visible request.
    let detail = body_json(get(&ctx, &format!("/api/change-requests/{both}"), &uma_token));
    assert_eq!(detail["applications"].as_array().unwrap().len(), 2);

    let denied = get(&ctx, &format!("/api/change-requests/{only_b}"), &uma_token);
    assert_eq!(denied.status(), 403);

    // Filters can only narrow the scope.
    let narrowed = body_json(get(&ctx, "/api/change-requests?application=B", &uma_token));
    assert_eq!(narrowed.as_array().unwrap().len(), 1);
}

#[test]
fn managers_see_everything_by_default() {
    let ctx = init_test_ctx();
    let (_, carol) = sign_in(&ctx, "carol", Role::ChangeManager);
    let (_, cody) = sign_in(&ctx, "cody", Role::ChangeManager);
    let (_, admin) = sign_in(&ctx, "ada", Role::Admin);

    change_request(&ctx, &carol, "Carol's", &[]);
    change_request(&ctx, &cody, "Cody's", &[]);

    assert_eq!(titles(&ctx, &carol).len(), 2);
    assert_eq!(titles(&ctx, &admin).len(), 2);
}

#[test]
fn managed_only_scope_limits_managers_and_admins() {
    let ctx = init_test_ctx_with(AppConfig {
        manager_scope: ManagerScope::ManagedOnly,
        ..AppConfig::default()
    });
    let (_, carol) = sign_in(&ctx, "carol", Role::ChangeManager);
    let (_, cody) = sign_in(&ctx, "cody", Role::ChangeManager);
    let (_, admin) = sign_in(&ctx, "ada", Role::Admin);

    let carols = change_request(&ctx, &carol, "Carol's", &[]);
    change_request(&ctx, &cody, "Cody's", &[]);

    assert_eq!(titles(&ctx, &carol), vec!["Carol's"]);
    assert_eq!(titles(&ctx, &cody), vec!["Cody's"]);
    assert!(titles(&ctx, &admin).is_empty());
    assert_eq!(
        get(&ctx, &format!("/api/change-requests/{carols}"), &cody).status(),
        403
    );
}
