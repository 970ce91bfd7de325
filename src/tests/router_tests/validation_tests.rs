use crate::domain::status::Role;
use crate::router::AppContext;
use crate::tests::utils::{body_json, get, init_test_ctx, post_form, send_json, sign_in};
use http::Method;
use serde_json::json;

/// One change request with application A (owner uma) and B (owner ulf).
struct Scenario {
    ctx: AppContext,
    manager: String,
    uma: String,
    ulf: String,
    cr: i64,
    a: i64,
    b: i64,
}

fn scenario() -> Scenario {
    let ctx = init_test_ctx();
    let (_, manager) = sign_in(&ctx, "carol", Role::ChangeManager);
    let (_, admin) = sign_in(&ctx, "ada", Role::Admin);
    let (uma_user, uma) = sign_in(&ctx, "uma", Role::ApplicationOwner);
    let (ulf_user, ulf) = sign_in(&ctx, "ulf", Role::ApplicationOwner);

    let app = |name: &str, owner: i64| {
        let resp = send_json(
            &ctx,
            Method::POST,
            "/api/applications",
            &admin,
            json!({ "name": name, "ownerId": owner }),
        );
        body_json(resp)["id"].as_i64().unwrap()
    };
    let a = app("A", uma_user.id);
    let b = app("B", ulf_user.id);

    let resp = send_json(
        &ctx,
        Method::POST,
        "/api/change-requests",
        &manager,
        json!({
            "title": "Core switch upgrade",
            "changeType": "Standard",
            "startTime": "2031-03-05T22:00:00",
            "endTime": "2031-03-06T02:00:00",
            "applicationIds": [a, b],
        }),
    );
    let cr = body_json(resp)["id"].as_i64().unwrap();

    Scenario { ctx, manager, uma, ulf, cr, a, b }
}

fn patch(s: &Scenario, session: &str, app: i64, side: &str, status: &str) -> u16 {
    send_json(
        &s.ctx,
        Method::PATCH,
        &format!("/api/change-requests/{}/applications/{app}/validation", s.cr),
        session,
        json!({ "side": side, "status": status }),
    )
    .status()
    .as_u16()
}

fn overall(s: &Scenario) -> serde_json::Value {
    let view = body_json(get(&s.ctx, &format!("/api/change-requests/{}", s.cr), &s.manager));
    view["validation"].clone()
}

#[test]
fn status_follows_owner_updates() {
    let s = scenario();

    assert_eq!(patch(&s, &s.uma, s.a, "pre", "completed"), 204);
    assert_eq!(patch(&s, &s.uma, s.a, "post", "completed"), 204);
    let v = overall(&s);
    assert_eq!(v["overall"], "pending");
    assert_eq!(v["completion"]["pre"], 0.5);

    assert_eq!(patch(&s, &s.ulf, s.b, "pre", "in_progress"), 204);
    assert_eq!(overall(&s)["overall"], "in_progress");

    assert_eq!(patch(&s, &s.ulf, s.b, "pre", "completed"), 204);
    assert_eq!(patch(&s, &s.ulf, s.b, "post", "completed"), 204);
    let v = overall(&s);
    assert_eq!(v["overall"], "completed");
    assert_eq!(v["completion"]["pre"], 1.0);
    assert_eq!(v["completion"]["post"], 1.0);
    assert!(v["completedAt"].is_string());
}

#[test]
fn only_the_owner_may_update() {
    let s = scenario();

    assert_eq!(patch(&s, &s.uma, s.b, "pre", "completed"), 403);
    assert_eq!(patch(&s, &s.manager, s.b, "pre", "completed"), 403);
    assert_eq!(overall(&s)["preSummary"]["completed"], 0);
}

#[test]
fn unknown_pair_and_bad_values() {
    let s = scenario();

    let resp = send_json(
        &s.ctx,
        Method::PATCH,
        &format!("/api/change-requests/{}/applications/9999/validation", s.cr),
        &s.uma,
        json!({ "side": "pre", "status": "completed" }),
    );
    assert_eq!(resp.status(), 404);

    assert_eq!(patch(&s, &s.uma, s.a, "pre", "done"), 400);
    assert_eq!(patch(&s, &s.uma, s.a, "middle", "completed"), 400);
}

#[test]
fn repeated_update_keeps_comments_and_refreshes_timestamp() {
    let s = scenario();
    let uri = format!("/api/change-requests/{}/applications/{}/validation", s.cr, s.a);

    let first = send_json(
        &s.ctx,
        Method::PATCH,
        &uri,
        &s.uma,
        json!({
            "side": "pre",
            "status": "completed",
            "comments": "checked",
            "attachments": ["evidence-1"],
        }),
    );
    assert_eq!(first.status(), 204);
    assert_eq!(patch(&s, &s.uma, s.a, "pre", "completed"), 204);

    let mine = body_json(get(&s.ctx, "/api/my-applications", &s.uma));
    let record = &mine[0]["record"];
    assert_eq!(record["preStatus"], "completed");
    assert_eq!(record["preComments"], "checked");
    assert_eq!(record["preAttachments"], json!(["evidence-1"]));
    assert!(record["preUpdatedAt"].is_string());
    assert!(record["postUpdatedAt"].is_null());
}

#[test]
fn my_applications_and_owner_stats() {
    let s = scenario();
    patch(&s, &s.uma, s.a, "pre", "completed");

    let mine = body_json(get(&s.ctx, "/api/my-applications", &s.uma));
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["application"]["name"], "A");
    assert_eq!(mine[0]["manager"]["name"], "carol");

    let stats = body_json(get(&s.ctx, "/api/stats/application-owner", &s.uma));
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["completedToday"], 1);
}

#[test]
fn html_form_update_redirects_back() {
    let s = scenario();
    let uri = format!("/change-requests/{}/applications/{}/validation", s.cr, s.a);

    let resp = post_form(
        &s.ctx,
        &uri,
        Some(&s.uma),
        "side=post&status=not_applicable&comments=no+post+checks&attachments=",
    );
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers().get("Location").unwrap(), "/my-applications");

    let mine = body_json(get(&s.ctx, "/api/my-applications", &s.uma));
    assert_eq!(mine[0]["record"]["postStatus"], "not_applicable");
    assert_eq!(mine[0]["record"]["postComments"], "no post checks");

    let denied = post_form(&s.ctx, &uri, Some(&s.ulf), "side=post&status=completed");
    assert_eq!(denied.status(), 403);
}
