use crate::domain::status::Role;
use crate::router::AppContext;
use crate::tests::utils::{body_json, get, init_test_ctx, send_json, sign_in};
use http::Method;
use serde_json::{json, Value};

struct World {
    ctx: AppContext,
    manager: String,
    admin: String,
    owner: String,
    owner_id: i64,
}

fn world() -> World {
    let ctx = init_test_ctx();
    let (_, manager) = sign_in(&ctx, "carol", Role::ChangeManager);
    let (_, admin) = sign_in(&ctx, "ada", Role::Admin);
    let (owner_user, owner) = sign_in(&ctx, "uma", Role::ApplicationOwner);
    World {
        ctx,
        manager,
        admin,
        owner,
        owner_id: owner_user.id,
    }
}

fn create_app(w: &World, name: &str, owner_id: Option<i64>) -> i64 {
    let resp = send_json(
        &w.ctx,
        Method::POST,
        "/api/applications",
        &w.admin,
        json!({ "name": name, "ownerId": owner_id }),
    );
    assert_eq!(resp.status(), 201);
    body_json(resp)["id"].as_i64().unwrap()
}

fn create_cr(w: &World, title: &str, change_type: &str, start: &str, apps: &[i64]) -> Value {
    let resp = send_json(
        &w.ctx,
        Method::POST,
        "/api/change-requests",
        &w.manager,
        json!({
            "title": title,
            "changeType": change_type,
            "startTime": format!("{start}T10:00:00"),
            "endTime": format!("{start}T12:00:00"),
            "applicationIds": apps,
        }),
    );
    assert_eq!(resp.status(), 201);
    body_json(resp)
}

#[test]
fn manager_creates_request_with_applications() {
    let w = world();
    let a = create_app(&w, "Billing", Some(w.owner_id));
    let b = create_app(&w, "Ledger", None);

    let cr = create_cr(&w, "Core switch", "Standard", "2031-01-10", &[a, b]);
    assert!(cr["changeId"].as_str().unwrap().starts_with("CR-"));
    assert_eq!(cr["status"], "active");
    assert_eq!(cr["applications"].as_array().unwrap().len(), 2);
    assert_eq!(cr["validation"]["overall"], "pending");
    assert_eq!(cr["validation"]["completion"]["pre"], 0.0);
    assert_eq!(cr["applications"][0]["record"]["preStatus"], "pending");
}

#[test]
fn request_without_applications_reports_no_applications() {
    let w = world();
    let cr = create_cr(&w, "Empty", "P2", "2031-01-10", &[]);
    assert_eq!(cr["validation"]["overall"], "no_applications");
    assert_eq!(cr["validation"]["completion"]["post"], 0.0);
}

#[test]
fn create_rejects_bad_input_and_wrong_role() {
    let w = world();

    let backwards = send_json(
        &w.ctx,
        Method::POST,
        "/api/change-requests",
        &w.manager,
        json!({
            "title": "Backwards",
            "changeType": "P1",
            "startTime": "2031-01-10T12:00:00",
            "endTime": "2031-01-10T10:00:00",
        }),
    );
    assert_eq!(backwards.status(), 400);

    let bad_type = send_json(
        &w.ctx,
        Method::POST,
        "/api/change-requests",
        &w.manager,
        json!({
            "title": "Typo",
            "changeType": "P9",
            "startTime": "2031-01-10T10:00:00",
            "endTime": "2031-01-10T12:00:00",
        }),
    );
    assert_eq!(bad_type.status(), 400);

    let by_owner = send_json(
        &w.ctx,
        Method::POST,
        "/api/change-requests",
        &w.owner,
        json!({
            "title": "Sneaky",
            "changeType": "P1",
            "startTime": "2031-01-10T10:00:00",
            "endTime": "2031-01-10T12:00:00",
        }),
    );
    assert_eq!(by_owner.status(), 403);
    assert_eq!(body_json(by_owner)["error"], "forbidden");
}

#[test]
fn attaching_twice_is_a_conflict() {
    let w = world();
    let a = create_app(&w, "Billing", Some(w.owner_id));
    let cr = create_cr(&w, "Patch", "Standard", "2031-01-10", &[a]);
    let id = cr["id"].as_i64().unwrap();

    let resp = send_json(
        &w.ctx,
        Method::POST,
        &format!("/api/change-requests/{id}/applications"),
        &w.manager,
        json!({ "applicationIds": [a] }),
    );
    assert_eq!(resp.status(), 409);

    let missing = send_json(
        &w.ctx,
        Method::POST,
        "/api/change-requests/9999/applications",
        &w.admin,
        json!({ "applicationIds": [a] }),
    );
    assert_eq!(missing.status(), 404);
}

#[test]
fn list_filters_combine() {
    let w = world();
    let a = create_app(&w, "Billing", Some(w.owner_id));
    let b = create_app(&w, "Ledger", None);
    create_cr(&w, "Core switch", "P1", "2031-01-10", &[a]);
    create_cr(&w, "DNS cutover", "Standard", "2031-02-20", &[b]);

    let ids = |query: &str| -> Vec<String> {
        let resp = get(&w.ctx, &format!("/api/change-requests{query}"), &w.manager);
        assert_eq!(resp.status(), 200, "{query}");
        body_json(resp)
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect()
    };

    assert_eq!(ids(""), vec!["DNS cutover", "Core switch"]);
    assert_eq!(ids("?search=SWITCH"), vec!["Core switch"]);
    assert_eq!(ids("?type=Standard"), vec!["DNS cutover"]);
    assert_eq!(ids("?type=all&application=ledg"), vec!["DNS cutover"]);
    assert_eq!(ids("?dateFrom=2031-02-01"), vec!["DNS cutover"]);
    assert_eq!(ids("?dateTo=2031-01-10"), vec!["Core switch"]);
    assert_eq!(ids("?status=pending&lifecycle=active").len(), 2);
    assert!(ids("?status=completed").is_empty());
    assert!(ids("?search=switch&type=Standard").is_empty());
}

#[test]
fn invalid_filters_are_bad_requests() {
    let w = world();
    for query in ["?status=done", "?type=p1", "?dateFrom=yesterday", "?dateFrom=2031-02-02&dateTo=2031-02-01"] {
        let resp = get(&w.ctx, &format!("/api/change-requests{query}"), &w.manager);
        assert_eq!(resp.status(), 400, "{query}");
        assert_eq!(body_json(resp)["error"], "invalid_input");
    }
}

#[test]
fn far_future_date_bound_is_served() {
    let w = world();
    create_cr(&w, "Core switch", "P1", "2031-01-10", &[]);

    let resp = get(&w.ctx, "/api/change-requests?dateTo=%2B262142-12-31", &w.manager);
    assert_eq!(resp.status(), 200);
    assert_eq!(body_json(resp).as_array().unwrap().len(), 1);

    for uri in [
        "/dashboard?dateTo=%2B262142-12-31",
        "/change-requests/export.xlsx?dateTo=%2B262142-12-31",
    ] {
        assert_eq!(get(&w.ctx, uri, &w.manager).status(), 200, "{uri}");
    }
}

#[test]
fn search_folds_accented_letters() {
    let w = world();
    let app = create_app(&w, "Ärzte-Portal", Some(w.owner_id));
    create_cr(&w, "Mise à jour ÉTÉ", "P2", "2031-03-01", &[app]);
    create_cr(&w, "Core switch", "P1", "2031-01-10", &[]);

    for query in ["?search=%C3%A9t%C3%A9", "?application=%C3%A4rzte"] {
        let resp = get(&w.ctx, &format!("/api/change-requests{query}"), &w.manager);
        assert_eq!(resp.status(), 200, "{query}");
        let found = body_json(resp);
        let found = found.as_array().unwrap();
        assert_eq!(found.len(), 1, "{query}");
        assert_eq!(found[0]["title"], "Mise à jour ÉTÉ");
    }
}

#[test]
fn unknown_request_is_not_found() {
    let w = world();
    assert_eq!(get(&w.ctx, "/api/change-requests/4242", &w.manager).status(), 404);
    assert_eq!(get(&w.ctx, "/api/change-requests/abc", &w.manager).status(), 400);
}

#[test]
fn catalog_is_admin_only() {
    let w = world();
    let resp = send_json(
        &w.ctx,
        Method::POST,
        "/api/applications",
        &w.manager,
        json!({ "name": "Shadow IT" }),
    );
    assert_eq!(resp.status(), 403);

    create_app(&w, "Billing", Some(w.owner_id));
    let listed = body_json(get(&w.ctx, "/api/applications", &w.owner));
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["ownerId"], w.owner_id);
}

#[test]
fn manager_stats_endpoint() {
    let w = world();
    let a = create_app(&w, "Billing", Some(w.owner_id));
    create_cr(&w, "With app", "P2", "2031-01-10", &[a]);
    create_cr(&w, "Without", "P2", "2031-01-11", &[]);

    let stats = body_json(get(&w.ctx, "/api/stats/change-manager", &w.manager));
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["active"], 2);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["noApplications"], 1);

    assert_eq!(get(&w.ctx, "/api/stats/change-manager", &w.owner).status(), 403);
}
