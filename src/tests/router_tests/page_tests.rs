use crate::domain::status::Role;
use crate::router::AppContext;
use crate::tests::utils::{body_json, body_string, get, init_test_ctx, post_form, send_json, sign_in};
use http::Method;
use serde_json::json;

fn seed(ctx: &AppContext) -> (String, String, i64) {
    let (_, manager) = sign_in(ctx, "carol", Role::ChangeManager);
    let (_, admin) = sign_in(ctx, "ada", Role::Admin);
    let (uma, owner) = sign_in(ctx, "uma", Role::ApplicationOwner);

    let resp = send_json(
        ctx,
        Method::POST,
        "/api/applications",
        &admin,
        json!({ "name": "Billing", "description": "Invoices", "ownerId": uma.id }),
    );
    let app = body_json(resp)["id"].as_i64().unwrap();

    let resp = send_json(
        ctx,
        Method::POST,
        "/api/change-requests",
        &manager,
        json!({
            "title": "Firewall rules",
            "description": "Open port 8443",
            "changeType": "P2",
            "startTime": "2031-05-01T20:00:00",
            "endTime": "2031-05-01T21:00:00",
            "applicationIds": [app],
        }),
    );
    let cr = body_json(resp)["id"].as_i64().unwrap();
    (manager, owner, cr)
}

#[test]
fn dashboard_lists_requests_with_status() {
    let ctx = init_test_ctx();
    let (manager, _, _) = seed(&ctx);

    let resp = get(&ctx, "/dashboard", &manager);
    assert_eq!(resp.status(), 200);
    let body = body_string(resp);
    assert!(body.contains("Firewall rules"));
    assert!(body.contains("New change request"));
    assert!(body.contains("Export to Excel"));
    assert!(body.contains("badge-pending"));
}

#[test]
fn dashboard_keeps_filters_in_export_link() {
    let ctx = init_test_ctx();
    let (manager, _, _) = seed(&ctx);

    let body = body_string(get(&ctx, "/dashboard?search=firewall&type=P2", &manager));
    assert!(body.contains("/change-requests/export.xlsx?search=firewall&amp;type=P2"));
}

#[test]
fn detail_page_shows_applications() {
    let ctx = init_test_ctx();
    let (manager, owner, cr) = seed(&ctx);

    for session in [&manager, &owner] {
        let resp = get(&ctx, &format!("/change-requests/{cr}"), session);
        assert_eq!(resp.status(), 200);
        let body = body_string(resp);
        assert!(body.contains("Billing"));
        assert!(body.contains("Open port 8443"));
    }
}

#[test]
fn my_applications_page_has_side_forms() {
    let ctx = init_test_ctx();
    let (_, owner, cr) = seed(&ctx);

    let resp = get(&ctx, "/my-applications", &owner);
    assert_eq!(resp.status(), 200);
    let body = body_string(resp);
    assert!(body.contains(&format!("/change-requests/{cr}/applications/")));
    assert!(body.contains("Pre-change"));
    assert!(body.contains("Post-change"));
}

#[test]
fn form_create_redirects_to_new_request() {
    let ctx = init_test_ctx();
    let (manager, _, _) = seed(&ctx);

    let resp = post_form(
        &ctx,
        "/change-requests",
        Some(&manager),
        "title=Patch+night&changeType=Emergency&startTime=2031-06-01T22%3A00&endTime=2031-06-02T01%3A00",
    );
    assert_eq!(resp.status(), 303);
    let location = resp.headers().get("Location").unwrap().to_str().unwrap();
    assert!(location.starts_with("/change-requests/"));
}

#[test]
fn html_errors_render_pages() {
    let ctx = init_test_ctx();
    let (manager, _, _) = seed(&ctx);

    let resp = get(&ctx, "/change-requests/4242", &manager);
    assert_eq!(resp.status(), 404);
    assert!(body_string(resp).contains("Error 404"));
}

#[test]
fn export_returns_workbook() {
    let ctx = init_test_ctx();
    let (manager, _, _) = seed(&ctx);

    let resp = get(&ctx, "/change-requests/export.xlsx?type=P2", &manager);
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut resp.into_body().reader(), &mut bytes).unwrap();
    // XLSX files are zip archives.
    assert_eq!(&bytes[..2], b"PK");
}
