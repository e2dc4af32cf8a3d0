//! API authorization integration tests
//!
//! Every mutating endpoint goes through the same pipeline: cookie present, token
//! verifies, role in the allow-set, then body validation, then execution.

mod helpers;

use crewdesk_applications::{DeviceStatus, IdentityProvider, Role};
use helpers::spawn_app;
use serde_json::json;
use std::sync::atomic::Ordering;

fn mutating_endpoints() -> Vec<(&'static str, &'static str, serde_json::Value)> {
    vec![
        ("POST", "/api/changeRole", json!({ "uid": "x", "newRole": "member" })),
        ("POST", "/api/deleteUser", json!({ "uid": "x" })),
        ("DELETE", "/api/deleteOwnAccount?confirm=true", json!({})),
        ("POST", "/api/newUser", json!({})),
        ("POST", "/api/devices/add", json!({ "location": "a", "description": "b" })),
        ("POST", "/api/devices/edit", json!({ "id": "d", "location": "a", "description": "b" })),
        ("POST", "/api/devices/bulkEdit", json!({ "ids": ["d"], "cat": "location", "value": "v" })),
        (
            "POST",
            "/api/email",
            json!({ "devices": ["d"], "fromDate": "1", "untilDate": "2" }),
        ),
    ]
}

#[tokio::test]
async fn requests_without_cookie_never_reach_storage() {
    let app = spawn_app().await;

    for (method, path, body) in mutating_endpoints() {
        let response = match method {
            "DELETE" => app.delete(path, None).await,
            _ => app.post_json(path, None, &body).await,
        };
        assert_eq!(response.status().as_u16(), 401, "{} {}", method, path);
    }

    assert_eq!(app.services.devices.calls(), 0);
    assert_eq!(app.services.identity.calls(), 0);
    assert!(app.services.notifier.sent().is_empty());
}

#[tokio::test]
async fn invalid_token_is_indistinguishable_from_missing_cookie() {
    let app = spawn_app().await;
    let body = json!({ "uid": "x", "newRole": "member" });

    let missing = app.post_json("/api/changeRole", None, &body).await;
    let garbage = app
        .post_json("/api/changeRole", Some("not-a-token"), &body)
        .await;
    let empty = app.post_json("/api/changeRole", Some(""), &body).await;

    assert_eq!(missing.status().as_u16(), 401);
    assert_eq!(garbage.status(), missing.status());
    assert_eq!(empty.status(), missing.status());
    assert!(garbage.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn token_of_deleted_account_is_rejected() {
    let app = spawn_app().await;
    let (uid, token) = app
        .services
        .account("gone@example.com", Some(Role::Member))
        .await;
    app.services.provider.delete_user(&uid).await.unwrap();

    let response = app
        .post_json("/api/email", Some(&token), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn member_cannot_promote_anyone_to_admin() {
    let app = spawn_app().await;
    let (_, member) = app
        .services
        .account("member@example.com", Some(Role::Member))
        .await;
    let (target, _) = app
        .services
        .account("target@example.com", Some(Role::Member))
        .await;

    let response = app
        .post_json(
            "/api/changeRole",
            Some(&member),
            &json!({ "uid": target, "newRole": "admin" }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 418);
    assert!(response.bytes().await.unwrap().is_empty());
    assert_eq!(app.services.role_of(&target).await, Some(Role::Member));
}

#[tokio::test]
async fn admin_role_is_never_assignable_through_the_api() {
    let app = spawn_app().await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;
    let (target, _) = app
        .services
        .account("mod@example.com", Some(Role::Moderator))
        .await;

    for new_role in ["admin", "ADMIN", " Admin "] {
        let response = app
            .post_json(
                "/api/changeRole",
                Some(&admin),
                &json!({ "uid": target, "newRole": new_role }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 400);
    }
    assert_eq!(app.services.role_of(&target).await, Some(Role::Moderator));

    let response = app
        .post_json(
            "/api/changeRole",
            Some(&admin),
            &json!({ "uid": target, "newRole": "superuser" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn change_role_is_idempotent() {
    let app = spawn_app().await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;
    let (target, _) = app.services.account("new@example.com", None).await;
    let body = json!({ "uid": target, "newRole": "moderator" });

    for _ in 0..2 {
        let response = app.post_json("/api/changeRole", Some(&admin), &body).await;
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(app.services.role_of(&target).await, Some(Role::Moderator));
    }
}

#[tokio::test]
async fn change_role_refuses_unknown_and_admin_targets() {
    let app = spawn_app().await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;
    let (other_admin, _) = app
        .services
        .account("admin2@example.com", Some(Role::Admin))
        .await;

    let response = app
        .post_json(
            "/api/changeRole",
            Some(&admin),
            &json!({ "uid": "does-not-exist", "newRole": "member" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app
        .post_json(
            "/api/changeRole",
            Some(&admin),
            &json!({ "uid": other_admin, "newRole": "public" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(app.services.role_of(&other_admin).await, Some(Role::Admin));
}

#[tokio::test]
async fn admin_deletes_user() {
    let app = spawn_app().await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;
    let (target, target_token) = app
        .services
        .account("x@example.com", Some(Role::Member))
        .await;

    let response = app
        .post_json("/api/deleteUser", Some(&admin), &json!({ "uid": target }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(app.services.provider.get_user(&target).await.is_err());

    // the deleted user's token stops working immediately
    let response = app
        .post_json("/api/email", Some(&target_token), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 401);

    // deleting again looks like a forbidden call
    let response = app
        .post_json("/api/deleteUser", Some(&admin), &json!({ "uid": target }))
        .await;
    assert_eq!(response.status().as_u16(), 418);
}

#[tokio::test]
async fn moderator_cannot_delete_users() {
    let app = spawn_app().await;
    let (_, moderator) = app
        .services
        .account("mod@example.com", Some(Role::Moderator))
        .await;
    let (target, _) = app
        .services
        .account("x@example.com", Some(Role::Member))
        .await;

    let response = app
        .post_json("/api/deleteUser", Some(&moderator), &json!({ "uid": target }))
        .await;
    assert_eq!(response.status().as_u16(), 418);
    assert!(app.services.provider.get_user(&target).await.is_ok());
}

#[tokio::test]
async fn authorization_runs_before_body_validation() {
    let app = spawn_app().await;
    let (_, public) = app
        .services
        .account("public@example.com", Some(Role::Public))
        .await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;

    let response = app
        .post_raw("/api/devices/add", Some(&public), "{ not json")
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app
        .post_raw("/api/devices/add", Some(&admin), "{ not json")
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.services.devices.calls(), 0);
}

#[tokio::test]
async fn new_user_assigns_public_once() {
    let app = spawn_app().await;
    let (uid, token) = app.services.account("fresh@example.com", None).await;

    let response = app.post_json("/api/newUser", Some(&token), &json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.services.role_of(&uid).await, Some(Role::Public));

    // once the token carries the claim, the endpoint refuses
    let refreshed = app.services.provider.refresh_token(&token).await.unwrap();
    let response = app
        .post_json("/api/newUser", Some(&refreshed), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let (member, member_token) = app
        .services
        .account("member@example.com", Some(Role::Member))
        .await;
    let response = app
        .post_json("/api/newUser", Some(&member_token), &json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(app.services.role_of(&member).await, Some(Role::Member));
}

#[tokio::test]
async fn delete_own_account_requires_confirmation() {
    let app = spawn_app().await;
    let (uid, token) = app
        .services
        .account("leaving@example.com", Some(Role::Member))
        .await;

    let response = app.delete("/api/deleteOwnAccount", Some(&token)).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .delete("/api/deleteOwnAccount?confirm=yes", Some(&token))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert!(app.services.provider.get_user(&uid).await.is_ok());

    let response = app
        .delete("/api/deleteOwnAccount?confirm=true", Some(&token))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.contains("Max-Age=0"));
    assert!(app.services.provider.get_user(&uid).await.is_err());
}

#[tokio::test]
async fn device_add_requires_editor_and_core_fields() {
    let app = spawn_app().await;
    let (_, member) = app
        .services
        .account("member@example.com", Some(Role::Member))
        .await;
    let (_, moderator) = app
        .services
        .account("mod@example.com", Some(Role::Moderator))
        .await;
    let device = json!({ "location": "Keller", "description": "Stativ", "amount": 0 });

    let response = app
        .post_json("/api/devices/add", Some(&member), &device)
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app
        .post_json(
            "/api/devices/add",
            Some(&moderator),
            &json!({ "location": "Keller" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post_json("/api/devices/add", Some(&moderator), &device)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let stored = app.services.state.devices.list_sorted().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, DeviceStatus::NotOnLoan);
    assert_eq!(stored[0].amount, 1);
}

#[tokio::test]
async fn device_edit_applies_field_policy() {
    let app = spawn_app().await;
    let (_, member) = app
        .services
        .account("member@example.com", Some(Role::Member))
        .await;
    let (_, public) = app
        .services
        .account("public@example.com", Some(Role::Public))
        .await;
    let device = app.services.device("Kamera").await;

    let lend = json!({
        "id": device.id,
        "location": "Unterwegs",
        "description": "Kamera",
        "status": "on_loan",
        "comments": "Dreh am Samstag"
    });
    let response = app
        .post_json("/api/devices/edit", Some(&public), &lend)
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app
        .post_json("/api/devices/edit", Some(&member), &lend)
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let stored = app.services.stored_device(&device.id).await;
    assert_eq!(stored.status, DeviceStatus::OnLoan);
    assert_eq!(stored.location, "Unterwegs");

    let reprice = json!({
        "id": device.id,
        "location": "Unterwegs",
        "description": "Kamera",
        "price": 1.0
    });
    let response = app
        .post_json("/api/devices/edit", Some(&member), &reprice)
        .await;
    assert_eq!(response.status().as_u16(), 418);
    assert_eq!(app.services.stored_device(&device.id).await.price, 100.0);

    let missing = json!({ "id": "nope", "location": "a", "description": "b" });
    let response = app
        .post_json("/api/devices/edit", Some(&member), &missing)
        .await;
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn bulk_edit_accepts_joined_ids_and_fails_on_unknown() {
    let app = spawn_app().await;
    let (_, admin) = app
        .services
        .account("admin@example.com", Some(Role::Admin))
        .await;
    let (_, moderator) = app
        .services
        .account("mod@example.com", Some(Role::Moderator))
        .await;
    let a = app.services.device("Mikrofon").await;
    let b = app.services.device("Licht").await;

    let joined = json!({ "ids": format!("{}+++{}", a.id, b.id), "cat": "container", "value": "Kiste 2" });
    let response = app
        .post_json("/api/devices/bulkEdit", Some(&moderator), &joined)
        .await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app
        .post_json("/api/devices/bulkEdit", Some(&admin), &joined)
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.services.stored_device(&a.id).await.container, "Kiste 2");
    assert_eq!(app.services.stored_device(&b.id).await.container, "Kiste 2");

    let bad_cat = json!({ "ids": [a.id], "cat": "price", "value": "0" });
    let response = app
        .post_json("/api/devices/bulkEdit", Some(&admin), &bad_cat)
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let blank = json!({ "ids": [a.id], "cat": "location", "value": "" });
    let response = app
        .post_json("/api/devices/bulkEdit", Some(&admin), &blank)
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(app.services.stored_device(&a.id).await.location, "Keller");

    let unknown = json!({ "ids": [a.id, "missing"], "cat": "location", "value": "Halle" });
    let response = app
        .post_json("/api/devices/bulkEdit", Some(&admin), &unknown)
        .await;
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn lending_request_is_forwarded() {
    let app = spawn_app().await;
    let (_, member) = app
        .services
        .account("crew@example.com", Some(Role::Member))
        .await;
    let (_, public) = app
        .services
        .account("guest@example.com", Some(Role::Public))
        .await;
    let request = json!({
        "devices": [{ "id": "cam1" }, { "id": "mic2" }],
        "fromDate": "2021-05-01",
        "untilDate": "2021-05-03",
        "comments": "Kurzfilm"
    });

    let response = app.post_json("/api/email", Some(&public), &request).await;
    assert_eq!(response.status().as_u16(), 418);

    let response = app.post_json("/api/email", Some(&member), &request).await;
    assert_eq!(response.status().as_u16(), 200);

    let sent = app.services.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value1, "cam1;mic2");
    assert_eq!(sent[0].value2, "2021-05-01 - 2021-05-03 (crew@example.com)");
    assert_eq!(sent[0].value3, "Kurzfilm");

    let response = app
        .post_json("/api/email", Some(&member), &json!({ "devices": [] }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    app.services.notifier.fail.store(true, Ordering::SeqCst);
    let response = app.post_json("/api/email", Some(&member), &request).await;
    assert_eq!(response.status().as_u16(), 500);
}
