//! End-to-end tests driving the full router against an in-memory database.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use opsguard::db;
use opsguard::routes::{api_router, ApiConfig};

struct TestApp {
    app: Router,
    pool: SqlitePool,
}

impl TestApp {
    async fn new() -> Self {
        let pool = db::connect_in_memory().await.unwrap();
        let app = api_router(pool.clone(), ApiConfig::default());

        Self { app, pool }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    /// Registers a user and logs them in, returning `(token, user_id)`.
    async fn register_and_login(&self, name: &str, email: &str, password: &str) -> (String, String) {
        let (status, _) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        self.login(email, password).await
    }

    async fn login(&self, email: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        (
            body["access_token"].as_str().unwrap().to_owned(),
            body["user"]["id"].as_str().unwrap().to_owned(),
        )
    }

    /// Registers an admin. Role promotion happens directly against the
    /// store since the API surface deliberately has no promotion path.
    async fn admin(&self, name: &str, email: &str) -> (String, String) {
        let (status, _) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "admin-pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await
            .unwrap();

        self.login(email, "admin-pw").await
    }
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_duplicate_email() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Alice", "email": "Alice@X.com", "password": "pw1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@x.com");
    assert_eq!(body["role"], "guard");

    // Login succeeds with the right password.
    let (token, _) = app.login("alice@x.com", "pw1").await;
    let (status, me) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice");

    // Wrong password and unknown email fail with the same generic error.
    let (status, wrong_pw) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@x.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, unknown) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "pw1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_pw, unknown);

    // Registering the same email again (any casing) conflicts.
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Imposter", "email": "ALICE@x.com", "password": "pw2" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn no_response_ever_carries_a_password_digest() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    app.post(
        "/api/availability",
        &token,
        json!({ "date": "2025-11-27", "is_available": true }),
    )
    .await;

    for (uri, token) in [
        ("/api/auth/me", &token),
        ("/api/availability/me?month=2025-11", &token),
        ("/api/availability?month=2025-11", &admin_token),
        ("/api/availability/admin?guard=Alice", &admin_token),
        ("/api/shifts/me", &token),
        ("/api/shifts", &admin_token),
        ("/api/schedules/me", &token),
    ] {
        let (status, body) = app.get(uri, token).await;
        assert_eq!(status, StatusCode::OK, "GET {}", uri);
        assert!(
            !body.to_string().contains("pass_hash"),
            "GET {} leaked a digest: {}",
            uri,
            body
        );
    }
}

#[tokio::test]
async fn authentication_failures_are_uniform() {
    let app = TestApp::new().await;

    let (status, no_token) = app.request("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, bad_token) = app.get("/api/auth/me", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(no_token, bad_token);
}

#[tokio::test]
async fn double_submission_upserts_one_record() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("Alice", "alice@x.com", "pw1").await;

    let (status, first) = app
        .post(
            "/api/availability",
            &token,
            json!({ "date": "2025-11-27", "is_available": true, "start_time": "9:00 PM" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user_id"], user_id.as_str());
    assert_eq!(first["is_available"], true);

    let (status, second) = app
        .post(
            "/api/availability",
            &token,
            json!({ "date": "2025-11-27", "is_available": false, "notes": "family visit" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Same record: id and created_at survive, the fields reflect the
    // second submission.
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["created_at"], first["created_at"]);
    assert_eq!(second["is_available"], false);
    assert_eq!(second["notes"], "family visit");
    assert_eq!(second["start_time"], Value::Null);

    let (status, listed) = app.get("/api/availability/me?month=2025-11", &token).await;
    assert_eq!(status, StatusCode::OK);
    let items = listed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["is_available"], false);
}

#[tokio::test]
async fn malformed_dates_and_months_are_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;

    let (status, _) = app
        .post(
            "/api/availability",
            &token,
            json!({ "date": "11/27/2025", "is_available": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/availability/me?month=2025-13", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing was written by the rejected submission.
    let (_, listed) = app.get("/api/availability/me?month=2025-11", &token).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn admin_month_overview_is_ordered_and_admin_only() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (bob, _) = app.register_and_login("Bob", "bob@x.com", "pw2").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    app.post(
        "/api/availability",
        &bob,
        json!({ "date": "2025-11-02", "is_available": true }),
    )
    .await;
    app.post(
        "/api/availability",
        &alice,
        json!({ "date": "2025-11-02", "is_available": false }),
    )
    .await;
    app.post(
        "/api/availability",
        &alice,
        json!({ "date": "2025-11-01", "is_available": true }),
    )
    .await;
    app.post(
        "/api/availability",
        &alice,
        json!({ "date": "2025-12-01", "is_available": true }),
    )
    .await;

    let (status, _) = app.get("/api/availability?month=2025-11", &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/availability?month=2025-11", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    // Date ascending, then display name ascending within a date.
    assert_eq!(items[0]["date"], "2025-11-01");
    assert_eq!(items[1]["date"], "2025-11-02");
    assert_eq!(items[1]["user_name"], "Alice");
    assert_eq!(items[2]["user_name"], "Bob");
}

#[tokio::test]
async fn unresolvable_guard_lookup_returns_empty_list() {
    let app = TestApp::new().await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    let (status, body) = app
        .get("/api/availability/admin?guard=Nobody%20Home", &admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);

    // A blank reference is a validation error, not an empty list.
    let (status, _) = app
        .get("/api/availability/admin?guard=%20", &admin_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guard_lookup_resolves_name_and_email() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    app.post(
        "/api/availability",
        &alice,
        json!({ "date": "2025-11-27", "is_available": true }),
    )
    .await;

    // By exact display name.
    let (status, by_name) = app
        .get("/api/availability/admin?guard=Alice", &admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_name.as_array().unwrap().len(), 1);
    assert_eq!(by_name[0]["user_email"], "alice@x.com");

    // By email, case-insensitively.
    let (status, by_email) = app
        .get("/api/availability/admin?guard=ALICE@X.com&month=2025-11", &admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_email.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn availability_delete_is_owner_or_admin_only() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (bob, _) = app.register_and_login("Bob", "bob@x.com", "pw2").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    let (_, record) = app
        .post(
            "/api/availability",
            &alice,
            json!({ "date": "2025-11-27", "is_available": true }),
        )
        .await;
    let id = record["id"].as_str().unwrap().to_owned();

    let (status, _) = app
        .request("DELETE", &format!("/api/availability/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request("DELETE", &format!("/api/availability/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // Gone now, even for an admin.
    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/availability/{}", id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shifts_are_append_only_and_paged() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;

    // Two shifts on the same date is allowed.
    for start in ["9:00 AM", "9:00 PM"] {
        let (status, body) = app
            .post(
                "/api/shifts",
                &token,
                json!({
                    "date": "2025-11-27",
                    "venue": "Front Gate",
                    "start_time": start,
                    "end_time": "later",
                    "total_hours": 8.0
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paid"], false);
    }

    let (status, all) = app.get("/api/shifts/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["items"].as_array().unwrap().len(), 2);
    assert_eq!(all["page"], 1);
    assert_eq!(all["page_size"], 20);

    let (_, page) = app.get("/api/shifts/me?page=1&page_size=1", &token).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    let (_, page_two) = app.get("/api/shifts/me?page=2&page_size=1", &token).await;
    assert_eq!(page_two["items"].as_array().unwrap().len(), 1);
    let (_, page_three) = app.get("/api/shifts/me?page=3&page_size=1", &token).await;
    assert_eq!(page_three["items"].as_array().unwrap().len(), 0);

    // Oversized page sizes are capped rather than honored.
    let (_, capped) = app.get("/api/shifts/me?page_size=100000", &token).await;
    assert_eq!(capped["page_size"], 100);

    // An absurd page number is just an empty page, not an overflow.
    let (status, far_out) = app
        .get(
            "/api/shifts/me?page=9223372036854775807&page_size=100",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(far_out["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn admin_shift_listing_attaches_guard_names() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    app.post(
        "/api/shifts",
        &token,
        json!({
            "date": "2025-11-27",
            "venue": "Front Gate",
            "start_time": "9:00 PM",
            "end_time": "5:00 AM",
            "total_hours": 8.0
        }),
    )
    .await;

    let (status, _) = app.get("/api/shifts", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/shifts", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["guard_name"], "Alice");

    // A shift whose user is gone still lists, with an explicit null name.
    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("alice@x.com")
        .execute(&app.pool)
        .await
        .unwrap();
    let (_, body) = app.get("/api/shifts", &admin_token).await;
    let orphan = body["items"][0].as_object().unwrap();
    assert!(orphan.contains_key("guard_name"));
    assert!(orphan["guard_name"].is_null());
}

#[tokio::test]
async fn paid_status_is_a_targeted_admin_update() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    // Marking a nonexistent shift paid is a 404.
    let (status, _) = app
        .request(
            "PUT",
            "/api/shifts/no-such-shift/paid",
            Some(&admin_token),
            Some(json!({ "paid": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, shift) = app
        .post(
            "/api/shifts",
            &token,
            json!({
                "date": "2025-11-27",
                "venue": "Front Gate",
                "start_time": "9:00 PM",
                "end_time": "5:00 AM",
                "total_hours": 8.0,
                "notes": "double-check the side door"
            }),
        )
        .await;
    let id = shift["id"].as_str().unwrap().to_owned();

    // Guards cannot flip the flag, even on their own shifts.
    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/shifts/{}/paid", id),
            Some(&token),
            Some(json!({ "paid": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/shifts/{}/paid", id),
            Some(&admin_token),
            Some(json!({ "paid": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // Every other field is untouched.
    let (_, page) = app.get("/api/shifts/me", &token).await;
    let updated = &page["items"][0];
    assert_eq!(updated["paid"], true);
    assert_eq!(updated["venue"], shift["venue"]);
    assert_eq!(updated["notes"], shift["notes"]);
    assert_eq!(updated["total_hours"], shift["total_hours"]);
    assert_eq!(updated["created_at"], shift["created_at"]);
    assert!(!updated["updated_at"].is_null());
}

#[tokio::test]
async fn shift_delete_is_owner_or_admin_only() {
    let app = TestApp::new().await;
    let (alice, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (bob, _) = app.register_and_login("Bob", "bob@x.com", "pw2").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    let shift = json!({
        "date": "2025-11-27",
        "venue": "Front Gate",
        "start_time": "9:00 PM",
        "end_time": "5:00 AM",
        "total_hours": 8.0
    });
    let (_, first) = app.post("/api/shifts", &alice, shift.clone()).await;
    let (_, second) = app.post("/api/shifts", &alice, shift).await;

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/shifts/{}", first["id"].as_str().unwrap()),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/shifts/{}", first["id"].as_str().unwrap()),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/shifts/{}", second["id"].as_str().unwrap()),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn schedule_for_unregistered_guard_is_found_by_name_fallback() {
    let app = TestApp::new().await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    // "Big Papi" has no account yet; creation still succeeds, unbound.
    let (status, created) = app
        .post(
            "/api/schedules",
            &admin_token,
            json!({
                "guard": "Big Papi",
                "note": "Stay sharp",
                "shifts": [
                    { "guard": "Big Papi", "date": "2025-11-27",
                      "start_time": "9:00 PM", "end_time": "5:00 AM" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["guard"], "Big Papi");
    assert!(created["guard_id"].is_null());

    // The guard registers afterwards; the binding is never re-derived, but
    // the name-match clause still surfaces the schedule.
    let (token, _) = app
        .register_and_login("Big Papi", "papi@x.com", "pw1")
        .await;
    let (status, schedules) = app.get("/api/schedules/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    let items = schedules.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0]["guard_id"].is_null());
    assert_eq!(items[0]["shifts"][0]["date"], "2025-11-27");
}

#[tokio::test]
async fn schedule_for_registered_guard_binds_and_matches_by_id() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    // Referenced by email this time; resolution binds the id at creation.
    let (status, created) = app
        .post(
            "/api/schedules",
            &admin_token,
            json!({
                "guard": "alice@x.com",
                "shifts": [{ "date": "2025-12-01", "start_time": "8:00 AM", "end_time": "4:00 PM" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["guard_id"], user_id.as_str());

    let (_, schedules) = app.get("/api/schedules/me", &token).await;
    assert_eq!(schedules.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn schedule_creation_validates_payload() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    let (admin_token, _) = app.admin("Root", "root@x.com").await;

    let (status, _) = app
        .post(
            "/api/schedules",
            &admin_token,
            json!({ "guard": "  ", "shifts": [{ "date": "2025-12-01" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/schedules",
            &admin_token,
            json!({ "guard": "Alice", "shifts": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/schedules",
            &token,
            json!({ "guard": "Alice", "shifts": [{ "date": "2025-12-01" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_updates_guard_credentials_properly() {
    let app = TestApp::new().await;
    let (token, _) = app.register_and_login("Alice", "alice@x.com", "pw1").await;
    app.register_and_login("Bob", "bob@x.com", "pw2").await;

    // Password change with the wrong current password is rejected.
    let (status, _) = app
        .request(
            "PUT",
            "/api/auth/me",
            Some(&token),
            Some(json!({ "password": "new-pw", "current_password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Email changes repeat the uniqueness pre-check.
    let (status, _) = app
        .request(
            "PUT",
            "/api/auth/me",
            Some(&token),
            Some(json!({ "email": "BOB@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A proper change works and the new password logs in.
    let (status, updated) = app
        .request(
            "PUT",
            "/api/auth/me",
            Some(&token),
            Some(json!({
                "name": "Alice Liddell",
                "password": "new-pw",
                "current_password": "pw1"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Alice Liddell");
    app.login("alice@x.com", "new-pw").await;
}
