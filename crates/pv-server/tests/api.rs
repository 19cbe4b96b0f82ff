#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use pv_core::Config;
use pv_server::api::{AppState, build_router};
use pv_server::auth::Role;
use pv_server::auth::password::hash_password;
use pv_server::storage::{Store, UserRepository};

const PREFIX: &str = "/pv/api";
const ADMIN_PASSWORD: &str = "admin-password-123";
const USER_PASSWORD: &str = "alice-password-123";

struct TestApp {
    router: Router,
    users: UserRepository,
    store: Store,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    /// `name=value` of the session cookie set by this response.
    fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

async fn test_app() -> TestApp {
    let store = Store::open_in_memory().await.unwrap();
    let mut config = Config::default();
    config.session.secret = "integration-test-secret-0123456789abcdef".to_string();
    config.validate().unwrap();

    let state = AppState::new(store.clone(), &config).unwrap();
    let users = state.users.clone();
    TestApp {
        router: build_router(state, &config.server.path_prefix),
        users,
        store,
    }
}

impl TestApp {
    async fn add_user(&self, name: &str, password: &str, role: Role) -> i64 {
        let hash = hash_password(password).unwrap();
        self.users.create(name, &hash, role).await.unwrap()
    }

    /// Send a request and return status, headers and JSON body (`Null` if empty).
    async fn send(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let uri = format!("{PREFIX}{path}");
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::GET, path, cookie, None).await
    }

    async fn post(&self, path: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, path, cookie, Some(body)).await
    }

    async fn patch(&self, path: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::PATCH, path, cookie, Some(body)).await
    }

    async fn delete(&self, path: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::DELETE, path, cookie, None).await
    }

    async fn login(&self, name: &str, password: &str) -> String {
        let body = json!({ "name": name, "password": password });
        let reply = self.post("/login", None, body).await;
        assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.body);
        reply.session_cookie().unwrap()
    }
}

// === Session ===

#[tokio::test]
async fn welcome_without_cookie_is_logged_out() {
    let app = test_app().await;
    let reply = app.get("/welcome", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "loggedIn": false }));
}

#[tokio::test]
async fn login_sets_strict_http_only_cookie() {
    let app = test_app().await;
    let uid = app.add_user("alice", USER_PASSWORD, Role::User).await;
    let expected = json!({ "uid": uid, "name": "alice", "loggedIn": true });

    let body = json!({ "user": "alice", "password": USER_PASSWORD });
    let reply = app.post("/login", None, body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, expected);

    let set_cookie = reply.headers.get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"), "{set_cookie}");
    assert!(set_cookie.contains("SameSite=Strict"), "{set_cookie}");

    let cookie = reply.session_cookie().unwrap();
    let reply = app.get("/welcome", Some(&cookie)).await;
    assert_eq!(reply.body, expected);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;

    let body = json!({ "name": "alice", "password": "not-the-password" });
    let wrong = app.post("/login", None, body).await;
    let body = json!({ "name": "mallory", "password": "not-the-password" });
    let unknown = app.post("/login", None, body).await;

    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
    assert_eq!(wrong.body["error"], "Unknown user or wrong password");
    assert!(wrong.session_cookie().is_none());
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = test_app().await;
    let reply = app.get("/logout", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "loggedIn": false }));
    assert_eq!(reply.session_cookie().as_deref(), Some("session="));
}

#[tokio::test]
async fn forged_cookie_is_cleared_on_welcome() {
    let app = test_app().await;
    let forged = "session=forged.token.value";
    let reply = app.get("/welcome", Some(forged)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "loggedIn": false }));
    assert_eq!(reply.session_cookie().as_deref(), Some("session="));
}

// === Elements ===

#[tokio::test]
async fn reserve_then_list() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;
    let expected = json!({ "reservedElements": { "pv-a3": "Alice" } });

    let body = json!({ "name": "Alice" });
    let reply = app.post("/elements?mid=pv-a3", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, expected);

    let reply = app.get("/elements", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, expected);
}

#[tokio::test]
async fn duplicate_reservation_conflicts() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let body = json!({ "name": "Alice" });
    app.post("/elements?mid=pv-a3", Some(&cookie), body).await;
    let body = json!({ "name": "Bob" });
    let reply = app.post("/elements?mid=pv-a3", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = app.get("/elements", None).await;
    assert_eq!(reply.body["reservedElements"]["pv-a3"], "Alice");
}

#[tokio::test]
async fn invalid_element_id_is_bad_request() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let body = json!({ "name": "Alice" });
    let reply = app.post("/elements?mid=xx-1", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].as_str().unwrap().contains("xx-1"));

    let reply = app.get("/elements", None).await;
    assert_eq!(reply.body, json!({ "reservedElements": {} }));
}

#[tokio::test]
async fn anonymous_modify_and_release() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let reply = app.post("/elements?mid=wr-2", Some(&cookie), json!({})).await;
    assert_eq!(reply.body, json!({ "reservedElements": { "wr-2": null } }));

    let body = json!({ "name": "Kim" });
    let reply = app.patch("/elements?mid=wr-2", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "reservedElements": { "wr-2": "Kim" } }));

    let body = json!({ "name": "Kim" });
    let reply = app.patch("/elements?mid=wr-3", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.delete("/elements?mid=wr-2", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "reservedElements": {} }));

    let reply = app.delete("/elements?mid=wr-2", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn mutations_require_session() {
    let app = test_app().await;
    let body = json!({ "name": "Alice" });
    let reply = app.post("/elements?mid=pv-a3", None, body).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.delete("/elements?mid=pv-a3", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_mid_is_bad_request() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let reply = app.delete("/elements", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());
}

// === Users ===

#[tokio::test]
async fn user_management_requires_admin() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let reply = app.get("/users", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.get("/users", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_creates_lists_and_deletes_users() {
    let app = test_app().await;
    let admin_uid = app.add_user("admin", ADMIN_PASSWORD, Role::Admin).await;
    let cookie = app.login("admin", ADMIN_PASSWORD).await;

    let body = json!({ "name": " bob ", "password": "bob-password-123" });
    let reply = app.post("/users", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let listed = reply.body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1]["name"], "bob");
    assert!(listed[1].get("password").is_none());
    let bob_uid = listed[1]["uid"].as_i64().unwrap();

    let body = json!({ "name": "bob", "password": "bob-password-123" });
    let reply = app.post("/users", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let body = json!({ "name": "carol", "password": "short" });
    let reply = app.post("/users", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let own = format!("/users?uid={admin_uid}");
    let reply = app.delete(&own, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let bob = format!("/users?uid={bob_uid}");
    let reply = app.delete(&bob, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([{ "uid": admin_uid, "name": "admin" }]));

    let reply = app.delete(&bob, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_reset_revokes_existing_session() {
    let app = test_app().await;
    app.add_user("admin", ADMIN_PASSWORD, Role::Admin).await;
    let alice_uid = app.add_user("alice", USER_PASSWORD, Role::User).await;

    let alice = app.login("alice", USER_PASSWORD).await;
    let admin = app.login("admin", ADMIN_PASSWORD).await;

    let reply = app.get("/welcome", Some(&alice)).await;
    assert_eq!(reply.body["loggedIn"], true);

    let path = format!("/users?uid={alice_uid}");
    let body = json!({ "password": "brand-new-password" });
    let reply = app.patch(&path, Some(&admin), body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.session_cookie().is_none());

    let body = json!({ "name": "Alice" });
    let reply = app.post("/elements?mid=pv-b2", Some(&alice), body).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.get("/welcome", Some(&alice)).await;
    assert_eq!(reply.body, json!({ "loggedIn": false }));

    // The new password works and yields a fresh, valid session.
    let fresh = app.login("alice", "brand-new-password").await;
    let reply = app.get("/welcome", Some(&fresh)).await;
    assert_eq!(reply.body["loggedIn"], true);
}

#[tokio::test]
async fn admin_resetting_own_password_is_signed_out() {
    let app = test_app().await;
    let admin_uid = app.add_user("admin", ADMIN_PASSWORD, Role::Admin).await;
    let cookie = app.login("admin", ADMIN_PASSWORD).await;

    let path = format!("/users?uid={admin_uid}");
    let body = json!({ "password": "brand-new-password" });
    let reply = app.patch(&path, Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.session_cookie().as_deref(), Some("session="));
    assert_eq!(reply.body, json!([{ "uid": admin_uid, "name": "admin" }]));

    let reply = app.get("/users", Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    app.login("admin", "brand-new-password").await;
}

#[tokio::test]
async fn own_password_change_revokes_every_session() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let laptop = app.login("alice", USER_PASSWORD).await;
    let phone = app.login("alice", USER_PASSWORD).await;

    let body = json!({ "password": "another-password-1" });
    let reply = app.patch("/user/password", Some(&laptop), body).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(reply.session_cookie().as_deref(), Some("session="));

    for cookie in [&laptop, &phone] {
        let reply = app.get("/welcome", Some(cookie)).await;
        assert_eq!(reply.body, json!({ "loggedIn": false }));
    }

    let body = json!({ "name": "alice", "password": USER_PASSWORD });
    let reply = app.post("/login", None, body).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    app.login("alice", "another-password-1").await;
}

#[tokio::test]
async fn own_password_change_enforces_policy() {
    let app = test_app().await;
    app.add_user("alice", USER_PASSWORD, Role::User).await;
    let cookie = app.login("alice", USER_PASSWORD).await;

    let body = json!({ "password": "short" });
    let reply = app.patch("/user/password", Some(&cookie), body).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app.get("/welcome", Some(&cookie)).await;
    assert_eq!(reply.body["loggedIn"], true);
}

// === Health ===

#[tokio::test]
async fn health_reports_store_state() {
    let app = test_app().await;
    let reply = app.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "status": "ok" }));

    app.store.pool().close().await;
    let reply = app.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply.body["error"], "Service unavailable");
}

#[tokio::test]
async fn routes_live_under_prefix() {
    let app = test_app().await;
    let request = Request::builder().uri("/elements");
    let request = request.body(Body::empty()).unwrap();
    let resp = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
