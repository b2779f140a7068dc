use std::sync::Arc;

use axum::Router;
use bytes::Bytes;
use faction_badge::badge;
use faction_badge::models::user::Faction;
use faction_badge::test_util::{create_test_state, test_state_with_store, FailingStore};
use faction_badge::routes;
use http::{header, HeaderMap, Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// The cookie pair out of the Set-Cookie header, if any.
    fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)?
            .to_str()
            .ok()
            .and_then(|value| value.split(';').next())
            .map(String::from)
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> TestResponse {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = builder
        .body(match body {
            Some(value) => axum::body::Body::from(value.to_string()),
            None => axum::body::Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body,
    }
}

#[tokio::test]
async fn test_me_mints_a_guest_and_the_cookie_replays() {
    let app = routes::app(create_test_state());

    let first = send(&app, Method::GET, "/api/me", None, None).await;
    assert_eq!(first.status, StatusCode::OK);

    let body = first.json();
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["user"]["username"], "Guest");
    assert!(body["user"]["faction"].is_null());
    let guest_id = body["user"]["id"].as_i64().unwrap();

    let cookie = first.cookie().expect("first contact sets a session cookie");

    let second = send(&app, Method::GET, "/api/me", None, Some(&cookie)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["user"]["id"].as_i64().unwrap(), guest_id);
    // An established session is not re-issued
    assert!(second.cookie().is_none());
}

#[tokio::test]
async fn test_faction_assignment_then_badge() {
    let app = routes::app(create_test_state());

    let assigned = send(
        &app,
        Method::POST,
        "/api/faction",
        Some(json!({"faction": "A"})),
        None,
    )
    .await;
    assert_eq!(assigned.status, StatusCode::OK);

    let body = assigned.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["faction"], "A");
    let id = body["user"]["id"].as_i64().unwrap();

    let badge_response = send(
        &app,
        Method::GET,
        &format!("/badge?id={}", id),
        None,
        None,
    )
    .await;
    assert_eq!(badge_response.status, StatusCode::OK);
    assert_eq!(
        badge_response.headers.get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml; charset=utf-8"
    );
    assert_eq!(
        badge_response.headers.get(header::CACHE_CONTROL).unwrap(),
        "no-store, max-age=0"
    );
    assert_eq!(badge_response.body, badge::badge(Some(Faction::A)).as_bytes());
}

#[tokio::test]
async fn test_invalid_faction_is_rejected_without_mutation() {
    let app = routes::app(create_test_state());

    let assigned = send(
        &app,
        Method::POST,
        "/api/faction",
        Some(json!({"faction": "B"})),
        None,
    )
    .await;
    let cookie = assigned.cookie().unwrap();

    for invalid in [json!({"faction": "a"}), json!({"faction": "C"}), json!({"faction": ""}), json!({"faction": null}), json!({})] {
        let response = send(
            &app,
            Method::POST,
            "/api/faction",
            Some(invalid),
            Some(&cookie),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["ok"], false);
    }

    // Prior choice untouched
    let me = send(&app, Method::GET, "/api/me", None, Some(&cookie)).await;
    assert_eq!(me.json()["user"]["faction"], "B");
}

#[tokio::test]
async fn test_badge_tokens_are_lenient() {
    let app = routes::app(create_test_state());

    for (token, expected) in [
        ("A.svg", Some(Faction::A)),
        ("a.svg", Some(Faction::A)),
        ("1.svg", Some(Faction::A)),
        ("b.svg", Some(Faction::B)),
        ("2.svg", Some(Faction::B)),
        ("x.svg", None),
    ] {
        let response = send(
            &app,
            Method::GET,
            &format!("/badge/faction/{}", token),
            None,
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, badge::badge(expected).as_bytes(), "token {}", token);
    }
}

#[tokio::test]
async fn test_unknown_badge_id_renders_unset() {
    let app = routes::app(create_test_state());

    for uri in ["/badge/9999.svg", "/badge?id=9999", "/badge?id=not-a-number", "/badge"] {
        let response = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::OK, "uri {}", uri);
        assert_eq!(response.body, badge::badge(None).as_bytes(), "uri {}", uri);
    }
}

#[tokio::test]
async fn test_image_routes_render_the_card() {
    let app = routes::app(create_test_state());

    let response = send(&app, Method::GET, "/image/faction/b.svg", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, badge::card(Some(Faction::B)).as_bytes());

    let unset = send(&app, Method::GET, "/image", None, None).await;
    assert_eq!(unset.body, badge::card(None).as_bytes());
}

#[tokio::test]
async fn test_badge_survives_a_failing_store() {
    let app = routes::app(test_state_with_store(Arc::new(FailingStore)));

    let response = send(&app, Method::GET, "/badge?id=1", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, badge::badge(None).as_bytes());
}

#[tokio::test]
async fn test_stats_counts_users() {
    let state = create_test_state();
    let app = routes::app(state.clone());

    let a = state.store.create_guest("Guest").await.unwrap();
    state.store.create_guest("Guest").await.unwrap();
    state.store.set_faction(a.id, Faction::A).await.unwrap();

    let response = send(&app, Method::GET, "/api/stats", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["stats"]["totalUsers"], 2);
    assert_eq!(body["stats"]["factionA"], 1);
    assert_eq!(body["stats"]["factionB"], 0);
    assert_eq!(body["stats"]["undecided"], 1);
}

#[tokio::test]
async fn test_stats_failure_returns_500() {
    let app = routes::app(test_state_with_store(Arc::new(FailingStore)));

    let response = send(&app, Method::GET, "/api/stats", None, None).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({"ok": false, "error": "Failed to get stats"})
    );
}

#[tokio::test]
async fn test_config_reports_oauth_absence() {
    let app = routes::app(create_test_state());

    let response = send(&app, Method::GET, "/api/config", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["githubConfigured"], false);
    assert_eq!(body["baseUrl"], "http://localhost:8080");
}

#[tokio::test]
async fn test_login_routes_answer_501_when_unconfigured() {
    let app = routes::app(create_test_state());

    for uri in ["/auth/github", "/auth/github/callback?code=x&state=y"] {
        let response = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED, "uri {}", uri);
    }
}

#[tokio::test]
async fn test_logout_expires_the_session_cookie() {
    let app = routes::app(create_test_state());

    let response = send(&app, Method::POST, "/logout", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"ok": true}));

    let set_cookie = response
        .headers
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_index_is_served_without_caching() {
    let app = routes::app(create_test_state());

    for uri in ["/", "/index.html"] {
        let response = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(response.status, StatusCode::OK, "uri {}", uri);
        assert_eq!(
            response.headers.get(header::CACHE_CONTROL).unwrap(),
            "no-store, max-age=0"
        );
        assert!(response.body.starts_with(b"<!DOCTYPE html>"));
    }
}

#[tokio::test]
async fn test_health() {
    let app = routes::app(create_test_state());

    let response = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "sqlite");
    assert_eq!(body["githubLogin"], false);
}
