use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::{json, Value};

use crate::test_utils::*;

/// Login as it arrives from `peer_ip` with no proxy in front
fn login_request(identity: &str, secret: &str, peer_ip: &str) -> Request<Body> {
    let mut request = json_request(
        Method::POST,
        "/api/login",
        json!({ "identity": identity, "secret": secret }),
    );
    let peer: SocketAddr = format!("{peer_ip}:40000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn forwarded_login(identity: &str, secret: &str, peer_ip: &str, forwarded_for: &str) -> Request<Body> {
    let mut request = login_request(identity, secret, peer_ip);
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    request
}

async fn register(app: &axum::Router, identity: &str, secret: &str) {
    let (status, _, _) = send(
        app,
        json_request(
            Method::POST,
            "/api/register",
            json!({"identity": identity, "secret": secret}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn max_age(headers: &HeaderMap) -> String {
    let cookie = headers[header::SET_COOKIE].to_str().unwrap();
    cookie
        .split(';')
        .map(str::trim)
        .find_map(|attr| attr.strip_prefix("Max-Age="))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_hash_then_verify() {
    let app = test_app(test_state(test_settings(default_rules())));

    let (status, _, body) = send(&app, json_request(Method::POST, "/api/hash", json!({"secret": "hunter2"}))).await;
    assert_eq!(status, StatusCode::OK);
    let hash = body["hash"].as_str().unwrap().to_string();
    assert!(hash.starts_with("$scrypt$"));
    assert!(!hash.contains("hunter2"));

    let (status, _, body) = send(
        &app,
        json_request(Method::POST, "/api/verify", json!({"secret": "hunter2", "hash": hash})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matches": true}));

    let (status, _, body) = send(
        &app,
        json_request(Method::POST, "/api/verify", json!({"secret": "hunter3", "hash": hash})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"matches": false}));
}

#[tokio::test]
async fn test_hash_endpoint_input_errors() {
    let app = test_app(test_state(test_settings(default_rules())));

    for body in [json!({"secret": ""}), json!({})] {
        let (status, _, body) = send(&app, json_request(Method::POST, "/api/hash", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VAL_001");
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/hash")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_endpoint_input_errors() {
    let app = test_app(test_state(test_settings(default_rules())));

    let (status, _, body) = send(
        &app,
        json_request(Method::POST, "/api/verify", json!({"secret": "x", "hash": "not-a-hash"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_002");

    let (status, _, _) = send(&app, json_request(Method::POST, "/api/verify", json!({"secret": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        json_request(Method::POST, "/api/verify", json!({"secret": "", "hash": "$scrypt$"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_refuses_hashes_above_cost_ceiling() {
    let app = test_app(test_state(test_settings(default_rules())));

    for hash in [
        "$scrypt$ln=40,r=8,p=1$c2FsdHNhbHRzYWx0$ZGlnZXN0ZGlnZXN0ZGlnZXN0",
        "$argon2id$v=19$m=4194304,t=1,p=1$c2FsdHNhbHRzYWx0$ZGlnZXN0ZGlnZXN0ZGlnZXN0",
    ] {
        let (status, _, body) = send(
            &app,
            json_request(Method::POST, "/api/verify", json!({"secret": "x", "hash": hash})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{hash}");
        assert_eq!(body["error"]["code"], "VAL_002");
    }

    // the server keeps answering afterwards
    let (status, _, _) = send(&app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_and_session_flow() {
    let app = test_app(test_state(test_settings(default_rules())));

    let (status, headers, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/register",
            json!({"identity": "alice@example.com", "secret": "wonderland"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["identity"], "alice@example.com");
    assert_eq!(body["session"]["role"], "user");
    assert_eq!(max_age(&headers), "86400");
    let user_id = body["session"]["user_id"].clone();

    let (status, headers, body) = send(&app, login_request("alice@example.com", "wonderland", "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["user_id"], user_id);
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(!set_cookie.contains("Secure"));

    let cookie = session_cookie(&headers);
    let (status, _, body) = send(&app, get_request("/api/session", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["role"], "user");

    // the same session unlocks application routes behind the gate
    let (status, _, _) = send(&app, get_request("/dashboard/settings", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_endpoint_requires_a_session() {
    let app = test_app(test_state(test_settings(default_rules())));
    let (status, _, _) = send(&app, get_request("/api/session", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_identity_registers_as_admin() {
    let app = test_app(test_state(test_settings(default_rules())));

    let (status, headers, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/register",
            json!({"identity": "admin@example.com", "secret": "root-pass"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session"]["role"], "admin");

    let cookie = session_cookie(&headers);
    let (status, _, _) = send(&app, get_request("/admin/users", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app(test_state(test_settings(default_rules())));
    register(&app, "bob", "builder").await;

    let again = json_request(
        Method::POST,
        "/api/register",
        json!({"identity": "bob", "secret": "other"}),
    );
    let (status, _, body) = send(&app, again).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ACC_001");
}

#[tokio::test]
async fn test_bad_credentials_share_one_response() {
    let app = test_app(test_state(test_settings(default_rules())));
    send(
        &app,
        json_request(Method::POST, "/api/register", json!({"identity": "carol", "secret": "right"})),
    )
    .await;

    let (wrong_status, wrong_headers, wrong_body) = send(&app, login_request("carol", "wrong", "10.0.0.2")).await;
    let (unknown_status, _, unknown_body) = send(&app, login_request("nobody", "right", "10.0.0.3")).await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert!(wrong_headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_repeated_failures_lock_out_the_client() {
    // test settings allow three attempts
    let app = test_app(test_state(test_settings(default_rules())));
    send(
        &app,
        json_request(Method::POST, "/api/register", json!({"identity": "dave", "secret": "right"})),
    )
    .await;

    for _ in 0..3 {
        let (status, _, _) = send(&app, login_request("dave", "wrong", "203.0.113.9")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, body) = send(&app, login_request("dave", "right", "203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "AUTH_003");

    let (status, _, _) = send(&app, login_request("dave", "right", "203.0.113.10")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lockout_is_per_peer_without_proxy_headers() {
    let app = test_app(test_state(test_settings(default_rules())));
    register(&app, "erin", "right").await;

    for _ in 0..3 {
        let (status, _, _) = send(&app, login_request("erin", "wrong", "198.51.100.1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, _) = send(&app, login_request("erin", "right", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // a different connection is not caught in the first one's lockout
    let (status, _, _) = send(&app, login_request("erin", "right", "198.51.100.2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_untrusted_forwarded_headers_do_not_evade_lockout() {
    let app = test_app(test_state(test_settings(default_rules())));
    register(&app, "frank", "right").await;

    for i in 0..3 {
        let spoofed = format!("203.0.113.{i}");
        let (status, _, _) = send(&app, forwarded_login("frank", "wrong", "198.51.100.7", &spoofed)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, _) = send(
        &app,
        forwarded_login("frank", "right", "198.51.100.7", "203.0.113.99"),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_keys_by_forwarded_address() {
    let mut settings = test_settings(default_rules());
    settings.server.trust_forwarded_headers = true;
    let app = test_app(test_state(settings));
    register(&app, "gina", "right").await;

    // every request comes through the same proxy connection
    for _ in 0..3 {
        let (status, _, _) = send(&app, forwarded_login("gina", "wrong", "10.0.0.1", "203.0.113.5")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, _, _) = send(&app, forwarded_login("gina", "right", "10.0.0.1", "203.0.113.5")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, _, _) = send(&app, forwarded_login("gina", "right", "10.0.0.1", "203.0.113.6")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_the_cookie() {
    let mut settings = test_settings(default_rules());
    settings.session.secure_cookie = true;
    let app = test_app(test_state(settings));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/logout")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(session_cookie(&headers), "warden_session=");
    assert_eq!(max_age(&headers), "0");
    assert!(headers[header::SET_COOKIE].to_str().unwrap().ends_with("; Secure"));
}

#[tokio::test]
async fn test_health() {
    let app = test_app(test_state(test_settings(default_rules())));
    let (status, _, _) = send(&app, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}
