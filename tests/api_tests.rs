use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use lottarr::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;
use totp_rs::{Algorithm, Secret, TOTP};

/// Seeded admin credentials (must match m20240101_initial.rs)
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "Admin1!";
const ADMIN_TOTP_SEED: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // a single pooled connection keeps the in-memory database shared
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.server.secure_cookies = false;
    // minimal Argon2 cost so the suite stays fast
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = lottarr::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    lottarr::api::router(state).await
}

fn totp_code(seed: &str) -> String {
    let secret = Secret::Encoded(seed.to_string())
        .to_bytes()
        .expect("valid seed");
    TOTP::new(Algorithm::SHA1, 6, 1, 30, secret)
        .expect("valid TOTP params")
        .generate_current()
        .expect("system time")
}

/// Fire one JSON request, returning (status, session cookie if set, body).
async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }

    let request = builder
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, set_cookie, body)
}

fn register_payload(email: &str) -> Value {
    json!({
        "email": email,
        "firstname": "Test",
        "lastname": "User",
        "phone": "0191-123-4567",
        "password": "Passw0rd!",
        "confirm_password": "Passw0rd!",
    })
}

/// Register a user and log them in, returning (session cookie, TOTP seed).
async fn register_and_login(app: &Router, email: &str) -> (String, String) {
    let (status, _, body) = request(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload(email)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");

    let seed = body["data"]["totp_seed"].as_str().unwrap().to_string();
    let cookie = login(app, email, "Passw0rd!", &totp_code(&seed), None).await;

    (cookie, seed)
}

async fn login(
    app: &Router,
    email: &str,
    password: &str,
    code: &str,
    cookie: Option<&str>,
) -> String {
    let (status, set_cookie, body) = request(
        app,
        "POST",
        "/api/auth/login",
        cookie,
        Some(json!({ "email": email, "password": password, "totp_code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    set_cookie.expect("login sets a session cookie")
}

async fn login_admin(app: &Router) -> String {
    login(
        app,
        ADMIN_EMAIL,
        ADMIN_PASSWORD,
        &totp_code(ADMIN_TOTP_SEED),
        None,
    )
    .await
}

#[tokio::test]
async fn test_unauthenticated_requests_are_refused() {
    let app = spawn_app().await;

    for uri in [
        "/api/lottery/draws",
        "/api/lottery/results",
        "/api/auth/account",
        "/api/admin/users",
    ] {
        let (status, _, _) = request(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_register_login_shifts_timestamps() {
    let app = spawn_app().await;

    let (cookie, seed) = register_and_login(&app, "alice@example.com").await;

    let (status, _, body) = request(&app, "GET", "/api/auth/account", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let first_login = body["data"]["current_login"].as_str().unwrap().to_string();
    assert!(body["data"]["last_login"].is_null());
    assert_eq!(body["data"]["role"], "user");

    // second login shifts last_login to the prior current_login
    let cookie = login(&app, "alice@example.com", "Passw0rd!", &totp_code(&seed), None).await;
    let (_, _, body) = request(&app, "GET", "/api/auth/account", Some(&cookie), None).await;

    assert_eq!(body["data"]["last_login"], Value::String(first_login));
    assert!(body["data"]["current_login"].is_string());
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let app = spawn_app().await;

    let (status, _, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload("bob@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload("bob@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email address already exists");
}

#[tokio::test]
async fn test_registration_validation_is_enforced_server_side() {
    let app = spawn_app().await;

    let mut bad_phone = register_payload("carol@example.com");
    bad_phone["phone"] = json!("0191 123 4567");

    let mut weak_password = register_payload("carol@example.com");
    weak_password["password"] = json!("password");
    weak_password["confirm_password"] = json!("password");

    let mut bad_name = register_payload("carol@example.com");
    bad_name["firstname"] = json!("Ca*ol");

    for payload in [bad_phone, weak_password, bad_name] {
        let (status, _, _) =
            request(&app, "POST", "/api/auth/register", None, Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_login_failure_message_is_generic() {
    let app = spawn_app().await;

    let (status, _, _) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload("dave@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // wrong password for a real account
    let (status, cookie, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "dave@example.com", "password": "Wrong0rd!", "totp_code": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let real_account_error = body["error"].as_str().unwrap().to_string();
    assert!(real_account_error.contains("2 login attempts remaining"));

    // unknown email produces the same generic wording
    let cookie = cookie.unwrap();
    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        Some(&cookie),
        Some(json!({ "email": "nobody@example.com", "password": "Wrong0rd!", "totp_code": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let unknown_error = body["error"].as_str().unwrap();
    assert!(unknown_error.contains("Please check your login details and try again"));
    assert!(unknown_error.contains("1 login attempts remaining"));
}

#[tokio::test]
async fn test_totp_is_required_for_login() {
    let app = spawn_app().await;

    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload("erin@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // correct password, wrong code: same generic failure
    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "erin@example.com", "password": "Passw0rd!", "totp_code": "000000" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Please check your login details")
    );
}

#[tokio::test]
async fn test_lockout_after_three_failures_and_reset() {
    let app = spawn_app().await;

    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(register_payload("frank@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let seed = body["data"]["totp_seed"].as_str().unwrap().to_string();

    let bad_login = json!({
        "email": "frank@example.com",
        "password": "Wrong0rd!",
        "totp_code": "000000",
    });

    let (status, cookie, _) =
        request(&app, "POST", "/api/auth/login", None, Some(bad_login.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let cookie = cookie.unwrap();

    let (status, _, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        Some(&cookie),
        Some(bad_login.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // third consecutive failure crosses the threshold
    let (status, _, body) = request(
        &app,
        "POST",
        "/api/auth/login",
        Some(&cookie),
        Some(bad_login.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert!(body["error"].as_str().unwrap().contains("reset"));

    // a fourth attempt is refused even with correct credentials
    let good_login = json!({
        "email": "frank@example.com",
        "password": "Passw0rd!",
        "totp_code": totp_code(&seed),
    });
    let (status, _, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        Some(&cookie),
        Some(good_login.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::LOCKED);

    // explicit reset restores the ability to attempt login
    let (status, _, _) = request(&app, "POST", "/api/auth/reset", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let good_login = json!({
        "email": "frank@example.com",
        "password": "Passw0rd!",
        "totp_code": totp_code(&seed),
    });
    let (status, _, _) = request(
        &app,
        "POST",
        "/api/auth/login",
        Some(&cookie),
        Some(good_login),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_gate_records_security_event() {
    let app = spawn_app().await;

    let (cookie, _) = register_and_login(&app, "grace@example.com").await;

    // a user invoking an admin-only operation gets 403
    let (status, _, _) = request(&app, "GET", "/api/admin/users", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // ... and the denial is in the audit log with the correct actor
    let admin_cookie = login_admin(&app).await;
    let (status, _, body) = request(
        &app,
        "GET",
        "/api/admin/security-events",
        Some(&admin_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = body["data"].as_array().unwrap();
    let denial = events
        .iter()
        .find(|e| e["message"] == "invalid access attempt")
        .expect("denial event recorded");
    assert_eq!(denial["actor_email"], "grace@example.com");
    assert_eq!(denial["role"], "user");
    assert_eq!(denial["category"], "SECURITY");
}

#[tokio::test]
async fn test_audit_log_covers_the_auth_lifecycle() {
    let app = spawn_app().await;

    let (cookie, _) = register_and_login(&app, "heidi@example.com").await;
    let (status, _, _) = request(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let admin_cookie = login_admin(&app).await;
    let (_, _, body) = request(
        &app,
        "GET",
        "/api/admin/security-events",
        Some(&admin_cookie),
        None,
    )
    .await;

    let messages: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["actor_email"] == "heidi@example.com")
        .filter_map(|e| e["message"].as_str())
        .collect();

    for expected in ["user registration", "log in", "log out"] {
        assert!(messages.contains(&expected), "missing {expected} event");
    }
}

#[tokio::test]
async fn test_draw_round_trip_is_owner_scoped() {
    let app = spawn_app().await;

    let (ivan_cookie, _) = register_and_login(&app, "ivan@example.com").await;

    let (status, _, body) = request(
        &app,
        "POST",
        "/api/lottery/draws",
        Some(&ivan_cookie),
        Some(json!({ "numbers": [1, 2, 3, 4, 5, 6] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["numbers"], "1 2 3 4 5 6");
    assert_eq!(body["data"]["been_played"], false);
    assert_eq!(body["data"]["lottery_round"], 0);

    // the stored ciphertext decrypts back for the owner
    let (status, _, body) =
        request(&app, "GET", "/api/lottery/draws", Some(&ivan_cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let draws = body["data"].as_array().unwrap();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0]["numbers"], "1 2 3 4 5 6");

    // another user sees none of it
    let (judy_cookie, _) = register_and_login(&app, "judy@example.com").await;
    let (status, _, body) =
        request(&app, "GET", "/api/lottery/draws", Some(&judy_cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_draw_submission_is_validated() {
    let app = spawn_app().await;

    let (cookie, _) = register_and_login(&app, "kevin@example.com").await;

    for numbers in [
        json!([1, 2, 3, 4, 5]),
        json!([1, 2, 3, 4, 5, 6, 7]),
        json!([0, 2, 3, 4, 5, 6]),
        json!([1, 2, 3, 4, 5, 61]),
    ] {
        let (status, _, _) = request(
            &app,
            "POST",
            "/api/lottery/draws",
            Some(&cookie),
            Some(json!({ "numbers": numbers })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{numbers}");
    }
}

#[tokio::test]
async fn test_admin_cannot_submit_user_draws() {
    let app = spawn_app().await;

    let admin_cookie = login_admin(&app).await;
    let (status, _, _) = request(
        &app,
        "POST",
        "/api/lottery/draws",
        Some(&admin_cookie),
        Some(json!({ "numbers": [1, 2, 3, 4, 5, 6] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_round_resolution_results_and_clear() {
    let app = spawn_app().await;

    let (player_cookie, _) = register_and_login(&app, "laura@example.com").await;

    for numbers in [json!([4, 8, 15, 16, 23, 42]), json!([1, 2, 3, 4, 5, 6])] {
        let (status, _, _) = request(
            &app,
            "POST",
            "/api/lottery/draws",
            Some(&player_cookie),
            Some(json!({ "numbers": numbers })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // no results before the round is played
    let (status, _, body) =
        request(&app, "GET", "/api/lottery/results", Some(&player_cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let admin_cookie = login_admin(&app).await;

    // resolving without a master draw is refused
    let (status, _, _) = request(
        &app,
        "POST",
        "/api/admin/round/resolve",
        Some(&admin_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // author the master selection, in a different order than the entry
    let (status, _, body) = request(
        &app,
        "POST",
        "/api/admin/master-draw",
        Some(&admin_cookie),
        Some(json!({ "numbers": [42, 23, 16, 15, 8, 4] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lottery_round"], 1);

    let (status, _, body) = request(
        &app,
        "GET",
        "/api/admin/master-draw",
        Some(&admin_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["numbers"], "42 23 16 15 8 4");

    let (status, _, body) = request(
        &app,
        "POST",
        "/api/admin/round/resolve",
        Some(&admin_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["round"], 1);
    assert_eq!(body["data"]["draws_played"], 2);
    assert_eq!(body["data"]["winners"], 1);

    // the player's entries are now results, with the match flag set
    let (_, _, body) =
        request(&app, "GET", "/api/lottery/results", Some(&player_cookie), None).await;
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);

    let winner = results
        .iter()
        .find(|d| d["numbers"] == "4 8 15 16 23 42")
        .unwrap();
    assert_eq!(winner["matches_master"], true);
    assert_eq!(winner["been_played"], true);
    assert_eq!(winner["lottery_round"], 1);

    let loser = results.iter().find(|d| d["numbers"] == "1 2 3 4 5 6").unwrap();
    assert_eq!(loser["matches_master"], false);

    // nothing playable remains
    let (_, _, body) =
        request(&app, "GET", "/api/lottery/draws", Some(&player_cookie), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // clear played draws; a second call is a no-op
    let (status, _, body) = request(
        &app,
        "DELETE",
        "/api/lottery/draws/played",
        Some(&player_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 2);

    let (status, _, body) = request(
        &app,
        "DELETE",
        "/api/lottery/draws/played",
        Some(&player_cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 0);
}

#[tokio::test]
async fn test_registration_never_returns_secret_material_twice() {
    let app = spawn_app().await;

    let (cookie, _) = register_and_login(&app, "mallory@example.com").await;

    // the account view exposes no hash, seed or key
    let (_, _, body) = request(&app, "GET", "/api/auth/account", Some(&cookie), None).await;
    let account = body["data"].as_object().unwrap();
    assert!(!account.contains_key("password_hash"));
    assert!(!account.contains_key("totp_seed"));
    assert!(!account.contains_key("draw_key"));
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = spawn_app().await;

    let (cookie, _) = register_and_login(&app, "nina@example.com").await;

    let (status, _, _) = request(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = request(&app, "GET", "/api/auth/account", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
