use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use user_api::auth::{hash_token, Authenticator, TOKEN_LENGTH};
use user_api::configuration::get_configuration;
use user_api::startup::{build_services, run};
use user_api::store::InMemoryCredentialStore;

const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryCredentialStore>,
    pub authenticator: Authenticator,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let configuration = get_configuration().expect("Failed to read configuration.");
    let store = Arc::new(InMemoryCredentialStore::new());
    let (users, authenticator) = build_services(store.clone(), &configuration);

    let server = run(listener, users, authenticator.clone()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        authenticator,
    }
}

impl TestApp {
    async fn signup(&self, email: &str) -> i64 {
        let response = reqwest::Client::new()
            .post(&format!("{}/users/add", &self.address))
            .json(&json!({
                "email": email,
                "first_name": "John",
                "last_name": "Doe",
                "password": PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["id"].as_i64().expect("signup response has no id")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}/users/login", &self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Log in and return the plaintext bearer token.
    async fn login_token(&self, email: &str) -> String {
        let response = self.login(email, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["token"]["token"]
            .as_str()
            .expect("login response has no token")
            .to_string()
    }

    async fn get_me(&self, authorization: Option<&str>) -> reqwest::Response {
        let mut request = reqwest::Client::new().get(&format!("{}/users/me", &self.address));
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        request.send().await.expect("Failed to execute request.")
    }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse response");
    body["code"].as_str().unwrap_or_default().to_string()
}

// --- Login ---

#[tokio::test]
async fn login_returns_token_and_stores_only_its_digest() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;

    let response = app.login("john@example.com", PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 86400);
    assert_eq!(body["token"]["user_id"], user_id);
    assert!(body["token"].get("token_hash").is_none());

    let plaintext = body["token"]["token"].as_str().unwrap();
    assert_eq!(plaintext.len(), TOKEN_LENGTH);
    assert!(plaintext
        .chars()
        .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));

    let stored = app.store.tokens_for_user(user_id).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token_hash, hash_token(plaintext));
    assert!(stored[0].plaintext.is_none());
}

#[tokio::test]
async fn login_with_unknown_email_returns_401_and_issues_nothing() {
    let app = spawn_app();

    let response = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_CREDENTIALS");
    assert_eq!(app.store.token_count().await, 0);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_are_indistinguishable() {
    let app = spawn_app();
    app.signup("john@example.com").await;

    let unknown: Value = app
        .login("nobody@example.com", PASSWORD)
        .await
        .json()
        .await
        .unwrap();
    let wrong: Value = app
        .login("john@example.com", "WrongPass123")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(unknown["code"], wrong["code"]);
    assert_eq!(unknown["message"], wrong["message"]);
    assert_eq!(unknown["status"], 401);
    assert_eq!(app.store.token_count().await, 0);
}

#[tokio::test]
async fn second_login_invalidates_the_first_token() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;

    let first = app.login_token("john@example.com").await;
    let second = app.login_token("john@example.com").await;
    assert_ne!(first, second);

    let response = app.get_me(Some(&format!("Bearer {}", first))).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");

    let response = app.get_me(Some(&format!("Bearer {}", second))).await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(app.store.tokens_for_user(user_id).await.len(), 1);
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let app = spawn_app();

    let response = reqwest::Client::new()
        .post(&format!("{}/users/login", &app.address))
        .header("Content-Type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "VALIDATION_ERROR");
}

// --- Bearer authentication ---

#[tokio::test]
async fn bearer_token_resolves_the_user_who_logged_in() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    let response = app.get_me(Some(&format!("Bearer {}", token))).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], user_id);
    assert_eq!(body["email"], "john@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn missing_or_malformed_header_returns_401_unauthorized() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    let cases = vec![
        None,
        Some(token.clone()),
        Some(format!("Basic {}", token)),
        Some(format!("bearer {}", token)),
        Some(format!("Bearer {} extra", token)),
        Some("Bearer".to_string()),
    ];

    for header in cases {
        let response = app.get_me(header.as_deref()).await;
        assert_eq!(401, response.status().as_u16(), "header {:?}", header);
        assert_eq!(error_code(response).await, "UNAUTHORIZED", "header {:?}", header);
    }
}

#[tokio::test]
async fn wrong_length_or_unknown_token_returns_401_token_invalid() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    let cases = vec![
        format!("Bearer {}", &token[..TOKEN_LENGTH - 1]),
        format!("Bearer {}A", token),
        format!("Bearer {}", "A".repeat(TOKEN_LENGTH)),
    ];

    for header in cases {
        let response = app.get_me(Some(&header)).await;
        assert_eq!(401, response.status().as_u16(), "header {:?}", header);
        assert_eq!(error_code(response).await, "TOKEN_INVALID", "header {:?}", header);
    }
}

#[tokio::test]
async fn expired_token_returns_401() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;

    let token = app
        .authenticator
        .issue_token(user_id, chrono::Duration::seconds(-1))
        .await
        .expect("Failed to issue token");
    let plaintext = token.plaintext.expect("issued token has no plaintext");

    let response = app.get_me(Some(&format!("Bearer {}", plaintext))).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

// --- Token endpoints ---

#[tokio::test]
async fn logout_revokes_the_presented_token() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/users/logout", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.store.token_count().await, 0);

    let response = app.get_me(Some(&format!("Bearer {}", token))).await;
    assert_eq!(401, response.status().as_u16());

    // Logging out again is harmless.
    let response = client
        .post(&format!("{}/users/logout", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn validate_token_reports_validity_without_erroring() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;
    let client = reqwest::Client::new();

    let cases = vec![
        (token.clone(), true),
        ("short".to_string(), false),
        ("A".repeat(TOKEN_LENGTH), false),
    ];

    for (candidate, expected) in cases {
        let response = client
            .post(&format!("{}/users/validate-token", &app.address))
            .json(&json!({ "token": candidate }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["valid"], expected, "token {:?}", candidate);
    }
}

#[tokio::test]
async fn issuing_a_token_supersedes_the_current_one() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/users/me/tokens", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "ttl_seconds": 3600 }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expires_in"], 3600);
    let issued = body["token"]["token"].as_str().unwrap().to_string();

    assert_eq!(401, app.get_me(Some(&format!("Bearer {}", token))).await.status().as_u16());
    assert_eq!(200, app.get_me(Some(&format!("Bearer {}", issued))).await.status().as_u16());
    assert_eq!(app.store.tokens_for_user(user_id).await.len(), 1);
}

#[tokio::test]
async fn issuing_a_token_rejects_out_of_range_ttl() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    for ttl in [0, -5, 366 * 24 * 60 * 60] {
        let response = reqwest::Client::new()
            .post(&format!("{}/users/me/tokens", &app.address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "ttl_seconds": ttl }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "ttl {}", ttl);
    }
}

// --- User management ---

#[tokio::test]
async fn signup_rejects_duplicate_email_and_weak_password() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let client = reqwest::Client::new();

    let response = client
        .post(&format!("{}/users/add", &app.address))
        .json(&json!({ "email": "john@example.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(409, response.status().as_u16());
    assert_eq!(error_code(response).await, "DUPLICATE_ENTRY");

    let response = client
        .post(&format!("{}/users/add", &app.address))
        .json(&json!({ "email": "jane@example.com", "password": "weak" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn passwords_beyond_bcrypt_input_are_rejected() {
    let app = spawn_app();
    let client = reqwest::Client::new();
    let at_limit = format!("{}Xy9", "Aa1".repeat(23));
    let too_long = format!("{}Xy9", "Aa1".repeat(24));

    let response = client
        .post(&format!("{}/users/add", &app.address))
        .json(&json!({ "email": "john@example.com", "password": too_long }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());

    let response = client
        .post(&format!("{}/users/add", &app.address))
        .json(&json!({ "email": "john@example.com", "password": at_limit }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    // Same 72-byte prefix, longer input: never the same password.
    let response = app
        .login("john@example.com", &format!("{}Zq7", at_limit))
        .await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_CREDENTIALS");

    assert_eq!(200, app.login("john@example.com", &at_limit).await.status().as_u16());
}

#[tokio::test]
async fn list_and_update_users() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    app.signup("jane@example.com").await;
    let token = app.login_token("jane@example.com").await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/users/all", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let response = client
        .put(&format!("{}/users/me", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "email": "jane@example.com",
            "first_name": "Jane",
            "last_name": "Smith"
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["first_name"], "Jane");
    assert_eq!(body["last_name"], "Smith");
}

#[tokio::test]
async fn password_reset_applies_to_the_next_login() {
    let app = spawn_app();
    app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/users/me/password", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "password": "NewSecure456" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    assert_eq!(401, app.login("john@example.com", PASSWORD).await.status().as_u16());
    assert_eq!(200, app.login("john@example.com", "NewSecure456").await.status().as_u16());
}

#[tokio::test]
async fn deleting_the_account_removes_its_tokens() {
    let app = spawn_app();
    let user_id = app.signup("john@example.com").await;
    let token = app.login_token("john@example.com").await;

    let response = reqwest::Client::new()
        .delete(&format!("{}/users/me", &app.address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    assert!(app.store.tokens_for_user(user_id).await.is_empty());
    assert_eq!(401, app.get_me(Some(&format!("Bearer {}", token))).await.status().as_u16());
}
