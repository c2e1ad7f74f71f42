//! Integration tests for the explain and history commands.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_home() -> TempDir {
    TempDir::new().expect("create temp errwise home")
}

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Writes a persisted session into the given home directory.
fn seed_session(home: &TempDir, access_token: &str) {
    let session = serde_json::json!({
        "accessToken": access_token,
        "refreshToken": "seeded-refresh-token",
        "user": {
            "id": "u-1",
            "username": "dev",
            "email": "dev@example.com"
        },
        "authenticatedAt": chrono::Utc::now().to_rfc3339()
    });
    std::fs::write(
        home.path().join("session.json"),
        serde_json::to_string_pretty(&session).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_explain_requires_session() {
    let home = temp_home();

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .args(["explain", "TypeError: x is undefined"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[tokio::test]
async fn test_explain_prints_explanation() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home, "seeded-access-token");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/errors/analyze"))
        .and(header("authorization", "Bearer seeded-access-token"))
        .and(body_json(
            serde_json::json!({ "errorText": "TypeError: x is undefined" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "explanation": "The variable x was used before it was assigned.",
            "suggestion": "Initialize x before using it.",
            "category": "javascript"
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .env("ERRWISE_BASE_URL", server.uri())
        .args(["explain", "TypeError: x is undefined"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "The variable x was used before it was assigned.",
        ))
        .stdout(predicate::str::contains("Suggestion: Initialize x"));
}

#[tokio::test]
async fn test_explain_reads_stdin() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home, "seeded-access-token");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/errors/analyze"))
        .and(body_json(
            serde_json::json!({ "errorText": "panic: index out of range" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "explanation": "An index beyond the slice length was accessed."
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .env("ERRWISE_BASE_URL", server.uri())
        .arg("explain")
        .write_stdin("panic: index out of range\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("beyond the slice length"));
}

/// An expired token is refreshed transparently; the command still succeeds
/// and the new token is persisted.
#[tokio::test]
async fn test_explain_refreshes_expired_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home, "stale-access-token");
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/errors/analyze"))
        .and(header("authorization", "Bearer stale-access-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "code": "TOKEN_EXPIRED",
            "message": "access token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(body_json(
            serde_json::json!({ "refreshToken": "seeded-refresh-token" }),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "accessToken": "minted-access-token" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/errors/analyze"))
        .and(header("authorization", "Bearer minted-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "explanation": "Recovered after refresh."
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .env("ERRWISE_BASE_URL", server.uri())
        .args(["explain", "some error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recovered after refresh."));

    let session = std::fs::read_to_string(home.path().join("session.json")).unwrap();
    assert!(session.contains("minted-access-token"));
    assert!(!session.contains("stale-access-token"));
}

#[tokio::test]
async fn test_history_lists_entries() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home, "seeded-access-token");
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "h-1",
                "errorText": "TypeError: x is undefined",
                "explanation": "x was never assigned",
                "createdAt": "2026-08-28T10:00:00Z"
            },
            {
                "id": "h-2",
                "errorText": "panic: index out of range",
                "explanation": "out-of-bounds slice access"
            }
        ])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .env("ERRWISE_BASE_URL", server.uri())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("h-1"))
        .stdout(predicate::str::contains("TypeError: x is undefined"))
        .stdout(predicate::str::contains("h-2"));
}

#[tokio::test]
async fn test_history_empty() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    seed_session(&home, "seeded-access-token");
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    cargo_bin_cmd!("errwise")
        .env("ERRWISE_HOME", home.path())
        .env("ERRWISE_BASE_URL", server.uri())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No analyzed errors yet."));
}
