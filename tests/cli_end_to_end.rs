#![deny(clippy::all, clippy::pedantic)]

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use serde_json::json;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn algoref(server: &MockServer, storage: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("algoref"));
    cmd.env_remove("ALGOREF_PASSWORD")
        .env_remove("ALGOREF_CONFIG_FILE")
        .arg("--api-base-url")
        .arg(server.url("/api/v1"))
        .arg("--storage-dir")
        .arg(storage.path());
    cmd
}

fn json_file(value: &serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tmp file");
    file.write_all(value.to_string().as_bytes()).expect("write json");
    file
}

fn summary() -> serde_json::Value {
    json!({
        "id": 1,
        "title": "Binary Search",
        "slug": "binary-search",
        "category": {"id": 1, "name": "Searching", "slug": "searching"},
        "difficulty": {"id": 1, "name": "Easy", "color": "#22c55e"},
        "concept_summary": "Repeatedly halve the search interval.",
        "time_complexity": "O(log n)",
        "space_complexity": "O(1)",
        "view_count": 3
    })
}

#[test]
fn algorithms_list_passes_filters_as_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/algorithms")
            .query_param("search", "binary")
            .query_param("category_id", "1")
            .query_param("page", "2")
            .query_param("size", "5")
            .query_param("sort_by", "title")
            .query_param("order", "asc");
        then.status(200).json_body(json!({
            "items": [summary()],
            "total": 6,
            "page": 2,
            "size": 5,
            "pages": 2
        }));
    });

    let storage = TempDir::new().expect("tmp dir");
    let assert = algoref(&server, &storage)
        .args(["algorithms", "list", "--search", "binary", "--category", "1"])
        .args(["--page", "2", "--size", "5", "--sort-by", "title", "--order", "asc"])
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"slug\": \"binary-search\""));
    mock.assert();
}

#[test]
fn missing_algorithm_fails_with_backend_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/algorithms/nope");
        then.status(404).json_body(json!({"detail": "Algorithm not found"}));
    });

    let storage = TempDir::new().expect("tmp dir");
    algoref(&server, &storage)
        .args(["algorithms", "show", "nope"])
        .assert()
        .failure()
        .stderr(contains("Algorithm not found"));
}

#[test]
fn login_persists_tokens_for_later_commands() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method("POST")
            .path("/api/v1/auth/login")
            .json_body_partial(r#"{"email":"admin@test.com","password":"adminpass123"}"#);
        then.status(200).json_body(json!({
            "access_token": "cli-access",
            "refresh_token": "cli-refresh",
            "token_type": "bearer",
            "expires_in": 1800
        }));
    });
    let me = server.mock(|when, then| {
        when.method("GET")
            .path("/api/v1/auth/me")
            .header("authorization", "Bearer cli-access");
        then.status(200)
            .json_body(json!({"id": 1, "email": "admin@test.com", "role": "admin"}));
    });

    let storage = TempDir::new().expect("tmp dir");
    algoref(&server, &storage)
        .args(["login", "--email", "admin@test.com"])
        .env("ALGOREF_PASSWORD", "adminpass123")
        .assert()
        .success()
        .stdout(contains("signed_in"));
    assert!(storage.path().join("credentials.json").exists());

    algoref(&server, &storage)
        .arg("whoami")
        .assert()
        .success()
        .stdout(contains("admin@test.com"));

    login.assert();
    me.assert();
}

#[test]
fn rejected_session_is_cleared_on_disk() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/auth/me");
        then.status(401)
            .json_body(json!({"detail": "Could not validate credentials"}));
    });

    let storage = TempDir::new().expect("tmp dir");
    let credentials = storage.path().join("credentials.json");
    std::fs::write(
        &credentials,
        r#"{"access_token":"expired","refresh_token":"expired"}"#,
    )
    .expect("seed credentials");

    algoref(&server, &storage)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(contains("/admin"));
    assert!(!credentials.exists());
}

#[test]
fn admin_commands_require_a_session() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method("POST").path("/api/v1/admin/algorithms");
        then.status(201);
    });

    let storage = TempDir::new().expect("tmp dir");
    let input = json_file(&json!({"title": "Binary Search"}));
    algoref(&server, &storage)
        .args(["admin", "create", "--file"])
        .arg(input.path())
        .assert()
        .failure()
        .stderr(contains("not signed in"));
    create.assert_hits(0);
}

#[test]
fn admin_update_reads_patch_file() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/auth/me");
        then.status(200)
            .json_body(json!({"id": 1, "email": "admin@test.com", "role": "admin"}));
    });
    let update = server.mock(|when, then| {
        when.method("PUT")
            .path("/api/v1/admin/algorithms/1")
            .header("authorization", "Bearer token")
            .json_body_partial(r#"{"is_published":false}"#);
        then.status(200).json_body(json!({
            "id": 1,
            "title": "Binary Search",
            "slug": "binary-search",
            "category": {"id": 1, "name": "Searching", "slug": "searching"},
            "difficulty": {"id": 1, "name": "Easy", "color": "#22c55e"},
            "concept_summary": "Repeatedly halve the search interval.",
            "time_complexity": "O(log n)",
            "space_complexity": "O(1)",
            "is_published": false,
            "view_count": 3,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z"
        }));
    });

    let storage = TempDir::new().expect("tmp dir");
    std::fs::write(
        storage.path().join("credentials.json"),
        r#"{"access_token":"token","refresh_token":"refresh"}"#,
    )
    .expect("seed credentials");
    let patch = json_file(&json!({"is_published": false}));

    algoref(&server, &storage)
        .args(["admin", "update", "--id", "1", "--file"])
        .arg(patch.path())
        .assert()
        .success()
        .stdout(contains("\"is_published\": false"));
    update.assert();
}

#[test]
fn invalid_base_url_fails_fast() {
    let storage = TempDir::new().expect("tmp dir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("algoref"));
    cmd.arg("--api-base-url")
        .arg("ftp://example.com")
        .arg("--storage-dir")
        .arg(storage.path())
        .args(["languages", "list"])
        .assert()
        .failure()
        .stderr(contains("api.base_url"));
}
