use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use murmur_api::auth::{self, AppState, AppStateInner};
use murmur_db::Database;
use murmur_types::api::{LoginRequest, RegisterRequest};

fn open_state(dir: &tempfile::TempDir) -> AppState {
    let db = Database::open(&dir.path().join("murmur.db")).unwrap();
    Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
        feed_ratio: 0.6,
    })
}

fn register_req(username: &str, password: &str) -> Json<RegisterRequest> {
    Json(RegisterRequest {
        username: username.to_string(),
        password: password.to_string(),
        display_name: None,
    })
}

// Salts come from the OS RNG through argon2's re-exported rand_core, so
// the whole hash-then-verify round trip runs here.
#[tokio::test]
async fn register_then_login_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let res = auth::register(State(state.clone()), register_req("alice", "correct horse")).await;
    assert!(res.is_ok());

    let res = auth::login(
        State(state.clone()),
        Json(LoginRequest {
            username: "alice".into(),
            password: "correct horse".into(),
        }),
    )
    .await;
    assert!(res.is_ok());

    let res = auth::login(
        State(state),
        Json(LoginRequest {
            username: "alice".into(),
            password: "wrong password".into(),
        }),
    )
    .await;
    assert_eq!(res.err(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let res = auth::register(State(state.clone()), register_req("bob", "long enough")).await;
    assert!(res.is_ok());

    let res = auth::register(State(state), register_req("bob", "also long enough")).await;
    assert_eq!(res.err(), Some(StatusCode::CONFLICT));
}
