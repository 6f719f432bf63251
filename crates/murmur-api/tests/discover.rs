use std::sync::Arc;

use murmur_api::auth::{AppState, AppStateInner};
use murmur_api::discover::discover_notes_for_user;
use murmur_db::Database;
use uuid::Uuid;

fn open_state(dir: &tempfile::TempDir) -> AppState {
    let db = Database::open(&dir.path().join("murmur.db")).unwrap();
    Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
        feed_ratio: 0.6,
    })
}

fn seed_user(state: &AppState, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    state
        .db
        .create_user(&id.to_string(), username, "hash", None)
        .unwrap();
    id
}

fn post_note(state: &AppState, author: Uuid, title: &str, tags: &[&str]) -> Uuid {
    let id = Uuid::new_v4();
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    state
        .db
        .insert_note(
            &id.to_string(),
            &author.to_string(),
            title,
            30,
            "https://cdn.example/a.m4a",
            None,
            &tags,
        )
        .unwrap();
    id
}

fn like(state: &AppState, note: Uuid, user: Uuid) {
    state
        .db
        .toggle_like(&Uuid::new_v4().to_string(), &note.to_string(), &user.to_string())
        .unwrap();
}

#[tokio::test]
async fn discovery_excludes_followed_creators_and_self() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let followed = seed_user(&state, "followed");
    let stranger = seed_user(&state, "stranger");
    state
        .db
        .toggle_follow(
            &Uuid::new_v4().to_string(),
            &viewer.to_string(),
            &followed.to_string(),
        )
        .unwrap();

    post_note(&state, viewer, "mine", &[]);
    post_note(&state, followed, "already followed", &[]);
    let discoverable = post_note(&state, stranger, "fresh voice", &[]);

    let ranked = discover_notes_for_user(state, viewer, 1, 20).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].note.id, discoverable);
}

#[tokio::test]
async fn tag_affinity_outranks_plain_engagement() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let jazzer = seed_user(&state, "jazzer");
    let other = seed_user(&state, "other");

    // Build taste: the viewer liked a jazz note by a third creator.
    let tastemaker = seed_user(&state, "tastemaker");
    let liked = post_note(&state, tastemaker, "jazz set", &["jazz", "live"]);
    like(&state, liked, viewer);

    let jazz_note = post_note(&state, jazzer, "late night jazz", &["jazz"]);
    let plain_note = post_note(&state, other, "plain talk", &[]);
    // One like of engagement is worth 0.3 — far less than a 2.0 tag match.
    like(&state, plain_note, jazzer);

    let ranked = discover_notes_for_user(state, viewer, 1, 20).await.unwrap();
    let jazz_pos = ranked.iter().position(|p| p.note.id == jazz_note).unwrap();
    let plain_pos = ranked.iter().position(|p| p.note.id == plain_note).unwrap();
    assert!(jazz_pos < plain_pos);
    assert!(ranked[jazz_pos].discovery_score > ranked[plain_pos].discovery_score);
}

#[tokio::test]
async fn enormous_page_number_yields_empty_set() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let stranger = seed_user(&state, "stranger");
    post_note(&state, stranger, "one note", &[]);

    // Offset far past the candidate set must not overflow or error.
    let ranked = discover_notes_for_user(state, viewer, u32::MAX, 100)
        .await
        .unwrap();
    assert!(ranked.is_empty());
}

#[tokio::test]
async fn falls_back_to_engagement_ranking_when_personalized_set_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let only_creator = seed_user(&state, "creator");
    // Following the only creator empties the personalized candidate set.
    state
        .db
        .toggle_follow(
            &Uuid::new_v4().to_string(),
            &viewer.to_string(),
            &only_creator.to_string(),
        )
        .unwrap();

    let note = post_note(&state, only_creator, "still discoverable", &["tagged"]);
    like(&state, note, only_creator);

    let ranked = discover_notes_for_user(state, viewer, 1, 20).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].note.id, note);
    // Engagement terms only: 0.3 for the single like, no base score.
    assert!((ranked[0].discovery_score - 0.3).abs() < 1e-9);
}
