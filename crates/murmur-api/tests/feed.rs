use std::collections::HashSet;
use std::sync::Arc;

use murmur_api::auth::{AppState, AppStateInner};
use murmur_api::feed::feed_for_user;
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

fn follow(state: &AppState, follower: Uuid, target: Uuid) {
    state
        .db
        .toggle_follow(
            &Uuid::new_v4().to_string(),
            &follower.to_string(),
            &target.to_string(),
        )
        .unwrap();
}

fn post_note(state: &AppState, author: Uuid, title: &str) -> Uuid {
    let id = Uuid::new_v4();
    state
        .db
        .insert_note(
            &id.to_string(),
            &author.to_string(),
            title,
            30,
            "https://cdn.example/a.m4a",
            None,
            &["Voice".to_string()],
        )
        .unwrap();
    id
}

fn share_note(state: &AppState, note: Uuid, sharer: Uuid) {
    state
        .db
        .toggle_share(&Uuid::new_v4().to_string(), &note.to_string(), &sharer.to_string())
        .unwrap();
}

#[tokio::test]
async fn empty_follow_graph_yields_empty_feed() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);
    let viewer = seed_user(&state, "viewer");

    let items = feed_for_user(state, viewer, 1, 20).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn feed_merges_originals_and_reposts_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let bob = seed_user(&state, "bob");
    let carol = seed_user(&state, "carol");
    let dave = seed_user(&state, "dave"); // not followed
    follow(&state, viewer, bob);
    follow(&state, viewer, carol);

    let n1 = post_note(&state, bob, "bob one");
    let n2 = post_note(&state, bob, "bob two");
    let n3 = post_note(&state, carol, "carol one");
    let n4 = post_note(&state, dave, "dave one");

    share_note(&state, n4, carol); // genuine repost, n4 not otherwise visible
    share_note(&state, n1, carol); // duplicate of an original — deduped
    share_note(&state, n2, bob); // self-share — dropped

    let items = feed_for_user(state, viewer, 1, 20).await.unwrap();

    let mut seen = HashSet::new();
    for item in &items {
        assert!(seen.insert(item.note.id), "duplicate {}", item.note.id);
    }
    assert_eq!(items.len(), 4);
    assert!(seen.contains(&n1) && seen.contains(&n2) && seen.contains(&n3));

    let shared: Vec<_> = items.iter().filter(|i| i.is_shared).collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].note.id, n4);
    assert_eq!(shared[0].shared_by.as_ref().unwrap().id, carol);
    assert!(shared[0].shared_at.is_some());
    // Tags are case-normalized at write time.
    assert_eq!(shared[0].note.tags, vec!["voice".to_string()]);
}

#[tokio::test]
async fn feed_counts_are_flattened_integers() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let bob = seed_user(&state, "bob");
    let fan = seed_user(&state, "fan");
    follow(&state, viewer, bob);

    let note = post_note(&state, bob, "liked note");
    for user in [viewer, fan] {
        state
            .db
            .toggle_like(
                &Uuid::new_v4().to_string(),
                &note.to_string(),
                &user.to_string(),
            )
            .unwrap();
    }

    let items = feed_for_user(state, viewer, 1, 20).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].note.likes, 2);
    assert_eq!(items[0].note.comments, 0);
}

#[tokio::test]
async fn out_of_range_page_is_empty_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir);

    let viewer = seed_user(&state, "viewer");
    let bob = seed_user(&state, "bob");
    follow(&state, viewer, bob);
    post_note(&state, bob, "only note");

    let items = feed_for_user(state, viewer, 50, 20).await.unwrap();
    assert!(items.is_empty());
}
