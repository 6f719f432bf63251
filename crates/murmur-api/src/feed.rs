use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use murmur_db::models::{IdentityRow, NoteRow, ShareRow, TagRow};
use murmur_feed::ShareCandidate;
use murmur_types::api::Claims;
use murmur_types::models::{UserIdentity, VoiceNote};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// Everything one feed request pulls from the store before the pure
/// pipeline runs.
struct FeedFetch {
    originals: Vec<NoteRow>,
    shares: Vec<ShareRow>,
    shared_notes: Vec<NoteRow>,
    sharers: Vec<IdentityRow>,
    tags: Vec<TagRow>,
}

/// The home feed: original notes from followed users merged with their
/// reposts, balanced by the interleaver, then paginated.
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1) as usize;
    let limit = query.limit.clamp(1, 100) as usize;

    let items = feed_for_user(state, claims.sub, page, limit).await?;
    Ok(Json(items))
}

/// Fetch, normalize, filter, dedup, interleave, paginate — one feed
/// request end to end, minus the HTTP wrapping.
pub async fn feed_for_user(
    state: AppState,
    viewer: uuid::Uuid,
    page: usize,
    limit: usize,
) -> Result<Vec<murmur_types::models::FeedItem>, ApiError> {
    let db = state.clone();
    let viewer = viewer.to_string();

    let fetched = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<FeedFetch>> {
        let following = db.db.following_ids(&viewer)?;
        if following.is_empty() {
            // Nothing followed: empty feed, no further fetches.
            return Ok(None);
        }

        let originals = db.db.notes_by_authors(&following)?;
        // Tolerates a missing shares table by returning zero shares.
        let shares = db.db.shares_by_users(&following)?;

        let shared_note_ids = distinct(shares.iter().map(|s| s.voice_note_id.clone()));
        let shared_notes = db.db.notes_by_ids(&shared_note_ids)?;

        let sharer_ids = distinct(shares.iter().map(|s| s.user_id.clone()));
        let sharers = db.db.identities(&sharer_ids)?;

        let tag_ids = distinct(
            originals
                .iter()
                .map(|n| n.id.clone())
                .chain(shared_notes.iter().map(|n| n.id.clone())),
        );
        let tags = db.db.tags_for_notes(&tag_ids)?;

        Ok(Some(FeedFetch {
            originals,
            shares,
            shared_notes,
            sharers,
            tags,
        }))
    })
    .await??;

    let Some(fetch) = fetched else {
        return Ok(vec![]);
    };

    let tags_by_note = convert::group_tags(fetch.tags);
    let to_note = |row: NoteRow| {
        let tags = tags_by_note.get(&row.id).cloned().unwrap_or_default();
        convert::note_from_row(row, tags)
    };

    // Already sorted descending by created_at from the query.
    let originals: Vec<VoiceNote> = fetch.originals.into_iter().map(|row| to_note(row)).collect();

    let notes_by_id: HashMap<String, VoiceNote> = fetch
        .shared_notes
        .into_iter()
        .map(|row| (row.id.clone(), to_note(row)))
        .collect();
    let sharers_by_id: HashMap<String, UserIdentity> = fetch
        .sharers
        .into_iter()
        .map(|row| (row.id.clone(), convert::identity_from_row(row)))
        .collect();

    // Walk the share records in shared_at-descending order, resolving
    // each to its note and sharer. Shares whose note or sharer vanished
    // between queries are skipped.
    let candidates: Vec<ShareCandidate> = fetch
        .shares
        .iter()
        .filter_map(|share| {
            let note = notes_by_id.get(&share.voice_note_id)?.clone();
            let shared_by = sharers_by_id.get(&share.user_id)?.clone();
            Some(ShareCandidate {
                note,
                shared_at: convert::parse_timestamp(&share.created_at, "share created_at"),
                shared_by,
            })
        })
        .collect();

    let items = murmur_feed::assemble_feed(originals, candidates, state.feed_ratio);
    Ok(murmur_feed::paginate(items, page, limit))
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}
