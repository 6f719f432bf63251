use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use murmur_db::models::{NoteRow, TagRow};
use murmur_feed::discovery::{self, CreatorStats, LikedNote, TasteProfile};
use murmur_types::api::Claims;
use murmur_types::models::VoiceNote;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// How many recent likes feed the taste profile.
const TASTE_LIKE_LIMIT: u32 = 50;
/// Candidate creator pool size before scoring.
const CREATOR_POOL: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
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

/// What the candidate fetch produced: a personalized page, or the
/// popularity fallback when the personalized query came back empty.
enum Candidates {
    Personalized {
        liked: Vec<LikedNote>,
        notes: Vec<NoteRow>,
        tags: Vec<TagRow>,
    },
    Fallback {
        notes: Vec<NoteRow>,
        tags: Vec<TagRow>,
    },
}

/// "For you" notes: candidates from non-followed creators scored by tag
/// affinity, creator affinity, and engagement. Falls back to a pure
/// engagement ranking over recent notes when the personalized candidate
/// set is empty.
pub async fn discover_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<DiscoverQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let ranked = discover_notes_for_user(state, claims.sub, page, limit).await?;
    Ok(Json(ranked))
}

/// Candidate fetch plus scoring for one discovery request, minus the
/// HTTP wrapping.
pub async fn discover_notes_for_user(
    state: AppState,
    viewer: uuid::Uuid,
    page: u32,
    limit: u32,
) -> Result<Vec<murmur_types::models::DiscoveryPost>, ApiError> {
    let offset = page.saturating_sub(1).saturating_mul(limit);

    let db = state.clone();
    let viewer = viewer.to_string();

    let candidates = tokio::task::spawn_blocking(move || -> anyhow::Result<Candidates> {
        let liked_rows = db.db.recent_liked_notes(&viewer, TASTE_LIKE_LIMIT)?;
        let liked_ids: Vec<String> = liked_rows.iter().map(|l| l.voice_note_id.clone()).collect();
        let liked_tag_rows = db.db.tags_for_notes(&liked_ids)?;

        let following = db.db.following_ids(&viewer)?;
        let notes = db.db.discovery_candidates(&following, &viewer, limit, offset)?;

        if notes.is_empty() {
            let notes = db.db.recent_notes_excluding(&viewer, limit, offset)?;
            let ids: Vec<String> = notes.iter().map(|n| n.id.clone()).collect();
            let tags = db.db.tags_for_notes(&ids)?;
            return Ok(Candidates::Fallback { notes, tags });
        }

        let ids: Vec<String> = notes.iter().map(|n| n.id.clone()).collect();
        let tags = db.db.tags_for_notes(&ids)?;

        let liked_tags_by_note = convert::group_tags(liked_tag_rows);
        let liked = liked_rows
            .into_iter()
            .map(|row| LikedNote {
                note_id: convert::parse_uuid(&row.voice_note_id, "liked note id"),
                author_id: convert::parse_uuid(&row.author_id, "liked note author"),
                tags: liked_tags_by_note
                    .get(&row.voice_note_id)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        Ok(Candidates::Personalized { liked, notes, tags })
    })
    .await??;

    let ranked = match candidates {
        Candidates::Personalized { liked, notes, tags } => {
            let profile = TasteProfile::from_recent_likes(&liked);
            discovery::rank_posts(to_notes(notes, tags), &profile)
        }
        Candidates::Fallback { notes, tags } => {
            discovery::rank_posts_by_engagement(to_notes(notes, tags))
        }
    };

    Ok(ranked)
}

#[derive(Debug, Deserialize)]
pub struct CreatorQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Creators worth following: non-followed, non-self users ranked by
/// aggregate engagement, post count, and verification.
pub async fn discover_creators(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<CreatorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, 100) as usize;

    let db = state.clone();
    let viewer = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let following = db.db.following_ids(&viewer)?;
        db.db.creator_candidates(&following, &viewer, CREATOR_POOL)
    })
    .await??;

    let stats: Vec<CreatorStats> = rows
        .into_iter()
        .map(|row| CreatorStats {
            verified: row.verified,
            post_count: row.post_count.max(0) as u64,
            total_likes: row.total_likes.max(0) as u64,
            total_comments: row.total_comments.max(0) as u64,
            total_plays: row.total_plays.max(0) as u64,
            identity: convert::identity_from_row(murmur_db::models::IdentityRow {
                id: row.id,
                username: row.username,
                display_name: row.display_name,
                avatar_url: row.avatar_url,
            }),
        })
        .collect();

    let mut ranked = discovery::rank_creators(stats);
    ranked.truncate(limit);
    Ok(Json(ranked))
}

fn to_notes(rows: Vec<NoteRow>, tag_rows: Vec<TagRow>) -> Vec<VoiceNote> {
    let tags_by_note = convert::group_tags(tag_rows);
    rows.into_iter()
        .map(|row| {
            let tags = tags_by_note.get(&row.id).cloned().unwrap_or_default();
            convert::note_from_row(row, tags)
        })
        .collect()
}

