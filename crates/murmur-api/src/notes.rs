use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use murmur_types::api::{Claims, CommentResponse, CreateCommentRequest, CreateNoteRequest};
use murmur_types::models::VoiceNote;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

const MAX_TAGS: usize = 10;

pub async fn create_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() || title.len() > 200 {
        return Err(ApiError::BadRequest("title must be 1-200 characters"));
    }
    if req.duration_seconds == 0 || req.duration_seconds > 3600 {
        return Err(ApiError::BadRequest("duration_seconds must be 1-3600"));
    }
    if req.audio_url.is_empty() {
        return Err(ApiError::BadRequest("audio_url is required"));
    }
    if req.tags.len() > MAX_TAGS {
        return Err(ApiError::BadRequest("at most 10 tags allowed"));
    }

    // Tags are case-normalized to lowercase; duplicates collapse.
    let mut tags: Vec<String> = req
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();

    let note_id = Uuid::new_v4();
    let db = state.clone();
    let author = claims.sub.to_string();
    let insert_tags = tags.clone();
    let insert_title = title.clone();
    let audio_url = req.audio_url.clone();
    let background_image_url = req.background_image_url.clone();
    let duration = req.duration_seconds as i64;

    tokio::task::spawn_blocking(move || {
        db.db.insert_note(
            &note_id.to_string(),
            &author,
            &insert_title,
            duration,
            &audio_url,
            background_image_url.as_deref(),
            &insert_tags,
        )
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(VoiceNote {
            id: note_id,
            user_id: claims.sub,
            title,
            duration_seconds: req.duration_seconds,
            audio_url: req.audio_url,
            background_image_url: req.background_image_url,
            created_at: chrono::Utc::now(),
            likes: 0,
            comments: 0,
            plays: 0,
            shares: 0,
            tags,
        }),
    ))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = note_id.to_string();

    let (row, tags) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let row = db.db.get_note(&id)?;
        let tags = db.db.tags_for_notes(std::slice::from_ref(&id))?;
        Ok((row, tags))
    })
    .await??;

    let row = row.ok_or(ApiError::NotFound)?;
    let tags = tags.into_iter().map(|t| t.tag).collect();
    Ok(Json(convert::note_from_row(row, tags)))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = note_id.to_string();
    let caller = claims.sub.to_string();

    let deleted = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        match db.db.note_author(&id)? {
            None => Ok(None),
            Some(author) if author != caller => Ok(Some(false)),
            Some(_) => {
                db.db.delete_note(&id)?;
                Ok(Some(true))
            }
        }
    })
    .await??;

    match deleted {
        None => Err(ApiError::NotFound),
        Some(false) => Err(ApiError::Forbidden),
        Some(true) => Ok(StatusCode::NO_CONTENT),
    }
}

pub async fn user_notes(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = user_id.to_string();

    let (rows, tag_rows) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let rows = db.db.notes_by_user(&id)?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let tag_rows = db.db.tags_for_notes(&ids)?;
        Ok((rows, tag_rows))
    })
    .await??;

    let tags_by_note = convert::group_tags(tag_rows);
    let notes: Vec<VoiceNote> = rows
        .into_iter()
        .map(|row| {
            let tags = tags_by_note.get(&row.id).cloned().unwrap_or_default();
            convert::note_from_row(row, tags)
        })
        .collect();

    Ok(Json(notes))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let added = toggle_engagement(&state, note_id, claims.sub, EngagementKind::Like).await?;
    Ok(Json(serde_json::json!({ "added": added })))
}

/// Repost toggle: the same endpoint shares and un-shares. At most one
/// active share exists per (note, user) pair.
pub async fn toggle_share(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let added = toggle_engagement(&state, note_id, claims.sub, EngagementKind::Share).await?;
    Ok(Json(serde_json::json!({ "added": added })))
}

enum EngagementKind {
    Like,
    Share,
}

async fn toggle_engagement(
    state: &AppState,
    note_id: Uuid,
    user_id: Uuid,
    kind: EngagementKind,
) -> Result<bool, ApiError> {
    let db = state.clone();
    let note = note_id.to_string();
    let user = user_id.to_string();
    let row_id = Uuid::new_v4().to_string();

    let added = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if db.db.note_author(&note)?.is_none() {
            return Ok(None);
        }
        let added = match kind {
            EngagementKind::Like => db.db.toggle_like(&row_id, &note, &user)?,
            EngagementKind::Share => db.db.toggle_share(&row_id, &note, &user)?,
        };
        Ok(Some(added))
    })
    .await??;

    added.ok_or(ApiError::NotFound)
}

pub async fn record_play(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let note = note_id.to_string();
    let user = claims.sub.to_string();
    let row_id = Uuid::new_v4().to_string();

    let recorded = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if db.db.note_author(&note)?.is_none() {
            return Ok(false);
        }
        db.db.insert_play(&row_id, &note, &user)?;
        Ok(true)
    })
    .await??;

    if !recorded {
        return Err(ApiError::NotFound);
    }
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "recorded": true }))))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req.body.trim().to_string();
    if body.is_empty() || body.len() > 1000 {
        return Err(ApiError::BadRequest("comment must be 1-1000 characters"));
    }

    let comment_id = Uuid::new_v4();
    let db = state.clone();
    let note = note_id.to_string();
    let user = claims.sub.to_string();
    let insert_body = body.clone();

    let inserted = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if db.db.note_author(&note)?.is_none() {
            return Ok(false);
        }
        db.db
            .insert_comment(&comment_id.to_string(), &note, &user, &insert_body)?;
        Ok(true)
    })
    .await??;

    if !inserted {
        return Err(ApiError::NotFound);
    }

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment_id,
            voice_note_id: note_id,
            user_id: claims.sub,
            username: claims.username,
            body,
            created_at: chrono::Utc::now(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    #[serde(default = "default_comment_limit")]
    pub limit: u32,
}

fn default_comment_limit() -> u32 {
    100
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(note_id): Path<Uuid>,
    Query(query): Query<CommentQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let note = note_id.to_string();
    let limit = query.limit.min(200);

    let rows = tokio::task::spawn_blocking(move || db.db.comments_for_note(&note, limit)).await??;

    let comments: Vec<CommentResponse> = rows
        .into_iter()
        .map(|row| CommentResponse {
            id: convert::parse_uuid(&row.id, "comment id"),
            voice_note_id: convert::parse_uuid(&row.voice_note_id, "comment voice_note_id"),
            user_id: convert::parse_uuid(&row.user_id, "comment user_id"),
            username: row.username,
            body: row.body,
            created_at: convert::parse_timestamp(&row.created_at, "comment created_at"),
        })
        .collect();

    Ok(Json(comments))
}
