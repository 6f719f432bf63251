use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use murmur_types::api::{Claims, ProfileResponse, UpdateProfileRequest};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let id = user_id.to_string();

    let (user, counts) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let user = db.db.get_user_by_id(&id)?;
        let counts = db.db.profile_counts(&id)?;
        Ok((user, counts))
    })
    .await??;

    let user = user.ok_or(ApiError::NotFound)?;
    let (followers, following, notes) = counts;

    Ok(Json(ProfileResponse {
        id: convert::parse_uuid(&user.id, "user id"),
        username: user.username,
        display_name: user.display_name,
        avatar_url: user.avatar_url,
        bio: user.bio,
        verified: user.verified,
        created_at: convert::parse_timestamp(&user.created_at, "user created_at"),
        followers: followers.max(0) as u64,
        following: following.max(0) as u64,
        notes: notes.max(0) as u64,
    }))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &req.display_name {
        if name.is_empty() || name.len() > 64 {
            return Err(ApiError::BadRequest("display_name must be 1-64 characters"));
        }
    }
    if let Some(bio) = &req.bio {
        if bio.len() > 500 {
            return Err(ApiError::BadRequest("bio must be at most 500 characters"));
        }
    }

    let db = state.clone();
    let id = claims.sub.to_string();

    let user = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        db.db.update_profile(
            &id,
            req.display_name.as_deref(),
            req.bio.as_deref(),
            req.avatar_url.as_deref(),
        )?;
        db.db.get_user_by_id(&id)
    })
    .await??;

    let user = user.ok_or(ApiError::NotFound)?;

    Ok(Json(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "display_name": user.display_name,
        "avatar_url": user.avatar_url,
        "bio": user.bio,
    })))
}

/// Toggle following another user. Following is a toggle like sharing:
/// the same endpoint follows and unfollows.
pub async fn toggle_follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if user_id == claims.sub {
        return Err(ApiError::BadRequest("cannot follow yourself"));
    }

    let db = state.clone();
    let follower = claims.sub.to_string();
    let target = user_id.to_string();
    let edge_id = Uuid::new_v4().to_string();

    let added = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        if db.db.get_user_by_id(&target)?.is_none() {
            return Ok(None);
        }
        Ok(Some(db.db.toggle_follow(&edge_id, &follower, &target)?))
    })
    .await??;

    let added = added.ok_or(ApiError::NotFound)?;
    Ok(Json(serde_json::json!({ "following": added })))
}
