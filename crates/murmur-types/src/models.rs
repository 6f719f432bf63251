use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identity of a user — the fields other users are allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A posted voice note with flattened aggregate counts. Counts are always
/// plain integers here — raw store shapes are normalized at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub duration_seconds: u32,
    pub audio_url: String,
    pub background_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub comments: u64,
    pub plays: u64,
    pub shares: u64,
    pub tags: Vec<String>,
}

/// One entry of an assembled feed page. Built per request from a
/// `VoiceNote` plus repost attribution; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub note: VoiceNote,
    pub is_shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_by: Option<UserIdentity>,
}

/// A voice note annotated with its discovery relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPost {
    #[serde(flatten)]
    pub note: VoiceNote,
    pub discovery_score: f64,
}

/// A creator surfaced by discovery, with stats aggregated across all of
/// their notes.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorCandidate {
    #[serde(flatten)]
    pub identity: UserIdentity,
    pub verified: bool,
    pub post_count: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_plays: u64,
    pub discovery_score: f64,
}
