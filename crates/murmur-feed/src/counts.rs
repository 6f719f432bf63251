use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use murmur_types::models::VoiceNote;

/// An aggregate-count field as the store hands it over. Nested aggregation
/// queries return a single-element array of `{ count }` objects instead of
/// a scalar; other query shapes return a plain integer or omit the field
/// entirely. Anything else is malformed and normalizes to zero.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Plain(i64),
    Nested(Vec<CountEntry>),
    Malformed(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountEntry {
    pub count: i64,
}

impl Default for RawCount {
    fn default() -> Self {
        RawCount::Plain(0)
    }
}

impl RawCount {
    /// Flatten to a plain non-negative integer. Total and idempotent:
    /// never errors, and re-normalizing an already-plain count is a no-op.
    pub fn normalize(&self) -> u64 {
        match self {
            RawCount::Plain(n) => (*n).max(0) as u64,
            RawCount::Nested(entries) => match entries.as_slice() {
                [entry] => entry.count.max(0) as u64,
                _ => 0,
            },
            RawCount::Malformed(_) => 0,
        }
    }
}

impl From<i64> for RawCount {
    fn from(n: i64) -> Self {
        RawCount::Plain(n)
    }
}

/// A voice-note record as fetched, before count normalization. The four
/// count fields default to zero when the store omits them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub duration_seconds: u32,
    pub audio_url: String,
    #[serde(default)]
    pub background_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: RawCount,
    #[serde(default)]
    pub comments: RawCount,
    #[serde(default)]
    pub plays: RawCount,
    #[serde(default)]
    pub shares: RawCount,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawPost {
    /// Apply the count normalizer to all four aggregate fields, producing
    /// a note that downstream stages can treat as plain integers.
    pub fn into_note(self) -> VoiceNote {
        VoiceNote {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            duration_seconds: self.duration_seconds,
            audio_url: self.audio_url,
            background_image_url: self.background_image_url,
            created_at: self.created_at,
            likes: self.likes.normalize(),
            comments: self.comments.normalize(),
            plays: self.plays.normalize(),
            shares: self.shares.normalize(),
            tags: self.tags,
        }
    }
}
