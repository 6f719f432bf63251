//! Row-to-model conversion at the ingestion boundary. Everything past
//! here operates on typed models with plain-integer counts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use murmur_db::models::{IdentityRow, NoteRow, TagRow};
use murmur_feed::{RawCount, RawPost};
use murmur_types::models::{UserIdentity, VoiceNote};

pub(crate) fn parse_uuid(value: &str, context: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {context} '{}': {}", value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(value: &str, context: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {context} '{}': {}", value, e);
            DateTime::default()
        })
}

/// Convert a fetched note row through the count normalizer.
pub(crate) fn note_from_row(row: NoteRow, tags: Vec<String>) -> VoiceNote {
    RawPost {
        id: parse_uuid(&row.id, "voice note id"),
        user_id: parse_uuid(&row.user_id, "voice note user_id"),
        title: row.title,
        duration_seconds: row.duration_seconds.max(0) as u32,
        audio_url: row.audio_url,
        background_image_url: row.background_image_url,
        created_at: parse_timestamp(&row.created_at, "voice note created_at"),
        likes: RawCount::from(row.likes),
        comments: RawCount::from(row.comments),
        plays: RawCount::from(row.plays),
        shares: RawCount::from(row.shares),
        tags,
    }
    .into_note()
}

pub(crate) fn identity_from_row(row: IdentityRow) -> UserIdentity {
    UserIdentity {
        id: parse_uuid(&row.id, "user id"),
        username: row.username,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
    }
}

/// Group a batch of tag rows by note id.
pub(crate) fn group_tags(rows: Vec<TagRow>) -> HashMap<String, Vec<String>> {
    let mut by_note: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        by_note.entry(row.voice_note_id).or_default().push(row.tag);
    }
    by_note
}
