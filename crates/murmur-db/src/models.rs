/// Database row types — these map directly to SQLite rows.
/// Distinct from murmur-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    pub created_at: String,
}

pub struct IdentityRow {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A voice note with its aggregate counts resolved by COUNT subqueries.
/// Tags are fetched separately in a batch and grouped in memory.
pub struct NoteRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub duration_seconds: i64,
    pub audio_url: String,
    pub background_image_url: Option<String>,
    pub created_at: String,
    pub likes: i64,
    pub comments: i64,
    pub plays: i64,
    pub shares: i64,
}

pub struct TagRow {
    pub voice_note_id: String,
    pub tag: String,
}

pub struct ShareRow {
    pub id: String,
    pub voice_note_id: String,
    pub user_id: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub voice_note_id: String,
    pub user_id: String,
    pub username: String,
    pub body: String,
    pub created_at: String,
}

/// One recently-liked note, reduced to the discovery signals.
pub struct LikedNoteRow {
    pub voice_note_id: String,
    pub author_id: String,
}

/// A candidate creator with stats aggregated across their notes.
pub struct CreatorRow {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub verified: bool,
    pub post_count: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_plays: i64,
}
