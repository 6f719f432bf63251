use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT,
            avatar_url      TEXT,
            bio             TEXT,
            verified        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS follows (
            id              TEXT PRIMARY KEY,
            follower_id     TEXT NOT NULL REFERENCES users(id),
            following_id    TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(follower_id, following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_follower
            ON follows(follower_id);

        CREATE TABLE IF NOT EXISTS voice_notes (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL REFERENCES users(id),
            title                   TEXT NOT NULL,
            duration_seconds        INTEGER NOT NULL,
            audio_url               TEXT NOT NULL,
            background_image_url    TEXT,
            created_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_voice_notes_user
            ON voice_notes(user_id, created_at);

        CREATE TABLE IF NOT EXISTS voice_note_tags (
            voice_note_id   TEXT NOT NULL REFERENCES voice_notes(id),
            tag             TEXT NOT NULL,
            UNIQUE(voice_note_id, tag)
        );

        CREATE TABLE IF NOT EXISTS likes (
            id              TEXT PRIMARY KEY,
            voice_note_id   TEXT NOT NULL REFERENCES voice_notes(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(voice_note_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_user
            ON likes(user_id, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id              TEXT PRIMARY KEY,
            voice_note_id   TEXT NOT NULL REFERENCES voice_notes(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            body            TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_note
            ON comments(voice_note_id, created_at);

        CREATE TABLE IF NOT EXISTS plays (
            id              TEXT PRIMARY KEY,
            voice_note_id   TEXT NOT NULL REFERENCES voice_notes(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS shares (
            id              TEXT PRIMARY KEY,
            voice_note_id   TEXT NOT NULL REFERENCES voice_notes(id),
            user_id         TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(voice_note_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_shares_user
            ON shares(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
