use crate::Database;
use crate::models::{
    CommentRow, CreatorRow, IdentityRow, LikedNoteRow, NoteRow, ShareRow, TagRow, UserRow,
};
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::ToSql;
use tracing::warn;

/// Note columns plus aggregate counts resolved inline. The COUNT
/// subqueries keep counts consistent with the underlying tables without a
/// denormalized counter column.
const NOTE_COLUMNS: &str = "n.id, n.user_id, n.title, n.duration_seconds, n.audio_url, \
     n.background_image_url, n.created_at, \
     (SELECT COUNT(*) FROM likes l WHERE l.voice_note_id = n.id) AS likes, \
     (SELECT COUNT(*) FROM comments c WHERE c.voice_note_id = n.id) AS comments, \
     (SELECT COUNT(*) FROM plays p WHERE p.voice_note_id = n.id) AS plays, \
     (SELECT COUNT(*) FROM shares s WHERE s.voice_note_id = n.id) AS shares";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, display_name) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, username, password_hash, display_name],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Partial profile update: absent fields keep their current value.
    pub fn update_profile(
        &self,
        id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    display_name = COALESCE(?2, display_name),
                    bio = COALESCE(?3, bio),
                    avatar_url = COALESCE(?4, avatar_url)
                 WHERE id = ?1",
                rusqlite::params![id, display_name, bio, avatar_url],
            )?;
            Ok(())
        })
    }

    /// Batch-fetch public identities for a set of user IDs.
    pub fn identities(&self, ids: &[String]) -> Result<Vec<IdentityRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, username, display_name, avatar_url FROM users WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(ids).as_slice(), |row| {
                    Ok(IdentityRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        avatar_url: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Follower / following / note counts for a profile page.
    pub fn profile_counts(&self, id: &str) -> Result<(i64, i64, i64)> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1),
                    (SELECT COUNT(*) FROM voice_notes WHERE user_id = ?1)",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(row)
        })
    }

    // -- Follows --

    /// Toggle a follow edge: removes if present, inserts if not.
    /// Returns true when the edge was added, false when removed.
    pub fn toggle_follow(&self, id: &str, follower_id: &str, following_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                    [follower_id, following_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM follows WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO follows (id, follower_id, following_id) VALUES (?1, ?2, ?3)",
                    [id, follower_id, following_id],
                )?;
                Ok(true)
            }
        })
    }

    /// IDs the user follows — the feed's adjacency query.
    pub fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT following_id FROM follows WHERE follower_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    // -- Voice notes --

    pub fn insert_note(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        duration_seconds: i64,
        audio_url: &str,
        background_image_url: Option<&str>,
        tags: &[String],
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO voice_notes (id, user_id, title, duration_seconds, audio_url, background_image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, title, duration_seconds, audio_url, background_image_url],
            )?;

            // Tags are stored lowercased; OR IGNORE collapses duplicates
            // that only differ in case.
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO voice_note_tags (voice_note_id, tag) VALUES (?1, ?2)",
            )?;
            for tag in tags {
                let tag = tag.trim().to_lowercase();
                if !tag.is_empty() {
                    stmt.execute([id, tag.as_str()])?;
                }
            }
            Ok(())
        })
    }

    pub fn get_note(&self, id: &str) -> Result<Option<NoteRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {NOTE_COLUMNS} FROM voice_notes n WHERE n.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_note_row).optional()?;
            Ok(row)
        })
    }

    pub fn note_author(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let author = conn
                .query_row("SELECT user_id FROM voice_notes WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(author)
        })
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM voice_note_tags WHERE voice_note_id = ?1", [id])?;
            conn.execute("DELETE FROM likes WHERE voice_note_id = ?1", [id])?;
            conn.execute("DELETE FROM comments WHERE voice_note_id = ?1", [id])?;
            conn.execute("DELETE FROM plays WHERE voice_note_id = ?1", [id])?;
            conn.execute("DELETE FROM shares WHERE voice_note_id = ?1", [id])?;
            conn.execute("DELETE FROM voice_notes WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn notes_by_user(&self, user_id: &str) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM voice_notes n
                 WHERE n.user_id = ?1 ORDER BY n.created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_note_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All notes authored by any of `author_ids`, newest first.
    pub fn notes_by_authors(&self, author_ids: &[String]) -> Result<Vec<NoteRow>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM voice_notes n
                 WHERE n.user_id IN ({}) ORDER BY n.created_at DESC",
                placeholders(author_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(author_ids).as_slice(), map_note_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn notes_by_ids(&self, ids: &[String]) -> Result<Vec<NoteRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM voice_notes n WHERE n.id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(ids).as_slice(), map_note_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch tags for a set of note IDs; grouped in memory by the
    /// caller.
    pub fn tags_for_notes(&self, ids: &[String]) -> Result<Vec<TagRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT voice_note_id, tag FROM voice_note_tags WHERE voice_note_id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(id_params(ids).as_slice(), |row| {
                    Ok(TagRow {
                        voice_note_id: row.get(0)?,
                        tag: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Engagement --

    /// Toggle a like. Returns true when added, false when removed.
    pub fn toggle_like(&self, id: &str, voice_note_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| toggle_row(conn, "likes", id, voice_note_id, user_id))
    }

    /// Toggle a share (repost). Returns true when added, false when
    /// removed — sharing is a toggle, not a counter.
    pub fn toggle_share(&self, id: &str, voice_note_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| toggle_row(conn, "shares", id, voice_note_id, user_id))
    }

    pub fn insert_play(&self, id: &str, voice_note_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plays (id, voice_note_id, user_id) VALUES (?1, ?2, ?3)",
                [id, voice_note_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn insert_comment(
        &self,
        id: &str,
        voice_note_id: &str,
        user_id: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, voice_note_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
                [id, voice_note_id, user_id, body],
            )?;
            Ok(())
        })
    }

    pub fn comments_for_note(&self, voice_note_id: &str, limit: u32) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the commenter's username in one query
            let mut stmt = conn.prepare(
                "SELECT c.id, c.voice_note_id, c.user_id, u.username, c.body, c.created_at
                 FROM comments c
                 LEFT JOIN users u ON c.user_id = u.id
                 WHERE c.voice_note_id = ?1
                 ORDER BY c.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![voice_note_id, limit], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        voice_note_id: row.get(1)?,
                        user_id: row.get(2)?,
                        username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Feed --

    /// Share records by any of `user_ids`, newest first. A missing shares
    /// table is tolerated and served as zero shares; every other failure
    /// propagates.
    pub fn shares_by_users(&self, user_ids: &[String]) -> Result<Vec<ShareRow>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| match query_shares(conn, user_ids) {
            Ok(rows) => Ok(rows),
            Err(e) if is_missing_table(&e) => {
                warn!("shares table missing, serving feed without reposts: {}", e);
                Ok(vec![])
            }
            Err(e) => Err(e.into()),
        })
    }

    // -- Discovery --

    /// The user's most recent likes with the liked note's author, for
    /// building a taste profile.
    pub fn recent_liked_notes(&self, user_id: &str, limit: u32) -> Result<Vec<LikedNoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.voice_note_id, n.user_id
                 FROM likes l
                 JOIN voice_notes n ON l.voice_note_id = n.id
                 WHERE l.user_id = ?1
                 ORDER BY l.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(LikedNoteRow {
                        voice_note_id: row.get(0)?,
                        author_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A page of candidate notes from creators the user neither follows
    /// nor is, newest first.
    pub fn discovery_candidates(
        &self,
        exclude_authors: &[String],
        self_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NoteRow>> {
        self.with_conn(|conn| {
            let n = exclude_authors.len();
            let sql = if n == 0 {
                format!(
                    "SELECT {NOTE_COLUMNS} FROM voice_notes n
                     WHERE n.user_id != ?1
                     ORDER BY n.created_at DESC LIMIT ?2 OFFSET ?3"
                )
            } else {
                format!(
                    "SELECT {NOTE_COLUMNS} FROM voice_notes n
                     WHERE n.user_id NOT IN ({}) AND n.user_id != ?{}
                     ORDER BY n.created_at DESC LIMIT ?{} OFFSET ?{}",
                    placeholders(n),
                    n + 1,
                    n + 2,
                    n + 3
                )
            };

            let limit = limit as i64;
            let offset = offset as i64;
            let mut params = id_params(exclude_authors);
            params.push(&self_id);
            params.push(&limit);
            params.push(&offset);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), map_note_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fallback candidate page: most recent notes by anyone but the user,
    /// with no personalization filter.
    pub fn recent_notes_excluding(
        &self,
        self_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<NoteRow>> {
        self.discovery_candidates(&[], self_id, limit, offset)
    }

    /// Candidate creators with per-creator aggregate stats, excluding the
    /// user and everyone they already follow.
    pub fn creator_candidates(
        &self,
        exclude_ids: &[String],
        self_id: &str,
        limit: u32,
    ) -> Result<Vec<CreatorRow>> {
        self.with_conn(|conn| {
            let n = exclude_ids.len();
            let not_in = if n == 0 {
                String::new()
            } else {
                format!("u.id NOT IN ({}) AND", placeholders(n))
            };
            let sql = format!(
                "SELECT u.id, u.username, u.display_name, u.avatar_url, u.verified,
                    (SELECT COUNT(*) FROM voice_notes n WHERE n.user_id = u.id) AS post_count,
                    (SELECT COUNT(*) FROM likes l JOIN voice_notes n ON l.voice_note_id = n.id
                        WHERE n.user_id = u.id) AS total_likes,
                    (SELECT COUNT(*) FROM comments c JOIN voice_notes n ON c.voice_note_id = n.id
                        WHERE n.user_id = u.id) AS total_comments,
                    (SELECT COUNT(*) FROM plays p JOIN voice_notes n ON p.voice_note_id = n.id
                        WHERE n.user_id = u.id) AS total_plays
                 FROM users u
                 WHERE {} u.id != ?{}
                 ORDER BY u.created_at DESC LIMIT ?{}",
                not_in,
                n + 1,
                n + 2
            );

            let limit = limit as i64;
            let mut params = id_params(exclude_ids);
            params.push(&self_id);
            params.push(&limit);

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(CreatorRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        avatar_url: row.get(3)?,
                        verified: row.get::<_, i64>(4)? != 0,
                        post_count: row.get(5)?,
                        total_likes: row.get(6)?,
                        total_comments: row.get(7)?,
                        total_plays: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, password, display_name, avatar_url, bio, verified, created_at
         FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                avatar_url: row.get(4)?,
                bio: row.get(5)?,
                verified: row.get::<_, i64>(6)? != 0,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_shares(conn: &Connection, user_ids: &[String]) -> rusqlite::Result<Vec<ShareRow>> {
    let sql = format!(
        "SELECT id, voice_note_id, user_id, created_at FROM shares
         WHERE user_id IN ({}) ORDER BY created_at DESC",
        placeholders(user_ids.len())
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(id_params(user_ids).as_slice(), |row| {
            Ok(ShareRow {
                id: row.get(0)?,
                voice_note_id: row.get(1)?,
                user_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Toggle an (id, voice_note_id, user_id) row in a like-shaped table.
fn toggle_row(
    conn: &Connection,
    table: &str,
    id: &str,
    voice_note_id: &str,
    user_id: &str,
) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            &format!("SELECT id FROM {table} WHERE voice_note_id = ?1 AND user_id = ?2"),
            [voice_note_id, user_id],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(existing_id) = existing {
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [&existing_id])?;
        Ok(false)
    } else {
        conn.execute(
            &format!("INSERT INTO {table} (id, voice_note_id, user_id) VALUES (?1, ?2, ?3)"),
            [id, voice_note_id, user_id],
        )?;
        Ok(true)
    }
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        duration_seconds: row.get(3)?,
        audio_url: row.get(4)?,
        background_image_url: row.get(5)?,
        created_at: row.get(6)?,
        likes: row.get(7)?,
        comments: row.get(8)?,
        plays: row.get(9)?,
        shares: row.get(10)?,
    })
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn id_params(ids: &[String]) -> Vec<&dyn ToSql> {
    ids.iter().map(|id| id as &dyn ToSql).collect()
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table"))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_missing_table;
    use rusqlite::Connection;

    #[test]
    fn missing_table_error_is_recognized() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .prepare("SELECT id FROM shares WHERE user_id = ?1")
            .unwrap_err();
        assert!(is_missing_table(&err));
    }

    #[test]
    fn other_errors_are_not_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.prepare("SELECT totally not sql").unwrap_err();
        assert!(!is_missing_table(&err));
    }
}
