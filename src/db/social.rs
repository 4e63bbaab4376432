//! Follows, likes, comments, and the activity numbers built from them.

use rusqlite::{params, Connection, OptionalExtension};

use super::models::Comment;

pub fn follow(conn: &Connection, follower_id: i64, followed_id: i64) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
        params![follower_id, followed_id],
    )?;
    Ok(inserted > 0)
}

pub fn unfollow(conn: &Connection, follower_id: i64, followed_id: i64) -> rusqlite::Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
    )?;
    Ok(deleted > 0)
}

pub fn is_following(
    conn: &Connection,
    follower_id: i64,
    followed_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower_id, followed_id],
        |row| row.get(0),
    )
}

pub fn follower_count(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE followed_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Liked,
    Unliked,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Liked => "liked",
            LikeAction::Unliked => "unliked",
        }
    }
}

/// Like the recommendation, or remove the like when it already exists.
pub fn toggle_like(
    conn: &Connection,
    user_id: i64,
    recommendation_id: i64,
) -> rusqlite::Result<LikeAction> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND recommendation_id = ?2",
        params![user_id, recommendation_id],
    )?;
    if removed > 0 {
        return Ok(LikeAction::Unliked);
    }
    conn.execute(
        "INSERT INTO likes (user_id, recommendation_id) VALUES (?1, ?2)",
        params![user_id, recommendation_id],
    )?;
    Ok(LikeAction::Liked)
}

pub fn like_count(conn: &Connection, recommendation_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE recommendation_id = ?1",
        params![recommendation_id],
        |row| row.get(0),
    )
}

pub fn is_liked(conn: &Connection, user_id: i64, recommendation_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE user_id = ?1 AND recommendation_id = ?2",
        params![user_id, recommendation_id],
        |row| row.get(0),
    )
}

pub fn add_comment(
    conn: &Connection,
    user_id: i64,
    recommendation_id: i64,
    content: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (content, user_id, recommendation_id) VALUES (?1, ?2, ?3)",
        params![content, user_id, recommendation_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Comments on a recommendation, newest first.
pub fn comments_for(conn: &Connection, recommendation_id: i64) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT cm.id, cm.content, cm.user_id, cm.recommendation_id, cm.created_at, u.username \
         FROM comments cm JOIN users u ON u.id = cm.user_id \
         WHERE cm.recommendation_id = ?1 ORDER BY cm.created_at DESC, cm.id DESC",
    )?;
    let rows = stmt.query_map(params![recommendation_id], Comment::from_row)?;
    rows.collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentDeletion {
    Deleted,
    Forbidden,
    NotFound,
}

/// Delete a comment on `recommendation_id` if `actor_id` wrote it or owns the
/// recommendation.
pub fn delete_comment_as(
    conn: &Connection,
    comment_id: i64,
    recommendation_id: i64,
    actor_id: i64,
) -> rusqlite::Result<CommentDeletion> {
    let found: Option<(i64, i64)> = conn
        .query_row(
            "SELECT cm.user_id, p.user_id FROM comments cm \
             JOIN recommendations r ON r.id = cm.recommendation_id \
             JOIN categories c ON c.id = r.category_id \
             JOIN profiles p ON p.id = c.profile_id \
             WHERE cm.id = ?1 AND cm.recommendation_id = ?2",
            params![comment_id, recommendation_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match found {
        None => Ok(CommentDeletion::NotFound),
        Some((author, owner)) if actor_id == author || actor_id == owner => {
            conn.execute("DELETE FROM comments WHERE id = ?1", params![comment_id])?;
            Ok(CommentDeletion::Deleted)
        }
        Some(_) => Ok(CommentDeletion::Forbidden),
    }
}

/// Activity numbers for a user's dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub recommendations: i64,
    pub categories: i64,
    pub followers: i64,
    pub likes: i64,
    pub comments: i64,
    /// Recommendations added in the last seven days.
    pub recent: i64,
    pub with_tips: i64,
    pub with_tags: i64,
}

pub fn activity_stats(
    conn: &Connection,
    user_id: i64,
    profile_id: i64,
) -> rusqlite::Result<ActivityStats> {
    let (recommendations, recent, with_tips, with_tags) = conn.query_row(
        "SELECT COUNT(*), \
         COALESCE(SUM(r.created_at >= datetime('now', '-7 days')), 0), \
         COALESCE(SUM(r.pro_tip IS NOT NULL AND r.pro_tip != ''), 0), \
         COALESCE(SUM(r.tags NOT IN ('', '{}')), 0) \
         FROM recommendations r JOIN categories c ON c.id = r.category_id \
         WHERE c.profile_id = ?1",
        params![profile_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let (likes, comments) = conn.query_row(
        "SELECT \
         (SELECT COUNT(*) FROM likes l JOIN recommendations r ON r.id = l.recommendation_id \
          JOIN categories c ON c.id = r.category_id WHERE c.profile_id = ?1), \
         (SELECT COUNT(*) FROM comments cm JOIN recommendations r ON r.id = cm.recommendation_id \
          JOIN categories c ON c.id = r.category_id WHERE c.profile_id = ?1)",
        params![profile_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(ActivityStats {
        recommendations,
        categories: super::categories::count(conn, profile_id)?,
        followers: follower_count(conn, user_id)?,
        likes,
        comments,
        recent,
        with_tips,
        with_tags,
    })
}
