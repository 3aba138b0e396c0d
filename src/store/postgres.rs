//! PostgreSQL store: a single `PgConnection` per session, autocommit statements, no pool.

use super::{Database, LikeOutcome, Session};
use crate::error::{AppError, ConfigError};
use crate::model::{assemble, format_timestamp, CommentView, LikeRow, VideoRow, VideoView};
use crate::operation::{text, AvatarUpdate, LikeTarget, NewComment, NewVideo, Scalar, ThumbnailUpdate};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{ConnectOptions, Connection};
use std::str::FromStr;

const LIST_VIDEOS: &str = r#"
    SELECT
        v.id, v.title, v.thumbnail_url, v.video_url, v.views, v.created_at,
        u.id AS user_id, u.name AS author, u.avatar_url,
        COUNT(DISTINCT l.id) AS likes_count
    FROM videos v
    LEFT JOIN users u ON v.user_id = u.id
    LEFT JOIN likes l ON v.id = l.video_id
    GROUP BY v.id, u.id
    ORDER BY v.created_at DESC, v.id DESC
"#;

const COMMENTS_FOR_VIDEOS: &str = r#"
    SELECT c.id, c.video_id, c.text, c.created_at,
           u.id AS user_id, u.name AS author, u.avatar_url
    FROM comments c
    LEFT JOIN users u ON c.user_id = u.id
    WHERE c.video_id = ANY($1)
    ORDER BY c.created_at DESC, c.id DESC
"#;

const LIKES_FOR_VIDEOS: &str =
    "SELECT video_id, user_id FROM likes WHERE video_id = ANY($1) ORDER BY id";

// Body fields arrive as text; the casts let PostgreSQL accept "2" and reject 3000000000.
const FIND_USER: &str = "SELECT * FROM users WHERE id = $1::int";

const INSERT_VIDEO: &str = r#"
    INSERT INTO videos (title, thumbnail_url, video_url, user_id)
    VALUES ($1::text, $2::text, $3::text, $4::int)
    RETURNING id
"#;

const INSERT_LIKE: &str = r#"
    INSERT INTO likes (video_id, user_id)
    VALUES ($1::int, $2::int)
    ON CONFLICT (video_id, user_id) DO NOTHING
    RETURNING id
"#;

const INSERT_COMMENT: &str = r#"
    INSERT INTO comments (video_id, user_id, text)
    VALUES ($1::int, $2::int, $3::text)
    RETURNING id
"#;

const DELETE_LIKE: &str =
    "DELETE FROM likes WHERE video_id = $1::int AND user_id = $2::int RETURNING id";

const UPDATE_AVATAR: &str = "UPDATE users SET avatar_url = $1::text WHERE id = $2::int";

const UPDATE_THUMBNAIL: &str = "UPDATE videos SET thumbnail_url = $1::text WHERE id = $2::int";

/// Connection factory. Holds only the parsed connection options.
#[derive(Clone, Debug)]
pub struct PgDatabase {
    options: PgConnectOptions,
}

impl PgDatabase {
    pub fn new(options: PgConnectOptions) -> Self {
        PgDatabase { options }
    }

    pub fn from_url(database_url: &str) -> Result<Self, ConfigError> {
        let options = PgConnectOptions::from_str(database_url).map_err(|e| ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: e.to_string(),
        })?;
        Ok(PgDatabase::new(options))
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn open(&self) -> Result<Box<dyn Session>, AppError> {
        let conn = self.options.connect().await?;
        Ok(Box::new(PgSession { conn: Some(conn) }))
    }
}

pub struct PgSession {
    conn: Option<PgConnection>,
}

impl PgSession {
    fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.conn
            .as_mut()
            .ok_or_else(|| AppError::Db(sqlx::Error::PoolClosed))
    }
}

#[async_trait]
impl Session for PgSession {
    async fn list_videos(&mut self) -> Result<Vec<VideoView>, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %LIST_VIDEOS, "query");
        let videos: Vec<VideoRow> = sqlx::query_as(LIST_VIDEOS).fetch_all(&mut *conn).await?;
        if videos.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = videos.iter().map(|v| v.id).collect();

        tracing::debug!(sql = %COMMENTS_FOR_VIDEOS, videos = ids.len(), "query");
        let comments: Vec<CommentView> = sqlx::query_as(COMMENTS_FOR_VIDEOS)
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await?;

        tracing::debug!(sql = %LIKES_FOR_VIDEOS, videos = ids.len(), "query");
        let likes: Vec<LikeRow> = sqlx::query_as(LIKES_FOR_VIDEOS)
            .bind(&ids)
            .fetch_all(&mut *conn)
            .await?;

        Ok(assemble(videos, comments, likes))
    }

    async fn find_user(&mut self, id: &Scalar) -> Result<Option<Value>, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %FIND_USER, id = id.as_str(), "query");
        let row = sqlx::query(FIND_USER)
            .bind(id.as_str())
            .fetch_optional(conn)
            .await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn insert_video(&mut self, video: &NewVideo) -> Result<i32, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %INSERT_VIDEO, params = ?video, "query");
        let id: i32 = sqlx::query_scalar(INSERT_VIDEO)
            .bind(text(&video.title))
            .bind(text(&video.thumbnail_url))
            .bind(text(&video.video_url))
            .bind(text(&video.user_id))
            .fetch_one(conn)
            .await?;
        Ok(id)
    }

    async fn insert_like(&mut self, target: &LikeTarget) -> Result<LikeOutcome, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %INSERT_LIKE, params = ?target, "query");
        let inserted: Result<Option<i32>, AppError> = sqlx::query_scalar(INSERT_LIKE)
            .bind(text(&target.video_id))
            .bind(text(&target.user_id))
            .fetch_optional(conn)
            .await
            .map_err(AppError::Db);
        match inserted {
            Ok(Some(_)) => Ok(LikeOutcome::Created),
            Ok(None) => Ok(LikeOutcome::AlreadyPresent),
            Err(e) if e.is_rejected_by_database() => Ok(LikeOutcome::Rejected(e.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn insert_comment(&mut self, comment: &NewComment) -> Result<i32, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %INSERT_COMMENT, params = ?comment, "query");
        let id: i32 = sqlx::query_scalar(INSERT_COMMENT)
            .bind(text(&comment.video_id))
            .bind(text(&comment.user_id))
            .bind(text(&comment.text))
            .fetch_one(conn)
            .await?;
        Ok(id)
    }

    async fn delete_like(&mut self, target: &LikeTarget) -> Result<bool, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %DELETE_LIKE, params = ?target, "query");
        let deleted: Option<i32> = sqlx::query_scalar(DELETE_LIKE)
            .bind(text(&target.video_id))
            .bind(text(&target.user_id))
            .fetch_optional(conn)
            .await?;
        Ok(deleted.is_some())
    }

    async fn update_avatar(&mut self, update: &AvatarUpdate) -> Result<bool, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %UPDATE_AVATAR, params = ?update, "query");
        let result = sqlx::query(UPDATE_AVATAR)
            .bind(text(&update.avatar_url))
            .bind(text(&update.user_id))
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_thumbnail(&mut self, update: &ThumbnailUpdate) -> Result<bool, AppError> {
        let conn = self.conn()?;
        tracing::debug!(sql = %UPDATE_THUMBNAIL, params = ?update, "query");
        let result = sqlx::query(UPDATE_THUMBNAIL)
            .bind(text(&update.thumbnail_url))
            .bind(text(&update.video_id))
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&mut self) -> Result<(), AppError> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

/// Render a row of unknown shape (`SELECT *`) as a JSON object keyed by column name.
fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(v) = row.try_get::<Option<i16>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return v.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return v
            .map(|d| Value::String(format!("{}+00:00", format_timestamp(&d.naive_utc()))))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return v
            .map(|d| Value::String(format_timestamp(&d)))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(name) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}
