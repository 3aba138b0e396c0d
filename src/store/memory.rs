//! In-memory store mirroring the PostgreSQL schema's constraints, for handler and route tests.

use super::{Database, LikeOutcome, Session};
use crate::error::AppError;
use crate::model::{assemble, CommentView, VideoRow, VideoView};
use crate::operation::{AvatarUpdate, LikeTarget, NewComment, NewVideo, Scalar, ThumbnailUpdate};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
struct UserRec {
    id: i32,
    name: String,
    avatar_url: Option<String>,
}

#[derive(Clone, Debug)]
struct VideoRec {
    id: i32,
    title: String,
    thumbnail_url: Option<String>,
    video_url: String,
    views: i32,
    created_at: NaiveDateTime,
    user_id: i32,
}

#[derive(Clone, Debug)]
struct LikeRec {
    video_id: i32,
    user_id: i32,
}

#[derive(Clone, Debug)]
struct CommentRec {
    id: i32,
    video_id: i32,
    user_id: i32,
    text: String,
    created_at: NaiveDateTime,
}

#[derive(Default, Debug)]
struct State {
    users: Vec<UserRec>,
    videos: Vec<VideoRec>,
    likes: Vec<LikeRec>,
    comments: Vec<CommentRec>,
    next_id: i32,
    ticks: i64,
    opened: usize,
    closed: usize,
    offline: bool,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so ordering by creation time is deterministic.
    fn now(&mut self) -> NaiveDateTime {
        self.ticks += 1;
        let epoch = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        epoch + Duration::seconds(self.ticks)
    }

    fn user(&self, id: i32) -> Option<&UserRec> {
        self.users.iter().find(|u| u.id == id)
    }
}

fn not_null<T>(column: &str, value: Option<T>) -> Result<T, String> {
    value.ok_or_else(|| format!("null value in column \"{}\" violates not-null constraint", column))
}

/// `$n::int` with PostgreSQL's messages for text that is not a 32-bit integer.
fn int(value: &Option<Scalar>) -> Result<Option<i32>, String> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.as_str();
    let wide: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid input syntax for type integer: \"{}\"", raw))?;
    i32::try_from(wide)
        .map(Some)
        .map_err(|_| format!("value \"{}\" is out of range for type integer", raw))
}

fn required_int(column: &str, value: &Option<Scalar>) -> Result<i32, String> {
    not_null(column, int(value)?)
}

fn required_text(column: &str, value: &Option<Scalar>) -> Result<String, String> {
    not_null(column, value.as_ref().map(|s| s.as_str().to_string()))
}

fn owned_text(value: &Option<Scalar>) -> Option<String> {
    value.as_ref().map(|s| s.as_str().to_string())
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_user(&self, name: &str) -> i32 {
        let mut s = self.lock();
        let id = s.next_id();
        s.users.push(UserRec {
            id,
            name: name.to_string(),
            avatar_url: None,
        });
        id
    }

    pub fn add_user_with_id(&self, id: i32, name: &str) {
        self.lock().users.push(UserRec {
            id,
            name: name.to_string(),
            avatar_url: None,
        });
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// `(opened, closed)` session counts.
    pub fn sessions(&self) -> (usize, usize) {
        let s = self.lock();
        (s.opened, s.closed)
    }

    pub fn like_rows(&self) -> usize {
        self.lock().likes.len()
    }

    pub fn thumbnail_of(&self, video_id: i32) -> Option<String> {
        self.lock()
            .videos
            .iter()
            .find(|v| v.id == video_id)
            .and_then(|v| v.thumbnail_url.clone())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn open(&self) -> Result<Box<dyn Session>, AppError> {
        let mut s = self.lock();
        if s.offline {
            return Err(AppError::Db(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))));
        }
        s.opened += 1;
        drop(s);
        Ok(Box::new(MemorySession {
            db: self.clone(),
        }))
    }
}

struct MemorySession {
    db: MemoryDatabase,
}

#[async_trait]
impl Session for MemorySession {
    async fn list_videos(&mut self) -> Result<Vec<VideoView>, AppError> {
        let s = self.db.lock();
        let mut rows: Vec<VideoRow> = s
            .videos
            .iter()
            .map(|v| {
                let author = s.user(v.user_id);
                VideoRow {
                    id: v.id,
                    title: Some(v.title.clone()),
                    thumbnail_url: v.thumbnail_url.clone(),
                    video_url: Some(v.video_url.clone()),
                    views: Some(v.views),
                    created_at: Some(v.created_at),
                    user_id: author.map(|u| u.id),
                    author: author.map(|u| u.name.clone()),
                    avatar_url: author.and_then(|u| u.avatar_url.clone()),
                    likes_count: s.likes.iter().filter(|l| l.video_id == v.id).count() as i64,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut comments: Vec<CommentView> = s
            .comments
            .iter()
            .map(|c| {
                let author = s.user(c.user_id);
                CommentView {
                    id: c.id,
                    video_id: c.video_id,
                    text: Some(c.text.clone()),
                    created_at: Some(c.created_at),
                    user_id: author.map(|u| u.id),
                    author: author.map(|u| u.name.clone()),
                    avatar_url: author.and_then(|u| u.avatar_url.clone()),
                }
            })
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let likes = s.likes.iter().map(|l| (l.video_id, l.user_id)).collect();
        Ok(assemble(rows, comments, likes))
    }

    async fn find_user(&mut self, id: &Scalar) -> Result<Option<Value>, AppError> {
        let id = int(&Some(id.clone()))
            .map_err(AppError::InvalidInput)?
            .unwrap_or_default();
        let s = self.db.lock();
        Ok(s.user(id).map(|u| {
            json!({ "id": u.id, "name": u.name, "avatar_url": u.avatar_url })
        }))
    }

    async fn insert_video(&mut self, video: &NewVideo) -> Result<i32, AppError> {
        let mut s = self.db.lock();
        let user_id = required_int("user_id", &video.user_id).map_err(AppError::InvalidInput)?;
        let title = required_text("title", &video.title).map_err(AppError::InvalidInput)?;
        let video_url = required_text("video_url", &video.video_url).map_err(AppError::InvalidInput)?;
        let id = s.next_id();
        let created_at = s.now();
        s.videos.push(VideoRec {
            id,
            title,
            thumbnail_url: owned_text(&video.thumbnail_url),
            video_url,
            views: 0,
            created_at,
            user_id,
        });
        Ok(id)
    }

    async fn insert_like(&mut self, target: &LikeTarget) -> Result<LikeOutcome, AppError> {
        let mut s = self.db.lock();
        let (video_id, user_id) = match (
            required_int("video_id", &target.video_id),
            required_int("user_id", &target.user_id),
        ) {
            (Ok(v), Ok(u)) => (v, u),
            (Err(e), _) | (_, Err(e)) => return Ok(LikeOutcome::Rejected(e)),
        };
        if !s.videos.iter().any(|v| v.id == video_id) {
            return Ok(LikeOutcome::Rejected(
                "insert or update on table \"likes\" violates foreign key constraint \"likes_video_id_fkey\"".into(),
            ));
        }
        if s.likes.iter().any(|l| l.video_id == video_id && l.user_id == user_id) {
            return Ok(LikeOutcome::AlreadyPresent);
        }
        s.likes.push(LikeRec { video_id, user_id });
        Ok(LikeOutcome::Created)
    }

    async fn insert_comment(&mut self, comment: &NewComment) -> Result<i32, AppError> {
        let mut s = self.db.lock();
        let video_id = required_int("video_id", &comment.video_id).map_err(AppError::InvalidInput)?;
        let user_id = required_int("user_id", &comment.user_id).map_err(AppError::InvalidInput)?;
        let text = required_text("text", &comment.text).map_err(AppError::InvalidInput)?;
        let id = s.next_id();
        let created_at = s.now();
        s.comments.push(CommentRec {
            id,
            video_id,
            user_id,
            text,
            created_at,
        });
        Ok(id)
    }

    async fn delete_like(&mut self, target: &LikeTarget) -> Result<bool, AppError> {
        let video_id = int(&target.video_id).map_err(AppError::InvalidInput)?;
        let user_id = int(&target.user_id).map_err(AppError::InvalidInput)?;
        let mut s = self.db.lock();
        let before = s.likes.len();
        s.likes
            .retain(|l| Some(l.video_id) != video_id || Some(l.user_id) != user_id);
        Ok(s.likes.len() < before)
    }

    async fn update_avatar(&mut self, update: &AvatarUpdate) -> Result<bool, AppError> {
        let user_id = int(&update.user_id).map_err(AppError::InvalidInput)?;
        let mut s = self.db.lock();
        let mut matched = false;
        for u in s.users.iter_mut().filter(|u| Some(u.id) == user_id) {
            u.avatar_url = owned_text(&update.avatar_url);
            matched = true;
        }
        Ok(matched)
    }

    async fn update_thumbnail(&mut self, update: &ThumbnailUpdate) -> Result<bool, AppError> {
        let video_id = int(&update.video_id).map_err(AppError::InvalidInput)?;
        let mut s = self.db.lock();
        let mut matched = false;
        for v in s.videos.iter_mut().filter(|v| Some(v.id) == video_id) {
            v.thumbnail_url = owned_text(&update.thumbnail_url);
            matched = true;
        }
        Ok(matched)
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.db.lock().closed += 1;
        Ok(())
    }
}
