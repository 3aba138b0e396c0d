//! Connection acquisition and the SQL operations behind each route.
//! One `Session` is one database connection, opened per invocation and closed before replying.

pub mod postgres;
#[cfg(test)]
pub(crate) mod memory;

use crate::error::AppError;
use crate::model::VideoView;
use crate::operation::{AvatarUpdate, LikeTarget, NewComment, NewVideo, Scalar, ThumbnailUpdate};
use async_trait::async_trait;
use serde_json::Value;

pub use postgres::PgDatabase;

/// Result of an insert-or-ignore like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LikeOutcome {
    Created,
    AlreadyPresent,
    /// The store refused the row (e.g. missing video, null column). Carries the store's message.
    Rejected(String),
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>, AppError>;
}

#[async_trait]
pub trait Session: Send {
    /// Videos newest first with author, like count, likers, and comments (newest first).
    async fn list_videos(&mut self) -> Result<Vec<VideoView>, AppError>;

    /// Every column of the user row, or None. `id` is cast to integer by the store.
    async fn find_user(&mut self, id: &Scalar) -> Result<Option<Value>, AppError>;

    async fn insert_video(&mut self, video: &NewVideo) -> Result<i32, AppError>;

    async fn insert_like(&mut self, target: &LikeTarget) -> Result<LikeOutcome, AppError>;

    async fn insert_comment(&mut self, comment: &NewComment) -> Result<i32, AppError>;

    /// Returns whether a like row was removed.
    async fn delete_like(&mut self, target: &LikeTarget) -> Result<bool, AppError>;

    /// Returns whether a user row matched.
    async fn update_avatar(&mut self, update: &AvatarUpdate) -> Result<bool, AppError>;

    /// Returns whether a video row matched.
    async fn update_thumbnail(&mut self, update: &ThumbnailUpdate) -> Result<bool, AppError>;

    async fn close(&mut self) -> Result<(), AppError>;
}
