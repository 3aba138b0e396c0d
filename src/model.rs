//! Response views for the feed. Rows come from LEFT JOINs, so author columns are nullable.

use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// `2024-03-01 02:00:00`, with `.ffffff` appended only when microseconds are non-zero.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    let micros = at.nanosecond() / 1_000;
    if micros == 0 {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        format!("{}.{:06}", at.format("%Y-%m-%d %H:%M:%S"), micros)
    }
}

fn timestamp<S: Serializer>(at: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => serializer.serialize_str(&format_timestamp(at)),
        None => serializer.serialize_none(),
    }
}

/// One video row from the listing query, before comments and likers are attached.
#[derive(sqlx::FromRow, Clone, Debug, PartialEq)]
pub struct VideoRow {
    pub id: i32,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub views: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
    pub user_id: Option<i32>,
    pub author: Option<String>,
    pub avatar_url: Option<String>,
    pub likes_count: i64,
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug, PartialEq)]
pub struct CommentView {
    pub id: i32,
    #[serde(skip)]
    pub video_id: i32,
    pub text: Option<String>,
    #[serde(serialize_with = "timestamp")]
    pub created_at: Option<NaiveDateTime>,
    pub user_id: Option<i32>,
    pub author: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VideoView {
    pub id: i32,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: Option<String>,
    pub views: Option<i32>,
    #[serde(serialize_with = "timestamp")]
    pub created_at: Option<NaiveDateTime>,
    pub user_id: Option<i32>,
    pub author: Option<String>,
    pub avatar_url: Option<String>,
    pub likes_count: i64,
    pub comments: Vec<CommentView>,
    pub liked_by: Vec<i32>,
}

/// `(video_id, user_id)` of one like row.
pub type LikeRow = (i32, i32);

impl VideoView {
    fn from_row(row: VideoRow, comments: Vec<CommentView>, liked_by: Vec<i32>) -> Self {
        VideoView {
            id: row.id,
            title: row.title,
            thumbnail_url: row.thumbnail_url,
            video_url: row.video_url,
            views: row.views,
            created_at: row.created_at,
            user_id: row.user_id,
            author: row.author,
            avatar_url: row.avatar_url,
            likes_count: row.likes_count,
            comments,
            liked_by,
        }
    }
}

/// Merge batch-fetched comments and likes onto their videos.
/// Video order, per-video comment order, and liker order are kept as given.
/// `(video_id, user_id)` is unique in the likes table, so likers need no dedup.
pub fn assemble(
    videos: Vec<VideoRow>,
    comments: Vec<CommentView>,
    likes: Vec<LikeRow>,
) -> Vec<VideoView> {
    let mut comments_by_video: HashMap<i32, Vec<CommentView>> = HashMap::new();
    for c in comments {
        comments_by_video.entry(c.video_id).or_default().push(c);
    }
    let mut likers_by_video: HashMap<i32, Vec<i32>> = HashMap::new();
    for (video_id, user_id) in likes {
        likers_by_video.entry(video_id).or_default().push(user_id);
    }
    videos
        .into_iter()
        .map(|row| {
            let comments = comments_by_video.remove(&row.id).unwrap_or_default();
            let liked_by = likers_by_video.remove(&row.id).unwrap_or_default();
            VideoView::from_row(row, comments, liked_by)
        })
        .collect()
}
