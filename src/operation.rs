//! Typed operations and the routing table that maps `(method, path)` onto them.

use crate::error::AppError;
use crate::event::GatewayEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Placeholder identity used when a request omits `user_id`. There is no auth context.
pub const DEFAULT_USER_ID: i32 = 1;

fn default_user_id() -> Option<Scalar> {
    Some(Scalar::from(DEFAULT_USER_ID))
}

/// A body field kept as the text PostgreSQL will cast to the column type.
/// Any non-null JSON value is accepted; strings are taken verbatim, everything else
/// as its JSON rendering. Whether `"2"` or `3000000000` fits an integer column is the store's call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scalar(String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar(n.to_string())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar(s.to_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Scalar(s),
            other => Scalar(other.to_string()),
        })
    }
}

/// Bind form of an optional field: `None` binds as SQL NULL.
pub fn text(field: &Option<Scalar>) -> Option<&str> {
    field.as_ref().map(Scalar::as_str)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Options,
    Other,
}

impl Verb {
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Verb::Get,
            "POST" => Verb::Post,
            "PUT" => Verb::Put,
            "DELETE" => Verb::Delete,
            "OPTIONS" => Verb::Options,
            _ => Verb::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    ListVideos,
    GetUser,
    CreateVideo,
    CreateLike,
    CreateComment,
    DeleteLike,
    UpdateAvatar,
    UpdateThumbnail,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::ListVideos => "list_videos",
            OperationKind::GetUser => "get_user",
            OperationKind::CreateVideo => "create_video",
            OperationKind::CreateLike => "create_like",
            OperationKind::CreateComment => "create_comment",
            OperationKind::DeleteLike => "delete_like",
            OperationKind::UpdateAvatar => "update_avatar",
            OperationKind::UpdateThumbnail => "update_thumbnail",
        }
    }
}

const ROUTES: &[(Verb, &str, OperationKind)] = &[
    (Verb::Get, "videos", OperationKind::ListVideos),
    (Verb::Get, "user", OperationKind::GetUser),
    (Verb::Post, "video", OperationKind::CreateVideo),
    (Verb::Post, "like", OperationKind::CreateLike),
    (Verb::Post, "comment", OperationKind::CreateComment),
    (Verb::Delete, "like", OperationKind::DeleteLike),
    (Verb::Put, "user", OperationKind::UpdateAvatar),
    (Verb::Put, "video", OperationKind::UpdateThumbnail),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Operation(OperationKind),
}

/// Requests that never reach the store. Rendered with status 200 and an `error` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    UnknownPath,
    MethodNotAllowed,
}

impl Rejection {
    pub fn message(self) -> &'static str {
        match self {
            Rejection::UnknownPath => "Unknown path",
            Rejection::MethodNotAllowed => "Method not allowed",
        }
    }
}

pub fn resolve(verb: Verb, path: &str) -> Result<Route, Rejection> {
    match verb {
        Verb::Options => return Ok(Route::Preflight),
        Verb::Other => return Err(Rejection::MethodNotAllowed),
        _ => {}
    }
    ROUTES
        .iter()
        .find(|(v, p, _)| *v == verb && *p == path)
        .map(|(_, _, kind)| Route::Operation(*kind))
        .ok_or(Rejection::UnknownPath)
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct NewVideo {
    pub title: Option<Scalar>,
    pub thumbnail_url: Option<Scalar>,
    pub video_url: Option<Scalar>,
    #[serde(default = "default_user_id")]
    pub user_id: Option<Scalar>,
}

/// `(video_id, user_id)` pair addressed by like and unlike.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct LikeTarget {
    pub video_id: Option<Scalar>,
    #[serde(default = "default_user_id")]
    pub user_id: Option<Scalar>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct NewComment {
    pub video_id: Option<Scalar>,
    #[serde(default = "default_user_id")]
    pub user_id: Option<Scalar>,
    pub text: Option<Scalar>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct AvatarUpdate {
    pub avatar_url: Option<Scalar>,
    #[serde(default = "default_user_id")]
    pub user_id: Option<Scalar>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ThumbnailUpdate {
    pub thumbnail_url: Option<Scalar>,
    pub video_id: Option<Scalar>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    ListVideos,
    GetUser { id: Scalar },
    CreateVideo(NewVideo),
    CreateLike(LikeTarget),
    /// Like request whose body is valid JSON but not a usable object (e.g. `[]`, `null`).
    /// Answered locally, like a store rejection.
    UnreadableLike(String),
    CreateComment(NewComment),
    DeleteLike(LikeTarget),
    UpdateAvatar(AvatarUpdate),
    UpdateThumbnail(ThumbnailUpdate),
}

impl Operation {
    /// Read the inputs of `kind` from the event: query parameters for reads, JSON body otherwise.
    pub fn from_event(kind: OperationKind, event: &GatewayEvent) -> Result<Self, AppError> {
        Ok(match kind {
            OperationKind::ListVideos => Operation::ListVideos,
            OperationKind::GetUser => Operation::GetUser {
                id: Scalar::from(event.query("id").unwrap_or("1")),
            },
            OperationKind::CreateVideo => Operation::CreateVideo(body(event)?),
            OperationKind::CreateLike => {
                let raw: Value = body(event)?;
                match serde_json::from_value(raw) {
                    Ok(target) => Operation::CreateLike(target),
                    Err(e) => Operation::UnreadableLike(e.to_string()),
                }
            }
            OperationKind::CreateComment => Operation::CreateComment(body(event)?),
            OperationKind::DeleteLike => Operation::DeleteLike(body(event)?),
            OperationKind::UpdateAvatar => Operation::UpdateAvatar(body(event)?),
            OperationKind::UpdateThumbnail => Operation::UpdateThumbnail(body(event)?),
        })
    }
}

/// Absent body reads as `{}`; anything else must be a JSON object.
fn body<T: DeserializeOwned>(event: &GatewayEvent) -> Result<T, AppError> {
    let raw = event.body.as_deref().unwrap_or("{}");
    Ok(serde_json::from_str(raw)?)
}
