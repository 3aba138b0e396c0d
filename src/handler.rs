//! The request router: preflight, dispatch onto a typed operation, and the two error tiers.

use crate::error::AppError;
use crate::event::{GatewayEvent, GatewayResponse};
use crate::operation::{self, Operation, OperationKind, Route, Verb};
use crate::store::{Database, LikeOutcome, Session};
use serde_json::{json, Value};

/// Handle one gateway invocation. Never fails: unhandled errors become a 500 reply.
pub async fn handle(db: &dyn Database, event: &GatewayEvent) -> GatewayResponse {
    let method = event.method();
    let path = event.path();

    let kind = match operation::resolve(Verb::parse(method), path) {
        Ok(Route::Preflight) => return GatewayResponse::preflight(),
        Ok(Route::Operation(kind)) => kind,
        Err(rejection) => {
            tracing::debug!(%method, path, reason = rejection.message(), "request rejected");
            return GatewayResponse::json(200, &json!({ "error": rejection.message() }));
        }
    };

    match run(db, kind, event).await {
        Ok(body) => {
            tracing::info!(%method, path, operation = kind.name(), status = 200, "request handled");
            GatewayResponse::json(200, &body)
        }
        Err(e) => {
            tracing::error!(%method, path, operation = kind.name(), error = %e, "request failed");
            GatewayResponse::json(500, &json!({ "error": e.to_string() }))
        }
    }
}

async fn run(db: &dyn Database, kind: OperationKind, event: &GatewayEvent) -> Result<Value, AppError> {
    let op = Operation::from_event(kind, event)?;
    let mut session = db.open().await?;
    let result = execute(session.as_mut(), op).await;
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "closing database session failed");
    }
    result
}

async fn execute(session: &mut dyn Session, op: Operation) -> Result<Value, AppError> {
    Ok(match op {
        Operation::ListVideos => serde_json::to_value(session.list_videos().await?)?,
        Operation::GetUser { id } => session.find_user(&id).await?.unwrap_or(Value::Null),
        Operation::CreateVideo(video) => json!({ "id": session.insert_video(&video).await? }),
        Operation::CreateLike(target) => match session.insert_like(&target).await? {
            LikeOutcome::Created => json!({ "success": true, "liked": true }),
            LikeOutcome::AlreadyPresent => json!({ "success": true, "liked": false }),
            LikeOutcome::Rejected(message) => {
                tracing::warn!(?target, error = %message, "like rejected by store");
                json!({ "success": false, "error": message })
            }
        },
        Operation::UnreadableLike(message) => {
            tracing::warn!(error = %message, "like body unusable");
            json!({ "success": false, "error": message })
        }
        Operation::CreateComment(comment) => {
            json!({ "id": session.insert_comment(&comment).await? })
        }
        Operation::DeleteLike(target) => {
            let unliked = session.delete_like(&target).await?;
            json!({ "success": true, "unliked": unliked })
        }
        Operation::UpdateAvatar(update) => {
            let matched = session.update_avatar(&update).await?;
            tracing::debug!(user_id = ?operation::text(&update.user_id), matched, "avatar updated");
            json!({ "success": true })
        }
        Operation::UpdateThumbnail(update) => {
            let matched = session.update_thumbnail(&update).await?;
            tracing::debug!(video_id = ?operation::text(&update.video_id), matched, "thumbnail updated");
            json!({ "success": true })
        }
    })
}
