//! Notification routes: enqueueing interview results and queue administration.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use hireflow_common::error::AppError;
use hireflow_common::types::{NotificationPayload, Outcome};
use hireflow_notifier::{NotificationTask, QueueStatus, TaskId};

use crate::middleware::auth::AdminUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(enqueue_notification))
        .route("/api/notifications/batch", post(batch_notify))
        .route("/api/notifications/queue/status", get(queue_status))
        .route("/api/notifications/queue/tasks", get(list_tasks))
        .route("/api/notifications/queue/retry", post(retry_failed))
        .route("/api/notifications/queue", delete(clear_queue))
}

/// Response for a single enqueue.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub task_id: TaskId,
}

/// One interview considered for a batch result announcement.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BatchCandidate {
    #[validate(email, length(max = 255))]
    pub recipient_address: String,
    #[validate(length(min = 1, max = 100))]
    pub recipient_name: String,
    pub interview_id: Uuid,
    pub application_id: Uuid,
    /// Interview result, if one has been recorded
    pub result: Option<Outcome>,
    /// Whether the applicant was already told about this result
    #[serde(default)]
    pub notification_sent: bool,
}

/// Request body for batch notification.
#[derive(Debug, Deserialize)]
pub struct BatchNotifyRequest {
    pub candidates: Vec<BatchCandidate>,
}

/// Why a batch candidate was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The interview has no result yet
    NoResult,
    /// The applicant was already notified
    AlreadyNotified,
    /// Recipient address or name failed validation
    InvalidRecipient,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub interview_id: Uuid,
    pub reason: SkipReason,
}

/// Response for batch notification: what was queued, not what was delivered.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchNotifyResponse {
    pub queued: usize,
    pub task_ids: Vec<TaskId>,
    pub skipped: Vec<SkippedCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub limit: Option<usize>,
}

/// POST /api/notifications: Queue one interview-result email.
async fn enqueue_notification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<NotificationPayload>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    payload.validate()?;

    let interview_id = payload.interview_id;
    let task_id = state.queue.enqueue(payload);

    tracing::info!(
        task_id = %task_id,
        interview_id = %interview_id,
        admin_id = %admin.user_id,
        "Interview result notification queued"
    );

    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse { task_id })))
}

/// POST /api/notifications/batch: Queue result emails for every eligible interview.
///
/// Interviews without a result, already-notified interviews and invalid
/// recipients are reported back in `skipped` instead of being queued.
async fn batch_notify(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<BatchNotifyRequest>,
) -> Result<(StatusCode, Json<BatchNotifyResponse>), AppError> {
    let (payloads, skipped) = partition_candidates(req.candidates);

    for skip in &skipped {
        tracing::info!(
            interview_id = %skip.interview_id,
            reason = ?skip.reason,
            "Batch candidate skipped"
        );
    }

    let task_ids = state.queue.enqueue_batch(payloads);

    tracing::info!(
        queued = task_ids.len(),
        skipped = skipped.len(),
        admin_id = %admin.user_id,
        "Batch result notification queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchNotifyResponse {
            queued: task_ids.len(),
            task_ids,
            skipped,
        }),
    ))
}

/// GET /api/notifications/queue/status: Per-state task counts.
async fn queue_status(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<QueueStatus>, AppError> {
    Ok(Json(state.queue.status()))
}

/// GET /api/notifications/queue/tasks?limit=N: Snapshot of live tasks.
async fn list_tasks(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<NotificationTask>>, AppError> {
    Ok(Json(state.queue.list_tasks(query.limit)))
}

/// POST /api/notifications/queue/retry: Requeue every failed task.
async fn retry_failed(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let reset = state.queue.retry_failed();
    tracing::info!(reset, admin_id = %admin.user_id, "Failed notifications retried");
    Ok(Json(serde_json::json!({ "reset": reset })))
}

/// DELETE /api/notifications/queue: Drop every task.
async fn clear_queue(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let cleared = state.queue.clear();
    tracing::warn!(cleared, admin_id = %admin.user_id, "Notification queue cleared by admin");
    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

/// Split candidates into payloads to queue and skipped entries, keeping input order.
fn partition_candidates(
    candidates: Vec<BatchCandidate>,
) -> (Vec<NotificationPayload>, Vec<SkippedCandidate>) {
    let mut payloads = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();

    for candidate in candidates {
        let eligible = match (candidate.result, candidate.notification_sent) {
            (None, _) => Err(SkipReason::NoResult),
            (Some(_), true) => Err(SkipReason::AlreadyNotified),
            (Some(outcome), false) => candidate
                .validate()
                .map(|()| outcome)
                .map_err(|_| SkipReason::InvalidRecipient),
        };

        match eligible {
            Ok(outcome) => payloads.push(NotificationPayload {
                recipient_address: candidate.recipient_address,
                recipient_name: candidate.recipient_name,
                outcome,
                interview_id: candidate.interview_id,
                application_id: candidate.application_id,
            }),
            Err(reason) => skipped.push(SkippedCandidate {
                interview_id: candidate.interview_id,
                reason,
            }),
        }
    }

    (payloads, skipped)
}
