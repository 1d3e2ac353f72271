//! Notification task model and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hireflow_common::types::NotificationPayload;

use crate::transport::TransportError;

/// Identifier assigned to a task at enqueue time.
pub type TaskId = Uuid;

/// Lifecycle state of a notification task.
///
/// ```text
/// Pending --tick--> InFlight --ok--> Completed (removed)
///                   InFlight --err, attempts < max--> Pending
///                   InFlight --err, attempts == max--> Failed
/// Failed --retry_failed--> Pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InFlight,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::InFlight => write!(f, "in_flight"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Classification of a delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryErrorKind {
    /// Network or protocol failure talking to the mail provider
    Transport,
    /// The provider answered but refused the message
    Rejected,
    /// The send did not finish within the configured timeout
    Timeout,
    /// The transport is misconfigured (missing credentials, bad sender)
    Configuration,
}

/// Last failure recorded on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    /// Human-readable description shown to administrators
    pub message: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&TransportError> for DeliveryError {
    fn from(err: &TransportError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// One queued email to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTask {
    pub id: TaskId,
    pub payload: NotificationPayload,
    pub state: TaskState,
    /// Delivery attempts made so far
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<DeliveryError>,
}

impl NotificationTask {
    /// Build a fresh `Pending` task for `payload`.
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            state: TaskState::Pending,
            attempts: 0,
            created_at: Utc::now(),
            completed_at: None,
            last_error: None,
        }
    }

    /// Claim the task for a delivery attempt.
    pub(crate) fn begin_attempt(&mut self) {
        self.state = TaskState::InFlight;
        self.attempts += 1;
    }

    pub(crate) fn mark_delivered(&mut self) {
        self.state = TaskState::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failed attempt. Returns the state the task ends up in.
    pub(crate) fn mark_attempt_failed(
        &mut self,
        error: DeliveryError,
        max_attempts: u32,
    ) -> TaskState {
        self.last_error = Some(error);
        self.state = if self.attempts >= max_attempts {
            TaskState::Failed
        } else {
            TaskState::Pending
        };
        self.state
    }

    /// Put a failed task back in line with a fresh attempt budget.
    pub(crate) fn reset_for_retry(&mut self) {
        self.state = TaskState::Pending;
        self.attempts = 0;
        self.last_error = None;
    }
}
