//! Shared application state for the Axum API server.

use std::sync::Arc;

use hireflow_common::config::AppConfig;
use hireflow_notifier::{Mailer, NotificationQueue};

/// Notification queue as wired by the binary.
pub type SharedQueue = Arc<NotificationQueue<Mailer>>;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub queue: SharedQueue,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(queue: SharedQueue, config: AppConfig) -> Self {
        Self { queue, config }
    }
}
