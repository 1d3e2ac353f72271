//! HireFlow API server.
//!
//! Endpoints:
//! - GET    /health: liveness plus queue worker state
//! - POST   /api/notifications: enqueue one interview-result email
//! - POST   /api/notifications/batch: enqueue results for many interviews
//! - GET    /api/notifications/queue/status: per-state task counts
//! - GET    /api/notifications/queue/tasks: task snapshot
//! - POST   /api/notifications/queue/retry: requeue failed tasks
//! - DELETE /api/notifications/queue: drop every task

pub mod middleware;
pub mod routes;
pub mod state;
