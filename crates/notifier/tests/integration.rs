//! End-to-end tests for the notification queue using the public API only.
//!
//! ```bash
//! cargo test -p hireflow-notifier --test integration
//! ```

use std::time::Duration;

use uuid::Uuid;

use hireflow_common::types::{NotificationPayload, Outcome};
use hireflow_notifier::{LogMailer, NotificationQueue, QueueConfig, QueueStatus, TickOutcome};

fn config() -> QueueConfig {
    QueueConfig {
        tick_interval: Duration::from_millis(10),
        batch_size: 10,
        max_attempts: 3,
        send_delay: Duration::ZERO,
        send_timeout: Duration::from_secs(1),
    }
}

fn payload(n: usize) -> NotificationPayload {
    NotificationPayload {
        recipient_address: format!("candidate{}@example.com", n),
        recipient_name: format!("Candidate {}", n),
        outcome: if n % 2 == 0 {
            Outcome::Passed
        } else {
            Outcome::Failed
        },
        interview_id: Uuid::new_v4(),
        application_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn test_twelve_notifications_drain_in_two_ticks() {
    let queue = NotificationQueue::new(config(), LogMailer).unwrap();
    let ids = queue.enqueue_batch((0..12).map(payload).collect());
    assert_eq!(ids.len(), 12);
    assert_eq!(queue.status().pending, 12);

    let TickOutcome::Processed(first) = queue.process_tick().await else {
        panic!("first tick skipped");
    };
    assert_eq!(first.delivered, 10);
    assert_eq!(
        queue.status(),
        QueueStatus {
            total: 2,
            pending: 2,
            ..QueueStatus::default()
        }
    );

    let TickOutcome::Processed(second) = queue.process_tick().await else {
        panic!("second tick skipped");
    };
    assert_eq!(second.delivered, 2);
    assert_eq!(
        queue.status(),
        QueueStatus {
            total: 0,
            pending: 0,
            in_flight: 0,
            completed: 0,
            failed: 0,
        }
    );
}

#[tokio::test]
async fn test_send_delay_throttles_within_a_tick() {
    let queue = NotificationQueue::new(
        QueueConfig {
            send_delay: Duration::from_millis(30),
            ..config()
        },
        LogMailer,
    )
    .unwrap();
    queue.enqueue_batch((0..3).map(payload).collect());

    let started = std::time::Instant::now();
    queue.process_tick().await;

    // Two pauses between three sends.
    assert!(started.elapsed() >= Duration::from_millis(60));
    assert_eq!(queue.status().total, 0);
}

#[test]
fn test_clear_empties_queue() {
    let queue = NotificationQueue::new(config(), LogMailer).unwrap();
    queue.enqueue_batch((0..4).map(payload).collect());
    assert_eq!(queue.clear(), 4);
    assert_eq!(queue.status(), QueueStatus::default());
    assert!(queue.list_tasks(None).is_empty());
}
