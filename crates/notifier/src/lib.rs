//! Notification delivery for HireFlow.
//!
//! - `queue`: timer-driven dispatch queue with bounded retries
//! - `task`: task model and state machine
//! - `transport`: mail transport trait plus the log (dry-run) transport
//! - `resend`: Resend HTTP API transport
//! - `template`: interview-result email rendering (Handlebars)

pub mod queue;
pub mod resend;
pub mod task;
pub mod template;
pub mod transport;

pub use queue::{NotificationQueue, QueueConfig, QueueStatus, TickOutcome, TickReport};
pub use task::{DeliveryError, DeliveryErrorKind, NotificationTask, TaskId, TaskState};
pub use template::TemplateEngine;
pub use transport::{LogMailer, MailTransport, Mailer, OutgoingEmail, TransportError};
