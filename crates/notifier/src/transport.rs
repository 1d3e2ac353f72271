//! Mail transports used by the notification queue.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use hireflow_common::config::AppConfig;

use crate::resend::ResendMailer;
use crate::task::DeliveryErrorKind;

/// A rendered email ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Errors a transport can report for a single send.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport misconfigured: {0}")]
    Config(String),
}

impl TransportError {
    /// Coarse classification recorded on the task.
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            TransportError::Http(_) => DeliveryErrorKind::Transport,
            TransportError::Rejected { .. } => DeliveryErrorKind::Rejected,
            TransportError::Timeout(_) => DeliveryErrorKind::Timeout,
            TransportError::Config(_) => DeliveryErrorKind::Configuration,
        }
    }
}

/// Trait that every mail transport must implement.
///
/// Any `Err` counts as a failed attempt; the queue does not distinguish
/// permanent from transient failures when deciding whether to retry.
pub trait MailTransport: Send + Sync {
    /// Deliver a single email.
    fn send(
        &self,
        email: &OutgoingEmail,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Human-readable name for this transport (e.g., "resend").
    fn name(&self) -> &'static str;
}

/// Dry-run transport that only logs what would have been sent.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl MailTransport for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.html.len(),
            "Email delivery skipped (log transport)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Transport selected from configuration at startup.
#[derive(Debug, Clone)]
pub enum Mailer {
    Resend(ResendMailer),
    Log(LogMailer),
}

impl Mailer {
    /// Pick Resend when an API key is configured, otherwise fall back to logging.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        match &config.resend_api_key {
            Some(api_key) => {
                let from = config.email_from.clone().ok_or_else(|| {
                    anyhow::anyhow!("EMAIL_FROM is required when RESEND_API_KEY is set")
                })?;
                let mailer =
                    ResendMailer::new(api_key.clone(), from, config.resend_api_url.clone())?;
                tracing::info!(url = %config.resend_api_url, "Using Resend mail transport");
                Ok(Mailer::Resend(mailer))
            }
            None => {
                tracing::warn!("RESEND_API_KEY not set; emails will only be logged");
                Ok(Mailer::Log(LogMailer))
            }
        }
    }
}

impl MailTransport for Mailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        match self {
            Mailer::Resend(mailer) => mailer.send(email).await,
            Mailer::Log(mailer) => mailer.send(email).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mailer::Resend(mailer) => mailer.name(),
            Mailer::Log(mailer) => mailer.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(resend_api_key: Option<&str>, email_from: Option<&str>) -> AppConfig {
        AppConfig {
            api_port: 3000,
            jwt_secret: "unused".to_string(),
            jwt_expiry_hours: 24,
            resend_api_key: resend_api_key.map(str::to_string),
            resend_api_url: "https://api.resend.com/emails".to_string(),
            email_from: email_from.map(str::to_string),
            queue_tick_interval_ms: 2000,
            queue_batch_size: 10,
            queue_max_attempts: 3,
            queue_send_delay_ms: 500,
            queue_send_timeout_ms: 10_000,
        }
    }

    #[test]
    fn test_mailer_without_key_logs() {
        let mailer = Mailer::from_config(&config(None, None)).unwrap();
        assert_eq!(mailer.name(), "log");
    }

    #[test]
    fn test_mailer_with_key_uses_resend() {
        let mailer =
            Mailer::from_config(&config(Some("re_123"), Some("jobs@example.com"))).unwrap();
        assert_eq!(mailer.name(), "resend");
    }

    #[test]
    fn test_mailer_with_key_requires_sender() {
        let err = Mailer::from_config(&config(Some("re_123"), None)).unwrap_err();
        assert!(err.to_string().contains("EMAIL_FROM"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(1)).kind(),
            DeliveryErrorKind::Timeout
        );
        assert_eq!(
            TransportError::Rejected {
                status: 422,
                body: "invalid to".to_string()
            }
            .kind(),
            DeliveryErrorKind::Rejected
        );
        assert_eq!(
            TransportError::Config("no key".to_string()).kind(),
            DeliveryErrorKind::Configuration
        );
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let email = OutgoingEmail {
            to: "ada@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
        };
        assert!(LogMailer.send(&email).await.is_ok());
    }
}
