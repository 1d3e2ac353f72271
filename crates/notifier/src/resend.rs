//! Resend HTTP API transport.
//!
//! Submits one email per request to `POST {api_url}` with a bearer API key.
//! Any non-2xx answer is reported as a rejection carrying the response body.

use serde::Serialize;

use crate::transport::{MailTransport, OutgoingEmail, TransportError};

/// Mail transport backed by the Resend email API.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    api_url: String,
}

/// JSON body accepted by the Resend `emails` endpoint.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("from", &self.from)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ResendMailer {
    pub fn new(api_key: String, from: String, api_url: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("Resend API key must not be empty");
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("hireflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            from,
            api_url,
        })
    }

    fn request_body<'a>(&'a self, email: &'a OutgoingEmail) -> SendEmailRequest<'a> {
        SendEmailRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        }
    }
}

impl MailTransport for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %email.to, status = status.as_u16(), "Email accepted by Resend");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let mailer = ResendMailer::new(
            "re_test".to_string(),
            "HireFlow <jobs@example.com>".to_string(),
            "https://api.resend.com/emails".to_string(),
        )
        .unwrap();
        let email = OutgoingEmail {
            to: "ada@example.com".to_string(),
            subject: "Interview result".to_string(),
            html: "<p>Hello</p>".to_string(),
        };

        let json = serde_json::to_value(mailer.request_body(&email)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "from": "HireFlow <jobs@example.com>",
                "to": ["ada@example.com"],
                "subject": "Interview result",
                "html": "<p>Hello</p>",
            })
        );
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = ResendMailer::new(
            "  ".to_string(),
            "jobs@example.com".to_string(),
            "https://api.resend.com/emails".to_string(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let mailer = ResendMailer::new(
            "re_test".to_string(),
            "jobs@example.com".to_string(),
            // Port 9 (discard) on localhost refuses connections on test machines.
            "http://127.0.0.1:9/emails".to_string(),
        )
        .unwrap();
        let email = OutgoingEmail {
            to: "ada@example.com".to_string(),
            subject: "s".to_string(),
            html: "b".to_string(),
        };

        let err = mailer.send(&email).await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }
}
