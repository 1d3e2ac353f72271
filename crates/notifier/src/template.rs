//! Interview-result email templates rendered with Handlebars.
//!
//! Each `Outcome` has a `<outcome>_subject` and `<outcome>_html` template.
//! Handlebars HTML-escapes `{{...}}` expressions, so applicant-supplied names
//! cannot inject markup into the body.

use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;
use uuid::Uuid;

use hireflow_common::types::{NotificationPayload, Outcome};

use crate::transport::OutgoingEmail;

const PASSED_SUBJECT: &str = "Congratulations! You passed the interview";

const PASSED_HTML: &str = r#"<html><body>
<p>Dear {{recipient_name}},</p>
<p>We are pleased to let you know that you passed the interview. Our team will contact you shortly with the next steps.</p>
<p style="color:#888;font-size:12px">Application reference: {{application_id}}</p>
</body></html>"#;

const FAILED_SUBJECT: &str = "Update on your interview";

const FAILED_HTML: &str = r#"<html><body>
<p>Dear {{recipient_name}},</p>
<p>Thank you for the time you invested in the interview. After careful consideration we will not be moving forward with your application at this time.</p>
<p style="color:#888;font-size:12px">Application reference: {{application_id}}</p>
</body></html>"#;

/// Values exposed to the templates.
#[derive(Debug, Serialize)]
struct TemplateData<'a> {
    recipient_name: &'a str,
    application_id: Uuid,
}

/// Handlebars registry holding the interview-result templates.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Build the registry with the passed/failed templates.
    pub fn new() -> anyhow::Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        for (outcome, subject, html) in [
            (Outcome::Passed, PASSED_SUBJECT, PASSED_HTML),
            (Outcome::Failed, FAILED_SUBJECT, FAILED_HTML),
        ] {
            handlebars
                .register_template_string(&format!("{}_subject", outcome), subject)
                .with_context(|| format!("Failed to register {} subject template", outcome))?;
            handlebars
                .register_template_string(&format!("{}_html", outcome), html)
                .with_context(|| format!("Failed to register {} HTML template", outcome))?;
        }

        Ok(Self { handlebars })
    }

    /// Render the email announcing `payload.outcome` to the applicant.
    pub fn render(&self, payload: &NotificationPayload) -> anyhow::Result<OutgoingEmail> {
        let data = TemplateData {
            recipient_name: &payload.recipient_name,
            application_id: payload.application_id,
        };

        let subject = self
            .handlebars
            .render(&format!("{}_subject", payload.outcome), &data)
            .context("Failed to render subject")?;
        let html = self
            .handlebars
            .render(&format!("{}_html", payload.outcome), &data)
            .context("Failed to render HTML body")?;

        Ok(OutgoingEmail {
            to: payload.recipient_address.clone(),
            subject,
            html,
        })
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_payload(name: &str, outcome: Outcome) -> NotificationPayload {
        NotificationPayload {
            recipient_address: "ada@example.com".to_string(),
            recipient_name: name.to_string(),
            outcome,
            interview_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_render_passed() {
        let engine = TemplateEngine::new().unwrap();
        let payload = make_payload("Ada", Outcome::Passed);
        let email = engine.render(&payload).unwrap();
        assert_eq!(email.to, "ada@example.com");
        assert!(email.subject.contains("passed"));
        assert!(email.html.contains("Dear Ada"));
        assert!(email.html.contains(&payload.application_id.to_string()));
    }

    #[test]
    fn test_render_failed() {
        let engine = TemplateEngine::new().unwrap();
        let email = engine.render(&make_payload("Ada", Outcome::Failed)).unwrap();
        assert_eq!(email.subject, "Update on your interview");
        assert!(email.html.contains("not be moving forward"));
    }

    #[test]
    fn test_recipient_name_is_escaped() {
        let engine = TemplateEngine::new().unwrap();
        let email = engine
            .render(&make_payload("<script>alert(1)</script> & co", Outcome::Passed))
            .unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("&amp; co"));
    }
}
