use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Result of an interview, as announced to the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// Role carried by an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Interviewer,
    Applicant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Interviewer => write!(f, "interviewer"),
            Role::Applicant => write!(f, "applicant"),
        }
    }
}

/// Delivery data for a single interview-result email.
///
/// Filled in by the caller at enqueue time; the notification queue never looks
/// these records up itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NotificationPayload {
    /// Email address of the applicant
    #[validate(email, length(max = 255))]
    pub recipient_address: String,
    /// Display name used in the greeting
    #[validate(length(min = 1, max = 100))]
    pub recipient_name: String,
    /// Interview result being announced
    pub outcome: Outcome,
    pub interview_id: Uuid,
    pub application_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Outcome::Passed).unwrap(), "\"passed\"");
        let parsed: Outcome = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, Outcome::Failed);
    }

    #[test]
    fn test_payload_from_json() {
        let interview_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let payload: NotificationPayload = serde_json::from_value(serde_json::json!({
            "recipient_address": "ada@example.com",
            "recipient_name": "Ada",
            "outcome": "passed",
            "interview_id": interview_id,
            "application_id": application_id,
        }))
        .unwrap();
        assert_eq!(payload.outcome, Outcome::Passed);
        assert_eq!(payload.interview_id, interview_id);
        assert_eq!(payload.application_id, application_id);
    }

    fn payload_to(address: &str) -> NotificationPayload {
        NotificationPayload {
            recipient_address: address.to_string(),
            recipient_name: "Ada".to_string(),
            outcome: Outcome::Passed,
            interview_id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_payload_validation() {
        assert!(payload_to("ada@example.com").validate().is_ok());
        assert!(payload_to("ada.lovelace+jobs@mail.example.org").validate().is_ok());

        for address in ["a@.com", "a@b.", "a@..", "a@b..c", "\"@x.y", "nobody", "@example.com"] {
            let err = payload_to(address).validate().unwrap_err();
            assert!(
                err.field_errors().contains_key("recipient_address"),
                "{} should be rejected",
                address
            );
        }

        let mut unnamed = payload_to("ada@example.com");
        unnamed.recipient_name = String::new();
        let err = unnamed.validate().unwrap_err();
        assert!(err.field_errors().contains_key("recipient_name"));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<Role, _> = serde_json::from_str("\"superuser\"");
        assert!(result.is_err());
    }
}
