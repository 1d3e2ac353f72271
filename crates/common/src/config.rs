use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port the API server listens on (default: 3000)
    pub api_port: u16,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Resend API key for email delivery. When unset, emails are only logged.
    pub resend_api_key: Option<String>,

    /// Resend endpoint used to submit emails
    pub resend_api_url: String,

    /// Email sender address
    pub email_from: Option<String>,

    /// Interval between notification queue ticks in milliseconds (default: 2000)
    pub queue_tick_interval_ms: u64,

    /// Maximum number of tasks attempted per tick (default: 10)
    pub queue_batch_size: usize,

    /// Delivery attempts before a task is marked failed (default: 3)
    pub queue_max_attempts: u32,

    /// Pause between two sends within the same tick in milliseconds (default: 500)
    pub queue_send_delay_ms: u64,

    /// Upper bound on a single send in milliseconds (default: 10000)
    pub queue_send_timeout_ms: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            api_port: parse_var("API_PORT", "3000")?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: parse_var("JWT_EXPIRY_HOURS", "24")?,
            resend_api_key: std::env::var("RESEND_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            resend_api_url: std::env::var("RESEND_API_URL")
                .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
            email_from: std::env::var("EMAIL_FROM").ok(),
            queue_tick_interval_ms: parse_var("QUEUE_TICK_INTERVAL_MS", "2000")?,
            queue_batch_size: parse_var("QUEUE_BATCH_SIZE", "10")?,
            queue_max_attempts: parse_var("QUEUE_MAX_ATTEMPTS", "3")?,
            queue_send_delay_ms: parse_var("QUEUE_SEND_DELAY_MS", "500")?,
            queue_send_timeout_ms: parse_var("QUEUE_SEND_TIMEOUT_MS", "10000")?,
        })
    }
}

/// Read `name` from the environment, falling back to `default`, and parse it.
fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> anyhow::Result<T> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse().map_err(|_| {
        anyhow::anyhow!(
            "{} must be a valid {}",
            name,
            std::any::type_name::<T>()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        let value: u64 = parse_var("HIREFLOW_TEST_UNSET_VARIABLE", "2000").unwrap();
        assert_eq!(value, 2000);
    }

    #[test]
    fn test_parse_var_rejects_garbage_default() {
        let result: anyhow::Result<u32> = parse_var("HIREFLOW_TEST_UNSET_VARIABLE", "three");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("HIREFLOW_TEST_UNSET_VARIABLE"));
        assert!(err.contains("u32"));
    }
}
