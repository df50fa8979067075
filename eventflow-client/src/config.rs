use std::env;
use std::time::Duration;

/// The configuration of the client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base path of the REST API, without a trailing slash
    pub api_base: String,
    /// How long to wait between sync ticks
    pub poll_interval: Duration,
    /// How long a single collection fetch may take before it is abandoned
    pub fetch_timeout: Duration,
    /// Credentials accepted for the built-in admin account
    pub admin_email: String,
    pub admin_password: String,
}

impl ClientConfig {
    /// Builds a config from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_base: env::var("EVENTFLOW_API_URL").unwrap_or(defaults.api_base),
            admin_email: env::var("EVENTFLOW_ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: env::var("EVENTFLOW_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            ..defaults
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api".to_string(),
            // Polling simulates real-time updates without sockets
            poll_interval: Duration::from_secs(5),
            // Unless the network is very slow, this should be plenty
            fetch_timeout: Duration::from_secs(3),
            admin_email: "admin@eventflow.com".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}
