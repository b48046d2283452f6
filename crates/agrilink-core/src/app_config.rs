use crate::rules::ValidationProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Log filter used when `AGRILINK_LOG_LEVEL` is unset.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "info",
            Environment::Test => "debug",
            Environment::Production => "warn",
        }
    }

    /// Rule table used when `AGRILINK_VALIDATION_PROFILE` is unset.
    /// Production submits go through the strict table.
    #[must_use]
    pub fn default_validation_profile(&self) -> ValidationProfile {
        match self {
            Environment::Development | Environment::Test => ValidationProfile::Standard,
            Environment::Production => ValidationProfile::Strict,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Number of entries the in-memory API log keeps before evicting the oldest.
    pub api_log_capacity: usize,
    pub validation_profile: ValidationProfile,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("api_log_capacity", &self.api_log_capacity)
            .field("validation_profile", &self.validation_profile)
            .finish()
    }
}
