use crate::app_config::{AppConfig, Environment};
use crate::rules::ValidationProfile;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let api_base_url = require("AGRILINK_API_BASE_URL")?
        .trim_end_matches('/')
        .to_string();
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "AGRILINK_API_BASE_URL".to_string(),
            reason: format!("\"{api_base_url}\" must start with http:// or https://"),
        });
    }
    let api_token = lookup("AGRILINK_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("AGRILINK_ENV", "development"))?;
    let log_level = or_default("AGRILINK_LOG_LEVEL", env.default_log_level());

    let request_timeout_secs = parse_u64("AGRILINK_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("AGRILINK_USER_AGENT", "agrilink/0.1 (listings-client)");

    let api_log_capacity = parse_usize("AGRILINK_API_LOG_CAPACITY", "50")?;
    if api_log_capacity == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "AGRILINK_API_LOG_CAPACITY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let validation_profile = match lookup("AGRILINK_VALIDATION_PROFILE") {
        Ok(raw) => parse_validation_profile(&raw)?,
        Err(_) => env.default_validation_profile(),
    };

    Ok(AppConfig {
        api_base_url,
        api_token,
        env,
        log_level,
        request_timeout_secs,
        user_agent,
        api_log_capacity,
        validation_profile,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AGRILINK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_validation_profile(s: &str) -> Result<ValidationProfile, ConfigError> {
    match s {
        "standard" => Ok(ValidationProfile::Standard),
        "strict" => Ok(ValidationProfile::Strict),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AGRILINK_VALIDATION_PROFILE".to_string(),
            reason: format!("unknown profile \"{other}\"; expected standard or strict"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
