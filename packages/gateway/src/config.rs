//! Environment configuration for the remote services.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `SAMPLE_STORE_URL` | Yes | Base URL of the hosted data store |
//! | `SAMPLE_STORE_KEY` | Yes | API key for the data store |
//! | `EMAIL_API_KEY` | Yes | API key for the email service |
//! | `EMAIL_API_URL` | No | Email service base URL (default `https://api.resend.com`) |
//! | `EMAIL_FROM` | No | Sender address for notifications |
//! | `GATEWAY_TIMEOUT_SECS` | No | Per-request timeout (default 30) |
//! | `GATEWAY_FETCH_RETRIES` | No | Retries for sample reads (default 2) |
//! | `GATEWAY_RETRY_BASE_MS` | No | First retry delay, doubled per retry (default 500) |

use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default email service base URL.
pub const DEFAULT_EMAIL_URL: &str = "https://api.resend.com";

/// Default sender for notification emails.
pub const DEFAULT_EMAIL_FROM: &str = "Sample Exchange <notifications@sample-exchange.dev>";

/// Errors in the startup configuration. These are not recoverable at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// An environment variable could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    Invalid {
        /// Variable name.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Endpoints, credentials, and request policy for the remote services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Data store base URL, without a trailing slash.
    pub store_url: String,
    /// Data store API key.
    pub store_key: String,
    /// Email service base URL, without a trailing slash.
    pub email_url: String,
    /// Email service API key.
    pub email_key: String,
    /// Sender for outgoing email.
    pub email_from: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for idempotent reads.
    pub fetch_retry: RetryPolicy,
}

impl GatewayConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// numeric variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// numeric variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv {
                    name: name.to_string(),
                })
        };

        let store_url = required("SAMPLE_STORE_URL")?;
        let store_key = required("SAMPLE_STORE_KEY")?;
        let email_key = required("EMAIL_API_KEY")?;

        let email_url = lookup("EMAIL_API_URL").unwrap_or_else(|| DEFAULT_EMAIL_URL.to_string());
        let email_from =
            lookup("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string());

        let timeout_secs: u64 = parse_or(&lookup, "GATEWAY_TIMEOUT_SECS", 30)?;
        let retries: u32 = parse_or(&lookup, "GATEWAY_FETCH_RETRIES", 2)?;
        let base_ms: u64 = parse_or(&lookup, "GATEWAY_RETRY_BASE_MS", 500)?;

        Ok(Self {
            store_url: store_url.trim_end_matches('/').to_string(),
            store_key,
            email_url: email_url.trim().trim_end_matches('/').to_string(),
            email_key,
            email_from,
            timeout: Duration::from_secs(timeout_secs),
            fetch_retry: RetryPolicy::new(retries, Duration::from_millis(base_ms)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("SAMPLE_STORE_URL", "https://store.example.com/"),
        ("SAMPLE_STORE_KEY", "store-key"),
        ("EMAIL_API_KEY", "email-key"),
    ];

    #[test]
    fn applies_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.store_url, "https://store.example.com");
        assert_eq!(config.email_url, DEFAULT_EMAIL_URL);
        assert_eq!(config.email_from, DEFAULT_EMAIL_FROM);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(
            config.fetch_retry,
            RetryPolicy::new(2, Duration::from_millis(500))
        );
    }

    #[test]
    fn missing_required_variable_is_an_error() {
        for skipped in ["SAMPLE_STORE_URL", "SAMPLE_STORE_KEY", "EMAIL_API_KEY"] {
            let pairs: Vec<(&str, &str)> = REQUIRED
                .iter()
                .copied()
                .filter(|(k, _)| *k != skipped)
                .collect();
            assert_eq!(
                GatewayConfig::from_lookup(lookup_from(&pairs)),
                Err(ConfigError::MissingEnv {
                    name: skipped.to_string()
                })
            );
        }
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("SAMPLE_STORE_KEY", "  ");
        assert!(matches!(
            GatewayConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::MissingEnv { .. })
        ));
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("GATEWAY_FETCH_RETRIES", "lots"));
        assert_eq!(
            GatewayConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Invalid {
                name: "GATEWAY_FETCH_RETRIES".to_string(),
                value: "lots".to_string()
            })
        );
    }
}
