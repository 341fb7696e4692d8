#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Gateway to the hosted data store and the email service.
//!
//! [`Gateway`] is the only place the application talks to remote services.
//! It is built once at startup from [`GatewayConfig`] and shared by
//! reference. Expected failures (bad input, rejected requests, network
//! trouble) come back as [`GatewayError`] values; nothing here panics.

pub mod config;
pub mod email;
pub mod payload;
pub mod retry;
pub mod store;

use std::sync::Arc;

use sample_exchange_sample::normalize_values;
use sample_exchange_sample_models::{SampleRecord, SampleStatus};

pub use config::{ConfigError, GatewayConfig};
pub use email::{EmailMessage, EmailSender, ResendEmailSender};
pub use payload::{Appointment, AuthSession, AuthUser, ContactPayload, SampleFilter};
pub use retry::RetryPolicy;
pub use store::{RestSampleStore, SampleStore};

/// Errors returned by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The caller's input was rejected before any request was made.
    #[error("{message}")]
    Validation { message: String },

    /// The remote service answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The request could not be completed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response had an unexpected body.
    #[error("Unexpected response: {message}")]
    Decode { message: String },

    /// Startup configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    pub(crate) fn validation(message: &str) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    /// Whether the error came from the caller's input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Facade over the sample store and email sender.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn SampleStore>,
    email: Arc<dyn EmailSender>,
    email_from: String,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("email_from", &self.email_from)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Assembles a gateway from its parts.
    #[must_use]
    pub fn new(
        store: Arc<dyn SampleStore>,
        email: Arc<dyn EmailSender>,
        email_from: impl Into<String>,
    ) -> Self {
        Self {
            store,
            email,
            email_from: email_from.into(),
        }
    }

    /// Builds the REST store and email clients described by `config`,
    /// sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sample-exchange/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let store = RestSampleStore::new(
            client.clone(),
            config.store_url.clone(),
            config.store_key.clone(),
            config.fetch_retry,
        );
        let email = ResendEmailSender::new(
            client,
            config.email_url.clone(),
            config.email_key.clone(),
        );

        log::info!(
            "Gateway configured for store {} (fetch retries: {})",
            config.store_url,
            config.fetch_retry.max_retries
        );

        Ok(Self::new(
            Arc::new(store),
            Arc::new(email),
            config.email_from.clone(),
        ))
    }

    /// Builds a gateway from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for missing or invalid variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_config(&GatewayConfig::from_env()?)
    }

    /// Fetches and normalizes samples matching `filter`.
    ///
    /// With `public_only`, records explicitly marked private or sold are
    /// dropped even if the store returned them.
    ///
    /// # Errors
    ///
    /// Returns the store's [`GatewayError`] when the read fails.
    pub async fn fetch_samples(
        &self,
        filter: &SampleFilter,
    ) -> Result<Vec<SampleRecord>, GatewayError> {
        let rows = self.store.fetch_samples(filter).await.map_err(|e| {
            log::error!("Sample fetch failed: {e}");
            e
        })?;

        let mut samples = normalize_values(rows);
        if filter.public_only {
            samples.retain(|s| s.status.is_none_or(|status| status == SampleStatus::Public));
        }
        Ok(samples)
    }

    /// Stores a contact form submission.
    ///
    /// # Errors
    ///
    /// Returns the store's [`GatewayError`] when the insert fails.
    pub async fn submit_contact(&self, payload: &ContactPayload) -> Result<(), GatewayError> {
        self.store.insert_contact(payload).await.map_err(|e| {
            log::error!("Contact submission from {} failed: {e}", payload.email);
            e
        })
    }

    /// Emails an appointment confirmation and returns the message id.
    ///
    /// # Errors
    ///
    /// Returns the email service's [`GatewayError`] when sending fails.
    pub async fn send_notification(
        &self,
        appointment: &Appointment,
    ) -> Result<String, GatewayError> {
        let message = email::appointment_email(&self.email_from, appointment);
        self.email.send(&message).await.map_err(|e| {
            log::error!(
                "Notification for appointment {} failed: {e}",
                appointment.id
            );
            e
        })
    }

    /// Exchanges an authorization code for a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] for a blank code, or the store's
    /// error when the exchange is rejected.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<AuthSession, GatewayError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GatewayError::validation("Missing authorization code"));
        }
        self.store.exchange_code(code, verifier).await.map_err(|e| {
            log::warn!("Auth code exchange failed: {e}");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        rows: Vec<Value>,
        contacts: Mutex<Vec<ContactPayload>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl SampleStore for FakeStore {
        async fn fetch_samples(&self, _filter: &SampleFilter) -> Result<Vec<Value>, GatewayError> {
            match self.fail_with {
                Some(status) => Err(GatewayError::Upstream {
                    status,
                    message: "down".to_string(),
                }),
                None => Ok(self.rows.clone()),
            }
        }

        async fn insert_contact(&self, payload: &ContactPayload) -> Result<(), GatewayError> {
            self.contacts.lock().unwrap().push(payload.clone());
            Ok(())
        }

        async fn exchange_code(
            &self,
            code: &str,
            _verifier: Option<&str>,
        ) -> Result<AuthSession, GatewayError> {
            Ok(AuthSession {
                access_token: format!("token-for-{code}"),
                refresh_token: None,
                expires_in: None,
                user: None,
            })
        }
    }

    #[derive(Default)]
    struct FakeEmail {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for FakeEmail {
        async fn send(&self, message: &EmailMessage) -> Result<String, GatewayError> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            Ok(format!("msg-{}", sent.len()))
        }
    }

    fn gateway(store: FakeStore) -> (Gateway, Arc<FakeEmail>) {
        let email = Arc::new(FakeEmail::default());
        let gateway = Gateway::new(Arc::new(store), email.clone(), "from@example.com");
        (gateway, email)
    }

    #[tokio::test]
    async fn fetch_normalizes_rows() {
        let (gateway, _) = gateway(FakeStore {
            rows: vec![json!({
                "id": "s1",
                "name": "Soil core",
                "price": "12.5",
                "coordinates": {"latitude": 10.0, "longitude": 20.0}
            })],
            ..FakeStore::default()
        });

        let samples = gateway.fetch_samples(&SampleFilter::default()).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].id, "s1");
        assert!((samples[0].price - 12.5).abs() < f64::EPSILON);
        assert_eq!(samples[0].coordinates.unwrap().longitude, 20.0);
    }

    #[tokio::test]
    async fn public_filter_drops_private_rows() {
        let (gateway, _) = gateway(FakeStore {
            rows: vec![
                json!({"id": "a", "name": "A", "status": "public"}),
                json!({"id": "b", "name": "B", "status": "private"}),
                json!({"id": "c", "name": "C"}),
            ],
            ..FakeStore::default()
        });

        let ids: Vec<String> = gateway
            .fetch_samples(&SampleFilter::public())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn fetch_failure_is_returned_not_raised() {
        let (gateway, _) = gateway(FakeStore {
            fail_with: Some(503),
            ..FakeStore::default()
        });
        let err = gateway
            .fetch_samples(&SampleFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn sends_notification_from_configured_sender() {
        let (gateway, email) = gateway(FakeStore::default());
        let appointment = Appointment {
            id: "apt-1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            start_time: "2024-06-01T10:00:00Z".to_string(),
            end_time: "2024-06-01T10:30:00Z".to_string(),
        };

        let id = gateway.send_notification(&appointment).await.unwrap();
        assert_eq!(id, "msg-1");

        let sent = email.sent.lock().unwrap();
        assert_eq!(sent[0].from, "from@example.com");
        assert_eq!(sent[0].to, vec!["ada@example.com"]);
    }

    #[tokio::test]
    async fn blank_code_is_rejected_locally() {
        let (gateway, _) = gateway(FakeStore::default());
        assert!(gateway.exchange_code("  ", None).await.unwrap_err().is_validation());
        assert_eq!(
            gateway.exchange_code("abc", None).await.unwrap().access_token,
            "token-for-abc"
        );
    }
}
