//! Hosted data store client.
//!
//! The store exposes a PostgREST-style table API under `/rest/v1` and a
//! token endpoint under `/auth/v1`. Every request carries the API key both
//! as an `apikey` header and as a bearer token.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::payload::{AuthSession, ContactPayload, SampleFilter};
use crate::retry::{self, RetryPolicy};
use crate::GatewayError;

/// Table holding sample listings.
const SAMPLES_TABLE: &str = "samples";

/// Table receiving contact form submissions.
const CONTACT_TABLE: &str = "contact_submissions";

/// Remote persistence for samples, contact submissions, and sessions.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Returns raw sample rows matching `filter`.
    async fn fetch_samples(&self, filter: &SampleFilter) -> Result<Vec<Value>, GatewayError>;

    /// Stores a contact form submission.
    async fn insert_contact(&self, payload: &ContactPayload) -> Result<(), GatewayError>;

    /// Exchanges an authorization code (and PKCE verifier, if any) for a
    /// session.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<AuthSession, GatewayError>;
}

/// [`SampleStore`] backed by the store's REST API.
pub struct RestSampleStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    read_policy: RetryPolicy,
}

impl RestSampleStore {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        read_policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            read_policy,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Query parameters for a filtered sample read.
fn sample_query(filter: &SampleFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if filter.public_only {
        params.push(("status", "eq.public".to_string()));
    }
    if let Some(category) = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        params.push(("category", format!("ilike.*{category}*")));
    }
    params
}

#[async_trait]
impl SampleStore for RestSampleStore {
    async fn fetch_samples(&self, filter: &SampleFilter) -> Result<Vec<Value>, GatewayError> {
        let url = self.table_url(SAMPLES_TABLE);
        let params = sample_query(filter);

        log::debug!("Fetching samples with {params:?}");

        let response = retry::send(self.read_policy, || {
            self.authorized(self.client.get(&url))
                .header("Accept", "application/json")
                .query(&params)
        })
        .await?;

        let rows: Vec<Value> = retry::read_json(response).await?;
        log::info!("Fetched {} sample row(s)", rows.len());
        Ok(rows)
    }

    async fn insert_contact(&self, payload: &ContactPayload) -> Result<(), GatewayError> {
        let url = self.table_url(CONTACT_TABLE);
        let body = json!([{
            "name": payload.name,
            "email": payload.email,
            "subject": payload.subject,
            "message": payload.message,
        }]);

        retry::send(RetryPolicy::SINGLE_ATTEMPT, || {
            self.authorized(self.client.post(&url))
                .header("Prefer", "return=minimal")
                .json(&body)
        })
        .await?;

        log::info!("Stored contact submission from {}", payload.email);
        Ok(())
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<AuthSession, GatewayError> {
        let url = format!("{}/auth/v1/token", self.base_url);
        let body = json!({
            "auth_code": code,
            "code_verifier": verifier,
        });

        let response = retry::send(RetryPolicy::SINGLE_ATTEMPT, || {
            self.authorized(self.client.post(&url))
                .query(&[("grant_type", "pkce")])
                .json(&body)
        })
        .await?;

        let session: AuthSession = retry::read_json(response).await?;
        log::info!(
            "Exchanged auth code for user {}",
            session.user.as_ref().map_or("<unknown>", |u| u.id.as_str())
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store(server: &MockServer) -> RestSampleStore {
        RestSampleStore::new(
            reqwest::Client::new(),
            format!("{}/", server.uri()),
            "anon-key",
            RetryPolicy::new(1, Duration::from_millis(1)),
        )
    }

    #[test]
    fn builds_filter_query() {
        let params = sample_query(&SampleFilter {
            public_only: true,
            category: Some(" soil ".to_string()),
        });
        assert!(params.contains(&("status", "eq.public".to_string())));
        assert!(params.contains(&("category", "ilike.*soil*".to_string())));

        let params = sample_query(&SampleFilter::default());
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn fetches_public_samples_with_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/samples"))
            .and(query_param("status", "eq.public"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "s1", "name": "Soil core"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server)
            .fetch_samples(&SampleFilter::public())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "s1");
    }

    #[tokio::test]
    async fn retries_sample_reads_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/samples"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/samples"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server)
            .fetch_samples(&SampleFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn inserts_contact_once_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/contact_submissions"))
            .and(header("Prefer", "return=minimal"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"message": "store offline"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let payload = ContactPayload {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "Hi".to_string(),
        };
        let err = store(&server).insert_contact(&payload).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream { status: 503, ref message } if message == "store offline"
        ));
    }

    #[tokio::test]
    async fn exchanges_code_with_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(body_json(json!({"auth_code": "abc", "code_verifier": "ver"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tok",
                "refresh_token": "ref",
                "expires_in": 3600,
                "user": {"id": "u1", "email": "ada@example.com"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = store(&server).exchange_code("abc", Some("ver")).await.unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.expires_in, Some(3600));
        assert_eq!(session.user.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn rejected_code_reports_upstream_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Auth code expired"
            })))
            .mount(&server)
            .await;

        let err = store(&server).exchange_code("old", None).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream { status: 400, ref message } if message == "Auth code expired"
        ));
    }
}
