#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the sample exchange.
//!
//! Serves the sample catalog (normalized and color-annotated), the category
//! legend, upload previews, the contact form, demo appointment
//! notifications, and the sign-in callback. All remote calls go through a
//! [`Gateway`] built once at startup and shared via [`AppState`].

mod auth;
mod handlers;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use sample_exchange_gateway::{ConfigError, Gateway};
use sample_exchange_server_models::ApiError;

/// Largest accepted upload for import previews.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    /// Data store and email clients.
    pub gateway: Gateway,
}

/// Where the HTTP server listens.
///
/// Reads `BIND_ADDR` (default `127.0.0.1`) and `PORT` (default 8080).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl ServerConfig {
    /// Reads the listen address from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the listen address through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("PORT") {
            None => 8080,
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT".to_string(),
                value,
            })?,
        };
        Ok(Self { bind_addr, port })
    }
}

/// Registers every route and the body extractor configuration.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .content_type_required(false)
            .error_handler(|err, _req| {
                log::debug!("Rejected request body: {err}");
                let response = HttpResponse::BadRequest().json(ApiError::new("Invalid JSON body"));
                actix_web::error::InternalError::from_response(err, response).into()
            }),
    )
    .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/samples", web::get().to(handlers::samples))
            .route("/import/preview", web::post().to(handlers::import_preview))
            .route("/contact", web::post().to(handlers::contact))
            .route(
                "/send-demo-notification",
                web::post().to(handlers::send_demo_notification),
            ),
    )
    .route("/auth/callback", web::get().to(auth::callback));
}

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    log::error!("Startup failed: {e}");
    std::io::Error::other(e.to_string())
}

/// Starts the sample exchange API server.
///
/// Reads the listen address and gateway configuration from the
/// environment, then serves until shut down. The caller is responsible for
/// installing a logger and providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid, or the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env().map_err(startup_error)?;

    log::info!("Configuring gateway...");
    let gateway = Gateway::from_env().map_err(startup_error)?;

    serve(gateway, &config).await
}

/// Serves the API with an already-built gateway.
///
/// # Errors
///
/// Returns an error if the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(gateway: Gateway, config: &ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState { gateway });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    log::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake gateway backends for handler tests.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sample_exchange_gateway::{
        AuthSession, ContactPayload, EmailMessage, EmailSender, GatewayError, SampleFilter,
        SampleStore,
    };
    use serde_json::Value;

    #[derive(Default)]
    pub struct FakeStore {
        pub rows: Vec<Value>,
        pub fail: bool,
        pub contacts: Mutex<Vec<ContactPayload>>,
        pub exchanges: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeStore {
        fn upstream() -> GatewayError {
            GatewayError::Upstream {
                status: 503,
                message: "store offline".to_string(),
            }
        }
    }

    #[async_trait]
    impl SampleStore for FakeStore {
        async fn fetch_samples(&self, _filter: &SampleFilter) -> Result<Vec<Value>, GatewayError> {
            if self.fail {
                return Err(Self::upstream());
            }
            Ok(self.rows.clone())
        }

        async fn insert_contact(&self, payload: &ContactPayload) -> Result<(), GatewayError> {
            if self.fail {
                return Err(Self::upstream());
            }
            self.contacts.lock().unwrap().push(payload.clone());
            Ok(())
        }

        async fn exchange_code(
            &self,
            code: &str,
            verifier: Option<&str>,
        ) -> Result<AuthSession, GatewayError> {
            self.exchanges
                .lock()
                .unwrap()
                .push((code.to_string(), verifier.map(str::to_string)));
            if self.fail {
                return Err(GatewayError::Upstream {
                    status: 400,
                    message: "Auth code expired".to_string(),
                });
            }
            Ok(AuthSession {
                access_token: format!("token-{code}"),
                refresh_token: None,
                expires_in: Some(3600),
                user: None,
            })
        }
    }

    #[derive(Default)]
    pub struct FakeEmail {
        pub fail: bool,
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for FakeEmail {
        async fn send(&self, message: &EmailMessage) -> Result<String, GatewayError> {
            if self.fail {
                return Err(GatewayError::Upstream {
                    status: 422,
                    message: "Invalid `to` field".to_string(),
                });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            Ok(format!("msg_{}", sent.len()))
        }
    }

    pub fn state(
        store: Arc<FakeStore>,
        email: Arc<FakeEmail>,
    ) -> actix_web::web::Data<crate::AppState> {
        actix_web::web::Data::new(crate::AppState {
            gateway: sample_exchange_gateway::Gateway::new(store, email, "test@example.com"),
        })
    }
}
