//! Sign-in redirect handling.
//!
//! The auth provider redirects back to `/auth/callback` with either a
//! one-time `code` or an `error`. A code is exchanged for a session whose
//! access token is stored in an HttpOnly cookie.

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use sample_exchange_gateway::GatewayError;
use sample_exchange_server_models::AuthCallbackParams;

use crate::AppState;

/// Cookie holding the PKCE verifier set when sign-in started.
pub const VERIFIER_COOKIE: &str = "sb-code-verifier";

/// Cookie receiving the session's access token.
pub const ACCESS_COOKIE: &str = "sb-access-token";

/// Landing page after sign-in.
const SUCCESS_PATH: &str = "/samples";

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// `/login?error=<reason>` with the reason form-encoded.
fn login_location(reason: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("error", reason)
        .finish();
    format!("/login?{query}")
}

fn failure_reason(error: GatewayError) -> String {
    match error {
        GatewayError::Validation { message } | GatewayError::Upstream { message, .. } => message,
        _ => "Authentication failed".to_string(),
    }
}

/// `GET /auth/callback`
pub async fn callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<AuthCallbackParams>,
) -> HttpResponse {
    if let Some(error) = params.error.as_deref() {
        let reason = params.error_description.as_deref().unwrap_or(error);
        log::warn!("Sign-in failed at provider: {reason}");
        return redirect(&login_location(reason));
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.trim().is_empty()) else {
        return redirect(SUCCESS_PATH);
    };

    let verifier = req.cookie(VERIFIER_COOKIE).map(|c| c.value().to_string());

    match state.gateway.exchange_code(code, verifier.as_deref()).await {
        Ok(session) => {
            let mut access = Cookie::build(ACCESS_COOKIE, session.access_token)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .finish();
            if let Some(secs) = session.expires_in {
                access.set_max_age(time::Duration::seconds(
                    i64::try_from(secs).unwrap_or(i64::MAX),
                ));
            }

            let mut spent_verifier = Cookie::build(VERIFIER_COOKIE, "").path("/").finish();
            spent_verifier.make_removal();

            HttpResponse::SeeOther()
                .insert_header((header::LOCATION, SUCCESS_PATH))
                .cookie(access)
                .cookie(spent_verifier)
                .finish()
        }
        Err(e) => redirect(&login_location(&failure_reason(e))),
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::{App, test};

    use super::*;
    use crate::testing::{FakeStore, state};

    fn location(resp: &actix_web::dev::ServiceResponse) -> String {
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[actix_web::test]
    async fn exchanges_code_and_sets_cookie() {
        let store = Arc::new(FakeStore::default());
        let app = test::init_service(
            App::new()
                .app_data(state(store.clone(), Arc::default()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth/callback?code=abc")
            .cookie(Cookie::new(VERIFIER_COOKIE, "ver"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), "/samples");

        let cookies: Vec<Cookie<'_>> = resp.response().cookies().collect();
        let access = cookies.iter().find(|c| c.name() == ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "token-abc");
        assert_eq!(access.http_only(), Some(true));

        assert_eq!(
            *store.exchanges.lock().unwrap(),
            vec![("abc".to_string(), Some("ver".to_string()))]
        );
    }

    #[actix_web::test]
    async fn missing_code_goes_to_samples() {
        let store = Arc::new(FakeStore::default());
        let app = test::init_service(
            App::new()
                .app_data(state(store.clone(), Arc::default()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/auth/callback").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), "/samples");
        assert!(store.exchanges.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn provider_error_goes_to_login() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::default(), Arc::default()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth/callback?error=access_denied")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/login?error=access_denied");
    }

    #[actix_web::test]
    async fn failed_exchange_goes_to_login_with_reason() {
        let store = Arc::new(FakeStore {
            fail: true,
            ..FakeStore::default()
        });
        let app = test::init_service(
            App::new()
                .app_data(state(store, Arc::default()))
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/auth/callback?code=old")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 303);
        assert_eq!(location(&resp), "/login?error=Auth+code+expired");
    }
}
