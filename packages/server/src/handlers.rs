//! HTTP handler functions for the sample exchange API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use sample_exchange_gateway::{Appointment, ContactPayload, SampleFilter};
use sample_exchange_sample::{known_categories, normalize_at, resolve_color};
use sample_exchange_sample_models::{Bounds, RawSampleRecord};
use sample_exchange_server_models::{
    ApiCategory, ApiContactResponse, ApiError, ApiHealth, ApiImportPreview,
    ApiNotificationResponse, ApiSample, ContactRequest, ImportPreviewParams, NotificationRequest,
    SampleQueryParams,
};
use sample_exchange_tabular::{Delimiter, TabularFormat};
use sample_exchange_viewport::retain_in_bounds;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
///
/// Returns the known category legend in table order.
pub async fn categories() -> HttpResponse {
    let legend: Vec<ApiCategory> = known_categories()
        .iter()
        .map(|c| ApiCategory {
            name: c.name.clone(),
            color: c.color.clone(),
        })
        .collect();

    HttpResponse::Ok().json(legend)
}

/// `GET /api/samples`
///
/// Fetches samples through the gateway, optionally restricted to a
/// bounding box, and annotates each with its category color.
pub async fn samples(
    state: web::Data<AppState>,
    params: web::Query<SampleQueryParams>,
) -> HttpResponse {
    let bounds = match params.bbox.as_deref().map(str::parse::<Bounds>).transpose() {
        Ok(bounds) => bounds,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    let filter = SampleFilter {
        public_only: params.public.unwrap_or(false),
        category: params.category.clone(),
    };

    match state.gateway.fetch_samples(&filter).await {
        Ok(records) => {
            let records = match bounds {
                Some(bounds) => retain_in_bounds(&bounds, records),
                None => records,
            };
            let api_samples: Vec<ApiSample> = records
                .into_iter()
                .map(|record| ApiSample {
                    color: resolve_color(record.category.as_deref()),
                    record,
                })
                .collect();
            HttpResponse::Ok().json(api_samples)
        }
        Err(e) => {
            log::error!("Failed to fetch samples: {e}");
            HttpResponse::BadGateway().json(ApiError::new("Failed to fetch samples"))
        }
    }
}

/// `POST /api/import/preview`
///
/// Parses an uploaded delimited-text body and shows the records it would
/// import.
pub async fn import_preview(params: web::Query<ImportPreviewParams>, body: String) -> HttpResponse {
    let delimiter = match params.delimiter.as_deref().map(str::parse::<Delimiter>).transpose() {
        Ok(delimiter) => delimiter.unwrap_or_default(),
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };
    let format = if params.quoted.unwrap_or(false) {
        TabularFormat::Quoted
    } else {
        TabularFormat::Simple
    };

    match sample_exchange_tabular::parse(&body, delimiter, format) {
        Ok(data) => {
            let now = Utc::now();
            let samples = data
                .rows
                .iter()
                .cloned()
                .map(|row| normalize_at(RawSampleRecord::from(row), now))
                .collect();
            HttpResponse::Ok().json(ApiImportPreview {
                column_names: data.column_names,
                rows: data.rows,
                samples,
            })
        }
        Err(e) => {
            log::warn!("Rejected upload: {e}");
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
    }
}

/// `POST /api/contact`
pub async fn contact(
    state: web::Data<AppState>,
    body: web::Json<ContactRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let subject = request.subject_or_topic();
    let payload = match ContactPayload::new(request.name, request.email, subject, request.message) {
        Ok(payload) => payload,
        Err(e) => return HttpResponse::BadRequest().json(ApiError::new(e.to_string())),
    };

    match state.gateway.submit_contact(&payload).await {
        Ok(()) => HttpResponse::Ok().json(ApiContactResponse {
            success: true,
            message: "Thank you for your message. We'll get back to you soon.".to_string(),
        }),
        Err(e) => {
            log::error!("Failed to submit contact form: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new("Failed to submit contact form"))
        }
    }
}

fn notification_failure(error: impl Into<String>) -> ApiNotificationResponse {
    ApiNotificationResponse {
        success: false,
        id: None,
        error: Some(error.into()),
    }
}

/// `POST /api/send-demo-notification`
pub async fn send_demo_notification(
    state: web::Data<AppState>,
    body: web::Json<NotificationRequest>,
) -> HttpResponse {
    let Some(request) = body.into_inner().appointment else {
        return HttpResponse::BadRequest().json(notification_failure("Missing appointment"));
    };

    let appointment = match Appointment::new(
        request.id,
        request.name,
        request.email,
        request.start_time,
        request.end_time,
    ) {
        Ok(appointment) => appointment,
        Err(e) => return HttpResponse::BadRequest().json(notification_failure(e.to_string())),
    };

    match state.gateway.send_notification(&appointment).await {
        Ok(id) => HttpResponse::Ok().json(ApiNotificationResponse {
            success: true,
            id: Some(id),
            error: None,
        }),
        Err(e) => {
            log::error!("Failed to send notification: {e}");
            HttpResponse::InternalServerError()
                .json(notification_failure("Failed to send notification"))
        }
    }
}
