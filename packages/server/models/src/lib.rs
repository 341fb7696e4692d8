#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the sample exchange server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the gateway's validated payloads so the wire contract can evolve
//! independently.

use std::collections::BTreeMap;

use sample_exchange_sample_models::SampleRecord;
use serde::{Deserialize, Serialize};

/// `GET /api/health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// A sample record annotated with its display color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSample {
    #[serde(flatten)]
    pub record: SampleRecord,
    /// CSS color for the record's category.
    pub color: String,
}

/// One legend entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    pub name: String,
    pub color: String,
}

/// Query parameters for the samples endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleQueryParams {
    /// Bounding box as `west,south,east,north`.
    pub bbox: Option<String>,
    /// Case-insensitive category substring.
    pub category: Option<String>,
    /// Only public samples.
    pub public: Option<bool>,
}

/// Query parameters for the import preview endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreviewParams {
    /// `comma`, `tab`, or `semicolon`. Defaults to comma.
    pub delimiter: Option<String>,
    /// Use RFC 4180 quoting instead of a plain split.
    pub quoted: Option<bool>,
}

/// Parsed upload with the records it would import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImportPreview {
    pub column_names: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
    pub samples: Vec<SampleRecord>,
}

/// Contact form body. `topic` is accepted as an alias for `subject`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub message: Option<String>,
}

impl ContactRequest {
    /// The subject, falling back to `topic` when `subject` is blank.
    #[must_use]
    pub fn subject_or_topic(&self) -> Option<String> {
        self.subject
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.topic.clone())
    }
}

/// Successful contact submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiContactResponse {
    pub success: bool,
    pub message: String,
}

/// Appointment fields of a notification request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Notification body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationRequest {
    pub appointment: Option<AppointmentRequest>,
}

/// Notification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNotificationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Query parameters of the auth provider's redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn sample_color_is_flattened_beside_record_fields() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let sample = ApiSample {
            record: SampleRecord {
                id: "s1".to_string(),
                name: "Soil".to_string(),
                category: Some("soil".to_string()),
                description: None,
                location: None,
                coordinates: None,
                collection_date: None,
                storage_condition: None,
                quantity: Some(2),
                price: 10.0,
                status: None,
                created_at: at,
                updated_at: at,
                hash: "h".to_string(),
            },
            color: "#92400e".to_string(),
        };

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["color"], "#92400e");
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn topic_stands_in_for_missing_subject() {
        let request: ContactRequest =
            serde_json::from_str(r#"{"name":"A","subject":" ","topic":"Pricing"}"#).unwrap();
        assert_eq!(request.subject_or_topic().as_deref(), Some("Pricing"));

        let request: ContactRequest =
            serde_json::from_str(r#"{"subject":"Hello","topic":"Pricing"}"#).unwrap();
        assert_eq!(request.subject_or_topic().as_deref(), Some("Hello"));
    }

    #[test]
    fn notification_response_omits_absent_fields() {
        let json = serde_json::to_value(ApiNotificationResponse {
            success: true,
            id: Some("msg_1".to_string()),
            error: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "id": "msg_1"}));
    }
}
