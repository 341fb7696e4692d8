//! Validated inputs and typed outputs of gateway operations.

use serde::{Deserialize, Serialize};

use crate::GatewayError;

/// Message for a missing or blank required field.
pub const MISSING_FIELDS: &str = "Missing required fields";

/// Message for an email address without an `@`.
pub const INVALID_EMAIL: &str = "Invalid email address";

fn required(value: Option<String>) -> Result<String, GatewayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::validation(MISSING_FIELDS))
}

/// A contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactPayload {
    /// Validates raw form fields.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] with [`MISSING_FIELDS`] if any
    /// field is absent or blank, or [`INVALID_EMAIL`] if the email has no
    /// `@`.
    pub fn new(
        name: Option<String>,
        email: Option<String>,
        subject: Option<String>,
        message: Option<String>,
    ) -> Result<Self, GatewayError> {
        let payload = Self {
            name: required(name)?,
            email: required(email)?,
            subject: required(subject)?,
            message: required(message)?,
        };

        if !payload.email.contains('@') {
            return Err(GatewayError::validation(INVALID_EMAIL));
        }

        Ok(payload)
    }
}

/// A scheduled appointment to notify someone about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub email: String,
    pub start_time: String,
    pub end_time: String,
}

impl Appointment {
    /// Validates raw appointment fields.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if any field is absent or blank,
    /// or the email has no `@`.
    pub fn new(
        id: Option<String>,
        name: Option<String>,
        email: Option<String>,
        start_time: Option<String>,
        end_time: Option<String>,
    ) -> Result<Self, GatewayError> {
        let appointment = Self {
            id: required(id)?,
            name: required(name)?,
            email: required(email)?,
            start_time: required(start_time)?,
            end_time: required(end_time)?,
        };

        if !appointment.email.contains('@') {
            return Err(GatewayError::validation(INVALID_EMAIL));
        }

        Ok(appointment)
    }
}

/// Restricts which samples are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleFilter {
    /// Only samples whose status is public.
    pub public_only: bool,
    /// Case-insensitive substring match on category.
    pub category: Option<String>,
}

impl SampleFilter {
    /// Filter for the public catalog.
    #[must_use]
    pub fn public() -> Self {
        Self {
            public_only: true,
            category: None,
        }
    }
}

/// A session established by exchanging an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// The signed-in user, as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn validation_message(err: GatewayError) -> String {
        match err {
            GatewayError::Validation { message } => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_complete_contact_form() {
        let payload = ContactPayload::new(
            some(" Ada "),
            some("ada@example.com"),
            some("Soil samples"),
            some("Do you ship overseas?"),
        )
        .unwrap();
        assert_eq!(payload.name, "Ada");
        assert_eq!(payload.subject, "Soil samples");
    }

    #[test]
    fn rejects_missing_or_blank_contact_fields() {
        let err = ContactPayload::new(some("Ada"), None, some("s"), some("m")).unwrap_err();
        assert_eq!(validation_message(err), MISSING_FIELDS);

        let err =
            ContactPayload::new(some("Ada"), some("a@b"), some("s"), some("   ")).unwrap_err();
        assert_eq!(validation_message(err), MISSING_FIELDS);
    }

    #[test]
    fn rejects_email_without_at_sign() {
        let err = ContactPayload::new(some("Ada"), some("ada.example.com"), some("s"), some("m"))
            .unwrap_err();
        assert_eq!(validation_message(err), INVALID_EMAIL);
    }

    #[test]
    fn appointment_requires_every_field() {
        assert!(
            Appointment::new(
                some("a1"),
                some("Ada"),
                some("ada@example.com"),
                some("2024-06-01T10:00:00Z"),
                some("2024-06-01T10:30:00Z"),
            )
            .is_ok()
        );

        let err = Appointment::new(some("a1"), some("Ada"), some("ada@example.com"), None, None)
            .unwrap_err();
        assert_eq!(validation_message(err), MISSING_FIELDS);
    }

    #[test]
    fn deserializes_auth_session_with_optional_fields() {
        let session: AuthSession =
            serde_json::from_str(r#"{"access_token":"tok","token_type":"bearer"}"#).unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.user, None);
    }
}
