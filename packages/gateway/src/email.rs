//! Transactional email client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::Appointment;
use crate::retry::{self, RetryPolicy};
use crate::GatewayError;

/// One outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sends email and returns the provider's message id.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<String, GatewayError>;
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

/// [`EmailSender`] for the Resend HTTP API.
pub struct ResendEmailSender {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResendEmailSender {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<String, GatewayError> {
        let url = format!("{}/emails", self.base_url);

        let response = retry::send(RetryPolicy::SINGLE_ATTEMPT, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(message)
        })
        .await?;

        let sent: SendResponse = retry::read_json(response).await?;
        log::info!(
            "Sent email '{}' to {} recipient(s): {}",
            message.subject,
            message.to.len(),
            sent.id
        );
        Ok(sent.id)
    }
}

/// Escapes text for inclusion in HTML.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats an appointment time for humans, falling back to the raw value
/// when it is not a recognizable timestamp.
fn display_time(raw: &str) -> String {
    sample_exchange_sample::parsing::parse_timestamp(raw).map_or_else(
        || raw.to_string(),
        |t: DateTime<Utc>| t.format("%A, %B %-d, %Y at %H:%M UTC").to_string(),
    )
}

/// Builds the confirmation email for a booked appointment.
#[must_use]
pub fn appointment_email(from: &str, appointment: &Appointment) -> EmailMessage {
    let start = display_time(&appointment.start_time);
    let end = display_time(&appointment.end_time);
    let name = escape_html(&appointment.name);

    let html = format!(
        "<h1>Appointment confirmed</h1>\
         <p>Hi {name},</p>\
         <p>Your sample consultation is booked.</p>\
         <ul>\
         <li><strong>Starts:</strong> {}</li>\
         <li><strong>Ends:</strong> {}</li>\
         <li><strong>Reference:</strong> {}</li>\
         </ul>\
         <p>Reply to this email if you need to reschedule.</p>",
        escape_html(&start),
        escape_html(&end),
        escape_html(&appointment.id),
    );

    let text = format!(
        "Hi {},\n\nYour sample consultation is booked.\n\n\
         Starts: {start}\nEnds: {end}\nReference: {}\n",
        appointment.name, appointment.id,
    );

    EmailMessage {
        from: from.to_string(),
        to: vec![appointment.email.clone()],
        subject: format!("Appointment confirmed: {start}"),
        html,
        text: Some(text),
    }
}
