use std::env;

use chrono::NaiveDate;
use html_escape::encode_text;
use log::{info, warn};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Mail API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: String,
}

impl MailConfig {
    /// `None` when the transactional mail API is not configured.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_url: env::var("EMAIL_API_URL").ok()?,
            api_key: env::var("EMAIL_API_KEY").ok()?,
            sender_email: env::var("EMAIL_SENDER").ok()?,
            sender_name: env::var("EMAIL_SENDER_NAME").unwrap_or_else(|_| "Dream Football".to_string()),
        })
    }
}

/// A rendered message, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Fields of the booking confirmation template.
#[derive(Debug, Clone)]
pub struct BookingConfirmation<'a> {
    pub customer_name: &'a str,
    pub ground_name: &'a str,
    pub booking_date: NaiveDate,
    pub booking_time: &'a str,
    pub booking_duration: f64,
}

pub const CONFIRMATION_SUBJECT: &str = "Your Booking has been Confirmed - Dream Football";

fn wrap_in_layout(heading: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{heading}</title></head>
<body style="margin:0;padding:24px;background-color:#f4f6f4;font-family:Arial,Helvetica,sans-serif;color:#1f2a1f;">
<table role="presentation" width="560" cellpadding="0" cellspacing="0" border="0" style="max-width:560px;margin:0 auto;background:#ffffff;border-top:4px solid #1e8a3c;">
<tr><td style="padding:28px 32px 0;"><h1 style="margin:0;font-size:22px;color:#1e8a3c;">{heading}</h1></td></tr>
<tr><td style="padding:20px 32px 28px;">{body_html}</td></tr>
<tr><td style="padding:0 32px 24px;font-size:11px;color:#6b7a6b;">&copy; Dream Football</td></tr>
</table>
</body>
</html>"#
    )
}

fn paragraph(text: &str) -> String {
    format!(r#"<p style="margin:0 0 14px;font-size:15px;line-height:1.6;">{text}</p>"#)
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as i64)
    } else {
        format!("{}", hours)
    }
}

pub fn render_booking_confirmation(to: &str, b: &BookingConfirmation<'_>) -> OutgoingMail {
    let date = b.booking_date.format("%A, %d %B %Y").to_string();
    let hours = format_hours(b.booking_duration);
    let body_html = format!(
        "{}{}{}",
        paragraph(&format!("Hi {},", encode_text(b.customer_name))),
        paragraph(&format!(
            "Your booking at <strong>{}</strong> on <strong>{}</strong> at <strong>{}</strong> for {} hour(s) has been confirmed.",
            encode_text(b.ground_name),
            date,
            encode_text(b.booking_time),
            hours,
        )),
        paragraph("See you on the pitch!"),
    );
    let text = format!(
        "Hi {},\n\nYour booking at {} on {} at {} for {} hour(s) has been confirmed.\n\nSee you on the pitch!\n\n-- Dream Football",
        b.customer_name, b.ground_name, date, b.booking_time, hours
    );

    OutgoingMail {
        to: to.to_string(),
        subject: CONFIRMATION_SUBJECT.to_string(),
        html: wrap_in_layout("Booking Confirmed", &body_html),
        text,
    }
}

#[derive(Clone)]
pub struct Mailer {
    config: Option<MailConfig>,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: Option<MailConfig>) -> Self {
        if config.is_none() {
            warn!("Email API not configured; outgoing mail will only be logged");
        }
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let Some(config) = &self.config else {
            info!("Mail to {} not sent (disabled): {}", mail.to, mail.subject);
            return Ok(());
        };

        let body = json!({
            "from": { "email": config.sender_email, "name": config.sender_name },
            "to": [{ "email": mail.to }],
            "subject": mail.subject,
            "html": mail.html,
            "text": mail.text,
        });

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, body });
        }

        info!("Email sent to {} ({})", mail.to, mail.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_escapes_user_supplied_fields() {
        let mail = render_booking_confirmation(
            "ali@example.com",
            &BookingConfirmation {
                customer_name: "Ali <script>",
                ground_name: "Green & Gold Arena",
                booking_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                booking_time: "18:30",
                booking_duration: 1.5,
            },
        );
        assert_eq!(mail.subject, CONFIRMATION_SUBJECT);
        assert!(mail.html.contains("Ali &lt;script&gt;"));
        assert!(mail.html.contains("Green &amp; Gold Arena"));
        assert!(mail.html.contains("Saturday, 15 June 2024"));
        assert!(mail.text.contains("for 1.5 hour(s)"));
        assert!(!mail.html.contains("<script>"));
    }

    #[test]
    fn whole_hours_render_without_decimals() {
        assert_eq!(format_hours(2.0), "2");
        assert_eq!(format_hours(1.5), "1.5");
    }

    #[actix_web::test]
    async fn disabled_mailer_succeeds_without_sending() {
        let mailer = Mailer::new(None);
        let mail = OutgoingMail {
            to: "x@example.com".into(),
            subject: "s".into(),
            html: "<p>h</p>".into(),
            text: "h".into(),
        };
        assert!(mailer.send(&mail).await.is_ok());
    }
}
