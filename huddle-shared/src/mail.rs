/// Outbound email
///
/// Mail is a side channel: password reset links and verification codes are
/// sent with [`dispatch`], which spawns the delivery and only logs failures.
/// The request that triggered the mail never waits for it and never fails
/// because of it.
///
/// Two [`Mailer`] implementations exist:
///
/// - [`SendGridMailer`]: SendGrid v3 `mail/send` API over HTTPS
/// - [`LogMailer`]: logs the message instead of sending it (development, tests)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A single outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl EmailMessage {
    /// Password reset mail carrying a one-time link
    pub fn password_reset(to: &str, reset_link: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password Reset Request".to_string(),
            text: format!(
                "You requested a password reset. Follow this link to choose a new password: {}\n\nThe link expires in one hour.",
                reset_link
            ),
            html: Some(format!(
                "<p>You requested a password reset. Please follow this link to reset your password:</p><p><a href=\"{0}\">{0}</a></p>",
                reset_link
            )),
        }
    }

    /// Email verification mail carrying a 6-digit code
    pub fn verification_code(to: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your verification code".to_string(),
            text: format!("Your verification code is {}. It expires in 15 minutes.", code),
            html: None,
        }
    }
}

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail provider rejected message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Sends mail through the SendGrid v3 API
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
        })
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        // SendGrid requires text/plain before text/html.
        let mut content = vec![json!({ "type": "text/plain", "value": message.text })];
        if let Some(html) = &message.html {
            content.push(json!({ "type": "text/html", "value": html }));
        }

        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from },
            "subject": message.subject,
            "content": content,
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&message))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(MailError::Rejected(format!("status {}: check SENDGRID_API_KEY", status.as_u16())))
            }
            _ => Err(MailError::Rejected(format!("status {}: {}", status.as_u16(), body))),
        }
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text,
            "Mail delivery disabled, logging message"
        );
        Ok(())
    }
}

/// Sends a message in the background
///
/// Must be called from within a tokio runtime.
pub fn dispatch(mailer: Arc<dyn Mailer>, message: EmailMessage) {
    tokio::spawn(async move {
        let to = message.to.clone();
        if let Err(e) = mailer.send(message).await {
            warn!(%to, error = %e, "Failed to send email");
        }
    });
}
