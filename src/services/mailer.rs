//! Outgoing email: rendering, delivery and logging.
//!
//! DESIGN
//! ======
//! Every email goes through [`deliver`], which writes an `email_logs` row as
//! `queued`, hands the message to the configured [`EmailTransport`], and then
//! marks the row `sent` or `failed`. The transport is a trait so tests can
//! record messages instead of calling Resend.
//!
//! ERROR HANDLING
//! ==============
//! A missing transport is a delivery failure like any other: the log row is
//! marked `failed` and the caller decides whether that is fatal.

use async_trait::async_trait;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ResendConfig;
use crate::services::email_log;

const LOGIN_CODE_TEMPLATE: &str = include_str!("../../templates/login_code.html");
const CLIENT_INVITE_TEMPLATE: &str = include_str!("../../templates/client_invite.html");

pub const TEMPLATE_LOGIN_CODE: &str = "login_code";
pub const TEMPLATE_CLIENT_INVITE: &str = "client_invite";

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email delivery not configured")]
    NotConfigured,
    #[error("email delivery failed: {0}")]
    Delivery(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Template name recorded in the log.
    pub template: &'static str,
    pub client_id: Option<Uuid>,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Resend-backed transport.
pub struct ResendTransport {
    client: Resend,
    from: String,
}

impl ResendTransport {
    #[must_use]
    pub fn new(config: &ResendConfig) -> Self {
        Self { client: Resend::new(&config.api_key), from: config.from.clone() }
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let to = [email.to.as_str()];
        let options = CreateEmailBaseOptions::new(&self.from, to, &email.subject).with_html(&email.html);
        self.client
            .emails
            .send(options)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(())
    }
}

/// Log, send, and record the outcome of one email. Returns the log id.
///
/// # Errors
///
/// Returns the transport error (after logging it) or a database error.
pub async fn deliver(
    pool: &PgPool,
    transport: Option<&dyn EmailTransport>,
    email: &OutgoingEmail,
) -> Result<Uuid, MailError> {
    let log_id = email_log::insert_queued(pool, email).await?;

    let outcome = match transport {
        Some(transport) => transport.send(email).await,
        None => Err(MailError::NotConfigured),
    };

    match outcome {
        Ok(()) => {
            email_log::mark_sent(pool, log_id).await?;
            info!(%log_id, template = email.template, "email sent");
            Ok(log_id)
        }
        Err(e) => {
            email_log::mark_failed(pool, log_id, &e.to_string()).await?;
            warn!(%log_id, template = email.template, error = %e, "email delivery failed");
            Err(e)
        }
    }
}

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Replace each `{{KEY}}` placeholder with the HTML-escaped value.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_owned(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), &escape_html(value))
    })
}

#[must_use]
pub fn login_code_email(to: &str, code: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_owned(),
        subject: "Your portal sign-in code".to_owned(),
        html: render(LOGIN_CODE_TEMPLATE, &[("EMAIL", to), ("CODE", code)]),
        template: TEMPLATE_LOGIN_CODE,
        client_id: None,
    }
}

#[must_use]
pub fn client_invite_email(to: &str, client_id: Uuid, client_name: &str, base_url: &str) -> OutgoingEmail {
    let login_url = format!("{base_url}/login");
    OutgoingEmail {
        to: to.to_owned(),
        subject: format!("Welcome to the {client_name} onboarding portal"),
        html: render(CLIENT_INVITE_TEMPLATE, &[("CLIENT_NAME", client_name), ("LOGIN_URL", login_url.as_str())]),
        template: TEMPLATE_CLIENT_INVITE,
        client_id: Some(client_id),
    }
}

#[cfg(test)]
#[path = "mailer_test.rs"]
mod tests;
