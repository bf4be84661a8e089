//! Outbound email.
//!
//! From the caller's point of view sending is fire-and-forget: [`Mailer::send`]
//! reports success as a bool and logs failures itself.

pub mod templates;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> bool;
}

#[derive(Debug, Error)]
enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(#[from] lettre::error::Error),
}

/// Sends HTML email over SMTP (STARTTLS).
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    async fn try_send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
            .port(self.config.port);
        if let (Some(user), Some(pass)) = (&self.config.user, &self.config.password) {
            transport = transport.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport.build().send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        match self.try_send(email).await {
            Ok(()) => {
                info!(to = %email.to, subject = %email.subject, "Email sent");
                true
            }
            Err(e) => {
                error!(to = %email.to, subject = %email.subject, "Email send failed: {e}");
                false
            }
        }
    }
}

/// Used when SMTP is not configured; every send reports failure.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        warn!(to = %email.to, "SMTP is not configured; email not sent");
        false
    }
}

#[cfg(test)]
pub use recording::RecordingMailer;
