//! SMTP relay transport using lettre's async Tokio executor.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{error, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::compose_message;
use crate::domain::EmailMessage;
use crate::domain::ports::{DeliveryError, MailTransport};

/// Default submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Relay connection settings. The password is zeroised on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SmtpRelay {
    /// Relay host name.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Login user, when the relay requires authentication.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

impl std::fmt::Debug for SmtpRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpRelay")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Sends report emails through an SMTP relay using STARTTLS.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailTransport {
    /// Build a STARTTLS transport for `relay`.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` when the relay host cannot be used for TLS.
    pub fn starttls(relay: &SmtpRelay) -> Result<Self, DeliveryError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&relay.host)
            .map_err(|err| DeliveryError::rejected(format!("SMTP relay error: {err}")))?
            .port(relay.port);
        let builder = match (&relay.username, &relay.password) {
            (Some(username), Some(password)) => {
                builder.credentials(SmtpCredentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };
        Ok(Self {
            mailer: builder.build(),
            host: relay.host.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let email = compose_message(message)
            .inspect_err(|err| error!(error_kind = err.kind(), error = %err, "email rejected before sending"))?;

        info!(
            relay = %self.host,
            recipients = ?message.recipients,
            subject = %message.subject,
            file_name = %message.attachment.file_name,
            "sending report email"
        );
        let response = self.mailer.send(email).await.map_err(|err| {
            error!(relay = %self.host, error = %err, "SMTP send failed");
            DeliveryError::rejected(err.to_string())
        })?;
        info!(code = %response.code(), "report email accepted by relay");
        Ok(())
    }
}
