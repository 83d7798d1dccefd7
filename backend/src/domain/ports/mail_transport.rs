//! Driven port for delivering report emails.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::EmailMessage;

define_port_error! {
    /// Delivery failures, reported per address or per subsystem.
    pub enum DeliveryError {
        /// The configured sender address does not parse.
        InvalidSender { address: String, message: String } =>
            "invalid from address {address}: {message}",
        /// A recipient address does not parse, or none were given.
        InvalidRecipient { address: String, message: String } =>
            "invalid recipient address {address:?}: {message}",
        /// The MIME message could not be assembled.
        Compose { message: String } =>
            "failed to compose email: {message}",
        /// The relay refused the message or the connection failed.
        Rejected { message: String } =>
            "mail relay rejected the message: {message}",
    }
}

/// Port for handing a composed report email to a relay.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Validate addresses, build the multipart message and send it.
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}
