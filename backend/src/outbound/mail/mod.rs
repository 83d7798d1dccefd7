//! Mail outbound adapter: MIME composition and SMTP delivery.

mod mime;
mod smtp_transport;

pub use mime::compose_message;
pub use smtp_transport::{DEFAULT_SMTP_PORT, SmtpMailTransport, SmtpRelay};
