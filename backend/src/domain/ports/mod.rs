//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod content_store;
mod mail_transport;
mod report_source;
mod secret_resolver;

#[cfg(test)]
pub use content_store::MockContentStore;
pub use content_store::{ContentStore, ContentStoreError};
#[cfg(test)]
pub use mail_transport::MockMailTransport;
pub use mail_transport::{DeliveryError, MailTransport};
#[cfg(test)]
pub use report_source::MockReportSource;
pub use report_source::{QueryClientError, ReportSource};
#[cfg(test)]
pub use secret_resolver::MockSecretResolver;
pub use secret_resolver::{SecretError, SecretResolver};
