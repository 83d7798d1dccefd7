//! Driven port for the BI service: authentication, setup, card creation and
//! spreadsheet export.
//!
//! Every call has exactly one accepted HTTP status. Adapters must not widen
//! that to "any 2xx": card creation answers 202 while the others answer 200.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{CardId, Credentials, QueryResult, ServerProperties, SessionToken};

define_port_error! {
    /// Errors surfaced while calling the BI service.
    pub enum QueryClientError {
        /// Network fault before a response arrived.
        Transport { operation: String, message: String } =>
            "{operation}: transport failed: {message}",
        /// The response status differs from the one status the call accepts.
        UnexpectedStatus { operation: String, expected: u16, actual: u16, body: String } =>
            "{operation}: expected HTTP {expected} but received {actual}: {body}",
        /// The response body could not be decoded into the expected shape.
        Protocol { operation: String, message: String } =>
            "{operation}: response could not be decoded: {message}",
        /// Login was refused or returned an unusable session.
        Authentication { message: String } =>
            "login failed: {message}",
        /// A privileged call was made without an active session.
        State { operation: String } =>
            "{operation}: must authenticate first",
        /// The request could not be built (for example an invalid URL).
        InvalidRequest { operation: String, message: String } =>
            "{operation}: request could not be built: {message}",
    }
}

impl QueryClientError {
    /// Whether this is a caller bug rather than an external-service fault.
    ///
    /// Precondition failures are raised before any request is sent.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::State { .. } | Self::InvalidRequest { .. })
    }
}

/// Port for the report source. One instance holds at most one session and
/// lives for one invocation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch public server properties; unauthenticated.
    async fn server_properties(&self) -> Result<ServerProperties, QueryClientError>;

    /// Create the administrative user and basic preferences on a fresh server.
    ///
    /// Callers must first check that setup is pending.
    async fn complete_initial_setup(
        &self,
        setup_token: &str,
        credentials: &Credentials,
    ) -> Result<(), QueryClientError>;

    /// Log in, store the session for later calls, and return it.
    async fn login(&mut self, credentials: &Credentials)
    -> Result<SessionToken, QueryClientError>;

    /// Create a card with the default visualisation template.
    async fn create_card(&self, name: &str) -> Result<CardId, QueryClientError>;

    /// Run a card's query and export the result as a spreadsheet.
    async fn query_card_xlsx(&self, card_id: &CardId) -> Result<QueryResult, QueryClientError>;
}
