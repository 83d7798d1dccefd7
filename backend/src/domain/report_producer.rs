//! Producer stage: authenticate, export one card, and store the artifact.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::ports::{ContentStore, ContentStoreError, QueryClientError, ReportSource};
use super::{CardId, Credentials, ObjectKey};

/// Failure of one producer invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    /// Login or card export failed.
    #[error("report query failed: {0}")]
    Query(#[from] QueryClientError),
    /// The artifact could not be written.
    #[error("report storage failed: {0}")]
    Storage(#[from] ContentStoreError),
}

/// Summary of a stored report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedReport {
    /// Key the artifact was written under.
    pub key: ObjectKey,
    /// Artifact size in bytes.
    pub size: usize,
    /// Hex SHA-256 of the artifact.
    pub sha256: String,
}

/// Sequences login → spreadsheet export → store write.
pub struct ReportProducer {
    source: Box<dyn ReportSource>,
    store: Arc<dyn ContentStore>,
}

impl ReportProducer {
    /// Build a producer from its two driven ports.
    pub fn new(source: Box<dyn ReportSource>, store: Arc<dyn ContentStore>) -> Self {
        Self { source, store }
    }

    /// Name prefix used for a card's stored objects.
    pub fn name_prefix(card_id: &CardId) -> String {
        format!("card{card_id}")
    }

    /// Run one production pass for `card_id`.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error; nothing is retried here.
    pub async fn run(
        &mut self,
        credentials: &Credentials,
        card_id: &CardId,
    ) -> Result<ProducedReport, ProducerError> {
        info!(email = credentials.email(), "logging in to report source");
        self.source
            .login(credentials)
            .await
            .inspect_err(|err| error!(error_kind = err.kind(), error = %err, "login failed"))?;

        info!(%card_id, "running query for card");
        let result = self
            .source
            .query_card_xlsx(card_id)
            .await
            .inspect_err(|err| error!(error_kind = err.kind(), error = %err, "card query failed"))?;

        if result.is_empty() {
            warn!(%card_id, "card query returned an empty export");
        }
        let sha256 = result.digest();
        let key = self
            .store
            .put(result.as_bytes(), &Self::name_prefix(card_id))
            .await
            .inspect_err(|err| error!(error_kind = err.kind(), error = %err, "upload failed"))?;

        info!(%key, bytes = result.len(), %sha256, "done processing");
        Ok(ProducedReport {
            key,
            size: result.len(),
            sha256,
        })
    }
}
