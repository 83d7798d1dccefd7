//! Distribution stage: turn a change notification into a delivered email.
//!
//! Each notification walks `Received → KeyExtracted → Downloaded →
//! SizeValidated` and is then sent. A failure at any edge is terminal for
//! that notification only; batches keep going and report every failure with the
//! stage it reached.

use std::fmt;
use std::sync::Arc;

use mockable::Clock;
use tracing::{Instrument, error, info, info_span, warn};

use super::ports::{ContentStore, ContentStoreError, DeliveryError, MailTransport};
use super::{
    ArtifactError, Attachment, CardId, ChangeEventParser, DEFAULT_MAX_ATTACHMENT_BYTES,
    EmailMessage, NotificationError, ObjectKey, compose_subject, sha256_hex, validate_size,
    wrap_html_body,
};

/// Fixed inputs of every email sent by a distributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSettings {
    /// Sender address.
    pub from_address: String,
    /// Recipient addresses; at least one is required for delivery.
    pub recipients: Vec<String>,
    /// Card whose reports are distributed.
    pub card_id: CardId,
    /// Subject label preceding the month and year.
    pub subject_label: String,
    /// Prefix the subject with the card id.
    pub include_card_id: bool,
    /// HTML body; wrapped in `<html>` tags when sent.
    pub html_body: String,
    /// Inclusive attachment ceiling in bytes.
    pub max_attachment_bytes: u64,
}

impl DistributionSettings {
    /// Settings with the default label, body and attachment ceiling.
    pub fn new(from_address: impl Into<String>, recipients: Vec<String>, card_id: CardId) -> Self {
        Self {
            from_address: from_address.into(),
            recipients,
            card_id,
            subject_label: "Report".to_owned(),
            include_card_id: false,
            html_body: String::new(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

/// Progress of one notification through the distribution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DistributionStage {
    /// The notification arrived.
    Received,
    /// The object key was read from the notification.
    KeyExtracted,
    /// The artifact was downloaded.
    Downloaded,
    /// The artifact passed size validation.
    SizeValidated,
}

impl DistributionStage {
    /// Stable lower-case name for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::KeyExtracted => "key_extracted",
            Self::Downloaded => "downloaded",
            Self::SizeValidated => "size_validated",
        }
    }
}

impl fmt::Display for DistributionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    /// The notification carried no usable key.
    #[error(transparent)]
    Notification(#[from] NotificationError),
    /// The artifact could not be downloaded.
    #[error(transparent)]
    Storage(#[from] ContentStoreError),
    /// The artifact is empty or too large to attach.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The email could not be composed or sent.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl DistributionError {
    /// Last stage the notification reached before failing.
    pub fn stage(&self) -> DistributionStage {
        match self {
            Self::Notification(_) => DistributionStage::Received,
            Self::Storage(_) => DistributionStage::KeyExtracted,
            Self::Artifact(_) => DistributionStage::Downloaded,
            Self::Delivery(_) => DistributionStage::SizeValidated,
        }
    }

    /// Variant name of the underlying error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notification(err) => err.kind(),
            Self::Storage(err) => err.kind(),
            Self::Artifact(err) => err.kind(),
            Self::Delivery(err) => err.kind(),
        }
    }
}

/// Summary of one delivered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredReport {
    /// Key the artifact was read from.
    pub key: ObjectKey,
    /// Attachment file name.
    pub file_name: String,
    /// Attachment size in bytes.
    pub size: u64,
    /// Hex SHA-256 of the attachment.
    pub sha256: String,
    /// Subject line used.
    pub subject: String,
}

/// One failed notification within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFailure {
    /// Zero-based position in the batch.
    pub index: usize,
    /// Last stage reached.
    pub stage: DistributionStage,
    /// Cause.
    pub error: DistributionError,
}

/// Result of processing a batch of notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Successfully delivered reports, in batch order.
    pub delivered: Vec<DeliveredReport>,
    /// Failed notifications, in batch order.
    pub failures: Vec<NotificationFailure>,
}

impl BatchOutcome {
    /// Whether every notification was delivered.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of notifications processed.
    pub fn total(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }
}

/// Sequences parse → download → validate → send for each notification.
pub struct ReportDistributor {
    parser: ChangeEventParser,
    store: Arc<dyn ContentStore>,
    transport: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
    settings: DistributionSettings,
}

impl ReportDistributor {
    /// Build a distributor over its driven ports.
    pub fn new(
        store: Arc<dyn ContentStore>,
        transport: Arc<dyn MailTransport>,
        clock: Arc<dyn Clock>,
        settings: DistributionSettings,
    ) -> Self {
        Self {
            parser: ChangeEventParser,
            store,
            transport,
            clock,
            settings,
        }
    }

    /// Deliver the artifact referenced by one notification message.
    ///
    /// # Errors
    ///
    /// Returns the first failing edge's error; [`DistributionError::stage`]
    /// reports how far the notification got.
    pub async fn process_notification(
        &self,
        message: Option<&str>,
    ) -> Result<DeliveredReport, DistributionError> {
        let key = self.parser.object_key(message)?;
        info!(%key, "object key extracted");

        let data = self.store.get(&key).await?;
        let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let sha256 = sha256_hex(&data);
        info!(%key, bytes = size, %sha256, "artifact downloaded");

        validate_size(size, self.settings.max_attachment_bytes)?;

        let subject = compose_subject(
            &self.settings.card_id,
            &self.settings.subject_label,
            self.settings.include_card_id,
            self.clock.utc(),
        );
        let file_name = key.file_name().to_owned();
        let message = EmailMessage {
            from: self.settings.from_address.clone(),
            recipients: self.settings.recipients.clone(),
            subject: subject.clone(),
            html_body: wrap_html_body(&self.settings.html_body),
            attachment: Attachment::spreadsheet(file_name.clone(), data),
        };
        self.transport.send(&message).await?;
        info!(
            recipients = message.recipients.len(),
            %subject,
            file_name,
            "report email sent"
        );

        Ok(DeliveredReport {
            key,
            file_name,
            size,
            sha256,
            subject,
        })
    }

    /// Process notifications strictly in order; a failure never stops the
    /// remaining ones.
    pub async fn process_batch<'a, I>(&self, messages: I) -> BatchOutcome
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut outcome = BatchOutcome::default();
        for (index, message) in messages.into_iter().enumerate() {
            let result = self
                .process_notification(message)
                .instrument(info_span!("notification", index))
                .await;
            match result {
                Ok(report) => outcome.delivered.push(report),
                Err(err) => {
                    let stage = err.stage();
                    error!(
                        error_kind = err.kind(),
                        error = %err,
                        stage = stage.as_str(),
                        "notification failed"
                    );
                    outcome.failures.push(NotificationFailure {
                        index,
                        stage,
                        error: err,
                    });
                }
            }
        }
        if outcome.is_success() {
            info!(delivered = outcome.delivered.len(), "batch complete");
        } else {
            warn!(
                delivered = outcome.delivered.len(),
                failed = outcome.failures.len(),
                "batch complete with failures"
            );
        }
        outcome
    }
}
