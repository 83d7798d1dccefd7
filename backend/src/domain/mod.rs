//! Domain types and services for the report pipeline.
//!
//! Purpose: hold the report value types, the producer, setup and
//! distribution services, and the driven ports they depend on. Adapters
//! live in `outbound`; nothing here performs I/O directly.
//!
//! Public surface:
//! - Value types: `SessionToken`, `CardId`, `Credentials`, `QueryResult`,
//!   `ServerProperties`, `ObjectKey`, `EmailMessage`, `Attachment`.
//! - Services: `ReportProducer`, `ReportSetup`, `ReportDistributor`.
//! - Pure helpers: `derive_file_name`, `validate_size`, `compose_subject`,
//!   `wrap_html_body`, `sha256_hex`.

mod artifact;
mod distribution;
mod email;
mod notification;
mod object_key;
pub mod ports;
mod report;
mod report_producer;
mod report_setup;

pub use self::artifact::{ArtifactError, DEFAULT_MAX_ATTACHMENT_BYTES, sha256_hex, validate_size};
pub use self::distribution::{
    BatchOutcome, DeliveredReport, DistributionError, DistributionSettings, DistributionStage,
    NotificationFailure, ReportDistributor,
};
pub use self::email::{Attachment, EmailMessage, XLSX_MIME_TYPE, compose_subject, wrap_html_body};
pub use self::notification::{ChangeEventParser, NotificationError};
pub use self::object_key::{ObjectKey, derive_file_name};
pub use self::report::{CardId, Credentials, QueryResult, ServerProperties, SessionToken};
pub use self::report_producer::{ProducedReport, ProducerError, ReportProducer};
pub use self::report_setup::{
    ReportSetup, SetupError, SetupOutcome, SetupRetryPolicy, SetupSleeper, TokioSleeper,
};
