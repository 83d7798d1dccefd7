//! Report pipeline: export a BI card as a spreadsheet, store it, and email
//! it once storage confirms the write.
//!
//! The crate is laid out hexagonally. `domain` holds value types, services
//! and driven ports; `outbound` implements those ports against the BI
//! service, object storage, SMTP and KMS; `inbound` decodes invocation
//! events; `config` validates environment settings.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
