//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **metabase**: reqwest client for the BI service REST API
//! - **storage**: `object_store`-backed content store (S3, local, memory)
//! - **mail**: lettre SMTP transport and MIME composition
//! - **secrets**: AWS KMS decrypt oracle
//!
//! Adapters translate between domain types and wire representations. They
//! contain no business logic and never retry.

pub mod mail;
pub mod metabase;
pub mod secrets;
pub mod storage;
