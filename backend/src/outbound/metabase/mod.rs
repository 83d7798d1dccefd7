//! BI service outbound adapter.
//!
//! A thin HTTP implementation of the `ReportSource` port against the
//! Metabase REST API.

mod dto;
mod http_client;

pub use http_client::{MetabaseClient, SESSION_HEADER, SetupProfile};
