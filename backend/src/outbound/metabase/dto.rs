//! Request and response bodies for the BI service's REST API.
//!
//! Only the fields the pipeline reads are declared on response DTOs; unknown
//! fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{CardId, ServerProperties};

#[derive(Debug, Deserialize)]
pub(super) struct SessionPropertiesDto {
    #[serde(rename = "setup-token", default)]
    pub(super) setup_token: Option<String>,
}

impl From<SessionPropertiesDto> for ServerProperties {
    fn from(value: SessionPropertiesDto) -> Self {
        Self {
            setup_token: value.setup_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SetupRequestDto<'a> {
    pub(super) token: &'a str,
    pub(super) prefs: SetupPrefsDto<'a>,
    pub(super) database: Option<Value>,
    pub(super) user: SetupUserDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct SetupPrefsDto<'a> {
    pub(super) site_name: &'a str,
    pub(super) site_locale: &'a str,
    pub(super) allow_tracking: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct SetupUserDto<'a> {
    pub(super) first_name: &'a str,
    pub(super) last_name: &'a str,
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) site_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginRequestDto<'a> {
    pub(super) username: &'a str,
    pub(super) password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct SessionResponseDto {
    pub(super) id: String,
}

/// New card using the default bar visualisation over source table 1 of
/// database 1.
#[derive(Debug, Serialize)]
pub(super) struct CreateCardRequestDto<'a> {
    pub(super) name: &'a str,
    pub(super) display: &'static str,
    pub(super) dataset_query: DatasetQueryDto,
    pub(super) visualization_settings: Map<String, Value>,
}

impl<'a> CreateCardRequestDto<'a> {
    pub(super) fn bar_chart(name: &'a str) -> Self {
        Self {
            name,
            display: "bar",
            dataset_query: DatasetQueryDto {
                query_type: "query",
                database: 1,
                query: SourceQueryDto { source_table: 1 },
            },
            visualization_settings: Map::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DatasetQueryDto {
    #[serde(rename = "type")]
    pub(super) query_type: &'static str,
    pub(super) database: u32,
    pub(super) query: SourceQueryDto,
}

#[derive(Debug, Serialize)]
pub(super) struct SourceQueryDto {
    #[serde(rename = "source-table")]
    pub(super) source_table: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCardResponseDto {
    pub(super) id: CardIdDto,
}

/// Card ids arrive as JSON numbers from current servers and as strings from
/// some proxies; both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CardIdDto {
    Text(String),
    Number(i64),
}

impl From<CardIdDto> for CardId {
    fn from(value: CardIdDto) -> Self {
        match value {
            CardIdDto::Text(text) => CardId::new(text),
            CardIdDto::Number(number) => CardId::new(number.to_string()),
        }
    }
}
