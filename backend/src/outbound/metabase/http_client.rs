//! Reqwest-backed BI service client.
//!
//! The client owns the invocation's session: `login` stores the token and
//! privileged calls read it back. Calls made without a session fail with
//! `QueryClientError::State` before anything is sent.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{COOKIE, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use super::dto::{
    CreateCardRequestDto, CreateCardResponseDto, LoginRequestDto, SessionPropertiesDto,
    SessionResponseDto, SetupPrefsDto, SetupRequestDto, SetupUserDto,
};
use crate::domain::ports::{QueryClientError, ReportSource};
use crate::domain::{CardId, Credentials, QueryResult, ServerProperties, SessionToken};

/// Header carrying the session token on privileged calls.
pub const SESSION_HEADER: &str = "X-Metabase-Session";
const DEVICE_COOKIE: &str = "metabase.DEVICE";

const PROPERTIES_STATUS: StatusCode = StatusCode::OK;
const SETUP_STATUS: StatusCode = StatusCode::OK;
const LOGIN_STATUS: StatusCode = StatusCode::OK;
const CREATE_CARD_STATUS: StatusCode = StatusCode::ACCEPTED;
const QUERY_STATUS: StatusCode = StatusCode::OK;

/// Names and locale sent when completing first-run setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupProfile {
    /// Site name shown in the BI service.
    pub site_name: String,
    /// Administrator first name.
    pub first_name: String,
    /// Administrator last name.
    pub last_name: String,
    /// Site locale.
    pub site_locale: String,
}

impl Default for SetupProfile {
    fn default() -> Self {
        Self {
            site_name: "Report Pipeline".to_owned(),
            first_name: "Report".to_owned(),
            last_name: "Pipeline".to_owned(),
            site_locale: "en".to_owned(),
        }
    }
}

/// BI service client for one invocation.
pub struct MetabaseClient {
    client: Client,
    base_url: String,
    device_cookie: Option<HeaderValue>,
    setup_profile: SetupProfile,
    session: Option<SessionToken>,
}

impl MetabaseClient {
    /// Build a client with a default reqwest client.
    ///
    /// `device_uuid`, when given, is sent as the `metabase.DEVICE` cookie on
    /// every request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the device id cannot be used as a header
    /// value, or `Transport` when the reqwest client cannot be built.
    pub fn new(base_url: &str, device_uuid: Option<&str>) -> Result<Self, QueryClientError> {
        let client = Client::builder().build().map_err(|err| {
            QueryClientError::transport("build http client", err.to_string())
        })?;
        Self::with_client(client, base_url, device_uuid)
    }

    /// Build a client around an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the device id cannot be used as a header
    /// value.
    pub fn with_client(
        client: Client,
        base_url: &str,
        device_uuid: Option<&str>,
    ) -> Result<Self, QueryClientError> {
        let device_cookie = device_uuid
            .map(str::trim)
            .filter(|uuid| !uuid.is_empty())
            .map(|uuid| {
                HeaderValue::from_str(&format!("{DEVICE_COOKIE}={uuid}")).map_err(|err| {
                    QueryClientError::invalid_request("device cookie", err.to_string())
                })
            })
            .transpose()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            device_cookie,
            setup_profile: SetupProfile::default(),
            session: None,
        })
    }

    /// Replace the names sent during first-run setup.
    #[must_use]
    pub fn with_setup_profile(mut self, profile: SetupProfile) -> Self {
        self.setup_profile = profile;
        self
    }

    /// Session stored by the last successful login.
    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    fn url(&self, operation: &'static str, path: &str) -> Result<Url, QueryClientError> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).map_err(|err| {
            error!(operation, url = %raw, "unable to build request URL");
            QueryClientError::invalid_request(operation, format!("{raw}: {err}"))
        })
    }

    /// `/api/card/{id}/query/xlsx` with the id kept in a single escaped
    /// path segment.
    fn card_query_url(
        &self,
        operation: &'static str,
        card_id: &CardId,
    ) -> Result<Url, QueryClientError> {
        if matches!(card_id.as_str(), "." | "..") {
            return Err(QueryClientError::invalid_request(
                operation,
                "card id must not be a dot segment",
            ));
        }
        let mut url = self.url(operation, "/api/card")?;
        url.path_segments_mut()
            .map_err(|()| {
                QueryClientError::invalid_request(operation, "base URL cannot carry a path")
            })?
            .push(card_id.as_str())
            .push("query")
            .push("xlsx");
        Ok(url)
    }

    fn require_session(&self, operation: &'static str) -> Result<&SessionToken, QueryClientError> {
        self.session
            .as_ref()
            .ok_or_else(|| QueryClientError::state(operation))
    }

    fn with_device_cookie(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.device_cookie {
            Some(cookie) => request.header(COOKIE, cookie.clone()),
            None => request,
        }
    }

    /// Send `request` and return the body if the status is exactly `expected`.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Bytes, QueryClientError> {
        let request = self
            .with_device_cookie(request)
            .build()
            .map_err(|err| QueryClientError::invalid_request(operation, err.to_string()))?;
        info!(
            operation,
            method = %request.method(),
            url = %request.url(),
            "sending BI service request"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| map_transport_error(operation, &err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| map_transport_error(operation, &err))?;

        if status != expected {
            let preview = body_preview(body.as_ref());
            error!(
                operation,
                expected = expected.as_u16(),
                actual = status.as_u16(),
                body = %preview,
                "unexpected response status"
            );
            return Err(QueryClientError::unexpected_status(
                operation,
                expected.as_u16(),
                status.as_u16(),
                preview,
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl ReportSource for MetabaseClient {
    async fn server_properties(&self) -> Result<ServerProperties, QueryClientError> {
        const OPERATION: &str = "server properties";
        let url = self.url(OPERATION, "/api/session/properties")?;
        let body = self
            .execute(OPERATION, self.client.get(url), PROPERTIES_STATUS)
            .await?;
        let properties: SessionPropertiesDto = decode(OPERATION, &body)?;
        Ok(properties.into())
    }

    async fn complete_initial_setup(
        &self,
        setup_token: &str,
        credentials: &Credentials,
    ) -> Result<(), QueryClientError> {
        const OPERATION: &str = "initial setup";
        let url = self.url(OPERATION, "/api/setup")?;
        let profile = &self.setup_profile;
        let payload = SetupRequestDto {
            token: setup_token,
            prefs: SetupPrefsDto {
                site_name: &profile.site_name,
                site_locale: &profile.site_locale,
                allow_tracking: false,
            },
            database: None,
            user: SetupUserDto {
                first_name: &profile.first_name,
                last_name: &profile.last_name,
                email: credentials.email(),
                password: credentials.password(),
                site_name: &profile.site_name,
            },
        };
        self.execute(OPERATION, self.client.post(url).json(&payload), SETUP_STATUS)
            .await?;
        info!("initial setup completed");
        Ok(())
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<SessionToken, QueryClientError> {
        const OPERATION: &str = "login";
        let url = self.url(OPERATION, "/api/session")?;
        let payload = LoginRequestDto {
            username: credentials.email(),
            password: credentials.password(),
        };
        let body = self
            .execute(OPERATION, self.client.post(url).json(&payload), LOGIN_STATUS)
            .await
            .map_err(|err| match err {
                QueryClientError::UnexpectedStatus { .. } => {
                    QueryClientError::authentication(err.to_string())
                }
                other => other,
            })?;
        let session: SessionResponseDto = decode(OPERATION, &body)
            .map_err(|err| QueryClientError::authentication(err.to_string()))?;
        let token = SessionToken::new(session.id).ok_or_else(|| {
            QueryClientError::authentication("login response carried a blank session id")
        })?;

        info!(email = credentials.email(), "logged in successfully");
        debug!(session = token.as_str(), "session established");
        self.session = Some(token.clone());
        Ok(token)
    }

    async fn create_card(&self, name: &str) -> Result<CardId, QueryClientError> {
        const OPERATION: &str = "create card";
        let session = self.require_session(OPERATION)?;
        let url = self.url(OPERATION, "/api/card")?;
        let request = self
            .client
            .post(url)
            .header(SESSION_HEADER, session.as_str())
            .json(&CreateCardRequestDto::bar_chart(name));
        let body = self.execute(OPERATION, request, CREATE_CARD_STATUS).await?;
        let created: CreateCardResponseDto = decode(OPERATION, &body)?;
        let card_id = CardId::from(created.id);
        info!(%card_id, "card created successfully");
        Ok(card_id)
    }

    async fn query_card_xlsx(&self, card_id: &CardId) -> Result<QueryResult, QueryClientError> {
        const OPERATION: &str = "query card";
        let session = self.require_session(OPERATION)?;
        if card_id.as_str().trim().is_empty() {
            return Err(QueryClientError::invalid_request(
                OPERATION,
                "card id must not be blank",
            ));
        }
        let url = self.card_query_url(OPERATION, card_id)?;
        let request = self
            .client
            .post(url)
            .header(SESSION_HEADER, session.as_str());
        let body = self.execute(OPERATION, request, QUERY_STATUS).await?;
        info!(%card_id, bytes = body.len(), "card query returned");
        Ok(QueryResult::new(body.to_vec()))
    }
}

fn decode<T: DeserializeOwned>(operation: &'static str, body: &[u8]) -> Result<T, QueryClientError> {
    serde_json::from_slice(body).map_err(|err| {
        error!(operation, body = %body_preview(body), "failed to decode response");
        QueryClientError::protocol(operation, err.to_string())
    })
}

fn map_transport_error(operation: &'static str, error: &reqwest::Error) -> QueryClientError {
    error!(operation, %error, "HTTP request failed");
    QueryClientError::transport(operation, error.to_string())
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for request-independent helpers; HTTP behaviour is exercised
    //! against a mock server in `tests/metabase_client.rs`.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::compacts_whitespace(b"{ \"message\":\n  \"nope\" }", "{ \"message\": \"nope\" }")]
    #[case::empty(b"", "")]
    fn previews_compact_whitespace(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(body_preview(body), expected);
    }

    #[test]
    fn previews_truncate_long_bodies() {
        let body = "x".repeat(200);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = MetabaseClient::new("http://bi.internal:3000/", None).expect("client");
        let url = client
            .url("server properties", "/api/session/properties")
            .expect("url");
        assert_eq!(url.as_str(), "http://bi.internal:3000/api/session/properties");
    }

    #[rstest]
    #[case::numeric("42", "http://bi.internal:3000/api/card/42/query/xlsx")]
    #[case::slashes("1/../../admin", "http://bi.internal:3000/api/card/1%2F..%2F..%2Fadmin/query/xlsx")]
    #[case::query_marker("9?export=csv", "http://bi.internal:3000/api/card/9%3Fexport=csv/query/xlsx")]
    fn card_ids_are_escaped_into_one_segment(#[case] card_id: &str, #[case] expected: &str) {
        let client = MetabaseClient::new("http://bi.internal:3000", None).expect("client");
        let url = client
            .card_query_url("query card", &CardId::new(card_id))
            .expect("url");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    #[case::current(".")]
    #[case::parent("..")]
    fn dot_segment_card_ids_are_rejected(#[case] card_id: &str) {
        let client = MetabaseClient::new("http://bi.internal:3000", None).expect("client");
        let error = client
            .card_query_url("query card", &CardId::new(card_id))
            .expect_err("dot segments would change the endpoint");
        assert_eq!(error.kind(), "InvalidRequest");
    }

    #[test]
    fn unparseable_base_url_is_an_invalid_request() {
        let client = MetabaseClient::new("not a url", None).expect("client");
        let error = client
            .url("login", "/api/session")
            .expect_err("url must fail");
        assert!(error.is_precondition());
    }

    #[tokio::test]
    async fn privileged_calls_require_a_session() {
        let client = MetabaseClient::new("http://127.0.0.1:9", None).expect("client");
        let error = client
            .query_card_xlsx(&CardId::new("1"))
            .await
            .expect_err("no session");
        assert_eq!(error, QueryClientError::state("query card"));
        assert_eq!(error.to_string(), "query card: must authenticate first");
    }

    #[test]
    fn blank_device_ids_send_no_cookie() {
        let client = MetabaseClient::new("http://bi.internal", Some("  ")).expect("client");
        assert!(client.device_cookie.is_none());
    }
}
