//! Outgoing report email and the text helpers used to build it.

use chrono::{DateTime, Utc};

use super::CardId;

/// MIME type of the spreadsheet export attached to report emails.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to recipients.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Attachment bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Spreadsheet attachment with the BI export MIME type.
    pub fn spreadsheet(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: XLSX_MIME_TYPE.to_owned(),
            data,
        }
    }
}

/// Report email handed to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Sender address.
    pub from: String,
    /// One or more recipient addresses.
    pub recipients: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body, already wrapped in `<html>` tags.
    pub html_body: String,
    /// The report artifact.
    pub attachment: Attachment,
}

/// Build the subject line from the distribution time.
///
/// The month and year come from `now`, the moment of distribution, not the
/// moment the report was produced.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use report_pipeline::domain::{CardId, compose_subject};
///
/// let now = Utc.with_ymd_and_hms(2023, 4, 4, 12, 0, 0).single().expect("valid time");
/// let card = CardId::new("12");
/// assert_eq!(compose_subject(&card, "Sales", false, now), "Sales For April 2023");
/// assert_eq!(compose_subject(&card, "Sales", true, now), "Card 12 - Sales For April 2023");
/// ```
pub fn compose_subject(
    card_id: &CardId,
    label: &str,
    include_card_id: bool,
    now: DateTime<Utc>,
) -> String {
    let subject = format!("{label} For {}", now.format("%B %Y"));
    if include_card_id {
        format!("Card {card_id} - {subject}")
    } else {
        subject
    }
}

/// Bracket a body with `<html>`…`</html>`, adding only the tags it lacks.
///
/// # Examples
/// ```
/// use report_pipeline::domain::wrap_html_body;
///
/// assert_eq!(wrap_html_body("hello"), "<html>hello</html>");
/// assert_eq!(wrap_html_body("<html>hello</html>"), "<html>hello</html>");
/// ```
pub fn wrap_html_body(body: &str) -> String {
    let trimmed = body.trim();
    let has_open = trimmed
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("<html"));
    let has_close = trimmed
        .len()
        .checked_sub(7)
        .and_then(|start| trimmed.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case("</html>"));

    match (has_open, has_close) {
        (true, true) => body.to_owned(),
        (true, false) => format!("{body}</html>"),
        (false, true) => format!("<html>{body}"),
        (false, false) => format!("<html>{body}</html>"),
    }
}
