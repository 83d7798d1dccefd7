//! Assembly of report emails as multipart MIME messages.
//!
//! Layout: a `multipart/mixed` root holding a `multipart/alternative` part
//! with the HTML body, followed by the spreadsheet attachment.

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};

use crate::domain::EmailMessage;
use crate::domain::ports::DeliveryError;

/// Validate addresses and build the MIME message for `email`.
///
/// Every recipient is parsed before anything else is built, so the first
/// malformed address is reported by value.
///
/// # Errors
///
/// Returns `InvalidSender` or `InvalidRecipient` naming the offending
/// address, or `Compose` when the attachment type or message is invalid.
pub fn compose_message(email: &EmailMessage) -> Result<Message, DeliveryError> {
    let from: Mailbox = email
        .from
        .trim()
        .parse()
        .map_err(|err: lettre::address::AddressError| {
            DeliveryError::invalid_sender(email.from.as_str(), err.to_string())
        })?;
    let recipients = parse_recipients(&email.recipients)?;

    let content_type = ContentType::parse(&email.attachment.content_type)
        .map_err(|err| DeliveryError::compose(format!("invalid attachment type: {err}")))?;
    let attachment = Attachment::new(email.attachment.file_name.clone())
        .body(email.attachment.data.clone(), content_type);
    let body = MultiPart::mixed()
        .multipart(MultiPart::alternative().singlepart(SinglePart::html(email.html_body.clone())))
        .singlepart(attachment);

    let builder = recipients.into_iter().fold(
        Message::builder().from(from).subject(email.subject.as_str()),
        |builder, recipient| builder.to(recipient),
    );
    builder
        .multipart(body)
        .map_err(|err| DeliveryError::compose(err.to_string()))
}

fn parse_recipients(recipients: &[String]) -> Result<Vec<Mailbox>, DeliveryError> {
    if recipients.is_empty() {
        return Err(DeliveryError::invalid_recipient(
            "",
            "at least one recipient is required",
        ));
    }
    recipients
        .iter()
        .map(|address| {
            address.trim().parse::<Mailbox>().map_err(|err| {
                DeliveryError::invalid_recipient(address.as_str(), err.to_string())
            })
        })
        .collect()
}
