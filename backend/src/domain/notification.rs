//! Extraction of the changed object's key from a storage change notification.
//!
//! The notification topic wraps the storage event as a JSON *string*, so the
//! message is decoded once more before the key is looked up.

use serde_json::Value;

use super::ObjectKey;
use super::ports::define_port_error;

const OBJECT_KEY_POINTER: &str = "/Records/0/s3/object/key";

define_port_error! {
    /// A change notification that does not carry a usable object key.
    pub enum NotificationError {
        /// Message absent, not JSON, or without a key at the expected path.
        Malformed { message: String } => "malformed change notification: {message}",
    }
}

/// Parses storage change notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeEventParser;

impl ChangeEventParser {
    /// Return the key at `Records[0].s3.object.key` of the message payload.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Malformed`] when the message is absent,
    /// is not valid JSON, or has no non-blank string at the key path.
    ///
    /// # Examples
    /// ```
    /// use report_pipeline::domain::ChangeEventParser;
    ///
    /// let message = r#"{"Records":[{"s3":{"object":{"key":"a/b/c.xlsx"}}}]}"#;
    /// let key = ChangeEventParser.object_key(Some(message))?;
    /// assert_eq!(key.as_str(), "a/b/c.xlsx");
    /// # Ok::<(), report_pipeline::domain::NotificationError>(())
    /// ```
    pub fn object_key(&self, message: Option<&str>) -> Result<ObjectKey, NotificationError> {
        let message =
            message.ok_or_else(|| NotificationError::malformed("notification has no message"))?;
        let payload: Value = serde_json::from_str(message).map_err(|error| {
            NotificationError::malformed(format!("message is not valid JSON: {error}"))
        })?;
        let raw_key = payload
            .pointer(OBJECT_KEY_POINTER)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                NotificationError::malformed(format!("no string value at {OBJECT_KEY_POINTER}"))
            })?;
        ObjectKey::parse(raw_key)
            .ok_or_else(|| NotificationError::malformed("object key is blank"))
    }
}
