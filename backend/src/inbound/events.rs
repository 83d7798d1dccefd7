//! Notification-topic invocation events.
//!
//! The distributor is triggered with a topic event whose records each carry
//! a `Sns.Message` string. That string is the storage change notification
//! handed to `ChangeEventParser`; it is not decoded here.

use std::io::{self, Read};
use std::path::Path;

use cap_std::{ambient_authority, fs::Dir};
use serde::Deserialize;

/// Failures reading or decoding an invocation event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The event could not be read.
    #[error("failed to read event from {source_name}: {source}")]
    Read {
        /// File path or `stdin`.
        source_name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The event is not a topic event.
    #[error("event is not a valid notification event: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Topic event delivering one or more change notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct EventRecord {
    #[serde(rename = "Sns", default)]
    sns: Option<TopicMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct TopicMessage {
    #[serde(rename = "Message", default)]
    message: Option<String>,
}

impl NotificationEvent {
    /// Decode an event from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Decode`] when the text is not a JSON object of
    /// the expected shape. Records missing their message still decode.
    ///
    /// # Examples
    /// ```
    /// use report_pipeline::inbound::events::NotificationEvent;
    ///
    /// let event = NotificationEvent::from_json(r#"{"Records":[{"Sns":{"Message":"{}"}},{}]}"#)?;
    /// assert_eq!(event.messages(), vec![Some("{}"), None]);
    /// # Ok::<(), report_pipeline::inbound::events::EventError>(())
    /// ```
    pub fn from_json(text: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Message of each record in delivery order; `None` where a record has
    /// no message.
    pub fn messages(&self) -> Vec<Option<&str>> {
        self.records
            .iter()
            .map(|record| {
                record
                    .sns
                    .as_ref()
                    .and_then(|sns| sns.message.as_deref())
            })
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the event has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read event text from `path`, or from stdin when no path is given.
///
/// # Errors
///
/// Returns [`EventError::Read`] when the file or stdin cannot be read.
pub fn read_event_text(path: Option<&Path>) -> Result<String, EventError> {
    match path {
        Some(path) => read_file(path).map_err(|source| EventError::Read {
            source_name: path.display().to_string(),
            source,
        }),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| EventError::Read {
                    source_name: "stdin".to_owned(),
                    source,
                })?;
            Ok(text)
        }
    }
}

fn read_file(path: &Path) -> io::Result<String> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "event path must be a file"))?;
    let directory = Dir::open_ambient_dir(parent, ambient_authority())?;
    directory.read_to_string(Path::new(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn extracts_messages_in_order() {
        let event = NotificationEvent::from_json(
            r#"{"Records":[
                {"EventSource":"aws:sns","Sns":{"Message":"first","Subject":null}},
                {"Sns":{}},
                {"Sns":{"Message":"third"}}
            ]}"#,
        )
        .expect("event decodes");
        assert_eq!(event.len(), 3);
        assert_eq!(event.messages(), vec![Some("first"), None, Some("third")]);
    }

    #[rstest]
    #[case::no_records("{}")]
    #[case::empty_records(r#"{"Records":[]}"#)]
    fn events_without_records_are_empty(#[case] text: &str) {
        let event = NotificationEvent::from_json(text).expect("event decodes");
        assert!(event.is_empty());
    }

    #[rstest]
    #[case::not_json("Records")]
    #[case::records_not_a_list(r#"{"Records":"x"}"#)]
    fn rejects_malformed_events(#[case] text: &str) {
        let error = NotificationEvent::from_json(text).expect_err("must fail");
        assert!(matches!(error, EventError::Decode(_)));
    }

    #[test]
    fn reads_event_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("event.json");
        let root = Dir::open_ambient_dir(dir.path(), ambient_authority()).expect("open dir");
        root.write("event.json", br#"{"Records":[]}"#).expect("write event");

        let text = read_event_text(Some(&path)).expect("read event");
        assert_eq!(text, r#"{"Records":[]}"#);
    }

    #[test]
    fn missing_files_name_the_path() {
        let error = read_event_text(Some(Path::new("/nonexistent/event.json")))
            .expect_err("file is missing");
        assert!(error.to_string().contains("/nonexistent/event.json"));
    }
}
