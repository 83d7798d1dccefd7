//! Storage keys shared by the producer and the distributor.
//!
//! Keys are date-partitioned and derived from the UTC clock:
//! `{yyyy}/{MM}/{dd}/{prefix}-{yyyy-MM-dd}T{HH-mm-ss}.xlsx`. Two writes with
//! the same prefix in the same second collide; that is accepted.

use std::fmt;

use chrono::{DateTime, Utc};

/// Key of one stored report object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive the key for a new report written at `now` (UTC).
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use report_pipeline::domain::ObjectKey;
    ///
    /// let now = Utc.with_ymd_and_hms(2011, 12, 3, 10, 15, 30).single().expect("valid time");
    /// let key = ObjectKey::derive("card1", now);
    /// assert_eq!(key.as_str(), "2011/12/03/card1-2011-12-03T10-15-30.xlsx");
    /// ```
    pub fn derive(name_prefix: &str, now: DateTime<Utc>) -> Self {
        Self(format!(
            "{partition}/{name_prefix}-{stamp}.xlsx",
            partition = now.format("%Y/%m/%d"),
            stamp = now.format("%Y-%m-%dT%H-%M-%S"),
        ))
    }

    /// Wrap a key received from elsewhere, rejecting blank input.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Full key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `/`-delimited segment, used as the attachment file name.
    pub fn file_name(&self) -> &str {
        derive_file_name(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Last `/`-delimited segment of a storage key.
///
/// # Examples
/// ```
/// use report_pipeline::domain::derive_file_name;
///
/// assert_eq!(
///     derive_file_name("2023/04/04/card-1_2011-12-03T10_15_30.xlsx"),
///     "card-1_2011-12-03T10_15_30.xlsx"
/// );
/// ```
pub fn derive_file_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}
