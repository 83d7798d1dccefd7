//! Environment settings loaded via OrthoConfig.
//!
//! Each struct owns one environment prefix. Values are raw; validation into
//! runtime configs happens in the parent module.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Deserializer};

use super::ConfigError;

/// Load settings of type `T` from the environment only.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] when OrthoConfig rejects the environment.
pub fn load_settings<T: OrthoConfig>(program: &str) -> Result<T, ConfigError> {
    T::load_from_iter([OsString::from(program)])
        .map_err(|err| ConfigError::Load(err.to_string()))
}

/// Scalar the environment layer may produce for a text setting.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Signed(number) => number.to_string(),
            Self::Unsigned(number) => number.to_string(),
            Self::Float(number) => number.to_string(),
            Self::Flag(flag) => flag.to_string(),
        }
    }
}

/// Read an optional text setting, accepting values the environment layer
/// has already typed as numbers or booleans (`METABASE_CARD_ID=42`).
fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|value| value.map(Scalar::into_text))
}

/// BI service connection (`METABASE_*`).
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "METABASE")]
pub struct MetabaseSettings {
    /// Base URL of the BI service.
    #[serde(default, deserialize_with = "optional_text")]
    pub url: Option<String>,
    /// Login email.
    #[serde(default, deserialize_with = "optional_text")]
    pub username: Option<String>,
    /// Plaintext password; wins over `password_kms`.
    #[serde(default, deserialize_with = "optional_text")]
    pub password: Option<String>,
    /// Base64 KMS ciphertext of the password.
    #[serde(default, deserialize_with = "optional_text")]
    pub password_kms: Option<String>,
    /// Device id sent as the `metabase.DEVICE` cookie.
    #[serde(default, deserialize_with = "optional_text")]
    pub device_uuid: Option<String>,
    /// Card exported by the producer.
    #[serde(default, deserialize_with = "optional_text")]
    pub card_id: Option<String>,
}

impl fmt::Debug for MetabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetabaseSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_kms", &self.password_kms.is_some())
            .field("device_uuid", &self.device_uuid)
            .field("card_id", &self.card_id)
            .finish()
    }
}

/// Content store location (`STORAGE_*`).
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STORAGE")]
pub struct StorageSettings {
    /// S3 bucket name.
    #[serde(default, deserialize_with = "optional_text")]
    pub bucket: Option<String>,
    /// Local directory used instead of a bucket.
    pub local_root: Option<PathBuf>,
}

/// Mail relay and email content (`NOTIFIER_*`).
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "NOTIFIER")]
pub struct NotifierSettings {
    /// SMTP relay host.
    #[serde(default, deserialize_with = "optional_text")]
    pub smtp_host: Option<String>,
    /// SMTP relay port; defaults to 587.
    pub smtp_port: Option<u16>,
    /// SMTP login user.
    #[serde(default, deserialize_with = "optional_text")]
    pub smtp_username: Option<String>,
    /// Plaintext SMTP password; wins over `smtp_password_kms`.
    #[serde(default, deserialize_with = "optional_text")]
    pub smtp_password: Option<String>,
    /// Base64 KMS ciphertext of the SMTP password.
    #[serde(default, deserialize_with = "optional_text")]
    pub smtp_password_kms: Option<String>,
    /// Sender address.
    #[serde(default, deserialize_with = "optional_text")]
    pub from_address: Option<String>,
    /// Comma-separated recipient addresses.
    #[serde(default, deserialize_with = "optional_text")]
    pub recipients: Option<String>,
    /// Subject label; defaults to `Report`.
    #[serde(default, deserialize_with = "optional_text")]
    pub subject_label: Option<String>,
    /// Prefix the subject with the card id.
    #[ortho_config(default = false)]
    pub include_card_id: bool,
    /// Attachment ceiling override in bytes.
    pub max_attachment_bytes: Option<u64>,
    /// HTML body; defaults to empty.
    #[serde(default, deserialize_with = "optional_text")]
    pub html_body: Option<String>,
    /// Card whose reports are distributed.
    #[serde(default, deserialize_with = "optional_text")]
    pub card_id: Option<String>,
}

impl fmt::Debug for NotifierSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .field("smtp_password_kms", &self.smtp_password_kms.is_some())
            .field("from_address", &self.from_address)
            .field("recipients", &self.recipients)
            .field("subject_label", &self.subject_label)
            .field("include_card_id", &self.include_card_id)
            .field("max_attachment_bytes", &self.max_attachment_bytes)
            .field("card_id", &self.card_id)
            .finish_non_exhaustive()
    }
}

/// Decrypt oracle location (`AWS_*`).
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AWS")]
pub struct AwsSettings {
    /// Region of the KMS key.
    #[serde(default, deserialize_with = "optional_text")]
    pub region: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Environment parsing for each settings prefix.

    use super::*;

    use env_lock::lock_env;
    use rstest::rstest;

    const PROGRAM: &str = "report-pipeline";

    #[rstest]
    fn metabase_settings_read_prefixed_variables() {
        let _guard = lock_env([
            ("METABASE_URL", Some("http://bi.internal:3000".to_owned())),
            ("METABASE_USERNAME", Some("ops@example.com".to_owned())),
            ("METABASE_PASSWORD", None::<String>),
            ("METABASE_PASSWORD_KMS", Some("c2VjcmV0".to_owned())),
            ("METABASE_DEVICE_UUID", None::<String>),
            ("METABASE_CARD_ID", Some("42".to_owned())),
        ]);

        let settings: MetabaseSettings = load_settings(PROGRAM).expect("settings load");
        assert_eq!(settings.url.as_deref(), Some("http://bi.internal:3000"));
        assert_eq!(settings.username.as_deref(), Some("ops@example.com"));
        assert!(settings.password.is_none());
        assert_eq!(settings.password_kms.as_deref(), Some("c2VjcmV0"));
        assert_eq!(settings.card_id.as_deref(), Some("42"));
    }

    #[rstest]
    fn numeric_looking_text_settings_stay_text() {
        let _guard = lock_env([
            ("NOTIFIER_CARD_ID", Some("12".to_owned())),
            ("NOTIFIER_SMTP_PASSWORD", Some("123456".to_owned())),
            ("NOTIFIER_SUBJECT_LABEL", Some("2024".to_owned())),
            ("NOTIFIER_SMTP_PORT", None::<String>),
        ]);

        let settings: NotifierSettings = load_settings(PROGRAM).expect("settings load");
        assert_eq!(settings.card_id.as_deref(), Some("12"));
        assert_eq!(settings.smtp_password.as_deref(), Some("123456"));
        assert_eq!(settings.subject_label.as_deref(), Some("2024"));
    }

    #[derive(Debug, Deserialize)]
    struct TextOnly {
        #[serde(default, deserialize_with = "optional_text")]
        value: Option<String>,
    }

    #[rstest]
    #[case::text(serde_json::json!({ "value": "abc" }), Some("abc"))]
    #[case::integer(serde_json::json!({ "value": 42 }), Some("42"))]
    #[case::negative(serde_json::json!({ "value": -7 }), Some("-7"))]
    #[case::float(serde_json::json!({ "value": 1.5 }), Some("1.5"))]
    #[case::flag(serde_json::json!({ "value": true }), Some("true"))]
    #[case::null(serde_json::json!({ "value": null }), None)]
    #[case::absent(serde_json::json!({}), None)]
    fn text_settings_accept_typed_scalars(
        #[case] raw: serde_json::Value,
        #[case] expected: Option<&str>,
    ) {
        let parsed: TextOnly = serde_json::from_value(raw).expect("scalar is accepted");
        assert_eq!(parsed.value.as_deref(), expected);
    }

    #[rstest]
    fn notifier_defaults_apply_when_unset() {
        let _guard = lock_env([
            ("NOTIFIER_SMTP_HOST", None::<String>),
            ("NOTIFIER_SMTP_PORT", None::<String>),
            ("NOTIFIER_INCLUDE_CARD_ID", None::<String>),
            ("NOTIFIER_MAX_ATTACHMENT_BYTES", None::<String>),
            ("NOTIFIER_RECIPIENTS", None::<String>),
        ]);

        let settings: NotifierSettings = load_settings(PROGRAM).expect("settings load");
        assert!(!settings.include_card_id);
        assert!(settings.smtp_port.is_none());
        assert!(settings.max_attachment_bytes.is_none());
        assert!(settings.recipients.is_none());
    }

    #[rstest]
    fn notifier_overrides_are_typed() {
        let _guard = lock_env([
            ("NOTIFIER_SMTP_PORT", Some("2525".to_owned())),
            ("NOTIFIER_INCLUDE_CARD_ID", Some("true".to_owned())),
            ("NOTIFIER_MAX_ATTACHMENT_BYTES", Some("1024".to_owned())),
        ]);

        let settings: NotifierSettings = load_settings(PROGRAM).expect("settings load");
        assert_eq!(settings.smtp_port, Some(2525));
        assert!(settings.include_card_id);
        assert_eq!(settings.max_attachment_bytes, Some(1024));
    }

    #[test]
    fn debug_output_hides_passwords() {
        let settings = MetabaseSettings {
            url: None,
            username: Some("ops@example.com".to_owned()),
            password: Some("hunter2".to_owned()),
            password_kms: None,
            device_uuid: None,
            card_id: None,
        };
        let rendered = format!("{settings:?}");
        assert!(rendered.contains("ops@example.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
