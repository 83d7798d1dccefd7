//! Runtime configuration for the pipeline drivers.
//!
//! Raw environment settings (see [`settings`]) are validated into typed
//! configs here. Missing required values fail with [`ConfigError::Missing`]
//! naming the environment variable.

mod settings;

use std::path::PathBuf;

use zeroize::Zeroizing;

pub use self::settings::{
    AwsSettings, MetabaseSettings, NotifierSettings, StorageSettings, load_settings,
};
use crate::domain::ports::{ContentStoreError, SecretError, SecretResolver};
use crate::domain::{CardId, DEFAULT_MAX_ATTACHMENT_BYTES, DistributionSettings};
use crate::outbound::mail::{DEFAULT_SMTP_PORT, SmtpRelay};
use crate::outbound::secrets::KmsSecretResolver;
use crate::outbound::storage::ObjectStoreContentStore;

const DEFAULT_SUBJECT_LABEL: &str = "Report";

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required configuration {name}")]
    Missing {
        /// Environment variable name.
        name: &'static str,
    },
    /// A variable is set but unusable.
    #[error("invalid configuration {name}: {message}")]
    Invalid {
        /// Environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },
    /// The environment could not be loaded.
    #[error("failed to load configuration: {0}")]
    Load(String),
    /// An encrypted secret could not be decrypted.
    #[error(transparent)]
    Secret(#[from] SecretError),
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::Missing { name })
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Where a secret comes from: a plaintext value or a KMS ciphertext.
#[derive(Clone)]
pub enum SecretSource {
    /// Plaintext supplied directly.
    Plain(Zeroizing<String>),
    /// Base64 KMS ciphertext to decrypt.
    Encrypted(String),
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain(<redacted>)"),
            Self::Encrypted(_) => f.write_str("Encrypted(..)"),
        }
    }
}

impl SecretSource {
    /// Choose between a plaintext and a ciphertext; plaintext wins.
    ///
    /// Returns `None` when neither is set.
    pub fn select(plain: Option<&str>, encrypted: Option<&str>) -> Option<Self> {
        optional(plain)
            .map(|value| Self::Plain(Zeroizing::new(value)))
            .or_else(|| optional(encrypted).map(Self::Encrypted))
    }

    /// Whether revealing this secret needs the decrypt oracle.
    pub fn needs_decryption(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    /// Produce the plaintext, decrypting through `resolver` when needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming `AWS_REGION` when a ciphertext
    /// must be decrypted but no resolver is available, or the resolver's
    /// failure.
    pub async fn reveal(
        &self,
        resolver: Option<&dyn SecretResolver>,
    ) -> Result<Zeroizing<String>, ConfigError> {
        match self {
            Self::Plain(value) => Ok(value.clone()),
            Self::Encrypted(ciphertext) => {
                let resolver = resolver.ok_or(ConfigError::Missing { name: "AWS_REGION" })?;
                Ok(Zeroizing::new(resolver.decrypt(ciphertext).await?))
            }
        }
    }
}

/// Validated BI service configuration.
#[derive(Debug, Clone)]
pub struct MetabaseConfig {
    /// Base URL.
    pub base_url: String,
    /// Login email.
    pub username: String,
    /// Login password source.
    pub password: SecretSource,
    /// Optional device cookie value.
    pub device_uuid: Option<String>,
    /// Card exported by the producer, when configured.
    pub card_id: Option<CardId>,
}

impl MetabaseConfig {
    /// Validate raw settings.
    ///
    /// # Errors
    ///
    /// Fails when the URL, username, or both password sources are missing.
    pub fn from_settings(settings: &MetabaseSettings) -> Result<Self, ConfigError> {
        let password = SecretSource::select(
            settings.password.as_deref(),
            settings.password_kms.as_deref(),
        )
        .ok_or(ConfigError::Missing {
            name: "METABASE_PASSWORD or METABASE_PASSWORD_KMS",
        })?;
        Ok(Self {
            base_url: required(settings.url.as_deref(), "METABASE_URL")?,
            username: required(settings.username.as_deref(), "METABASE_USERNAME")?,
            password,
            device_uuid: optional(settings.device_uuid.as_deref()),
            card_id: optional(settings.card_id.as_deref()).map(CardId::new),
        })
    }

    /// Card id, required by the producer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for `METABASE_CARD_ID`.
    pub fn require_card_id(&self) -> Result<&CardId, ConfigError> {
        self.card_id.as_ref().ok_or(ConfigError::Missing {
            name: "METABASE_CARD_ID",
        })
    }
}

/// Validated content store location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// S3 bucket.
    S3 {
        /// Bucket name.
        bucket: String,
    },
    /// Local directory.
    Local {
        /// Root directory.
        root: PathBuf,
    },
}

impl StorageTarget {
    /// Validate raw settings; a bucket wins over a local root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither is set.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, ConfigError> {
        if let Some(bucket) = optional(settings.bucket.as_deref()) {
            return Ok(Self::S3 { bucket });
        }
        settings
            .local_root
            .clone()
            .filter(|root| !root.as_os_str().is_empty())
            .map(|root| Self::Local { root })
            .ok_or(ConfigError::Missing {
                name: "STORAGE_BUCKET or STORAGE_LOCAL_ROOT",
            })
    }

    /// Open the content store for this target.
    ///
    /// # Errors
    ///
    /// Propagates backend construction failures.
    pub fn open(&self) -> Result<ObjectStoreContentStore, ContentStoreError> {
        match self {
            Self::S3 { bucket } => ObjectStoreContentStore::s3(bucket),
            Self::Local { root } => ObjectStoreContentStore::local(root),
        }
    }
}

/// Validated distributor configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Relay host.
    pub smtp_host: String,
    /// Relay port.
    pub smtp_port: u16,
    /// Relay login user.
    pub smtp_username: Option<String>,
    /// Relay password source; required when a username is set.
    pub smtp_password: Option<SecretSource>,
    /// Email content settings.
    pub distribution: DistributionSettings,
}

impl NotifierConfig {
    /// Validate raw settings.
    ///
    /// # Errors
    ///
    /// Fails on missing host, sender, recipients or card id, an empty
    /// recipient list, a zero attachment ceiling, or a username without a
    /// password.
    pub fn from_settings(settings: &NotifierSettings) -> Result<Self, ConfigError> {
        let smtp_username = optional(settings.smtp_username.as_deref());
        let smtp_password = SecretSource::select(
            settings.smtp_password.as_deref(),
            settings.smtp_password_kms.as_deref(),
        );
        if smtp_username.is_some() && smtp_password.is_none() {
            return Err(ConfigError::Missing {
                name: "NOTIFIER_SMTP_PASSWORD or NOTIFIER_SMTP_PASSWORD_KMS",
            });
        }

        let max_attachment_bytes = settings
            .max_attachment_bytes
            .unwrap_or(DEFAULT_MAX_ATTACHMENT_BYTES);
        if max_attachment_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: "NOTIFIER_MAX_ATTACHMENT_BYTES",
                message: "must be greater than zero".to_owned(),
            });
        }

        let recipients = parse_recipients(&required(
            settings.recipients.as_deref(),
            "NOTIFIER_RECIPIENTS",
        )?)?;
        let card_id = CardId::new(required(settings.card_id.as_deref(), "NOTIFIER_CARD_ID")?);
        let distribution = DistributionSettings {
            subject_label: optional(settings.subject_label.as_deref())
                .unwrap_or_else(|| DEFAULT_SUBJECT_LABEL.to_owned()),
            include_card_id: settings.include_card_id,
            html_body: settings.html_body.clone().unwrap_or_default(),
            max_attachment_bytes,
            ..DistributionSettings::new(
                required(settings.from_address.as_deref(), "NOTIFIER_FROM_ADDRESS")?,
                recipients,
                card_id,
            )
        };

        Ok(Self {
            smtp_host: required(settings.smtp_host.as_deref(), "NOTIFIER_SMTP_HOST")?,
            smtp_port: settings.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            smtp_username,
            smtp_password,
            distribution,
        })
    }

    /// Build relay settings, revealing the password if one is configured.
    ///
    /// # Errors
    ///
    /// Propagates secret resolution failures.
    pub async fn relay(
        &self,
        resolver: Option<&dyn SecretResolver>,
    ) -> Result<SmtpRelay, ConfigError> {
        let password = match &self.smtp_password {
            Some(source) => Some(source.reveal(resolver).await?.to_string()),
            None => None,
        };
        Ok(SmtpRelay {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password,
        })
    }
}

/// Build the KMS decrypt oracle when at least one secret is encrypted.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] for `AWS_REGION` when decryption is
/// needed but no region is configured.
pub async fn decrypt_oracle<'a, I>(
    program: &str,
    sources: I,
) -> Result<Option<KmsSecretResolver>, ConfigError>
where
    I: IntoIterator<Item = &'a SecretSource>,
{
    if !sources.into_iter().any(SecretSource::needs_decryption) {
        return Ok(None);
    }
    let aws: AwsSettings = load_settings(program)?;
    let region = required(aws.region.as_deref(), "AWS_REGION")?;
    Ok(Some(KmsSecretResolver::from_region(&region).await))
}

/// Split a comma-separated recipient list, dropping blank entries.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when no address remains.
///
/// # Examples
/// ```
/// use report_pipeline::config::parse_recipients;
///
/// let recipients = parse_recipients("a@example.com, b@example.com,")?;
/// assert_eq!(recipients, ["a@example.com", "b@example.com"]);
/// # Ok::<(), report_pipeline::config::ConfigError>(())
/// ```
pub fn parse_recipients(raw: &str) -> Result<Vec<String>, ConfigError> {
    let recipients: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_owned)
        .collect();
    if recipients.is_empty() {
        return Err(ConfigError::Invalid {
            name: "NOTIFIER_RECIPIENTS",
            message: "no recipient addresses".to_owned(),
        });
    }
    Ok(recipients)
}

#[cfg(test)]
mod tests;
