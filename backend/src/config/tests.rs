//! Validation of raw settings into runtime configs.

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::MockSecretResolver;

#[fixture]
fn metabase() -> MetabaseSettings {
    MetabaseSettings {
        url: Some("http://bi.internal:3000".to_owned()),
        username: Some("ops@example.com".to_owned()),
        password: None,
        password_kms: Some("Y2lwaGVy".to_owned()),
        device_uuid: Some(" ".to_owned()),
        card_id: None,
    }
}

#[fixture]
fn notifier() -> NotifierSettings {
    NotifierSettings {
        smtp_host: Some("smtp.example.com".to_owned()),
        smtp_port: None,
        smtp_username: Some("mailer".to_owned()),
        smtp_password: Some("relay-pass".to_owned()),
        smtp_password_kms: None,
        from_address: Some("reports@example.com".to_owned()),
        recipients: Some("a@example.com, b@example.com".to_owned()),
        subject_label: None,
        include_card_id: false,
        max_attachment_bytes: None,
        html_body: None,
        card_id: Some("12".to_owned()),
    }
}

#[rstest]
fn metabase_config_prefers_plaintext_password(mut metabase: MetabaseSettings) {
    metabase.password = Some("plain".to_owned());
    let config = MetabaseConfig::from_settings(&metabase).expect("valid settings");
    assert!(!config.password.needs_decryption());
    assert!(config.device_uuid.is_none());
}

#[rstest]
fn metabase_config_requires_a_password_source(mut metabase: MetabaseSettings) {
    metabase.password_kms = None;
    let error = MetabaseConfig::from_settings(&metabase).expect_err("no password");
    assert!(matches!(
        error,
        ConfigError::Missing { name } if name.starts_with("METABASE_PASSWORD")
    ));
}

#[rstest]
fn producer_needs_a_card_id(metabase: MetabaseSettings) {
    let config = MetabaseConfig::from_settings(&metabase).expect("valid settings");
    let error = config.require_card_id().expect_err("card id unset");
    assert_eq!(error.to_string(), "missing required configuration METABASE_CARD_ID");
}

#[rstest]
#[tokio::test]
async fn encrypted_passwords_are_decrypted(metabase: MetabaseSettings) {
    let config = MetabaseConfig::from_settings(&metabase).expect("valid settings");
    let mut resolver = MockSecretResolver::new();
    resolver
        .expect_decrypt()
        .withf(|ciphertext| ciphertext.to_owned() == "Y2lwaGVy")
        .times(1)
        .returning(|_| Ok("decrypted".to_owned()));

    let password = config
        .password
        .reveal(Some(&resolver))
        .await
        .expect("decrypts");
    assert_eq!(password.as_str(), "decrypted");
}

#[rstest]
#[tokio::test]
async fn encrypted_passwords_need_a_resolver(metabase: MetabaseSettings) {
    let config = MetabaseConfig::from_settings(&metabase).expect("valid settings");
    let error = config.password.reveal(None).await.expect_err("no resolver");
    assert!(matches!(error, ConfigError::Missing { name: "AWS_REGION" }));
}

#[rstest]
fn notifier_config_applies_defaults(notifier: NotifierSettings) {
    let config = NotifierConfig::from_settings(&notifier).expect("valid settings");
    assert_eq!(config.smtp_port, 587);
    let distribution = &config.distribution;
    assert_eq!(distribution.subject_label, "Report");
    assert_eq!(distribution.html_body, "");
    assert_eq!(distribution.max_attachment_bytes, 26_214_400);
    assert_eq!(distribution.recipients, ["a@example.com", "b@example.com"]);
    assert_eq!(distribution.card_id, CardId::new("12"));
}

#[rstest]
#[case::no_host(|s: &mut NotifierSettings| s.smtp_host = None, "NOTIFIER_SMTP_HOST")]
#[case::no_sender(|s: &mut NotifierSettings| s.from_address = Some(String::new()), "NOTIFIER_FROM_ADDRESS")]
#[case::no_card(|s: &mut NotifierSettings| s.card_id = None, "NOTIFIER_CARD_ID")]
#[case::no_recipients(|s: &mut NotifierSettings| s.recipients = None, "NOTIFIER_RECIPIENTS")]
fn notifier_config_names_missing_values(
    mut notifier: NotifierSettings,
    #[case] mutate: fn(&mut NotifierSettings),
    #[case] expected: &str,
) {
    mutate(&mut notifier);
    let error = NotifierConfig::from_settings(&notifier).expect_err("must fail");
    assert!(matches!(error, ConfigError::Missing { name } if name == expected));
}

#[rstest]
fn username_without_password_is_rejected(mut notifier: NotifierSettings) {
    notifier.smtp_password = None;
    let error = NotifierConfig::from_settings(&notifier).expect_err("must fail");
    assert!(matches!(error, ConfigError::Missing { .. }));
}

#[rstest]
fn zero_attachment_ceiling_is_invalid(mut notifier: NotifierSettings) {
    notifier.max_attachment_bytes = Some(0);
    let error = NotifierConfig::from_settings(&notifier).expect_err("must fail");
    assert!(matches!(
        error,
        ConfigError::Invalid { name: "NOTIFIER_MAX_ATTACHMENT_BYTES", .. }
    ));
}

#[rstest]
#[tokio::test]
async fn relay_carries_the_plaintext_password(notifier: NotifierSettings) {
    let config = NotifierConfig::from_settings(&notifier).expect("valid settings");
    let relay = config.relay(None).await.expect("plaintext needs no resolver");
    assert_eq!(relay.password.as_deref(), Some("relay-pass"));
    assert_eq!(relay.username.as_deref(), Some("mailer"));
}

#[rstest]
#[case(" , ,")]
#[case("")]
fn recipient_lists_must_not_be_empty(#[case] raw: &str) {
    assert!(matches!(
        parse_recipients(raw),
        Err(ConfigError::Invalid { name: "NOTIFIER_RECIPIENTS", .. })
    ));
}

#[test]
fn storage_prefers_bucket_over_local_root() {
    let settings = StorageSettings {
        bucket: Some("reports".to_owned()),
        local_root: Some(PathBuf::from("/tmp/reports")),
    };
    assert_eq!(
        StorageTarget::from_settings(&settings).expect("valid"),
        StorageTarget::S3 {
            bucket: "reports".to_owned()
        }
    );

    let local_only = StorageSettings {
        bucket: None,
        local_root: Some(PathBuf::from("/tmp/reports")),
    };
    assert_eq!(
        StorageTarget::from_settings(&local_only).expect("valid"),
        StorageTarget::Local {
            root: PathBuf::from("/tmp/reports")
        }
    );
}

#[test]
fn storage_requires_a_location() {
    let settings = StorageSettings {
        bucket: None,
        local_root: None,
    };
    assert!(StorageTarget::from_settings(&settings).is_err());
}
