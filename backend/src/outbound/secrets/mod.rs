//! AWS KMS decrypt oracle for credentials stored as base64 ciphertext.

use async_trait::async_trait;
use aws_sdk_kms::Client;
use aws_sdk_kms::primitives::Blob;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{error, info};
use zeroize::Zeroizing;

use crate::domain::ports::{SecretError, SecretResolver};

/// `SecretResolver` backed by AWS KMS `Decrypt`.
pub struct KmsSecretResolver {
    client: Client,
}

impl KmsSecretResolver {
    /// Build a resolver for `region` using the default credential chain.
    pub async fn from_region(region: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_owned()))
            .load()
            .await;
        info!(region, "kms client created");
        Self::new(Client::new(&sdk_config))
    }

    /// Wrap an existing KMS client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretResolver for KmsSecretResolver {
    async fn decrypt(&self, ciphertext: &str) -> Result<String, SecretError> {
        let blob = decode_ciphertext(ciphertext)?;
        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(blob))
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "kms decrypt failed");
                SecretError::decrypt(err.to_string())
            })?;
        let plaintext = output
            .plaintext
            .ok_or_else(|| SecretError::decrypt("kms response carried no plaintext"))?;
        plaintext_to_string(Zeroizing::new(plaintext.into_inner()))
    }
}

fn decode_ciphertext(ciphertext: &str) -> Result<Vec<u8>, SecretError> {
    let trimmed = ciphertext.trim();
    if trimmed.is_empty() {
        return Err(SecretError::decode("ciphertext is empty"));
    }
    STANDARD
        .decode(trimmed)
        .map_err(|err| SecretError::decode(format!("ciphertext is not base64: {err}")))
}

fn plaintext_to_string(plaintext: Zeroizing<Vec<u8>>) -> Result<String, SecretError> {
    String::from_utf8(plaintext.to_vec())
        .map_err(|_| SecretError::decode("plaintext is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn decodes_padded_base64() {
        assert_eq!(
            decode_ciphertext(" c2VjcmV0 \n").expect("valid base64"),
            b"secret".to_vec()
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::not_base64("not*base64!")]
    fn rejects_unusable_ciphertext(#[case] ciphertext: &str) {
        let error = decode_ciphertext(ciphertext).expect_err("must be rejected");
        assert_eq!(error.kind(), "Decode");
    }

    #[test]
    fn plaintext_must_be_utf8() {
        let error = plaintext_to_string(Zeroizing::new(vec![0xff, 0xfe])).expect_err("invalid utf-8");
        assert_eq!(error, SecretError::decode("plaintext is not valid UTF-8"));
        assert_eq!(
            plaintext_to_string(Zeroizing::new(b"pw".to_vec())).expect("utf-8"),
            "pw"
        );
    }
}
