//! Artifact validation applied before a report is handed to the mail relay.

use sha2::{Digest, Sha256};

use super::ports::define_port_error;

/// Default attachment ceiling: 25 MiB.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

define_port_error! {
    /// Reasons a downloaded artifact is refused for delivery.
    pub enum ArtifactError {
        /// The artifact has no content.
        Empty => "artifact is empty",
        /// The artifact exceeds the configured attachment ceiling.
        TooLarge { size: u64, limit: u64 } =>
            "artifact is {size} bytes, exceeding the {limit} byte limit",
    }
}

/// Check an artifact length against the attachment ceiling.
///
/// The ceiling is inclusive: an artifact of exactly `limit` bytes passes.
///
/// # Examples
/// ```
/// use report_pipeline::domain::{ArtifactError, validate_size};
///
/// assert!(validate_size(10, 10).is_ok());
/// assert_eq!(validate_size(0, 10), Err(ArtifactError::Empty));
/// ```
pub fn validate_size(byte_length: u64, limit: u64) -> Result<(), ArtifactError> {
    if byte_length == 0 {
        return Err(ArtifactError::empty());
    }
    if byte_length > limit {
        return Err(ArtifactError::too_large(byte_length, limit));
    }
    Ok(())
}

/// Hex-encoded SHA-256 digest, logged on store and delivery so the two can be
/// correlated.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LIMIT: u64 = 1_024;

    #[rstest]
    #[case::empty(0, Err(ArtifactError::Empty))]
    #[case::one_byte(1, Ok(()))]
    #[case::at_limit(LIMIT, Ok(()))]
    #[case::over_limit(LIMIT + 1, Err(ArtifactError::TooLarge { size: LIMIT + 1, limit: LIMIT }))]
    fn size_ceiling_is_inclusive(#[case] length: u64, #[case] expected: Result<(), ArtifactError>) {
        assert_eq!(validate_size(length, LIMIT), expected);
    }

    #[test]
    fn default_ceiling_is_25_mebibytes() {
        assert_eq!(DEFAULT_MAX_ATTACHMENT_BYTES, 26_214_400);
        assert!(validate_size(DEFAULT_MAX_ATTACHMENT_BYTES, DEFAULT_MAX_ATTACHMENT_BYTES).is_ok());
    }

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
