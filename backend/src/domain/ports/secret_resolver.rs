//! Driven port for the credential decrypt oracle.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failures turning a ciphertext into a usable secret.
    pub enum SecretError {
        /// Ciphertext or plaintext is not in the expected encoding.
        Decode { message: String } => "secret decode failed: {message}",
        /// The oracle refused or failed the decryption.
        Decrypt { message: String } => "secret decryption failed: {message}",
    }
}

/// Opaque decrypt oracle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Decrypt a ciphertext blob into its plaintext.
    async fn decrypt(&self, ciphertext: &str) -> Result<String, SecretError>;
}
