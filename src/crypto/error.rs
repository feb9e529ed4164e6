//! # Crypto Error Types
//!
//! Error taxonomy for the envelope encryption engine. Every variant here is
//! deterministic: retrying cannot fix a malformed triplet or a truncated
//! ciphertext, so callers must treat these as invariant violations. The one
//! exception is [`CryptoError::CallsTooFrequent`], which clears after the
//! configured IV interval has elapsed.

use thiserror::Error;

/// Envelope encryption and key lifecycle errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Symmetric encryption requested but the key store holds no AES seed
    #[error("no AES key")]
    NoAesKey,

    /// Asymmetric encryption requested but the key store holds no public key
    #[error("no public key")]
    NoPublicKey,

    /// Asymmetric decryption requested but the key store holds no private key
    #[error("no private key")]
    NoPrivateKey,

    /// AES encryption invoked before the minimum IV-generation interval
    /// elapsed; retryable after waiting out the interval
    #[error("calls too frequent")]
    CallsTooFrequent,

    /// Ciphertext shorter than the minimum frame (IV prefix)
    #[error("ciphertext too short")]
    CiphertextTooShort,

    /// Serialized root key did not contain exactly three parts
    #[error("malformed root key triplet")]
    MalformedTriplet,

    /// Symmetric key decoded to a length the cipher does not accept
    #[error("invalid key length")]
    InvalidKeyLength,

    /// Key material failed to parse (bad hex, wrong point size)
    #[error("failed to parse key material: {0}")]
    InvalidKey(String),

    #[error("invalid hex encoding")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid base64 encoding")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Authenticated decryption failed: wrong key or tampered ciphertext
    #[error("failed to open sealed envelope")]
    OpenFailed,

    /// AEAD encryption failed
    #[error("failed to seal envelope")]
    SealFailed,

    /// Decrypted payload was not valid UTF-8
    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext(#[from] std::string::FromUtf8Error),
}

impl CryptoError {
    /// Whether waiting and retrying can clear this error
    pub fn is_transient(&self) -> bool {
        matches!(self, CryptoError::CallsTooFrequent)
    }
}
