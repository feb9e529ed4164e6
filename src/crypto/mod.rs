//! # Crypto Module
//!
//! Root key lifecycle and the envelope encryption engine, organized by
//! responsibility:
//!
//! - `root_key` - the root key triplet, its codec, and the reader/writer-locked
//!   [`KeyStore`] that owns the process-wide key material
//! - `cipher` - the [`EnvelopeCipher`] with the AES-CFB and sealed-envelope
//!   paths
//! - `error` - the crypto error taxonomy

pub mod cipher;
pub mod error;
pub mod root_key;

pub use cipher::{Algorithm, EnvelopeCipher};
pub use error::CryptoError;
pub use root_key::{combine, random_string, split, KeyStore, RootKeyCollection};
