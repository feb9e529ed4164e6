//! # Root Key Lifecycle
//!
//! The root key collection is the master key material for the Safe: an
//! X25519 keypair for sealed envelopes plus a 256-bit AES seed for the
//! FIPS-compliant symmetric path. A [`KeyStore`] owns the process-wide
//! collection behind a reader/writer lock; it is created empty, set once
//! during bootstrap, and re-set only by an explicit operator-driven rotation.
//!
//! The collection is either fully empty or fully populated. There is no
//! valid partially-populated state.

use crate::constants::ROOT_KEY_SEPARATOR;
use crate::crypto::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::RwLock;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The three pieces of root key material, all string-encoded
///
/// `private_key` and `public_key` are hex-encoded X25519 points; `aes_seed`
/// is a hex-encoded 256-bit symmetric key.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RootKeyCollection {
    pub private_key: String,
    pub public_key: String,
    pub aes_seed: String,
}

// Key material stays out of logs.
impl std::fmt::Debug for RootKeyCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKeyCollection")
            .field("private_key", &"[redacted]")
            .field("public_key", &self.public_key)
            .field("aes_seed", &"[redacted]")
            .finish()
    }
}

impl RootKeyCollection {
    /// Join the three parts into the canonical serialized form:
    /// `private\npublic\naes`
    pub fn combine(&self) -> String {
        combine(&self.private_key, &self.public_key, &self.aes_seed)
    }

    /// Whether no key material is present
    pub fn is_empty(&self) -> bool {
        self.private_key.is_empty() && self.public_key.is_empty() && self.aes_seed.is_empty()
    }

    /// Parse the canonical serialized form
    ///
    /// Anything other than exactly three parts yields an empty collection
    /// and an error. The stored state never holds a partial triplet.
    pub fn from_serialized(serialized: &str) -> Result<Self, CryptoError> {
        let (private_key, public_key, aes_seed) = split(serialized)?;
        Ok(Self {
            private_key,
            public_key,
            aes_seed,
        })
    }
}

/// Join a private key, public key, and AES seed into a single string,
/// separating each with a newline
pub fn combine(private_key: &str, public_key: &str, aes_seed: &str) -> String {
    format!("{private_key}{ROOT_KEY_SEPARATOR}{public_key}{ROOT_KEY_SEPARATOR}{aes_seed}")
}

/// Split a serialized triplet into its three parts
///
/// Requires exactly three newline-separated parts.
pub fn split(serialized: &str) -> Result<(String, String, String), CryptoError> {
    let parts: Vec<&str> = serialized.split(ROOT_KEY_SEPARATOR).collect();
    if parts.len() != 3 {
        return Err(CryptoError::MalformedTriplet);
    }
    Ok((parts[0].into(), parts[1].into(), parts[2].into()))
}

/// Reader/writer-locked owner of the process root key material
///
/// Readers (every encrypt/decrypt call) take the shared lock; writers
/// (bootstrap, operator-driven rotation) are rare and serialized against
/// both each other and the readers.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<RootKeyCollection>,
}

impl KeyStore {
    /// Create an empty store; no key material is present until [`set`] runs
    ///
    /// [`set`]: KeyStore::set
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored collection with the parsed triplet, atomically
    ///
    /// Malformed input (not exactly three parts) clears the stored
    /// collection and reports the problem to the caller.
    pub fn set(&self, serialized: &str) -> Result<(), CryptoError> {
        let mut guard = self.keys.write().expect("root key lock poisoned");
        match RootKeyCollection::from_serialized(serialized) {
            Ok(collection) => {
                *guard = collection;
                Ok(())
            }
            Err(e) => {
                *guard = RootKeyCollection::default();
                Err(e)
            }
        }
    }

    /// A copy of the current collection; empty if unset
    pub fn get(&self) -> RootKeyCollection {
        self.keys.read().expect("root key lock poisoned").clone()
    }

    /// Whether key material has been set
    pub fn is_set(&self) -> bool {
        !self.keys.read().expect("root key lock poisoned").is_empty()
    }

    /// Produce a fresh collection without storing it
    ///
    /// Callers decide whether the generated material becomes the active
    /// root key; persisting and then calling [`set`] is the bootstrap
    /// path, printing it is the keygen tooling path.
    ///
    /// [`set`]: KeyStore::set
    pub fn generate(&self) -> Result<RootKeyCollection, CryptoError> {
        generate_collection()
    }
}

/// Generate a fresh X25519 keypair plus a random 256-bit AES seed
pub fn generate_collection() -> Result<RootKeyCollection, CryptoError> {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    Ok(RootKeyCollection {
        private_key: hex::encode(secret.to_bytes()),
        public_key: hex::encode(public.as_bytes()),
        aes_seed: generate_aes_seed()?,
    })
}

/// Generate a random 256-bit AES key, hex-encoded
fn generate_aes_seed() -> Result<String, CryptoError> {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let encoded = hex::encode(seed);
    seed.zeroize();
    Ok(encoded)
}

/// Generate a cryptographically-unique secure random string
///
/// Used for correlation ids in bootstrap logging.
pub fn random_string(n: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut bytes = vec![0u8; n];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| LETTERS[(*b as usize) % LETTERS.len()] as char)
        .collect()
}
