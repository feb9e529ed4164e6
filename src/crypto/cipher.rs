//! # Envelope Cipher
//!
//! Encrypts and decrypts secret payloads with the key material held by the
//! [`KeyStore`]. Two paths exist:
//!
//! - **Symmetric (FIPS-compliant mode)**: AES-256-CFB with a random 16-byte
//!   IV prefixed to the ciphertext. IV generation is rate-limited; see
//!   [`EnvelopeCipher::encrypt`].
//! - **Sealed (default)**: an X25519 sealed envelope. An ephemeral keypair
//!   performs a Diffie-Hellman exchange with the recipient public key, the
//!   shared secret is expanded through HKDF-SHA256, and the payload is
//!   encrypted with AES-256-GCM. The frame is
//!   `ephemeral_pub(32) || nonce(12) || ciphertext`.
//!
//! Both paths emit base64 at the string entry points. The algorithm used to
//! decrypt is supplied out-of-band by configuration; the ciphertext does not
//! self-describe it.

use crate::crypto::error::CryptoError;
use crate::crypto::root_key::KeyStore;
use crate::observability::metrics;
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::Zeroizing;

type Aes256CfbEnc = cfb_mode::Encryptor<aes::Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<aes::Aes256>;

/// AES-CFB IV size in bytes; the IV is prepended to the ciphertext
pub const IV_SIZE: usize = 16;

/// AES-GCM nonce size in bytes for the sealed path
const NONCE_SIZE: usize = 12;

/// X25519 public key size in bytes
const PUBLIC_KEY_SIZE: usize = 32;

/// HKDF info string binding derived keys to this envelope format
const ENVELOPE_KEY_INFO: &[u8] = b"safe envelope v1";

/// Which decryption path to take; supplied by configuration, never read
/// from the ciphertext
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-256-CFB (FIPS-compliant mode)
    Aes,
    /// X25519 sealed envelope
    Sealed,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Aes => "aes",
            Algorithm::Sealed => "sealed",
        }
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes" => Ok(Algorithm::Aes),
            "sealed" => Ok(Algorithm::Sealed),
            other => Err(CryptoError::InvalidKey(format!(
                "unknown algorithm: {other}"
            ))),
        }
    }
}

/// Envelope encryption engine reading key material from a shared [`KeyStore`]
///
/// The key store is consulted on every call, so an operator-driven key
/// rotation takes effect immediately without re-creating the cipher.
#[derive(Debug)]
pub struct EnvelopeCipher {
    keys: Arc<KeyStore>,
    fips_compliant: bool,
    min_iv_interval: Duration,
    // Shared by every AES encrypt call; check and update happen under one
    // lock acquisition so concurrent encryptions cannot slip past the
    // throttle together.
    last_aes_encrypt: Mutex<Option<Instant>>,
}

impl EnvelopeCipher {
    pub fn new(keys: Arc<KeyStore>, fips_compliant: bool, min_iv_interval: Duration) -> Self {
        Self {
            keys,
            fips_compliant,
            min_iv_interval,
            last_aes_encrypt: Mutex::new(None),
        }
    }

    /// The algorithm the configured mode encrypts with
    pub fn algorithm(&self) -> Algorithm {
        if self.fips_compliant {
            Algorithm::Aes
        } else {
            Algorithm::Sealed
        }
    }

    /// Encrypt a plaintext string under the configured mode
    pub fn encrypt_value(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.encrypt(plaintext, self.fips_compliant)
    }

    /// Encrypt a plaintext string, returning the base64-encoded envelope
    ///
    /// `fips_compliant` selects the symmetric AES path; otherwise the
    /// payload is sealed to the root public key.
    pub fn encrypt(&self, plaintext: &str, fips_compliant: bool) -> Result<String, CryptoError> {
        let algorithm = if fips_compliant {
            Algorithm::Aes
        } else {
            Algorithm::Sealed
        };
        let framed = if fips_compliant {
            self.encrypt_aes(plaintext.as_bytes())
        } else {
            self.seal(plaintext.as_bytes())
        };
        match framed {
            Ok(framed) => {
                metrics::increment_encryption_op(algorithm.as_str(), "encrypt", "ok");
                Ok(BASE64.encode(framed))
            }
            Err(e) => {
                metrics::increment_encryption_op(algorithm.as_str(), "encrypt", "error");
                Err(e)
            }
        }
    }

    /// Decrypt a base64-encoded envelope under the configured mode
    pub fn decrypt_value(&self, value: &str) -> Result<String, CryptoError> {
        self.decrypt(value.as_bytes(), self.algorithm())
    }

    /// Decrypt a base64-encoded envelope with an explicit algorithm
    ///
    /// If the supplied algorithm does not match the one that produced the
    /// ciphertext, the sealed path fails authentication; the AES path
    /// yields garbage rather than an error. Callers own keeping the
    /// configuration consistent between encrypt and decrypt.
    pub fn decrypt(&self, value: &[u8], algorithm: Algorithm) -> Result<String, CryptoError> {
        let result = (|| {
            let decoded = BASE64.decode(value)?;
            let plaintext = match algorithm {
                Algorithm::Aes => self.decrypt_bytes_aes(&decoded)?,
                Algorithm::Sealed => self.open(&decoded)?,
            };
            Ok(String::from_utf8(plaintext)?)
        })();
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::increment_encryption_op(algorithm.as_str(), "decrypt", outcome);
        result
    }

    /// Encrypt with AES-256-CFB; returns the raw `IV || ciphertext` frame
    ///
    /// Calling this faster than the configured minimum IV interval is
    /// rejected with [`CryptoError::CallsTooFrequent`]: a hot loop degrades
    /// IV randomness, so the throttle is part of the security contract,
    /// not a performance knob.
    pub fn encrypt_aes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        {
            let mut last = self
                .last_aes_encrypt
                .lock()
                .expect("IV throttle lock poisoned");
            if let Some(at) = *last {
                if at.elapsed() < self.min_iv_interval {
                    return Err(CryptoError::CallsTooFrequent);
                }
            }
            *last = Some(Instant::now());
        }

        let rkt = self.keys.get();
        if rkt.aes_seed.is_empty() {
            return Err(CryptoError::NoAesKey);
        }
        let key = Zeroizing::new(hex::decode(&rkt.aes_seed)?);

        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let encryptor = Aes256CfbEnc::new_from_slices(&key, &iv)
            .map_err(|_| CryptoError::InvalidKeyLength)?;

        let mut body = plaintext.to_vec();
        encryptor.encrypt(&mut body);

        let mut framed = Vec::with_capacity(IV_SIZE + body.len());
        framed.extend_from_slice(&iv);
        framed.extend_from_slice(&body);
        Ok(framed)
    }

    /// Decrypt a raw `IV || ciphertext` AES-256-CFB frame
    pub fn decrypt_bytes_aes(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < IV_SIZE {
            return Err(CryptoError::CiphertextTooShort);
        }

        let rkt = self.keys.get();
        if rkt.aes_seed.is_empty() {
            return Err(CryptoError::NoAesKey);
        }
        let key = Zeroizing::new(hex::decode(&rkt.aes_seed)?);

        let (iv, body) = data.split_at(IV_SIZE);
        let decryptor = Aes256CfbDec::new_from_slices(&key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength)?;

        let mut plaintext = body.to_vec();
        decryptor.decrypt(&mut plaintext);
        Ok(plaintext)
    }

    /// Seal a payload to the root public key; returns the raw
    /// `ephemeral_pub || nonce || ciphertext` frame
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let rkt = self.keys.get();
        if rkt.public_key.is_empty() {
            return Err(CryptoError::NoPublicKey);
        }
        let recipient = parse_public_key(&rkt.public_key)?;

        let ephemeral = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_pub = PublicKey::from(&ephemeral);
        let shared = ephemeral.diffie_hellman(&recipient);
        if !shared.was_contributory() {
            return Err(CryptoError::SealFailed);
        }

        let key = derive_envelope_key(
            shared.as_bytes(),
            ephemeral_pub.as_bytes(),
            recipient.as_bytes(),
        );
        let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::SealFailed)?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::SealFailed)?;

        let mut framed = Vec::with_capacity(PUBLIC_KEY_SIZE + NONCE_SIZE + ciphertext.len());
        framed.extend_from_slice(ephemeral_pub.as_bytes());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);
        Ok(framed)
    }

    /// Open a sealed envelope with the root private key
    ///
    /// Any parse or authentication failure is an error; a tampered or
    /// wrong-key envelope is never silently accepted.
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let rkt = self.keys.get();
        if rkt.private_key.is_empty() {
            return Err(CryptoError::NoPrivateKey);
        }
        let secret = parse_private_key(&rkt.private_key)?;
        let own_public = PublicKey::from(&secret);

        if data.len() < PUBLIC_KEY_SIZE + NONCE_SIZE {
            return Err(CryptoError::OpenFailed);
        }
        let (header, ciphertext) = data.split_at(PUBLIC_KEY_SIZE + NONCE_SIZE);
        let (ephemeral_bytes, nonce) = header.split_at(PUBLIC_KEY_SIZE);

        let mut ephemeral_pub = [0u8; PUBLIC_KEY_SIZE];
        ephemeral_pub.copy_from_slice(ephemeral_bytes);
        let ephemeral_pub = PublicKey::from(ephemeral_pub);

        let shared = secret.diffie_hellman(&ephemeral_pub);
        if !shared.was_contributory() {
            return Err(CryptoError::OpenFailed);
        }

        let key = derive_envelope_key(
            shared.as_bytes(),
            ephemeral_pub.as_bytes(),
            own_public.as_bytes(),
        );
        let cipher = Aes256Gcm::new_from_slice(&key[..]).map_err(|_| CryptoError::OpenFailed)?;

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::OpenFailed)
    }

    /// Generate a fresh root key collection for key-generation tooling
    ///
    /// Delegates to the key store's generator; nothing is stored.
    pub fn generate_key_pair(&self) -> Result<(String, String, String), CryptoError> {
        let collection = self.keys.generate()?;
        Ok((
            collection.private_key.clone(),
            collection.public_key.clone(),
            collection.aes_seed.clone(),
        ))
    }
}

/// Expand the X25519 shared secret into an AES-256-GCM key
///
/// The salt binds the key to both parties' public points so a transplanted
/// header cannot be opened against a different recipient.
fn derive_envelope_key(
    shared: &[u8],
    ephemeral_pub: &[u8],
    recipient_pub: &[u8],
) -> Zeroizing<[u8; 32]> {
    let mut salt = Vec::with_capacity(PUBLIC_KEY_SIZE * 2);
    salt.extend_from_slice(ephemeral_pub);
    salt.extend_from_slice(recipient_pub);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(ENVELOPE_KEY_INFO, &mut *key)
        .expect("HKDF output length is valid");
    key
}

fn parse_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    let bytes = decode_key_bytes(encoded)?;
    Ok(PublicKey::from(bytes))
}

fn parse_private_key(encoded: &str) -> Result<StaticSecret, CryptoError> {
    let bytes = decode_key_bytes(encoded)?;
    Ok(StaticSecret::from(bytes))
}

fn decode_key_bytes(encoded: &str) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
    let decoded = Zeroizing::new(
        hex::decode(encoded).map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
    );
    let bytes: [u8; PUBLIC_KEY_SIZE] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("expected 32 bytes, got {}", decoded.len())))?;
    Ok(bytes)
}
