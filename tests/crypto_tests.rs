//! # Envelope Encryption Tests
//!
//! End-to-end tests for the envelope cipher and the root key codec:
//!
//! - Round-trips under both the symmetric and sealed paths
//! - Triplet codec bijection
//! - Emptiness invariant
//! - Malformed-input safety (no panics, always errors)

use secrets_safe::crypto::{
    combine, root_key, split, Algorithm, CryptoError, EnvelopeCipher, KeyStore, RootKeyCollection,
};
use std::sync::Arc;
use std::time::Duration;

fn cipher_with_fresh_keys(fips: bool) -> (EnvelopeCipher, RootKeyCollection) {
    let store = Arc::new(KeyStore::new());
    let collection = root_key::generate_collection().unwrap();
    store.set(&collection.combine()).unwrap();
    (
        EnvelopeCipher::new(store, fips, Duration::ZERO),
        collection,
    )
}

#[test]
fn test_aes_round_trip_recovers_plaintext() {
    let (cipher, _keys) = cipher_with_fresh_keys(true);
    let encrypted = cipher.encrypt_value("hello-secret").unwrap();
    let decrypted = cipher.decrypt(encrypted.as_bytes(), Algorithm::Aes).unwrap();
    assert_eq!(decrypted, "hello-secret");
}

#[test]
fn test_sealed_round_trip_recovers_plaintext() {
    let (cipher, _keys) = cipher_with_fresh_keys(false);
    let encrypted = cipher.encrypt_value("hello-secret").unwrap();
    let decrypted = cipher
        .decrypt(encrypted.as_bytes(), Algorithm::Sealed)
        .unwrap();
    assert_eq!(decrypted, "hello-secret");
}

#[test]
fn test_aes_decrypt_with_different_seed_does_not_recover_plaintext() {
    let (encrypting_cipher, _keys) = cipher_with_fresh_keys(true);
    let encrypted = encrypting_cipher.encrypt_value("hello-secret").unwrap();

    let (other_cipher, _other_keys) = cipher_with_fresh_keys(true);
    let result = other_cipher.decrypt(encrypted.as_bytes(), Algorithm::Aes);

    // CFB under the wrong key yields garbage: either invalid UTF-8 (an
    // error) or a string that is not the original plaintext.
    match result {
        Ok(garbage) => assert_ne!(garbage, "hello-secret"),
        Err(_) => {}
    }
}

#[test]
fn test_sealed_decrypt_with_wrong_private_key_fails() {
    let (encrypting_cipher, _keys) = cipher_with_fresh_keys(false);
    let encrypted = encrypting_cipher.encrypt_value("hello-secret").unwrap();

    let (other_cipher, _other_keys) = cipher_with_fresh_keys(false);
    let result = other_cipher.decrypt(encrypted.as_bytes(), Algorithm::Sealed);
    assert!(result.is_err());
}

#[test]
fn test_round_trip_respects_iv_throttle() {
    let store = Arc::new(KeyStore::new());
    let collection = root_key::generate_collection().unwrap();
    store.set(&collection.combine()).unwrap();
    let cipher = EnvelopeCipher::new(store, true, Duration::from_millis(10));

    let first = cipher.encrypt_value("first").unwrap();
    assert!(matches!(
        cipher.encrypt_value("second"),
        Err(CryptoError::CallsTooFrequent)
    ));

    std::thread::sleep(Duration::from_millis(20));
    let second = cipher.encrypt_value("second").unwrap();

    assert_eq!(
        cipher.decrypt(first.as_bytes(), Algorithm::Aes).unwrap(),
        "first"
    );
    assert_eq!(
        cipher.decrypt(second.as_bytes(), Algorithm::Aes).unwrap(),
        "second"
    );
}

#[test]
fn test_triplet_codec_bijection() {
    let combined = combine("priv", "pub", "aes");
    assert_eq!(combined, "priv\npub\naes");
    let (private_key, public_key, aes_seed) = split(&combined).unwrap();
    assert_eq!(private_key, "priv");
    assert_eq!(public_key, "pub");
    assert_eq!(aes_seed, "aes");
}

#[test]
fn test_collection_combine_matches_free_function() {
    let collection = RootKeyCollection {
        private_key: "a".into(),
        public_key: "b".into(),
        aes_seed: "c".into(),
    };
    assert_eq!(collection.combine(), combine("a", "b", "c"));
}

#[test]
fn test_empty_collection_reports_empty() {
    assert!(RootKeyCollection::default().is_empty());

    let partial = RootKeyCollection {
        private_key: "set".into(),
        public_key: String::new(),
        aes_seed: String::new(),
    };
    assert!(!partial.is_empty());
}

#[test]
fn test_encrypt_against_empty_store_fails_without_panic() {
    let empty = EnvelopeCipher::new(Arc::new(KeyStore::new()), true, Duration::ZERO);
    assert!(matches!(
        empty.encrypt_value("x"),
        Err(CryptoError::NoAesKey)
    ));

    let empty = EnvelopeCipher::new(Arc::new(KeyStore::new()), false, Duration::ZERO);
    assert!(matches!(
        empty.encrypt_value("x"),
        Err(CryptoError::NoPublicKey)
    ));
}

#[test]
fn test_decrypt_against_empty_store_fails_without_panic() {
    let empty = EnvelopeCipher::new(Arc::new(KeyStore::new()), false, Duration::ZERO);
    let valid_b64 = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    assert!(empty
        .decrypt(valid_b64.as_bytes(), Algorithm::Sealed)
        .is_err());
    assert!(empty.decrypt(valid_b64.as_bytes(), Algorithm::Aes).is_err());
}

#[test]
fn test_short_ciphertext_is_an_error() {
    let (cipher, _keys) = cipher_with_fresh_keys(true);
    assert!(matches!(
        cipher.decrypt_bytes_aes(&[1, 2, 3]),
        Err(CryptoError::CiphertextTooShort)
    ));
}

#[test]
fn test_invalid_base64_is_an_error() {
    let (cipher, _keys) = cipher_with_fresh_keys(true);
    assert!(matches!(
        cipher.decrypt(b"!!! definitely not base64 !!!", Algorithm::Aes),
        Err(CryptoError::InvalidBase64(_))
    ));
}

#[test]
fn test_wrong_length_symmetric_key_is_an_error() {
    let store = Arc::new(KeyStore::new());
    // A valid triplet whose AES seed decodes to 4 bytes instead of 32.
    store.set("priv\npub\ndeadbeef").unwrap();
    let cipher = EnvelopeCipher::new(store, true, Duration::ZERO);
    assert!(matches!(
        cipher.decrypt_bytes_aes(&[0u8; 64]),
        Err(CryptoError::InvalidKeyLength)
    ));
}

#[test]
fn test_malformed_triplet_clears_store_and_reports() {
    let store = KeyStore::new();
    store.set("a\nb\nc").unwrap();
    assert!(store.is_set());

    assert!(matches!(
        store.set("no separators here"),
        Err(CryptoError::MalformedTriplet)
    ));
    assert!(!store.is_set());
}

#[test]
fn test_generate_key_pair_is_fully_populated_and_unstored() {
    let store = Arc::new(KeyStore::new());
    let cipher = EnvelopeCipher::new(Arc::clone(&store), false, Duration::ZERO);

    let (private_key, public_key, aes_seed) = cipher.generate_key_pair().unwrap();
    assert_eq!(private_key.len(), 64);
    assert_eq!(public_key.len(), 64);
    assert_eq!(aes_seed.len(), 64);
    assert!(!store.is_set());
}

#[test]
fn test_rotation_takes_effect_immediately() {
    let store = Arc::new(KeyStore::new());
    let first = root_key::generate_collection().unwrap();
    store.set(&first.combine()).unwrap();
    let cipher = EnvelopeCipher::new(Arc::clone(&store), false, Duration::ZERO);

    let encrypted_before = cipher.encrypt_value("pre-rotation").unwrap();

    let second = root_key::generate_collection().unwrap();
    store.set(&second.combine()).unwrap();

    // Old envelopes no longer open; new envelopes round-trip.
    assert!(cipher
        .decrypt(encrypted_before.as_bytes(), Algorithm::Sealed)
        .is_err());
    let encrypted_after = cipher.encrypt_value("post-rotation").unwrap();
    assert_eq!(
        cipher
            .decrypt(encrypted_after.as_bytes(), Algorithm::Sealed)
            .unwrap(),
        "post-rotation"
    );
}
