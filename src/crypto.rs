//! Credential and draw cryptography.
//!
//! Everything secret-shaped flows through here: Argon2id password hashing,
//! TOTP verification, and the per-user authenticated encryption applied to
//! draw numbers before they touch the database.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit},
};
use thiserror::Error;
use totp_rs::{Secret, TOTP};
use zeroize::ZeroizeOnDrop;

/// TOTP parameters: 6 digits, 30 s step, ±1 step clock skew.
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

const NONCE_LEN: usize = 12;

/// Failures are deliberately opaque: no variant carries key material,
/// seeds, or plaintext fragments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("password hashing failed")]
    Hash,

    #[error("invalid password hash format")]
    InvalidHash,

    #[error("invalid TOTP seed")]
    InvalidSeed,

    #[error("system clock error")]
    Clock,

    #[error("invalid draw key")]
    InvalidKey,

    #[error("encryption failed")]
    Encrypt,

    #[error("malformed ciphertext")]
    Ciphertext,

    #[error("decryption failed")]
    Decrypt,
}

// ── Passwords ────────────────────────────────────────────────────────────────

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(
    password: &str,
    config: &crate::config::SecurityConfig,
) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|_| CryptoError::Hash)?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| CryptoError::Hash)?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string. The cost parameters
/// are read back from the hash itself, so hashes created under older
/// configurations keep verifying.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(hash).map_err(|_| CryptoError::InvalidHash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ── TOTP ─────────────────────────────────────────────────────────────────────

/// Generate a fresh random TOTP seed, base32-encoded. Called exactly once
/// per user at registration.
#[must_use]
pub fn generate_totp_seed() -> String {
    match Secret::generate_secret().to_encoded() {
        Secret::Encoded(seed) => seed,
        // to_encoded always yields the Encoded variant
        Secret::Raw(_) => unreachable!(),
    }
}

fn totp_for_seed(seed: &str) -> Result<TOTP, CryptoError> {
    let secret = Secret::Encoded(seed.to_owned())
        .to_bytes()
        .map_err(|_| CryptoError::InvalidSeed)?;

    TOTP::new(totp_rs::Algorithm::SHA1, TOTP_DIGITS, TOTP_SKEW, TOTP_STEP, secret)
        .map_err(|_| CryptoError::InvalidSeed)
}

/// Check a submitted code against the current time window.
pub fn verify_totp(seed: &str, code: &str) -> Result<bool, CryptoError> {
    totp_for_seed(seed)?
        .check_current(code)
        .map_err(|_| CryptoError::Clock)
}

/// Check a submitted code at an explicit unix time. The skew window means a
/// code from the adjacent step still verifies.
pub fn verify_totp_at(seed: &str, code: &str, unix_time: u64) -> Result<bool, CryptoError> {
    Ok(totp_for_seed(seed)?.check(code, unix_time))
}

// ── Draw encryption ──────────────────────────────────────────────────────────

/// 32-byte per-user symmetric key. Zeroed on drop.
#[derive(ZeroizeOnDrop)]
pub struct DrawKey([u8; 32]);

impl DrawKey {
    /// Rebuild a key from its persisted BLOB form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(key))
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Persisted form. Only the user repository calls this, at creation.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Generate a fresh random draw key. Called exactly once per user at
/// registration; the key is immutable thereafter.
#[must_use]
pub fn generate_draw_key() -> DrawKey {
    let key = ChaCha20Poly1305::generate_key(&mut chacha20poly1305::aead::OsRng);
    DrawKey(key.into())
}

/// Encrypt `plaintext` under `key`, returning base64(nonce || ciphertext).
pub fn encrypt(plaintext: &str, key: &DrawKey) -> Result<String, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let nonce = ChaCha20Poly1305::generate_nonce(&mut chacha20poly1305::aead::OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(out))
}

/// Decrypt a token produced by [`encrypt`]. Tampered ciphertext or a wrong
/// key fails; partially-decrypted data is never returned.
pub fn decrypt(token: &str, key: &DrawKey) -> Result<String, CryptoError> {
    let raw = BASE64.decode(token).map_err(|_| CryptoError::Ciphertext)?;

    if raw.len() <= NONCE_LEN {
        return Err(CryptoError::Ciphertext);
    }
    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_security_config() -> crate::config::SecurityConfig {
        // Minimal Argon2 cost so the suite stays fast
        crate::config::SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..Default::default()
        }
    }

    #[test]
    fn password_round_trip() {
        let config = test_security_config();
        let hash = hash_password("S3cret-pw!", &config).unwrap();
        assert!(verify_password("S3cret-pw!", &hash).unwrap());
        assert!(!verify_password("S3cret-pw?", &hash).unwrap());
    }

    #[test]
    fn password_hashes_are_salted() {
        let config = test_security_config();
        let a = hash_password("same-input", &config).unwrap();
        let b = hash_password("same-input", &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_rejected_not_panicked() {
        assert_eq!(
            verify_password("anything", "not-a-phc-string"),
            Err(CryptoError::InvalidHash)
        );
    }

    #[test]
    fn totp_verifies_within_skew_window() {
        let seed = generate_totp_seed();
        let now = 1_700_000_000;

        let code = totp_for_seed(&seed).unwrap().generate(now);

        assert!(verify_totp_at(&seed, &code, now).unwrap());
        // one step either side still passes
        assert!(verify_totp_at(&seed, &code, now + TOTP_STEP).unwrap());
        assert!(verify_totp_at(&seed, &code, now - TOTP_STEP).unwrap());
        // outside the skew window it does not
        assert!(!verify_totp_at(&seed, &code, now + 4 * TOTP_STEP).unwrap());
    }

    #[test]
    fn totp_rejects_bad_seed() {
        assert_eq!(
            verify_totp_at("not base32 !!!", "000000", 0),
            Err(CryptoError::InvalidSeed)
        );
    }

    #[test]
    fn draw_encryption_round_trip() {
        let key = generate_draw_key();
        let token = encrypt("1 2 3 4 5 6", &key).unwrap();
        assert_ne!(token, "1 2 3 4 5 6");
        assert_eq!(decrypt(&token, &key).unwrap(), "1 2 3 4 5 6");
    }

    #[test]
    fn wrong_key_fails_closed() {
        let key1 = generate_draw_key();
        let key2 = generate_draw_key();
        let token = encrypt("4 8 15 16 23 42", &key1).unwrap();
        assert_eq!(decrypt(&token, &key2), Err(CryptoError::Decrypt));
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        let key = generate_draw_key();
        let token = encrypt("4 8 15 16 23 42", &key).unwrap();

        let mut raw = BASE64.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert_eq!(decrypt(&tampered, &key), Err(CryptoError::Decrypt));
    }

    #[test]
    fn truncated_token_is_malformed() {
        let key = generate_draw_key();
        assert_eq!(decrypt("AAAA", &key), Err(CryptoError::Ciphertext));
        assert_eq!(decrypt("not base64", &key), Err(CryptoError::Ciphertext));
    }

    #[test]
    fn draw_key_blob_round_trip() {
        let key = generate_draw_key();
        let blob = key.to_vec();
        let restored = DrawKey::from_bytes(&blob).unwrap();
        let token = encrypt("7 14 21 28 35 42", &key).unwrap();
        assert_eq!(decrypt(&token, &restored).unwrap(), "7 14 21 28 35 42");
    }

    #[test]
    fn short_key_blob_is_rejected() {
        assert!(DrawKey::from_bytes(&[0u8; 16]).is_err());
    }
}
