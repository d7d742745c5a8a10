// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PBKDF2-HMAC-SHA256 key derivation from a master password.
//!
//! The derived key never touches disk. What is persisted is its SHA-256
//! verifier together with the salt and the [`KdfParams`] that produced it.

use std::num::NonZeroU32;

use cryptosafe_core::{with_secure_buffer, SafeError, SecureBuffer};
use ring::digest::{digest, SHA256};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Algorithm identifier stored in the parameter blob.
pub const PBKDF2_HMAC_SHA256: &str = "pbkdf2_hmac_sha256";

pub const DEFAULT_ITERATIONS: u32 = 200_000;
pub const DEFAULT_DKLEN: usize = 32;

/// Largest derived key length accepted from stored or caller parameters.
pub const MAX_DKLEN: usize = 1024;

/// Salts shorter than this are rejected by [`derive_key`].
pub const MIN_SALT_LENGTH: usize = 8;
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// Serialized alongside every key record as `{algorithm, iterations, dklen}`.
///
/// Missing fields take their defaults individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_dklen")]
    pub dklen: usize,
}

fn default_algorithm() -> String {
    PBKDF2_HMAC_SHA256.to_string()
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_dklen() -> usize {
    DEFAULT_DKLEN
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            iterations: DEFAULT_ITERATIONS,
            dklen: DEFAULT_DKLEN,
        }
    }
}

impl KdfParams {
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String, SafeError> {
        serde_json::to_string(self)
            .map_err(|e| SafeError::Internal(format!("failed to serialize KDF params: {e}")))
    }

    /// Parse a stored parameter blob.
    ///
    /// An unreadable blob yields the defaults and `true` as the second
    /// element; a warning is logged because the defaults may not be the
    /// parameters the key was created with.
    pub fn from_json_or_default(raw: Option<&str>) -> (Self, bool) {
        match raw.map(serde_json::from_str::<KdfParams>) {
            Some(Ok(params)) => match params.validate() {
                Ok(_) => (params, false),
                Err(e) => {
                    warn!(error = %e, "stored KDF params invalid -- falling back to defaults");
                    (Self::default(), true)
                }
            },
            Some(Err(e)) => {
                warn!(error = %e, "stored KDF params unreadable -- falling back to defaults");
                (Self::default(), true)
            }
            None => {
                warn!("stored KDF params missing -- falling back to defaults");
                (Self::default(), true)
            }
        }
    }

    fn validate(&self) -> Result<NonZeroU32, SafeError> {
        if self.algorithm != PBKDF2_HMAC_SHA256 {
            return Err(SafeError::invalid(format!(
                "unsupported KDF algorithm `{}`",
                self.algorithm
            )));
        }
        if self.dklen == 0 {
            return Err(SafeError::invalid("KDF output length must be positive"));
        }
        if self.dklen > MAX_DKLEN {
            return Err(SafeError::invalid(format!(
                "KDF output length must be at most {MAX_DKLEN}, got {}",
                self.dklen
            )));
        }
        NonZeroU32::new(self.iterations)
            .ok_or_else(|| SafeError::invalid("KDF iteration count must be positive"))
    }
}

/// Derive a key from `password` and `salt`.
///
/// The password is copied into a [`SecureBuffer`] for the duration of the
/// derivation and wiped before returning. Deterministic for identical inputs.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<SecureBuffer, SafeError> {
    if password.is_empty() {
        return Err(SafeError::invalid("password must not be empty"));
    }
    if salt.len() < MIN_SALT_LENGTH {
        return Err(SafeError::invalid(format!(
            "salt must be at least {MIN_SALT_LENGTH} bytes, got {}",
            salt.len()
        )));
    }
    let iterations = params.validate()?;

    Ok(with_secure_buffer(password.as_bytes(), |secret| {
        let mut out = SecureBuffer::zeroed(params.dklen);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            secret.as_bytes(),
            out.as_mut_bytes(),
        );
        out
    }))
}

/// One-way SHA-256 digest of a derived key.
pub fn verifier(key: &[u8]) -> Vec<u8> {
    digest(&SHA256, key).as_ref().to_vec()
}

/// Length-checked comparison that does not short-circuit on the first
/// differing byte.
pub(crate) fn verifiers_match(expected: &[u8], actual: &[u8]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Cryptographically random salt of `length` bytes.
pub fn make_salt(length: usize) -> Result<Vec<u8>, SafeError> {
    let mut salt = vec![0u8; length];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| SafeError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn fast() -> KdfParams {
        KdfParams::with_iterations(1_000)
    }

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; 16];
        let a = derive_key("correct horse", &salt, &fast()).unwrap();
        let b = derive_key("correct horse", &salt, &fast()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DKLEN);
    }

    #[test]
    fn different_salts_give_different_keys() {
        let a = derive_key("correct horse", &[1u8; 16], &fast()).unwrap();
        let b = derive_key("correct horse", &[2u8; 16], &fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn dklen_controls_output_length() {
        let params = KdfParams {
            dklen: 64,
            ..fast()
        };
        let key = derive_key("pw", &[3u8; 8], &params).unwrap();
        assert_eq!(key.len(), 64);
    }

    #[test]
    fn rejects_empty_password_and_short_salt() {
        assert!(matches!(
            derive_key("", &[0u8; 16], &fast()),
            Err(SafeError::InvalidArgument(_))
        ));
        assert!(matches!(
            derive_key("pw", &[0u8; 7], &fast()),
            Err(SafeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_unknown_algorithm_and_zero_iterations() {
        let scrypt = KdfParams {
            algorithm: "scrypt".into(),
            ..fast()
        };
        assert!(matches!(
            derive_key("pw", &[0u8; 16], &scrypt),
            Err(SafeError::InvalidArgument(_))
        ));
        assert!(matches!(
            derive_key("pw", &[0u8; 16], &KdfParams::with_iterations(0)),
            Err(SafeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_oversized_output_length() {
        let huge = KdfParams {
            dklen: MAX_DKLEN + 1,
            ..fast()
        };
        assert!(matches!(
            derive_key("pw", &[0u8; 16], &huge),
            Err(SafeError::InvalidArgument(_))
        ));
    }

    #[test]
    #[traced_test]
    fn out_of_range_stored_params_fall_back() {
        let (params, fallback) =
            KdfParams::from_json_or_default(Some(r#"{"dklen": 1000000000000}"#));
        assert!(fallback);
        assert_eq!(params, KdfParams::default());
        assert!(logs_contain("stored KDF params invalid"));
    }

    #[test]
    fn params_json_uses_documented_field_names() {
        let json = KdfParams::default().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["algorithm"], "pbkdf2_hmac_sha256");
        assert_eq!(value["iterations"], 200_000);
        assert_eq!(value["dklen"], 32);
    }

    #[test]
    fn partial_params_fill_missing_fields() {
        let (params, fallback) = KdfParams::from_json_or_default(Some(r#"{"iterations": 90000}"#));
        assert!(!fallback);
        assert_eq!(params.iterations, 90_000);
        assert_eq!(params.dklen, DEFAULT_DKLEN);
        assert_eq!(params.algorithm, PBKDF2_HMAC_SHA256);
    }

    #[test]
    #[traced_test]
    fn corrupted_params_fall_back_with_warning() {
        let (params, fallback) = KdfParams::from_json_or_default(Some("{not json"));
        assert!(fallback);
        assert_eq!(params, KdfParams::default());
        assert!(logs_contain("falling back to defaults"));
    }

    #[test]
    fn verifier_is_sha256_and_not_the_key() {
        let key = derive_key("pw", &[9u8; 16], &fast()).unwrap();
        let v = verifier(key.as_bytes());
        assert_eq!(v.len(), 32);
        assert_ne!(v.as_slice(), key.as_bytes());
        assert!(verifiers_match(&v, &verifier(key.as_bytes())));
        assert!(!verifiers_match(&v, &v[..31]));
    }

    #[test]
    fn salts_are_random() {
        let a = make_salt(DEFAULT_SALT_LENGTH).unwrap();
        let b = make_salt(DEFAULT_SALT_LENGTH).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
