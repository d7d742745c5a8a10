// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM implementation of [`EncryptionService`].
//!
//! Every call to `encrypt` draws a fresh random 96-bit nonce from the system
//! CSPRNG. Output layout: `nonce (12) || ciphertext || tag (16)`.

use cryptosafe_core::{EncryptionService, SafeError, SecureBuffer};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};

const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// Authenticated cipher used by the repositories.
///
/// A 32-byte key is used as-is; any other non-empty key is first reduced to
/// 32 bytes with SHA-256.
#[derive(Debug)]
pub struct AesGcmCipher {
    rng: SystemRandom,
}

impl Default for AesGcmCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl AesGcmCipher {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn sealing_key(key: &[u8]) -> Result<LessSafeKey, SafeError> {
        if key.is_empty() {
            return Err(SafeError::invalid("encryption key must not be empty"));
        }
        let material = if key.len() == KEY_LEN {
            SecureBuffer::from_slice(key)
        } else {
            SecureBuffer::from_slice(digest(&SHA256, key).as_ref())
        };
        let unbound = UnboundKey::new(&AES_256_GCM, material.as_bytes())
            .map_err(|_| SafeError::Crypto("failed to create AES-256-GCM key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl EncryptionService for AesGcmCipher {
    fn name(&self) -> &str {
        "aes-256-gcm"
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, SafeError> {
        let sealing = Self::sealing_key(key)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| SafeError::Crypto("failed to generate random nonce".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + plaintext.len() + TAG_LEN);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(plaintext);

        let tag = sealing
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut out[NONCE_LEN..],
            )
            .map_err(|_| SafeError::Crypto("AES-256-GCM encryption failed".to_string()))?;
        out.extend_from_slice(tag.as_ref());
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<SecureBuffer, SafeError> {
        let opening = Self::sealing_key(key)?;
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(SafeError::Crypto("ciphertext too short".to_string()));
        }

        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| SafeError::Crypto("malformed nonce".to_string()))?;

        let mut in_out = SecureBuffer::from_slice(sealed);
        let plain_len = opening
            .open_in_place(nonce, Aad::empty(), in_out.as_mut_bytes())
            .map_err(|_| {
                SafeError::Crypto("decryption failed -- wrong key or corrupted data".to_string())
            })?
            .len();
        Ok(SecureBuffer::from_slice(&in_out.as_bytes()[..plain_len]))
    }
}

/// Reversible keyed XOR with the key repeated over the input. Test fixture only.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct XorCipher;

#[cfg(test)]
impl EncryptionService for XorCipher {
    fn name(&self) -> &str {
        "xor-fixture"
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, SafeError> {
        if key.is_empty() {
            return Err(SafeError::invalid("encryption key must not be empty"));
        }
        Ok(plaintext
            .iter()
            .zip(key.iter().cycle())
            .map(|(p, k)| p ^ k)
            .collect())
    }

    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<SecureBuffer, SafeError> {
        self.encrypt(ciphertext, key).map(SecureBuffer::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roundtrip_with_exact_length_key() {
        let cipher = AesGcmCipher::new();
        let key = [42u8; 32];
        let sealed = cipher.encrypt(b"p@ss", &key).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 4 + TAG_LEN);
        assert_eq!(cipher.decrypt(&sealed, &key).unwrap().as_bytes(), b"p@ss");
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let cipher = AesGcmCipher::new();
        let a = cipher.encrypt(b"same", b"short key").unwrap();
        let b = cipher.encrypt(b"same", b"short key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_key_is_rejected() {
        let cipher = AesGcmCipher::new();
        assert!(matches!(
            cipher.encrypt(b"data", b""),
            Err(SafeError::InvalidArgument(_))
        ));
        assert!(matches!(
            cipher.decrypt(&[0u8; 40], b""),
            Err(SafeError::InvalidArgument(_))
        ));
        assert!(matches!(
            XorCipher.encrypt(b"data", b""),
            Err(SafeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wrong_key_and_tampering_are_detected() {
        let cipher = AesGcmCipher::new();
        let mut sealed = cipher.encrypt(b"secret", b"right").unwrap();
        assert!(matches!(
            cipher.decrypt(&sealed, b"wrong"),
            Err(SafeError::Crypto(_))
        ));

        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(
            cipher.decrypt(&sealed, b"right"),
            Err(SafeError::Crypto(_))
        ));
        assert!(matches!(
            cipher.decrypt(&[1u8; 10], b"right"),
            Err(SafeError::Crypto(_))
        ));
    }

    #[test]
    fn xor_fixture_repeats_short_key() {
        let sealed = XorCipher.encrypt(b"abcd", b"\x01").unwrap();
        assert_eq!(sealed, b"`cbe");
        assert_eq!(XorCipher.decrypt(&sealed, b"\x01").unwrap().as_bytes(), b"abcd");
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            key in proptest::collection::vec(any::<u8>(), 1..64),
        ) {
            let cipher = AesGcmCipher::new();
            let sealed = cipher.encrypt(&plaintext, &key).unwrap();
            let opened = cipher.decrypt(&sealed, &key).unwrap();
            prop_assert_eq!(opened.as_bytes(), plaintext.as_slice());

            let xored = XorCipher.encrypt(&plaintext, &key).unwrap();
            let back = XorCipher.decrypt(&xored, &key).unwrap();
            prop_assert_eq!(back.as_bytes(), plaintext.as_slice());
        }
    }
}
