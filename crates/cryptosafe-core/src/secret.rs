// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Zero-on-drop byte buffers for passwords and key material.
//!
//! A [`SecureBuffer`] owns its allocation exactly: it is created at its final
//! size and never grows, so no stale copy is left behind by a reallocation.
//! The backing memory is zero-filled when the buffer is dropped, including
//! during unwinding.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Heap buffer whose contents are zeroed on drop.
///
/// `Clone` produces an independent buffer with the same guarantee, which is
/// how copies of the master key are handed out.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureBuffer(Vec<u8>);

impl SecureBuffer {
    /// Copy `bytes` into a new secure buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Allocate a zero-filled buffer of `len` bytes, e.g. as a KDF output slot.
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zero the contents now and leave the buffer empty.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl From<Vec<u8>> for SecureBuffer {
    /// Takes ownership of `bytes` without copying.
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.0.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Run `f` over a secure copy of `initial`; the copy is wiped when `f`
/// returns or unwinds.
pub fn with_secure_buffer<R>(initial: &[u8], f: impl FnOnce(&mut SecureBuffer) -> R) -> R {
    let mut buf = SecureBuffer::from_slice(initial);
    f(&mut buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wipe_clears_contents() {
        let mut buf = SecureBuffer::from_slice(b"hunter2");
        assert_eq!(buf.len(), 7);
        buf.wipe();
        assert!(buf.is_empty());
    }

    #[test]
    fn debug_output_is_redacted() {
        let buf = SecureBuffer::from_slice(b"top-secret");
        let rendered = format!("{buf:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn clone_is_independent() {
        let original = SecureBuffer::from_slice(b"key-bytes");
        let mut copy = original.clone();
        copy.wipe();
        assert_eq!(original.as_bytes(), b"key-bytes");
    }

    #[test]
    fn scoped_buffer_returns_closure_result() {
        let len = with_secure_buffer(b"password", |buf| {
            buf.as_mut_bytes()[0] = b'P';
            assert_eq!(buf.as_bytes(), b"Password");
            buf.len()
        });
        assert_eq!(len, 8);
    }

    #[test]
    fn zeroed_has_requested_length() {
        let buf = SecureBuffer::zeroed(32);
        assert_eq!(buf.len(), 32);
        assert!(buf.as_bytes().iter().all(|b| *b == 0));
    }
}
