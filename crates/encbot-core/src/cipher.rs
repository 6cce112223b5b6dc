//! Secret-keyed text cipher.
//!
//! XChaCha20-Poly1305 under a 256-bit key derived once per process from the
//! configured secret. Ciphertext is standard base64 of
//! `[version: 1 byte][nonce: 24 bytes][ciphertext + Poly1305 tag]`, so every
//! encryption of the same plaintext differs.

use argon2::Argon2;
use base64::Engine;
#[allow(deprecated)] // upstream generic-array 0.x deprecation
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{errors::Error, Result};

/// Version tag prefixed to every ciphertext.
pub const VERSION_TAG: u8 = 0x01;

const NONCE_LEN: usize = 24;
const TAG_LEN: usize = 16;

// A fixed salt: the key is a pure function of the secret, so ciphertexts
// survive restarts as long as the secret is unchanged.
const KDF_SALT: &[u8] = b"encbot.cipher.v1";

/// Symmetric text cipher keyed by the process-wide secret.
pub struct SecretCipher {
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    pub fn new(secret: &str) -> Result<Self> {
        Ok(Self {
            key: derive_key(secret.as_bytes())?,
        })
    }

    #[allow(deprecated)]
    fn aead(&self) -> XChaCha20Poly1305 {
        let key: &[u8; 32] = &self.key;
        XChaCha20Poly1305::new(key.into())
    }

    /// Encrypt `plaintext` into the base64 wire format.
    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.aead();

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::Cipher(e.to_string()))?;

        let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        blob.push(VERSION_TAG);
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    /// Decrypt a ciphertext produced by [`SecretCipher::encrypt`].
    ///
    /// Returns `None` for anything that is not valid ciphertext under this key:
    /// bad encoding, wrong version, truncation, tampering, a different key, or
    /// a plaintext that is empty or not UTF-8. These cases are deliberately
    /// indistinguishable.
    #[allow(deprecated)]
    pub fn decrypt(&self, ciphertext: &str) -> Option<String> {
        let blob = base64::engine::general_purpose::STANDARD
            .decode(ciphertext.trim())
            .ok()?;
        if blob.len() < 1 + NONCE_LEN + TAG_LEN || blob[0] != VERSION_TAG {
            return None;
        }

        let (nonce_bytes, ct) = blob[1..].split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = self.aead();

        let plain = cipher.decrypt(nonce, ct).ok()?;
        let text = String::from_utf8(plain).ok()?;
        if text.is_empty() {
            return None;
        }
        Some(text)
    }
}

fn derive_key(secret: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let params = argon2::Params::new(19_456, 2, 1, Some(32))
        .map_err(|e| Error::Cipher(format!("invalid KDF params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(secret, KDF_SALT, output.as_mut())
        .map_err(|e| Error::Cipher(format!("KDF failed: {e}")))?;
    Ok(output)
}
