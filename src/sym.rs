// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Streaming symmetric cipher contexts.
//!
//! A [`SymContext`] is configured with a cipher name and a direction, given
//! key and IV material, initialized, fed data in chunks and finalized. GCM
//! family ciphers additionally take associated data and produce or verify an
//! authentication tag. The same context can be re-initialized after `finish`
//! to process another message with the same configuration.

use openssl::cipher::Cipher;
use openssl::cipher::CipherRef;
use openssl::cipher_ctx::CipherCtx;

use crate::CryptoError;
use crate::SecretBytes;

/// Native tag size of the GCM family.
const AEAD_TAG_SIZE: usize = 16;

/// Direction of a symmetric operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymMode {
    Encrypt,
    Decrypt,
}

struct CipherSpec {
    name: &'static str,
    cipher: fn() -> &'static CipherRef,
    aead: bool,
}

/// Ciphers recognized by name. Names follow the backend's conventions.
const CIPHERS: &[CipherSpec] = &[
    CipherSpec { name: "aes-128-cbc", cipher: Cipher::aes_128_cbc, aead: false },
    CipherSpec { name: "aes-192-cbc", cipher: Cipher::aes_192_cbc, aead: false },
    CipherSpec { name: "aes-256-cbc", cipher: Cipher::aes_256_cbc, aead: false },
    CipherSpec { name: "aes-128-ctr", cipher: Cipher::aes_128_ctr, aead: false },
    CipherSpec { name: "aes-192-ctr", cipher: Cipher::aes_192_ctr, aead: false },
    CipherSpec { name: "aes-256-ctr", cipher: Cipher::aes_256_ctr, aead: false },
    CipherSpec { name: "aes-128-ecb", cipher: Cipher::aes_128_ecb, aead: false },
    CipherSpec { name: "aes-192-ecb", cipher: Cipher::aes_192_ecb, aead: false },
    CipherSpec { name: "aes-256-ecb", cipher: Cipher::aes_256_ecb, aead: false },
    CipherSpec { name: "aes-128-gcm", cipher: Cipher::aes_128_gcm, aead: true },
    CipherSpec { name: "aes-192-gcm", cipher: Cipher::aes_192_gcm, aead: true },
    CipherSpec { name: "aes-256-gcm", cipher: Cipher::aes_256_gcm, aead: true },
];

fn cipher_by_name(name: &str) -> Option<&'static CipherSpec> {
    CIPHERS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// A streaming symmetric cipher context.
///
/// Lifecycle: `create` → `set_key`/`set_iv` (or `set_key_iv_random`) →
/// `init` → `update`* → `finish`. After `finish` the live cipher state is
/// released; the accumulated configuration (key, IV, AAD, tag) stays
/// readable and the context may be initialized again.
pub struct SymContext {
    cipher: &'static CipherRef,
    aead: bool,
    mode: SymMode,
    key: Option<SecretBytes>,
    iv: Option<SecretBytes>,
    aad: Option<Vec<u8>>,
    tag: Option<Vec<u8>>,
    padding: bool,
    ctx: Option<CipherCtx>,
}

impl std::fmt::Debug for SymContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymContext")
            .field("aead", &self.aead)
            .field("mode", &self.mode)
            .field("key", &self.key)
            .field("iv", &self.iv)
            .field("aad", &self.aad)
            .field("tag", &self.tag)
            .field("padding", &self.padding)
            .field("ctx", &self.ctx.is_some())
            .finish()
    }
}

impl SymContext {
    /// Creates a context for the named cipher and direction.
    ///
    /// Fails with [`CryptoError::InvalidCipher`] if the name is not
    /// recognized. Padding defaults to on (PKCS#7).
    pub fn create(algorithm: &str, mode: SymMode) -> Result<Self, CryptoError> {
        let spec = cipher_by_name(algorithm)
            .ok_or_else(|| CryptoError::InvalidCipher(algorithm.to_string()))?;
        Ok(Self {
            cipher: (spec.cipher)(),
            aead: spec.aead,
            mode,
            key: None,
            iv: None,
            aad: None,
            tag: None,
            padding: true,
            ctx: None,
        })
    }

    /// Copies `key` into the context, truncated or zero padded to the
    /// cipher's key length.
    pub fn set_key(&mut self, key: &[u8]) {
        let mut buf = vec![0u8; self.key_length()];
        let n = key.len().min(buf.len());
        buf[..n].copy_from_slice(&key[..n]);
        self.key = Some(SecretBytes::new(buf));
    }

    /// Copies `iv` into the context, truncated or zero padded to the
    /// cipher's IV length.
    pub fn set_iv(&mut self, iv: &[u8]) {
        let mut buf = vec![0u8; self.iv_length()];
        let n = iv.len().min(buf.len());
        buf[..n].copy_from_slice(&iv[..n]);
        self.iv = Some(SecretBytes::new(buf));
    }

    /// Fills both key and IV with cryptographically strong random bytes
    /// sized to the cipher.
    pub fn set_key_iv_random(&mut self) -> Result<(), CryptoError> {
        self.key = Some(SecretBytes::random(self.key_length())?);
        self.iv = Some(SecretBytes::random(self.iv_length())?);
        Ok(())
    }

    /// Enables or disables block padding. On by default.
    pub fn set_padding(&mut self, padding: bool) {
        self.padding = padding;
    }

    /// Sets the associated data for an AEAD operation. Empty AAD is allowed
    /// and still turns on tag handling.
    pub fn set_aad(&mut self, aad: &[u8]) {
        self.aad = Some(aad.to_vec());
    }

    /// Sets the expected authentication tag for AEAD decryption.
    pub fn set_tag(&mut self, tag: &[u8]) {
        self.tag = Some(tag.to_vec());
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_bytes())
    }

    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_ref().map(|iv| iv.as_bytes())
    }

    pub fn aad(&self) -> Option<&[u8]> {
        self.aad.as_deref()
    }

    /// The authentication tag. For encryption this is available after
    /// `finish` when AAD was set; for decryption it echoes `set_tag`.
    pub fn tag(&self) -> Option<&[u8]> {
        self.tag.as_deref()
    }

    pub fn key_length(&self) -> usize {
        self.cipher.key_length()
    }

    pub fn iv_length(&self) -> usize {
        self.cipher.iv_length()
    }

    pub fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// Whether the configured cipher is an authenticated (GCM family) mode.
    pub fn is_aead(&self) -> bool {
        self.aead
    }

    /// Acquires the underlying cipher state.
    ///
    /// Key and IV must have been set and the context must not already be
    /// initialized, otherwise [`CryptoError::InvalidState`]. Associated
    /// data, when present, is fed to the cipher here.
    pub fn init(&mut self) -> Result<(), CryptoError> {
        if self.ctx.is_some() {
            return Err(CryptoError::InvalidState);
        }
        let key = self.key.as_ref().ok_or(CryptoError::InvalidState)?;
        let iv = self.iv.as_ref().ok_or(CryptoError::InvalidState)?;

        let mut ctx = CipherCtx::new()?;
        let iv = if iv.is_empty() { None } else { Some(iv.as_bytes()) };
        match self.mode {
            SymMode::Encrypt => ctx.encrypt_init(Some(self.cipher), Some(key.as_bytes()), iv)?,
            SymMode::Decrypt => ctx.decrypt_init(Some(self.cipher), Some(key.as_bytes()), iv)?,
        }
        ctx.set_padding(self.padding);
        if let Some(aad) = &self.aad {
            ctx.cipher_update(aad, None)?;
        }
        self.ctx = Some(ctx);
        Ok(())
    }

    /// Feeds `data` through the cipher, appending output to `out`.
    ///
    /// Anything from zero to `data.len() + block_size` bytes may be
    /// appended per call. On failure `out` is restored to its previous
    /// length.
    pub fn update(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let ctx = self.ctx.as_mut().ok_or(CryptoError::InvalidState)?;
        let used = out.len();
        out.resize(used + data.len() + self.cipher.block_size(), 0);
        match ctx.cipher_update(data, Some(&mut out[used..])) {
            Ok(n) => {
                out.truncate(used + n);
                Ok(())
            }
            Err(err) => {
                out.truncate(used);
                Err(err.into())
            }
        }
    }

    /// Finalizes the operation, appending at most one block to `out`.
    ///
    /// For AEAD decryption the tag set via [`set_tag`](Self::set_tag) is
    /// verified; a mismatch fails with [`CryptoError::AuthenticationFailed`].
    /// For AEAD encryption with AAD set, the produced tag becomes readable
    /// via [`tag`](Self::tag). The cipher state is released whether or not
    /// finalization succeeds.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let mut ctx = self.ctx.take().ok_or(CryptoError::InvalidState)?;
        let used = out.len();
        out.resize(used + self.cipher.block_size().max(1), 0);

        // the expected tag must reach the cipher before the final call
        let verify_tag = self.mode == SymMode::Decrypt && self.aead && self.tag.is_some();
        if verify_tag {
            if let Err(err) = ctx.set_tag(self.tag.as_deref().unwrap_or(&[])) {
                out.truncate(used);
                return Err(err.into());
            }
        }

        match ctx.cipher_final(&mut out[used..]) {
            Ok(n) => {
                if self.mode == SymMode::Encrypt && self.aead && self.aad.is_some() {
                    let mut tag = vec![0u8; AEAD_TAG_SIZE];
                    if let Err(err) = ctx.tag(&mut tag) {
                        out.truncate(used);
                        return Err(err.into());
                    }
                    self.tag = Some(tag);
                }
                out.truncate(used + n);
                Ok(())
            }
            Err(err) => {
                out.truncate(used);
                if verify_tag {
                    Err(CryptoError::AuthenticationFailed)
                } else {
                    Err(err.into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(cipher: &str, aad: Option<&[u8]>, plaintext: &[u8]) -> Vec<u8> {
        let mut enc = SymContext::create(cipher, SymMode::Encrypt).expect("create failed");
        enc.set_key_iv_random().expect("random key failed");
        let key = enc.key().unwrap().to_vec();
        let iv = enc.iv().unwrap().to_vec();
        if let Some(aad) = aad {
            enc.set_aad(aad);
        }
        enc.init().expect("init failed");
        let mut ct = Vec::new();
        for chunk in plaintext.chunks(7) {
            enc.update(chunk, &mut ct).expect("update failed");
        }
        enc.finish(&mut ct).expect("final failed");
        let tag = enc.tag().map(|t| t.to_vec());

        let mut dec = SymContext::create(cipher, SymMode::Decrypt).expect("create failed");
        dec.set_key(&key);
        dec.set_iv(&iv);
        if let Some(aad) = aad {
            dec.set_aad(aad);
            dec.set_tag(&tag.expect("no tag after AEAD encrypt"));
        }
        dec.init().expect("init failed");
        let mut pt = Vec::new();
        dec.update(&ct, &mut pt).expect("update failed");
        dec.finish(&mut pt).expect("final failed");
        pt
    }

    #[test]
    fn test_ctr_roundtrip_streaming() {
        let msg = b"streaming symmetric contexts, one block at a time";
        assert_eq!(roundtrip("aes-256-ctr", None, msg), msg);
    }

    #[test]
    fn test_cbc_roundtrip_with_padding() {
        let msg = b"not block aligned";
        assert_eq!(roundtrip("aes-128-cbc", None, msg), msg);
    }

    #[test]
    fn test_gcm_roundtrip_with_aad() {
        let msg = b"authenticated message body";
        assert_eq!(roundtrip("aes-256-gcm", Some(b"header"), msg), msg);
    }

    #[test]
    fn test_gcm_tag_is_native_size() {
        let mut enc = SymContext::create("aes-128-gcm", SymMode::Encrypt).unwrap();
        enc.set_key_iv_random().unwrap();
        enc.set_aad(b"");
        enc.init().unwrap();
        let mut ct = Vec::new();
        enc.update(b"x", &mut ct).unwrap();
        enc.finish(&mut ct).unwrap();
        assert_eq!(enc.tag().unwrap().len(), 16);
    }

    #[test]
    fn test_gcm_detects_tampering() {
        let msg = b"tamper with me";
        let aad = b"associated";

        let mut enc = SymContext::create("aes-256-gcm", SymMode::Encrypt).unwrap();
        enc.set_key_iv_random().unwrap();
        let key = enc.key().unwrap().to_vec();
        let iv = enc.iv().unwrap().to_vec();
        enc.set_aad(aad);
        enc.init().unwrap();
        let mut ct = Vec::new();
        enc.update(msg, &mut ct).unwrap();
        enc.finish(&mut ct).unwrap();
        let tag = enc.tag().unwrap().to_vec();

        let cases: [(Vec<u8>, Vec<u8>, Vec<u8>); 3] = [
            // flipped ciphertext
            ({ let mut c = ct.clone(); c[0] ^= 1; c }, aad.to_vec(), tag.clone()),
            // flipped aad
            (ct.clone(), b"bssociated".to_vec(), tag.clone()),
            // flipped tag
            (ct.clone(), aad.to_vec(), { let mut t = tag.clone(); t[15] ^= 1; t }),
        ];

        for (ct, aad, tag) in cases {
            let mut dec = SymContext::create("aes-256-gcm", SymMode::Decrypt).unwrap();
            dec.set_key(&key);
            dec.set_iv(&iv);
            dec.set_aad(&aad);
            dec.set_tag(&tag);
            dec.init().unwrap();
            let mut pt = Vec::new();
            dec.update(&ct, &mut pt).unwrap();
            let before = pt.len();
            assert_eq!(
                dec.finish(&mut pt).unwrap_err(),
                CryptoError::AuthenticationFailed
            );
            assert_eq!(pt.len(), before);
        }
    }

    #[test]
    fn test_no_padding_requires_aligned_input() {
        let mut enc = SymContext::create("aes-256-cbc", SymMode::Encrypt).unwrap();
        enc.set_key_iv_random().unwrap();
        enc.set_padding(false);
        enc.init().unwrap();
        let mut ct = Vec::new();
        enc.update(b"unaligned", &mut ct).unwrap();
        assert!(enc.finish(&mut ct).is_err());
    }

    #[test]
    fn test_context_reuse_after_final() {
        let mut enc = SymContext::create("aes-256-ctr", SymMode::Encrypt).unwrap();
        enc.set_key_iv_random().unwrap();
        enc.init().unwrap();
        let mut first = Vec::new();
        enc.update(b"same message", &mut first).unwrap();
        enc.finish(&mut first).unwrap();

        // same key and IV, so the keystream repeats
        enc.init().unwrap();
        let mut second = Vec::new();
        enc.update(b"same message", &mut second).unwrap();
        enc.finish(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lifecycle_errors() {
        assert_eq!(
            SymContext::create("rot13", SymMode::Encrypt).unwrap_err(),
            CryptoError::InvalidCipher("rot13".to_string())
        );

        let mut ctx = SymContext::create("aes-256-ctr", SymMode::Encrypt).unwrap();
        let mut out = Vec::new();
        assert_eq!(ctx.update(b"x", &mut out).unwrap_err(), CryptoError::InvalidState);
        assert_eq!(ctx.finish(&mut out).unwrap_err(), CryptoError::InvalidState);
        assert_eq!(ctx.init().unwrap_err(), CryptoError::InvalidState);

        ctx.set_key_iv_random().unwrap();
        ctx.init().unwrap();
        assert_eq!(ctx.init().unwrap_err(), CryptoError::InvalidState);
    }

    #[test]
    fn test_key_truncated_to_cipher_length() {
        let mut ctx = SymContext::create("aes-128-cbc", SymMode::Encrypt).unwrap();
        ctx.set_key(&[0xAA; 64]);
        assert_eq!(ctx.key().unwrap().len(), 16);
        ctx.set_key(&[0xAA; 4]);
        let mut expected = [0u8; 16];
        expected[..4].fill(0xAA);
        assert_eq!(ctx.key().unwrap(), &expected[..]);
    }
}
