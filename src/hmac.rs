// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Streaming HMAC contexts.

use openssl::hash::MessageDigest;
use openssl::md::Md;
use openssl::md::MdRef;
use openssl::md_ctx::MdCtx;
use openssl::pkey::PKey;

use crate::CryptoError;
use crate::SecretBytes;

/// Largest key the context keeps, the block size of the widest supported
/// digest. Longer keys are truncated, not hashed down.
const HMAC_MAX_KEY_SIZE: usize = 128;

/// A streaming HMAC context.
///
/// Lifecycle mirrors [`SymContext`](crate::SymContext): `create` →
/// `set_key` → `init` → `update`* → `finish`. After `finish` the context
/// may be initialized again with the same key.
pub struct HmacContext {
    md: MessageDigest,
    key: Option<SecretBytes>,
    ctx: Option<MdCtx>,
}

impl std::fmt::Debug for HmacContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacContext")
            .field("md", &self.md.type_())
            .field("key", &self.key)
            .field("ctx", &self.ctx.is_some())
            .finish()
    }
}

impl HmacContext {
    /// Creates a context for the named digest, for example `"sha256"`.
    pub fn create(algorithm: &str) -> Result<Self, CryptoError> {
        let md = MessageDigest::from_name(algorithm)
            .ok_or_else(|| CryptoError::InvalidCipher(algorithm.to_string()))?;
        Ok(Self {
            md,
            key: None,
            ctx: None,
        })
    }

    fn md_ref(&self) -> Result<&'static MdRef, CryptoError> {
        Md::from_nid(self.md.type_()).ok_or(CryptoError::InvalidState)
    }

    /// Copies `key` into the context, truncated to
    /// [`HMAC_MAX_KEY_SIZE`] bytes regardless of the digest.
    pub fn set_key(&mut self, key: &[u8]) {
        let n = key.len().min(HMAC_MAX_KEY_SIZE);
        self.key = Some(SecretBytes::from(&key[..n]));
    }

    /// Fills the key with random bytes sized to the digest's block size.
    pub fn set_key_random(&mut self) -> Result<(), CryptoError> {
        let len = self.md_ref()?.block_size();
        self.key = Some(SecretBytes::random(len)?);
        Ok(())
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_ref().map(|k| k.as_bytes())
    }

    /// Number of bytes `finish` appends.
    pub fn digest_length(&self) -> usize {
        self.md.size()
    }

    /// Acquires the underlying MAC state. The key must have been set.
    pub fn init(&mut self) -> Result<(), CryptoError> {
        if self.ctx.is_some() {
            return Err(CryptoError::InvalidState);
        }
        let key = self.key.as_ref().ok_or(CryptoError::InvalidState)?;
        let pkey = PKey::hmac(key.as_bytes())?;
        let md = self.md_ref()?;
        let mut ctx = MdCtx::new()?;
        ctx.digest_sign_init(Some(md), &pkey)?;
        self.ctx = Some(ctx);
        Ok(())
    }

    /// Feeds `data` into the MAC.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        let ctx = self.ctx.as_mut().ok_or(CryptoError::InvalidState)?;
        ctx.digest_sign_update(data)?;
        Ok(())
    }

    /// Finalizes the MAC, appending exactly `digest_length` bytes to `out`.
    /// The MAC state is released whether or not finalization succeeds.
    pub fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let mut ctx = self.ctx.take().ok_or(CryptoError::InvalidState)?;
        let used = out.len();
        out.resize(used + self.md.size(), 0);
        match ctx.digest_sign_final(Some(&mut out[used..])) {
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
}
