// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Zeroizing buffer for key material, IVs and derived secrets.

use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use crate::CryptoError;
use crate::Rng;

/// An owned byte buffer that is wiped when dropped.
///
/// Every buffer in this crate that holds raw key material, an IV, a derived
/// secret or intermediate plaintext lives in this type so that failure paths
/// clear it without explicit bookkeeping.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretBytes").field(&"<redacted>").finish()
    }
}

impl SecretBytes {
    /// Wraps an existing buffer. The buffer is owned from here on and wiped
    /// on drop.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Creates a buffer of `len` cryptographically strong random bytes.
    pub fn random(len: usize) -> Result<Self, CryptoError> {
        let mut data = vec![0u8; len];
        Rng::rand_bytes(&mut data)?;
        Ok(Self(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

impl AsRef<[u8]> for SecretBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
