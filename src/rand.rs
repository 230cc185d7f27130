// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cryptographically secure random number generation.

use crate::CryptoError;

/// Process wide random source backed by the toolkit's CSPRNG.
pub struct Rng;

impl Rng {
    /// Fills `buf` with cryptographically strong random bytes.
    pub fn rand_bytes(buf: &mut [u8]) -> Result<(), CryptoError> {
        openssl::rand::rand_bytes(buf)?;
        Ok(())
    }
}
