// Copyright (C) Microsoft Corporation. All rights reserved.

//! Cryptographic key management library for encrypted mail storage.
//!
//! This crate provides the primitives a mail store needs to encrypt mail at
//! rest and to manage the keys that protect it:
//!
//! - **Symmetric contexts**: streaming encrypt/decrypt with optional
//!   authenticated (GCM) operation
//! - **HMAC contexts**: streaming message authentication
//! - **PBKDF2**: password based key derivation
//! - **Key objects**: RSA and EC keypair generation, ECDH agreement and
//!   RSA-OAEP secret wrapping
//! - **Key formats**: the tab separated "v1" and "v2" textual key records,
//!   plus PEM via the toolkit
//!
//! All cryptographic arithmetic is delegated to OpenSSL; this crate wires the
//! primitives together and owns the key serialization formats.

mod backend;
mod der;
mod format;
mod hmac;
mod kdf;
mod keys;
mod rand;
mod secret;
mod sym;

pub use backend::*;
pub use format::*;
pub use hmac::*;
pub use kdf::*;
pub use keys::*;
pub use rand::*;
pub use secret::*;
pub use sym::*;
use thiserror::Error;

/// Error type for all operations in this crate.
///
/// Every fallible operation returns exactly one of these kinds. Failures
/// inside the toolkit surface as [`CryptoError::BackendError`] carrying the
/// toolkit's diagnostic string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Cipher or digest name not recognized by the backend.
    #[error("invalid cipher {0}")]
    InvalidCipher(String),
    /// Key algorithm OID or name in a key record not recognized.
    #[error("unknown key algorithm {0}")]
    UnknownAlgorithm(String),
    /// EC curve name or NID not recognized.
    #[error("unknown EC curve {0}")]
    UnknownCurve(String),
    /// Field count or field content inconsistent with the key format.
    #[error("corrupted key data")]
    CorruptedData,
    /// Trailing key identifier does not match the recomputed identifier.
    #[error("key id mismatch after load")]
    KeyIdMismatch,
    /// The record was encrypted to a different key than the one supplied.
    #[error("no matching decryption key available")]
    WrongDecryptionKey,
    /// AEAD tag verification failed.
    #[error("data authentication failed")]
    AuthenticationFailed,
    /// The backend key check rejected the reconstructed key.
    #[error("invalid key")]
    InvalidKey,
    /// Context lifecycle violation, for example update before init or init
    /// without key material.
    #[error("context is not in a valid state for this operation")]
    InvalidState,
    /// The operation is not defined for this key type.
    #[error("operation not supported for this key type")]
    UnsupportedOperation,
    /// Any other toolkit failure, with the toolkit's diagnostic.
    #[error("backend error: {0}")]
    BackendError(String),
}

impl From<openssl::error::ErrorStack> for CryptoError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        CryptoError::BackendError(err.to_string())
    }
}
