// Copyright (C) Microsoft Corporation. All rights reserved.

//! Textual key serialization.
//!
//! Two on-disk representations are supported: standard PEM, delegated to
//! the toolkit, and the tab separated "Dovecot" records in versions 1
//! (legacy, EC only, read only) and 2 (current, RSA and EC, read/write).
//! Fields are separated by a single TAB, hex is lowercase and integers are
//! unsigned decimal. Records carry no trailing newline; callers frame lines
//! themselves.

mod info;
mod pem;
mod v1;
mod v2;


pub use info::*;

use crate::CryptoError;
use crate::PrivateKey;
use crate::PublicKey;

/// On-disk representation of a key string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    Pem,
    Dovecot,
}

/// Version of a Dovecot format key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVersion {
    /// Not applicable (PEM).
    Na,
    V1,
    V2,
}

/// Whether a key string holds a public or a private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    Public,
    Private,
}

/// How the private key material in a record is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    /// Stored in the clear.
    None,
    /// Wrapped to another key (ECDH derived or RSA-OAEP wrapped secret).
    Key,
    /// Protected by a password derived key.
    Password,
}

pub(crate) fn split_fields(data: &str) -> Vec<&str> {
    data.split('\t').collect()
}

pub(crate) fn unhex(field: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(field).map_err(|_| CryptoError::CorruptedData)
}

/// Loads a private key from `data`.
///
/// `password` is consulted for password protected records (for v1 records
/// it is itself hex encoded) and for encrypted PEM. `dec_key` is the local
/// private key for key wrapped records.
pub fn load_private_key(
    format: KeyFormat,
    data: &str,
    password: Option<&str>,
    dec_key: Option<&PrivateKey>,
) -> Result<PrivateKey, CryptoError> {
    match format {
        KeyFormat::Pem => pem::load_private_key(data, password),
        KeyFormat::Dovecot => {
            let fields = split_fields(data);
            if fields.len() < 4 {
                return Err(CryptoError::CorruptedData);
            }
            match fields[0] {
                "1" => v1::load_private_key(&fields, password, dec_key),
                "2" => v2::load_private_key(&fields, password, dec_key),
                _ => Err(CryptoError::CorruptedData),
            }
        }
    }
}

/// Loads a public key from `data`. Dovecot format accepts both v1 and v2
/// records.
pub fn load_public_key(format: KeyFormat, data: &str) -> Result<PublicKey, CryptoError> {
    match format {
        KeyFormat::Pem => pem::load_public_key(data),
        KeyFormat::Dovecot => {
            let fields = split_fields(data);
            if fields.len() < 2 {
                return Err(CryptoError::CorruptedData);
            }
            match fields[0] {
                "1" => v1::load_public_key(&fields),
                "2" => v2::load_public_key(&fields),
                _ => Err(CryptoError::CorruptedData),
            }
        }
    }
}

/// Appends a serialized private key to `dest`.
///
/// Dovecot format always writes v2 records. `cipher` selects encryption:
/// `None` stores the key in the clear, a plain cipher name selects password
/// mode (requires `password`), a cipher name with an `ecdh-` prefix selects
/// key wrapped mode (requires `enc_key`). On failure `dest` is truncated
/// back to its length at entry.
pub fn store_private_key(
    key: &PrivateKey,
    format: KeyFormat,
    cipher: Option<&str>,
    password: Option<&str>,
    enc_key: Option<&PublicKey>,
    dest: &mut String,
) -> Result<(), CryptoError> {
    match format {
        KeyFormat::Pem => pem::store_private_key(key, password, dest),
        KeyFormat::Dovecot => v2::store_private_key(key, cipher, password, enc_key, dest),
    }
}

/// Appends a serialized public key to `dest`. Dovecot format writes v2.
pub fn store_public_key(
    key: &PublicKey,
    format: KeyFormat,
    dest: &mut String,
) -> Result<(), CryptoError> {
    match format {
        KeyFormat::Pem => pem::store_public_key(key, dest),
        KeyFormat::Dovecot => v2::store_public_key(key, dest),
    }
}
