// Copyright (C) Microsoft Corporation. All rights reserved.

//! Installable dispatch record over the primitive set.
//!
//! Callers that need to swap the cryptographic implementation go through a
//! process wide record of function pointers instead of calling the module
//! functions directly. The record is installed once at startup and is read
//! only afterwards; if nothing is installed, the built in OpenSSL record is
//! used.

use std::sync::OnceLock;

use crate::format;
use crate::kdf;
use crate::keys;
use crate::CryptoError;
use crate::HmacContext;
use crate::KeyFormat;
use crate::KeyInfo;
use crate::KeyKind;
use crate::Keypair;
use crate::PrivateKey;
use crate::PublicKey;
use crate::Rng;
use crate::SecretBytes;
use crate::SymContext;
use crate::SymMode;

/// The operation set a backend provides.
pub struct Backend {
    pub sym_create: fn(&str, SymMode) -> Result<SymContext, CryptoError>,
    pub hmac_create: fn(&str) -> Result<HmacContext, CryptoError>,
    pub pbkdf2: fn(&[u8], &[u8], &str, u32, usize) -> Result<SecretBytes, CryptoError>,
    pub rand_bytes: fn(&mut [u8]) -> Result<(), CryptoError>,
    pub generate_keypair: fn(KeyKind, u32, Option<&str>) -> Result<Keypair, CryptoError>,
    pub ecdh_derive_secret_local: fn(&PrivateKey, &[u8]) -> Result<SecretBytes, CryptoError>,
    pub ecdh_derive_secret_peer: fn(&PublicKey) -> Result<(Vec<u8>, SecretBytes), CryptoError>,
    pub rsa_encrypt: fn(&PublicKey, &[u8]) -> Result<Vec<u8>, CryptoError>,
    pub rsa_decrypt: fn(&PrivateKey, &[u8]) -> Result<SecretBytes, CryptoError>,
    pub load_private_key:
        fn(KeyFormat, &str, Option<&str>, Option<&PrivateKey>) -> Result<PrivateKey, CryptoError>,
    pub load_public_key: fn(KeyFormat, &str) -> Result<PublicKey, CryptoError>,
    pub store_private_key: fn(
        &PrivateKey,
        KeyFormat,
        Option<&str>,
        Option<&str>,
        Option<&PublicKey>,
        &mut String,
    ) -> Result<(), CryptoError>,
    pub store_public_key: fn(&PublicKey, KeyFormat, &mut String) -> Result<(), CryptoError>,
    pub private_to_public_key: fn(&PrivateKey) -> Result<PublicKey, CryptoError>,
    pub key_string_info: fn(&str) -> Result<KeyInfo, CryptoError>,
    pub public_key_id: fn(&PublicKey, &str) -> Result<Vec<u8>, CryptoError>,
    pub public_key_id_legacy: fn(&PublicKey) -> Result<Vec<u8>, CryptoError>,
}

fn private_to_public(key: &PrivateKey) -> Result<PublicKey, CryptoError> {
    key.to_public()
}

/// The built in OpenSSL backed record.
pub static OPENSSL_BACKEND: Backend = Backend {
    sym_create: SymContext::create,
    hmac_create: HmacContext::create,
    pbkdf2: kdf::pbkdf2,
    rand_bytes: Rng::rand_bytes,
    generate_keypair: keys::generate_keypair,
    ecdh_derive_secret_local: keys::ecdh_derive_secret_local,
    ecdh_derive_secret_peer: keys::ecdh_derive_secret_peer,
    rsa_encrypt: keys::rsa_encrypt,
    rsa_decrypt: keys::rsa_decrypt,
    load_private_key: format::load_private_key,
    load_public_key: format::load_public_key,
    store_private_key: format::store_private_key,
    store_public_key: format::store_public_key,
    private_to_public_key: private_to_public,
    key_string_info: format::key_string_info,
    public_key_id: keys::public_key_id,
    public_key_id_legacy: keys::public_key_id_legacy,
};

static INSTALLED: OnceLock<&'static Backend> = OnceLock::new();

/// Installs the process wide backend. The first install wins; returns
/// whether this call installed its record.
pub fn install_backend(backend: &'static Backend) -> bool {
    INSTALLED.set(backend).is_ok()
}

/// The process wide backend. Falls back to [`OPENSSL_BACKEND`] when
/// nothing was installed.
pub fn backend() -> &'static Backend {
    INSTALLED.get_or_init(|| &OPENSSL_BACKEND)
}
