// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! RSA-OAEP wrapping of short secrets.

use openssl::encrypt::Decrypter;
use openssl::encrypt::Encrypter;
use openssl::rsa::Padding;

use crate::CryptoError;
use crate::KeyKind;
use crate::PrivateKey;
use crate::PublicKey;
use crate::SecretBytes;

/// Encrypts a short secret under an RSA public key with OAEP padding.
/// Output is exactly the modulus size.
pub fn rsa_encrypt(key: &PublicKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.kind() != KeyKind::Rsa {
        return Err(CryptoError::UnsupportedOperation);
    }
    let mut encrypter = Encrypter::new(key.pkey())?;
    encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    let len = encrypter.encrypt_len(data)?;
    let mut out = vec![0u8; len];
    let n = encrypter.encrypt(data, &mut out)?;
    out.truncate(n);
    Ok(out)
}

/// Decrypts an OAEP wrapped secret under an RSA private key.
pub fn rsa_decrypt(key: &PrivateKey, data: &[u8]) -> Result<SecretBytes, CryptoError> {
    if key.kind() != KeyKind::Rsa {
        return Err(CryptoError::UnsupportedOperation);
    }
    let mut decrypter = Decrypter::new(key.pkey())?;
    decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
    let len = decrypter.decrypt_len(data)?;
    let mut out = vec![0u8; len];
    let n = decrypter.decrypt(data, &mut out)?;
    out.truncate(n);
    Ok(SecretBytes::new(out))
}
