// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PBKDF2 key derivation.

use openssl::hash::MessageDigest;

use crate::CryptoError;
use crate::SecretBytes;

/// Derives `out_len` bytes from a password and salt with PBKDF2-HMAC.
///
/// `digest` is a digest name recognized by the backend, for example
/// `"sha256"`. `rounds` and `out_len` must be non zero.
pub fn pbkdf2(
    password: &[u8],
    salt: &[u8],
    digest: &str,
    rounds: u32,
    out_len: usize,
) -> Result<SecretBytes, CryptoError> {
    if rounds == 0 || out_len == 0 {
        return Err(CryptoError::InvalidState);
    }
    let md = MessageDigest::from_name(digest)
        .ok_or_else(|| CryptoError::InvalidCipher(digest.to_string()))?;
    let mut out = vec![0u8; out_len];
    openssl::pkcs5::pbkdf2_hmac(password, salt, rounds as usize, md, &mut out)?;
    Ok(SecretBytes::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_known_vector() {
        // RFC 6070 case 2, translated to HMAC-SHA256
        let out = pbkdf2(b"password", b"salt", "sha256", 2, 32).expect("pbkdf2 failed");
        assert_eq!(
            hex::encode(out.as_bytes()),
            "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43"
        );
    }

    #[test]
    fn test_pbkdf2_deterministic() {
        let a = pbkdf2(b"correct horse", b"\x01\x02\x03\x04", "sha256", 16, 48).unwrap();
        let b = pbkdf2(b"correct horse", b"\x01\x02\x03\x04", "sha256", 16, 48).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_pbkdf2_rejects_zero_rounds() {
        assert_eq!(
            pbkdf2(b"pw", b"salt", "sha256", 0, 32).unwrap_err(),
            CryptoError::InvalidState
        );
        assert_eq!(
            pbkdf2(b"pw", b"salt", "sha256", 1, 0).unwrap_err(),
            CryptoError::InvalidState
        );
    }

    #[test]
    fn test_pbkdf2_unknown_digest() {
        assert_eq!(
            pbkdf2(b"pw", b"salt", "no-such-digest", 1, 32).unwrap_err(),
            CryptoError::InvalidCipher("no-such-digest".to_string())
        );
    }
}
