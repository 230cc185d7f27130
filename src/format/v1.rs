// Copyright (C) Microsoft Corporation. All rights reserved.

//! Legacy v1 key records (read only, EC only).
//!
//! v1 records identify the curve by its decimal toolkit NID and protect the
//! private scalar with AES-256-CTR under an all zero IV. Password protected
//! records derive the cipher key with PBKDF2-HMAC-SHA256 at 16 rounds; key
//! wrapped records pass the ECDH shared secret through a single SHA-256.
//! The 16 round count is what deployed v1 keys were written with and must
//! not be modernized. The trailing identifier is SHA-256 over the ASCII hex
//! of the compressed public point.

use openssl::bn::BigNum;
use openssl::bn::BigNumContext;
use openssl::ec::EcKey;
use openssl::ec::EcPoint;
use openssl::hash::hash;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use zeroize::Zeroizing;

use super::unhex;
use crate::ecdh_derive_secret_local;
use crate::kdf::pbkdf2;
use crate::keys::ec_private_from_scalar;
use crate::public_key_id_legacy;
use crate::CryptoError;
use crate::EcCurve;
use crate::PrivateKey;
use crate::PublicKey;
use crate::SymContext;
use crate::SymMode;

/// v1 private scalars are ciphered with this fixed algorithm and a zero IV.
fn decrypt_scalar(data: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut ctx = SymContext::create("aes-256-ctr", SymMode::Decrypt)?;
    ctx.set_iv(&[0u8; 16]);
    ctx.set_key(key);
    ctx.init()?;
    let mut out = Zeroizing::new(Vec::new());
    ctx.update(data, &mut out)?;
    ctx.finish(&mut out)?;
    Ok(out)
}

fn curve_from_field(field: &str) -> Result<EcCurve, CryptoError> {
    let nid: i32 = field.parse().map_err(|_| CryptoError::CorruptedData)?;
    EcCurve::from_nid(Nid::from_raw(nid))
        .ok_or_else(|| CryptoError::UnknownCurve(field.to_string()))
}

pub(crate) fn load_private_key(
    fields: &[&str],
    password: Option<&str>,
    dec_key: Option<&PrivateKey>,
) -> Result<PrivateKey, CryptoError> {
    let curve = curve_from_field(fields[1])?;

    let scalar = match fields[2] {
        "0" if fields.len() == 5 => {
            BigNum::from_hex_str(fields[3]).map_err(|_| CryptoError::CorruptedData)?
        }
        "2" if fields.len() == 6 => {
            // the password reaches us hex encoded in v1
            let password = unhex(password.ok_or(CryptoError::InvalidState)?)?;
            let password = Zeroizing::new(password);
            let salt = unhex(fields[4])?;
            let key = pbkdf2(&password, &salt, "sha256", 16, 32)?;
            let data = unhex(fields[3])?;
            let plain = decrypt_scalar(&data, key.as_bytes())?;
            BigNum::from_slice(&plain)?
        }
        "1" if fields.len() == 7 => {
            let dec_key = dec_key.ok_or(CryptoError::WrongDecryptionKey)?;
            let data = unhex(fields[3])?;
            let ephemeral = unhex(fields[4])?;
            let secret = ecdh_derive_secret_local(dec_key, &ephemeral)?;
            let key = hash(MessageDigest::sha256(), secret.as_bytes())?;
            let plain = decrypt_scalar(&data, &key)?;
            BigNum::from_slice(&plain)?
        }
        _ => return Err(CryptoError::CorruptedData),
    };

    let key = ec_private_from_scalar(curve, &scalar)?;

    let id = public_key_id_legacy(&key.to_public()?)?;
    if hex::encode(id) != fields[fields.len() - 1] {
        return Err(CryptoError::KeyIdMismatch);
    }
    Ok(key)
}

pub(crate) fn load_public_key(fields: &[&str]) -> Result<PublicKey, CryptoError> {
    if fields.len() != 3 {
        return Err(CryptoError::CorruptedData);
    }
    let curve = curve_from_field(fields[1])?;
    let group = curve.group()?;
    let mut ctx = BigNumContext::new()?;
    let point_bytes = unhex(fields[2])?;
    let point = EcPoint::from_bytes(&group, &point_bytes, &mut ctx)?;
    let ec = EcKey::from_public_key(&group, &point)?;
    ec.check_key().map_err(|_| CryptoError::InvalidKey)?;
    PublicKey::from_pkey(PKey::from_ec_key(ec)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdh_derive_secret_peer;
    use crate::format::split_fields;
    use crate::generate_keypair;
    use crate::public_key_id;
    use crate::KeyKind;

    fn encrypt_scalar(data: &[u8], key: &[u8]) -> Vec<u8> {
        let mut ctx = SymContext::create("aes-256-ctr", SymMode::Encrypt).unwrap();
        ctx.set_iv(&[0u8; 16]);
        ctx.set_key(key);
        ctx.init().unwrap();
        let mut out = Vec::new();
        ctx.update(data, &mut out).unwrap();
        ctx.finish(&mut out).unwrap();
        out
    }

    fn legacy_id_hex(key: &crate::PublicKey) -> String {
        hex::encode(public_key_id_legacy(key).unwrap())
    }

    fn assert_same_key(a: &crate::PublicKey, loaded: &PrivateKey) {
        assert_eq!(
            public_key_id(a, "sha256").unwrap(),
            public_key_id(&loaded.to_public().unwrap(), "sha256").unwrap()
        );
    }

    #[test]
    fn test_load_plain_record() {
        let pair = generate_keypair(KeyKind::Ec, 0, Some("prime256v1")).unwrap();
        let ec = pair.private.pkey().ec_key().unwrap();
        let scalar_hex = ec.private_key().to_hex_str().unwrap();
        let record = format!(
            "1\t{}\t0\t{}\t{}",
            EcCurve::P256.nid().as_raw(),
            &*scalar_hex,
            legacy_id_hex(&pair.public)
        );
        let loaded = load_private_key(&split_fields(&record), None, None).unwrap();
        assert_same_key(&pair.public, &loaded);
    }

    #[test]
    fn test_load_password_record() {
        let pair = generate_keypair(KeyKind::Ec, 0, Some("secp521r1")).unwrap();
        let ec = pair.private.pkey().ec_key().unwrap();
        let scalar = ec.private_key().to_vec();

        let password_hex = hex::encode(b"quite secret");
        let salt = [0x42u8; 8];
        let key = pbkdf2(b"quite secret", &salt, "sha256", 16, 32).unwrap();
        let record = format!(
            "1\t{}\t2\t{}\t{}\t{}",
            EcCurve::P521.nid().as_raw(),
            hex::encode(encrypt_scalar(&scalar, key.as_bytes())),
            hex::encode(salt),
            legacy_id_hex(&pair.public)
        );

        let loaded =
            load_private_key(&split_fields(&record), Some(&password_hex), None).unwrap();
        assert_same_key(&pair.public, &loaded);

        // a wrong password decrypts to a different scalar
        let wrong = hex::encode(b"not the same");
        assert!(load_private_key(&split_fields(&record), Some(&wrong), None).is_err());
    }

    #[test]
    fn test_load_key_wrapped_record() {
        let pair = generate_keypair(KeyKind::Ec, 0, Some("prime256v1")).unwrap();
        let wrap = generate_keypair(KeyKind::Ec, 0, Some("prime256v1")).unwrap();
        let ec = pair.private.pkey().ec_key().unwrap();
        let scalar = ec.private_key().to_vec();

        let (ephemeral, secret) = ecdh_derive_secret_peer(&wrap.public).unwrap();
        let key = hash(MessageDigest::sha256(), secret.as_bytes()).unwrap();
        let record = format!(
            "1\t{}\t1\t{}\t{}\t{}\t{}",
            EcCurve::P256.nid().as_raw(),
            hex::encode(encrypt_scalar(&scalar, &key)),
            hex::encode(&ephemeral),
            legacy_id_hex(&wrap.public),
            legacy_id_hex(&pair.public)
        );

        let loaded =
            load_private_key(&split_fields(&record), None, Some(&wrap.private)).unwrap();
        assert_same_key(&pair.public, &loaded);

        // without a decryption key the record is unreadable
        assert_eq!(
            load_private_key(&split_fields(&record), None, None).unwrap_err(),
            CryptoError::WrongDecryptionKey
        );
    }

    #[test]
    fn test_trailing_id_is_verified() {
        let pair = generate_keypair(KeyKind::Ec, 0, Some("prime256v1")).unwrap();
        let ec = pair.private.pkey().ec_key().unwrap();
        let scalar_hex = ec.private_key().to_hex_str().unwrap();
        let record = format!(
            "1\t{}\t0\t{}\t{}",
            EcCurve::P256.nid().as_raw(),
            &*scalar_hex,
            "0".repeat(64)
        );
        assert_eq!(
            load_private_key(&split_fields(&record), None, None).unwrap_err(),
            CryptoError::KeyIdMismatch
        );
    }

    #[test]
    fn test_public_point_roundtrip() {
        let pair = generate_keypair(KeyKind::Ec, 0, Some("secp384r1")).unwrap();
        let point = pair.public.ec_point_compressed().unwrap();
        // points were historically written with uppercase hex; both must load
        for point_hex in [hex::encode(&point), hex::encode_upper(&point)] {
            let record = format!("1\t{}\t{}", EcCurve::P384.nid().as_raw(), point_hex);
            let loaded = load_public_key(&split_fields(&record)).unwrap();
            assert_eq!(
                public_key_id(&pair.public, "sha256").unwrap(),
                public_key_id(&loaded, "sha256").unwrap()
            );
        }
    }

    #[test]
    fn test_field_count_is_checked() {
        assert_eq!(
            load_private_key(&split_fields("1\t714\t0\tdead\tbeef\textra"), None, None)
                .unwrap_err(),
            CryptoError::CorruptedData
        );
        assert_eq!(
            load_public_key(&split_fields("1\t714")).unwrap_err(),
            CryptoError::CorruptedData
        );
    }
}
