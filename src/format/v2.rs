// Copyright (C) Microsoft Corporation. All rights reserved.

//! v2 key records (read and write, RSA and EC).
//!
//! v2 identifies the key algorithm by its dotted ASN.1 OID. Private key
//! material is the DER RSAPrivateKey for RSA and the MPI encoded scalar for
//! EC. Encrypted records derive cipher key and IV in one PBKDF2 call over
//! the wrapping secret and record the KDF parameters alongside the
//! ciphertext, so old records stay readable when the write side constants
//! move. GCM family ciphers append their 16 byte tag to the ciphertext
//! field. The trailing identifier is SHA-256 over the DER
//! SubjectPublicKeyInfo of the public half.

use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use zeroize::Zeroizing;

use super::unhex;
use super::EncryptionType;
use crate::der::mpi_decode;
use crate::der::mpi_encode;
use crate::der::spki_der;
use crate::ecdh_derive_secret_local;
use crate::ecdh_derive_secret_peer;
use crate::kdf::pbkdf2;
use crate::keys::ec_private_from_scalar;
use crate::public_key_id;
use crate::rsa_decrypt;
use crate::rsa_encrypt;
use crate::CryptoError;
use crate::EcCurve;
use crate::KeyKind;
use crate::PrivateKey;
use crate::PublicKey;
use crate::Rng;
use crate::SecretBytes;
use crate::SymContext;
use crate::SymMode;

/// KDF parameters written into new records. Loading honors whatever the
/// record carries, so these can be raised without a format version bump.
const KEY_ENCRYPT_HASH: &str = "sha256";
const KEY_ENCRYPT_ROUNDS: u32 = 2048;

const RSA_OID: &str = "1.2.840.113549.1.1.1";
const AEAD_TAG_SIZE: usize = 16;

enum KeyAlgo {
    Rsa,
    Ec(EcCurve),
}

fn algo_from_field(field: &str) -> Result<KeyAlgo, CryptoError> {
    if field == RSA_OID || field.eq_ignore_ascii_case("rsaEncryption") {
        return Ok(KeyAlgo::Rsa);
    }
    EcCurve::from_algo_text(field)
        .map(KeyAlgo::Ec)
        .ok_or_else(|| CryptoError::UnknownAlgorithm(field.to_string()))
}

/// Ciphers the private key material. The cipher key and IV are derived in
/// one PBKDF2 call over the secret and split. For AEAD ciphers the tag
/// rides at the end of the ciphertext.
fn cipher_key(
    cipher: &str,
    mode: SymMode,
    input: &[u8],
    secret: &[u8],
    salt: &[u8],
    digest: &str,
    rounds: u32,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut ctx = SymContext::create(cipher, mode)?;
    let key_len = ctx.key_length();
    let kdf = pbkdf2(secret, salt, digest, rounds, key_len + ctx.iv_length())?;
    ctx.set_key(&kdf.as_bytes()[..key_len]);
    ctx.set_iv(&kdf.as_bytes()[key_len..]);

    let mut input = input;
    if ctx.is_aead() {
        ctx.set_aad(&[]);
        if mode == SymMode::Decrypt {
            if input.len() < AEAD_TAG_SIZE {
                return Err(CryptoError::CorruptedData);
            }
            let (head, tag) = input.split_at(input.len() - AEAD_TAG_SIZE);
            ctx.set_tag(tag);
            input = head;
        }
    }

    ctx.init()?;
    let mut out = Zeroizing::new(Vec::new());
    ctx.update(input, &mut out)?;
    ctx.finish(&mut out)?;
    if mode == SymMode::Encrypt && ctx.is_aead() {
        out.extend_from_slice(ctx.tag().ok_or(CryptoError::InvalidState)?);
    }
    Ok(out)
}

pub(crate) fn load_private_key(
    fields: &[&str],
    password: Option<&str>,
    dec_key: Option<&PrivateKey>,
) -> Result<PrivateKey, CryptoError> {
    let enctype = match fields[2] {
        "0" => EncryptionType::None,
        "1" => EncryptionType::Key,
        "2" => EncryptionType::Password,
        _ => return Err(CryptoError::CorruptedData),
    };
    let expected_fields = match enctype {
        EncryptionType::None => 5,
        EncryptionType::Password => 9,
        EncryptionType::Key => 11,
    };
    if fields.len() != expected_fields {
        return Err(CryptoError::CorruptedData);
    }

    let algo = algo_from_field(fields[1])?;

    let key_data: Zeroizing<Vec<u8>> = match enctype {
        EncryptionType::None => Zeroizing::new(unhex(fields[3])?),
        EncryptionType::Key => {
            let rounds: u32 = fields[6].parse().map_err(|_| CryptoError::CorruptedData)?;
            let dec_key = dec_key.ok_or(CryptoError::WrongDecryptionKey)?;

            // refuse to run the unwrap against the wrong key
            let dec_id = hex::encode(public_key_id(&dec_key.to_public()?, "sha256")?);
            if dec_id != fields[9] {
                return Err(CryptoError::WrongDecryptionKey);
            }

            let salt = unhex(fields[4])?;
            let data = unhex(fields[7])?;
            let peer_material = unhex(fields[8])?;
            let secret = match dec_key.kind() {
                KeyKind::Rsa => rsa_decrypt(dec_key, &peer_material)?,
                KeyKind::Ec => ecdh_derive_secret_local(dec_key, &peer_material)?,
            };
            cipher_key(
                fields[3],
                SymMode::Decrypt,
                &data,
                secret.as_bytes(),
                &salt,
                fields[5],
                rounds,
            )?
        }
        EncryptionType::Password => {
            let rounds: u32 = fields[6].parse().map_err(|_| CryptoError::CorruptedData)?;
            let password = password.ok_or(CryptoError::InvalidState)?;
            let salt = unhex(fields[4])?;
            let data = unhex(fields[7])?;
            cipher_key(
                fields[3],
                SymMode::Decrypt,
                &data,
                password.as_bytes(),
                &salt,
                fields[5],
                rounds,
            )?
        }
    };

    let key = match algo {
        KeyAlgo::Rsa => {
            let rsa = Rsa::private_key_from_der(&key_data)?;
            if !rsa.check_key()? {
                return Err(CryptoError::InvalidKey);
            }
            PrivateKey::from_pkey(PKey::from_rsa(rsa)?)?
        }
        KeyAlgo::Ec(curve) => {
            let scalar = mpi_decode(&key_data)?;
            ec_private_from_scalar(curve, &scalar)?
        }
    };

    let id = hex::encode(public_key_id(&key.to_public()?, "sha256")?);
    if id != fields[fields.len() - 1] {
        return Err(CryptoError::KeyIdMismatch);
    }
    Ok(key)
}

pub(crate) fn load_public_key(fields: &[&str]) -> Result<PublicKey, CryptoError> {
    if fields.len() != 2 {
        return Err(CryptoError::CorruptedData);
    }
    if fields[1].len() < 2 || fields[1].len() % 2 != 0 {
        return Err(CryptoError::CorruptedData);
    }
    let der = unhex(fields[1])?;
    PublicKey::from_pkey(PKey::public_key_from_der(&der)?)
}

// prefix match only; "ecdh-" with an empty bare name still selects key
// wrapping and fails at cipher lookup
fn strip_ecdh_prefix(cipher: &str) -> Option<&str> {
    if cipher.len() >= 5 && cipher[..5].eq_ignore_ascii_case("ecdh-") {
        Some(&cipher[5..])
    } else {
        None
    }
}

pub(crate) fn store_private_key(
    key: &PrivateKey,
    cipher: Option<&str>,
    password: Option<&str>,
    enc_key: Option<&PublicKey>,
    dest: &mut String,
) -> Result<(), CryptoError> {
    let dest_used = dest.len();
    if let Err(err) = store_inner(key, cipher, password, enc_key, dest) {
        dest.truncate(dest_used);
        return Err(err);
    }
    Ok(())
}

fn store_inner(
    key: &PrivateKey,
    cipher: Option<&str>,
    password: Option<&str>,
    enc_key: Option<&PublicKey>,
    dest: &mut String,
) -> Result<(), CryptoError> {
    let oid = match key.kind() {
        KeyKind::Rsa => RSA_OID,
        KeyKind::Ec => key
            .curve()
            .ok_or(CryptoError::UnsupportedOperation)?
            .oid_text(),
    };

    let material: Zeroizing<Vec<u8>> = match key.kind() {
        KeyKind::Rsa => Zeroizing::new(key.pkey().rsa()?.private_key_to_der()?),
        KeyKind::Ec => Zeroizing::new(mpi_encode(key.pkey().ec_key()?.private_key())),
    };

    enum StoreMode<'a> {
        Plain,
        Password(&'a str, &'a str),
        Wrapped(&'a str, &'a PublicKey),
    }

    let mode = match cipher {
        None => StoreMode::Plain,
        Some(name) => {
            if let Some(bare) = strip_ecdh_prefix(name) {
                if password.is_some() {
                    return Err(CryptoError::InvalidState);
                }
                StoreMode::Wrapped(bare, enc_key.ok_or(CryptoError::InvalidState)?)
            } else {
                if enc_key.is_some() {
                    return Err(CryptoError::InvalidState);
                }
                StoreMode::Password(name, password.ok_or(CryptoError::InvalidState)?)
            }
        }
    };

    let enctype = match mode {
        StoreMode::Plain => 0,
        StoreMode::Wrapped(..) => 1,
        StoreMode::Password(..) => 2,
    };
    dest.push_str(&format!("2\t{oid}\t{enctype}\t"));

    match mode {
        StoreMode::Plain => dest.push_str(&hex::encode(&*material)),
        StoreMode::Password(cipher, password) => {
            append_encrypted(dest, cipher, &material, password.as_bytes(), None)?;
        }
        StoreMode::Wrapped(cipher, enc_key) => {
            let (peer_material, secret) = match enc_key.kind() {
                KeyKind::Rsa => {
                    // wrap a fresh random secret under the RSA key
                    let secret = SecretBytes::random(16)?;
                    let wrapped = rsa_encrypt(enc_key, secret.as_bytes())?;
                    (wrapped, secret)
                }
                KeyKind::Ec => ecdh_derive_secret_peer(enc_key)?,
            };
            append_encrypted(
                dest,
                cipher,
                &material,
                secret.as_bytes(),
                Some((&peer_material, enc_key)),
            )?;
        }
    }

    let id = public_key_id(&key.to_public()?, "sha256")?;
    dest.push('\t');
    dest.push_str(&hex::encode(id));
    Ok(())
}

fn append_encrypted(
    dest: &mut String,
    cipher: &str,
    material: &[u8],
    secret: &[u8],
    peer: Option<(&[u8], &PublicKey)>,
) -> Result<(), CryptoError> {
    let cipher = cipher.to_ascii_lowercase();
    let mut salt = [0u8; 8];
    Rng::rand_bytes(&mut salt)?;

    dest.push_str(&cipher);
    dest.push('\t');
    dest.push_str(&hex::encode(salt));
    dest.push_str(&format!("\t{KEY_ENCRYPT_HASH}\t{KEY_ENCRYPT_ROUNDS}\t"));

    let ciphertext = cipher_key(
        &cipher,
        SymMode::Encrypt,
        material,
        secret,
        &salt,
        KEY_ENCRYPT_HASH,
        KEY_ENCRYPT_ROUNDS,
    )?;
    dest.push_str(&hex::encode(&*ciphertext));

    if let Some((peer_material, enc_key)) = peer {
        dest.push('\t');
        dest.push_str(&hex::encode(peer_material));
        dest.push('\t');
        dest.push_str(&hex::encode(public_key_id(enc_key, "sha256")?));
    }
    Ok(())
}

pub(crate) fn store_public_key(key: &PublicKey, dest: &mut String) -> Result<(), CryptoError> {
    let der = spki_der(key)?;
    dest.push_str("2\t");
    dest.push_str(&hex::encode(der));
    Ok(())
}
