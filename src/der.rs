// Copyright (C) Microsoft Corporation. All rights reserved.

//! DER and MPI encoding helpers for key serialization.
//!
//! Public keys are identified and stored as DER SubjectPublicKeyInfo. For EC
//! keys the point must be in compressed form, which the toolkit's own
//! serializer does not produce, so the SPKI is assembled here (RFC 5480).
//! EC private scalars travel in the toolkit's portable MPI format
//! (4 byte big endian length, then the big endian magnitude with a sign
//! guard byte when the top bit is set).

use openssl::bn::BigNum;
use openssl::bn::BigNumRef;

use crate::CryptoError;
use crate::EcCurve;
use crate::KeyKind;
use crate::PublicKey;

/// Object Identifier for id-ecPublicKey (RFC 5480).
///
/// OID: 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: asn1::ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 2, 1);

/// Object Identifier for the NIST P-256 (prime256v1) curve.
pub const OID_P256: asn1::ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 3, 1, 7);

/// Object Identifier for the NIST P-384 (secp384r1) curve.
pub const OID_P384: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 34);

/// Object Identifier for the NIST P-521 (secp521r1) curve.
pub const OID_P521: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 35);

/// Object Identifier for the secp256k1 curve.
pub const OID_SECP256K1: asn1::ObjectIdentifier = asn1::oid!(1, 3, 132, 0, 10);

impl From<EcCurve> for asn1::ObjectIdentifier {
    fn from(curve: EcCurve) -> Self {
        match curve {
            EcCurve::P256 => OID_P256,
            EcCurve::P384 => OID_P384,
            EcCurve::P521 => OID_P521,
            EcCurve::Secp256k1 => OID_SECP256K1,
        }
    }
}

/// AlgorithmIdentifier with named-curve parameters (RFC 5480 section 2.1.1).
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct EcAlgorithmIdentifier {
    algorithm: asn1::ObjectIdentifier,
    parameters: asn1::ObjectIdentifier,
}

/// SubjectPublicKeyInfo carrying an EC point.
#[derive(asn1::Asn1Read, asn1::Asn1Write)]
struct EcSubjectPublicKeyInfo<'a> {
    algorithm: EcAlgorithmIdentifier,
    subject_public_key: asn1::BitString<'a>,
}

/// Encodes the SubjectPublicKeyInfo used for key identifiers and v2 public
/// key records. EC keys are encoded with the compressed point form; RSA keys
/// use the toolkit's serializer directly.
pub(crate) fn spki_der(key: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    match key.kind() {
        KeyKind::Rsa => Ok(key.pkey().public_key_to_der()?),
        KeyKind::Ec => {
            let curve = key.curve().ok_or(CryptoError::UnsupportedOperation)?;
            let point = key.ec_point_compressed()?;
            let spki = EcSubjectPublicKeyInfo {
                algorithm: EcAlgorithmIdentifier {
                    algorithm: OID_EC_PUBLIC_KEY,
                    parameters: curve.into(),
                },
                subject_public_key: asn1::BitString::new(&point, 0)
                    .ok_or(CryptoError::InvalidState)?,
            };
            asn1::write_single(&spki)
                .map_err(|_| CryptoError::BackendError("ASN.1 encoding failed".to_string()))
        }
    }
}

/// Encodes a positive big number in MPI wire format.
pub(crate) fn mpi_encode(bn: &BigNumRef) -> Vec<u8> {
    let mut mag = bn.to_vec();
    if mag.first().is_some_and(|b| b & 0x80 != 0) {
        mag.insert(0, 0);
    }
    let mut out = Vec::with_capacity(4 + mag.len());
    out.extend_from_slice(&(mag.len() as u32).to_be_bytes());
    out.extend_from_slice(&mag);
    out
}

/// Decodes an MPI encoded big number. Negative values (top bit set on the
/// first magnitude byte without a guard) are rejected, private scalars are
/// always positive.
pub(crate) fn mpi_decode(data: &[u8]) -> Result<BigNum, CryptoError> {
    if data.len() < 4 {
        return Err(CryptoError::CorruptedData);
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[..4]);
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mag = &data[4..];
    if mag.len() != len {
        return Err(CryptoError::CorruptedData);
    }
    if mag.first().is_some_and(|b| b & 0x80 != 0) {
        return Err(CryptoError::CorruptedData);
    }
    Ok(BigNum::from_slice(mag)?)
}
